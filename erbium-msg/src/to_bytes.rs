use tinyvec::ArrayVec;

use crate::*;

/// Trait allowing fallible conversion into bytes
pub trait TryIntoBytes {
  /// Error type yielded if conversion fails
  type Error;

  /// Try to serialize into a fixed-capacity buffer of `N` bytes
  ///
  /// ```
  /// use erbium_msg::{Code, Id, Message, Token, TryIntoBytes, Type};
  ///
  /// let ping = Message::empty(Type::Con, Id(0x1234));
  /// let bytes = ping.try_into_bytes::<16>().unwrap();
  ///
  /// assert_eq!(bytes.as_slice(), &[0b0100_0000, 0, 0x12, 0x34]);
  /// ```
  fn try_into_bytes<const N: usize>(&self) -> Result<ArrayVec<[u8; N]>, Self::Error>;
}

/// Errors encounterable serializing to bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MessageToBytesError {
  /// Reserved capacity was not enough for size of message
  TooLong {
    /// Capacity of the output buffer
    capacity: usize,
    /// Size of the serialized message
    size: usize,
  },
  /// Header, token and options exceed [`MAX_HEADER_SIZE`]
  HeaderTooLong(usize),
  /// The gap between two consecutive option numbers can't be encoded
  OptionDeltaTooLarge(u32),
}

pub(crate) fn opt_len_or_delta(val: u32) -> Result<(u8, ArrayVec<[u8; 2]>), MessageToBytesError> {
  let mut bytes = ArrayVec::new();
  match val {
    | n if n > 0xFFFF + 269 => Err(MessageToBytesError::OptionDeltaTooLarge(n)),
    | n if n >= 269 => {
      bytes.extend(((n - 269) as u16).to_be_bytes());
      Ok((14, bytes))
    },
    | n if n >= 13 => {
      bytes.push((n - 13) as u8);
      Ok((13, bytes))
    },
    | n => Ok((n as u8, bytes)),
  }
}

impl Message {
  /// Number of bytes preceding the payload (header, token, options
  /// and payload marker) when serialized
  pub fn header_size(&self) -> usize {
    if self.code.is_empty() {
      return 4;
    }

    let ext = |n: usize| match n {
      | n if n >= 269 => 2,
      | n if n >= 13 => 1,
      | _ => 0,
    };

    let (opts, _) = self.opts.iter().fold((0, 0), |(size, prev), o| {
                                      let delta = (o.number.0 - prev) as usize;
                                      let len = o.value.as_bytes().len();
                                      (size + 1 + ext(delta) + ext(len) + len, o.number.0)
                                    });

    let marker = if self.payload.is_empty() { 0 } else { 1 };

    4 + self.token.0.len() + opts + marker
  }

  /// Total number of bytes when serialized
  pub fn size(&self) -> usize {
    if self.code.is_empty() {
      4
    } else {
      self.header_size() + self.payload.len()
    }
  }
}

impl TryIntoBytes for Message {
  type Error = MessageToBytesError;

  fn try_into_bytes<const N: usize>(&self) -> Result<ArrayVec<[u8; N]>, Self::Error> {
    let header_size = self.header_size();
    if header_size > MAX_HEADER_SIZE {
      return Err(MessageToBytesError::HeaderTooLong(header_size));
    }

    let size = self.size();
    if size > N {
      return Err(MessageToBytesError::TooLong { capacity: N,
                                                size });
    }

    let mut bytes = ArrayVec::<[u8; N]>::new();

    // empty messages are exactly 4 bytes, never a token or options
    let empty = self.code.is_empty();
    let tkl = if empty { 0 } else { self.token.0.len() as u8 };

    let byte1: u8 = Byte1 { tkl,
                            ver: self.ver,
                            ty: self.ty }.into();
    let id: [u8; 2] = self.id.into();

    bytes.push(byte1);
    bytes.push(self.code.into());
    bytes.extend(id);

    if empty {
      return Ok(bytes);
    }

    bytes.extend(self.token.0.iter().copied());

    let mut prev = 0u32;
    for opt in self.opts.iter() {
      let (del, del_bytes) = opt_len_or_delta(opt.number.0 - prev)?;
      let (len, len_bytes) = opt_len_or_delta(opt.value.as_bytes().len() as u32)?;

      bytes.push(del << 4 | len);
      bytes.extend(del_bytes);
      bytes.extend(len_bytes);
      bytes.extend(opt.value.as_bytes().iter().copied());

      prev = opt.number.0;
    }

    if !self.payload.is_empty() {
      bytes.push(0b11111111);
      bytes.extend(self.payload.as_bytes().iter().copied());
    }

    Ok(bytes)
  }
}

pub(crate) struct Byte1 {
  pub(crate) ver: Version,
  pub(crate) ty: Type,
  pub(crate) tkl: u8,
}

impl From<Byte1> for u8 {
  fn from(b: Byte1) -> u8 {
    let ver = b.ver.0 << 6;
    let ty = u8::from(b.ty) << 4;
    let tkl = b.tkl;

    ver | ty | tkl
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{assert_eqb, assert_eqb_iter};

  #[test]
  fn msg() {
    let (m, expected) = crate::test_msg();
    let actual = m.try_into_bytes::<128>().unwrap();
    assert_eqb_iter!(actual, expected);
  }

  #[test]
  fn byte_1() {
    let byte = Byte1 { ver: Version(1),
                       ty: Type::Ack,
                       tkl: 3 };
    let actual: u8 = byte.into();
    let expected = 0b_01_10_0011u8;
    assert_eqb!(actual, expected)
  }

  #[test]
  fn id() {
    let id = Id(16);
    let actual = u16::from_be_bytes(id.into());
    assert_eqb!(actual, 16)
  }

  fn single_opt_bytes(number: u32) -> ArrayVec<[u8; 16]> {
    let mut msg = Message::new(Type::Con, Code::GET, Id(0), Token::default());
    msg.opts.add(OptNumber(number), OptValue::default()).unwrap();
    msg.try_into_bytes::<16>().unwrap()
  }

  #[test]
  fn delta_boundaries() {
    assert_eq!(&single_opt_bytes(12)[4..], &[12 << 4]);
    assert_eq!(&single_opt_bytes(13)[4..], &[13 << 4, 0]);
    assert_eq!(&single_opt_bytes(268)[4..], &[13 << 4, 255]);
    assert_eq!(&single_opt_bytes(269)[4..], &[14 << 4, 0, 0]);
    assert_eq!(&single_opt_bytes(270)[4..], &[14 << 4, 0, 1]);
  }

  #[test]
  fn delta_is_relative_to_previous_option() {
    let mut msg = Message::new(Type::Con, Code::GET, Id(0), Token::default());
    msg.opts.add(OptNumber(300), OptValue::default()).unwrap();
    msg.opts.add(OptNumber(1), OptValue::default()).unwrap();
    let bytes = msg.try_into_bytes::<16>().unwrap();

    // 1, then 300 - 1 = 299 = 269 + 30
    assert_eq!(&bytes[4..], &[1 << 4, 14 << 4, 0, 30]);
  }

  #[test]
  fn length_boundaries() {
    let len_nibble = |len: usize| {
      let mut msg = Message::new(Type::Con, Code::GET, Id(0), Token::default());
      msg.opts
         .add(OptNumber::URI_PATH, OptValue::from_slice(&vec![b'a'; len]).unwrap())
         .unwrap();
      let bytes = msg.try_into_bytes::<128>().unwrap();
      (bytes[4] & 0b1111, bytes.len())
    };

    assert_eq!(len_nibble(12), (12, 4 + 1 + 12));
    assert_eq!(len_nibble(13), (13, 4 + 1 + 1 + 13));
  }

  #[test]
  fn uint_options_are_minimal() {
    let mut msg = Message::new(Type::Con, Code::GET, Id(0), Token::default());
    msg.set_content_format(ContentFormat::Text).unwrap();
    msg.set_max_age(60).unwrap();
    let bytes = msg.try_into_bytes::<16>().unwrap();

    // Content-Format 0 has no value bytes, Max-Age 60 is one byte
    assert_eq!(&bytes[4..], &[12 << 4, 2 << 4 | 1, 60]);
  }

  #[test]
  fn no_payload_marker() {
    let msg = Message::new(Type::Con, Code::GET, Id(0), Token::default());
    assert_ne!(msg.try_into_bytes::<16>().unwrap().last(), Some(&0b11111111));
  }

  #[test]
  fn empty_message_ignores_token() {
    let msg = Message::new(Type::Ack, Code::EMPTY, Id(9), Token::from_slice(&[1, 2, 3]));
    assert_eq!(msg.try_into_bytes::<16>().unwrap().as_slice(),
               &[0b0110_0000, 0, 0, 9]);
  }

  #[test]
  fn too_long() {
    let (m, expected) = crate::test_msg();
    assert_eq!(m.try_into_bytes::<8>(),
               Err(MessageToBytesError::TooLong { capacity: 8,
                                                  size: expected.len() }));
  }

  #[test]
  fn header_too_long() {
    let mut msg = Message::new(Type::Con, Code::GET, Id(0), Token::default());
    for _ in 0..3 {
      msg.opts
         .add(OptNumber::URI_PATH, OptValue::from_slice(&[b'a'; MAX_OPT_VALUE_SIZE]).unwrap())
         .unwrap();
    }

    assert!(matches!(msg.try_into_bytes::<512>(),
                     Err(MessageToBytesError::HeaderTooLong(_))));
  }
}
