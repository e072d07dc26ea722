use erbium_common::Cursor;

use crate::*;

/// Trait for converting a sequence of bytes into some data structure
pub trait TryFromBytes: Sized {
  /// Error type yielded if conversion fails
  type Error;

  /// Try to convert from some sequence of bytes `T`
  /// into `Self`
  ///
  /// ```
  /// use erbium_msg::{Code, Message, TryFromBytes, Type};
  ///
  /// let bytes = [0b0101_0000u8, 0b0100_0101, 0, 1];
  /// let msg = Message::try_from_bytes(&bytes).unwrap();
  ///
  /// assert_eq!(msg.ty, Type::Non);
  /// assert_eq!(msg.code, Code::CONTENT);
  /// ```
  fn try_from_bytes<T: AsRef<[u8]>>(bytes: T) -> Result<Self, Self::Error>;
}

impl TryFromBytes for Message {
  type Error = MessageParseError;

  fn try_from_bytes<T: AsRef<[u8]>>(bytes: T) -> Result<Self, Self::Error> {
    let mut bytes = Cursor::new(bytes);

    let (byte1, code, id) = match bytes.take_exact(4) {
      | Some(&[b1, code, id0, id1]) => (b1, code, Id::from_be_bytes([id0, id1])),
      | _ => return Err(MessageParseError::eof()),
    };

    let ver = byte1 >> 6;
    if ver != 1 {
      return Err(MessageParseError::UnsupportedVersion(ver));
    }

    let ty = Type::try_from((byte1 >> 4) & 0b11)?;

    let tkl = byte1 & 0b1111;
    if tkl > 8 {
      return Err(MessageParseError::InvalidTokenLength(tkl));
    }

    let token = bytes.take_exact(tkl as usize)
                     .map(Token::from_slice)
                     .ok_or_else(MessageParseError::eof)?;

    let mut msg = Message::new(ty, Code::from(code), id, token);
    let mut number = 0u32;

    loop {
      match bytes.next() {
        | None => break,
        | Some(0xFF) => {
          let payload = bytes.take_until_end();
          if payload.is_empty() {
            return Err(MessageParseError::EmptyPayload);
          }

          msg.set_payload(payload)
             .map_err(|PayloadTooLong(n)| MessageParseError::PayloadTooLong(n))?;
          break;
        },
        | Some(head) => {
          let delta = opt::parse_opt_len_or_delta(head >> 4,
                                                  &mut bytes,
                                                  OptParseError::OptionDeltaReservedValue(15))?;
          let len = opt::parse_opt_len_or_delta(head & 0b1111,
                                                &mut bytes,
                                                OptParseError::ValueLengthReservedValue(15))?;

          number += u32::from(delta);

          let value = bytes.take_exact(len as usize)
                           .ok_or_else(OptParseError::eof)?;

          accept_opt(&mut msg.opts, OptNumber(number), value)?;
        },
      }
    }

    Ok(msg)
  }
}

/// Store a freshly parsed option if it is understood,
/// skip it if it's elective, and reject it otherwise.
fn accept_opt(opts: &mut Opts, n: OptNumber, value: &[u8]) -> Result<(), OptParseError> {
  if n == OptNumber::PROXY_URI || n == OptNumber::PROXY_SCHEME {
    return Err(OptParseError::ProxyingNotSupported);
  }

  let value = match n.format() {
    | None => match n.must_be_processed() {
      | OptionMustBeProcessed::Yes => return Err(OptParseError::UnsupportedCriticalOption(n)),
      | OptionMustBeProcessed::No => return Ok(()),
    },
    | Some(OptFormat::Uint) if value.len() > 4 => return Err(OptParseError::UintTooLong(n)),
    | Some(OptFormat::Uint) if n.is_block() && value.len() > 3 => {
      return Err(OptParseError::BlockTooLong(n))
    },
    | Some(OptFormat::Opaque) => &value[..value.len().min(8)],
    | Some(_) => value,
  };

  let value =
    OptValue::from_slice(value).map_err(|_| OptParseError::OptionValueTooLong { capacity:
                                                                                  MAX_OPT_VALUE_SIZE,
                                                                                actual:
                                                                                  value.len() })?;

  opts.add(n, value)
      .map_err(|_| OptParseError::TooManyOptions(MAX_OPTS))
}
