use erbium_common::Cursor;
use tinyvec::ArrayVec;

use crate::{MAX_OPTS, MAX_OPT_VALUE_SIZE};

#[allow(missing_docs)]
pub mod parse_error;
pub use parse_error::*;

/// Block1 / Block2 descriptors
pub mod block;
pub use block::*;

/// Content-Format values
pub mod content_format;
pub use content_format::*;

pub(crate) fn parse_opt_len_or_delta<A: AsRef<[u8]>>(head: u8,
                                                     bytes: &mut Cursor<A>,
                                                     reserved_err: OptParseError)
                                                     -> Result<u16, OptParseError> {
  match head {
    | 13 => {
      let n = bytes.next().ok_or_else(OptParseError::eof)?;
      Ok((n as u16) + 13)
    },
    | 14 => match bytes.take_exact(2) {
      | Some(&[a, b]) => u16::from_be_bytes([a, b]).checked_add(269)
                                                    .ok_or(OptParseError::OptionNumberOverflow),
      | _ => Err(OptParseError::eof()),
    },
    | 15 => Err(reserved_err),
    | _ => Ok(head as u16),
  }
}

/// # Option Numbers
/// Options are identified by a number; on the wire only the
/// difference to the previous option's number (the "delta") is
/// transmitted, so options must be written in ascending order.
///
/// Odd numbers are "critical": a recipient that does not
/// understand a critical option must reject the message.
/// Even numbers are "elective" and may be silently ignored.
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct OptNumber(pub u32);

/// Whether an option may be ignored by a recipient that doesn't understand it
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum OptionMustBeProcessed {
  /// This option must be processed,
  /// and a message that ignores it
  /// will be rejected.
  ///
  /// Corresponds to the option being "critical"
  /// in strict CoAP terms
  Yes,
  /// This option does not _need_ to
  /// be processed.
  ///
  /// Corresponds to the option being "elective"
  /// in strict CoAP terms
  No,
}

/// How the value of a known option is interpreted
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum OptFormat {
  /// Zero-length value (If-None-Match)
  Empty,
  /// Sequence of bytes (ETag, If-Match)
  Opaque,
  /// Big-endian unsigned integer of at most 4 bytes
  Uint,
  /// UTF-8 string
  String,
}

macro_rules! opt_numbers {
  ($($(#[$meta:meta])* $name:ident = $n:literal;)*) => {
    impl OptNumber {
      $(
        $(#[$meta])*
        pub const $name: OptNumber = OptNumber($n);
      )*
    }
  };
}

opt_numbers! {
  /// `1` - Opaque, repeatable, critical
  IF_MATCH = 1;
  /// `3` - String, critical
  URI_HOST = 3;
  /// `4` - Opaque, repeatable, elective
  ETAG = 4;
  /// `5` - Empty, critical
  IF_NONE_MATCH = 5;
  /// `6` - Uint, elective
  OBSERVE = 6;
  /// `7` - Uint, critical
  URI_PORT = 7;
  /// `8` - String, repeatable, elective
  LOCATION_PATH = 8;
  /// `11` - String, repeatable, critical
  URI_PATH = 11;
  /// `12` - Uint, elective
  CONTENT_FORMAT = 12;
  /// `14` - Uint, elective
  MAX_AGE = 14;
  /// `15` - String, repeatable, critical
  URI_QUERY = 15;
  /// `17` - Uint, critical
  ACCEPT = 17;
  /// `20` - String, repeatable, elective
  LOCATION_QUERY = 20;
  /// `23` - Uint, critical
  BLOCK2 = 23;
  /// `27` - Uint, critical
  BLOCK1 = 27;
  /// `28` - Uint, elective
  SIZE2 = 28;
  /// `35` - String, critical
  PROXY_URI = 35;
  /// `39` - String, critical
  PROXY_SCHEME = 39;
  /// `60` - Uint, elective
  SIZE1 = 60;
}

impl OptNumber {
  /// Whether or not this option may be ignored by a server
  pub fn must_be_processed(&self) -> OptionMustBeProcessed {
    match self.0 & 0b1 {
      | 1 => OptionMustBeProcessed::Yes,
      | _ => OptionMustBeProcessed::No,
    }
  }

  /// Value format of this option, or `None` if this option isn't understood
  pub fn format(&self) -> Option<OptFormat> {
    match *self {
      | Self::IF_NONE_MATCH => Some(OptFormat::Empty),
      | Self::IF_MATCH | Self::ETAG => Some(OptFormat::Opaque),
      | Self::OBSERVE
      | Self::URI_PORT
      | Self::CONTENT_FORMAT
      | Self::MAX_AGE
      | Self::ACCEPT
      | Self::BLOCK2
      | Self::BLOCK1
      | Self::SIZE2
      | Self::SIZE1 => Some(OptFormat::Uint),
      | Self::URI_HOST
      | Self::LOCATION_PATH
      | Self::URI_PATH
      | Self::URI_QUERY
      | Self::LOCATION_QUERY
      | Self::PROXY_URI
      | Self::PROXY_SCHEME => Some(OptFormat::String),
      | _ => None,
    }
  }

  /// Block1 or Block2
  pub fn is_block(&self) -> bool {
    matches!(*self, Self::BLOCK1 | Self::BLOCK2)
  }

  /// Whether this option may occur more than once in a message
  pub fn repeatable(&self) -> bool {
    matches!(*self,
             Self::IF_MATCH
             | Self::ETAG
             | Self::LOCATION_PATH
             | Self::URI_PATH
             | Self::URI_QUERY
             | Self::LOCATION_QUERY)
  }
}

/// The value of an option
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct OptValue(pub ArrayVec<[u8; MAX_OPT_VALUE_SIZE]>);

impl OptValue {
  /// Copy `bytes` into a new option value
  pub fn from_slice(bytes: &[u8]) -> Result<Self, SetOptionError> {
    if bytes.len() > MAX_OPT_VALUE_SIZE {
      return Err(SetOptionError::ValueTooLong(bytes.len()));
    }

    Ok(OptValue(bytes.iter().copied().collect()))
  }

  /// Encode an unsigned integer using as few bytes as possible
  ///
  /// ```
  /// use erbium_msg::OptValue;
  ///
  /// assert_eq!(OptValue::from_uint(0).as_bytes(), &[]);
  /// assert_eq!(OptValue::from_uint(0x80).as_bytes(), &[0x80]);
  /// assert_eq!(OptValue::from_uint(0x1234).as_bytes(), &[0x12, 0x34]);
  /// assert_eq!(OptValue::from_uint(0x12345).as_bytes(), &[0x01, 0x23, 0x45]);
  /// ```
  pub fn from_uint(n: u32) -> Self {
    let bytes = n.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    OptValue(bytes[skip..].iter().copied().collect())
  }

  /// Interpret this value as a big-endian unsigned integer
  ///
  /// Returns `None` when the value is longer than 4 bytes.
  pub fn as_uint(&self) -> Option<u32> {
    if self.0.len() > 4 {
      None
    } else {
      Some(self.0.iter().fold(0u32, |n, b| (n << 8) | u32::from(*b)))
    }
  }

  /// Interpret this value as a UTF-8 string
  pub fn as_str(&self) -> Option<&str> {
    core::str::from_utf8(&self.0).ok()
  }

  /// The raw value
  pub fn as_bytes(&self) -> &[u8] {
    &self.0
  }
}

/// A single option
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct Opt {
  /// See [`OptNumber`]
  pub number: OptNumber,
  /// See [`OptValue`]
  pub value: OptValue,
}

/// Errors encounterable while adding options to a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SetOptionError {
  /// The message already holds as many options as it can
  TooManyOptions,
  /// The value is longer than an option value may be
  ValueTooLong(usize),
}

/// The options of a message, kept sorted by [`OptNumber`].
///
/// Options with the same number keep the order in which they
/// were added, so repeatable options (e.g. Uri-Path segments)
/// serialize in the order they were given.
///
/// ```
/// use erbium_msg::{OptNumber, OptValue, Opts};
///
/// let mut opts = Opts::default();
/// opts.add(OptNumber::URI_QUERY, OptValue::from_slice(b"a=1").unwrap()).unwrap();
/// opts.add(OptNumber::URI_PATH, OptValue::from_slice(b"b").unwrap()).unwrap();
/// opts.add(OptNumber::URI_PATH, OptValue::from_slice(b"c").unwrap()).unwrap();
///
/// let numbers = opts.iter().map(|o| o.number.0).collect::<Vec<_>>();
/// assert_eq!(numbers, vec![11, 11, 15]);
/// ```
#[derive(Copy, Clone, Hash, PartialEq, Eq, Debug, Default)]
pub struct Opts(ArrayVec<[Opt; MAX_OPTS]>);

impl Opts {
  /// Iterate over all options in ascending order
  pub fn iter(&self) -> impl Iterator<Item = &Opt> {
    self.0.iter()
  }

  /// Number of options
  pub fn len(&self) -> usize {
    self.0.len()
  }

  /// Whether there are no options
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Get the first value of option `n`
  pub fn get(&self, n: OptNumber) -> Option<&OptValue> {
    self.get_all(n).next()
  }

  /// Get all values of option `n`, in insertion order
  pub fn get_all(&self, n: OptNumber) -> impl Iterator<Item = &OptValue> {
    self.0.iter().filter(move |o| o.number == n).map(|o| &o.value)
  }

  /// Whether option `n` is present
  pub fn contains(&self, n: OptNumber) -> bool {
    self.get(n).is_some()
  }

  /// Add a value for option `n` after any existing values of `n`
  pub fn add(&mut self, n: OptNumber, value: OptValue) -> Result<(), SetOptionError> {
    if self.0.len() >= MAX_OPTS {
      return Err(SetOptionError::TooManyOptions);
    }

    let ix = self.0.iter().take_while(|o| o.number <= n).count();
    self.0.insert(ix, Opt { number: n, value });
    Ok(())
  }

  /// Replace all values of option `n` with `value`
  pub fn set(&mut self, n: OptNumber, value: OptValue) -> Result<(), SetOptionError> {
    self.remove(n);
    self.add(n, value)
  }

  /// Remove all values of option `n`
  pub fn remove(&mut self, n: OptNumber) {
    self.0.retain(|o| o.number != n);
  }
}
