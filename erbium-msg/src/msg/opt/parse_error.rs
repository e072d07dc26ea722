use super::OptNumber;
use crate::Code;

/// Errors encounterable while parsing an option from bytes
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum OptParseError {
  /// Reached end of stream before parsing was finished
  UnexpectedEndOfStream,

  /// Option value was longer than the fixed capacity
  OptionValueTooLong { capacity: usize, actual: usize },

  /// Parsed more options than reserved capacity
  TooManyOptions(usize),

  /// Option Delta was set to 15, which is invalid.
  OptionDeltaReservedValue(u8),

  /// Value Length was set to 15, which is invalid.
  ValueLengthReservedValue(u8),

  /// The option number computed from the deltas does not fit
  OptionNumberOverflow,

  /// An option this implementation doesn't understand is critical
  UnsupportedCriticalOption(OptNumber),

  /// An unsigned integer option was longer than 4 bytes
  UintTooLong(OptNumber),

  /// A Block1 or Block2 option was longer than 3 bytes
  BlockTooLong(OptNumber),

  /// Proxy-Uri or Proxy-Scheme was present
  ProxyingNotSupported,
}

impl OptParseError {
  /// Shorthand for [`OptParseError::UnexpectedEndOfStream`]
  pub fn eof() -> Self {
    Self::UnexpectedEndOfStream
  }

  /// The response code a server answers this error with
  pub fn code(&self) -> Code {
    match self {
      | Self::UnexpectedEndOfStream
      | Self::OptionDeltaReservedValue(_)
      | Self::ValueLengthReservedValue(_)
      | Self::OptionNumberOverflow => Code::BAD_REQUEST,
      | Self::OptionValueTooLong { .. }
      | Self::TooManyOptions(_)
      | Self::UnsupportedCriticalOption(_)
      | Self::UintTooLong(_)
      | Self::BlockTooLong(_) => Code::BAD_OPTION,
      | Self::ProxyingNotSupported => Code::PROXYING_NOT_SUPPORTED,
    }
  }

  /// Short diagnostic sent as the payload of an error response
  pub fn message(&self) -> &'static str {
    match self {
      | Self::UnexpectedEndOfStream => "Truncated option",
      | Self::OptionValueTooLong { .. } => "Option value too long",
      | Self::TooManyOptions(_) => "Too many options",
      | Self::OptionDeltaReservedValue(_) | Self::ValueLengthReservedValue(_) => {
        "Reserved option nibble"
      },
      | Self::OptionNumberOverflow => "Option number overflow",
      | Self::UnsupportedCriticalOption(_) => "Unsupported critical option",
      | Self::UintTooLong(_) => "Integer option too long",
      | Self::BlockTooLong(_) => "Block option too long",
      | Self::ProxyingNotSupported => "This server does not support proxying",
    }
  }
}
