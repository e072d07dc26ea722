use super::opt::parse_error::OptParseError;
use super::Code;

/// Errors encounterable while parsing a message from bytes
///
/// Every variant corresponds to the response code
/// a server should send back, see [`MessageParseError::code`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum MessageParseError {
  /// Reached end of stream before parsing was finished
  UnexpectedEndOfStream,

  /// Only version 1 of the protocol is understood
  UnsupportedVersion(u8),

  /// Token length was > 8
  InvalidTokenLength(u8),

  /// Error parsing option
  OptParseError(OptParseError),

  /// A payload marker was present but no payload followed it
  EmptyPayload,

  /// The message type is invalid (see [`Type`](super::Type) for information & valid values)
  InvalidType(u8),

  /// Payload was larger than the capacity of the message
  PayloadTooLong(usize),
}

impl MessageParseError {
  /// Shorthand for [`MessageParseError::UnexpectedEndOfStream`]
  pub fn eof() -> Self {
    Self::UnexpectedEndOfStream
  }

  /// The response code a server answers this error with
  ///
  /// ```
  /// use erbium_msg::{Code, MessageParseError, OptParseError, OptNumber};
  ///
  /// assert_eq!(MessageParseError::UnsupportedVersion(2).code(), Code::BAD_REQUEST);
  /// assert_eq!(MessageParseError::OptParseError(OptParseError::UnsupportedCriticalOption(OptNumber(9))).code(),
  ///            Code::BAD_OPTION);
  /// ```
  pub fn code(&self) -> Code {
    match self {
      | Self::OptParseError(e) => e.code(),
      | Self::PayloadTooLong(_) => Code::REQUEST_ENTITY_TOO_LARGE,
      | _ => Code::BAD_REQUEST,
    }
  }

  /// Short diagnostic sent as the payload of an error response
  pub fn message(&self) -> &'static str {
    match self {
      | Self::UnexpectedEndOfStream => "Truncated message",
      | Self::UnsupportedVersion(_) => "Unsupported CoAP version",
      | Self::InvalidTokenLength(_) => "Invalid token length",
      | Self::OptParseError(e) => e.message(),
      | Self::EmptyPayload => "Payload marker without payload",
      | Self::InvalidType(_) => "Invalid message type",
      | Self::PayloadTooLong(_) => "Payload too large",
    }
  }
}

impl From<OptParseError> for MessageParseError {
  fn from(e: OptParseError) -> Self {
    Self::OptParseError(e)
  }
}
