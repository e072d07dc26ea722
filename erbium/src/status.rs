use erbium_msg::{Code, MessageParseError};

/// Outcome of processing one inbound datagram.
///
/// Besides the CoAP response codes an error reply can carry,
/// there are a handful of internal outcomes that never travel
/// over the wire as-is; [`Status::raw`] numbers them from 192
/// up, and [`Status::reply_code`] collapses them to `5.00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
  /// Everything went fine
  NoError,
  /// Reply with an error response carrying `code` and `message` as its payload
  Respond {
    /// Response code of the error reply
    code: Code,
    /// Diagnostic text sent as the error reply's payload
    message: &'static str,
  },
  /// A fixed-capacity buffer was too small for the response
  MemoryAllocationError,
  /// The response could not be serialized
  PacketSerializationError,
  /// The resource took responsibility for replying; send nothing
  ManualResponse,
  /// A CoAP ping arrived and must be answered with RST
  PingResponse,
}

impl Status {
  /// Numeric status code; the response code for [`Status::Respond`]
  ///
  /// ```
  /// use erbium::Status;
  /// use erbium_msg::Code;
  ///
  /// assert_eq!(Status::NoError.raw(), 0);
  /// assert_eq!(Status::PacketSerializationError.raw(), 193);
  /// assert_eq!(Status::Respond { code: Code::BAD_OPTION, message: "" }.raw(), 130);
  /// ```
  pub fn raw(&self) -> u8 {
    match self {
      | Self::NoError => 0,
      | Self::Respond { code, .. } => (*code).into(),
      | Self::MemoryAllocationError => 192,
      | Self::PacketSerializationError => 193,
      | Self::ManualResponse => 194,
      | Self::PingResponse => 195,
    }
  }

  /// Code sent in the error reply for this status
  pub fn reply_code(&self) -> Code {
    match self {
      | Self::PingResponse => Code::EMPTY,
      | Self::Respond { code, .. } => *code,
      | _ if self.raw() >= 192 => Code::INTERNAL_SERVER_ERROR,
      | _ => Code::EMPTY,
    }
  }

  /// Diagnostic payload of the error reply for this status
  pub fn message(&self) -> &'static str {
    match self {
      | Self::Respond { message, .. } => message,
      | Self::MemoryAllocationError => "MemoryAllocError",
      | Self::PacketSerializationError => "PacketSerializationError",
      | _ => "",
    }
  }

  /// Whether an error reply goes out for this status
  pub fn is_error(&self) -> bool {
    !matches!(self, Self::NoError | Self::ManualResponse)
  }

  pub(crate) fn respond(code: Code, message: &'static str) -> Self {
    Self::Respond { code, message }
  }
}

impl From<MessageParseError> for Status {
  fn from(e: MessageParseError) -> Self {
    Self::respond(e.code(), e.message())
  }
}
