use super::MessageParseError;

/// Indicates if this message is of
/// type Confirmable (0), Non-confirmable (1), Acknowledgement (2), or Reset (3).
///
/// See [RFC7252 - Message Details](https://datatracker.ietf.org/doc/html/rfc7252#section-3) for context
#[derive(Copy, Clone, Hash, Eq, Ord, PartialEq, PartialOrd, Debug)]
pub enum Type {
  /// Some messages do not require an acknowledgement, e.g.
  /// readings from a sensor that are repeated regularly.
  Non,
  /// Some messages require an acknowledgement.  When no packets
  /// are lost, each Confirmable message elicits exactly one return
  /// message of type Acknowledgement or type Reset.
  ///
  /// Confirmable messages are retransmitted with exponential backoff
  /// until acknowledged or the retry budget runs out.
  Con,
  /// Acknowledges that a specific Confirmable message arrived,
  /// and may carry a piggybacked response.
  Ack,
  /// Indicates that a specific message was received, but some
  /// context is missing to properly process it.
  ///
  /// An empty Confirmable message ("CoAP ping") is answered with a Reset.
  Reset,
}

impl Default for Type {
  fn default() -> Self {
    Type::Con
  }
}

impl TryFrom<u8> for Type {
  type Error = MessageParseError;

  fn try_from(b: u8) -> Result<Self, Self::Error> {
    match b {
      | 0 => Ok(Type::Con),
      | 1 => Ok(Type::Non),
      | 2 => Ok(Type::Ack),
      | 3 => Ok(Type::Reset),
      | _ => Err(MessageParseError::InvalidType(b)),
    }
  }
}

impl From<Type> for u8 {
  fn from(t: Type) -> u8 {
    match t {
      | Type::Con => 0,
      | Type::Non => 1,
      | Type::Ack => 2,
      | Type::Reset => 3,
    }
  }
}
