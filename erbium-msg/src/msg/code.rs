use erbium_common::Writable;

/// # Message Code
/// A message's code is split into a class (3 bits) and a detail (5 bits).
///
/// Requests use class 0 (`0.01 GET` .. `0.04 DELETE`), responses use
/// class 2 (success), 4 (client error) or 5 (server error), and
/// `0.00` is reserved for empty messages (pings, empty ACKs & RSTs).
///
/// ```
/// use erbium_msg::Code;
///
/// assert_eq!(u8::from(Code::CONTENT), 0b010_00101);
/// assert_eq!(Code::from(0b100_00100), Code::NOT_FOUND);
/// assert_eq!(Code::NOT_FOUND.to_human().as_str(), "4.04");
/// ```
#[derive(Copy, Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Code {
  /// The "class" of message code (`2` in `2.05`)
  pub class: u8,
  /// The "detail" of message code (`05` in `2.05`)
  pub detail: u8,
}

macro_rules! code {
  ($(#[$meta:meta])* $name:ident = $class:literal * $detail:literal) => {
    $(#[$meta])*
    pub const $name: Code = Code { class: $class, detail: $detail };
  };
}

impl Code {
  /// Create a new Code
  pub const fn new(class: u8, detail: u8) -> Self {
    Self { class, detail }
  }

  code!(
    /// `0.00` - empty message
    EMPTY = 0 * 00
  );
  code!(
    /// `0.01`
    GET = 0 * 01
  );
  code!(
    /// `0.02`
    POST = 0 * 02
  );
  code!(
    /// `0.03`
    PUT = 0 * 03
  );
  code!(
    /// `0.04`
    DELETE = 0 * 04
  );

  code!(
    /// `2.01`
    CREATED = 2 * 01
  );
  code!(
    /// `2.02`
    DELETED = 2 * 02
  );
  code!(
    /// `2.03`
    VALID = 2 * 03
  );
  code!(
    /// `2.04`
    CHANGED = 2 * 04
  );
  code!(
    /// `2.05`
    CONTENT = 2 * 05
  );
  code!(
    /// `2.31` - a Block1 piece was accepted and more are expected
    CONTINUE = 2 * 31
  );

  code!(
    /// `4.00`
    BAD_REQUEST = 4 * 00
  );
  code!(
    /// `4.01`
    UNAUTHORIZED = 4 * 01
  );
  code!(
    /// `4.02`
    BAD_OPTION = 4 * 02
  );
  code!(
    /// `4.03`
    FORBIDDEN = 4 * 03
  );
  code!(
    /// `4.04`
    NOT_FOUND = 4 * 04
  );
  code!(
    /// `4.05`
    METHOD_NOT_ALLOWED = 4 * 05
  );
  code!(
    /// `4.06`
    NOT_ACCEPTABLE = 4 * 06
  );
  code!(
    /// `4.08`
    REQUEST_ENTITY_INCOMPLETE = 4 * 08
  );
  code!(
    /// `4.12`
    PRECONDITION_FAILED = 4 * 12
  );
  code!(
    /// `4.13`
    REQUEST_ENTITY_TOO_LARGE = 4 * 13
  );
  code!(
    /// `4.15`
    UNSUPPORTED_CONTENT_FORMAT = 4 * 15
  );

  code!(
    /// `5.00`
    INTERNAL_SERVER_ERROR = 5 * 00
  );
  code!(
    /// `5.01`
    NOT_IMPLEMENTED = 5 * 01
  );
  code!(
    /// `5.02`
    BAD_GATEWAY = 5 * 02
  );
  code!(
    /// `5.03`
    SERVICE_UNAVAILABLE = 5 * 03
  );
  code!(
    /// `5.04`
    GATEWAY_TIMEOUT = 5 * 04
  );
  code!(
    /// `5.05`
    PROXYING_NOT_SUPPORTED = 5 * 05
  );

  /// Get the human string representation of a message code
  ///
  /// ```
  /// use erbium_msg::Code;
  ///
  /// let code = Code { class: 2, detail: 5 };
  /// assert_eq!(code.to_human().as_str(), "2.05");
  /// ```
  pub fn to_human(&self) -> Writable<4> {
    let to_char = |d: u8| char::from_digit(d.into(), 10).unwrap_or('?');
    let mut out = Writable::<4>::default();
    let chars = [to_char(self.class % 10),
                 '.',
                 to_char(self.detail / 10 % 10),
                 to_char(self.detail % 10)];
    chars.iter()
         .for_each(|c| {
           core::fmt::Write::write_char(&mut out, *c).ok();
         });
    out
  }

  /// Whether this code is `0.00`
  pub fn is_empty(&self) -> bool {
    *self == Self::EMPTY
  }

  /// Whether this code is one of the request methods (`0.01` - `0.04`)
  pub fn is_request(&self) -> bool {
    self.class == 0 && (1..=4).contains(&self.detail)
  }

  /// Whether this code is a response code (class 2 through 5)
  pub fn is_response(&self) -> bool {
    (2..=5).contains(&self.class)
  }
}

impl From<u8> for Code {
  fn from(b: u8) -> Self {
    Code { class: b >> 5,
           detail: b & 0b0001_1111 }
  }
}

impl From<Code> for u8 {
  fn from(code: Code) -> u8 {
    (code.class << 5) | (code.detail & 0b0001_1111)
  }
}
