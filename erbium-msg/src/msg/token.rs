use blake2::digest::consts::U8;
use blake2::{Blake2b, Digest};
use tinyvec::ArrayVec;

/// Message token for matching requests to responses
///
/// Note that this is NOT the same as the message ID,
/// since a response may be sent separately from its
/// ACK (and so have a different message id) but will
/// always carry the token of its request.
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct Token(pub ArrayVec<[u8; 8]>);

impl Token {
  /// Create a token from at most the first 8 bytes of `bytes`
  pub fn from_slice(bytes: &[u8]) -> Self {
    Token(bytes.iter().copied().take(8).collect())
  }

  /// Take an arbitrary-length sequence of bytes and turn it into an opaque message token
  ///
  /// Currently uses the BLAKE2 hashing algorithm, but this may change in the future.
  ///
  /// ```
  /// use erbium_msg::Token;
  ///
  /// let my_token = Token::opaque(&[0, 1, 2]);
  /// assert_eq!(my_token.0.len(), 8);
  /// assert_eq!(my_token, Token::opaque(&[0, 1, 2]));
  /// ```
  pub fn opaque(data: &[u8]) -> Token {
    let mut digest = Blake2b::<U8>::new();
    digest.update(data);
    Token(digest.finalize().into_iter().collect())
  }

  /// The token bytes
  pub fn as_bytes(&self) -> &[u8] {
    &self.0
  }
}
