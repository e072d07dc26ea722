/// A cursor over a byte array (std- and alloc-less port of [`std::io::Cursor`])
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cursor<T> {
  t: T,
  cursor: usize,
}

impl<T: AsRef<[u8]>> Cursor<T> {
  /// Creates a new cursor
  pub fn new(t: T) -> Cursor<T> {
    Cursor { t, cursor: 0 }
  }

  /// Unwraps the cursor, discarding its internal position
  pub fn into_inner(self) -> T {
    self.t
  }

  fn len(&self) -> usize {
    self.t.as_ref().len()
  }

  /// Take the next byte in the cursor, returning None
  /// if the cursor is exhausted.
  ///
  /// Runs in O(1) time.
  pub fn next(&mut self) -> Option<u8> {
    self.take_exact(1).map(|a| a[0])
  }

  /// Take `n` bytes from the cursor, stopping early if
  /// the end of the buffer is encountered.
  ///
  /// Runs in O(1) time.
  pub fn take(&mut self, n: usize) -> &[u8] {
    let n = n.min(self.remaining());
    let start = self.cursor;
    self.cursor += n;
    &self.t.as_ref()[start..start + n]
  }

  /// Take `n` bytes from the cursor, returning None if
  /// the end of the buffer is encountered.
  ///
  /// Runs in O(1) time.
  pub fn take_exact(&mut self, n: usize) -> Option<&[u8]> {
    if n > self.remaining() {
      None
    } else {
      let start = self.cursor;
      self.cursor += n;
      Some(&self.t.as_ref()[start..start + n])
    }
  }

  /// Without advancing the position, look at the next
  /// `n` bytes, returning None if there are less than `n` bytes
  /// remaining.
  ///
  /// Runs in O(1) time.
  pub fn peek_exact(&self, n: usize) -> Option<&[u8]> {
    if n > self.remaining() {
      None
    } else {
      Some(&self.t.as_ref()[self.cursor..self.cursor + n])
    }
  }

  /// Whether the cursor has reached the end
  /// of the buffer.
  ///
  /// Runs in O(1) time.
  pub fn is_exhausted(&self) -> bool {
    self.cursor >= self.len()
  }

  /// Number of bytes that have not been consumed yet
  pub fn remaining(&self) -> usize {
    self.len().saturating_sub(self.cursor)
  }

  /// Consume and return the bytes remaining in the buffer
  ///
  /// Runs in O(1) time.
  pub fn take_until_end(&mut self) -> &[u8] {
    let start = self.cursor.min(self.len());
    self.cursor = self.len();
    &self.t.as_ref()[start..]
  }

  /// Get the position the cursor points to within
  /// the buffer
  pub fn position(&self) -> usize {
    self.cursor
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  pub fn next() {
    let mut cur = Cursor::new([1u8]);
    assert_eq!(cur.next(), Some(1));
    assert_eq!(cur.next(), None);
    assert_eq!(cur.next(), None);
  }

  #[test]
  pub fn take() {
    let mut cur = Cursor::new([1u8, 2, 3]);
    assert_eq!(cur.take(2), &[1, 2]);
    assert_eq!(cur.take(4), &[3]);
    assert_eq!(cur.take(1), &[] as &[u8]);
  }

  #[test]
  pub fn take_exact() {
    let mut cur = Cursor::new([1u8, 2, 3]);
    assert_eq!(cur.take_exact(2), Some([1, 2].as_ref()));
    assert_eq!(cur.take_exact(2), None);
    assert_eq!(cur.position(), 2);
    assert_eq!(cur.take_exact(1), Some([3].as_ref()));
    assert!(cur.is_exhausted());
  }

  #[test]
  pub fn peek_exact() {
    let cur = Cursor::new([1u8, 2, 3]);
    assert_eq!(cur.peek_exact(3), Some([1, 2, 3].as_ref()));
    assert_eq!(cur.peek_exact(4), None);
    assert_eq!(cur.position(), 0);
  }

  #[test]
  pub fn single_byte_buffer_is_not_exhausted_until_read() {
    let mut cur = Cursor::new([0xFFu8]);
    assert!(!cur.is_exhausted());
    assert_eq!(cur.remaining(), 1);
    cur.next();
    assert!(cur.is_exhausted());
  }

  #[test]
  pub fn take_until_end() {
    let mut cur = Cursor::new([1u8, 2, 3, 4]);
    cur.next();
    assert_eq!(cur.take_until_end(), &[2, 3, 4]);
    assert_eq!(cur.take_until_end(), &[] as &[u8]);
    assert_eq!(cur.remaining(), 0);
  }
}
