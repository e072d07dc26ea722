use core::fmt::Display;
use core::ops::Deref;

use tinyvec::ArrayVec;

/// A writeable byte buffer
///
/// (allows using `write!` without allocations)
///
/// ```
/// use core::fmt::Write as _;
///
/// use erbium_common::Writable;
///
/// let mut faux_string = Writable::<16>::default();
/// write!(faux_string, "{}", 123).unwrap();
///
/// assert_eq!(faux_string.as_str(), "123");
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Writable<const N: usize>(ArrayVec<[u8; N]>);

impl<const N: usize> Writable<N> {
  /// Read the data in the buffer as a UTF8 string slice
  ///
  /// Only whole `&str`s are ever written, so this
  /// only fails to be valid UTF8 if the buffer was
  /// filled through [`Writable::from`] with arbitrary bytes;
  /// in that case the valid prefix is returned.
  pub fn as_str(&self) -> &str {
    match core::str::from_utf8(&self.0) {
      | Ok(s) => s,
      | Err(e) => core::str::from_utf8(&self.0[..e.valid_up_to()]).unwrap_or_default(),
    }
  }

  /// Get the collection wrapped by this `Writable`
  pub fn unwrap(self) -> ArrayVec<[u8; N]> {
    self.0
  }
}

impl<const N: usize> Display for Writable<N> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl<const N: usize> From<ArrayVec<[u8; N]>> for Writable<N> {
  fn from(a: ArrayVec<[u8; N]>) -> Self {
    Self(a)
  }
}

impl<const N: usize> Deref for Writable<N> {
  type Target = [u8];

  fn deref(&self) -> &[u8] {
    &self.0
  }
}

impl<const N: usize> AsRef<str> for Writable<N> {
  fn as_ref(&self) -> &str {
    self.as_str()
  }
}

impl<const N: usize> core::fmt::Write for Writable<N> {
  fn write_str(&mut self, s: &str) -> core::fmt::Result {
    if self.0.len() + s.len() > N {
      Err(core::fmt::Error)
    } else {
      self.0.extend(s.bytes());
      Ok(())
    }
  }
}
