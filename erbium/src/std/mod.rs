use embedded_time::rate::Fraction;

mod net;
pub use net::{from_std, local_addr, to_std};

/// Monotonic [`embedded_time::Clock`] counting microseconds since it was created
#[derive(Debug, Clone, Copy)]
pub struct Clock {
  epoch: ::std::time::Instant,
}

impl Default for Clock {
  fn default() -> Self {
    Self::new()
  }
}

impl Clock {
  /// A clock whose epoch is now
  pub fn new() -> Self {
    Self { epoch: ::std::time::Instant::now() }
  }
}

impl embedded_time::Clock for Clock {
  type T = u64;

  const SCALING_FACTOR: Fraction = Fraction::new(1, 1_000_000);

  fn try_now(&self) -> Result<embedded_time::Instant<Self>, embedded_time::clock::Error> {
    let micros = u64::try_from(self.epoch.elapsed().as_micros()).map_err(|_| embedded_time::clock::Error::Unspecified)?;
    Ok(embedded_time::Instant::new(micros))
  }
}
