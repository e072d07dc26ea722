use embedded_time::duration::Milliseconds;
use embedded_time::Instant;

/// A duration, in milliseconds
pub type Millis = embedded_time::duration::Milliseconds<u64>;

/// Supertrait of [`embedded_time::Clock`] pinning the
/// type of "ticks" to u64
pub trait Clock: embedded_time::Clock<T = u64> {}
impl<C: embedded_time::Clock<T = u64>> Clock for C {}

/// Milliseconds elapsed between the clock's epoch and `instant`.
///
/// Saturates at zero if the clock's tick rate can't be expressed in milliseconds.
pub fn millis_since_epoch<C: Clock>(instant: Instant<C>) -> u64 {
  Millis::try_from(instant.duration_since_epoch()).map(|Milliseconds(ms)| ms)
                                                  .unwrap_or(0)
}

/// `instant` pushed `by` into the future.
///
/// Yields `instant` unchanged if the addition would overflow the clock.
pub fn later<C: Clock>(instant: Instant<C>, by: Millis) -> Instant<C> {
  instant.checked_add(by).unwrap_or(instant)
}

/// Milliseconds elapsed between `earlier` and `now`, zero if `earlier` is in the future.
pub fn elapsed<C: Clock>(earlier: Instant<C>, now: Instant<C>) -> Millis {
  now.checked_duration_since(&earlier)
     .and_then(|dur| Millis::try_from(dur).ok())
     .unwrap_or(Milliseconds(0))
}
