use core::ops::RangeInclusive;

use embedded_time::duration::Milliseconds;
use embedded_time::Instant;
use rand::{Rng, SeedableRng};

use crate::time::{self, Clock, Millis};

/// A non-blocking timer that lives alongside a message
/// awaiting acknowledgement, deciding when it should be
/// transmitted again and when to give up on it.
///
/// The first transmission happens before the timer is created;
/// each [`YouShould::Retry`] accounts for one more.
///
/// ```
/// use embedded_time::duration::Milliseconds;
/// use embedded_time::rate::Fraction;
/// use embedded_time::Instant;
/// use erbium::retry::{Attempts, RetryTimer, Strategy, YouShould};
///
/// # #[derive(Debug)]
/// # struct Millis;
/// # impl embedded_time::Clock for Millis {
/// #   type T = u64;
/// #   const SCALING_FACTOR: Fraction = Fraction::new(1, 1000);
/// #   fn try_now(&self) -> Result<Instant<Self>, embedded_time::clock::Error> {
/// #     Ok(Instant::new(0))
/// #   }
/// # }
/// let strategy = Strategy::Delay { min: Milliseconds(100),
///                                  max: Milliseconds(100) };
/// let mut timer = RetryTimer::<Millis>::new(Instant::new(0), strategy, Attempts(2), 0);
///
/// assert_eq!(timer.what_should_i_do(Instant::new(99)), Err(nb::Error::WouldBlock));
/// assert_eq!(timer.what_should_i_do(Instant::new(100)), Ok(YouShould::Retry));
/// assert_eq!(timer.what_should_i_do(Instant::new(200)), Ok(YouShould::Cry));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RetryTimer<C: Clock> {
  next: Instant<C>,
  delay: Millis,
  strategy: Strategy,
  attempts: Attempts,
  max_attempts: Attempts,
}

/// A number of attempts
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Attempts(pub u16);

/// Result of [`RetryTimer.what_should_i_do`].
///
/// This tells you if a retry should be attempted or not.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum YouShould {
  /// Attempts have been exhausted and the work that is
  /// being retried should be considered poisoned.
  Cry,
  /// A retry should be performed
  Retry,
}

impl<C: Clock> RetryTimer<C> {
  /// Create a new retrier for work first attempted at `start`.
  ///
  /// `seed` is mixed into the jitter so that timers created
  /// in the same millisecond don't fire in lockstep.
  pub fn new(start: Instant<C>, strategy: Strategy, max_attempts: Attempts, seed: u64) -> Self {
    let delay = if strategy.has_jitter() {
      let mut rand =
        rand_chacha::ChaCha8Rng::seed_from_u64(time::millis_since_epoch(start) ^ seed);
      Milliseconds(rand.gen_range(strategy.range()))
    } else {
      Milliseconds(*strategy.range().start())
    };

    Self { next: time::later(start, delay),
           delay,
           strategy,
           attempts: Attempts(1),
           max_attempts }
  }

  /// Number of attempts made so far, including the first
  pub fn attempts(&self) -> Attempts {
    self.attempts
  }

  /// Instant at which the current attempt times out
  pub fn deadline(&self) -> Instant<C> {
    self.next
  }

  /// Ask the timer whether the work should be retried.
  ///
  /// Returns `nb::Error::WouldBlock` while the current attempt
  /// has not yet timed out. Once it has, yields [`YouShould::Cry`]
  /// when every attempt has been spent, otherwise records another
  /// attempt and yields [`YouShould::Retry`].
  pub fn what_should_i_do(&mut self,
                          now: Instant<C>)
                          -> nb::Result<YouShould, core::convert::Infallible> {
    if now < self.next {
      Err(nb::Error::WouldBlock)
    } else if self.attempts >= self.max_attempts {
      Ok(YouShould::Cry)
    } else {
      self.attempts.0 += 1;
      self.delay = self.strategy.next_delay(self.delay);
      self.next = time::later(now, self.delay);
      Ok(YouShould::Retry)
    }
  }
}

/// Strategy to employ when retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Strategy {
  /// Generate a random delay between `min` and `max`,
  /// and wait until this delay has passed between attempts.
  ///
  /// After each failed attempt, double the delay before retrying again.
  Exponential {
    /// Minimum (inclusive) delay for second attempt
    init_min: Milliseconds<u64>,
    /// Maximum (inclusive) delay for second attempt
    init_max: Milliseconds<u64>,
  },
  /// Generate a random delay between `min` and `max`,
  /// and wait until this delay has passed between attempts.
  Delay {
    /// Minimum (inclusive) delay for attempts
    min: Milliseconds<u64>,
    /// Maximum (inclusive) delay for attempts
    max: Milliseconds<u64>,
  },
}

impl Strategy {
  /// Are min & max delays the same? if so, we should probably skip the random number generation.
  pub fn has_jitter(&self) -> bool {
    let rng = self.range();
    rng.start() != rng.end()
  }

  /// Get the min & max durations as an inclusive range
  pub fn range(&self) -> RangeInclusive<u64> {
    match self {
      | &Self::Delay { min: Milliseconds(min),
                       max: Milliseconds(max), } => (min..=max),

      | &Self::Exponential { init_min: Milliseconds(min),
                             init_max: Milliseconds(max), } => (min..=max),
    }
  }

  /// Delay to wait after the attempt that waited `prev`
  pub fn next_delay(&self, Milliseconds(prev): Millis) -> Millis {
    match self {
      | Self::Exponential { .. } => Milliseconds(prev.saturating_mul(2)),
      | Self::Delay { .. } => Milliseconds(prev),
    }
  }

  /// Get the amount of time this strategy will take if all attempts fail
  pub fn max_time(&self, max_attempts: Attempts) -> Millis {
    let Milliseconds(init) = match self {
      | Self::Exponential { init_max, .. } => *init_max,
      | Self::Delay { max, .. } => *max,
    };

    Milliseconds((0..max_attempts.0).fold((0u64, init), |(total, delay), _| {
                                      let Milliseconds(next) =
                                        self.next_delay(Milliseconds(delay));
                                      (total.saturating_add(delay), next)
                                    })
                                    .0)
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::test::ClockMock;

  fn at(ms: u64) -> Instant<ClockMock> {
    Instant::new(ms)
  }

  #[test]
  fn delay_retrier() {
    let mut retry = RetryTimer::new(at(0),
                                    Strategy::Delay { min: Milliseconds(1000),
                                                      max: Milliseconds(1000) },
                                    Attempts(3),
                                    0);

    assert_eq!(retry.what_should_i_do(at(999)).unwrap_err(),
               nb::Error::WouldBlock);
    assert_eq!(retry.what_should_i_do(at(1000)).unwrap(), YouShould::Retry);

    // the delay counts from the retransmission, not the first attempt
    assert_eq!(retry.what_should_i_do(at(1999)).unwrap_err(),
               nb::Error::WouldBlock);
    assert_eq!(retry.what_should_i_do(at(10_000)).unwrap(), YouShould::Retry);
    assert_eq!(retry.what_should_i_do(at(10_500)).unwrap_err(),
               nb::Error::WouldBlock);
    assert_eq!(retry.what_should_i_do(at(11_000)).unwrap(), YouShould::Cry);
  }

  #[test]
  fn exponential_retrier() {
    let mut retry = RetryTimer::new(at(0),
                                    Strategy::Exponential { init_min: Milliseconds(1000),
                                                            init_max: Milliseconds(1000) },
                                    Attempts(5),
                                    0);

    let mut now = 0;
    for delay in [1000, 2000, 4000, 8000] {
      now += delay;
      assert_eq!(retry.what_should_i_do(at(now - 1)).unwrap_err(),
                 nb::Error::WouldBlock);
      assert_eq!(retry.what_should_i_do(at(now)).unwrap(), YouShould::Retry);
    }

    assert_eq!(retry.attempts(), Attempts(5));
    assert_eq!(retry.what_should_i_do(at(now + 15_999)).unwrap_err(),
               nb::Error::WouldBlock);
    assert_eq!(retry.what_should_i_do(at(now + 16_000)).unwrap(), YouShould::Cry);
  }

  #[test]
  fn jitter_stays_in_range() {
    let strategy = Strategy::Exponential { init_min: Milliseconds(3000),
                                           init_max: Milliseconds(4500) };

    (0..64u64).for_each(|seed| {
                let retry = RetryTimer::new(at(seed * 7), strategy, Attempts(5), seed);
                let Milliseconds(waited) = time::elapsed(at(seed * 7), retry.deadline());
                assert!((3000..=4500).contains(&waited), "{}", waited);
              });
  }

  #[test]
  fn max_time() {
    let exp = Strategy::Exponential { init_min: Milliseconds(100),
                                      init_max: Milliseconds(100) };
    assert_eq!(exp.max_time(Attempts(3)), Milliseconds(700u64));

    let delay = Strategy::Delay { min: Milliseconds(50),
                                  max: Milliseconds(100) };
    assert_eq!(delay.max_time(Attempts(3)), Milliseconds(300u64));
  }
}
