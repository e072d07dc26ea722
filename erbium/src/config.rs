use embedded_time::duration::Milliseconds;

use crate::retry::{Attempts, Strategy};
use crate::time::Millis;

/// The default CoAP port
pub const DEFAULT_PORT: u16 = 5683;

/// Configuration options related to outbound CON messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Con {
  /// Retry strategy for CON messages that have not yet been ACKed.
  ///
  /// Defaults to an exponential strategy starting somewhere between
  /// the ACK timeout (3 seconds) and 1.5 times that:
  /// ```
  /// use embedded_time::duration::Milliseconds;
  /// use erbium::config::Con;
  /// use erbium::retry::Strategy;
  ///
  /// assert_eq!(Con::default().retry_strategy,
  ///            Strategy::Exponential { init_min: Milliseconds(3_000),
  ///                                    init_max: Milliseconds(4_500) });
  /// ```
  pub retry_strategy: Strategy,
  /// Total number of transmissions of a CON message
  /// (the first one included) before it is abandoned.
  ///
  /// Defaults to 5; an initial transmission and 4 retransmissions.
  /// ```
  /// use erbium::config::Con;
  /// use erbium::retry::Attempts;
  ///
  /// assert_eq!(Con::default().max_attempts, Attempts(5));
  /// ```
  pub max_attempts: Attempts,
  /// How long to wait for a separate response after
  /// our request was acknowledged with an empty ACK.
  ///
  /// Defaults to 30 seconds.
  /// ```
  /// use embedded_time::duration::Milliseconds;
  /// use erbium::config::Con;
  ///
  /// assert_eq!(Con::default().acked_timeout, Milliseconds(30_000u64));
  /// ```
  pub acked_timeout: Millis,
}

impl Default for Con {
  fn default() -> Self {
    Self { retry_strategy: Strategy::Exponential { init_min: Milliseconds(3_000),
                                                   init_max: Milliseconds(4_500) },
           max_attempts: Attempts(5),
           acked_timeout: Milliseconds(30_000) }
  }
}

/// Configuration options related to blockwise (Block2) transfers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Blockwise {
  /// Largest block we will serve, no matter what the requester asks for.
  ///
  /// Must be a power of two between 16 and 1024; defaults to 64.
  /// ```
  /// use erbium::config::Blockwise;
  ///
  /// assert_eq!(Blockwise::default().max_block_size, 64);
  /// ```
  pub max_block_size: u16,
  /// Block size we ask for when downloading a resource,
  /// and the preferred size handed to resources when
  /// the request did not ask for one.
  ///
  /// Defaults to 64.
  /// ```
  /// use erbium::config::Blockwise;
  ///
  /// assert_eq!(Blockwise::default().max_chunk_size, 64);
  /// ```
  pub max_chunk_size: u16,
}

impl Default for Blockwise {
  fn default() -> Self {
    Self { max_block_size: 64,
           max_chunk_size: 64 }
  }
}

/// Runtime config, allowing you to make tradeoffs between
/// memory, network traffic & responsiveness
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Config {
  /// See [`Con`]
  pub con: Con,
  /// See [`Blockwise`]
  pub blockwise: Blockwise,
  /// Port the engine listens on; defaults to [`DEFAULT_PORT`]
  pub port: u16,
  /// Seed used to generate message ids & tokens.
  ///
  /// Defaults to 0; nodes sharing a network should
  /// each use something distinct (a serial number, a random integer).
  pub seed: u16,
}

impl Default for Config {
  fn default() -> Self {
    Self { con: Con::default(),
           blockwise: Blockwise::default(),
           port: DEFAULT_PORT,
           seed: 0 }
  }
}

impl Config {
  /// Set the port to listen on
  pub fn port(self, port: u16) -> Self {
    Self { port, ..self }
  }

  /// Set the message id & token seed
  pub fn seed(self, seed: u16) -> Self {
    Self { seed, ..self }
  }
}
