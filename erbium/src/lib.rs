//! `erbium` is a CoAP engine for constrained devices:
//! - allocation-free; every buffer has a capacity fixed at compile time
//! - platform-independent; bring a clock and a UDP socket
//!
//! ## What it does
//! - parses inbound datagrams into [`msg::Message`]s and answers malformed ones
//!   with the appropriate error response
//! - dispatches requests to a [`rest::Service`] and sends the response, slicing
//!   large bodies into Block2 blocks ([`block`])
//! - keeps a small pool of open [`transaction`]s, retransmitting CON messages
//!   with exponential back-off ([`retry`]) until they are acknowledged or abandoned
//! - downloads blockwise resources block by block on the client side ([`client`],
//!   [`blocking::Client`])
//!
//! ## Driving the engine
//! The [`Engine`] never blocks and owns no thread; call [`Engine::poll`]
//! whenever a datagram may have arrived or a retransmission timer may have fired.

#![cfg_attr(any(docsrs, feature = "docs"), feature(doc_cfg))]
// -
// deny
#![deny(missing_docs)]
#![cfg_attr(not(test), forbid(missing_debug_implementations, unreachable_pub))]
#![cfg_attr(not(test), deny(unsafe_code))]
// -
// features
#![cfg_attr(not(feature = "std"), no_std)]

#[doc(inline)]
pub use erbium_msg as msg;


pub(crate) mod logging;

/// Blocking CoAP client
pub mod blocking;

pub mod block;

pub mod client;

/// Runtime configuration
pub mod config;

/// The engine
pub mod engine;

/// Network abstractions
pub mod net;

pub mod rest;

/// customizable retrying of fallible operations
pub mod retry;

mod status;

/// Time abstractions
pub mod time;

/// Messages awaiting an outcome
pub mod transaction;

/// `std`-only erbium stuff
#[cfg(feature = "std")]
#[cfg_attr(any(docsrs, feature = "docs"), doc(cfg(feature = "std")))]
pub mod std;

#[doc(inline)]
pub use config::Config;
#[doc(inline)]
pub use engine::{Engine, Error, Outcome};
#[doc(inline)]
pub use net::{Addrd, Socket};
#[doc(inline)]
pub use status::Status;
