//! Low-level representation of CoAP messages.
//!
//! The most notable item in `erbium_msg` is [`Message`];
//! a CoAP message very close to the actual byte layout,
//! stored entirely in fixed-capacity collections.
//!
//! ## Allocation
//! CoAP messages have some attributes whose size is dynamic:
//! - The message payload (in http terms: the request/response body)
//! - the number of options (in http terms: headers)
//! - the value of an option (in http terms: header value)
//!
//! `Message` never allocates; each of these is a `tinyvec::ArrayVec`
//! with a capacity fixed at compile time:
//! - [`MAX_PAYLOAD_SIZE`] bytes of payload
//! - [`MAX_OPTS`] options
//! - [`MAX_OPT_VALUE_SIZE`] bytes per option value
//!
//! Input that does not fit is rejected while parsing, and
//! setters report it with [`SetOptionError`].
//!
//! ```
//! use erbium_msg::{Code, Id, Message, Token, TryFromBytes, TryIntoBytes, Type};
//!
//! let mut req = Message::new(Type::Con, Code::GET, Id(1), Token::from_slice(&[0xAB]));
//! req.set_path("sensor/temp").unwrap();
//!
//! let bytes = req.try_into_bytes::<64>().unwrap();
//! let parsed = Message::try_from_bytes(&bytes).unwrap();
//!
//! assert_eq!(parsed.path_segments().collect::<Vec<_>>(), vec!["sensor", "temp"]);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(not(test), forbid(missing_debug_implementations, unreachable_pub))]
#![cfg_attr(not(test), deny(unsafe_code))]
#![cfg_attr(any(docsrs, feature = "docs"), feature(doc_cfg))]
#![deny(missing_docs)]

#[doc(hidden)]
pub mod from_bytes;
#[doc(hidden)]
pub mod msg;
#[doc(hidden)]
pub mod to_bytes;

#[doc(inline)]
pub use from_bytes::TryFromBytes;
#[doc(inline)]
pub use msg::*;
#[doc(inline)]
pub use to_bytes::{MessageToBytesError, TryIntoBytes};

/// Maximum number of bytes a message payload may contain
pub const MAX_PAYLOAD_SIZE: usize = 1024;

/// Maximum number of options a message may contain
pub const MAX_OPTS: usize = 16;

/// Maximum number of bytes in a single option value
pub const MAX_OPT_VALUE_SIZE: usize = 64;

/// Maximum size of everything in a message preceding the payload
/// (header, token, options and payload marker)
pub const MAX_HEADER_SIZE: usize = 128;

/// Size of a buffer able to hold any serialized message
pub const MAX_PACKET_SIZE: usize = MAX_HEADER_SIZE + MAX_PAYLOAD_SIZE;

#[cfg(test)]
pub(crate) fn test_msg() -> (Message, Vec<u8>) {
  let header: [u8; 4] = 0b0100_0001_0100_0101_0000_0000_0000_0001_u32.to_be_bytes();
  let token: [u8; 1] = [254u8];
  let options: [&[u8]; 2] = [&[0b1011_0100u8], b"temp"];
  let payload: [&[u8]; 2] = [&[0b1111_1111_u8], b"hello, world!"];
  let bytes = [header.as_ref(),
               token.as_ref(),
               options.concat().as_ref(),
               payload.concat().as_ref()].concat();

  let mut msg = Message::new(Type::Con, Code::CONTENT, Id(1), Token::from_slice(&token));
  msg.set_path("temp").unwrap();
  msg.set_payload(b"hello, world!").unwrap();
  (msg, bytes)
}

/// Assert that two byte collections are equal,
/// printing them in binary when they are not.
#[cfg(test)]
#[macro_export]
macro_rules! assert_eqb {
  ($actual:expr, $expected:expr) => {
    if $actual != $expected {
      panic!("expected {:08b} to equal {:08b}", $actual, $expected)
    }
  };
}

/// Assert that two iterators of bytes are equal,
/// printing them in binary when they are not.
#[cfg(test)]
#[macro_export]
macro_rules! assert_eqb_iter {
  ($actual:expr, $expected:expr) => {
    if $actual.iter().ne($expected.iter()) {
      panic!("expected {:?} to equal {:?}",
             $actual.into_iter().map(|b| format!("{:08b}", b)).collect::<Vec<_>>(),
             $expected.into_iter().map(|b| format!("{:08b}", b)).collect::<Vec<_>>())
    }
  };
}
