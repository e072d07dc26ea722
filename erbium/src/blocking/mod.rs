/// Blocking CoAP client
pub mod client;

#[doc(inline)]
pub use client::{Body, Client, MAX_BODY_SIZE};
