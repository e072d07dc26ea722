//! Common structs and abstractions used by `erbium`

#![cfg_attr(not(test), forbid(missing_debug_implementations, unreachable_pub))]
#![cfg_attr(not(test), deny(unsafe_code, missing_copy_implementations))]
#![deny(missing_docs)]
#![cfg_attr(not(feature = "std"), no_std)]

/// Cursor
pub mod cursor;
pub use cursor::*;

/// Stack-allocated `fmt::Write` buffer
pub mod writable;
pub use writable::*;
