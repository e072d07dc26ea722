//! AES-128 block cipher core.
//!
//! Link-layer security needs a raw block cipher: a key schedule and
//! in-place encryption / decryption of 16-byte blocks. The [`Aes128`]
//! trait is that contract, so the software [`CipherContext`] can be
//! swapped for an accelerated driver without touching callers.
//!
//! Every context owns its own key schedule; two contexts never
//! clobber each other's keys.
//!
//! ```
//! use erbium_aes::{Aes128, CipherContext};
//!
//! let key = [0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07,
//!            0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f];
//! let mut block = [0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77,
//!                  0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff];
//!
//! let aes = CipherContext::new(&key);
//! aes.encrypt(&mut block);
//! assert_eq!(block, [0x69, 0xc4, 0xe0, 0xd8, 0x6a, 0x7b, 0x04, 0x30,
//!                    0xd8, 0xcd, 0xb7, 0x80, 0x70, 0xb4, 0xc5, 0x5a]);
//!
//! aes.decrypt(&mut block);
//! assert_eq!(block[0], 0x00);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(not(test), forbid(missing_debug_implementations, unreachable_pub))]
#![cfg_attr(not(test), deny(unsafe_code))]
#![deny(missing_docs)]

mod sbox;

/// Software implementation
pub mod software;
pub use software::CipherContext;

/// Driver backed by the RustCrypto `aes` crate
#[cfg(feature = "rustcrypto")]
pub mod accelerated;
#[cfg(feature = "rustcrypto")]
pub use accelerated::Accelerated;

/// Number of bytes in a block and in a key
pub const BLOCK_SIZE: usize = 16;

/// A 128-bit key
pub type Key = [u8; BLOCK_SIZE];

/// A 128-bit block of plain- or ciphertext
pub type Block = [u8; BLOCK_SIZE];

/// An AES-128 driver.
///
/// Implementors provide the three primitive operations;
/// the multi-block and padding helpers are derived from them.
pub trait Aes128 {
  /// Expand `key` into the round keys used by subsequent
  /// calls to [`Aes128::encrypt`] & [`Aes128::decrypt`],
  /// replacing the previous key.
  fn set_key(&mut self, key: &Key);

  /// Encrypt a single block in place
  fn encrypt(&self, block: &mut Block);

  /// Decrypt a single block in place
  fn decrypt(&self, block: &mut Block);

  /// Encrypt `data` in place, 16 bytes at a time.
  ///
  /// A trailing chunk shorter than 16 bytes is zero-padded,
  /// encrypted, and only its first `data.len() % 16` bytes
  /// are written back. The rest of that ciphertext block is
  /// discarded, so the trailing chunk can not be decrypted
  /// by [`Aes128::data_decrypt`]. Only lengths that are a
  /// multiple of 16 round-trip.
  fn data_encrypt(&self, data: &mut [u8]) {
    data.chunks_mut(BLOCK_SIZE)
        .for_each(|chunk| in_padded_block(chunk, |b| self.encrypt(b)));
  }

  /// Decrypt `data` in place, 16 bytes at a time.
  ///
  /// Mirrors [`Aes128::data_encrypt`], including its
  /// handling of a trailing chunk shorter than 16 bytes.
  fn data_decrypt(&self, data: &mut [u8]) {
    data.chunks_mut(BLOCK_SIZE)
        .for_each(|chunk| in_padded_block(chunk, |b| self.decrypt(b)));
  }

  /// Zero-pad `data` to a full block, encrypt it, and copy the first
  /// `data.len()` bytes of ciphertext back.
  ///
  /// Only the first 16 bytes of `data` are considered.
  fn padded_encrypt(&self, data: &mut [u8]) {
    let len = data.len().min(BLOCK_SIZE);
    in_padded_block(&mut data[..len], |b| self.encrypt(b));
  }

  /// Zero-pad a key shorter than 16 bytes and [`Aes128::set_key`] it.
  ///
  /// Only the first 16 bytes of `key` are considered.
  fn set_padded_key(&mut self, key: &[u8]) {
    let mut padded: Key = [0; BLOCK_SIZE];
    let len = key.len().min(BLOCK_SIZE);
    padded[..len].copy_from_slice(&key[..len]);
    self.set_key(&padded);
  }
}

fn in_padded_block(chunk: &mut [u8], f: impl FnOnce(&mut Block)) {
  let mut block: Block = [0; BLOCK_SIZE];
  block[..chunk.len()].copy_from_slice(chunk);
  f(&mut block);
  let len = chunk.len();
  chunk.copy_from_slice(&block[..len]);
}
