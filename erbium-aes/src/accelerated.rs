use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};

use crate::{Aes128, Block, Key, BLOCK_SIZE};

/// AES-128 delegating to the RustCrypto `aes` crate, which uses
/// AES-NI / ARMv8 crypto extensions when the target has them.
///
/// Offers exactly the same contract as [`CipherContext`](crate::CipherContext).
#[derive(Clone)]
pub struct Accelerated(aes::Aes128);

impl Accelerated {
  /// Create a driver keyed with `key`
  pub fn new(key: &Key) -> Self {
    Self(aes::Aes128::new(key.into()))
  }
}

impl Default for Accelerated {
  /// A driver keyed with the all-zero key
  fn default() -> Self {
    Self::new(&[0; BLOCK_SIZE])
  }
}

impl core::fmt::Debug for Accelerated {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("Accelerated").finish_non_exhaustive()
  }
}

impl Aes128 for Accelerated {
  fn set_key(&mut self, key: &Key) {
    self.0 = aes::Aes128::new(key.into());
  }

  fn encrypt(&self, block: &mut Block) {
    self.0.encrypt_block(block.into());
  }

  fn decrypt(&self, block: &mut Block) {
    self.0.decrypt_block(block.into());
  }
}
