use crate::sbox::{INV_SBOX, SBOX};
use crate::{Aes128, Block, Key, BLOCK_SIZE};

const ROUNDS: usize = 10;

/// Multiplication by `x` (i.e. 2) in GF(2^8) with the AES
/// reduction polynomial
pub(crate) fn galois_mul2(value: u8) -> u8 {
  (value << 1) ^ ((value >> 7) * 0x1b)
}

/// Software AES-128.
///
/// Holds the expanded key schedule: 11 round keys of 16 bytes,
/// the first being the key itself.
#[derive(Clone, PartialEq, Eq)]
pub struct CipherContext {
  round_keys: [[u8; BLOCK_SIZE]; ROUNDS + 1],
}

impl core::fmt::Debug for CipherContext {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("CipherContext").finish_non_exhaustive()
  }
}

impl Default for CipherContext {
  /// A context keyed with the all-zero key
  fn default() -> Self {
    Self::new(&[0; BLOCK_SIZE])
  }
}

impl CipherContext {
  /// Create a context and expand `key`
  pub fn new(key: &Key) -> Self {
    let mut ctx = Self { round_keys: [[0; BLOCK_SIZE]; ROUNDS + 1] };
    ctx.set_key(key);
    ctx
  }

  /// The expanded round key used by `round` (`0..=10`)
  pub fn round_key(&self, round: usize) -> &[u8; BLOCK_SIZE] {
    &self.round_keys[round]
  }

  fn add_round_key(&self, state: &mut Block, round: usize) {
    state.iter_mut()
         .zip(self.round_keys[round].iter())
         .for_each(|(s, k)| *s ^= k);
  }
}

fn sub_bytes(state: &mut Block, sbox: &[u8; 256]) {
  state.iter_mut().for_each(|s| *s = sbox[*s as usize]);
}

fn shift_rows(s: &mut Block) {
  let buf = s[1];
  s[1] = s[5];
  s[5] = s[9];
  s[9] = s[13];
  s[13] = buf;

  s.swap(2, 10);
  s.swap(6, 14);

  let buf = s[15];
  s[15] = s[11];
  s[11] = s[7];
  s[7] = s[3];
  s[3] = buf;
}

fn inv_shift_rows(s: &mut Block) {
  let buf = s[13];
  s[13] = s[9];
  s[9] = s[5];
  s[5] = s[1];
  s[1] = buf;

  s.swap(2, 10);
  s.swap(6, 14);

  let buf = s[3];
  s[3] = s[7];
  s[7] = s[11];
  s[11] = s[15];
  s[15] = buf;
}

fn mix_columns(s: &mut Block) {
  s.chunks_exact_mut(4).for_each(|col| {
                         let [a0, a1, a2, a3] = [col[0], col[1], col[2], col[3]];
                         let t = a0 ^ a1 ^ a2 ^ a3;
                         col[0] ^= t ^ galois_mul2(a0 ^ a1);
                         col[1] ^= t ^ galois_mul2(a1 ^ a2);
                         col[2] ^= t ^ galois_mul2(a2 ^ a3);
                         col[3] ^= t ^ galois_mul2(a3 ^ a0);
                       });
}

/// InvMixColumns factored as a preprocessing step followed by MixColumns
fn inv_mix_columns(s: &mut Block) {
  s.chunks_exact_mut(4).for_each(|col| {
                         let u = galois_mul2(galois_mul2(col[0] ^ col[2]));
                         let v = galois_mul2(galois_mul2(col[1] ^ col[3]));
                         col[0] ^= u;
                         col[1] ^= v;
                         col[2] ^= u;
                         col[3] ^= v;
                       });
  mix_columns(s);
}

impl Aes128 for CipherContext {
  fn set_key(&mut self, key: &Key) {
    self.round_keys[0] = *key;

    let mut rcon = 1u8;
    for i in 1..=ROUNDS {
      let prev = self.round_keys[i - 1];
      let rk = &mut self.round_keys[i];

      rk[0] = SBOX[prev[13] as usize] ^ prev[0] ^ rcon;
      rk[1] = SBOX[prev[14] as usize] ^ prev[1];
      rk[2] = SBOX[prev[15] as usize] ^ prev[2];
      rk[3] = SBOX[prev[12] as usize] ^ prev[3];

      for j in 4..BLOCK_SIZE {
        rk[j] = prev[j] ^ rk[j - 4];
      }

      rcon = galois_mul2(rcon);
    }

    log::trace!(target: "erbium::aes", "key schedule expanded");
  }

  fn encrypt(&self, state: &mut Block) {
    self.add_round_key(state, 0);

    for round in 1..=ROUNDS {
      sub_bytes(state, &SBOX);
      shift_rows(state);
      if round < ROUNDS {
        mix_columns(state);
      }
      self.add_round_key(state, round);
    }
  }

  fn decrypt(&self, state: &mut Block) {
    self.add_round_key(state, ROUNDS);

    for round in (0..ROUNDS).rev() {
      inv_shift_rows(state);
      sub_bytes(state, &INV_SBOX);
      self.add_round_key(state, round);
      if round > 0 {
        inv_mix_columns(state);
      }
    }
  }
}
