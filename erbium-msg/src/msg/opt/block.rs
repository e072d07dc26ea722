/// Three items of information may need to be transferred in a
/// Block (Block1 or Block2) option:
/// * the size of the block ([`Block::size`])
/// * whether more blocks are following ([`Block::more`])
/// * the relative number of the block ([`Block::num`]) within a sequence of blocks with the given size.
///
/// On the wire these are packed into one unsigned integer:
/// `num << 4 | more << 3 | szx`, where `size = 2^(szx + 4)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Block(u32);

impl Block {
  /// Largest block number that fits in the option (20 bits)
  pub const MAX_NUM: u32 = 0x0F_FFFF;

  /// Create a block descriptor.
  ///
  /// `size` is rounded down to the nearest power of two in `16..=1024`,
  /// `num` is truncated to 20 bits.
  pub fn new(size: u16, num: u32, more: bool) -> Self {
    let num = (num & Self::MAX_NUM) << 4;
    let more = u32::from(more) << 3;
    let size = size.max(16).min(1024);
    let szx = (15 - size.leading_zeros()) - 4;

    Self(num | more | szx)
  }

  /// Like [`Block::new`], but yields `None` instead of
  /// truncating a `num` larger than [`Block::MAX_NUM`].
  ///
  /// ```
  /// use erbium_msg::Block;
  ///
  /// assert_eq!(Block::try_new(16, Block::MAX_NUM, false), Some(Block::new(16, Block::MAX_NUM, false)));
  /// assert_eq!(Block::try_new(16, Block::MAX_NUM + 1, false), None);
  /// ```
  pub fn try_new(size: u16, num: u32, more: bool) -> Option<Self> {
    if num > Self::MAX_NUM {
      None
    } else {
      Some(Self::new(size, num, more))
    }
  }

  /// The block size exponent (`size = 2^(szx + 4)`)
  pub fn szx(&self) -> u32 {
    self.0 & 0b111
  }

  /// Size of the block in bytes.
  ///
  /// A peer may send the reserved exponent 7, which reads as 2048;
  /// callers are expected to clamp this to what they support.
  pub fn size(&self) -> u16 {
    16 << self.szx()
  }

  /// Whether more blocks follow this one
  pub fn more(&self) -> bool {
    (self.0 & 0b1000) >> 3 == 1
  }

  /// The number of this block within the sequence
  pub fn num(&self) -> u32 {
    self.0 >> 4
  }

  /// Byte offset of this block within the whole body
  ///
  /// ```
  /// use erbium_msg::Block;
  ///
  /// assert_eq!(Block::new(16, 3, false).offset(), 48);
  /// ```
  pub fn offset(&self) -> u64 {
    u64::from(self.num()) * u64::from(self.size())
  }
}

impl From<Block> for u32 {
  fn from(b: Block) -> Self {
    b.0
  }
}

impl From<u32> for Block {
  fn from(n: u32) -> Self {
    Block(n)
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn block() {
    let b = Block(33);
    assert_eq!(b.size(), 32);
    assert_eq!(b.num(), 2);
    assert_eq!(b.more(), false);
    assert_eq!(b.offset(), 64);

    let b = Block(59);
    assert_eq!(b.size(), 128);
    assert_eq!(b.num(), 3);
    assert_eq!(b.more(), true);
    assert_eq!(b.offset(), 384);

    assert_eq!(Block::new(32, 2, false), Block(33));
    assert_eq!(Block::new(128, 3, true), Block(59));
  }

  #[test]
  fn size_rounds_down_to_nearest_power_of_two() {
    assert_eq!(Block::new(0, 1, false).size(), 16);
    assert_eq!(Block::new(17, 1, false).size(), 16);
    assert_eq!(Block::new(31, 1, false).size(), 16);
    assert_eq!(Block::new(33, 1, false).size(), 32);
    assert_eq!(Block::new(64, 1, false).size(), 64);
    assert_eq!(Block::new(1024, 1, false).size(), 1024);
    assert_eq!(Block::new(2048, 1, false).size(), 1024);
  }

  #[test]
  fn reserved_exponent_reads_as_2048() {
    assert_eq!(Block(0b0001_0111).size(), 2048);
    assert_eq!(Block(0b0001_0111).offset(), 2048);
  }

  #[test]
  fn num_is_truncated_to_20_bits() {
    assert_eq!(Block::new(16, Block::MAX_NUM + 1, false).num(), 0);
    assert_eq!(Block::new(16, Block::MAX_NUM, false).num(), Block::MAX_NUM);
  }

  #[test]
  fn offset_does_not_wrap() {
    // what a 4 byte Block2 option could carry: num 2^26, 64 byte blocks
    let b = Block(0x4000_0002);
    assert_eq!(b.num(), 1 << 26);
    assert_eq!(b.offset(), 1 << 32);

    assert_eq!(Block(u32::MAX).offset(), u64::from(u32::MAX >> 4) * 2048);
  }
}
