//! Server side of Block2 negotiation.
//!
//! After a resource has produced its response, the engine decides which slice
//! of the body goes out and what Block2 option describes it. Resources come
//! in two flavors:
//!  - unaware of blocks: they always produce the whole body, and leave the
//!    offset they were handed untouched. The engine slices the body.
//!  - aware of blocks: they produce only the requested chunk and move the
//!    offset to where the next chunk starts, or to `-1` once the last chunk
//!    has been produced.

use core::cmp::min;

use erbium_msg::{Block, Code, Message};

use crate::Status;

/// Offset a block-aware resource reports once it produced its final chunk
pub const LAST_CHUNK: i32 = -1;

/// The block a request asked for, after clamping to what we're willing to serve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requested {
  /// Block number
  pub num: u32,
  /// Block size, never larger than the configured maximum
  pub size: u16,
  /// Byte offset of the block in the full body
  pub offset: u32,
}

impl Requested {
  /// Interpret a request's Block2 option, shrinking it to `max_block_size`.
  ///
  /// When the block has to shrink, the offset the requester asked for is kept
  /// and the block number is recomputed in terms of the smaller size.
  ///
  /// Blocks whose offset or recomputed number can't be represented
  /// are out of scope for any body we could serve.
  ///
  /// ```
  /// use erbium::block::Requested;
  /// use erbium_msg::Block;
  ///
  /// let req = Requested::new(Block::new(128, 1, false), 64).unwrap();
  /// assert_eq!(req, Requested { num: 2, size: 64, offset: 128 });
  /// ```
  pub fn new(block: Block, max_block_size: u16) -> Result<Self, Status> {
    let offset = i32::try_from(block.offset()).map_err(|_| out_of_scope())? as u32;

    let (num, size) = if block.size() <= max_block_size {
      (block.num(), block.size())
    } else {
      (offset / max_block_size as u32, max_block_size)
    };

    if num > Block::MAX_NUM {
      return Err(out_of_scope());
    }

    Ok(Self { num, size, offset })
  }
}

fn out_of_scope() -> Status {
  Status::respond(Code::BAD_OPTION, "BlockOutOfScope")
}

/// Settle the Block2 option & payload of `resp`, given the block the request
/// asked for (if any) and the offset the resource left behind.
pub fn negotiate(req: &Message,
                 resp: &mut Message,
                 requested: Option<Requested>,
                 new_offset: i32,
                 max_block_size: u16)
                 -> Result<(), Status> {
  if req.block1().is_some() && resp.code < Code::BAD_REQUEST && resp.block1().is_none() {
    return Err(Status::respond(Code::NOT_IMPLEMENTED, "NoBlock1Support"));
  }

  match requested {
    | Some(block) if new_offset == block.offset as i32 => {
      let len = resp.payload.len();
      let offset = block.offset as usize;
      if offset >= len {
        return Err(out_of_scope());
      }

      let size = block.size as usize;
      set_block2(resp, block.num, len - offset > size, block.size)?;
      slice_payload(resp, offset, size);
    },
    | Some(block) => {
      let more = new_offset != LAST_CHUNK || resp.payload.len() > block.size as usize;
      set_block2(resp, block.num, more, block.size)?;
      slice_payload(resp, 0, block.size as usize);
    },
    | None if new_offset != 0 => {
      set_block2(resp, 0, new_offset != LAST_CHUNK, max_block_size)?;
      slice_payload(resp, 0, max_block_size as usize);
    },
    | None => (),
  }

  Ok(())
}

fn set_block2(resp: &mut Message, num: u32, more: bool, size: u16) -> Result<(), Status> {
  let block = Block::try_new(size, num, more).ok_or_else(out_of_scope)?;
  resp.set_block2(block)
      .map_err(|_| Status::MemoryAllocationError)
}

fn slice_payload(resp: &mut Message, offset: usize, size: usize) {
  let body = &mut resp.payload.0;
  let end = min(body.len(), offset.saturating_add(size));
  if offset > 0 {
    body.copy_within(offset..end, 0);
  }
  body.truncate(end - offset);
}

#[cfg(test)]
mod tests {
  use erbium_msg::{Id, Token, Type};

  use super::*;

  fn get(block: Option<Block>) -> Message {
    let mut req = Message::new(Type::Con, Code::GET, Id(1), Token::default());
    if let Some(b) = block {
      req.set_block2(b).unwrap();
    }
    req
  }

  fn content(body: &[u8]) -> Message {
    let mut resp = Message::new(Type::Ack, Code::CONTENT, Id(1), Token::default());
    resp.set_payload(body).unwrap();
    resp
  }

  const BODY: &[u8] = b"0123456789abcdef0123456789ABCDEF01234";

  #[test]
  fn unaware_resource_is_sliced() {
    let req = get(Some(Block::new(16, 1, false)));
    let requested = req.block2().map(|b| Requested::new(b, 64).unwrap());
    let mut resp = content(BODY);

    negotiate(&req, &mut resp, requested, 16, 64).unwrap();

    assert_eq!(resp.payload(), b"0123456789ABCDEF");
    assert_eq!(resp.block2(), Some(Block::new(16, 1, true)));
  }

  #[test]
  fn unaware_resource_last_block() {
    let req = get(Some(Block::new(16, 2, false)));
    let requested = req.block2().map(|b| Requested::new(b, 64).unwrap());
    let mut resp = content(BODY);

    negotiate(&req, &mut resp, requested, 32, 64).unwrap();

    assert_eq!(resp.payload(), b"01234");
    assert_eq!(resp.block2(), Some(Block::new(16, 2, false)));
  }

  #[test]
  fn block_out_of_scope() {
    let req = get(Some(Block::new(16, 3, false)));
    let requested = req.block2().map(|b| Requested::new(b, 64).unwrap());
    let mut resp = content(BODY);

    assert_eq!(negotiate(&req, &mut resp, requested, 48, 64),
               Err(Status::respond(Code::BAD_OPTION, "BlockOutOfScope")));
  }

  #[test]
  fn aware_resource_declares_more() {
    let req = get(Some(Block::new(16, 0, false)));
    let requested = req.block2().map(|b| Requested::new(b, 64).unwrap());

    let mut resp = content(&BODY[..16]);
    negotiate(&req, &mut resp, requested, 16, 64).unwrap();
    assert_eq!(resp.block2(), Some(Block::new(16, 0, true)));

    let mut resp = content(&BODY[..16]);
    negotiate(&req, &mut resp, requested, LAST_CHUNK, 64).unwrap();
    assert_eq!(resp.block2(), Some(Block::new(16, 0, false)));

    // produced more than asked for
    let mut resp = content(BODY);
    negotiate(&req, &mut resp, requested, LAST_CHUNK, 64).unwrap();
    assert_eq!(resp.block2(), Some(Block::new(16, 0, true)));
    assert_eq!(resp.payload().len(), 16);
  }

  #[test]
  fn unrequested_chunking() {
    let req = get(None);
    let mut resp = content(BODY);

    negotiate(&req, &mut resp, None, 16, 16).unwrap();

    assert_eq!(resp.block2(), Some(Block::new(16, 0, true)));
    assert_eq!(resp.payload(), &BODY[..16]);
  }

  #[test]
  fn no_blocks_involved() {
    let req = get(None);
    let mut resp = content(BODY);

    negotiate(&req, &mut resp, None, 0, 16).unwrap();

    assert_eq!(resp.block2(), None);
    assert_eq!(resp.payload(), BODY);
  }

  #[test]
  fn block1_needs_support() {
    let mut req = get(None);
    req.set_block1(Block::new(16, 0, true)).unwrap();
    let mut resp = content(b"");

    assert_eq!(negotiate(&req, &mut resp, None, 0, 64).unwrap_err().reply_code(),
               Code::NOT_IMPLEMENTED);

    resp.code = Code::NOT_FOUND;
    assert!(negotiate(&req, &mut resp, None, 0, 64).is_ok());
  }

  #[test]
  fn requested_size_is_clamped() {
    let requested = Requested::new(Block::new(256, 0, false), 64).unwrap();
    assert_eq!(requested,
               Requested { num: 0,
                           size: 64,
                           offset: 0 });
  }

  #[test]
  fn unrepresentable_blocks_are_out_of_scope() {
    assert_eq!(Requested::new(Block::from(0x4000_0002), 64),
               Err(Status::respond(Code::BAD_OPTION, "BlockOutOfScope")));

    // offset fits, but not once renumbered in 64 byte blocks
    assert_eq!(Requested::new(Block::new(1024, Block::MAX_NUM, false), 64),
               Err(Status::respond(Code::BAD_OPTION, "BlockOutOfScope")));

    let req = get(None);
    let mut resp = content(BODY);
    let requested = Requested { num: Block::MAX_NUM + 1,
                                size: 16,
                                offset: 0 };
    assert_eq!(negotiate(&req, &mut resp, Some(requested), 0, 64),
               Err(Status::respond(Code::BAD_OPTION, "BlockOutOfScope")));
  }
}
