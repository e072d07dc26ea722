use core::fmt::Write;

use tinyvec::ArrayVec;

use crate::MAX_PAYLOAD_SIZE;

#[allow(missing_docs)]
pub mod opt;
pub use opt::*;

mod code;
pub use code::*;

mod id;
pub use id::*;

mod parse_error;
pub use parse_error::*;

mod token;
pub use token::*;

mod ty;
pub use ty::*;

mod ver;
pub use ver::*;

/// Message payload
///
/// (in http terms: the request/response body)
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Payload(pub ArrayVec<[u8; MAX_PAYLOAD_SIZE]>);

impl Payload {
  /// The payload bytes
  pub fn as_bytes(&self) -> &[u8] {
    &self.0
  }

  /// Number of bytes in the payload
  pub fn len(&self) -> usize {
    self.0.len()
  }

  /// Whether the payload is empty
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

/// The payload is larger than [`MAX_PAYLOAD_SIZE`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PayloadTooLong(pub usize);

/// # CoAP Messages
/// A message is the unit of communication for both requests and responses.
///
/// Options are kept sorted by number, so a message built in any order
/// serializes with monotonic option deltas.
///
/// ```
/// use erbium_msg::{Block, Code, Id, Message, Token, Type};
///
/// let mut req = Message::new(Type::Con, Code::GET, Id(7), Token::from_slice(b"tk"));
/// req.set_block2(Block::new(16, 2, false)).unwrap();
/// req.set_path("/sensor/temp").unwrap();
///
/// assert_eq!(req.block2().map(|b| b.num()), Some(2));
/// assert_eq!(req.opts.iter().map(|o| o.number.0).collect::<Vec<_>>(), vec![11, 11, 23]);
/// ```
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Message {
  /// see [`Id`] for details
  pub id: Id,
  /// see [`Type`] for details
  pub ty: Type,
  /// see [`Version`] for details
  pub ver: Version,
  /// see [`Token`] for details
  pub token: Token,
  /// see [`Code`] for details
  pub code: Code,
  /// see [`Opts`] for details
  pub opts: Opts,
  /// see [`Payload`]
  pub payload: Payload,
}

impl Message {
  /// Create a new message without options or payload
  pub fn new(ty: Type, code: Code, id: Id, token: Token) -> Self {
    Self { id,
           ty,
           ver: Version::default(),
           token,
           code,
           opts: Opts::default(),
           payload: Payload::default() }
  }

  /// Create an empty (code `0.00`) message
  pub fn empty(ty: Type, id: Id) -> Self {
    Self::new(ty, Code::EMPTY, id, Token::default())
  }

  /// Create an empty ACK acknowledging this message
  pub fn ack(&self) -> Self {
    Self::empty(Type::Ack, self.id)
  }

  /// Create an RST rejecting this message
  pub fn reset(&self) -> Self {
    Self::empty(Type::Reset, self.id)
  }

  /// Whether this is an empty message (code `0.00`)
  pub fn is_empty(&self) -> bool {
    self.code.is_empty()
  }

  /// Whether this is a CON message with code `0.00`
  pub fn is_ping(&self) -> bool {
    self.ty == Type::Con && self.is_empty()
  }

  /// The payload bytes
  pub fn payload(&self) -> &[u8] {
    self.payload.as_bytes()
  }

  /// Replace the payload
  pub fn set_payload(&mut self, bytes: &[u8]) -> Result<(), PayloadTooLong> {
    if bytes.len() > MAX_PAYLOAD_SIZE {
      return Err(PayloadTooLong(bytes.len()));
    }

    self.payload = Payload(bytes.iter().copied().collect());
    Ok(())
  }

  fn uint(&self, n: OptNumber) -> Option<u32> {
    self.opts.get(n).and_then(OptValue::as_uint)
  }

  fn set_uint(&mut self, n: OptNumber, v: u32) -> Result<(), SetOptionError> {
    self.opts.set(n, OptValue::from_uint(v))
  }

  fn strs(&self, n: OptNumber) -> impl Iterator<Item = &str> {
    self.opts.get_all(n).filter_map(OptValue::as_str)
  }

  fn set_split(&mut self, n: OptNumber, s: &str, sep: char) -> Result<(), SetOptionError> {
    self.opts.remove(n);
    s.split(sep)
     .filter(|seg| !seg.is_empty())
     .try_for_each(|seg| self.opts.add(n, OptValue::from_slice(seg.as_bytes())?))
  }

  fn write_joined(&self,
                  n: OptNumber,
                  sep: char,
                  out: &mut impl Write)
                  -> core::fmt::Result {
    self.strs(n).enumerate().try_for_each(|(ix, seg)| {
                              if ix > 0 {
                                out.write_char(sep)?;
                              }
                              out.write_str(seg)
                            })
  }

  /// Uri-Path segments
  pub fn path_segments(&self) -> impl Iterator<Item = &str> {
    self.strs(OptNumber::URI_PATH)
  }

  /// Write the Uri-Path segments joined with `/`
  pub fn write_path(&self, out: &mut impl Write) -> core::fmt::Result {
    self.write_joined(OptNumber::URI_PATH, '/', out)
  }

  /// Set Uri-Path from a `/`-separated path, leading & trailing slashes are ignored
  pub fn set_path(&mut self, path: &str) -> Result<(), SetOptionError> {
    self.set_split(OptNumber::URI_PATH, path, '/')
  }

  /// Uri-Query segments (`name=value`)
  pub fn query_segments(&self) -> impl Iterator<Item = &str> {
    self.strs(OptNumber::URI_QUERY)
  }

  /// Write the Uri-Query segments joined with `&`
  pub fn write_query(&self, out: &mut impl Write) -> core::fmt::Result {
    self.write_joined(OptNumber::URI_QUERY, '&', out)
  }

  /// Set Uri-Query from an `&`-separated query string
  pub fn set_query(&mut self, query: &str) -> Result<(), SetOptionError> {
    self.set_split(OptNumber::URI_QUERY, query, '&')
  }

  /// Location-Path segments
  pub fn location_path_segments(&self) -> impl Iterator<Item = &str> {
    self.strs(OptNumber::LOCATION_PATH)
  }

  /// Set Location-Path from a `/`-separated path
  pub fn set_location_path(&mut self, path: &str) -> Result<(), SetOptionError> {
    self.set_split(OptNumber::LOCATION_PATH, path, '/')
  }

  /// Location-Query segments
  pub fn location_query_segments(&self) -> impl Iterator<Item = &str> {
    self.strs(OptNumber::LOCATION_QUERY)
  }

  /// Set Location-Query from an `&`-separated query string
  pub fn set_location_query(&mut self, query: &str) -> Result<(), SetOptionError> {
    self.set_split(OptNumber::LOCATION_QUERY, query, '&')
  }

  /// Uri-Host
  pub fn uri_host(&self) -> Option<&str> {
    self.strs(OptNumber::URI_HOST).next()
  }

  /// Set Uri-Host
  pub fn set_uri_host(&mut self, host: &str) -> Result<(), SetOptionError> {
    self.opts
        .set(OptNumber::URI_HOST, OptValue::from_slice(host.as_bytes())?)
  }

  /// Uri-Port
  pub fn uri_port(&self) -> Option<u16> {
    self.uint(OptNumber::URI_PORT).map(|n| n as u16)
  }

  /// Set Uri-Port
  pub fn set_uri_port(&mut self, port: u16) -> Result<(), SetOptionError> {
    self.set_uint(OptNumber::URI_PORT, port.into())
  }

  /// Content-Format
  pub fn content_format(&self) -> Option<ContentFormat> {
    self.uint(OptNumber::CONTENT_FORMAT)
        .map(|n| ContentFormat::from(n as u16))
  }

  /// Set Content-Format
  pub fn set_content_format(&mut self, format: ContentFormat) -> Result<(), SetOptionError> {
    self.set_uint(OptNumber::CONTENT_FORMAT, u16::from(&format).into())
  }

  /// Accept
  pub fn accept(&self) -> Option<ContentFormat> {
    self.uint(OptNumber::ACCEPT)
        .map(|n| ContentFormat::from(n as u16))
  }

  /// Set Accept
  pub fn set_accept(&mut self, format: ContentFormat) -> Result<(), SetOptionError> {
    self.set_uint(OptNumber::ACCEPT, u16::from(&format).into())
  }

  /// Max-Age in seconds
  pub fn max_age(&self) -> Option<u32> {
    self.uint(OptNumber::MAX_AGE)
  }

  /// Set Max-Age in seconds
  pub fn set_max_age(&mut self, seconds: u32) -> Result<(), SetOptionError> {
    self.set_uint(OptNumber::MAX_AGE, seconds)
  }

  /// Observe sequence number / registration flag
  pub fn observe(&self) -> Option<u32> {
    self.uint(OptNumber::OBSERVE)
  }

  /// Set Observe
  pub fn set_observe(&mut self, n: u32) -> Result<(), SetOptionError> {
    self.set_uint(OptNumber::OBSERVE, n & 0x00FF_FFFF)
  }

  /// First ETag
  pub fn etag(&self) -> Option<&[u8]> {
    self.opts.get(OptNumber::ETAG).map(OptValue::as_bytes)
  }

  /// Set ETag (truncated to 8 bytes)
  pub fn set_etag(&mut self, tag: &[u8]) -> Result<(), SetOptionError> {
    self.opts
        .set(OptNumber::ETAG, OptValue::from_slice(&tag[..tag.len().min(8)])?)
  }

  /// First If-Match
  pub fn if_match(&self) -> Option<&[u8]> {
    self.opts.get(OptNumber::IF_MATCH).map(OptValue::as_bytes)
  }

  /// Set If-Match (truncated to 8 bytes)
  pub fn set_if_match(&mut self, tag: &[u8]) -> Result<(), SetOptionError> {
    self.opts
        .set(OptNumber::IF_MATCH, OptValue::from_slice(&tag[..tag.len().min(8)])?)
  }

  /// Whether If-None-Match is present
  pub fn if_none_match(&self) -> bool {
    self.opts.contains(OptNumber::IF_NONE_MATCH)
  }

  /// Set If-None-Match
  pub fn set_if_none_match(&mut self) -> Result<(), SetOptionError> {
    self.opts.set(OptNumber::IF_NONE_MATCH, OptValue::default())
  }

  /// Block1 (request body) descriptor
  pub fn block1(&self) -> Option<Block> {
    self.uint(OptNumber::BLOCK1).map(Block::from)
  }

  /// Set Block1
  pub fn set_block1(&mut self, block: Block) -> Result<(), SetOptionError> {
    self.set_uint(OptNumber::BLOCK1, block.into())
  }

  /// Block2 (response body) descriptor
  pub fn block2(&self) -> Option<Block> {
    self.uint(OptNumber::BLOCK2).map(Block::from)
  }

  /// Set Block2
  pub fn set_block2(&mut self, block: Block) -> Result<(), SetOptionError> {
    self.set_uint(OptNumber::BLOCK2, block.into())
  }

  /// Size1 (total size of a request body)
  pub fn size1(&self) -> Option<u32> {
    self.uint(OptNumber::SIZE1)
  }

  /// Set Size1
  pub fn set_size1(&mut self, n: u32) -> Result<(), SetOptionError> {
    self.set_uint(OptNumber::SIZE1, n)
  }

  /// Size2 (total size of a response body)
  pub fn size2(&self) -> Option<u32> {
    self.uint(OptNumber::SIZE2)
  }

  /// Set Size2
  pub fn set_size2(&mut self, n: u32) -> Result<(), SetOptionError> {
    self.set_uint(OptNumber::SIZE2, n)
  }
}
