//! Request dispatch.
//!
//! The engine hands every inbound request to a [`Service`].
//! [`Resources`] is a ready-made one that routes on the request path,
//! enforces the allowed methods of each resource and serves
//! `/.well-known/core` in CoRE link format.

use core::fmt::Write;

use erbium_msg::{Code, ContentFormat, Message, MAX_PAYLOAD_SIZE};
use tinyvec::ArrayVec;

use crate::block::LAST_CHUNK;
use crate::Status;

/// Handles inbound requests.
///
/// `resp` arrives as an empty `2.05` response addressed to the requester.
/// `preferred_size` is the largest body the requester wants in a single message,
/// and `offset` the byte offset of the block it asked for.
///
/// Resources that produce their whole body every time leave `offset` alone,
/// and the engine picks the requested block out of it. Resources that produce
/// one chunk at a time move `offset` to where the next chunk starts, or set it
/// to [`LAST_CHUNK`] once they're done.
///
/// Yielding `Ok(false)` means the request wasn't handled; the response is
/// sent as-is without block processing. Yielding `Err` replies with that
/// status instead (or, for [`Status::ManualResponse`], sends nothing).
pub trait Service {
  /// Handle a request
  fn handle(&mut self,
            req: &Message,
            resp: &mut Message,
            preferred_size: u16,
            offset: &mut i32)
            -> Result<bool, Status>;
}

impl<F> Service for F where F: FnMut(&Message, &mut Message, u16, &mut i32) -> Result<bool, Status>
{
  fn handle(&mut self,
            req: &Message,
            resp: &mut Message,
            preferred_size: u16,
            offset: &mut i32)
            -> Result<bool, Status> {
    self(req, resp, preferred_size, offset)
  }
}

/// The service of an engine that only sends requests.
///
/// Uninhabited; such an engine answers requests with `5.01`.
#[derive(Debug, Clone, Copy)]
pub enum NoService {}

impl Service for NoService {
  fn handle(&mut self, _: &Message, _: &mut Message, _: u16, _: &mut i32) -> Result<bool, Status> {
    match *self {}
  }
}

/// A request method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Method {
  Get = 1,
  Post = 2,
  Put = 4,
  Delete = 8,
}

impl Method {
  /// The method of a request code; `1 << (code - 1)` for `0.01` through `0.04`
  ///
  /// ```
  /// use erbium::rest::Method;
  /// use erbium_msg::Code;
  ///
  /// assert_eq!(Method::from_code(Code::PUT), Some(Method::Put));
  /// assert_eq!(Method::from_code(Code::CONTENT), None);
  /// ```
  pub fn from_code(code: Code) -> Option<Self> {
    match (code.class, code.detail) {
      | (0, 1) => Some(Self::Get),
      | (0, 2) => Some(Self::Post),
      | (0, 3) => Some(Self::Put),
      | (0, 4) => Some(Self::Delete),
      | _ => None,
    }
  }

  /// The flag for this method in [`Methods`]
  pub fn flag(self) -> u8 {
    self as u8
  }
}

/// A set of [`Method`]s
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Methods(pub u8);

impl Methods {
  /// Only GET
  pub const GET: Self = Self(Method::Get as u8);
  /// Only POST
  pub const POST: Self = Self(Method::Post as u8);
  /// Only PUT
  pub const PUT: Self = Self(Method::Put as u8);
  /// Only DELETE
  pub const DELETE: Self = Self(Method::Delete as u8);
  /// Every method
  pub const ALL: Self = Self(0b1111);

  /// Add `method` to the set
  pub const fn with(self, method: Method) -> Self {
    Self(self.0 | method as u8)
  }

  /// Whether `method` is in the set
  pub fn contains(&self, method: Method) -> bool {
    self.0 & method.flag() != 0
  }
}

/// Look up `name` in a `name=value&name=value` string
///
/// ```
/// use erbium::rest::get_variable;
///
/// assert_eq!(get_variable("len=4&color=red", "color"), Some("red"));
/// assert_eq!(get_variable("len=4&color=red", "colo"), None);
/// assert_eq!(get_variable("len=&color=red", "len"), Some(""));
/// ```
pub fn get_variable<'a>(vars: &'a str, name: &str) -> Option<&'a str> {
  vars.split('&')
      .find_map(|pair| pair.strip_prefix(name)?.strip_prefix('='))
}

/// Request & response accessors a resource needs, independent of the wire format
pub trait Rest {
  /// The request method, if this is a request
  fn method(&self) -> Option<Method>;
  /// Write the request path (segments joined by `/`)
  fn url(&self, out: &mut impl Write) -> core::fmt::Result;
  /// Look up a variable in the query string
  fn query_variable(&self, name: &str) -> Option<&str>;
  /// Look up a variable in a `name=value&...` request body
  fn post_variable(&self, name: &str) -> Option<&str>;
  /// Set the response status
  fn set_status(&mut self, code: Code);
}

impl Rest for Message {
  fn method(&self) -> Option<Method> {
    Method::from_code(self.code)
  }

  fn url(&self, out: &mut impl Write) -> core::fmt::Result {
    self.write_path(out)
  }

  fn query_variable(&self, name: &str) -> Option<&str> {
    self.query_segments()
        .find_map(|pair| get_variable(pair, name))
  }

  fn post_variable(&self, name: &str) -> Option<&str> {
    core::str::from_utf8(self.payload()).ok()
                                         .and_then(|body| get_variable(body, name))
  }

  fn set_status(&mut self, code: Code) {
    self.code = code;
  }
}

/// Handler of a [`Resource`]; same contract as [`Service::handle`],
/// but the request has already been routed.
pub type Handler = fn(&Message, &mut Message, u16, &mut i32) -> Result<(), Status>;

/// A resource served by [`Resources`]
#[derive(Clone, Copy)]
pub struct Resource {
  /// Path without leading slash, e.g. `"sensors/temp"`
  pub path: &'static str,
  /// Methods the resource accepts; anything else gets `4.05`
  pub methods: Methods,
  /// CoRE link attributes listed in `/.well-known/core`, e.g. `"rt=\"temp\";ct=0"`
  pub attributes: &'static str,
  /// Produces the response
  pub handler: Handler,
}

impl core::fmt::Debug for Resource {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("Resource")
     .field("path", &self.path)
     .field("methods", &self.methods)
     .field("attributes", &self.attributes)
     .finish()
  }
}

impl Resource {
  fn matches(&self, req: &Message) -> bool {
    self.path
        .split('/')
        .filter(|s| !s.is_empty())
        .eq(req.path_segments())
  }
}

/// The `/.well-known/core` path
pub const WELL_KNOWN_CORE: &str = ".well-known/core";

/// A fixed-capacity set of resources, routed on path
#[derive(Debug)]
pub struct Resources<const N: usize> {
  resources: [Option<Resource>; N],
}

impl<const N: usize> Default for Resources<N> {
  fn default() -> Self {
    Self { resources: [None; N] }
  }
}

impl<const N: usize> Resources<N> {
  /// Start serving `resource`, yielding it back if there is no room left
  pub fn activate(&mut self, resource: Resource) -> Result<(), Resource> {
    match self.resources.iter_mut().find(|r| r.is_none()) {
      | Some(slot) => {
        log::debug!(target: "erbium", "activating resource /{}", resource.path);
        *slot = Some(resource);
        Ok(())
      },
      | None => Err(resource),
    }
  }

  /// [`Resources::activate`], builder-style
  pub fn with(mut self, resource: Resource) -> Result<Self, Resource> {
    self.activate(resource).map(|_| self)
  }

  /// The registered resources
  pub fn iter(&self) -> impl Iterator<Item = &Resource> {
    self.resources.iter().filter_map(Option::as_ref)
  }

  /// Write the CoRE link format description of every resource
  pub fn write_links(&self, out: &mut impl Write) -> core::fmt::Result {
    self.iter().enumerate().try_for_each(|(ix, r)| {
                             if ix > 0 {
                               out.write_char(',')?;
                             }
                             write!(out, "</{}>", r.path)?;
                             if !r.attributes.is_empty() {
                               write!(out, ";{}", r.attributes)?;
                             }
                             Ok(())
                           })
  }

  fn well_known_core(&self, resp: &mut Message, preferred_size: u16, offset: &mut i32) {
    let start = (*offset).max(0) as usize;
    let mut window = Window { out: &mut resp.payload.0,
                              skip: start,
                              take: preferred_size as usize,
                              pos: 0 };
    self.write_links(&mut window).ok();
    let total = window.pos;

    resp.set_content_format(ContentFormat::LinkFormat).ok();
    *offset = if total <= start + preferred_size as usize {
      LAST_CHUNK
    } else {
      (start + preferred_size as usize) as i32
    };
  }
}

impl<const N: usize> Service for Resources<N> {
  fn handle(&mut self,
            req: &Message,
            resp: &mut Message,
            preferred_size: u16,
            offset: &mut i32)
            -> Result<bool, Status> {
    let is_well_known = WELL_KNOWN_CORE.split('/').eq(req.path_segments());
    if is_well_known && req.method() == Some(Method::Get) {
      self.well_known_core(resp, preferred_size, offset);
      return Ok(true);
    }

    match self.iter().find(|r| r.matches(req)) {
      | None => {
        log::debug!(target: "erbium", "no resource for request");
        resp.set_status(Code::NOT_FOUND);
        Ok(false)
      },
      | Some(r) => match req.method() {
        | Some(m) if r.methods.contains(m) => (r.handler)(req, resp, preferred_size, offset).map(|_| true),
        | _ => {
          resp.set_status(Code::METHOD_NOT_ALLOWED);
          Ok(true)
        },
      },
    }
  }
}

/// Writes only the bytes of a formatted string that fall in `skip..skip + take`
struct Window<'a> {
  out: &'a mut ArrayVec<[u8; MAX_PAYLOAD_SIZE]>,
  skip: usize,
  take: usize,
  pos: usize,
}

impl<'a> Write for Window<'a> {
  fn write_str(&mut self, s: &str) -> core::fmt::Result {
    s.bytes().for_each(|b| {
                let in_window = self.pos >= self.skip && self.pos < self.skip + self.take;
                if in_window && self.out.len() < self.out.capacity() {
                  self.out.push(b);
                }
                self.pos += 1;
              });
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use erbium_common::Writable;
  use erbium_msg::{Id, Token, Type};

  use super::*;

  fn hello(_: &Message, resp: &mut Message, _: u16, _: &mut i32) -> Result<(), Status> {
    resp.set_payload(b"hello").map_err(|_| Status::MemoryAllocationError)
  }

  fn resources() -> Resources<2> {
    Resources::default().with(Resource { path: "hello",
                                         methods: Methods::GET,
                                         attributes: "rt=\"greeting\"",
                                         handler: hello })
                        .unwrap()
                        .with(Resource { path: "sensors/temp",
                                         methods: Methods::GET.with(Method::Put),
                                         attributes: "",
                                         handler: hello })
                        .unwrap()
  }

  fn req(code: Code, path: &str) -> Message {
    let mut req = Message::new(Type::Con, code, Id(1), Token::default());
    req.set_path(path).unwrap();
    req
  }

  fn serve(svc: &mut impl Service, req: &Message) -> (Result<bool, Status>, Message, i32) {
    let mut resp = Message::new(Type::Ack, Code::CONTENT, req.id, req.token);
    let mut offset = 0;
    let handled = svc.handle(req, &mut resp, 64, &mut offset);
    (handled, resp, offset)
  }

  #[test]
  fn routes_on_path() {
    let mut rs = resources();

    let (handled, resp, _) = serve(&mut rs, &req(Code::GET, "hello"));
    assert_eq!(handled, Ok(true));
    assert_eq!(resp.payload(), b"hello");

    let (handled, resp, _) = serve(&mut rs, &req(Code::PUT, "sensors/temp"));
    assert_eq!(handled, Ok(true));
    assert_eq!(resp.code, Code::CONTENT);
  }

  #[test]
  fn not_found() {
    let (handled, resp, _) = serve(&mut resources(), &req(Code::GET, "nope"));
    assert_eq!(handled, Ok(false));
    assert_eq!(resp.code, Code::NOT_FOUND);
  }

  #[test]
  fn method_not_allowed() {
    let (handled, resp, _) = serve(&mut resources(), &req(Code::DELETE, "hello"));
    assert_eq!(handled, Ok(true));
    assert_eq!(resp.code, Code::METHOD_NOT_ALLOWED);
    assert!(resp.payload().is_empty());
  }

  #[test]
  fn capacity() {
    let full = resources();
    assert!(full.with(Resource { path: "x",
                                 methods: Methods::ALL,
                                 attributes: "",
                                 handler: hello })
                .is_err());
  }

  #[test]
  fn well_known_core() {
    let mut rs = resources();
    let (handled, resp, offset) = serve(&mut rs, &req(Code::GET, WELL_KNOWN_CORE));

    assert_eq!(handled, Ok(true));
    assert_eq!(offset, LAST_CHUNK);
    assert_eq!(resp.content_format(), Some(ContentFormat::LinkFormat));
    assert_eq!(resp.payload(),
               b"</hello>;rt=\"greeting\",</sensors/temp>".as_ref());
  }

  #[test]
  fn well_known_core_chunks() {
    let rs = resources();
    let mut resp = Message::default();
    let mut offset = 16;

    rs.well_known_core(&mut resp, 16, &mut offset);

    assert_eq!(resp.payload(), b"eting\",</sensors".as_ref());
    assert_eq!(offset, 32);

    let mut resp = Message::default();
    rs.well_known_core(&mut resp, 16, &mut offset);
    assert_eq!(resp.payload(), b"/temp>".as_ref());
    assert_eq!(offset, LAST_CHUNK);
  }

  #[test]
  fn variables() {
    let mut req = req(Code::POST, "hello");
    req.set_query("a=1&b=two").unwrap();
    req.set_payload(b"name=erbium&x=").unwrap();

    assert_eq!(req.query_variable("b"), Some("two"));
    assert_eq!(req.query_variable("c"), None);
    assert_eq!(req.post_variable("name"), Some("erbium"));
    assert_eq!(req.post_variable("x"), Some(""));
    assert_eq!(req.method(), Some(Method::Post));

    let mut url = Writable::<32>::default();
    req.url(&mut url).unwrap();
    assert_eq!(url.as_str(), "hello");
  }

  #[test]
  fn closures_are_services() {
    let mut calls = 0;
    let mut svc = |_: &Message, resp: &mut Message, size: u16, _: &mut i32| -> Result<bool, Status> {
      calls += 1;
      resp.set_status(Code::CHANGED);
      assert_eq!(size, 64);
      Ok(true)
    };

    let (handled, resp, _) = serve(&mut svc, &req(Code::POST, "x"));
    assert_eq!(handled, Ok(true));
    assert_eq!(resp.code, Code::CHANGED);
    assert_eq!(calls, 1);
  }
}
