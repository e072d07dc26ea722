use erbium_msg::{Code, Id, Message, Type};
use no_std_net::SocketAddr;
use tinyvec::ArrayVec;

use crate::client::{BlockingRequest, RequestError};
use crate::engine::{Engine, MAX_OPEN_TRANSACTIONS};
use crate::net::Socket;
use crate::rest::{NoService, Service};
use crate::time::Clock;

/// Largest body [`Client`] can reassemble
pub const MAX_BODY_SIZE: usize = 4096;

/// A reassembled response body
pub type Body = ArrayVec<[u8; MAX_BODY_SIZE]>;

/// A CoAP client that blocks the calling thread until
/// the whole (possibly blockwise) response has arrived.
///
/// ```no_run
/// use erbium::blocking::Client;
/// use erbium::std::Clock;
/// use erbium::{Config, Engine};
/// use no_std_net::SocketAddr;
/// use std::net::UdpSocket;
///
/// let engine = Engine::<Clock, UdpSocket>::bind(Config::default().port(0), Clock::new()).unwrap();
/// let mut client = Client::new(engine);
///
/// let server: SocketAddr = "127.0.0.1:5683".parse().unwrap();
/// let body = client.get(server, "sensors/temp").unwrap();
/// println!("{}", String::from_utf8_lossy(&body));
/// ```
#[derive(Debug)]
pub struct Client<C: Clock, S: Socket, Svc = NoService, const N: usize = MAX_OPEN_TRANSACTIONS> {
  engine: Engine<C, S, Svc, N>,
}

impl<C: Clock, S: Socket, Svc: Service, const N: usize> Client<C, S, Svc, N> {
  /// Create a client driving `engine`
  pub fn new(engine: Engine<C, S, Svc, N>) -> Self {
    Self { engine }
  }

  /// The engine this client drives
  pub fn engine(&mut self) -> &mut Engine<C, S, Svc, N> {
    &mut self.engine
  }

  /// Stop being a client, yielding the engine
  pub fn into_engine(self) -> Engine<C, S, Svc, N> {
    self.engine
  }

  /// Send a CON GET for `path` to `addr`, and collect the whole body
  pub fn get(&mut self, addr: SocketAddr, path: &str) -> Result<Body, RequestError<S::Error>> {
    let mut req = Message::new(Type::Con, Code::GET, Id(0), self.engine.new_token());
    req.set_path(path).map_err(|_| RequestError::Serialize)?;
    self.send(addr, req)
  }

  /// Send `req` to `addr`, and collect the whole body
  pub fn send(&mut self, addr: SocketAddr, req: Message) -> Result<Body, RequestError<S::Error>> {
    let mut body = Body::new();
    let mut overflow = false;

    self.send_with(addr, req, |resp| {
          let room = body.capacity() - body.len();
          overflow |= resp.payload().len() > room;
          body.extend_from_slice(&resp.payload()[..resp.payload().len().min(room)]);
        })?;

    if overflow {
      Err(RequestError::BodyTooLarge)
    } else {
      Ok(body)
    }
  }

  /// Send `req` to `addr`, invoking `on_block` with every block of the response
  pub fn send_with(&mut self,
                   addr: SocketAddr,
                   req: Message,
                   mut on_block: impl FnMut(&Message))
                   -> Result<(), RequestError<S::Error>> {
    let listener = self.engine.new_listener();
    let block_size = self.engine.config().blockwise.max_chunk_size;
    let mut req = BlockingRequest::new(addr, req, listener, block_size);

    loop {
      match req.resume(&mut self.engine, &mut on_block) {
        | Ok(()) => return Ok(()),
        | Err(nb::Error::Other(e)) => return Err(e),
        | Err(nb::Error::WouldBlock) => self.engine.poll().map_err(RequestError::Engine)?,
      }
    }
  }
}
