use embedded_time::Instant;
use erbium_msg::{Code, Id, Message, Token, TryFromBytes, TryIntoBytes, Type, MAX_PACKET_SIZE};
use no_std_net::{IpAddr, Ipv4Addr, SocketAddr};
use rand::{Rng, SeedableRng};
use tinyvec::ArrayVec;

use crate::block::{self, Requested};
use crate::config::Config;
use crate::logging::msg_summary;
use crate::net::{Addrd, Socket};
use crate::rest::{NoService, Service};
use crate::retry::{RetryTimer, YouShould};
use crate::time::{self, Clock};
use crate::transaction::{Callback,
                         Listener,
                         NewTransactionError,
                         State,
                         Transaction,
                         Transactions};
use crate::Status;

/// Default capacity of the transaction pool
pub const MAX_OPEN_TRANSACTIONS: usize = 4;

/// Errors the engine can run into while talking to its platform
#[derive(Debug, PartialEq)]
pub enum Error<E> {
  /// The socket failed
  Sock(E),
  /// The clock failed
  Clock(embedded_time::clock::Error),
}

/// How a transaction ended, as seen by its [`Listener`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  /// The peer replied; either a response, or an ACK / RST
  Response(Message),
  /// Every transmission timed out, or the separate response never came
  NoResponse,
}

impl Default for Outcome {
  fn default() -> Self {
    Self::NoResponse
  }
}

#[derive(Debug, Clone, Default)]
struct Completion {
  listener: Listener,
  outcome: Outcome,
}

/// The CoAP engine.
///
/// Owns a clock, a socket, the pool of open transactions and (optionally)
/// the [`Service`] answering inbound requests. Nothing happens on its own;
/// drive it by calling [`Engine::poll`] (or [`Engine::receive`] when a
/// datagram is ready and [`Engine::check_transactions`] when a timer fires).
///
/// ```
/// use erbium::rest::{Methods, Resource, Resources};
/// use erbium::std::Clock;
/// use erbium::{Config, Engine, Status};
/// use erbium_msg::Message;
/// use std::net::UdpSocket;
///
/// fn hello(_: &Message, resp: &mut Message, _: u16, _: &mut i32) -> Result<(), Status> {
///   resp.set_payload(b"hello").map_err(|_| Status::MemoryAllocationError)
/// }
///
/// let resources = Resources::<4>::default().with(Resource { path: "hello",
///                                                          methods: Methods::GET,
///                                                          attributes: "",
///                                                          handler: hello })
///                                          .unwrap();
///
/// let mut engine = Engine::<Clock, UdpSocket, _>::bind(Config::default().port(0), Clock::new()).unwrap();
/// engine.set_service_callback(resources);
/// engine.poll().unwrap();
/// ```
#[derive(Debug)]
pub struct Engine<C: Clock, S: Socket, Svc = NoService, const N: usize = MAX_OPEN_TRANSACTIONS> {
  config: Config,
  clock: C,
  sock: S,
  service: Option<Svc>,
  transactions: Transactions<C, N>,
  completions: ArrayVec<[Completion; N]>,
  mid: Id,
  listeners: u16,
  tokens: u32,
}

impl<C: Clock, S: Socket, Svc: Service, const N: usize> Engine<C, S, Svc, N> {
  /// Create an engine on top of an already-open socket
  pub fn new(config: Config, clock: C, sock: S) -> Self {
    let now = clock.try_now().map(time::millis_since_epoch).unwrap_or(0);
    let mut rand = rand_chacha::ChaCha8Rng::seed_from_u64(now ^ u64::from(config.seed));

    Self { config,
           clock,
           sock,
           service: None,
           transactions: Transactions::default(),
           completions: ArrayVec::new(),
           mid: Id(rand.gen()),
           listeners: 0,
           tokens: rand.gen() }
  }

  /// Open a socket listening on the configured port and create an engine on top of it
  pub fn bind(config: Config, clock: C) -> Result<Self, S::Error> {
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), config.port);
    log::info!(target: "erbium", "listening on port {}", config.port);
    S::bind_raw(addr).map(|sock| Self::new(config, clock, sock))
  }

  /// Register the service answering inbound requests
  pub fn set_service_callback(&mut self, service: Svc) {
    self.service = Some(service);
  }

  /// The registered service
  pub fn service_mut(&mut self) -> Option<&mut Svc> {
    self.service.as_mut()
  }

  /// The runtime config
  pub fn config(&self) -> &Config {
    &self.config
  }

  /// The clock
  pub fn clock(&self) -> &C {
    &self.clock
  }

  /// The socket
  pub fn socket(&self) -> &S {
    &self.sock
  }

  /// Claim a fresh message id
  pub fn get_mid(&mut self) -> Id {
    self.mid = self.mid.next();
    self.mid
  }

  /// Generate a token for a new request
  pub fn new_token(&mut self) -> Token {
    self.tokens = self.tokens.wrapping_add(1);
    let now = self.now().map(time::millis_since_epoch).unwrap_or(0);

    let mut seed = [0u8; 14];
    seed[..2].copy_from_slice(&self.config.seed.to_be_bytes());
    seed[2..6].copy_from_slice(&self.tokens.to_be_bytes());
    seed[6..].copy_from_slice(&now.to_be_bytes());
    Token::opaque(&seed)
  }

  /// Claim a fresh [`Listener`] to hand to [`Callback::Queue`]
  pub fn new_listener(&mut self) -> Listener {
    self.listeners = self.listeners.wrapping_add(1);
    Listener(self.listeners)
  }

  /// Open a transaction for a message with id `mid` headed to `addr`
  pub fn new_transaction(&mut self,
                         mid: Id,
                         addr: SocketAddr)
                         -> Result<&mut Transaction<C>, NewTransactionError> {
    self.transactions.new_transaction(mid, addr)
  }

  /// The open transaction with message id `mid`
  pub fn transaction(&self, mid: Id) -> Option<&Transaction<C>> {
    self.transactions.get(mid)
  }

  /// The open transaction with message id `mid`
  pub fn transaction_mut(&mut self, mid: Id) -> Option<&mut Transaction<C>> {
    self.transactions.get_mut(mid)
  }

  /// The open transactions
  pub fn transactions(&self) -> &Transactions<C, N> {
    &self.transactions
  }

  /// Drop the transaction with message id `mid` without telling anyone
  pub fn clear_transaction(&mut self, mid: Id) {
    self.transactions.clear(mid);
  }

  /// Collect the outcome of a transaction started with [`Callback::Queue`]`(listener)`
  pub fn take_completion(&mut self, listener: Listener) -> Option<Outcome> {
    self.completions
        .iter()
        .position(|c| c.listener == listener)
        .map(|ix| self.completions.remove(ix).outcome)
  }

  /// Transmit the transaction with message id `mid`.
  ///
  /// CON messages are then retransmitted by [`Engine::check_transactions`]
  /// until acknowledged. Anything else is done with once sent, unless it
  /// is a request whose response someone is waiting for.
  pub fn send_transaction(&mut self, mid: Id) -> Result<(), Error<S::Error>> {
    let now = self.now()?;
    let con = self.config.con;

    let t = match self.transactions.get_mut(mid) {
      | Some(t) => t,
      | None => {
        log::warn!(target: "erbium", "no transaction with id {}", mid.0);
        return Ok(());
      },
    };

    log::trace!(target: "erbium", "-> {} mid={} ({} bytes)", t.addr(), mid.0, t.packet().len());
    nb::block!(self.sock.send(Addrd(t.packet(), t.addr()))).map_err(Error::Sock)?;

    if t.is_con() {
      if let State::Pending = t.state {
        t.state = State::Unacked(RetryTimer::new(now,
                                                 con.retry_strategy,
                                                 con.max_attempts,
                                                 u64::from(mid.0)));
      }
    } else if t.callback.is_some() && t.is_request() {
      t.state = State::AwaitingResponse { token: t.token(),
                                          expires: time::later(now, con.acked_timeout) };
    } else {
      self.transactions.clear(mid);
    }

    Ok(())
  }

  /// Retransmit CON messages whose timer fired, and abandon
  /// transactions that ran out of attempts or time.
  pub fn check_transactions(&mut self) -> Result<(), Error<S::Error>> {
    let now = self.now()?;
    let mut abandoned = ArrayVec::<[Id; N]>::new();
    let mut send_error = None;

    for t in self.transactions.iter_mut() {
      match &mut t.state {
        | State::Unacked(timer) => match timer.what_should_i_do(now) {
          | Ok(YouShould::Retry) => {
            log::debug!(target: "erbium",
                        "retransmitting mid={} (attempt {})",
                        t.mid.0,
                        timer.attempts().0);
            if let Err(e) = nb::block!(self.sock.send(Addrd(&t.packet[..], t.addr))) {
              log::error!(target: "erbium", "couldn't retransmit mid={}: {:?}", t.mid.0, e);
              send_error.get_or_insert(e);
            }
          },
          | Ok(YouShould::Cry) => abandoned.push(t.mid),
          | Err(nb::Error::WouldBlock) => (),
          | Err(nb::Error::Other(never)) => match never {},
        },
        | State::AwaitingResponse { expires, .. } if now >= *expires => abandoned.push(t.mid),
        | State::AwaitingResponse { .. } | State::Pending => (),
      }
    }

    for mid in abandoned {
      if let Some(t) = self.transactions.clear(mid) {
        log::warn!(target: "erbium", "giving up on mid={}, no response from {}", mid.0, t.addr());
        self.notify(t.callback, None);
      }
    }

    send_error.map(Error::Sock).map_or(Ok(()), Err)
  }

  /// Pull one datagram off the socket and process it
  pub fn receive(&mut self) -> nb::Result<Status, Error<S::Error>> {
    let mut buf = [0u8; MAX_PACKET_SIZE];
    let Addrd(n, addr) = self.sock
                             .recv(&mut buf)
                             .map_err(|e| e.map(Error::Sock))?;

    self.handle_datagram(Addrd(&buf[..n], addr))
        .map_err(nb::Error::Other)
  }

  /// Process every datagram waiting on the socket, then check the transactions' timers
  pub fn poll(&mut self) -> Result<(), Error<S::Error>> {
    loop {
      match self.receive() {
        | Ok(_) => continue,
        | Err(nb::Error::WouldBlock) => break,
        | Err(nb::Error::Other(e)) => return Err(e),
      }
    }

    self.check_transactions()
  }

  /// Process a datagram received from `addr`
  pub fn handle_datagram(&mut self, dgram: Addrd<&[u8]>) -> Result<Status, Error<S::Error>> {
    let Addrd(bytes, addr) = dgram;

    match Message::try_from_bytes(bytes) {
      | Ok(msg) => {
        log::trace!(target: "erbium", "<- {} {}", addr, msg_summary(&msg));
        if msg.code.is_request() {
          self.handle_request(msg, addr)
        } else {
          self.handle_response(msg, addr)
        }
      },
      | Err(e) => {
        log::warn!(target: "erbium", "malformed message from {}: {:?}", addr, e);
        let status = Status::from(e);

        // no reply without a mid, nor to ACK / RST
        match bytes {
          | [b0, _, m0, m1, ..] if (b0 >> 4) & 0b11 <= 1 => {
            self.reply_error(Addrd(Id::from_be_bytes([*m0, *m1]), addr), status)?
          },
          | _ => (),
        }

        Ok(status)
      },
    }
  }

  fn handle_request(&mut self, req: Message, addr: SocketAddr) -> Result<Status, Error<S::Error>> {
    if let Err(e) = self.transactions.new_transaction(req.id, addr) {
      log::warn!(target: "erbium", "can't open a transaction for mid={}: {:?}", req.id.0, e);
      let status = Status::respond(Code::SERVICE_UNAVAILABLE, "NoFreeTraBuffer");
      self.reply_error(Addrd(req.id, addr), status)?;
      return Ok(status);
    }

    let status = match self.respond(&req) {
      | Ok(()) => Status::NoError,
      | Err(status) => status,
    };

    match status {
      | Status::NoError => self.send_transaction(req.id)?,
      | Status::ManualResponse => self.clear_transaction(req.id),
      | _ => {
        self.clear_transaction(req.id);
        self.reply_error(Addrd(req.id, addr), status)?;
      },
    }

    Ok(status)
  }

  fn respond(&mut self, req: &Message) -> Result<(), Status> {
    let blockwise = self.config.blockwise;

    let mut resp = match req.ty {
      | Type::Con => Message::new(Type::Ack, Code::CONTENT, req.id, req.token),
      | _ => Message::new(Type::Non, Code::CONTENT, self.get_mid(), req.token),
    };

    let requested = req.block2()
                       .map(|b| Requested::new(b, blockwise.max_block_size))
                       .transpose()?;
    let preferred_size = requested.map(|b| b.size)
                                  .unwrap_or(blockwise.max_chunk_size);
    let offset = requested.map(|b| b.offset as i32).unwrap_or(0);
    let mut new_offset = offset;

    let service = self.service
                      .as_mut()
                      .ok_or_else(|| Status::respond(Code::NOT_IMPLEMENTED, "NoServiceCallbck"))?;

    if service.handle(req, &mut resp, preferred_size, &mut new_offset)? {
      block::negotiate(req, &mut resp, requested, new_offset, blockwise.max_block_size)?;
    }

    self.transactions
        .get_mut(req.id)
        .ok_or(Status::MemoryAllocationError)?
        .set_message(&resp)
        .map_err(|e| {
          log::error!(target: "erbium", "couldn't serialize response: {:?}", e);
          Status::PacketSerializationError
        })
  }

  fn handle_response(&mut self, msg: Message, addr: SocketAddr) -> Result<Status, Error<S::Error>> {
    if msg.is_ping() {
      log::debug!(target: "erbium", "ping from {}", addr);
      self.reply_error(Addrd(msg.id, addr), Status::PingResponse)?;
      return Ok(Status::PingResponse);
    }

    match msg.ty {
      | Type::Ack => log::debug!(target: "erbium", "received ACK mid={}", msg.id.0),
      | Type::Reset => log::debug!(target: "erbium", "received RST mid={}", msg.id.0),
      | _ => (),
    }

    let now = self.now()?;
    let acked_timeout = self.config.con.acked_timeout;

    if let Some(t) = self.transactions.get_mut(msg.id) {
      let separate_response_follows = msg.ty == Type::Ack
                                      && msg.is_empty()
                                      && t.callback.is_some()
                                      && t.is_request();

      if separate_response_follows {
        log::debug!(target: "erbium", "mid={} acknowledged, awaiting separate response", msg.id.0);
        t.state = State::AwaitingResponse { token: t.token(),
                                            expires: time::later(now, acked_timeout) };
      } else if let Some(t) = self.transactions.clear(msg.id) {
        self.notify(t.callback, Some(msg));
      }
    } else if msg.code.is_response() {
      match self.transactions.awaiting(&msg.token, addr) {
        | Some(mid) => {
          if msg.ty == Type::Con {
            self.send_message(Addrd(&msg.ack(), addr))?;
          }

          if let Some(t) = self.transactions.clear(mid) {
            self.notify(t.callback, Some(msg));
          }
        },
        | None => log::debug!(target: "erbium", "unsolicited response from {}", addr),
      }
    }

    Ok(Status::NoError)
  }

  fn reply_error(&mut self, to: Addrd<Id>, status: Status) -> Result<(), Error<S::Error>> {
    let Addrd(mid, addr) = to;
    let ty = match status {
      | Status::PingResponse => Type::Reset,
      | _ => Type::Ack,
    };

    let mut reply = Message::new(ty, status.reply_code(), mid, Token::default());
    reply.set_payload(status.message().as_bytes()).ok();

    log::debug!(target: "erbium", "replying {} to mid={}: {}", reply.code.to_human(), mid.0, status.message());
    self.send_message(Addrd(&reply, addr))
  }

  fn send_message(&mut self, msg: Addrd<&Message>) -> Result<(), Error<S::Error>> {
    match msg.data().try_into_bytes::<MAX_PACKET_SIZE>() {
      | Ok(bytes) => nb::block!(self.sock.send(Addrd(&bytes[..], msg.addr()))).map_err(Error::Sock),
      | Err(e) => {
        log::error!(target: "erbium", "couldn't serialize {}: {:?}", msg_summary(msg.data()), e);
        Ok(())
      },
    }
  }

  fn notify(&mut self, callback: Option<Callback>, response: Option<Message>) {
    match callback {
      | None => (),
      | Some(Callback::Fn { f, data }) => f(data, response.as_ref()),
      | Some(Callback::Queue(listener)) => {
        if self.completions.len() == self.completions.capacity() {
          log::warn!(target: "erbium", "completion queue full, dropping the oldest");
          self.completions.remove(0);
        }

        let outcome = response.map(Outcome::Response)
                              .unwrap_or(Outcome::NoResponse);
        self.completions.push(Completion { listener, outcome });
      },
    }
  }

  fn now(&self) -> Result<Instant<C>, Error<S::Error>> {
    self.clock.try_now().map_err(Error::Clock)
  }
}

#[cfg(test)]
mod tests {
  use core::sync::atomic::{AtomicUsize, Ordering};

  use erbium_msg::Block;

  use super::*;
  use crate::rest::{Methods, Resource, Resources};
  use crate::test::{ClockMock, SockMock};

  type Server = Engine<ClockMock, SockMock, Resources<4>>;
  type Client = Engine<ClockMock, SockMock>;

  const BIG: &[u8] = b"0123456789abcdef0123456789ABCDEF0123456789abcdef0123456789ABCDEF";

  fn peer() -> SocketAddr {
    "10.0.0.2:5683".parse().unwrap()
  }

  fn hello(_: &Message, resp: &mut Message, _: u16, _: &mut i32) -> Result<(), Status> {
    resp.set_payload(b"hello").map_err(|_| Status::MemoryAllocationError)
  }

  fn big(_: &Message, resp: &mut Message, _: u16, _: &mut i32) -> Result<(), Status> {
    resp.set_payload(BIG).map_err(|_| Status::MemoryAllocationError)
  }

  fn manual(_: &Message, _: &mut Message, _: u16, _: &mut i32) -> Result<(), Status> {
    Err(Status::ManualResponse)
  }

  fn server() -> (Server, SockMock) {
    let sock = SockMock::new();
    let resources = Resources::default().with(Resource { path: "hello",
                                                         methods: Methods::GET,
                                                         attributes: "",
                                                         handler: hello })
                                        .and_then(|r| {
                                          r.with(Resource { path: "big",
                                                            methods: Methods::GET,
                                                            attributes: "",
                                                            handler: big })
                                        })
                                        .and_then(|r| {
                                          r.with(Resource { path: "manual",
                                                            methods: Methods::GET,
                                                            attributes: "",
                                                            handler: manual })
                                        })
                                        .unwrap();

    let mut engine = Server::new(Config::default(), ClockMock::new(), sock.clone());
    engine.set_service_callback(resources);
    (engine, sock)
  }

  fn client() -> (Client, SockMock) {
    let sock = SockMock::new();
    (Client::new(Config::default(), ClockMock::new(), sock.clone()), sock)
  }

  fn get(ty: Type, id: u16, path: &str) -> Message {
    let mut req = Message::new(ty, Code::GET, Id(id), Token::from_slice(&[1, 2]));
    req.set_path(path).unwrap();
    req
  }

  fn only_sent(sock: &SockMock) -> Message {
    let mut sent = sock.sent();
    assert_eq!(sent.len(), 1);
    let Addrd(msg, addr) = sent.remove(0);
    assert_eq!(addr, peer());
    msg
  }

  /// Send a CON GET from a client engine, yielding its mid & token
  fn send_get(engine: &mut Client, listener: Listener) -> (Id, Token) {
    let mid = engine.get_mid();
    let token = engine.new_token();
    let mut req = get(Type::Con, mid.0, "hello");
    req.token = token;

    let t = engine.new_transaction(mid, peer()).unwrap();
    t.callback = Some(Callback::Queue(listener));
    t.set_message(&req).unwrap();
    engine.send_transaction(mid).unwrap();

    (mid, token)
  }

  #[test]
  fn con_request_gets_piggybacked_ack() {
    let (mut engine, sock) = server();
    sock.push(Addrd(&get(Type::Con, 7, "hello"), peer()));
    engine.poll().unwrap();

    let resp = only_sent(&sock);
    assert_eq!(resp.ty, Type::Ack);
    assert_eq!(resp.id, Id(7));
    assert_eq!(resp.code, Code::CONTENT);
    assert_eq!(resp.token, Token::from_slice(&[1, 2]));
    assert_eq!(resp.payload(), b"hello");
    assert!(engine.transactions().is_empty());
  }

  #[test]
  fn non_request_gets_non_response() {
    let (mut engine, sock) = server();
    sock.push(Addrd(&get(Type::Non, 7, "hello"), peer()));
    engine.poll().unwrap();

    let resp = only_sent(&sock);
    assert_eq!(resp.ty, Type::Non);
    assert_ne!(resp.id, Id(7));
    assert_eq!(resp.token, Token::from_slice(&[1, 2]));
    assert_eq!(resp.payload(), b"hello");
    assert!(engine.transactions().is_empty());
  }

  #[test]
  fn ping_gets_reset() {
    let (mut engine, sock) = server();
    sock.push(Addrd(&Message::empty(Type::Con, Id(3)), peer()));
    engine.poll().unwrap();

    let rst = only_sent(&sock);
    assert_eq!(rst.ty, Type::Reset);
    assert_eq!(rst.id, Id(3));
    assert_eq!(rst.code, Code::EMPTY);
    assert!(rst.payload().is_empty());
  }

  #[test]
  fn no_service() {
    let (mut engine, sock) = client();
    sock.push(Addrd(&get(Type::Con, 9, "hello"), peer()));
    engine.poll().unwrap();

    let resp = only_sent(&sock);
    assert_eq!(resp.ty, Type::Ack);
    assert_eq!(resp.id, Id(9));
    assert_eq!(resp.code, Code::NOT_IMPLEMENTED);
    assert_eq!(resp.token, Token::default());
    assert_eq!(resp.payload(), b"NoServiceCallbck");
    assert!(engine.transactions().is_empty());
  }

  #[test]
  fn pool_exhausted() {
    let (mut engine, sock) = server();
    (0..MAX_OPEN_TRANSACTIONS as u16).for_each(|n| {
                                       engine.new_transaction(Id(100 + n), peer()).unwrap();
                                     });

    sock.push(Addrd(&get(Type::Con, 9, "hello"), peer()));
    engine.poll().unwrap();

    let resp = only_sent(&sock);
    assert_eq!(resp.id, Id(9));
    assert_eq!(resp.code, Code::SERVICE_UNAVAILABLE);
    assert_eq!(resp.payload(), b"NoFreeTraBuffer");
    assert_eq!(engine.transactions().len(), MAX_OPEN_TRANSACTIONS);
  }

  #[test]
  fn not_found() {
    let (mut engine, sock) = server();
    sock.push(Addrd(&get(Type::Con, 2, "nothing/here"), peer()));
    engine.poll().unwrap();

    let resp = only_sent(&sock);
    assert_eq!(resp.id, Id(2));
    assert_eq!(resp.code, Code::NOT_FOUND);
  }

  #[test]
  fn malformed_con_gets_error_reply() {
    let (mut engine, sock) = server();
    let status = engine.handle_datagram(Addrd(&[0b0100_1001u8, 1, 0, 5][..], peer()))
                       .unwrap();

    assert_eq!(status.reply_code(), Code::BAD_REQUEST);
    let resp = only_sent(&sock);
    assert_eq!(resp.ty, Type::Ack);
    assert_eq!(resp.id, Id(5));
    assert_eq!(resp.code, Code::BAD_REQUEST);
    assert_eq!(resp.payload(), b"Invalid token length");
  }

  #[test]
  fn malformed_ack_and_runts_are_dropped() {
    let (mut engine, sock) = server();
    engine.handle_datagram(Addrd(&[0b0110_1001u8, 1, 0, 5][..], peer()))
          .unwrap();
    engine.handle_datagram(Addrd(&[0b0100_0000u8, 1, 0][..], peer()))
          .unwrap();

    assert_eq!(sock.sent_count(), 0);
  }

  #[test]
  fn manual_response_sends_nothing() {
    let (mut engine, sock) = server();
    let req = get(Type::Con, 4, "manual").try_into_bytes::<MAX_PACKET_SIZE>()
                                          .unwrap();
    let status = engine.handle_datagram(Addrd(&req[..], peer())).unwrap();

    assert_eq!(status, Status::ManualResponse);
    assert_eq!(sock.sent_count(), 0);
    assert!(engine.transactions().is_empty());
  }

  #[test]
  fn unaware_resource_is_served_in_blocks() {
    let (mut engine, sock) = server();
    let mut req = get(Type::Con, 11, "big");
    req.set_block2(Block::new(16, 3, false)).unwrap();
    sock.push(Addrd(&req, peer()));
    engine.poll().unwrap();

    let resp = only_sent(&sock);
    assert_eq!(resp.code, Code::CONTENT);
    assert_eq!(resp.payload(), &BIG[48..]);
    assert_eq!(resp.block2(), Some(Block::new(16, 3, false)));
  }

  #[test]
  fn block_out_of_scope() {
    let (mut engine, sock) = server();
    let mut req = get(Type::Con, 11, "big");
    req.set_block2(Block::new(16, 4, false)).unwrap();
    sock.push(Addrd(&req, peer()));
    engine.poll().unwrap();

    let resp = only_sent(&sock);
    assert_eq!(resp.code, Code::BAD_OPTION);
    assert_eq!(resp.payload(), b"BlockOutOfScope");
  }

  #[test]
  fn block_far_past_the_end() {
    let (mut engine, sock) = server();

    // 4 byte Block2 value, num 2^26
    let mut req = get(Type::Con, 12, "big");
    req.set_block2(Block::from(0x4000_0002)).unwrap();
    sock.push(Addrd(&req, peer()));
    engine.poll().unwrap();

    let resp = only_sent(&sock);
    assert_eq!(resp.code, Code::BAD_OPTION);
    assert_eq!(resp.payload(), b"Block option too long");
    assert_eq!(resp.block2(), None);

    // largest block number 3 bytes can carry
    let mut req = get(Type::Con, 13, "big");
    req.set_block2(Block::new(16, Block::MAX_NUM, false)).unwrap();
    sock.push(Addrd(&req, peer()));
    engine.poll().unwrap();

    let resp = only_sent(&sock);
    assert_eq!(resp.code, Code::BAD_OPTION);
    assert_eq!(resp.payload(), b"BlockOutOfScope");
  }

  #[test]
  fn piggybacked_response_completes_transaction() {
    let (mut engine, sock) = client();
    let listener = engine.new_listener();
    let (mid, token) = send_get(&mut engine, listener);
    assert_eq!(only_sent(&sock).id, mid);
    assert!(engine.transaction(mid).unwrap().is_unacked());

    let mut resp = Message::new(Type::Ack, Code::CONTENT, mid, token);
    resp.set_payload(b"22.5").unwrap();
    sock.push(Addrd(&resp, peer()));
    engine.poll().unwrap();

    assert!(engine.transaction(mid).is_none());
    assert_eq!(engine.take_completion(listener), Some(Outcome::Response(resp)));
    assert_eq!(engine.take_completion(listener), None);
  }

  #[test]
  fn con_is_abandoned_after_max_attempts() {
    let (mut engine, sock) = client();
    let listener = engine.new_listener();
    let (mid, _) = send_get(&mut engine, listener);

    for _ in 0..10 {
      assert_eq!(engine.take_completion(listener), None);
      engine.clock().advance(100_000);
      engine.poll().unwrap();
      if engine.transaction(mid).is_none() {
        break;
      }
    }

    let sent = sock.sent();
    assert_eq!(sent.len(), 5);
    assert!(sent.iter().all(|Addrd(msg, _)| msg.id == mid && msg.ty == Type::Con));
    assert_eq!(engine.take_completion(listener), Some(Outcome::NoResponse));
  }

  #[test]
  fn failed_retransmit_still_abandons_expired() {
    let (mut engine, sock) = client();
    let first = engine.new_listener();
    let (first_mid, _) = send_get(&mut engine, first);

    for _ in 0..4 {
      engine.clock().advance(100_000);
      engine.poll().unwrap();
    }
    assert_eq!(sock.sent().len(), 5);

    let second = engine.new_listener();
    let (second_mid, _) = send_get(&mut engine, second);
    sock.sent();

    sock.set_send_fails(true);
    engine.clock().advance(100_000);
    assert!(matches!(engine.poll(), Err(Error::Sock(_))));

    assert!(engine.transaction(first_mid).is_none());
    assert_eq!(engine.take_completion(first), Some(Outcome::NoResponse));
    assert!(engine.transaction(second_mid).unwrap().is_unacked());
    assert_eq!(sock.sent_count(), 0);

    sock.set_send_fails(false);
    engine.clock().advance(100_000);
    engine.poll().unwrap();
    assert_eq!(only_sent(&sock).id, second_mid);
  }

  #[test]
  fn con_is_not_retransmitted_early() {
    let (mut engine, sock) = client();
    let listener = engine.new_listener();
    send_get(&mut engine, listener);

    engine.clock().advance(2_999);
    engine.poll().unwrap();
    assert_eq!(sock.sent_count(), 1);

    engine.clock().advance(1_501);
    engine.poll().unwrap();
    assert_eq!(sock.sent_count(), 2);
  }

  #[test]
  fn separate_response() {
    let (mut engine, sock) = client();
    let listener = engine.new_listener();
    let (mid, token) = send_get(&mut engine, listener);
    sock.sent();

    sock.push(Addrd(&Message::empty(Type::Ack, mid), peer()));
    engine.poll().unwrap();
    assert!(engine.transaction(mid).unwrap().is_awaiting_response());
    assert_eq!(engine.take_completion(listener), None);

    // acknowledged; nothing to retransmit
    engine.clock().advance(10_000);
    engine.poll().unwrap();
    assert_eq!(sock.sent_count(), 0);

    let mut resp = Message::new(Type::Con, Code::CONTENT, Id(900), token);
    resp.set_payload(b"late").unwrap();
    sock.push(Addrd(&resp, peer()));
    engine.poll().unwrap();

    let ack = only_sent(&sock);
    assert_eq!(ack.ty, Type::Ack);
    assert_eq!(ack.id, Id(900));
    assert_eq!(ack.code, Code::EMPTY);

    assert!(engine.transactions().is_empty());
    assert_eq!(engine.take_completion(listener), Some(Outcome::Response(resp)));
  }

  #[test]
  fn separate_response_times_out() {
    let (mut engine, sock) = client();
    let listener = engine.new_listener();
    let (mid, _) = send_get(&mut engine, listener);

    sock.push(Addrd(&Message::empty(Type::Ack, mid), peer()));
    engine.poll().unwrap();

    engine.clock().advance(29_999);
    engine.poll().unwrap();
    assert_eq!(engine.take_completion(listener), None);

    engine.clock().advance(2);
    engine.poll().unwrap();
    assert_eq!(engine.take_completion(listener), Some(Outcome::NoResponse));
    assert!(engine.transactions().is_empty());
  }

  #[test]
  fn separate_response_from_someone_else_is_ignored() {
    let (mut engine, sock) = client();
    let listener = engine.new_listener();
    let (mid, token) = send_get(&mut engine, listener);
    sock.sent();

    sock.push(Addrd(&Message::empty(Type::Ack, mid), peer()));
    sock.push(Addrd(&Message::new(Type::Non, Code::CONTENT, Id(901), token),
                    "10.0.0.3:5683".parse().unwrap()));
    engine.poll().unwrap();

    assert!(engine.transaction(mid).unwrap().is_awaiting_response());
    assert_eq!(engine.take_completion(listener), None);
  }

  static CALLS: AtomicUsize = AtomicUsize::new(0);
  static DATA: AtomicUsize = AtomicUsize::new(0);

  fn on_reset(data: usize, resp: Option<&Message>) {
    assert_eq!(resp.map(|m| m.ty), Some(Type::Reset));
    CALLS.fetch_add(1, Ordering::SeqCst);
    DATA.store(data, Ordering::SeqCst);
  }

  #[test]
  fn fn_callback_sees_reset() {
    let (mut engine, sock) = client();
    let mid = engine.get_mid();
    let t = engine.new_transaction(mid, peer()).unwrap();
    t.callback = Some(Callback::Fn { f: on_reset,
                                     data: 42 });
    t.set_message(&get(Type::Con, mid.0, "hello")).unwrap();
    engine.send_transaction(mid).unwrap();
    sock.sent();

    sock.push(Addrd(&Message::empty(Type::Reset, mid), peer()));
    engine.poll().unwrap();

    assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    assert_eq!(DATA.load(Ordering::SeqCst), 42);
    assert!(engine.transactions().is_empty());
  }

  #[test]
  fn non_without_callback_is_forgotten_once_sent() {
    let (mut engine, sock) = client();
    let mid = engine.get_mid();
    engine.new_transaction(mid, peer())
          .unwrap()
          .set_message(&get(Type::Non, mid.0, "hello"))
          .unwrap();
    engine.send_transaction(mid).unwrap();

    assert_eq!(sock.sent_count(), 1);
    assert!(engine.transactions().is_empty());
  }

  #[test]
  fn completion_queue_drops_oldest() {
    let (mut engine, sock) = client();
    let listeners = (0..=MAX_OPEN_TRANSACTIONS).map(|_| engine.new_listener())
                                               .collect::<::std::vec::Vec<_>>();

    for &l in &listeners {
      let (mid, token) = send_get(&mut engine, l);
      sock.push(Addrd(&Message::new(Type::Ack, Code::CONTENT, mid, token), peer()));
      engine.poll().unwrap();
    }

    assert_eq!(engine.take_completion(listeners[0]), None);
    assert!(listeners[1..].iter()
                          .all(|&l| engine.take_completion(l).is_some()));
  }

  #[test]
  fn mids_increase() {
    let (mut engine, _) = client();
    let a = engine.get_mid();
    let b = engine.get_mid();
    assert_eq!(a.next(), b);
    assert_ne!(engine.new_token(), engine.new_token());
  }
}
