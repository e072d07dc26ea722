//! Blockwise-aware requests driven by the caller.
//!
//! A [`BlockingRequest`] sends a request and keeps asking for the next
//! Block2 block until the server says there are no more, handing every
//! block it receives to a callback. It never blocks a thread; instead
//! [`BlockingRequest::resume`] yields `nb::Error::WouldBlock` while
//! the current block is in flight and picks up where it left off
//! on the next call.

use erbium_msg::{Block, Id, Message};
use no_std_net::SocketAddr;

use crate::engine::{Engine, Error, Outcome};
use crate::net::Socket;
use crate::rest::Service;
use crate::retry::Attempts;
use crate::time::Clock;
use crate::transaction::{Callback, Listener, NewTransactionError};

/// Errors encounterable while performing a [`BlockingRequest`]
#[derive(Debug, PartialEq)]
pub enum RequestError<E> {
  /// The engine failed to reach the network
  Engine(Error<E>),
  /// No free transaction to send the next block with
  NoTransaction(NewTransactionError),
  /// The request could not be serialized
  Serialize,
  /// The server stopped responding
  Timeout,
  /// The server kept answering with the wrong block
  TooManyBlockErrors,
  /// The reassembled body did not fit the caller's buffer
  BodyTooLarge,
  /// Resumed after already failing
  Aborted,
}

/// Where a [`BlockingRequest`] is at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
  /// About to send the next block request
  Init,
  /// The block request is registered with the engine but not yet sent
  Armed(Id),
  /// Waiting for the response to the block request
  Waiting(Id),
  /// The whole body was received
  Done,
  /// Gave up; see the error yielded by [`BlockingRequest::resume`]
  Failed,
}

/// A request downloaded block by block
#[derive(Debug, Clone)]
pub struct BlockingRequest {
  addr: SocketAddr,
  request: Message,
  listener: Listener,
  block_size: u16,
  block_num: u32,
  block_errors: u16,
  more: bool,
  state: State,
}

impl BlockingRequest {
  /// Prepare to send `request` to `addr`, asking for blocks of `block_size` bytes.
  ///
  /// Outcomes are collected from the engine under `listener`
  /// (see [`Engine::new_listener`]).
  pub fn new(addr: SocketAddr, request: Message, listener: Listener, block_size: u16) -> Self {
    Self { addr,
           request,
           listener,
           block_size,
           block_num: 0,
           block_errors: 0,
           more: false,
           state: State::Init }
  }

  /// Where this request is at
  pub fn state(&self) -> State {
    self.state
  }

  /// Number of the next block to be requested
  pub fn block_num(&self) -> u32 {
    self.block_num
  }

  /// Move the request forward as far as possible without waiting.
  ///
  /// `on_block` is invoked with every response carrying the block
  /// that was asked for. Yields `Ok(())` once the server reports no
  /// more blocks, and `nb::Error::WouldBlock` while a block is in flight;
  /// poll the engine and call again.
  pub fn resume<C, S, Svc, const N: usize>(&mut self,
                                           engine: &mut Engine<C, S, Svc, N>,
                                           mut on_block: impl FnMut(&Message))
                                           -> nb::Result<(), RequestError<S::Error>>
    where C: Clock,
          S: Socket,
          Svc: Service
  {
    loop {
      match self.state {
        | State::Init => {
          let mid = engine.get_mid();
          self.request.id = mid;
          self.request
              .set_block2(Block::new(self.block_size, self.block_num, false))
              .map_err(|_| self.fail(RequestError::Serialize))?;

          let t = engine.new_transaction(mid, self.addr)
                        .map_err(|e| self.fail(RequestError::NoTransaction(e)))?;
          t.callback = Some(Callback::Queue(self.listener));

          if let Err(e) = t.set_message(&self.request) {
            log::error!(target: "erbium", "couldn't serialize request: {:?}", e);
            engine.clear_transaction(mid);
            return Err(self.fail(RequestError::Serialize));
          }

          self.state = State::Armed(mid);
        },
        | State::Armed(mid) => {
          engine.send_transaction(mid)
                .map_err(|e| self.fail(RequestError::Engine(e)))?;
          self.state = State::Waiting(mid);
        },
        | State::Waiting(_) => match engine.take_completion(self.listener) {
          | None => return Err(nb::Error::WouldBlock),
          | Some(Outcome::NoResponse) => {
            log::warn!(target: "erbium", "server not responding");
            return Err(self.fail(RequestError::Timeout));
          },
          | Some(Outcome::Response(resp)) => {
            self.received(&resp, &mut on_block);

            if !self.more {
              self.state = State::Done;
            } else if Attempts(self.block_errors) >= engine.config().con.max_attempts {
              return Err(self.fail(RequestError::TooManyBlockErrors));
            } else {
              self.state = State::Init;
            }
          },
        },
        | State::Done => return Ok(()),
        | State::Failed => return Err(nb::Error::Other(RequestError::Aborted)),
      }
    }
  }

  fn received(&mut self, resp: &Message, on_block: &mut impl FnMut(&Message)) {
    let (num, more) = resp.block2()
                          .map(|b| (b.num(), b.more()))
                          .unwrap_or((0, false));

    if num == self.block_num {
      on_block(resp);
      self.block_num += 1;
    } else {
      log::warn!(target: "erbium",
                 "wrong block: got {}, expected {}",
                 num,
                 self.block_num);
      self.block_errors += 1;
    }

    self.more = more;
  }

  fn fail<E>(&mut self, e: RequestError<E>) -> nb::Error<RequestError<E>> {
    self.state = State::Failed;
    nb::Error::Other(e)
  }
}
