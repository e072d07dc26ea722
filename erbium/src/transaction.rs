use embedded_time::Instant;
use erbium_msg::{Id, Message, MessageToBytesError, Token, TryIntoBytes, MAX_PACKET_SIZE};
use no_std_net::SocketAddr;
use tinyvec::ArrayVec;

use crate::retry::RetryTimer;
use crate::time::Clock;

/// Identifies a requester waiting on transaction outcomes,
/// see [`Callback::Queue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Listener(pub u16);

/// Who to tell when a transaction ends, either because a response
/// (or ACK / RST) arrived, or because it was abandoned.
///
/// The transaction is always removed from the pool before anyone is told,
/// so whoever is told is free to start a new one.
#[derive(Clone, Copy)]
pub enum Callback {
  /// Queue the outcome for the listener to collect with
  /// [`Engine::take_completion`](crate::Engine::take_completion)
  Queue(Listener),
  /// Invoke `f` with `data` and the response, or `None` if there was none
  Fn {
    /// Function to invoke
    f: fn(usize, Option<&Message>),
    /// Opaque data passed back to `f`
    data: usize,
  },
}

impl core::fmt::Debug for Callback {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    match self {
      | Self::Queue(l) => f.debug_tuple("Queue").field(l).finish(),
      | Self::Fn { data, .. } => f.debug_struct("Fn").field("data", data).finish(),
    }
  }
}

/// Where a transaction is in its lifecycle
#[derive(Debug)]
pub(crate) enum State<C: Clock> {
  /// Not sent yet
  Pending,
  /// CON sent and not yet acknowledged
  Unacked(RetryTimer<C>),
  /// Acknowledged (or sent NON); waiting for a
  /// separate response carrying `token`
  AwaitingResponse { token: Token, expires: Instant<C> },
}

/// An outbound message (and its serialized form) awaiting an outcome
#[derive(Debug)]
pub struct Transaction<C: Clock> {
  pub(crate) mid: Id,
  pub(crate) addr: SocketAddr,
  pub(crate) packet: ArrayVec<[u8; MAX_PACKET_SIZE]>,
  /// Who to tell when this transaction ends
  pub callback: Option<Callback>,
  pub(crate) state: State<C>,
}

impl<C: Clock> Transaction<C> {
  fn new(mid: Id, addr: SocketAddr) -> Self {
    Self { mid,
           addr,
           packet: Default::default(),
           callback: None,
           state: State::Pending }
  }

  /// Message id this transaction is keyed on
  pub fn mid(&self) -> Id {
    self.mid
  }

  /// Destination
  pub fn addr(&self) -> SocketAddr {
    self.addr
  }

  /// The serialized message
  pub fn packet(&self) -> &[u8] {
    &self.packet
  }

  /// Serialize `msg` as the message this transaction carries
  pub fn set_message(&mut self, msg: &Message) -> Result<(), MessageToBytesError> {
    self.packet = msg.try_into_bytes::<MAX_PACKET_SIZE>()?;
    Ok(())
  }

  /// Whether the message has been sent and is awaiting an ACK
  pub fn is_unacked(&self) -> bool {
    matches!(self.state, State::Unacked(_))
  }

  /// Whether the message has been acknowledged and is awaiting a separate response
  pub fn is_awaiting_response(&self) -> bool {
    matches!(self.state, State::AwaitingResponse { .. })
  }

  pub(crate) fn is_con(&self) -> bool {
    self.packet.first().map(|b| (b >> 4) & 0b11 == 0).unwrap_or(false)
  }

  pub(crate) fn is_request(&self) -> bool {
    self.packet
        .get(1)
        .map(|&code| code >> 5 == 0 && (1..=4).contains(&(code & 0b11111)))
        .unwrap_or(false)
  }

  pub(crate) fn token(&self) -> Token {
    let tkl = self.packet.first().map(|b| (b & 0b1111) as usize).unwrap_or(0);
    self.packet
        .get(4..4 + tkl)
        .map(Token::from_slice)
        .unwrap_or_default()
  }
}

/// Errors encounterable opening a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewTransactionError {
  /// Every slot in the pool is taken
  PoolExhausted,
  /// A transaction with this message id is already open
  DuplicateId(Id),
}

/// Fixed-capacity pool of open [`Transaction`]s, keyed by message id
#[derive(Debug)]
pub struct Transactions<C: Clock, const N: usize> {
  slots: [Option<Transaction<C>>; N],
}

impl<C: Clock, const N: usize> Default for Transactions<C, N> {
  fn default() -> Self {
    Self { slots: [(); N].map(|_| None) }
  }
}

impl<C: Clock, const N: usize> Transactions<C, N> {
  /// Claim a free slot for a transaction to `addr` with message id `mid`
  pub fn new_transaction(&mut self,
                         mid: Id,
                         addr: SocketAddr)
                         -> Result<&mut Transaction<C>, NewTransactionError> {
    if self.get(mid).is_some() {
      return Err(NewTransactionError::DuplicateId(mid));
    }

    self.slots
        .iter_mut()
        .find(|slot| slot.is_none())
        .map(|slot| slot.insert(Transaction::new(mid, addr)))
        .ok_or(NewTransactionError::PoolExhausted)
  }

  /// Find the open transaction with message id `mid`
  pub fn get(&self, mid: Id) -> Option<&Transaction<C>> {
    self.iter().find(|t| t.mid == mid)
  }

  /// Find the open transaction with message id `mid`
  pub fn get_mut(&mut self, mid: Id) -> Option<&mut Transaction<C>> {
    self.iter_mut().find(|t| t.mid == mid)
  }

  /// Release the transaction with message id `mid`, yielding it if it was open
  pub fn clear(&mut self, mid: Id) -> Option<Transaction<C>> {
    self.slots
        .iter_mut()
        .find(|slot| matches!(slot, Some(t) if t.mid == mid))
        .and_then(Option::take)
  }

  /// Find the acknowledged transaction to `addr` whose request carried `token`
  pub(crate) fn awaiting(&self, token: &Token, addr: SocketAddr) -> Option<Id> {
    self.iter()
        .find(|t| {
          t.addr == addr
          && matches!(&t.state, State::AwaitingResponse { token: tk, .. } if tk == token)
        })
        .map(|t| t.mid)
  }

  /// Iterate over the open transactions
  pub fn iter(&self) -> impl Iterator<Item = &Transaction<C>> {
    self.slots.iter().filter_map(Option::as_ref)
  }

  /// Iterate mutably over the open transactions
  pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Transaction<C>> {
    self.slots.iter_mut().filter_map(Option::as_mut)
  }

  /// Number of open transactions
  pub fn len(&self) -> usize {
    self.iter().count()
  }

  /// Whether no transactions are open
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Whether every slot is taken
  pub fn is_full(&self) -> bool {
    self.len() == N
  }
}
