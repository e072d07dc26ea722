use no_std_net::SocketAddr;

/// A datagram (or anything derived from one) paired with the
/// address of the peer it came from or is headed to.
///
/// ```
/// use erbium::Addrd;
/// use no_std_net::SocketAddr;
///
/// let peer: SocketAddr = "10.0.0.1:5683".parse().unwrap();
/// let dgram = Addrd(vec![0x40, 0x01, 0x00, 0x07], peer);
///
/// assert_eq!(dgram.map(|bytes| bytes.len()), Addrd(4, peer));
/// ```
#[derive(PartialEq, PartialOrd, Eq, Ord, Hash, Debug, Clone, Copy)]
pub struct Addrd<T>(pub T, pub SocketAddr);

impl<T> Addrd<T> {
  /// Transform the contents, keeping the peer address
  pub fn map<R>(self, f: impl FnOnce(T) -> R) -> Addrd<R> {
    let Addrd(t, addr) = self;
    Addrd(f(t), addr)
  }

  /// The contents
  pub fn data(&self) -> &T {
    &self.0
  }

  /// The peer address
  pub fn addr(&self) -> SocketAddr {
    self.1
  }
}

/// The UDP transport the engine sends and receives datagrams through.
///
/// Implementations are expected to be non-blocking; `recv`
/// yields `nb::Error::WouldBlock` when nothing has arrived.
pub trait Socket: Sized {
  /// Errors reported by the transport
  type Error: core::fmt::Debug;

  /// Open a socket listening on `addr`
  fn bind_raw(addr: SocketAddr) -> Result<Self, Self::Error>;

  /// Transmit one datagram to `dgram.addr()`
  fn send(&self, dgram: Addrd<&[u8]>) -> nb::Result<(), Self::Error>;

  /// Copy the next buffered datagram into `buffer`, yielding
  /// its length and the address of the peer that sent it.
  ///
  /// Datagrams longer than `buffer` are truncated.
  fn recv(&self, buffer: &mut [u8]) -> nb::Result<Addrd<usize>, Self::Error>;
}
