use ::std::io;
use ::std::net::{self as std_net, UdpSocket};

use no_std_net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};

use crate::net::{Addrd, Socket};

pub(crate) fn io_to_nb(err: io::Error) -> nb::Error<io::Error> {
  match err.kind() {
    | io::ErrorKind::WouldBlock => nb::Error::WouldBlock,
    | _ => nb::Error::Other(err),
  }
}

/// Convert a `no_std_net` address to its `std` counterpart
pub fn to_std(addr: SocketAddr) -> std_net::SocketAddr {
  match addr {
    | SocketAddr::V4(v4) => {
      let [a, b, c, d] = v4.ip().octets();
      std_net::SocketAddr::V4(std_net::SocketAddrV4::new(std_net::Ipv4Addr::new(a, b, c, d),
                                                         v4.port()))
    },
    | SocketAddr::V6(v6) => {
      let [a, b, c, d, e, f, g, h] = v6.ip().segments();
      std_net::SocketAddr::V6(std_net::SocketAddrV6::new(std_net::Ipv6Addr::new(a, b, c, d, e, f, g, h),
                                                         v6.port(),
                                                         v6.flowinfo(),
                                                         v6.scope_id()))
    },
  }
}

/// Convert a `std` address to its `no_std_net` counterpart
pub fn from_std(addr: std_net::SocketAddr) -> SocketAddr {
  match addr {
    | std_net::SocketAddr::V4(v4) => {
      let [a, b, c, d] = v4.ip().octets();
      SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(a, b, c, d), v4.port()))
    },
    | std_net::SocketAddr::V6(v6) => {
      let [a, b, c, d, e, f, g, h] = v6.ip().segments();
      SocketAddr::V6(SocketAddrV6::new(Ipv6Addr::new(a, b, c, d, e, f, g, h),
                                       v6.port(),
                                       v6.flowinfo(),
                                       v6.scope_id()))
    },
  }
}

/// The address a `std` socket is bound to, with the
/// unspecified address swapped for localhost
pub fn local_addr(sock: &UdpSocket) -> io::Result<SocketAddr> {
  sock.local_addr().map(from_std).map(|addr| match addr.ip() {
                                    | IpAddr::V4(ip) if ip.is_unspecified() => {
                                      SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), addr.port())
                                    },
                                    | _ => addr,
                                  })
}

impl Socket for UdpSocket {
  type Error = io::Error;

  fn bind_raw(addr: SocketAddr) -> io::Result<Self> {
    let sock = UdpSocket::bind(to_std(addr))?;
    sock.set_nonblocking(true)?;
    Ok(sock)
  }

  fn send(&self, msg: Addrd<&[u8]>) -> nb::Result<(), io::Error> {
    self.send_to(msg.data(), to_std(msg.addr()))
        .map(|_| ())
        .map_err(io_to_nb)
  }

  fn recv(&self, buffer: &mut [u8]) -> nb::Result<Addrd<usize>, io::Error> {
    self.recv_from(buffer)
        .map(|(n, addr)| Addrd(n, from_std(addr)))
        .map_err(io_to_nb)
  }
}
