use std::net::UdpSocket;

use erbium::blocking::Client;
use erbium::std::Clock;
use erbium::{Config, Engine};
use no_std_net::SocketAddr;

fn main() {
  simple_logger::init_with_level(log::Level::Info).unwrap();

  let server: SocketAddr = "127.0.0.1:5683".parse().unwrap();
  let engine = Engine::<Clock, UdpSocket>::bind(Config::default().port(0), Clock::new()).unwrap();
  let mut client = Client::new(engine);

  ["hello", ".well-known/core", "log"].into_iter().for_each(|path| {
                                                   match client.get(server, path) {
                                                     | Ok(body) => log::info!("/{}: {}", path, String::from_utf8_lossy(&body)),
                                                     | Err(e) => log::error!("/{}: {:?}", path, e),
                                                   }
                                                 });
}
