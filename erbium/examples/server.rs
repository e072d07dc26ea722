use std::net::UdpSocket;
use std::time::Duration;

use erbium::block::LAST_CHUNK;
use erbium::msg::{Code, ContentFormat, Message};
use erbium::rest::{Method, Methods, Resource, Resources, Rest};
use erbium::std::Clock;
use erbium::{Config, Engine, Status};

const LOG: &[u8] = b"boot ok\n\
radio up, channel 26\n\
joined dodag, rank 512\n\
temperature sensor calibrated\n\
first reading 21.4C\n\
second reading 21.6C\n";

fn hello(req: &Message, resp: &mut Message, _: u16, _: &mut i32) -> Result<(), Status> {
  let name = req.query_variable("name").unwrap_or("world");
  resp.set_content_format(ContentFormat::Text).ok();
  resp.set_payload(format!("hello, {}!", name).as_bytes())
      .map_err(|_| Status::MemoryAllocationError)
}

fn temp(req: &Message, resp: &mut Message, _: u16, _: &mut i32) -> Result<(), Status> {
  match req.method() {
    | Some(Method::Put) => {
      log::info!("calibration offset set to {:?}", req.post_variable("offset"));
      resp.set_status(Code::CHANGED);
      Ok(())
    },
    | _ => resp.set_payload(b"21.6").map_err(|_| Status::MemoryAllocationError),
  }
}

/// Serves the log one chunk at a time
fn log_chunks(_: &Message, resp: &mut Message, size: u16, offset: &mut i32) -> Result<(), Status> {
  let start = *offset as usize;
  let end = (start + size as usize).min(LOG.len());

  resp.set_payload(&LOG[start.min(end)..end])
      .map_err(|_| Status::MemoryAllocationError)?;
  *offset = if end == LOG.len() { LAST_CHUNK } else { end as i32 };
  Ok(())
}

fn main() {
  simple_logger::init_with_level(log::Level::Debug).unwrap();

  let resources = Resources::<4>::default().with(Resource { path: "hello",
                                                           methods: Methods::GET,
                                                           attributes: "rt=\"greeting\"",
                                                           handler: hello })
                                           .and_then(|r| {
                                             r.with(Resource { path: "sensors/temp",
                                                               methods: Methods::GET.with(Method::Put),
                                                               attributes: "rt=\"temperature\";ct=0",
                                                               handler: temp })
                                           })
                                           .and_then(|r| {
                                             r.with(Resource { path: "log",
                                                               methods: Methods::GET,
                                                               attributes: "ct=0",
                                                               handler: log_chunks })
                                           })
                                           .unwrap();

  let mut engine = Engine::<Clock, UdpSocket, _>::bind(Config::default(), Clock::new()).unwrap();
  engine.set_service_callback(resources);

  loop {
    if let Err(e) = engine.poll() {
      log::error!("{:?}", e);
    }
    std::thread::sleep(Duration::from_millis(1));
  }
}
