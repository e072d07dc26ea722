use core::fmt::Write;

use erbium_common::Writable;
use erbium_msg::Message;

pub(crate) fn msg_summary(msg: &Message) -> Writable<96> {
  let mut buf = Writable::<96>::default();
  write!(buf,
         "{:?} {} mid={} tkl={} with {} byte payload",
         msg.ty,
         msg.code.to_human(),
         msg.id.0,
         msg.token.0.len(),
         msg.payload.len()).ok();
  buf
}

#[cfg(test)]
mod tests {
  use erbium_msg::{Code, Id, Token, Type};

  use super::*;

  #[test]
  fn summary() {
    let mut msg = Message::new(Type::Con, Code::CONTENT, Id(12), Token::from_slice(&[1, 2]));
    msg.set_payload(b"hi").unwrap();

    assert_eq!(msg_summary(&msg).as_str(),
               "Con 2.05 mid=12 tkl=2 with 2 byte payload");
  }
}
