use erbium_msg::*;

#[derive(Debug, PartialEq, PartialOrd, Ord, Eq)]
pub struct TestInput {
  pub tkl: u8,
  pub n_opts: usize,
  pub opt_size: usize,
  pub payload_size: usize,
}

impl TestInput {
  /// Inputs all stay within `MAX_HEADER_SIZE`
  pub fn inputs() -> Vec<TestInput> {
    let input = |tkl, n_opts, opt_size, payload_size| TestInput { tkl,
                                                                  n_opts,
                                                                  opt_size,
                                                                  payload_size };

    vec![input(0, 0, 0, 0),
         input(4, 4, 8, 16),
         input(4, 4, 16, 64),
         input(8, 3, 32, 256),
         input(8, 2, 32, 1024),]
  }

  pub fn get_bytes(&self) -> Vec<u8> {
    self.get_message()
        .try_into_bytes::<{ MAX_PACKET_SIZE * 2 }>()
        .unwrap()
        .to_vec()
  }

  pub fn get_message(&self) -> Message {
    let mut msg = Message::new(Type::Non,
                               Code::CONTENT,
                               Id(1),
                               Token::from_slice(&vec![1u8; self.tkl as usize]));

    // Location-Path is elective and repeatable, so any number of them survives parsing
    (0..self.n_opts).for_each(|_| {
                      msg.opts
                         .add(OptNumber::LOCATION_PATH,
                              OptValue::from_slice(&vec![b'a'; self.opt_size]).unwrap())
                         .unwrap()
                    });

    msg.set_payload(&vec![1u8; self.payload_size]).unwrap();
    msg
  }

  pub fn get_coap_lite_packet(&self) -> coap_lite::Packet {
    coap_lite::Packet::from_bytes(&self.get_bytes()).unwrap()
  }
}
