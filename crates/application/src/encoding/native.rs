use hickory_proto::op::Message;
use hickory_proto::serialize::binary::{BinEncodable, BinEncoder};

/// Wire form of `message`, or a diagnostic line when it cannot be packed.
pub(super) fn pack(message: &Message) -> Vec<u8> {
    let mut buf = Vec::with_capacity(512);
    let result = {
        let mut encoder = BinEncoder::new(&mut buf);
        message.emit(&mut encoder)
    };
    match result {
        Ok(()) => buf,
        Err(e) => format!("ERROR: Failed to pack DNS response: {}", e).into_bytes(),
    }
}
