#![no_main]

use libfuzzer_sys::fuzz_target;
use secure_transfer::core::packet::ResponseCode;
use secure_transfer::protocol::validator::validate;
use secure_transfer::{Response, ResponseHeader};

fuzz_target!(|data: &[u8]| {
    // Header, validation and payload decoding must reject bad input without panicking
    let _ = Response::decode(data);
    if let Ok(header) = ResponseHeader::from_bytes(data) {
        let _ = validate(&header, ResponseCode::KeyExchange);
        let _ = validate(&header, ResponseCode::FileDeliveredWithCrc);
    }
});
