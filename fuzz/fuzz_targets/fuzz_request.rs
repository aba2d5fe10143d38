#![no_main]

use libfuzzer_sys::fuzz_target;
use secure_transfer::Request;

fuzz_target!(|data: &[u8]| {
    // Decoding arbitrary bytes and re-encoding whatever decodes must not panic
    if let Ok(request) = Request::decode(data) {
        let encoded = request.encode().expect("decoded request must re-encode");
        assert_eq!(encoded.len(), 23 + request.payload_size());
    }
});
