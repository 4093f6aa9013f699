#![no_main]

use libfuzzer_sys::fuzz_target;
use proofa_realtime::{Credential, Endpoint};

fuzz_target!(|data: &[u8]| {
    let Ok(address) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(endpoint) = Endpoint::parse(address) {
        let url = endpoint.handshake_url(&Credential::new("tok"), "token");
        assert!(matches!(url.scheme(), "ws" | "wss"));
    }
});
