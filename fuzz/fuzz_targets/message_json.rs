#![no_main]

use libfuzzer_sys::fuzz_target;
use sluice_core::types::Message;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(message) = Message::from_json(text) {
            // to_json 결과는 다시 같은 ID로 읽혀야 함
            let reparsed = Message::from_json(&message.to_json().to_string())
                .expect("to_json output must parse");
            assert_eq!(reparsed.id(), message.id());
        }
    }
});
