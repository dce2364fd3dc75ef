#![no_main]

use std::sync::{Arc, OnceLock};

use libfuzzer_sys::fuzz_target;
use sluice_interpreter::{FunctionRegistry, RuleParser};

fn parser() -> &'static RuleParser {
    static PARSER: OnceLock<RuleParser> = OnceLock::new();
    PARSER.get_or_init(|| {
        RuleParser::new(Arc::new(
            FunctionRegistry::with_builtins().expect("builtins register"),
        ))
    })
}

fuzz_target!(|data: &[u8]| {
    if let Ok(source) = std::str::from_utf8(data) {
        let _ = parser().parse_rule("fuzz", source);
    }
});
