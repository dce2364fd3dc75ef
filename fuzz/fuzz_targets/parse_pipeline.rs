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
        if let Ok(pipeline) = parser().parse_pipeline("fuzz", source) {
            // 스테이지는 항상 순서 번호 오름차순
            let ordinals: Vec<i32> = pipeline.stages().iter().map(|s| s.ordinal).collect();
            assert!(ordinals.windows(2).all(|w| w[0] < w[1]));
        }
    }
});
