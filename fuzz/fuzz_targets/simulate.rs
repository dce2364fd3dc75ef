#![no_main]

use std::sync::{Arc, OnceLock};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use sluice_core::types::Message;
use sluice_core::value::Value;
use sluice_interpreter::{FunctionRegistry, RuleParser, Simulator};

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    /// `when`과 `then` 사이에 들어갈 조건식
    condition: String,
    /// `then`과 `end` 사이에 들어갈 문장들
    actions: String,
    /// 메시지 필드 (최대 8개)
    fields: Vec<(String, FuzzValue)>,
}

#[derive(Arbitrary, Debug)]
enum FuzzValue {
    Null,
    Bool(bool),
    Long(i64),
    Double(f64),
    Text(String),
}

impl From<FuzzValue> for Value {
    fn from(v: FuzzValue) -> Self {
        match v {
            FuzzValue::Null => Value::Null,
            FuzzValue::Bool(b) => Value::Boolean(b),
            FuzzValue::Long(n) => Value::Long(n),
            FuzzValue::Double(d) => Value::Double(d),
            FuzzValue::Text(s) => Value::String(s),
        }
    }
}

fn simulator() -> &'static Simulator {
    static SIMULATOR: OnceLock<Simulator> = OnceLock::new();
    SIMULATOR.get_or_init(|| {
        Simulator::new(RuleParser::new(Arc::new(
            FunctionRegistry::with_builtins().expect("builtins register"),
        )))
        .record_processing_errors(true)
    })
}

fuzz_target!(|input: FuzzInput| {
    let source = format!(
        "rule \"fuzz\"\nwhen {}\nthen\n{}\nend",
        input.condition, input.actions
    );

    let mut message = Message::with_id("fuzz");
    for (name, value) in input.fields.into_iter().take(8) {
        message.set_field(name, value.into());
    }

    // 컴파일 에러는 정상, 패닉만 결함
    let _ = simulator().simulate(&source, message);
});
