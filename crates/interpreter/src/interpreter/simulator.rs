//! 단일 규칙 시뮬레이터
//!
//! 저장된 파이프라인 없이 규칙 하나를 메시지 하나에 실행해 봅니다.
//! 규칙을 PASS 정책 스테이지 하나짜리 일회용 파이프라인에 넣고 운영 경로와 같은
//! 엔진 함수로 평가하므로, 추적 결과는 실제 처리와 동일합니다.

use std::sync::Arc;

use serde::Serialize;
use sluice_core::types::{Message, TraceEntry};

use super::engine::{EngineOptions, StageOutcome, evaluate_pipelines};
use super::tracer::Tracer;
use crate::ast::{MatchPolicy, Pipeline, Stage};
use crate::error::InterpreterError;
use crate::parser::RuleParser;

const SIMULATION_ID: &str = "simulation";

/// 시뮬레이션 결과
#[derive(Debug, Clone, Serialize)]
pub struct SimulationResult {
    /// 결과 메시지 (드롭되지 않은 원본과 생성된 메시지)
    pub messages: Vec<Message>,
    /// 드롭된 메시지 ID
    pub dropped: Vec<String>,
    /// 스테이지 결과
    pub stages: Vec<StageOutcome>,
    /// 평가 추적
    pub trace: Vec<TraceEntry>,
    /// 전체 소요 시간 (마이크로초)
    pub took_us: u64,
}

impl SimulationResult {
    /// 규칙 조건이 참이었는지 여부
    pub fn rule_satisfied(&self) -> bool {
        self.stages.iter().any(|s| s.satisfied > 0)
    }
}

/// 규칙 시뮬레이터
#[derive(Debug, Clone)]
pub struct Simulator {
    parser: RuleParser,
    options: EngineOptions,
}

impl Simulator {
    pub fn new(parser: RuleParser) -> Self {
        Self {
            parser,
            options: EngineOptions::default(),
        }
    }

    /// 런타임 실패를 `processing_error` 필드에 기록하도록 설정합니다.
    pub fn record_processing_errors(mut self, enabled: bool) -> Self {
        self.options.record_processing_errors = enabled;
        self
    }

    /// 규칙 소스를 컴파일해 메시지에 실행합니다.
    ///
    /// 컴파일 에러는 그대로 반환됩니다.
    pub fn simulate(
        &self,
        rule_source: &str,
        message: Message,
    ) -> Result<SimulationResult, InterpreterError> {
        let rule = self.parser.parse_rule(SIMULATION_ID, rule_source)?;
        let stage = Stage::with_rules(0, MatchPolicy::Pass, vec![Arc::new(rule)]);
        let pipeline = Arc::new(Pipeline::new(
            SIMULATION_ID,
            SIMULATION_ID,
            String::new(),
            vec![stage],
        ));

        let mut tracer = Tracer::new();
        let result = evaluate_pipelines(message, &[pipeline], self.options, &mut tracer);
        let took_us = u64::try_from(tracer.total_elapsed().as_micros()).unwrap_or(u64::MAX);

        Ok(SimulationResult {
            messages: result.messages,
            dropped: result.dropped,
            stages: result.stages,
            trace: tracer.into_entries(),
            took_us,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::FunctionRegistry;
    use sluice_core::value::Value;

    fn simulator() -> Simulator {
        Simulator::new(RuleParser::new(Arc::new(
            FunctionRegistry::with_builtins().unwrap(),
        )))
    }

    #[test]
    fn satisfied_rule_mutates_message_and_traces() {
        let mut message = Message::with_id("m1");
        message.set_field("http_response_code", Value::Long(200));
        let result = simulator()
            .simulate(
                r#"rule "check" when has_field("http_response_code") then set_field("checked", "yes"); end"#,
                message,
            )
            .unwrap();

        assert!(result.rule_satisfied());
        assert_eq!(
            result.messages[0].field("checked"),
            Some(&Value::from("yes"))
        );
        let trace: Vec<&str> = result.trace.iter().map(|e| e.message.as_str()).collect();
        assert!(trace[0].starts_with("Starting message processing"));
        assert!(trace.iter().any(|t| t.starts_with("Evaluation satisfied Rule 'check'")));
        assert!(trace.iter().any(|t| t.starts_with("Finished execution Rule 'check'")));
        assert!(trace.last().unwrap().starts_with("Finished message processing"));
    }

    #[test]
    fn dissatisfied_rule_still_passes_stage() {
        let result = simulator()
            .simulate(
                r#"rule "never" when false then set_field("x", 1); end"#,
                Message::with_id("m1"),
            )
            .unwrap();
        assert!(!result.rule_satisfied());
        assert!(result.stages[0].matched);
        assert!(!result.messages[0].has_field("x"));
    }

    #[test]
    fn compile_errors_are_returned() {
        let err = simulator()
            .simulate(r#"rule "bad" when then end"#, Message::with_id("m1"))
            .unwrap_err();
        assert!(matches!(err, InterpreterError::Compile { .. }));
    }
}
