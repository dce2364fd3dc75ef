//! 인터프리터 결정 지점 리스너
//!
//! 엔진은 규칙과 스테이지를 처리하면서 아래 순서로 훅을 호출합니다.
//!
//! ```text
//! start_processing
//!   process_streams
//!     enter_stage
//!       evaluate_rule → satisfy_rule | dissatisfy_rule | fail_evaluate_rule
//!       execute_rule  → finish_execute_rule | fail_execute_rule   (만족한 규칙만)
//!     continue_pipeline_execution | stop_pipeline_execution
//!     exit_stage
//! finish_processing
//! ```
//!
//! 리스너는 관찰만 하며 평가 결과에 영향을 주지 않습니다.

use std::collections::BTreeSet;
use std::sync::Arc;

use sluice_core::metrics as m;
use sluice_core::types::Message;

use crate::ast::{Pipeline, Rule, Stage};
use crate::eval::EvalError;

/// 평가 결정 지점마다 호출되는 리스너
///
/// 모든 훅은 기본 구현이 비어 있어 필요한 것만 재정의하면 됩니다.
#[allow(unused_variables)]
pub trait InterpreterListener {
    fn start_processing(&mut self, message: &Message) {}

    fn finish_processing(&mut self, message: &Message) {}

    fn process_streams(
        &mut self,
        message: &Message,
        pipelines: &[Arc<Pipeline>],
        streams: &BTreeSet<String>,
    ) {
    }

    fn enter_stage(&mut self, pipeline: &Pipeline, stage: &Stage) {}

    fn exit_stage(&mut self, pipeline: &Pipeline, stage: &Stage) {}

    fn evaluate_rule(&mut self, rule: &Rule, pipeline: &Pipeline) {}

    fn satisfy_rule(&mut self, rule: &Rule, pipeline: &Pipeline) {}

    fn dissatisfy_rule(&mut self, rule: &Rule, pipeline: &Pipeline) {}

    fn fail_evaluate_rule(&mut self, rule: &Rule, pipeline: &Pipeline, error: &EvalError) {}

    fn execute_rule(&mut self, rule: &Rule, pipeline: &Pipeline) {}

    fn finish_execute_rule(&mut self, rule: &Rule, pipeline: &Pipeline) {}

    fn fail_execute_rule(&mut self, rule: &Rule, pipeline: &Pipeline, error: &EvalError) {}

    fn continue_pipeline_execution(&mut self, pipeline: &Pipeline, stage: &Stage) {}

    fn stop_pipeline_execution(&mut self, pipeline: &Pipeline, stage: &Stage) {}
}

/// 아무것도 하지 않는 리스너
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl InterpreterListener for NoopListener {}

/// 등록 순서대로 여러 리스너에 전달하는 리스너
#[derive(Default)]
pub struct MultiplexListener<'a> {
    listeners: Vec<&'a mut dyn InterpreterListener>,
}

impl<'a> MultiplexListener<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, listener: &'a mut dyn InterpreterListener) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn push(&mut self, listener: &'a mut dyn InterpreterListener) {
        self.listeners.push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl InterpreterListener for MultiplexListener<'_> {
    fn start_processing(&mut self, message: &Message) {
        for l in &mut self.listeners {
            l.start_processing(message);
        }
    }

    fn finish_processing(&mut self, message: &Message) {
        for l in &mut self.listeners {
            l.finish_processing(message);
        }
    }

    fn process_streams(
        &mut self,
        message: &Message,
        pipelines: &[Arc<Pipeline>],
        streams: &BTreeSet<String>,
    ) {
        for l in &mut self.listeners {
            l.process_streams(message, pipelines, streams);
        }
    }

    fn enter_stage(&mut self, pipeline: &Pipeline, stage: &Stage) {
        for l in &mut self.listeners {
            l.enter_stage(pipeline, stage);
        }
    }

    fn exit_stage(&mut self, pipeline: &Pipeline, stage: &Stage) {
        for l in &mut self.listeners {
            l.exit_stage(pipeline, stage);
        }
    }

    fn evaluate_rule(&mut self, rule: &Rule, pipeline: &Pipeline) {
        for l in &mut self.listeners {
            l.evaluate_rule(rule, pipeline);
        }
    }

    fn satisfy_rule(&mut self, rule: &Rule, pipeline: &Pipeline) {
        for l in &mut self.listeners {
            l.satisfy_rule(rule, pipeline);
        }
    }

    fn dissatisfy_rule(&mut self, rule: &Rule, pipeline: &Pipeline) {
        for l in &mut self.listeners {
            l.dissatisfy_rule(rule, pipeline);
        }
    }

    fn fail_evaluate_rule(&mut self, rule: &Rule, pipeline: &Pipeline, error: &EvalError) {
        for l in &mut self.listeners {
            l.fail_evaluate_rule(rule, pipeline, error);
        }
    }

    fn execute_rule(&mut self, rule: &Rule, pipeline: &Pipeline) {
        for l in &mut self.listeners {
            l.execute_rule(rule, pipeline);
        }
    }

    fn finish_execute_rule(&mut self, rule: &Rule, pipeline: &Pipeline) {
        for l in &mut self.listeners {
            l.finish_execute_rule(rule, pipeline);
        }
    }

    fn fail_execute_rule(&mut self, rule: &Rule, pipeline: &Pipeline, error: &EvalError) {
        for l in &mut self.listeners {
            l.fail_execute_rule(rule, pipeline, error);
        }
    }

    fn continue_pipeline_execution(&mut self, pipeline: &Pipeline, stage: &Stage) {
        for l in &mut self.listeners {
            l.continue_pipeline_execution(pipeline, stage);
        }
    }

    fn stop_pipeline_execution(&mut self, pipeline: &Pipeline, stage: &Stage) {
        for l in &mut self.listeners {
            l.stop_pipeline_execution(pipeline, stage);
        }
    }
}

/// 규칙/스테이지 단위 메트릭을 기록하는 리스너
///
/// `interpreter.rule_metrics`가 켜져 있을 때 엔진이 함께 사용합니다.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleMetricsListener;

impl RuleMetricsListener {
    fn rule_result(rule: &Rule, result: &'static str) {
        metrics::counter!(
            m::RULE_EVALUATIONS_TOTAL,
            m::LABEL_RULE => rule.name.clone(),
            m::LABEL_RESULT => result
        )
        .increment(1);
    }

    fn stage_result(pipeline: &Pipeline, result: &'static str) {
        metrics::counter!(
            m::STAGE_EXECUTIONS_TOTAL,
            m::LABEL_PIPELINE => pipeline.name.clone(),
            m::LABEL_RESULT => result
        )
        .increment(1);
    }
}

impl InterpreterListener for RuleMetricsListener {
    fn satisfy_rule(&mut self, rule: &Rule, _pipeline: &Pipeline) {
        Self::rule_result(rule, "satisfied");
    }

    fn dissatisfy_rule(&mut self, rule: &Rule, _pipeline: &Pipeline) {
        Self::rule_result(rule, "dissatisfied");
    }

    fn fail_evaluate_rule(&mut self, rule: &Rule, _pipeline: &Pipeline, _error: &EvalError) {
        Self::rule_result(rule, "failed");
    }

    fn fail_execute_rule(&mut self, rule: &Rule, _pipeline: &Pipeline, _error: &EvalError) {
        metrics::counter!(m::RULE_EXECUTION_FAILURES_TOTAL, m::LABEL_RULE => rule.name.clone())
            .increment(1);
    }

    fn continue_pipeline_execution(&mut self, pipeline: &Pipeline, _stage: &Stage) {
        Self::stage_result(pipeline, "continued");
    }

    fn stop_pipeline_execution(&mut self, pipeline: &Pipeline, _stage: &Stage) {
        Self::stage_result(pipeline, "stopped");
    }
}
