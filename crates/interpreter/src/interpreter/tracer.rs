//! 평가 추적 리스너
//!
//! 결정 지점마다 시작 이후 경과 시간과 설명을 순서대로 기록합니다.
//! 시뮬레이터와 CLI가 운영자에게 평가 과정을 보여줄 때 사용합니다.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use sluice_core::error::SluiceError;
use sluice_core::store::TraceSink;
use sluice_core::types::{Message, TraceEntry};

use super::listener::InterpreterListener;
use crate::ast::{Pipeline, Rule, Stage};
use crate::eval::EvalError;

/// 추가 전용 추적 기록기
#[derive(Debug)]
pub struct Tracer {
    started: Instant,
    entries: Vec<TraceEntry>,
}

impl Default for Tracer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracer {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            entries: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<TraceEntry> {
        self.entries
    }

    /// 추적 시작부터 현재까지 걸린 시간
    pub fn total_elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// 기록된 항목을 싱크로 내보냅니다.
    pub fn persist(&self, sink: &dyn TraceSink, message_id: &str) -> Result<(), SluiceError> {
        sink.persist(message_id, &self.entries)
    }

    fn add(&mut self, message: String) {
        let elapsed_us = u64::try_from(self.started.elapsed().as_micros()).unwrap_or(u64::MAX);
        self.entries.push(TraceEntry {
            elapsed_us,
            message,
        });
    }
}

fn rule_label(rule: &Rule) -> String {
    if rule.id.is_empty() {
        format!("Rule '{}'", rule.name)
    } else {
        format!("Rule '{}' ({})", rule.name, rule.id)
    }
}

fn pipeline_label(pipeline: &Pipeline) -> String {
    format!("Pipeline '{}' ({})", pipeline.name, pipeline.id)
}

impl InterpreterListener for Tracer {
    fn start_processing(&mut self, message: &Message) {
        self.add(format!("Starting message processing of {}", message.id()));
    }

    fn finish_processing(&mut self, message: &Message) {
        self.add(format!("Finished message processing of {}", message.id()));
    }

    fn process_streams(
        &mut self,
        message: &Message,
        pipelines: &[Arc<Pipeline>],
        streams: &BTreeSet<String>,
    ) {
        let pipelines: Vec<String> = pipelines.iter().map(|p| pipeline_label(p)).collect();
        let streams: Vec<&str> = streams.iter().map(String::as_str).collect();
        self.add(format!(
            "Message {} running [{}] for streams [{}]",
            message.id(),
            pipelines.join(", "),
            streams.join(", ")
        ));
    }

    fn enter_stage(&mut self, pipeline: &Pipeline, stage: &Stage) {
        self.add(format!(
            "Enter Stage {} of {}",
            stage.ordinal,
            pipeline_label(pipeline)
        ));
    }

    fn exit_stage(&mut self, pipeline: &Pipeline, stage: &Stage) {
        self.add(format!(
            "Exit Stage {} of {}",
            stage.ordinal,
            pipeline_label(pipeline)
        ));
    }

    fn evaluate_rule(&mut self, rule: &Rule, pipeline: &Pipeline) {
        self.add(format!(
            "Evaluate {} in {}",
            rule_label(rule),
            pipeline_label(pipeline)
        ));
    }

    fn satisfy_rule(&mut self, rule: &Rule, pipeline: &Pipeline) {
        self.add(format!(
            "Evaluation satisfied {} in {}",
            rule_label(rule),
            pipeline_label(pipeline)
        ));
    }

    fn dissatisfy_rule(&mut self, rule: &Rule, pipeline: &Pipeline) {
        self.add(format!(
            "Evaluation not satisfied {} in {}",
            rule_label(rule),
            pipeline_label(pipeline)
        ));
    }

    fn fail_evaluate_rule(&mut self, rule: &Rule, pipeline: &Pipeline, error: &EvalError) {
        self.add(format!(
            "Evaluation failed {} in {}: {error}",
            rule_label(rule),
            pipeline_label(pipeline)
        ));
    }

    fn execute_rule(&mut self, rule: &Rule, pipeline: &Pipeline) {
        self.add(format!(
            "Execute {} in {}",
            rule_label(rule),
            pipeline_label(pipeline)
        ));
    }

    fn finish_execute_rule(&mut self, rule: &Rule, pipeline: &Pipeline) {
        self.add(format!(
            "Finished execution {} in {}",
            rule_label(rule),
            pipeline_label(pipeline)
        ));
    }

    fn fail_execute_rule(&mut self, rule: &Rule, pipeline: &Pipeline, error: &EvalError) {
        self.add(format!(
            "Failed execution {} in {}: {error}",
            rule_label(rule),
            pipeline_label(pipeline)
        ));
    }

    fn continue_pipeline_execution(&mut self, pipeline: &Pipeline, stage: &Stage) {
        self.add(format!(
            "Completed Stage {} for {}, continuing to next stage",
            stage.ordinal,
            pipeline_label(pipeline)
        ));
    }

    fn stop_pipeline_execution(&mut self, pipeline: &Pipeline, stage: &Stage) {
        self.add(format!(
            "Completed Stage {} for {}, NOT continuing to next stage",
            stage.ordinal,
            pipeline_label(pipeline)
        ));
    }
}
