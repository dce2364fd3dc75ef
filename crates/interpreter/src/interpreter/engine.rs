//! 스테이지 실행 엔진
//!
//! 해석된 파이프라인의 스테이지를 ordinal별로 묶은 "스테이지 슬라이스" 단위로
//! 오름차순 실행합니다. 한 스테이지 안에서는 모든 규칙 조건을 먼저 평가한 뒤
//! 만족한 규칙의 액션을 선언 순서대로 실행합니다.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use serde::Serialize;
use sluice_core::types::{DEFAULT_STREAM, Message};

use super::listener::InterpreterListener;
use crate::ast::{MatchPolicy, Pipeline, Rule, Stage};
use crate::eval::{EvalError, EvaluationContext, evaluate_condition, execute};

/// 엔진 실행 옵션
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineOptions {
    /// 런타임 실패를 `processing_error` 필드에 기록할지 여부
    pub record_processing_errors: bool,
}

/// 한 파이프라인의 한 스테이지 실행 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageOutcome {
    pub message_id: String,
    pub pipeline_id: String,
    pub pipeline: String,
    pub ordinal: i32,
    pub policy: MatchPolicy,
    /// 조건이 참이었던 규칙 수
    pub satisfied: usize,
    /// 스테이지의 규칙 수
    pub total: usize,
    /// 파이프라인이 다음 스테이지로 진행하는지 여부
    pub matched: bool,
}

/// 평가 결과
#[derive(Debug, Clone, Default, Serialize)]
pub struct EvaluationResult {
    /// 전달할 메시지 (원본과 생성된 메시지, 드롭된 메시지 제외)
    pub messages: Vec<Message>,
    /// 드롭된 메시지 ID
    pub dropped: Vec<String>,
    /// 실행된 스테이지 결과 (실행 순서)
    pub stages: Vec<StageOutcome>,
}

impl EvaluationResult {
    /// 특정 메시지에 대한 스테이지 결과
    pub fn stages_for<'a>(&'a self, message_id: &'a str) -> impl Iterator<Item = &'a StageOutcome> {
        self.stages.iter().filter(move |s| s.message_id == message_id)
    }
}

/// 메시지가 속한 스트림. 소속이 없으면 기본 스트림에 있는 것으로 봅니다.
pub(crate) fn effective_streams(message: &Message) -> BTreeSet<String> {
    if message.streams().is_empty() {
        BTreeSet::from([DEFAULT_STREAM.to_owned()])
    } else {
        message.streams().clone()
    }
}

/// 주어진 파이프라인으로 메시지를 한 번 평가합니다.
///
/// 라우팅 재평가는 하지 않으며, 생성된 메시지는 처리하지 않고 결과에 덧붙입니다.
pub fn evaluate_pipelines(
    mut message: Message,
    pipelines: &[Arc<Pipeline>],
    options: EngineOptions,
    listener: &mut dyn InterpreterListener,
) -> EvaluationResult {
    let mut result = EvaluationResult::default();
    listener.start_processing(&message);
    let streams = effective_streams(&message);
    listener.process_streams(&message, pipelines, &streams);
    let created = run_stages(&mut message, pipelines, options, listener, &mut result.stages);
    listener.finish_processing(&message);

    if message.filter_out() {
        result.dropped.push(message.id().to_owned());
    } else {
        result.messages.push(message);
    }
    result.messages.extend(created);
    result
}

/// 파이프라인들의 스테이지를 슬라이스 순서로 실행하고 생성된 메시지를 반환합니다.
///
/// 스테이지가 매치되지 않은 파이프라인은 이후 슬라이스에서 건너뜁니다.
/// 메시지가 드롭되면 현재 슬라이스를 마친 뒤 중단합니다.
pub(crate) fn run_stages(
    message: &mut Message,
    pipelines: &[Arc<Pipeline>],
    options: EngineOptions,
    listener: &mut dyn InterpreterListener,
    outcomes: &mut Vec<StageOutcome>,
) -> Vec<Message> {
    let mut created = Vec::new();
    let ordinals: BTreeSet<i32> = pipelines
        .iter()
        .flat_map(|p| p.stages().iter().map(|s| s.ordinal))
        .collect();
    let mut stopped: HashSet<&str> = HashSet::new();

    for ordinal in ordinals {
        for pipeline in pipelines {
            if stopped.contains(pipeline.id.as_str()) {
                tracing::debug!(
                    msg_id = %message.id(),
                    pipeline = %pipeline.name,
                    stage = ordinal,
                    "previous stage result prevents further processing"
                );
                continue;
            }
            let Some(stage) = pipeline.stages().iter().find(|s| s.ordinal == ordinal) else {
                continue;
            };
            let outcome = evaluate_stage(message, pipeline, stage, options, listener, &mut created);
            if !outcome.matched {
                stopped.insert(pipeline.id.as_str());
            }
            outcomes.push(outcome);
        }

        if message.filter_out() {
            tracing::debug!(
                msg_id = %message.id(),
                stage = ordinal,
                "message dropped, skipping remaining stages"
            );
            break;
        }
    }
    created
}

fn evaluate_stage(
    message: &mut Message,
    pipeline: &Pipeline,
    stage: &Stage,
    options: EngineOptions,
    listener: &mut dyn InterpreterListener,
    created: &mut Vec<Message>,
) -> StageOutcome {
    let message_id = message.id().to_owned();
    listener.enter_stage(pipeline, stage);
    tracing::debug!(
        msg_id = %message_id,
        pipeline = %pipeline.name,
        stage = stage.ordinal,
        policy = %stage.policy,
        "evaluating rule conditions"
    );

    let mut ctx = EvaluationContext::new(message);

    let mut satisfied: Vec<&Arc<Rule>> = Vec::with_capacity(stage.rules.len());
    for rule in &stage.rules {
        listener.evaluate_rule(rule, pipeline);
        match evaluate_condition(&rule.when, &mut ctx) {
            Ok(true) => {
                tracing::debug!(msg_id = %message_id, rule = %rule.name, "rule condition satisfied");
                listener.satisfy_rule(rule, pipeline);
                satisfied.push(rule);
            }
            Ok(false) => {
                tracing::debug!(msg_id = %message_id, rule = %rule.name, "rule condition not satisfied");
                listener.dissatisfy_rule(rule, pipeline);
            }
            Err(e) => {
                tracing::debug!(msg_id = %message_id, rule = %rule.name, error = %e, "rule condition failed");
                listener.fail_evaluate_rule(rule, pipeline, &e);
                record_failure(&mut ctx, rule, &e, options);
            }
        }
        ctx.clear_variables();
    }

    for rule in &satisfied {
        listener.execute_rule(rule, pipeline);
        match execute_actions(rule, &mut ctx) {
            Ok(()) => listener.finish_execute_rule(rule, pipeline),
            Err(e) => {
                tracing::debug!(msg_id = %message_id, rule = %rule.name, error = %e, "rule action failed");
                listener.fail_execute_rule(rule, pipeline, &e);
                record_failure(&mut ctx, rule, &e, options);
            }
        }
        ctx.clear_variables();
    }

    created.extend(ctx.take_created());

    let matched = stage.matches(satisfied.len());
    if matched {
        listener.continue_pipeline_execution(pipeline, stage);
    } else {
        tracing::debug!(
            msg_id = %message_id,
            pipeline = %pipeline.name,
            stage = stage.ordinal,
            policy = %stage.policy,
            "stage not matched, stopping pipeline"
        );
        listener.stop_pipeline_execution(pipeline, stage);
    }
    listener.exit_stage(pipeline, stage);

    StageOutcome {
        message_id,
        pipeline_id: pipeline.id.clone(),
        pipeline: pipeline.name.clone(),
        ordinal: stage.ordinal,
        policy: stage.policy,
        satisfied: satisfied.len(),
        total: stage.rules.len(),
        matched,
    }
}

/// 규칙의 액션을 순서대로 실행합니다. 첫 실패에서 중단합니다.
fn execute_actions(rule: &Rule, ctx: &mut EvaluationContext<'_>) -> Result<(), EvalError> {
    for statement in &rule.then {
        execute(statement, ctx)?;
    }
    Ok(())
}

fn record_failure(
    ctx: &mut EvaluationContext<'_>,
    rule: &Rule,
    error: &EvalError,
    options: EngineOptions,
) {
    if options.record_processing_errors {
        ctx.message_mut()
            .append_processing_error(&format!("For rule '{}': {}", rule.name, error));
    }
}
