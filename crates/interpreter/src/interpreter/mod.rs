//! 파이프라인 인터프리터
//!
//! [`Interpreter`]는 컴파일된 상태 스냅샷을 보관하고 메시지를 파이프라인에 통과시킵니다.
//!
//! # 처리 흐름
//! 1. 메시지의 스트림(없으면 `default`)에 연결된 파이프라인을 찾습니다.
//! 2. [`engine`]이 스테이지 슬라이스 순서로 규칙을 평가합니다.
//! 3. 액션이 생성한 메시지는 작업 목록 끝에 추가되어 처음부터 처리됩니다.
//! 4. 액션이 스트림을 추가했다면 새 스트림의 파이프라인으로 다시 처리합니다.
//!    이미 처리한 스트림은 제외되며 `max_routing_passes`회로 제한됩니다.
//!
//! # 설정 교체
//! [`Interpreter::reload`]는 새 상태를 통째로 컴파일한 뒤 참조만 교체합니다.
//! 처리 중인 호출은 시작 시점의 스냅샷을 계속 사용합니다.

pub mod engine;
pub mod listener;
pub mod simulator;
pub mod state;
pub mod tracer;

pub use engine::{EngineOptions, EvaluationResult, StageOutcome, evaluate_pipelines};
pub use listener::{InterpreterListener, MultiplexListener, NoopListener, RuleMetricsListener};
pub use simulator::{SimulationResult, Simulator};
pub use state::{
    CompileFailure, CompiledSources, InterpreterState, PipelineResolver, SourceKind,
    compile_sources,
};
pub use tracer::Tracer;

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;

use sluice_core::metrics as m;
use sluice_core::store::{PipelineSource, RuleSource, SourceStore, StreamConnection};
use sluice_core::types::Message;

use crate::ast::Pipeline;
use crate::config::InterpreterConfig;
use crate::error::InterpreterError;
use crate::function::FunctionRegistry;
use crate::parser::RuleParser;
use engine::{effective_streams, run_stages};

/// 메시지 처리 인터프리터
///
/// 여러 작업자가 `&self`로 동시에 [`process`](Self::process)를 호출할 수 있습니다.
pub struct Interpreter {
    config: InterpreterConfig,
    parser: RuleParser,
    state: ArcSwap<InterpreterState>,
}

impl Interpreter {
    /// 빈 상태로 인터프리터를 생성합니다.
    pub fn new(config: InterpreterConfig, registry: Arc<FunctionRegistry>) -> Self {
        Self {
            config,
            parser: RuleParser::new(registry),
            state: ArcSwap::from_pointee(InterpreterState::empty()),
        }
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    pub fn parser(&self) -> &RuleParser {
        &self.parser
    }

    fn options(&self) -> EngineOptions {
        EngineOptions {
            record_processing_errors: self.config.record_processing_errors,
        }
    }

    /// 현재 상태 스냅샷. 읽기 경로에는 잠금이 없습니다.
    pub fn state(&self) -> Arc<InterpreterState> {
        self.state.load_full()
    }

    /// 상태를 교체하고 이전 상태를 반환합니다.
    pub fn swap_state(&self, state: InterpreterState) -> Arc<InterpreterState> {
        metrics::gauge!(m::INTERPRETER_ACTIVE_PIPELINES).set(state.pipeline_count() as f64);
        self.state.swap(Arc::new(state))
    }

    /// 소스를 컴파일해 새 상태를 게시합니다.
    ///
    /// 실패한 소스는 새 상태에서 제외되고 반환 목록에 담깁니다.
    pub fn reload(
        &self,
        rules: &[RuleSource],
        pipelines: &[PipelineSource],
        connections: &[StreamConnection],
    ) -> Vec<CompileFailure> {
        let compiled = compile_sources(&self.parser, rules, pipelines, connections);
        for failure in &compiled.failures {
            metrics::counter!(m::INTERPRETER_COMPILE_ERRORS_TOTAL, m::LABEL_KIND => failure.kind.to_string())
                .increment(1);
        }
        self.swap_state(compiled.state);
        compiled.failures
    }

    /// 저장소에서 모든 소스를 읽어 새 상태를 게시합니다.
    pub async fn reload_from_store<S: SourceStore>(
        &self,
        store: &S,
    ) -> Result<Vec<CompileFailure>, InterpreterError> {
        let rules = store.load_all_rules().await?;
        let pipelines = store.load_all_pipelines().await?;
        let connections = store.load_connections().await?;
        tracing::info!(
            rules = rules.len(),
            pipelines = pipelines.len(),
            connections = connections.len(),
            "reloading interpreter state from store"
        );
        Ok(self.reload(&rules, &pipelines, &connections))
    }

    /// 메시지들을 연결된 파이프라인으로 처리합니다.
    pub fn process(&self, messages: Vec<Message>) -> EvaluationResult {
        self.process_with_listener(messages, &mut NoopListener)
    }

    /// 리스너와 함께 메시지들을 처리합니다.
    ///
    /// `rule_metrics`가 켜져 있으면 [`RuleMetricsListener`]가 함께 호출됩니다.
    pub fn process_with_listener(
        &self,
        messages: Vec<Message>,
        listener: &mut dyn InterpreterListener,
    ) -> EvaluationResult {
        let state = self.state();
        if self.config.rule_metrics {
            let mut rule_metrics = RuleMetricsListener;
            let mut multiplex = MultiplexListener::new()
                .with(listener)
                .with(&mut rule_metrics);
            self.process_snapshot(&state, messages, &mut multiplex)
        } else {
            self.process_snapshot(&state, messages, listener)
        }
    }

    /// 스트림 연결과 관계없이 지정한 파이프라인으로 메시지를 한 번 평가합니다.
    pub fn evaluate_pipelines(
        &self,
        message: Message,
        pipelines: &[Arc<Pipeline>],
        listener: &mut dyn InterpreterListener,
    ) -> EvaluationResult {
        evaluate_pipelines(message, pipelines, self.options(), listener)
    }

    fn process_snapshot(
        &self,
        state: &InterpreterState,
        messages: Vec<Message>,
        listener: &mut dyn InterpreterListener,
    ) -> EvaluationResult {
        let started = Instant::now();
        let options = self.options();
        let mut result = EvaluationResult::default();
        let mut work: VecDeque<Message> = messages.into();

        while let Some(mut message) = work.pop_front() {
            listener.start_processing(&message);
            let mut processed_streams: BTreeSet<String> = BTreeSet::new();
            let mut passes = 0usize;

            loop {
                passes += 1;
                // 암묵적 default 소속은 진입 시점에만 적용합니다.
                // 액션이 마지막 스트림을 지운 메시지는 default로 다시 라우팅되지 않습니다.
                let initial = if passes == 1 {
                    effective_streams(&message)
                } else {
                    message.streams().clone()
                };
                let streams: BTreeSet<String> =
                    initial.difference(&processed_streams).cloned().collect();
                let pipelines = state.pipelines_for_streams(&streams);
                listener.process_streams(&message, &pipelines, &streams);
                tracing::debug!(
                    msg_id = %message.id(),
                    pass = passes,
                    pipelines = pipelines.len(),
                    streams = ?streams,
                    "running pipelines for streams"
                );

                let created =
                    run_stages(&mut message, &pipelines, options, listener, &mut result.stages);
                if !created.is_empty() {
                    metrics::counter!(m::INTERPRETER_MESSAGES_CREATED_TOTAL)
                        .increment(created.len() as u64);
                    work.extend(created);
                }
                processed_streams.extend(initial);

                if message.filter_out() {
                    break;
                }
                let added = message
                    .streams()
                    .iter()
                    .any(|s| !processed_streams.contains(s));
                if !added {
                    break;
                }
                if passes >= self.config.max_routing_passes {
                    tracing::warn!(
                        msg_id = %message.id(),
                        passes,
                        "routing pass limit reached, not processing newly added streams"
                    );
                    metrics::counter!(m::INTERPRETER_ROUTING_LIMIT_TOTAL).increment(1);
                    break;
                }
                tracing::debug!(msg_id = %message.id(), "new streams assigned, running again");
            }

            listener.finish_processing(&message);
            metrics::counter!(m::INTERPRETER_MESSAGES_PROCESSED_TOTAL).increment(1);
            if message.filter_out() {
                tracing::debug!(msg_id = %message.id(), "message dropped");
                metrics::counter!(m::INTERPRETER_MESSAGES_DROPPED_TOTAL).increment(1);
                result.dropped.push(message.id().to_owned());
            } else {
                result.messages.push(message);
            }
        }

        metrics::histogram!(m::INTERPRETER_PROCESSING_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        result
    }
}
