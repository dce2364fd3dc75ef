//! 컴파일된 인터프리터 상태
//!
//! [`InterpreterState`]는 한 번 만들어지면 변경되지 않는 스냅샷입니다.
//! 설정이 바뀌면 새 상태를 통째로 컴파일하고 참조만 교체합니다.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use sluice_core::store::{PipelineSource, RuleSource, StreamConnection};

use crate::ast::{Pipeline, Rule};
use crate::error::InterpreterError;
use crate::parser::{ParseError, RuleParser};

/// 스트림 ID 집합에 연결된 파이프라인을 찾습니다.
pub trait PipelineResolver {
    /// 스트림들에 연결된 파이프라인을 중복 없이 ID 순으로 반환합니다.
    fn pipelines_for_streams(&self, streams: &BTreeSet<String>) -> Vec<Arc<Pipeline>>;
}

/// 파이프라인과 스트림 연결의 불변 스냅샷
#[derive(Debug, Default)]
pub struct InterpreterState {
    pipelines: HashMap<String, Arc<Pipeline>>,
    connections: HashMap<String, Vec<Arc<Pipeline>>>,
    rule_count: usize,
}

impl InterpreterState {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn pipeline(&self, id: &str) -> Option<&Arc<Pipeline>> {
        self.pipelines.get(id)
    }

    /// ID 순으로 정렬된 파이프라인 목록
    pub fn pipelines(&self) -> Vec<&Arc<Pipeline>> {
        let mut pipelines: Vec<_> = self.pipelines.values().collect();
        pipelines.sort_by(|a, b| a.id.cmp(&b.id));
        pipelines
    }

    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    pub fn rule_count(&self) -> usize {
        self.rule_count
    }

    /// 연결이 하나 이상 있는 스트림 ID
    pub fn connected_streams(&self) -> BTreeSet<&str> {
        self.connections.keys().map(String::as_str).collect()
    }
}

impl PipelineResolver for InterpreterState {
    fn pipelines_for_streams(&self, streams: &BTreeSet<String>) -> Vec<Arc<Pipeline>> {
        let mut resolved: Vec<Arc<Pipeline>> = streams
            .iter()
            .filter_map(|stream| self.connections.get(stream))
            .flatten()
            .cloned()
            .collect();
        resolved.sort_by(|a, b| a.id.cmp(&b.id));
        resolved.dedup_by(|a, b| a.id == b.id);
        resolved
    }
}

/// 소스 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Rule,
    Pipeline,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rule => write!(f, "rule"),
            Self::Pipeline => write!(f, "pipeline"),
        }
    }
}

/// 컴파일에 실패해 상태에 포함되지 않은 소스
#[derive(Debug, Clone, Serialize)]
pub struct CompileFailure {
    pub kind: SourceKind,
    pub source_id: String,
    pub errors: Vec<ParseError>,
}

/// 새 상태와 실패한 소스 목록
#[derive(Debug)]
pub struct CompiledSources {
    pub state: InterpreterState,
    pub failures: Vec<CompileFailure>,
}

impl CompiledSources {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

fn failure(kind: SourceKind, err: InterpreterError, source_id: &str) -> CompileFailure {
    let errors = match err {
        InterpreterError::Compile { errors, .. } => errors,
        other => vec![ParseError::syntax(
            crate::ast::Position::default(),
            other.to_string(),
        )],
    };
    CompileFailure {
        kind,
        source_id: source_id.to_owned(),
        errors,
    }
}

/// 규칙, 파이프라인, 스트림 연결을 컴파일해 새 상태를 만듭니다.
///
/// 컴파일 에러가 있는 소스는 상태에서 제외되고 실패 목록에 담깁니다.
/// 스테이지가 참조하는 규칙이 없으면 항상 불만족하는 규칙으로 대체되고,
/// 연결이 가리키는 파이프라인이 없으면 그 연결은 무시됩니다.
pub fn compile_sources(
    parser: &RuleParser,
    rules: &[RuleSource],
    pipelines: &[PipelineSource],
    connections: &[StreamConnection],
) -> CompiledSources {
    let mut failures = Vec::new();

    let mut rules_by_name: HashMap<String, Arc<Rule>> = HashMap::new();
    for source in rules {
        match parser.parse_rule(&source.id, &source.source) {
            Ok(rule) => {
                if let Some(previous) = rules_by_name.get(&rule.name) {
                    tracing::warn!(
                        rule = %rule.name,
                        previous_id = %previous.id,
                        id = %rule.id,
                        "duplicate rule name, later source wins"
                    );
                }
                rules_by_name.insert(rule.name.clone(), Arc::new(rule));
            }
            Err(e) => {
                tracing::warn!(rule_id = %source.id, error = %e, "rule rejected");
                failures.push(failure(SourceKind::Rule, e, &source.id));
            }
        }
    }

    let mut compiled: HashMap<String, Arc<Pipeline>> = HashMap::new();
    for source in pipelines {
        let mut pipeline = match parser.parse_pipeline(&source.id, &source.source) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                tracing::warn!(pipeline_id = %source.id, error = %e, "pipeline rejected");
                failures.push(failure(SourceKind::Pipeline, e, &source.id));
                continue;
            }
        };
        link_rules(&mut pipeline, &rules_by_name);
        compiled.insert(pipeline.id.clone(), Arc::new(pipeline));
    }

    let mut by_stream: HashMap<String, Vec<Arc<Pipeline>>> = HashMap::new();
    for connection in connections {
        for pipeline_id in &connection.pipelines {
            match compiled.get(pipeline_id) {
                Some(pipeline) => by_stream
                    .entry(connection.stream.clone())
                    .or_default()
                    .push(Arc::clone(pipeline)),
                None => tracing::warn!(
                    stream = %connection.stream,
                    pipeline_id = %pipeline_id,
                    "connection references unknown pipeline, skipping"
                ),
            }
        }
    }

    let state = InterpreterState {
        pipelines: compiled,
        connections: by_stream,
        rule_count: rules_by_name.len(),
    };
    tracing::info!(
        rules = state.rule_count,
        pipelines = state.pipelines.len(),
        streams = state.connections.len(),
        failures = failures.len(),
        "interpreter state compiled"
    );
    CompiledSources { state, failures }
}

fn link_rules(pipeline: &mut Pipeline, rules_by_name: &HashMap<String, Arc<Rule>>) {
    let pipeline_name = pipeline.name.clone();
    for stage in pipeline.stages_mut() {
        stage.rules = stage
            .rule_refs
            .iter()
            .map(|name| match rules_by_name.get(name) {
                Some(rule) => Arc::clone(rule),
                None => {
                    tracing::warn!(
                        pipeline = %pipeline_name,
                        stage = stage.ordinal,
                        rule = %name,
                        "unresolved rule reference, using always-false placeholder"
                    );
                    Arc::new(Rule::always_false(name.clone()))
                }
            })
            .collect();
    }
}
