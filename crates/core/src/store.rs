//! 외부 협력자 trait -- 소스 저장소와 추적 싱크
//!
//! 인터프리터는 규칙/파이프라인 소스 텍스트의 보관 방식이나 추적 결과의
//! 전달 경로를 알지 못합니다. 이 모듈의 trait을 통해서만 접근합니다.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::SluiceError;
use crate::types::TraceEntry;

/// 규칙 소스 텍스트
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSource {
    /// 저장소 내 식별자
    pub id: String,
    /// 규칙 소스 텍스트
    pub source: String,
}

/// 파이프라인 소스 텍스트
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSource {
    /// 저장소 내 식별자 (스트림 연결이 이 ID를 참조)
    pub id: String,
    /// 파이프라인 소스 텍스트
    pub source: String,
}

/// 스트림과 파이프라인 연결
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConnection {
    /// 스트림 ID (`default` 포함)
    pub stream: String,
    /// 연결된 파이프라인 ID 목록
    #[serde(default)]
    pub pipelines: Vec<String>,
}

/// 규칙/파이프라인 소스 저장소
///
/// 저장 방식(파일, DB 등)은 구현체가 결정합니다.
pub trait SourceStore: Send + Sync {
    /// ID로 규칙 소스를 읽습니다.
    fn load_rule_source(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<RuleSource, SluiceError>> + Send;

    /// ID로 파이프라인 소스를 읽습니다.
    fn load_pipeline_source(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<PipelineSource, SluiceError>> + Send;

    /// 모든 규칙 소스를 읽습니다.
    fn load_all_rules(&self) -> impl Future<Output = Result<Vec<RuleSource>, SluiceError>> + Send;

    /// 모든 파이프라인 소스를 읽습니다.
    fn load_all_pipelines(
        &self,
    ) -> impl Future<Output = Result<Vec<PipelineSource>, SluiceError>> + Send;

    /// 스트림-파이프라인 연결을 읽습니다.
    fn load_connections(
        &self,
    ) -> impl Future<Output = Result<Vec<StreamConnection>, SluiceError>> + Send;
}

/// 평가 추적 싱크
///
/// 한 번의 평가(시뮬레이션 또는 운영)에서 기록된 추적 항목을 순서대로 받습니다.
pub trait TraceSink: Send + Sync {
    /// 메시지 하나에 대한 추적을 저장합니다.
    fn persist(&self, message_id: &str, entries: &[TraceEntry]) -> Result<(), SluiceError>;
}
