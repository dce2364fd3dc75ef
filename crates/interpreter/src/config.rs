//! 인터프리터 설정
//!
//! [`InterpreterConfig`]는 core의 [`InterpreterSection`](sluice_core::config::InterpreterSection)을
//! 기반으로 인터프리터 전용 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use sluice_core::config::SluiceConfig;
//! use sluice_interpreter::config::InterpreterConfig;
//!
//! let core_config = SluiceConfig::default();
//! let config = InterpreterConfig::from_core(&core_config.interpreter);
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sluice_core::config::{InterpreterSection, MAX_ROUTING_PASSES_LIMIT};

use crate::error::InterpreterError;

/// 인터프리터 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpreterConfig {
    /// 규칙/파이프라인 소스 디렉토리
    pub source_dir: PathBuf,
    /// 스트림 연결 파일 이름 (`source_dir` 기준)
    pub connections_file: String,
    /// 스트림 추가로 인한 재평가 최대 패스 수
    pub max_routing_passes: usize,
    /// 규칙별 메트릭 수집 여부
    pub rule_metrics: bool,
    /// 규칙 실행 실패를 `processing_error` 필드에 기록할지 여부
    pub record_processing_errors: bool,
    /// 소스 파일 최대 크기 (바이트)
    pub max_source_size: u64,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self::from_core(&InterpreterSection::default())
    }
}

impl InterpreterConfig {
    /// core의 `InterpreterSection`에서 인터프리터 설정을 생성합니다.
    pub fn from_core(core: &InterpreterSection) -> Self {
        Self {
            source_dir: PathBuf::from(&core.source_dir),
            connections_file: core.connections_file.clone(),
            max_routing_passes: core.max_routing_passes,
            rule_metrics: core.rule_metrics,
            record_processing_errors: core.record_processing_errors,
            max_source_size: core.max_source_size,
        }
    }

    /// 스트림 연결 파일의 전체 경로
    pub fn connections_path(&self) -> PathBuf {
        self.source_dir.join(&self.connections_file)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), InterpreterError> {
        if self.max_routing_passes == 0 || self.max_routing_passes > MAX_ROUTING_PASSES_LIMIT {
            return Err(InterpreterError::Config {
                field: "max_routing_passes".to_owned(),
                reason: format!("must be 1-{MAX_ROUTING_PASSES_LIMIT}"),
            });
        }

        if self.connections_file.is_empty() {
            return Err(InterpreterError::Config {
                field: "connections_file".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if Path::new(&self.connections_file).is_absolute() {
            return Err(InterpreterError::Config {
                field: "connections_file".to_owned(),
                reason: "must be relative to source_dir".to_owned(),
            });
        }

        if self.max_source_size == 0 {
            return Err(InterpreterError::Config {
                field: "max_source_size".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        Ok(())
    }
}

/// 인터프리터 설정 빌더
#[derive(Debug, Default)]
pub struct InterpreterConfigBuilder {
    config: InterpreterConfig,
}

impl InterpreterConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.source_dir = dir.into();
        self
    }

    pub fn connections_file(mut self, file: impl Into<String>) -> Self {
        self.config.connections_file = file.into();
        self
    }

    pub fn max_routing_passes(mut self, passes: usize) -> Self {
        self.config.max_routing_passes = passes;
        self
    }

    pub fn rule_metrics(mut self, enabled: bool) -> Self {
        self.config.rule_metrics = enabled;
        self
    }

    pub fn record_processing_errors(mut self, enabled: bool) -> Self {
        self.config.record_processing_errors = enabled;
        self
    }

    pub fn max_source_size(mut self, bytes: u64) -> Self {
        self.config.max_source_size = bytes;
        self
    }

    /// 설정을 검증하고 빌드합니다.
    pub fn build(self) -> Result<InterpreterConfig, InterpreterError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        InterpreterConfig::default().validate().unwrap();
    }

    #[test]
    fn from_core_copies_section() {
        let section = InterpreterSection {
            source_dir: "/tmp/sluice".to_owned(),
            max_routing_passes: 3,
            rule_metrics: true,
            ..InterpreterSection::default()
        };
        let config = InterpreterConfig::from_core(&section);
        assert_eq!(config.source_dir, PathBuf::from("/tmp/sluice"));
        assert_eq!(config.max_routing_passes, 3);
        assert!(config.rule_metrics);
        assert_eq!(
            config.connections_path(),
            PathBuf::from("/tmp/sluice/connections.yml")
        );
    }

    #[test]
    fn builder_validates() {
        let err = InterpreterConfigBuilder::new()
            .max_routing_passes(0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("max_routing_passes"));
    }

    #[test]
    fn builder_rejects_absolute_connections_file() {
        let err = InterpreterConfigBuilder::new()
            .connections_file("/etc/connections.yml")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("connections_file"));
    }

    #[test]
    fn builder_sets_all_fields() {
        let config = InterpreterConfigBuilder::new()
            .source_dir("/srv/rules")
            .connections_file("links.yml")
            .max_routing_passes(2)
            .rule_metrics(true)
            .record_processing_errors(true)
            .max_source_size(4096)
            .build()
            .unwrap();
        assert_eq!(config.connections_path(), PathBuf::from("/srv/rules/links.yml"));
        assert_eq!(config.max_routing_passes, 2);
        assert!(config.record_processing_errors);
        assert_eq!(config.max_source_size, 4096);
    }
}
