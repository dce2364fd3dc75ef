//! 설정 관리 -- sluice.toml 파싱 및 런타임 설정
//!
//! [`SluiceConfig`]는 모든 구성 요소의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`SLUICE_INTERPRETER_MAX_ROUTING_PASSES=4` 형식)
//! 3. 설정 파일 (`sluice.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), sluice_core::error::SluiceError> {
//! use sluice_core::config::SluiceConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = SluiceConfig::load("sluice.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = SluiceConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, SluiceError};

/// 라우팅 재평가 최대 패스 상한
pub const MAX_ROUTING_PASSES_LIMIT: usize = 64;

/// Sluice 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SluiceConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 인터프리터 설정
    #[serde(default)]
    pub interpreter: InterpreterSection,
}

impl SluiceConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, SluiceError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, SluiceError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SluiceError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                SluiceError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, SluiceError> {
        toml::from_str(toml_str).map_err(|e| {
            SluiceError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `SLUICE_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        override_string(&mut self.general.log_level, "SLUICE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "SLUICE_GENERAL_LOG_FORMAT");

        override_string(
            &mut self.interpreter.source_dir,
            "SLUICE_INTERPRETER_SOURCE_DIR",
        );
        override_string(
            &mut self.interpreter.connections_file,
            "SLUICE_INTERPRETER_CONNECTIONS_FILE",
        );
        override_usize(
            &mut self.interpreter.max_routing_passes,
            "SLUICE_INTERPRETER_MAX_ROUTING_PASSES",
        );
        override_bool(
            &mut self.interpreter.rule_metrics,
            "SLUICE_INTERPRETER_RULE_METRICS",
        );
        override_bool(
            &mut self.interpreter.record_processing_errors,
            "SLUICE_INTERPRETER_RECORD_PROCESSING_ERRORS",
        );
        override_u64(
            &mut self.interpreter.max_source_size,
            "SLUICE_INTERPRETER_MAX_SOURCE_SIZE",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), SluiceError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.interpreter.max_routing_passes == 0
            || self.interpreter.max_routing_passes > MAX_ROUTING_PASSES_LIMIT
        {
            return Err(ConfigError::InvalidValue {
                field: "interpreter.max_routing_passes".to_owned(),
                reason: format!("must be 1-{MAX_ROUTING_PASSES_LIMIT}"),
            }
            .into());
        }

        if self.interpreter.connections_file.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "interpreter.connections_file".to_owned(),
                reason: "must not be empty".to_owned(),
            }
            .into());
        }

        if self.interpreter.max_source_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "interpreter.max_source_size".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 인터프리터 설정 섹션
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterSection {
    /// 규칙(`*.rule`)과 파이프라인(`*.pipeline`) 소스 디렉토리
    pub source_dir: String,
    /// 스트림 연결 YAML 파일 이름 (`source_dir` 기준 상대 경로)
    pub connections_file: String,
    /// 스트림 추가로 인한 재평가 최대 패스 수
    pub max_routing_passes: usize,
    /// 규칙별 메트릭 수집 여부
    pub rule_metrics: bool,
    /// 규칙 실행 실패를 메시지 `processing_error` 필드에 기록할지 여부
    pub record_processing_errors: bool,
    /// 소스 파일 최대 크기 (바이트)
    pub max_source_size: u64,
}

impl Default for InterpreterSection {
    fn default() -> Self {
        Self {
            source_dir: "/etc/sluice/pipelines".to_owned(),
            connections_file: "connections.yml".to_owned(),
            max_routing_passes: 8,
            rule_metrics: false,
            record_processing_errors: false,
            max_source_size: 1024 * 1024, // 1MB
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn default_config_has_sane_values() {
        let config = SluiceConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.interpreter.max_routing_passes, 8);
        assert!(!config.interpreter.rule_metrics);
        assert!(!config.interpreter.record_processing_errors);
    }

    #[test]
    fn default_config_passes_validation() {
        SluiceConfig::default().validate().unwrap();
    }

    #[test]
    fn parse_empty_toml_uses_defaults() {
        let config = SluiceConfig::parse("").unwrap();
        assert_eq!(config.interpreter.connections_file, "connections.yml");
    }

    #[test]
    fn parse_partial_toml_merges_with_defaults() {
        let toml = r#"
[general]
log_level = "debug"

[interpreter]
source_dir = "/opt/sluice/pipelines"
rule_metrics = true
"#;
        let config = SluiceConfig::parse(toml).unwrap();
        assert_eq!(config.general.log_level, "debug");
        // log_format은 기본값 유지
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.interpreter.source_dir, "/opt/sluice/pipelines");
        assert!(config.interpreter.rule_metrics);
        assert_eq!(config.interpreter.max_routing_passes, 8);
    }

    #[test]
    fn parse_invalid_toml_returns_error() {
        let err = SluiceConfig::parse("invalid = [[[toml").unwrap_err();
        assert!(matches!(
            err,
            SluiceError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = SluiceConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_invalid_log_format() {
        let mut config = SluiceConfig::default();
        config.general.log_format = "xml".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_format"));
    }

    #[test]
    fn validate_rejects_zero_routing_passes() {
        let mut config = SluiceConfig::default();
        config.interpreter.max_routing_passes = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_routing_passes"));
    }

    #[test]
    fn validate_rejects_excessive_routing_passes() {
        let mut config = SluiceConfig::default();
        config.interpreter.max_routing_passes = MAX_ROUTING_PASSES_LIMIT + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_connections_file() {
        let mut config = SluiceConfig::default();
        config.interpreter.connections_file = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("connections_file"));
    }

    #[test]
    #[serial]
    fn env_override_string() {
        let mut val = "original".to_owned();
        // SAFETY: serial 테스트에서만 환경변수를 조작합니다.
        unsafe { std::env::set_var("TEST_SLUICE_STR", "overridden") };
        override_string(&mut val, "TEST_SLUICE_STR");
        assert_eq!(val, "overridden");
        unsafe { std::env::remove_var("TEST_SLUICE_STR") };
    }

    #[test]
    #[serial]
    fn env_override_bool_invalid_keeps_original() {
        let mut val = false;
        // SAFETY: serial 테스트에서만 환경변수를 조작합니다.
        unsafe { std::env::set_var("TEST_SLUICE_BOOL_BAD", "not-a-bool") };
        override_bool(&mut val, "TEST_SLUICE_BOOL_BAD");
        assert!(!val); // 원래 값 유지
        unsafe { std::env::remove_var("TEST_SLUICE_BOOL_BAD") };
    }

    #[test]
    #[serial]
    fn env_override_usize_valid() {
        let mut val = 8usize;
        // SAFETY: serial 테스트에서만 환경변수를 조작합니다.
        unsafe { std::env::set_var("TEST_SLUICE_USIZE", "3") };
        override_usize(&mut val, "TEST_SLUICE_USIZE");
        assert_eq!(val, 3);
        unsafe { std::env::remove_var("TEST_SLUICE_USIZE") };
    }

    #[test]
    #[serial]
    fn apply_env_overrides_reads_interpreter_section() {
        let mut config = SluiceConfig::default();
        // SAFETY: serial 테스트에서만 환경변수를 조작합니다.
        unsafe {
            std::env::set_var("SLUICE_INTERPRETER_MAX_ROUTING_PASSES", "2");
            std::env::set_var("SLUICE_INTERPRETER_RULE_METRICS", "true");
        }
        config.apply_env_overrides();
        unsafe {
            std::env::remove_var("SLUICE_INTERPRETER_MAX_ROUTING_PASSES");
            std::env::remove_var("SLUICE_INTERPRETER_RULE_METRICS");
        }
        assert_eq!(config.interpreter.max_routing_passes, 2);
        assert!(config.interpreter.rule_metrics);
    }
}
