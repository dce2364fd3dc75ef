//! sluice.toml 통합 설정 테스트
//!
//! - sluice.toml.example 파싱 테스트
//! - 파일 로딩 및 환경변수 우선순위 테스트
//! - 잘못된 파일 에러 테스트

use std::io::Write;

use serial_test::serial;
use sluice_core::config::SluiceConfig;
use sluice_core::error::{ConfigError, SluiceError};

// =============================================================================
// sluice.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let content = include_str!("../../../sluice.toml.example");
    let config = SluiceConfig::parse(content).expect("example config should parse");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "json");
    assert_eq!(config.interpreter.source_dir, "/etc/sluice/pipelines");
    assert_eq!(config.interpreter.max_routing_passes, 8);
    assert_eq!(config.interpreter.max_source_size, 1_048_576);
}

#[test]
fn example_config_passes_validation() {
    let content = include_str!("../../../sluice.toml.example");
    let config = SluiceConfig::parse(content).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

// =============================================================================
// 파일 로딩
// =============================================================================

#[tokio::test]
async fn missing_file_reports_file_not_found() {
    let err = SluiceConfig::load("/nonexistent/sluice.toml")
        .await
        .expect_err("missing file should fail");
    assert!(matches!(
        err,
        SluiceError::Config(ConfigError::FileNotFound { .. })
    ));
}

#[tokio::test]
async fn invalid_value_in_file_fails_validation() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "[interpreter]\nmax_routing_passes = 0").expect("write");

    let err = SluiceConfig::from_file(file.path())
        .await
        .expect_err("zero passes should be rejected");
    assert!(err.to_string().contains("max_routing_passes"));
}

#[tokio::test]
#[serial]
async fn env_override_takes_precedence_over_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "[general]\nlog_level = \"warn\"").expect("write");

    // SAFETY: serial 테스트에서만 환경변수를 조작합니다.
    unsafe { std::env::set_var("SLUICE_GENERAL_LOG_LEVEL", "debug") };
    let result = SluiceConfig::load(file.path()).await;
    unsafe { std::env::remove_var("SLUICE_GENERAL_LOG_LEVEL") };

    let config = result.expect("config should load");
    assert_eq!(config.general.log_level, "debug");
}

#[tokio::test]
#[serial]
async fn invalid_env_override_is_caught_by_validation() {
    let file = tempfile::NamedTempFile::new().expect("temp file");

    // SAFETY: serial 테스트에서만 환경변수를 조작합니다.
    unsafe { std::env::set_var("SLUICE_GENERAL_LOG_FORMAT", "xml") };
    let result = SluiceConfig::load(file.path()).await;
    unsafe { std::env::remove_var("SLUICE_GENERAL_LOG_FORMAT") };

    let err = result.expect_err("xml is not a supported log format");
    assert!(err.to_string().contains("log_format"));
}
