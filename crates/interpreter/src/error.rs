//! 인터프리터 에러 타입
//!
//! [`InterpreterError`]는 컴파일, 소스 로딩, 설정, 함수 등록 과정의 에러를 표현합니다.
//! `From<InterpreterError> for SluiceError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 전파할 수 있습니다.
//!
//! 규칙 평가 중 발생하는 런타임 실패는 여기에 속하지 않습니다.
//! 그런 실패는 [`EvalError`](crate::eval::EvalError)로 규칙 경계에서 처리됩니다.

use sluice_core::error::{CompileError, ConfigError, SluiceError, SourceError};

use crate::parser::ParseError;

/// 인터프리터 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum InterpreterError {
    /// 소스 컴파일 실패 (하나 이상의 파싱/타입 에러)
    #[error("compile error: '{source_id}': {} error(s)", .errors.len())]
    Compile {
        /// 소스 ID
        source_id: String,
        /// 위치 정보가 포함된 에러 목록
        errors: Vec<ParseError>,
    },

    /// 소스 파일 로딩 실패
    #[error("source load error: {path}: {reason}")]
    SourceLoad {
        /// 파일 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 같은 이름의 함수가 이미 등록됨
    #[error("duplicate function: {0}")]
    DuplicateFunction(String),

    /// 함수 기술자 정의 오류
    #[error("invalid function '{name}': {reason}")]
    InvalidFunction {
        /// 함수 이름
        name: String,
        /// 오류 사유
        reason: String,
    },

    /// 외부 저장소 에러
    #[error("store error: {0}")]
    Store(#[from] SluiceError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<InterpreterError> for SluiceError {
    fn from(err: InterpreterError) -> Self {
        match err {
            InterpreterError::Compile { source_id, errors } => {
                SluiceError::Compile(CompileError::Rejected {
                    first: errors.first().map(ToString::to_string).unwrap_or_default(),
                    error_count: errors.len(),
                    source_id,
                })
            }
            InterpreterError::SourceLoad { path, reason } => {
                SluiceError::Source(SourceError::Unreadable { path, reason })
            }
            InterpreterError::Config { field, reason } => {
                SluiceError::Config(ConfigError::InvalidValue { field, reason })
            }
            InterpreterError::DuplicateFunction(name) => {
                SluiceError::Config(ConfigError::InvalidValue {
                    field: "functions".to_owned(),
                    reason: format!("duplicate function '{name}'"),
                })
            }
            InterpreterError::InvalidFunction { name, reason } => {
                SluiceError::Config(ConfigError::InvalidValue {
                    field: "functions".to_owned(),
                    reason: format!("invalid function '{name}': {reason}"),
                })
            }
            InterpreterError::Store(inner) => inner,
            InterpreterError::Io(e) => SluiceError::Io(e),
        }
    }
}
