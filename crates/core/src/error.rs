//! 에러 타입 -- 도메인별 에러 정의

/// Sluice 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum SluiceError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 규칙/파이프라인 소스 로딩 에러
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// 컴파일 실패 (활성화 거부)
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    /// 메시지 표현 에러
    #[error("message error: {0}")]
    Message(#[from] MessageError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 소스 저장소 에러
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// 요청한 소스가 존재하지 않음
    #[error("{kind} source not found: {id}")]
    NotFound { kind: String, id: String },

    /// 소스를 읽을 수 없음
    #[error("unreadable source {path}: {reason}")]
    Unreadable { path: String, reason: String },

    /// 소스 크기 초과
    #[error("source too large: {path}: {size} bytes (max: {max})")]
    TooLarge { path: String, size: u64, max: u64 },

    /// 스트림 연결 정의 오류
    #[error("invalid stream connections: {reason}")]
    InvalidConnections { reason: String },
}

/// 컴파일 거부 에러
///
/// 개별 파싱 에러 목록은 인터프리터 크레이트가 보관하며,
/// 여기서는 요약만 전달합니다.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// 하나 이상의 컴파일 에러로 소스가 거부됨
    #[error("source '{source_id}' rejected with {error_count} error(s), first: {first}")]
    Rejected {
        source_id: String,
        error_count: usize,
        first: String,
    },
}

/// 메시지 표현 에러
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// JSON 파싱 실패
    #[error("invalid message json: {reason}")]
    InvalidJson { reason: String },

    /// 최상위가 객체가 아님
    #[error("message json must be an object, got {found}")]
    NotAnObject { found: String },

    /// 예약 필드 형식 오류
    #[error("invalid reserved field '{field}': {reason}")]
    InvalidReservedField { field: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_into_top_level() {
        let err: SluiceError = ConfigError::InvalidValue {
            field: "general.log_level".to_owned(),
            reason: "bad".to_owned(),
        }
        .into();
        assert!(matches!(err, SluiceError::Config(_)));
        assert!(err.to_string().contains("general.log_level"));
    }

    #[test]
    fn compile_error_display_names_source() {
        let err = CompileError::Rejected {
            source_id: "tag_http".to_owned(),
            error_count: 2,
            first: "1:5 SyntaxError".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("tag_http"));
        assert!(msg.contains("2 error(s)"));
    }

    #[test]
    fn source_not_found_display() {
        let err = SourceError::NotFound {
            kind: "rule".to_owned(),
            id: "missing".to_owned(),
        };
        assert_eq!(err.to_string(), "rule source not found: missing");
    }
}
