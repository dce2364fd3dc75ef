//! 메트릭 상수 및 설명 등록
//!
//! 인터프리터 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `sluice_`
//! - 모듈명: `interpreter_`, `rule_`, `stage_`
//! - 접미어: `_total` (counter), `_seconds` (histogram), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! metrics::counter!(sluice_core::metrics::INTERPRETER_MESSAGES_PROCESSED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 규칙 이름 레이블 키
pub const LABEL_RULE: &str = "rule";

/// 파이프라인 이름 레이블 키
pub const LABEL_PIPELINE: &str = "pipeline";

/// 결과 레이블 키 (satisfied, dissatisfied, failed, continued, stopped)
pub const LABEL_RESULT: &str = "result";

/// 소스 종류 레이블 키 (rule, pipeline)
pub const LABEL_KIND: &str = "kind";

/// 사용자 정의 카운터 이름 레이블 키
pub const LABEL_NAME: &str = "name";

// ─── Interpreter 메트릭 ────────────────────────────────────────────

/// Interpreter: 처리 완료된 메시지 수 (counter)
pub const INTERPRETER_MESSAGES_PROCESSED_TOTAL: &str =
    "sluice_interpreter_messages_processed_total";

/// Interpreter: 드롭된 메시지 수 (counter)
pub const INTERPRETER_MESSAGES_DROPPED_TOTAL: &str = "sluice_interpreter_messages_dropped_total";

/// Interpreter: 규칙이 생성한 메시지 수 (counter)
pub const INTERPRETER_MESSAGES_CREATED_TOTAL: &str = "sluice_interpreter_messages_created_total";

/// Interpreter: 라우팅 재평가 한도 도달 횟수 (counter)
pub const INTERPRETER_ROUTING_LIMIT_TOTAL: &str = "sluice_interpreter_routing_limit_total";

/// Interpreter: 컴파일 거부된 소스 수 (counter, label: kind)
pub const INTERPRETER_COMPILE_ERRORS_TOTAL: &str = "sluice_interpreter_compile_errors_total";

/// Interpreter: 처리 호출당 소요 시간 (histogram, 초)
pub const INTERPRETER_PROCESSING_DURATION_SECONDS: &str =
    "sluice_interpreter_processing_duration_seconds";

/// Interpreter: 활성 파이프라인 수 (gauge)
pub const INTERPRETER_ACTIVE_PIPELINES: &str = "sluice_interpreter_active_pipelines";

// ─── Rule / Stage 메트릭 ────────────────────────────────────────────

/// Rule: 조건 평가 수 (counter, labels: rule, result)
pub const RULE_EVALUATIONS_TOTAL: &str = "sluice_rule_evaluations_total";

/// Rule: 액션 실행 실패 수 (counter, label: rule)
pub const RULE_EXECUTION_FAILURES_TOTAL: &str = "sluice_rule_execution_failures_total";

/// Stage: 스테이지 실행 수 (counter, labels: pipeline, result)
pub const STAGE_EXECUTIONS_TOTAL: &str = "sluice_stage_executions_total";

/// 규칙 함수 `metric_counter_increment`가 올리는 카운터 (counter, label: name)
pub const RULE_CUSTOM_COUNTER_TOTAL: &str = "sluice_rule_custom_counter_total";

/// 모든 메트릭의 설명을 등록합니다.
///
/// 레코더 설치 직후 한 번 호출합니다.
/// `metrics::describe_counter!()`, `describe_gauge!()`, `describe_histogram!()`을
/// 사용하여 각 메트릭의 의미를 기록합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_counter!(
        INTERPRETER_MESSAGES_PROCESSED_TOTAL,
        "Total messages that finished pipeline processing"
    );
    describe_counter!(
        INTERPRETER_MESSAGES_DROPPED_TOTAL,
        "Total messages dropped by rule actions"
    );
    describe_counter!(
        INTERPRETER_MESSAGES_CREATED_TOTAL,
        "Total messages created by rule actions"
    );
    describe_counter!(
        INTERPRETER_ROUTING_LIMIT_TOTAL,
        "Total messages that hit the routing pass limit"
    );
    describe_counter!(
        INTERPRETER_COMPILE_ERRORS_TOTAL,
        "Total rule or pipeline sources rejected at compile time"
    );
    describe_histogram!(
        INTERPRETER_PROCESSING_DURATION_SECONDS,
        "Time spent in one interpreter processing call"
    );
    describe_gauge!(
        INTERPRETER_ACTIVE_PIPELINES,
        "Number of pipelines in the published interpreter state"
    );
    describe_counter!(
        RULE_EVALUATIONS_TOTAL,
        "Total rule condition evaluations by outcome"
    );
    describe_counter!(
        RULE_EXECUTION_FAILURES_TOTAL,
        "Total rule action executions that failed"
    );
    describe_counter!(
        STAGE_EXECUTIONS_TOTAL,
        "Total stage executions by continuation outcome"
    );
    describe_counter!(
        RULE_CUSTOM_COUNTER_TOTAL,
        "Counters incremented from rule actions"
    );
}
