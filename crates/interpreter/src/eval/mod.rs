//! 표현식 평가
//!
//! 트리 순회 평가기입니다. 한 번의 호출은 단일 스레드에서 중단 없이 실행되며,
//! 평가 중 실패는 [`EvalError`]로 반환되어 규칙 경계에서 처리됩니다.

mod context;
mod evaluator;

pub use context::EvaluationContext;
pub use evaluator::{evaluate, evaluate_condition, execute};

use std::fmt;

/// 규칙 평가 중 발생한 런타임 실패
///
/// 현재 규칙의 평가만 중단시키며 스테이지나 파이프라인은 계속 진행됩니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalError {
    message: String,
}

impl EvalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EvalError {}
