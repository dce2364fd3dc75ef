//! 컴파일된 규칙 언어 구조
//!
//! - [`expr`]: 표현식 노드. 타입 검사 이후 모든 노드가 정적 타입을 가집니다.
//! - [`rule`]: 조건과 액션 문장 목록으로 이루어진 규칙
//! - [`pipeline`]: 스테이지와 매치 정책, 파이프라인
//!
//! 컴파일된 구조는 불변이며 `Arc`로 공유됩니다.

pub mod expr;
pub mod pipeline;
pub mod rule;

pub use expr::{ArithmeticOp, BoundArg, ComparisonOp, Expr, ExprKind, FunctionCall, UnaryOp};
pub use pipeline::{MatchPolicy, Pipeline, Stage};
pub use rule::{Rule, Statement};

use std::fmt;

use serde::Serialize;

/// 소스 내 위치
///
/// `line`은 1부터, `position_in_line`은 0부터 셉니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Position {
    pub line: usize,
    pub position_in_line: usize,
}

impl Position {
    pub fn new(line: usize, position_in_line: usize) -> Self {
        Self {
            line,
            position_in_line,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.position_in_line)
    }
}
