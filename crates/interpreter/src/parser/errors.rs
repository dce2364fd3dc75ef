//! 컴파일 에러 타입

use std::fmt;

use serde::Serialize;

use crate::ast::Position;

/// 컴파일 에러 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseErrorKind {
    SyntaxError,
    IncompatibleArgumentType,
    IncompatibleIndexType,
    NonIndexableType,
    InvalidFunctionArgument,
    UndeclaredFunction,
    UndeclaredVariable,
    WrongNumberOfArgs,
    MissingRequiredParam,
    OptionalParamsMustBeNamed,
    UnknownParameter,
    IncompatibleTypes,
    NonBooleanCondition,
    DuplicateStage,
    InvalidStageMatch,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// 위치 정보가 포함된 컴파일 에러
///
/// `line`은 1부터, `position_in_line`은 0부터 셉니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{line}:{position_in_line} {kind}: {reason}")]
pub struct ParseError {
    #[serde(rename = "type")]
    pub kind: ParseErrorKind,
    pub line: usize,
    pub position_in_line: usize,
    pub reason: String,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, pos: Position, reason: impl Into<String>) -> Self {
        Self {
            kind,
            line: pos.line,
            position_in_line: pos.position_in_line,
            reason: reason.into(),
        }
    }

    pub fn syntax(pos: Position, reason: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::SyntaxError, pos, reason)
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.position_in_line)
    }
}

/// 1 → "1st", 2 → "2nd", 11 → "11th"
pub fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}
