//! 표현식 노드

use std::fmt;
use std::sync::Arc;

use sluice_core::value::{Value, ValueType};

use super::Position;
use crate::function::{Arg, Function};

/// 표현식 노드
///
/// `ty`는 타입 검사기가 부여한 정적 타입입니다.
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: ValueType,
    pub pos: Position,
}

impl Expr {
    pub fn new(kind: ExprKind, ty: ValueType, pos: Position) -> Self {
        Self { kind, ty, pos }
    }

    /// 상수 리터럴 노드. 타입은 값에서 결정됩니다.
    pub fn literal(value: Value, pos: Position) -> Self {
        let ty = value.value_type();
        Self::new(ExprKind::Literal(value), ty, pos)
    }

    /// 컴파일 시점에 값이 확정된 노드이면 그 값을 반환합니다.
    pub fn constant(&self) -> Option<&Value> {
        match &self.kind {
            ExprKind::Literal(value) => Some(value),
            _ => None,
        }
    }
}

/// 표현식 종류
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// 상수 값
    Literal(Value),
    /// `$message` (전체 필드 맵)
    MessageRef,
    /// `$message.field`
    FieldRef(String),
    /// `let`으로 선언된 변수
    Variable(String),
    /// `object.field` (맵 필드 접근)
    FieldAccess { object: Box<Expr>, field: String },
    /// `object[index]`
    Index { object: Box<Expr>, index: Box<Expr> },
    /// `[a, b, ...]`
    List(Vec<Expr>),
    /// `{key: value, ...}`
    Map(Vec<(String, Expr)>),
    /// 함수 호출
    Call(FunctionCall),
    /// `not x`, `-x`
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// `+ - * / %`
    Arithmetic {
        op: ArithmeticOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `== != < <= > >=`
    Comparison {
        op: ComparisonOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `a and b` (단락 평가)
    And(Box<Expr>, Box<Expr>),
    /// `a or b` (단락 평가)
    Or(Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
        };
        write!(f, "{symbol}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl ComparisonOp {
    /// 동등 비교(`==`, `!=`)인지 여부
    pub fn is_equality(self) -> bool {
        matches!(self, Self::Eq | Self::NotEq)
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        };
        write!(f, "{symbol}")
    }
}

/// 바인딩이 끝난 함수 호출
///
/// `args`는 함수 기술자의 매개변수 순서와 1:1로 대응합니다.
#[derive(Debug, Clone)]
pub struct FunctionCall {
    pub function: Arc<Function>,
    pub args: Vec<BoundArg>,
}

impl FunctionCall {
    pub fn name(&self) -> &str {
        &self.function.descriptor().name
    }
}

/// 매개변수 하나에 바인딩된 인자
#[derive(Debug, Clone)]
pub enum BoundArg {
    /// 생략된 선택 매개변수 (기본값 없음)
    Missing,
    /// 컴파일 시점에 변환까지 끝난 상수
    Constant(Arg),
    /// 평가 시점에 계산할 표현식
    Expr(Expr),
}
