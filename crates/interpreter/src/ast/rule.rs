//! 규칙

use sluice_core::value::{Value, ValueType};

use super::{Expr, ExprKind, Position};

/// 컴파일된 규칙
///
/// 조건 표현식(Boolean)과 순서 있는 액션 문장 목록으로 구성됩니다.
/// 컴파일 이후 불변이며 스테이지에서 이름으로 참조됩니다.
#[derive(Debug, Clone)]
pub struct Rule {
    /// 소스 ID
    pub id: String,
    /// 규칙 이름 (`rule "name"`)
    pub name: String,
    /// 원본 소스 텍스트
    pub source: String,
    /// 조건
    pub when: Expr,
    /// 액션 문장
    pub then: Vec<Statement>,
}

impl Rule {
    /// 항상 불만족하는 규칙을 만듭니다.
    ///
    /// 해석할 수 없는 규칙 참조 자리에 들어가며, 액션은 없습니다.
    pub fn always_false(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: String::new(),
            source: String::new(),
            when: Expr::new(
                ExprKind::Literal(Value::Boolean(false)),
                ValueType::Boolean,
                Position::default(),
            ),
            then: Vec::new(),
            name,
        }
    }
}

/// 액션 문장
#[derive(Debug, Clone)]
pub enum Statement {
    /// `let name = expr;`
    Let { name: String, expr: Expr },
    /// `function(...);`
    Expr(Expr),
}
