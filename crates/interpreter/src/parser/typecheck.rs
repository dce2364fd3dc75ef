//! 타입 검사와 함수 인자 바인딩
//!
//! 파서가 구문 노드를 만들 때마다 [`Checker`]를 거쳐 정적 타입이 부여된
//! [`Expr`]를 얻습니다. 타입 에러는 누적되며, 에러가 난 노드는 `Any` 타입으로
//! 대체되어 이후 검사가 연쇄 에러를 만들지 않습니다.
//!
//! 상수 인자만 받는 순수 함수 호출과 상수로만 이루어진 리스트/맵은
//! 이 단계에서 미리 계산됩니다.

use std::collections::{BTreeMap, HashMap};

use sluice_core::types::Message;
use sluice_core::value::{Value, ValueType};

use super::errors::{ParseError, ParseErrorKind, ordinal};
use crate::ast::{
    ArithmeticOp, BoundArg, ComparisonOp, Expr, ExprKind, FunctionCall, Position, UnaryOp,
};
use crate::eval::{EvaluationContext, evaluate};
use crate::function::FunctionRegistry;

/// 호출 지점의 인자 목록
pub(crate) enum CallArgs {
    Positional(Vec<Expr>),
    Named(Vec<(String, Position, Expr)>),
}

pub(crate) struct Checker<'r> {
    registry: &'r FunctionRegistry,
    variables: HashMap<String, ValueType>,
    errors: Vec<ParseError>,
}

impl<'r> Checker<'r> {
    pub fn new(registry: &'r FunctionRegistry) -> Self {
        Self {
            registry,
            variables: HashMap::new(),
            errors: Vec::new(),
        }
    }

    pub fn error(&mut self, kind: ParseErrorKind, pos: Position, reason: impl Into<String>) {
        self.errors.push(ParseError::new(kind, pos, reason));
    }

    pub fn into_errors(self) -> Vec<ParseError> {
        self.errors
    }

    /// 에러 자리에 들어가는 `Any` 타입 노드
    fn poisoned(pos: Position) -> Expr {
        Expr::new(ExprKind::Literal(Value::Null), ValueType::Any, pos)
    }

    pub fn declare(&mut self, name: &str, ty: ValueType) {
        self.variables.insert(name.to_owned(), ty);
    }

    pub fn variable(&mut self, name: &str, pos: Position) -> Expr {
        match self.variables.get(name) {
            Some(ty) => Expr::new(ExprKind::Variable(name.to_owned()), *ty, pos),
            None => {
                self.error(
                    ParseErrorKind::UndeclaredVariable,
                    pos,
                    format!("undeclared variable '{name}'"),
                );
                Self::poisoned(pos)
            }
        }
    }

    /// 규칙 조건은 Boolean이어야 합니다 (`Any`는 런타임에 확인).
    pub fn condition(&mut self, expr: Expr) -> Expr {
        if !matches!(expr.ty, ValueType::Boolean | ValueType::Any) {
            self.error(
                ParseErrorKind::NonBooleanCondition,
                expr.pos,
                format!("condition must be boolean, got {}", expr.ty),
            );
        }
        expr
    }

    pub fn field_access(&mut self, object: Expr, field: String, pos: Position) -> Expr {
        if !matches!(object.ty, ValueType::Map | ValueType::Any | ValueType::Null) {
            self.error(
                ParseErrorKind::NonIndexableType,
                pos,
                format!("cannot access field '{field}' of {}", object.ty),
            );
            return Self::poisoned(pos);
        }
        Expr::new(
            ExprKind::FieldAccess {
                object: Box::new(object),
                field,
            },
            ValueType::Any,
            pos,
        )
    }

    pub fn index(&mut self, object: Expr, index: Expr, pos: Position) -> Expr {
        let index_ok = match object.ty {
            ValueType::Map => matches!(index.ty, ValueType::String | ValueType::Any),
            ValueType::List => matches!(index.ty, ValueType::Long | ValueType::Any),
            ValueType::Any | ValueType::Null => matches!(
                index.ty,
                ValueType::String | ValueType::Long | ValueType::Any
            ),
            other => {
                self.error(
                    ParseErrorKind::NonIndexableType,
                    object.pos,
                    format!("cannot index a value of type {other}"),
                );
                return Self::poisoned(pos);
            }
        };
        if !index_ok {
            self.error(
                ParseErrorKind::IncompatibleIndexType,
                index.pos,
                format!("cannot index {} with {}", object.ty, index.ty),
            );
            return Self::poisoned(pos);
        }
        Expr::new(
            ExprKind::Index {
                object: Box::new(object),
                index: Box::new(index),
            },
            ValueType::Any,
            pos,
        )
    }

    pub fn unary(&mut self, op: UnaryOp, operand: Expr, pos: Position) -> Expr {
        match op {
            UnaryOp::Not => {
                if !matches!(operand.ty, ValueType::Boolean | ValueType::Any) {
                    self.error(
                        ParseErrorKind::IncompatibleTypes,
                        operand.pos,
                        format!("'not' requires a boolean, got {}", operand.ty),
                    );
                    return Self::poisoned(pos);
                }
                if let Some(Value::Boolean(b)) = operand.constant() {
                    return Expr::literal(Value::Boolean(!b), pos);
                }
                Expr::new(
                    ExprKind::Unary {
                        op,
                        operand: Box::new(operand),
                    },
                    ValueType::Boolean,
                    pos,
                )
            }
            UnaryOp::Negate => {
                if !(operand.ty.is_numeric() || operand.ty == ValueType::Any) {
                    self.error(
                        ParseErrorKind::IncompatibleTypes,
                        operand.pos,
                        format!("cannot negate {}", operand.ty),
                    );
                    return Self::poisoned(pos);
                }
                match operand.constant() {
                    Some(Value::Long(n)) if *n != i64::MIN => Expr::literal(Value::Long(-n), pos),
                    Some(Value::Double(d)) => Expr::literal(Value::Double(-d), pos),
                    _ => {
                        let ty = operand.ty;
                        Expr::new(
                            ExprKind::Unary {
                                op,
                                operand: Box::new(operand),
                            },
                            ty,
                            pos,
                        )
                    }
                }
            }
        }
    }

    pub fn arithmetic(&mut self, op: ArithmeticOp, left: Expr, right: Expr, pos: Position) -> Expr {
        let numeric_or_any = |ty: ValueType| ty.is_numeric() || ty == ValueType::Any;
        if !numeric_or_any(left.ty) || !numeric_or_any(right.ty) {
            self.error(
                ParseErrorKind::IncompatibleTypes,
                pos,
                format!("cannot apply '{op}' to {} and {}", left.ty, right.ty),
            );
            return Self::poisoned(pos);
        }
        let ty = match (left.ty, right.ty) {
            (ValueType::Long, ValueType::Long) => ValueType::Long,
            (ValueType::Double, _) | (_, ValueType::Double) => ValueType::Double,
            _ => ValueType::Any,
        };
        Expr::new(
            ExprKind::Arithmetic {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            ty,
            pos,
        )
    }

    pub fn comparison(&mut self, op: ComparisonOp, left: Expr, right: Expr, pos: Position) -> Expr {
        let compatible = if op.is_equality() {
            left.ty.is_comparable_with(right.ty)
                || left.ty == ValueType::Null
                || right.ty == ValueType::Null
        } else {
            match (left.ty, right.ty) {
                (ValueType::Any, other) | (other, ValueType::Any) => {
                    other.is_numeric() || matches!(other, ValueType::String | ValueType::Any)
                }
                (ValueType::String, ValueType::String) => true,
                (l, r) => l.is_numeric() && r.is_numeric(),
            }
        };
        if !compatible {
            self.error(
                ParseErrorKind::IncompatibleTypes,
                pos,
                format!("cannot compare {} {op} {}", left.ty, right.ty),
            );
            return Self::poisoned(pos);
        }
        Expr::new(
            ExprKind::Comparison {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            ValueType::Boolean,
            pos,
        )
    }

    /// `and`(`is_and == true`) 또는 `or`
    pub fn logical(&mut self, is_and: bool, left: Expr, right: Expr, pos: Position) -> Expr {
        let keyword = if is_and { "and" } else { "or" };
        for operand in [&left, &right] {
            if !matches!(operand.ty, ValueType::Boolean | ValueType::Any) {
                self.error(
                    ParseErrorKind::IncompatibleTypes,
                    operand.pos,
                    format!("'{keyword}' requires boolean operands, got {}", operand.ty),
                );
                return Self::poisoned(pos);
            }
        }
        let kind = if is_and {
            ExprKind::And(Box::new(left), Box::new(right))
        } else {
            ExprKind::Or(Box::new(left), Box::new(right))
        };
        Expr::new(kind, ValueType::Boolean, pos)
    }

    pub fn list(&mut self, items: Vec<Expr>, pos: Position) -> Expr {
        if items.iter().all(|item| item.constant().is_some()) {
            let values = items
                .into_iter()
                .filter_map(|item| match item.kind {
                    ExprKind::Literal(value) => Some(value),
                    _ => None,
                })
                .collect();
            return Expr::literal(Value::List(values), pos);
        }
        Expr::new(ExprKind::List(items), ValueType::List, pos)
    }

    pub fn map(&mut self, entries: Vec<(String, Expr)>, pos: Position) -> Expr {
        if entries.iter().all(|(_, value)| value.constant().is_some()) {
            let map: BTreeMap<String, Value> = entries
                .into_iter()
                .filter_map(|(key, value)| match value.kind {
                    ExprKind::Literal(value) => Some((key, value)),
                    _ => None,
                })
                .collect();
            return Expr::literal(Value::Map(map), pos);
        }
        Expr::new(ExprKind::Map(entries), ValueType::Map, pos)
    }

    /// 함수 호출의 인자를 매개변수에 바인딩합니다.
    pub fn call(&mut self, name: &str, pos: Position, args: CallArgs) -> Expr {
        let Some(function) = self.registry.resolve(name) else {
            self.error(
                ParseErrorKind::UndeclaredFunction,
                pos,
                format!("unknown function '{name}'"),
            );
            return Self::poisoned(pos);
        };
        let descriptor = function.descriptor();
        let mut slots: Vec<Option<Expr>> = vec![None; descriptor.params.len()];

        match args {
            CallArgs::Positional(args) => {
                if !args.is_empty() && descriptor.requires_named_args() {
                    self.error(
                        ParseErrorKind::OptionalParamsMustBeNamed,
                        pos,
                        format!(
                            "function '{name}' has optional parameters before required ones, \
                             call it with named arguments"
                        ),
                    );
                    return Self::poisoned(pos);
                }
                if args.len() > descriptor.params.len() {
                    self.error(
                        ParseErrorKind::WrongNumberOfArgs,
                        pos,
                        format!(
                            "function '{name}' takes at most {} argument(s), got {}",
                            descriptor.params.len(),
                            args.len()
                        ),
                    );
                    return Self::poisoned(pos);
                }
                for (slot, arg) in slots.iter_mut().zip(args) {
                    *slot = Some(arg);
                }
            }
            CallArgs::Named(args) => {
                let mut failed = false;
                for (param_name, arg_pos, arg) in args {
                    let Some(idx) = descriptor.param_index(&param_name) else {
                        self.error(
                            ParseErrorKind::UnknownParameter,
                            arg_pos,
                            format!("function '{name}' has no parameter '{param_name}'"),
                        );
                        failed = true;
                        continue;
                    };
                    if slots[idx].is_some() {
                        self.error(
                            ParseErrorKind::SyntaxError,
                            arg_pos,
                            format!("parameter '{param_name}' given more than once"),
                        );
                        failed = true;
                        continue;
                    }
                    slots[idx] = Some(arg);
                }
                if failed {
                    return Self::poisoned(pos);
                }
            }
        }

        let mut bound = Vec::with_capacity(slots.len());
        let mut failed = false;
        for (idx, (param, slot)) in descriptor.params.iter().zip(slots).enumerate() {
            let nth = ordinal(idx + 1);
            match slot {
                None if !param.optional => {
                    self.error(
                        ParseErrorKind::MissingRequiredParam,
                        pos,
                        format!(
                            "missing required parameter '{}' ({nth} argument) of function '{name}'",
                            param.name
                        ),
                    );
                    failed = true;
                }
                None => match &param.default {
                    Some(default) => match param.apply(default.clone()) {
                        Ok(arg) => bound.push(BoundArg::Constant(arg)),
                        Err(reason) => {
                            self.error(
                                ParseErrorKind::InvalidFunctionArgument,
                                pos,
                                format!(
                                    "default for {nth} argument '{}' of function '{name}' is invalid: {reason}",
                                    param.name
                                ),
                            );
                            failed = true;
                        }
                    },
                    None => bound.push(BoundArg::Missing),
                },
                Some(expr) => {
                    if expr.ty != ValueType::Null && !expr.ty.is_assignable_to(param.ty) {
                        self.error(
                            ParseErrorKind::IncompatibleArgumentType,
                            expr.pos,
                            format!(
                                "expected {} for {nth} argument '{}' of function '{name}', got {}",
                                param.ty, param.name, expr.ty
                            ),
                        );
                        failed = true;
                        continue;
                    }
                    match expr.constant() {
                        Some(value) => match param.apply(value.clone()) {
                            Ok(arg) => bound.push(BoundArg::Constant(arg)),
                            Err(reason) => {
                                self.error(
                                    ParseErrorKind::InvalidFunctionArgument,
                                    expr.pos,
                                    format!(
                                        "{nth} argument '{}' of function '{name}' is invalid: {reason}",
                                        param.name
                                    ),
                                );
                                failed = true;
                            }
                        },
                        None => bound.push(BoundArg::Expr(expr)),
                    }
                }
            }
        }
        if failed {
            return Self::poisoned(pos);
        }

        let foldable = descriptor.pure
            && bound
                .iter()
                .all(|arg| matches!(arg, BoundArg::Constant(_) | BoundArg::Missing));
        let return_type = descriptor.return_type;
        let call = Expr::new(
            ExprKind::Call(FunctionCall {
                function: function.clone(),
                args: bound,
            }),
            return_type,
            pos,
        );

        if foldable {
            return fold(call);
        }
        call
    }
}

/// 상수 인자만 가진 순수 함수 호출을 미리 계산합니다.
///
/// 실패하면 호출을 그대로 두어 런타임에 규칙 실패로 보고되게 합니다.
fn fold(call: Expr) -> Expr {
    let mut scratch = Message::with_id(String::new());
    let mut ctx = EvaluationContext::new(&mut scratch);
    match evaluate(&call, &mut ctx) {
        Ok(value) => {
            let ty = if call.ty == ValueType::Any || value.is_null() {
                call.ty
            } else {
                value.value_type()
            };
            Expr::new(ExprKind::Literal(value), ty, call.pos)
        }
        Err(e) => {
            tracing::debug!(error = %e, pos = %call.pos, "constant folding failed, deferring to runtime");
            call
        }
    }
}
