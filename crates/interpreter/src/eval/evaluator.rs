//! 트리 순회 평가기

use std::borrow::Cow;
use std::collections::BTreeMap;

use sluice_core::value::Value;

use super::{EvalError, EvaluationContext};
use crate::ast::{ArithmeticOp, BoundArg, ComparisonOp, Expr, ExprKind, FunctionCall, Statement, UnaryOp};
use crate::function::FunctionArgs;
use crate::parser::ordinal;

/// 표현식을 평가합니다.
pub fn evaluate(expr: &Expr, ctx: &mut EvaluationContext<'_>) -> Result<Value, EvalError> {
    match &expr.kind {
        ExprKind::Literal(value) => Ok(value.clone()),
        ExprKind::MessageRef => Ok(Value::Map(ctx.message().fields().clone())),
        ExprKind::FieldRef(name) => Ok(ctx.message().field(name).cloned().unwrap_or_default()),
        ExprKind::Variable(name) => ctx
            .variable(name)
            .cloned()
            .ok_or_else(|| EvalError::new(format!("variable '{name}' is not defined"))),
        ExprKind::FieldAccess { object, field } => {
            let object = evaluate(object, ctx)?;
            access_field(object, field)
        }
        ExprKind::Index { object, index } => {
            let object = evaluate(object, ctx)?;
            let index = evaluate(index, ctx)?;
            access_index(object, &index)
        }
        ExprKind::List(items) => items
            .iter()
            .map(|item| evaluate(item, ctx))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        ExprKind::Map(entries) => {
            let mut map = BTreeMap::new();
            for (key, value) in entries {
                map.insert(key.clone(), evaluate(value, ctx)?);
            }
            Ok(Value::Map(map))
        }
        ExprKind::Call(call) => call_function(call, ctx),
        ExprKind::Unary { op, operand } => {
            let value = evaluate(operand, ctx)?;
            match op {
                UnaryOp::Not => Ok(Value::Boolean(!truthy(&value)?)),
                UnaryOp::Negate => negate(value),
            }
        }
        ExprKind::Arithmetic { op, left, right } => {
            let left = evaluate(left, ctx)?;
            let right = evaluate(right, ctx)?;
            arithmetic(*op, &left, &right)
        }
        ExprKind::Comparison { op, left, right } => {
            let left = evaluate(left, ctx)?;
            let right = evaluate(right, ctx)?;
            Ok(Value::Boolean(compare(*op, &left, &right)))
        }
        ExprKind::And(left, right) => {
            if !truthy(&evaluate(left, ctx)?)? {
                return Ok(Value::Boolean(false));
            }
            Ok(Value::Boolean(truthy(&evaluate(right, ctx)?)?))
        }
        ExprKind::Or(left, right) => {
            if truthy(&evaluate(left, ctx)?)? {
                return Ok(Value::Boolean(true));
            }
            Ok(Value::Boolean(truthy(&evaluate(right, ctx)?)?))
        }
    }
}

/// 규칙 조건을 평가합니다. Null은 거짓으로 취급합니다.
pub fn evaluate_condition(expr: &Expr, ctx: &mut EvaluationContext<'_>) -> Result<bool, EvalError> {
    let value = evaluate(expr, ctx)?;
    truthy(&value)
}

/// 액션 문장 하나를 실행합니다.
pub fn execute(statement: &Statement, ctx: &mut EvaluationContext<'_>) -> Result<(), EvalError> {
    match statement {
        Statement::Let { name, expr } => {
            let value = evaluate(expr, ctx)?;
            ctx.define(name.clone(), value);
        }
        Statement::Expr(expr) => {
            evaluate(expr, ctx)?;
        }
    }
    Ok(())
}

/// 인자를 왼쪽에서 오른쪽으로 평가한 뒤 함수를 호출합니다.
fn call_function(call: &FunctionCall, ctx: &mut EvaluationContext<'_>) -> Result<Value, EvalError> {
    let descriptor = call.function.descriptor();
    let mut values = Vec::with_capacity(call.args.len());

    for (idx, (param, arg)) in descriptor.params.iter().zip(&call.args).enumerate() {
        let bound = match arg {
            BoundArg::Missing => None,
            BoundArg::Constant(arg) => Some(Cow::Borrowed(arg)),
            BoundArg::Expr(expr) => {
                let value = evaluate(expr, ctx)?;
                let argument_error = |reason: String| {
                    EvalError::new(format!(
                        "In call to function '{}' at {} argument '{}': {reason}",
                        descriptor.name,
                        ordinal(idx + 1),
                        param.name
                    ))
                };
                if !value.is_null() && !param.ty.accepts(&value) {
                    return Err(argument_error(format!(
                        "expected {}, got {}",
                        param.ty,
                        value.value_type()
                    )));
                }
                Some(Cow::Owned(param.apply(value).map_err(argument_error)?))
            }
        };
        values.push(bound);
    }

    let args = FunctionArgs::new(descriptor, values);
    call.function.invoke(&args, ctx).map_err(|e| {
        EvalError::new(format!("In call to function '{}': {e}", descriptor.name))
    })
}

fn truthy(value: &Value) -> Result<bool, EvalError> {
    match value {
        Value::Boolean(b) => Ok(*b),
        Value::Null => Ok(false),
        other => Err(EvalError::new(format!(
            "expected boolean, got {}",
            other.value_type()
        ))),
    }
}

fn access_field(object: Value, field: &str) -> Result<Value, EvalError> {
    match object {
        Value::Map(mut map) => Ok(map.remove(field).unwrap_or_default()),
        Value::Null => Ok(Value::Null),
        other => Err(EvalError::new(format!(
            "cannot access field '{field}' of {}",
            other.value_type()
        ))),
    }
}

fn access_index(object: Value, index: &Value) -> Result<Value, EvalError> {
    match (object, index) {
        (Value::Null, _) => Ok(Value::Null),
        (Value::List(mut items), Value::Long(i)) => {
            let len = items.len();
            usize::try_from(*i)
                .ok()
                .filter(|i| *i < len)
                .map(|i| items.swap_remove(i))
                .ok_or_else(|| {
                    EvalError::new(format!("index {i} out of bounds for list of length {len}"))
                })
        }
        (Value::Map(mut map), Value::String(key)) => Ok(map.remove(key).unwrap_or_default()),
        (object, index) => Err(EvalError::new(format!(
            "cannot index {} with {}",
            object.value_type(),
            index.value_type()
        ))),
    }
}

fn negate(value: Value) -> Result<Value, EvalError> {
    match value {
        Value::Long(n) => n
            .checked_neg()
            .map(Value::Long)
            .ok_or_else(|| EvalError::new("integer overflow in negation")),
        Value::Double(d) => Ok(Value::Double(-d)),
        other => Err(EvalError::new(format!(
            "cannot negate {}",
            other.value_type()
        ))),
    }
}

fn arithmetic(op: ArithmeticOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    if let (Value::Long(a), Value::Long(b)) = (left, right) {
        let (a, b) = (*a, *b);
        let result = match op {
            ArithmeticOp::Add => a.checked_add(b),
            ArithmeticOp::Sub => a.checked_sub(b),
            ArithmeticOp::Mul => a.checked_mul(b),
            ArithmeticOp::Div | ArithmeticOp::Rem if b == 0 => {
                return Err(EvalError::new("division by zero"));
            }
            ArithmeticOp::Div => a.checked_div(b),
            ArithmeticOp::Rem => a.checked_rem(b),
        };
        return result
            .map(Value::Long)
            .ok_or_else(|| EvalError::new(format!("integer overflow in {a} {op} {b}")));
    }

    let (Some(a), Some(b)) = (left.as_double(), right.as_double()) else {
        return Err(EvalError::new(format!(
            "cannot apply '{op}' to {} and {}",
            left.value_type(),
            right.value_type()
        )));
    };
    let result = match op {
        ArithmeticOp::Add => a + b,
        ArithmeticOp::Sub => a - b,
        ArithmeticOp::Mul => a * b,
        ArithmeticOp::Div => a / b,
        ArithmeticOp::Rem => a % b,
    };
    Ok(Value::Double(result))
}

/// 비교 연산. 비교할 수 없는 조합은 거짓입니다.
fn compare(op: ComparisonOp, left: &Value, right: &Value) -> bool {
    match op {
        ComparisonOp::Eq => left.equals(right),
        ComparisonOp::NotEq => !left.equals(right),
        _ => match left.compare(right) {
            Some(ordering) => match op {
                ComparisonOp::Lt => ordering.is_lt(),
                ComparisonOp::Le => ordering.is_le(),
                ComparisonOp::Gt => ordering.is_gt(),
                ComparisonOp::Ge => ordering.is_ge(),
                ComparisonOp::Eq | ComparisonOp::NotEq => false,
            },
            None => false,
        },
    }
}
