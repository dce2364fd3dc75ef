//! 함수 기술자와 레지스트리
//!
//! 규칙 언어의 모든 함수는 [`FunctionDescriptor`](정적 메타데이터)와
//! 평가 클로저의 쌍인 [`Function`]으로 등록됩니다.
//! 레지스트리는 시작 시 한 번 구성되며 이후 읽기 전용입니다.
//!
//! # 매개변수 변환
//! [`ParameterDescriptor`]에 변환 함수를 지정하면 인자 값이 함수 본문에 전달되기 전에
//! 런타임 표현으로 바뀝니다 (예: 문자열 → 컴파일된 정규식).
//! 상수 인자의 변환은 컴파일 시점에 한 번, 그 외에는 평가 시점에 호출마다 한 번 실행됩니다.

pub mod builtin;
pub mod registry;

pub use registry::{FunctionRegistry, FunctionRegistryBuilder};

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::Serialize;
use sluice_core::value::{Value, ValueType};

use crate::eval::{EvalError, EvaluationContext};

/// 변환이 끝난 인자
#[derive(Debug, Clone)]
pub enum Arg {
    /// 일반 값
    Value(Value),
    /// 컴파일된 정규식
    Pattern(Arc<Regex>),
}

impl Arg {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Pattern(_) => None,
        }
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// 매개변수 변환 함수
pub type Transform = fn(&Value) -> Result<Arg, String>;

/// 문자열을 정규식으로 컴파일하는 변환
pub fn compile_pattern(value: &Value) -> Result<Arg, String> {
    let pattern = value
        .as_str()
        .ok_or_else(|| format!("expected a string pattern, got {}", value.value_type()))?;
    Regex::new(pattern)
        .map(|regex| Arg::Pattern(Arc::new(regex)))
        .map_err(|e| e.to_string())
}

/// 함수 매개변수 기술자
#[derive(Clone, Serialize)]
pub struct ParameterDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ValueType,
    pub optional: bool,
    /// 생략 시 사용할 기본값 (변환 전 값)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip)]
    pub transform: Option<Transform>,
    pub description: String,
}

impl ParameterDescriptor {
    fn new(name: &str, ty: ValueType) -> Self {
        Self {
            name: name.to_owned(),
            ty,
            optional: false,
            default: None,
            transform: None,
            description: String::new(),
        }
    }

    pub fn string(name: &str) -> Self {
        Self::new(name, ValueType::String)
    }

    pub fn long(name: &str) -> Self {
        Self::new(name, ValueType::Long)
    }

    pub fn double(name: &str) -> Self {
        Self::new(name, ValueType::Double)
    }

    pub fn boolean(name: &str) -> Self {
        Self::new(name, ValueType::Boolean)
    }

    pub fn any(name: &str) -> Self {
        Self::new(name, ValueType::Any)
    }

    pub fn list(name: &str) -> Self {
        Self::new(name, ValueType::List)
    }

    pub fn map(name: &str) -> Self {
        Self::new(name, ValueType::Map)
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// 기본값을 지정합니다. 기본값이 있는 매개변수는 선택 매개변수입니다.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.optional = true;
        self.default = Some(value.into());
        self
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn description(mut self, text: &str) -> Self {
        self.description = text.to_owned();
        self
    }

    /// 인자 값에 변환을 적용합니다. 변환이 없으면 값을 그대로 감쌉니다.
    pub fn apply(&self, value: Value) -> Result<Arg, String> {
        match self.transform {
            Some(transform) if !value.is_null() => transform(&value),
            _ => Ok(Arg::Value(value)),
        }
    }
}

impl fmt::Debug for ParameterDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterDescriptor")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("optional", &self.optional)
            .field("default", &self.default)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

/// 함수 기술자
#[derive(Debug, Clone, Serialize)]
pub struct FunctionDescriptor {
    pub name: String,
    pub return_type: ValueType,
    pub params: Vec<ParameterDescriptor>,
    /// 순수 함수는 모든 인자가 상수이면 컴파일 시점에 미리 계산됩니다.
    pub pure: bool,
    pub description: String,
}

impl FunctionDescriptor {
    pub fn new(name: &str, return_type: ValueType) -> Self {
        Self {
            name: name.to_owned(),
            return_type,
            params: Vec::new(),
            pure: false,
            description: String::new(),
        }
    }

    pub fn param(mut self, param: ParameterDescriptor) -> Self {
        self.params.push(param);
        self
    }

    pub fn pure(mut self) -> Self {
        self.pure = true;
        self
    }

    pub fn description(mut self, text: &str) -> Self {
        self.description = text.to_owned();
        self
    }

    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }

    pub fn required_params(&self) -> impl Iterator<Item = &ParameterDescriptor> {
        self.params.iter().filter(|p| !p.optional)
    }

    /// 선택 매개변수 뒤에 필수 매개변수가 오는지 여부
    ///
    /// 이런 함수는 위치 인자로 호출할 수 없습니다.
    pub fn requires_named_args(&self) -> bool {
        self.params
            .iter()
            .skip_while(|p| !p.optional)
            .any(|p| !p.optional)
    }
}

/// 함수 본문
pub type FunctionBody =
    dyn Fn(&FunctionArgs<'_>, &mut EvaluationContext<'_>) -> Result<Value, EvalError> + Send + Sync;

/// 등록된 함수
pub struct Function {
    descriptor: FunctionDescriptor,
    body: Arc<FunctionBody>,
}

impl Function {
    pub fn new<F>(descriptor: FunctionDescriptor, body: F) -> Self
    where
        F: Fn(&FunctionArgs<'_>, &mut EvaluationContext<'_>) -> Result<Value, EvalError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            descriptor,
            body: Arc::new(body),
        }
    }

    pub fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn invoke(
        &self,
        args: &FunctionArgs<'_>,
        ctx: &mut EvaluationContext<'_>,
    ) -> Result<Value, EvalError> {
        (self.body)(args, ctx)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// 함수 본문에 전달되는 인자 집합
///
/// 매개변수 순서대로 정렬되어 있으며, 생략된 매개변수는 `None`입니다.
pub struct FunctionArgs<'a> {
    descriptor: &'a FunctionDescriptor,
    values: Vec<Option<Cow<'a, Arg>>>,
}

impl<'a> FunctionArgs<'a> {
    pub fn new(descriptor: &'a FunctionDescriptor, values: Vec<Option<Cow<'a, Arg>>>) -> Self {
        Self { descriptor, values }
    }

    fn arg(&self, name: &str) -> Option<&Arg> {
        let idx = self.descriptor.param_index(name)?;
        self.values.get(idx)?.as_deref()
    }

    /// 매개변수 값. 생략되었거나 Null이면 `None`입니다.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.arg(name)
            .and_then(Arg::as_value)
            .filter(|v| !v.is_null())
    }

    pub fn required_value(&self, name: &str) -> Result<&Value, EvalError> {
        self.value(name)
            .ok_or_else(|| EvalError::new(format!("parameter '{name}' must not be null")))
    }

    pub fn string(&self, name: &str) -> Result<Option<&str>, EvalError> {
        match self.value(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(type_mismatch(name, ValueType::String, other)),
        }
    }

    pub fn required_string(&self, name: &str) -> Result<&str, EvalError> {
        self.string(name)?
            .ok_or_else(|| EvalError::new(format!("parameter '{name}' must not be null")))
    }

    pub fn long(&self, name: &str) -> Result<Option<i64>, EvalError> {
        match self.value(name) {
            None => Ok(None),
            Some(Value::Long(n)) => Ok(Some(*n)),
            Some(other) => Err(type_mismatch(name, ValueType::Long, other)),
        }
    }

    pub fn double(&self, name: &str) -> Result<Option<f64>, EvalError> {
        match self.value(name) {
            None => Ok(None),
            Some(v) => v
                .as_double()
                .map(Some)
                .ok_or_else(|| type_mismatch(name, ValueType::Double, v)),
        }
    }

    pub fn bool(&self, name: &str) -> Result<Option<bool>, EvalError> {
        match self.value(name) {
            None => Ok(None),
            Some(Value::Boolean(b)) => Ok(Some(*b)),
            Some(other) => Err(type_mismatch(name, ValueType::Boolean, other)),
        }
    }

    pub fn list(&self, name: &str) -> Result<Option<&[Value]>, EvalError> {
        match self.value(name) {
            None => Ok(None),
            Some(Value::List(items)) => Ok(Some(items)),
            Some(other) => Err(type_mismatch(name, ValueType::List, other)),
        }
    }

    pub fn map(&self, name: &str) -> Result<Option<&BTreeMap<String, Value>>, EvalError> {
        match self.value(name) {
            None => Ok(None),
            Some(Value::Map(map)) => Ok(Some(map)),
            Some(other) => Err(type_mismatch(name, ValueType::Map, other)),
        }
    }

    /// 정규식 변환이 적용된 매개변수
    pub fn pattern(&self, name: &str) -> Result<&Regex, EvalError> {
        match self.arg(name) {
            Some(Arg::Pattern(regex)) => Ok(regex),
            _ => Err(EvalError::new(format!(
                "parameter '{name}' is not a compiled pattern"
            ))),
        }
    }
}

fn type_mismatch(name: &str, expected: ValueType, found: &Value) -> EvalError {
    EvalError::new(format!(
        "parameter '{name}' expected {expected}, got {}",
        found.value_type()
    ))
}
