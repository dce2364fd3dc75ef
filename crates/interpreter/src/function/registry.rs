//! 함수 레지스트리
//!
//! [`FunctionRegistryBuilder`]로 내장 함수와 플러그인 함수를 등록한 뒤
//! [`FunctionRegistry`]로 고정합니다. 고정된 레지스트리는 불변이며
//! `Arc`로 파서와 인터프리터에 주입됩니다.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::{Function, FunctionDescriptor, builtin};
use crate::error::InterpreterError;

/// 이름으로 함수를 조회하는 읽기 전용 레지스트리
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<Function>>,
}

impl FunctionRegistry {
    /// 내장 함수만 등록된 레지스트리를 생성합니다.
    pub fn with_builtins() -> Result<Self, InterpreterError> {
        Ok(FunctionRegistryBuilder::new().with_builtins()?.build())
    }

    pub fn builder() -> FunctionRegistryBuilder {
        FunctionRegistryBuilder::new()
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<Function>> {
        self.functions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// 이름 순으로 정렬된 함수 기술자 목록
    pub fn descriptors(&self) -> Vec<&FunctionDescriptor> {
        let mut descriptors: Vec<_> = self.functions.values().map(|f| f.descriptor()).collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// 레지스트리 빌더
#[derive(Debug, Default)]
pub struct FunctionRegistryBuilder {
    functions: HashMap<String, Arc<Function>>,
}

impl FunctionRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 함수를 등록합니다.
    ///
    /// # Errors
    /// - 같은 이름이 이미 등록되어 있으면 `DuplicateFunction`
    /// - 이름이 비었거나 매개변수 이름이 중복되면 `InvalidFunction`
    pub fn register(mut self, function: Function) -> Result<Self, InterpreterError> {
        let descriptor = function.descriptor();
        validate_descriptor(descriptor)?;

        if self.functions.contains_key(&descriptor.name) {
            return Err(InterpreterError::DuplicateFunction(descriptor.name.clone()));
        }

        tracing::trace!(function = %descriptor.name, "function registered");
        self.functions
            .insert(descriptor.name.clone(), Arc::new(function));
        Ok(self)
    }

    /// 내장 함수 전체를 등록합니다.
    pub fn with_builtins(self) -> Result<Self, InterpreterError> {
        builtin::all()
            .into_iter()
            .try_fold(self, |builder, function| builder.register(function))
    }

    pub fn build(self) -> FunctionRegistry {
        tracing::debug!(count = self.functions.len(), "function registry built");
        FunctionRegistry {
            functions: self.functions,
        }
    }
}

fn validate_descriptor(descriptor: &FunctionDescriptor) -> Result<(), InterpreterError> {
    let invalid = |reason: String| InterpreterError::InvalidFunction {
        name: descriptor.name.clone(),
        reason,
    };

    if descriptor.name.is_empty() {
        return Err(invalid("name must not be empty".to_owned()));
    }

    let mut seen = HashSet::new();
    for param in &descriptor.params {
        if !seen.insert(param.name.as_str()) {
            return Err(invalid(format!("duplicate parameter '{}'", param.name)));
        }
        if let Some(default) = &param.default
            && !param.ty.accepts(default)
        {
            return Err(invalid(format!(
                "default for '{}' is not a {}",
                param.name, param.ty
            )));
        }
    }
    Ok(())
}
