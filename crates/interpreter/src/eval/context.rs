//! 메시지 단위 평가 상태

use std::collections::HashMap;

use sluice_core::types::Message;
use sluice_core::value::Value;

/// 평가 컨텍스트
///
/// 처리 중인 메시지, `let` 변수 바인딩, 액션이 생성한 메시지를 담습니다.
/// 하나의 평가 호출이 독점하며 동시 평가 사이에 공유되지 않습니다.
#[derive(Debug)]
pub struct EvaluationContext<'m> {
    message: &'m mut Message,
    variables: HashMap<String, Value>,
    created: Vec<Message>,
}

impl<'m> EvaluationContext<'m> {
    pub fn new(message: &'m mut Message) -> Self {
        Self {
            message,
            variables: HashMap::new(),
            created: Vec::new(),
        }
    }

    pub fn message(&self) -> &Message {
        self.message
    }

    pub fn message_mut(&mut self) -> &mut Message {
        self.message
    }

    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// 규칙 사이에 변수가 새지 않도록 바인딩을 비웁니다.
    pub fn clear_variables(&mut self) {
        self.variables.clear();
    }

    /// 새 메시지를 생성 목록에 추가하고 ID를 반환합니다.
    pub fn create_message(&mut self, message: Message) -> String {
        let id = message.id().to_owned();
        self.created.push(message);
        id
    }

    pub fn created(&self) -> &[Message] {
        &self.created
    }

    /// 생성된 메시지를 꺼냅니다.
    pub fn take_created(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.created)
    }
}
