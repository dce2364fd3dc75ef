//! 도메인 타입 -- 인터프리터와 외부 협력자가 공유하는 타입
//!
//! - [`Message`]: 규칙이 읽고 변경하는 로그 메시지 (필드 맵, 스트림 소속, 드롭 표시)
//! - [`TraceEntry`]: 평가 추적 한 줄 (경과 마이크로초, 텍스트)

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::MessageError;
use crate::value::Value;

/// 스트림이 하나도 없는 메시지가 해석되는 기본 스트림 ID
pub const DEFAULT_STREAM: &str = "default";

/// 원본 로그 텍스트 필드
pub const FIELD_MESSAGE: &str = "message";
/// 로그 발생지 필드
pub const FIELD_SOURCE: &str = "source";
/// 타임스탬프 필드 (RFC 3339 문자열)
pub const FIELD_TIMESTAMP: &str = "timestamp";
/// 규칙 실행 실패가 누적되는 필드
pub const FIELD_PROCESSING_ERROR: &str = "processing_error";

/// JSON 입력에서 메시지 ID를 지정하는 예약 키
const JSON_ID_KEY: &str = "_id";
/// JSON 입력에서 스트림 소속을 지정하는 예약 키
const JSON_STREAMS_KEY: &str = "_streams";

/// 로그 메시지
///
/// 필드 맵은 이름 순으로 정렬되어 직렬화 결과가 결정적입니다.
/// 스트림 소속은 규칙 액션(`route_to_stream` 등)이 변경할 수 있습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: String,
    fields: BTreeMap<String, Value>,
    #[serde(default)]
    streams: BTreeSet<String>,
    #[serde(default)]
    filter_out: bool,
}

impl Message {
    /// 새 메시지를 생성합니다. ID는 UUID v4로 발급됩니다.
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        let mut message = Self::with_id(uuid::Uuid::new_v4().to_string());
        message.set_field(FIELD_MESSAGE, Value::String(text.into()));
        message.set_field(FIELD_SOURCE, Value::String(source.into()));
        message
    }

    /// 지정한 ID로 빈 메시지를 생성합니다.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
            streams: BTreeSet::new(),
            filter_out: false,
        }
    }

    /// 필드 맵으로 메시지를 생성합니다.
    pub fn from_fields(fields: BTreeMap<String, Value>) -> Self {
        let mut message = Self::with_id(uuid::Uuid::new_v4().to_string());
        message.add_fields(fields);
        message
    }

    /// JSON 객체 텍스트에서 메시지를 생성합니다.
    ///
    /// 예약 키 `_id`(문자열)와 `_streams`(문자열 배열)는 필드가 아니라
    /// 메시지 ID와 스트림 소속으로 해석됩니다.
    pub fn from_json(text: &str) -> Result<Self, MessageError> {
        let json: serde_json::Value =
            serde_json::from_str(text).map_err(|e| MessageError::InvalidJson {
                reason: e.to_string(),
            })?;
        let serde_json::Value::Object(mut object) = json else {
            return Err(MessageError::NotAnObject {
                found: json_kind(&json).to_owned(),
            });
        };

        let id = match object.remove(JSON_ID_KEY) {
            None => uuid::Uuid::new_v4().to_string(),
            Some(serde_json::Value::String(id)) if !id.is_empty() => id,
            Some(_) => {
                return Err(MessageError::InvalidReservedField {
                    field: JSON_ID_KEY.to_owned(),
                    reason: "must be a non-empty string".to_owned(),
                });
            }
        };

        let mut message = Self::with_id(id);
        if let Some(streams) = object.remove(JSON_STREAMS_KEY) {
            let serde_json::Value::Array(streams) = streams else {
                return Err(MessageError::InvalidReservedField {
                    field: JSON_STREAMS_KEY.to_owned(),
                    reason: "must be an array of strings".to_owned(),
                });
            };
            for stream in streams {
                match stream {
                    serde_json::Value::String(s) => {
                        message.add_stream(s);
                    }
                    _ => {
                        return Err(MessageError::InvalidReservedField {
                            field: JSON_STREAMS_KEY.to_owned(),
                            reason: "must be an array of strings".to_owned(),
                        });
                    }
                }
            }
        }

        for (key, value) in object {
            message.set_field(key, Value::from(value));
        }
        Ok(message)
    }

    /// 메시지를 JSON 객체로 변환합니다 (`from_json`의 예약 키 포함).
    pub fn to_json(&self) -> serde_json::Value {
        let mut object = serde_json::Map::new();
        object.insert(
            JSON_ID_KEY.to_owned(),
            serde_json::Value::String(self.id.clone()),
        );
        object.insert(
            JSON_STREAMS_KEY.to_owned(),
            serde_json::Value::Array(
                self.streams
                    .iter()
                    .cloned()
                    .map(serde_json::Value::String)
                    .collect(),
            ),
        );
        for (key, value) in &self.fields {
            object.insert(key.clone(), value.to_json());
        }
        serde_json::Value::Object(object)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// 필드가 존재하고 Null이 아닌지 확인합니다.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.get(name).is_some_and(|v| !v.is_null())
    }

    /// 필드를 설정합니다. 빈 이름은 무시하고 `false`를 반환합니다.
    pub fn set_field(&mut self, name: impl Into<String>, value: Value) -> bool {
        let name = name.into();
        if name.is_empty() {
            return false;
        }
        self.fields.insert(name, value);
        true
    }

    /// 여러 필드를 한 번에 설정합니다.
    pub fn add_fields(&mut self, fields: BTreeMap<String, Value>) {
        for (name, value) in fields {
            self.set_field(name, value);
        }
    }

    pub fn remove_field(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    /// 필드 이름을 변경합니다. 원본 필드가 없으면 `false`를 반환합니다.
    pub fn rename_field(&mut self, old: &str, new: &str) -> bool {
        if old == new || new.is_empty() {
            return false;
        }
        match self.fields.remove(old) {
            Some(value) => {
                self.fields.insert(new.to_owned(), value);
                true
            }
            None => false,
        }
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    pub fn streams(&self) -> &BTreeSet<String> {
        &self.streams
    }

    /// 스트림을 추가합니다. 새로 추가된 경우 `true`를 반환합니다.
    pub fn add_stream(&mut self, stream_id: impl Into<String>) -> bool {
        self.streams.insert(stream_id.into())
    }

    pub fn remove_stream(&mut self, stream_id: &str) -> bool {
        self.streams.remove(stream_id)
    }

    pub fn in_stream(&self, stream_id: &str) -> bool {
        self.streams.contains(stream_id)
    }

    /// 드롭 표시 여부. 드롭된 메시지는 처리 후 전달되지 않습니다.
    pub fn filter_out(&self) -> bool {
        self.filter_out
    }

    pub fn set_filter_out(&mut self, filter_out: bool) {
        self.filter_out = filter_out;
    }

    /// 처리 에러를 `processing_error` 필드에 누적합니다.
    pub fn append_processing_error(&mut self, error: &str) {
        let combined = match self.fields.get(FIELD_PROCESSING_ERROR) {
            Some(Value::String(existing)) if !existing.is_empty() => {
                format!("{existing},{error}")
            }
            _ => error.to_owned(),
        };
        self.fields
            .insert(FIELD_PROCESSING_ERROR.to_owned(), Value::String(combined));
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self
            .fields
            .get(FIELD_MESSAGE)
            .map(Value::to_string)
            .unwrap_or_default();
        write!(f, "[{}] {}", self.id, text)
    }
}

fn json_kind(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// 평가 추적 항목
///
/// 추적 시작 이후 경과 시간(마이크로초)과 사람이 읽을 수 있는 설명을 담습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// 추적 시작 이후 경과 시간 (마이크로초)
    pub elapsed_us: u64,
    /// 결정 지점 설명
    pub message: String,
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>8}us  {}", self.elapsed_us, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_message_has_text_and_source_fields() {
        let msg = Message::new("hello", "web-01");
        assert_eq!(msg.field(FIELD_MESSAGE), Some(&Value::from("hello")));
        assert_eq!(msg.field(FIELD_SOURCE), Some(&Value::from("web-01")));
        assert!(!msg.id().is_empty());
        assert!(msg.streams().is_empty());
        assert!(!msg.filter_out());
    }

    #[test]
    fn has_field_ignores_null_values() {
        let mut msg = Message::with_id("m1");
        msg.set_field("present", Value::Null);
        assert!(!msg.has_field("present"));
        msg.set_field("present", Value::Long(1));
        assert!(msg.has_field("present"));
    }

    #[test]
    fn set_field_rejects_empty_name() {
        let mut msg = Message::with_id("m1");
        assert!(!msg.set_field("", Value::Long(1)));
        assert!(msg.fields().is_empty());
    }

    #[test]
    fn rename_field_moves_value() {
        let mut msg = Message::with_id("m1");
        msg.set_field("a", Value::from("x"));
        assert!(msg.rename_field("a", "b"));
        assert!(msg.field("a").is_none());
        assert_eq!(msg.field("b"), Some(&Value::from("x")));
        assert!(!msg.rename_field("missing", "c"));
    }

    #[test]
    fn processing_errors_accumulate() {
        let mut msg = Message::with_id("m1");
        msg.append_processing_error("For rule 'a': boom");
        msg.append_processing_error("For rule 'b': bang");
        assert_eq!(
            msg.field(FIELD_PROCESSING_ERROR),
            Some(&Value::from("For rule 'a': boom,For rule 'b': bang"))
        );
    }

    #[test]
    fn from_json_reads_reserved_keys() {
        let msg = Message::from_json(
            r#"{"_id": "abc", "_streams": ["s1", "s2"], "http_response_code": 200}"#,
        )
        .unwrap();
        assert_eq!(msg.id(), "abc");
        assert!(msg.in_stream("s1"));
        assert!(msg.in_stream("s2"));
        assert_eq!(msg.field("http_response_code"), Some(&Value::Long(200)));
        assert!(msg.field("_id").is_none());
    }

    #[test]
    fn from_json_rejects_non_object() {
        let err = Message::from_json("[1, 2]").unwrap_err();
        assert!(matches!(err, MessageError::NotAnObject { .. }));
    }

    #[test]
    fn from_json_rejects_bad_streams() {
        let err = Message::from_json(r#"{"_streams": "s1"}"#).unwrap_err();
        assert!(matches!(err, MessageError::InvalidReservedField { .. }));
    }

    #[test]
    fn to_json_includes_reserved_keys() {
        let mut msg = Message::with_id("m1");
        msg.add_stream("s1");
        msg.set_field("k", Value::Long(1));
        let json = msg.to_json();
        assert_eq!(json["_id"], "m1");
        assert_eq!(json["_streams"][0], "s1");
        assert_eq!(json["k"], 1);
    }

    #[test]
    fn trace_entry_display() {
        let entry = TraceEntry {
            elapsed_us: 12,
            message: "Starting message processing".to_owned(),
        };
        assert!(entry.to_string().contains("12us"));
    }
}
