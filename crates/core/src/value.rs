//! 값 모델 -- 규칙 언어가 다루는 런타임 값과 정적 타입
//!
//! [`Value`]는 닫힌 태그 집합입니다: 문자열, 정수(Long), 실수(Double), 불리언,
//! 리스트, 맵, Null. 모든 표현식은 정확히 하나의 `Value`로 평가되거나 실패합니다.
//!
//! [`ValueType`]은 타입 검사 단계에서 사용하는 정적 타입으로, 필드 접근처럼
//! 컴파일 시점에 알 수 없는 결과에는 `Any`를 사용합니다.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 런타임 값
///
/// 맵은 `BTreeMap`으로 유지하여 직렬화와 비교가 결정적입니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// 값 없음
    #[default]
    Null,
    /// 불리언
    Boolean(bool),
    /// 64비트 정수
    Long(i64),
    /// IEEE-754 배정밀도 실수
    Double(f64),
    /// UTF-8 문자열
    String(String),
    /// 순서 있는 리스트
    List(Vec<Value>),
    /// 문자열 키 맵
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// 값의 런타임 타입을 반환합니다.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Null => ValueType::Null,
            Self::Boolean(_) => ValueType::Boolean,
            Self::Long(_) => ValueType::Long,
            Self::Double(_) => ValueType::Double,
            Self::String(_) => ValueType::String,
            Self::List(_) => ValueType::List,
            Self::Map(_) => ValueType::Map,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Self::Long(n) => Some(*n),
            _ => None,
        }
    }

    /// 숫자 값을 f64로 반환합니다 (Long은 승격).
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Self::Long(n) => Some(*n as f64),
            Self::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// 언어 수준의 동등성 비교
    ///
    /// Long/Double 쌍은 f64로 승격해 비교합니다. List와 Map은 원소마다 같은 규칙으로
    /// 재귀 비교하므로 `[1] == [1.0]`도 참입니다. 서로 다른 타입은 같지 않습니다.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Long(a), Self::Double(b)) => (*a as f64) == *b,
            (Self::Double(a), Self::Long(b)) => *a == (*b as f64),
            (Self::List(a), Self::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equals(y))
            }
            (Self::Map(a), Self::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(key, x)| b.get(key).is_some_and(|y| x.equals(y)))
            }
            _ => self == other,
        }
    }

    /// 언어 수준의 순서 비교
    ///
    /// 숫자끼리(혼합 시 f64 승격) 또는 문자열끼리만 비교할 수 있습니다.
    /// NaN이 포함되거나 비교할 수 없는 조합이면 `None`을 반환합니다.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Self::Long(a), Self::Long(b)) => Some(a.cmp(b)),
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            _ => {
                let a = self.as_double()?;
                let b = other.as_double()?;
                a.partial_cmp(&b)
            }
        }
    }

    /// JSON 값으로 변환합니다. 유한하지 않은 실수는 `null`이 됩니다.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Boolean(b) => serde_json::Value::Bool(*b),
            Self::Long(n) => serde_json::Value::from(*n),
            Self::Double(d) => serde_json::Number::from_f64(*d)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Self::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Long(n) => write!(f, "{n}"),
            // Debug 형식은 정수 값 실수에도 ".0"을 유지합니다 (1.0 -> "1.0")
            Self::Double(d) => write!(f, "{d:?}"),
            Self::String(s) => write!(f, "{s}"),
            Self::List(_) | Self::Map(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Long(i),
                None => Self::Double(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Long(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Long(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Self::Double(d)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self::Map(map)
    }
}

/// 정적 타입
///
/// 타입 검사기가 각 AST 노드에 부여합니다. `Any`는 런타임까지 알 수 없는 타입입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Any,
    Null,
    Boolean,
    Long,
    Double,
    String,
    List,
    Map,
}

impl ValueType {
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Long | Self::Double)
    }

    /// 이 타입의 값을 `target` 타입 자리에 넘길 수 있는지 판정합니다.
    ///
    /// 같은 타입, 어느 한쪽이 `Any`, 또는 Long을 Double 자리에 넘기는 경우 허용합니다.
    pub fn is_assignable_to(self, target: ValueType) -> bool {
        self == target
            || self == Self::Any
            || target == Self::Any
            || (self == Self::Long && target == Self::Double)
    }

    /// 두 타입의 값이 `==`/`!=`로 비교 가능한지 판정합니다.
    pub fn is_comparable_with(self, other: ValueType) -> bool {
        self == other
            || self == Self::Any
            || other == Self::Any
            || (self.is_numeric() && other.is_numeric())
    }

    /// 런타임 값이 이 정적 타입을 만족하는지 판정합니다.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Any => true,
            Self::Double => matches!(value, Value::Double(_) | Value::Long(_)),
            other => value.value_type() == other,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Any => "any",
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Long => "long",
            Self::Double => "double",
            Self::String => "string",
            Self::List => "list",
            Self::Map => "map",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn mixed_numeric_equality_promotes_to_double() {
        assert!(Value::Long(2).equals(&Value::Double(2.0)));
        assert!(Value::Double(2.0).equals(&Value::Long(2)));
        assert!(!Value::Long(2).equals(&Value::Double(2.5)));
    }

    #[test]
    fn nested_collections_promote_mixed_numbers() {
        let longs = Value::List(vec![Value::Long(1), Value::List(vec![Value::Long(2)])]);
        let doubles = Value::List(vec![Value::Double(1.0), Value::List(vec![Value::Double(2.0)])]);
        assert!(longs.equals(&doubles));
        assert!(!longs.equals(&Value::List(vec![Value::Double(1.0)])));

        let map = |v: Value| Value::Map(BTreeMap::from([("a".to_owned(), v)]));
        assert!(map(Value::Long(1)).equals(&map(Value::Double(1.0))));
        assert!(!map(Value::Long(1)).equals(&map(Value::Double(1.5))));
        assert!(
            !map(Value::Long(1)).equals(&Value::Map(BTreeMap::from([(
                "b".to_owned(),
                Value::Double(1.0)
            )])))
        );
    }

    #[test]
    fn different_types_are_never_equal() {
        assert!(!Value::from("1").equals(&Value::Long(1)));
        assert!(!Value::Null.equals(&Value::Boolean(false)));
    }

    #[test]
    fn list_and_map_equality_is_structural() {
        let a = Value::List(vec![Value::Long(1), Value::from("x")]);
        let b = Value::List(vec![Value::Long(1), Value::from("x")]);
        assert!(a.equals(&b));

        let mut m1 = BTreeMap::new();
        m1.insert("k".to_owned(), Value::Boolean(true));
        let mut m2 = m1.clone();
        assert!(Value::Map(m1.clone()).equals(&Value::Map(m2.clone())));
        m2.insert("other".to_owned(), Value::Null);
        assert!(!Value::Map(m1).equals(&Value::Map(m2)));
    }

    #[test]
    fn compare_rejects_mixed_string_and_number() {
        assert_eq!(Value::from("a").compare(&Value::Long(1)), None);
        assert_eq!(
            Value::Long(1).compare(&Value::Double(1.5)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::from("b").compare(&Value::from("a")),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn compare_with_nan_is_unordered() {
        assert_eq!(Value::Double(f64::NAN).compare(&Value::Long(1)), None);
    }

    #[test]
    fn display_keeps_double_fraction() {
        assert_eq!(Value::Double(1.0).to_string(), "1.0");
        assert_eq!(Value::Long(42).to_string(), "42");
        assert_eq!(Value::from("text").to_string(), "text");
    }

    #[test]
    fn json_conversion_prefers_long_for_integers() {
        let json: serde_json::Value = serde_json::json!({"a": 1, "b": 1.5, "c": [true, null]});
        let value = Value::from(json);
        let map = value.as_map().unwrap();
        assert_eq!(map["a"], Value::Long(1));
        assert_eq!(map["b"], Value::Double(1.5));
        assert_eq!(
            map["c"],
            Value::List(vec![Value::Boolean(true), Value::Null])
        );
    }

    #[test]
    fn assignability_rules() {
        assert!(ValueType::Long.is_assignable_to(ValueType::Double));
        assert!(!ValueType::Double.is_assignable_to(ValueType::Long));
        assert!(ValueType::Any.is_assignable_to(ValueType::String));
        assert!(ValueType::Map.is_assignable_to(ValueType::Any));
        assert!(!ValueType::String.is_assignable_to(ValueType::Long));
    }

    #[test]
    fn double_type_accepts_long_values() {
        assert!(ValueType::Double.accepts(&Value::Long(3)));
        assert!(!ValueType::Long.accepts(&Value::Double(3.0)));
    }

    proptest! {
        #[test]
        fn equality_is_reflexive_for_longs(n in any::<i64>()) {
            prop_assert!(Value::Long(n).equals(&Value::Long(n)));
        }

        #[test]
        fn mixed_equality_is_symmetric(n in -1_000_000i64..1_000_000, d in -1.0e6f64..1.0e6) {
            let a = Value::Long(n);
            let b = Value::Double(d);
            prop_assert_eq!(a.equals(&b), b.equals(&a));
        }

        #[test]
        fn string_compare_matches_str_ordering(a in ".{0,8}", b in ".{0,8}") {
            let ord = Value::from(a.as_str()).compare(&Value::from(b.as_str()));
            prop_assert_eq!(ord, Some(a.cmp(&b)));
        }
    }
}
