//! Runtime payload values.
//!
//! `Value` mirrors a JSON tree but can also hold the richer values produced by
//! inbound transforms (dates, binary data). Conversion from `serde_json::Value`
//! is lossless; conversion back renders date-times as RFC 3339, calendar dates
//! as `YYYY-MM-DD` and binary as base64.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};

/// A payload value as seen by the transform interpreter.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// JSON null
    #[default]
    Null,
    /// JSON boolean
    Bool(bool),
    /// JSON number, kept in its original representation
    Number(serde_json::Number),
    /// JSON string
    String(String),
    /// JSON array
    Array(Vec<Value>),
    /// JSON object, key order preserved
    Object(IndexMap<String, Value>),
    /// Parsed date-time
    Date(DateTime<FixedOffset>),
    /// Parsed calendar date
    Day(NaiveDate),
    /// Decoded binary data
    Binary(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Value::Date(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_day(&self) -> Option<NaiveDate> {
        match self {
            Value::Day(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(b) => Some(b),
            _ => None,
        }
    }

    /// Look up a field of an object value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// Short name of the value's shape, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Date(_) => "date-time",
            Value::Day(_) => "date",
            Value::Binary(_) => "binary",
        }
    }

    /// Render back to the wire representation.
    pub fn into_json(self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Number(n) => serde_json::Value::Number(n),
            Value::String(s) => serde_json::Value::String(s),
            Value::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(Value::into_json).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.into_iter().map(|(k, v)| (k, v.into_json())).collect(),
            ),
            Value::Date(d) => {
                serde_json::Value::String(d.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Value::Day(d) => serde_json::Value::String(d.to_string()),
            Value::Binary(bytes) => serde_json::Value::String(STANDARD.encode(bytes)),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        value.into_json()
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => items.serialize(serializer),
            Value::Object(map) => map.serialize(serializer),
            Value::Date(d) => {
                serializer.serialize_str(&d.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Value::Day(d) => serializer.collect_str(d),
            Value::Binary(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_from_json_preserves_key_order() {
        let value = Value::from(json!({ "zeta": 1, "alpha": 2, "mid": [true, null] }));
        let Value::Object(map) = &value else {
            panic!("expected object");
        };
        let keys: Vec<_> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert_eq!(value.into_json(), json!({ "zeta": 1, "alpha": 2, "mid": [true, null] }));
    }

    #[test]
    fn test_rich_values_render_to_wire() {
        let date = DateTime::parse_from_rfc3339("2020-01-01T00:00:00Z").unwrap();
        let value = Value::Array(vec![Value::Date(date), Value::Binary(b"hi".to_vec())]);
        assert_eq!(value.into_json(), json!(["2020-01-01T00:00:00Z", "aGk="]));
    }

    #[test]
    fn test_serialize_matches_into_json() {
        let date = DateTime::parse_from_rfc3339("2021-06-01T12:30:00+02:00").unwrap();
        let mut map = IndexMap::new();
        map.insert("at".to_string(), Value::Date(date));
        map.insert("n".to_string(), Value::Number(7_i64.into()));
        let day = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
        map.insert("on".to_string(), Value::Day(day));
        let value = Value::Object(map);

        let serialized = serde_json::to_value(&value).unwrap();
        assert_eq!(serialized, value.into_json());
        assert_eq!(serialized["at"], "2021-06-01T12:30:00+02:00");
        assert_eq!(serialized["on"], "2020-01-02");
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::from("x").type_name(), "string");
        assert_eq!(Value::Array(vec![]).type_name(), "array");
        assert_eq!(Value::Binary(vec![]).type_name(), "binary");
    }
}
