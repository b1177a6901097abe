use crate::ast::LoonValue;
use indexmap::IndexMap;
use serde::Serialize;

// Largest magnitude at which every integer is exactly representable in an f64.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// A resolved value in a form serde can write out. Key order is preserved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    Null,
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
}

pub(crate) fn to_value(value: &LoonValue) -> Value {
    match value {
        LoonValue::String(s) => Value::String(s.clone()),
        LoonValue::Number(n) => number_to_value(*n),
        LoonValue::Boolean(b) => Value::Boolean(*b),
        LoonValue::Null => Value::Null,
        LoonValue::List(items) => Value::Array(items.iter().map(to_value).collect()),
        LoonValue::Mapping(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), to_value(value)))
                .collect(),
        ),
        // Placeholders are gone after resolution; an unresolved document writes them as null.
        LoonValue::UnresolvedRef(_) => Value::Null,
    }
}

/// Integral numbers are written as integers (`5`, not `5.0`).
fn number_to_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        Value::Integer(n as i64)
    } else {
        Value::Number(n)
    }
}
