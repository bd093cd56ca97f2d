//! Accessors over `serde_json::Value` that map absent optional fields to their
//! unset value and absent required fields to [`ParseError::MissingField`].

use serde_json::{Map, Value};
use tsingress_core::HashTable;

use crate::ParseError;

pub(crate) fn object<'a>(v: &'a Value, field: &'static str) -> Result<&'a Map<String, Value>, ParseError> {
    v.as_object().ok_or(ParseError::NotAnObject(field))
}

/// Optional string; absent or null yields `""`.
pub(crate) fn opt_str(v: &Value, key: &str, field: &'static str) -> Result<String, ParseError> {
    match v.get(key) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(ParseError::invalid(field, format!("expected a string, found {other}"))),
    }
}

pub(crate) fn req_str(v: &Value, key: &str, field: &'static str) -> Result<String, ParseError> {
    match v.get(key) {
        None | Some(Value::Null) => Err(ParseError::MissingField(field)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(ParseError::invalid(field, format!("expected a string, found {other}"))),
    }
}

/// Optional array; absent or null yields an empty slice.
pub(crate) fn array<'a>(v: &'a Value, key: &str, field: &'static str) -> Result<&'a [Value], ParseError> {
    match v.get(key) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(ParseError::invalid(field, "expected an array")),
    }
}

/// Optional string-to-string object, sized to its entry count.
pub(crate) fn string_map(v: &Value, key: &str, field: &'static str) -> Result<HashTable<String>, ParseError> {
    let map = match v.get(key) {
        None | Some(Value::Null) => return Ok(HashTable::new(1)),
        Some(m) => object(m, field)?,
    };
    let mut table = HashTable::new(map.len());
    for (k, v) in map {
        let s = v
            .as_str()
            .ok_or_else(|| ParseError::invalid(field, format!("value of {k:?} is not a string")))?;
        table.insert(k, s.to_string());
    }
    Ok(table)
}

pub(crate) fn port(v: &Value, field: &'static str) -> Result<u16, ParseError> {
    v.as_u64()
        .and_then(|n| u16::try_from(n).ok())
        .ok_or_else(|| ParseError::invalid(field, format!("{v} is not a port number")))
}

/// Optional port number; absent yields 0.
pub(crate) fn opt_port(v: &Value, key: &str, field: &'static str) -> Result<u16, ParseError> {
    match v.get(key) {
        None | Some(Value::Null) => Ok(0),
        Some(p) => port(p, field),
    }
}
