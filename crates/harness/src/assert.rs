//! Shape and value assertions over decoded JSON.

use serde_json::{Map, Value};

use crate::error::ProbeError;
use crate::session::ApiResponse;

pub fn ensure(cond: bool, msg: impl Into<String>) -> Result<(), ProbeError> {
    if cond {
        Ok(())
    } else {
        Err(ProbeError::Assertion(msg.into()))
    }
}

pub fn as_object<'a>(value: &'a Value, ctx: &str) -> Result<&'a Map<String, Value>, ProbeError> {
    value
        .as_object()
        .ok_or_else(|| ProbeError::Shape(format!("{ctx}: expected object, got {}", kind(value))))
}

pub fn as_array<'a>(value: &'a Value, ctx: &str) -> Result<&'a Vec<Value>, ProbeError> {
    value
        .as_array()
        .ok_or_else(|| ProbeError::Shape(format!("{ctx}: expected array, got {}", kind(value))))
}

pub fn field<'a>(value: &'a Value, key: &str) -> Result<&'a Value, ProbeError> {
    value
        .get(key)
        .ok_or_else(|| ProbeError::Shape(format!("missing field `{key}`")))
}

pub fn require_fields(value: &Value, ctx: &str, fields: &[&str]) -> Result<(), ProbeError> {
    let obj = as_object(value, ctx)?;
    let missing: Vec<&str> = fields
        .iter()
        .copied()
        .filter(|f| !obj.contains_key(*f))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ProbeError::Shape(format!("{ctx}: missing fields {missing:?}")))
    }
}

/// Applies `require_fields` to the first element, if any.
pub fn require_first_item_fields(
    items: &[Value],
    ctx: &str,
    fields: &[&str],
) -> Result<(), ProbeError> {
    match items.first() {
        Some(first) => require_fields(first, ctx, fields),
        None => Ok(()),
    }
}

pub fn number(value: &Value, key: &str) -> Result<f64, ProbeError> {
    let v = field(value, key)?;
    v.as_f64()
        .ok_or_else(|| ProbeError::Shape(format!("`{key}` must be a number, got {}", kind(v))))
}

pub fn string<'a>(value: &'a Value, key: &str) -> Result<&'a str, ProbeError> {
    let v = field(value, key)?;
    v.as_str()
        .ok_or_else(|| ProbeError::Shape(format!("`{key}` must be a string, got {}", kind(v))))
}

pub fn boolean(value: &Value, key: &str) -> Result<bool, ProbeError> {
    let v = field(value, key)?;
    v.as_bool()
        .ok_or_else(|| ProbeError::Shape(format!("`{key}` must be a boolean, got {}", kind(v))))
}

pub fn ensure_eq_str(actual: &str, expected: &str, what: &str) -> Result<(), ProbeError> {
    ensure(
        actual == expected,
        format!("{what}: expected {expected:?}, got {actual:?}"),
    )
}

pub fn ensure_close(
    actual: f64,
    expected: f64,
    tolerance: f64,
    what: &str,
) -> Result<(), ProbeError> {
    ensure(
        (actual - expected).abs() < tolerance,
        format!("{what}: expected {expected}, got {actual} (tolerance {tolerance})"),
    )
}

pub fn ensure_money(actual: f64, expected: f64, what: &str) -> Result<(), ProbeError> {
    ensure_close(actual, expected, models::MONEY_EPSILON, what)
}

pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Requires the response `detail` to mention at least one of `needles`.
pub fn ensure_detail_mentions(resp: &ApiResponse, needles: &[&str]) -> Result<(), ProbeError> {
    let detail = resp.detail();
    ensure(
        needles.iter().any(|n| contains_ci(&detail, n)),
        format!(
            "{} {}: detail {detail:?} mentions none of {needles:?}",
            resp.method, resp.path
        ),
    )
}

pub fn string_list(value: &Value, ctx: &str) -> Result<Vec<String>, ProbeError> {
    as_array(value, ctx)?
        .iter()
        .map(|v| {
            v.as_str().map(str::to_owned).ok_or_else(|| {
                ProbeError::Shape(format!("{ctx}: expected string items, got {}", kind(v)))
            })
        })
        .collect()
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
