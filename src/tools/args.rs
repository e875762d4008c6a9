//! Argument extraction for tool handlers.
//!
//! Optional arguments treat `null` the same as absent.

use serde_json::Value;

/// A required, non-empty string.
pub fn required_str<'a>(arguments: &'a Value, field: &str) -> Result<&'a str, String> {
    match arguments.get(field) {
        Some(Value::String(s)) if s.is_empty() => {
            Err(format!("Parameter '{field}' cannot be empty"))
        }
        Some(Value::String(s)) => Ok(s),
        None | Some(Value::Null) => Err(format!("Missing required parameter: {field}")),
        Some(_) => Err(format!("Parameter '{field}' must be a string")),
    }
}

/// An optional string, empty when absent.
pub fn optional_str<'a>(arguments: &'a Value, field: &str) -> Result<&'a str, String> {
    match arguments.get(field) {
        None | Some(Value::Null) => Ok(""),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(format!("Parameter '{field}' must be a string")),
    }
}

/// An optional boolean.
pub fn optional_bool(arguments: &Value, field: &str, default: bool) -> Result<bool, String> {
    match arguments.get(field) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(format!("Parameter '{field}' must be a boolean")),
    }
}

/// An optional non-negative integer.
pub fn optional_u64(arguments: &Value, field: &str, default: u64) -> Result<u64, String> {
    match arguments.get(field) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => value
            .as_u64()
            .ok_or_else(|| format!("Parameter '{field}' must be a non-negative integer")),
    }
}

/// A required message id, which Mail.app numbers from 1.
pub fn message_id(arguments: &Value, field: &str) -> Result<u64, String> {
    let Some(value) = arguments.get(field).filter(|v| !v.is_null()) else {
        return Err(format!("Missing required parameter: {field}"));
    };
    match value.as_u64() {
        Some(id) if id > 0 => Ok(id),
        _ => Err(format!("Parameter '{field}' must be a positive integer")),
    }
}

/// An optional list of strings, empty when absent.
pub fn string_list(arguments: &Value, field: &str) -> Result<Vec<String>, String> {
    let items = match arguments.get(field) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(format!("Parameter '{field}' must be an array of strings")),
    };

    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| format!("Parameter '{field}' must be an array of strings"))
        })
        .collect()
}

/// A mailbox path such as `["Inbox", "GitHub"]`, encoded as a JSON array.
pub fn mailbox_path(arguments: &Value, field: &str) -> Result<String, String> {
    if matches!(arguments.get(field), None | Some(Value::Null)) {
        return Err(format!("Missing required parameter: {field}"));
    }

    let path = string_list(arguments, field)?;
    if path.is_empty() {
        return Err(format!("Parameter '{field}' must name at least one mailbox"));
    }
    if path.iter().any(String::is_empty) {
        return Err(format!("Parameter '{field}' cannot contain empty names"));
    }

    Ok(encode_list(&path))
}

/// Encodes strings as a compact JSON array.
pub fn encode_list(items: &[String]) -> String {
    Value::from(items.to_vec()).to_string()
}

/// Encodes a boolean the way scripts compare it.
pub fn flag(value: bool) -> String {
    value.to_string()
}
