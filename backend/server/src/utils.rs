use serde_json::Value;

/// Values the web client sends for "not filled in": `null`, `""`, `false` and `0`.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Array(_) | Value::Object(_) | Value::Bool(true) => false,
    }
}

pub fn is_present(value: Option<&Value>) -> bool {
    value.is_some_and(|v| !is_blank(v))
}
