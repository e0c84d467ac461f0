use serde_json::Value;

/// A raw engine value surfaced through the diagnostic API, e.g. a console
/// argument or the result of a global evaluation.
///
/// Covers the engine's value taxonomy. The object and array payloads are
/// shallow JSON snapshots; deep introspection goes through object handles.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    Object(Value),
    Array(Value),
    Function,
    Error(Value),
    Symbol,
    ArrayBuffer,
    TypedArray,
    DataView,
}

impl RawValue {
    /// Classifies a plain JSON value. JSON cannot express `undefined`,
    /// functions, or the binary types; those never come out of this
    /// conversion.
    pub fn from_json(value: &Value) -> RawValue {
        match value {
            Value::Null => RawValue::Null,
            Value::Bool(b) => RawValue::Boolean(*b),
            Value::Number(n) => RawValue::Number(n.as_f64().unwrap_or(0.0)),
            Value::String(s) => RawValue::String(s.clone()),
            Value::Array(_) => RawValue::Array(value.clone()),
            Value::Object(_) => RawValue::Object(value.clone()),
        }
    }
}
