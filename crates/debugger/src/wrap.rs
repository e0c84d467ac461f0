//! Conversion of engine diagnostic values into CDP shapes.

use crate::error::DebugError;
use jsdebug_cdp::debugger::{CallFrame, Location, Scope};
use jsdebug_cdp::runtime::{
    ExceptionDetails, InternalPropertyDescriptor, PropertyDescriptor, RemoteObject,
};
use jsdebug_engine::RawValue;
use serde::Deserialize;
use serde_json::{json, Value};

/// Display strings are capped at this length, ellipsis included.
const DISPLAY_MAX: usize = 200;

/// Engine property attribute bit marking a read-only property.
const PROPERTY_READ_ONLY: i64 = 0x4;

const DEFAULT_EXCEPTION_TEXT: &str = "Uncaught";

/// Forms the handle flavor of an object id: `{"handle":N}`.
pub fn object_id_for_handle(handle: i64) -> String {
    json!({ "handle": handle }).to_string()
}

/// Forms the scope flavor of an object id:
/// `{"ordinal":N,"name":"locals"|"globals"}`.
pub fn scope_object_id(ordinal: i64, name: &str) -> String {
    json!({ "ordinal": ordinal, "name": name }).to_string()
}

/// The two recognized object-id payloads, decoded field-wise. The Runtime
/// agent decides which flavor applies.
#[derive(Debug, Default, Deserialize)]
pub struct ParsedObjectId {
    pub handle: Option<i64>,
    pub ordinal: Option<i64>,
    pub name: Option<String>,
}

pub fn parse_object_id(object_id: &str) -> Result<ParsedObjectId, DebugError> {
    let value: Value =
        serde_json::from_str(object_id).map_err(|_| DebugError::InvalidObjectId)?;
    if !value.is_object() {
        return Err(DebugError::InvalidObjectId);
    }
    serde_json::from_value(value).map_err(|_| DebugError::InvalidObjectId)
}

/// The canonical RemoteObject for `undefined`.
pub fn undefined_remote() -> RemoteObject {
    RemoteObject {
        kind: "undefined".to_string(),
        ..Default::default()
    }
}

/// Converts an engine primitive into a protocol value. Object and array
/// contents are not carried over yet.
pub fn to_protocol_value(value: &Value) -> Value {
    match value {
        Value::Null | Value::Number(_) | Value::String(_) | Value::Bool(_) => value.clone(),
        // TODO: populate the object's properties
        Value::Object(_) => json!({}),
        // TODO: populate the list's elements
        Value::Array(_) => json!([]),
    }
}

/// Wraps an engine value descriptor (an object carrying `type` and
/// optionally `className`, `value`, `display`, `handle`) into a
/// RemoteObject.
pub fn wrap_object(descriptor: &Value) -> Result<RemoteObject, DebugError> {
    let kind = match descriptor.get("type") {
        None | Some(Value::Null) => return Ok(undefined_remote()),
        Some(Value::String(kind)) => kind.clone(),
        Some(_) => {
            return Err(DebugError::InvalidArgument(
                "descriptor 'type' is not a string",
            ))
        }
    };

    let mut remote = RemoteObject {
        kind,
        ..Default::default()
    };

    if let Some(class_name) = descriptor.get("className").and_then(Value::as_str) {
        remote.class_name = Some(class_name.to_string());
    }

    let value = descriptor.get("value");
    if let Some(value) = value {
        remote.value = Some(to_protocol_value(value));
    }

    // A description is required for values to be shown in the debugger.
    let description = match descriptor.get("display").and_then(Value::as_str) {
        Some(display) => display.to_string(),
        None => match value {
            Some(value) => string_convert(value),
            None => return Err(DebugError::InvalidArgument("no display string found")),
        },
    };
    remote.description = Some(description);

    if let Some(handle) = descriptor.get("handle").and_then(Value::as_i64) {
        remote.object_id = Some(object_id_for_handle(handle));
    }

    Ok(remote)
}

/// Wraps a raw engine value by synthesizing a descriptor for it.
pub fn wrap_value(value: &RawValue) -> Result<RemoteObject, DebugError> {
    let (kind, display, json_value) = match value {
        RawValue::Undefined => ("undefined", "undefined".to_string(), Value::Null),
        RawValue::Null => ("null", "null".to_string(), Value::Null),
        RawValue::Boolean(b) => ("boolean", b.to_string(), json!(b)),
        RawValue::Number(n) => ("number", format!("{:.8}", n), json!(n)),
        RawValue::String(s) => ("string", truncate_display(s), json!(s)),
        RawValue::Object(v) => ("object", "{...}".to_string(), v.clone()),
        RawValue::Array(v) => ("array", "[...]".to_string(), v.clone()),
        RawValue::Function => ("function", "f() {...}".to_string(), Value::Null),
        RawValue::Error(_)
        | RawValue::Symbol
        | RawValue::ArrayBuffer
        | RawValue::TypedArray
        | RawValue::DataView => {
            return Err(DebugError::InvalidArgument(
                "cannot wrap this value type",
            ))
        }
    };

    wrap_object(&json!({
        "name": "[value]",
        "type": kind,
        "display": display,
        "value": json_value,
    }))
}

/// Wraps an exception descriptor, marking it as an error.
pub fn wrap_exception(exception: &Value) -> Result<RemoteObject, DebugError> {
    let mut wrapped = wrap_object(exception)?;
    wrapped.subtype = Some("error".to_string());
    Ok(wrapped)
}

pub fn wrap_exception_details(exception: &Value) -> Result<ExceptionDetails, DebugError> {
    let handle = exception.get("handle").and_then(Value::as_i64).unwrap_or(0);
    let text = exception
        .get("display")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    Ok(ExceptionDetails {
        exception_id: handle,
        text: if text.is_empty() {
            DEFAULT_EXCEPTION_TEXT.to_string()
        } else {
            text
        },
        line_number: 0,
        column_number: 0,
        script_id: None,
        url: None,
        exception: Some(wrap_exception(exception)?),
    })
}

/// Wraps an engine property descriptor.
pub fn wrap_property(property: &Value) -> Result<PropertyDescriptor, DebugError> {
    let name = property
        .get("name")
        .and_then(Value::as_str)
        .ok_or(DebugError::InvalidArgument("property descriptor has no name"))?
        .to_string();
    let attributes = property
        .get("propertyAttributes")
        .and_then(Value::as_i64)
        .unwrap_or(0);

    Ok(PropertyDescriptor {
        name,
        value: Some(wrap_object(property)?),
        writable: attributes & PROPERTY_READ_ONLY == 0,
        configurable: true,
        enumerable: true,
    })
}

pub fn wrap_internal_property(
    property: &Value,
) -> Result<InternalPropertyDescriptor, DebugError> {
    let name = property
        .get("name")
        .and_then(Value::as_str)
        .ok_or(DebugError::InvalidArgument("property descriptor has no name"))?
        .to_string();

    Ok(InternalPropertyDescriptor {
        name,
        value: Some(wrap_object(property)?),
    })
}

/// Converts an engine location value into a protocol location.
pub fn wrap_location(location: &Value) -> Location {
    Location {
        script_id: id_string(location.get("scriptId")),
        line_number: location.get("line").and_then(Value::as_i64).unwrap_or(0),
        column_number: location.get("column").and_then(Value::as_i64).unwrap_or(0),
    }
}

/// Converts an engine stack frame into a protocol call frame. Scope objects
/// are addressed through the ordinal flavor of object ids; the frame's
/// `this` is not surfaced by the engine's stack walk.
pub fn wrap_call_frame(ordinal: i64, frame: &Value) -> Result<CallFrame, DebugError> {
    let scope = |kind: &str, name: &str| Scope {
        kind: kind.to_string(),
        object: RemoteObject {
            kind: "object".to_string(),
            class_name: Some("Object".to_string()),
            description: Some("Object".to_string()),
            object_id: Some(scope_object_id(ordinal, name)),
            ..Default::default()
        },
    };

    Ok(CallFrame {
        call_frame_id: json!({ "ordinal": ordinal }).to_string(),
        function_name: frame
            .get("functionName")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        location: wrap_location(frame),
        scope_chain: vec![scope("local", "locals"), scope("global", "globals")],
        this: undefined_remote(),
    })
}

/// JS-style truthiness over diagnostic values.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|n| n != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Object(_) | Value::Array(_) => true,
    }
}

fn id_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(n) => n.to_string(),
            None => n.to_string(),
        },
        _ => String::new(),
    }
}

/// JS-style string conversion, used when a descriptor has a value but no
/// display string.
fn string_convert(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_i64() {
            Some(n) => n.to_string(),
            None => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn truncate_display(s: &str) -> String {
    let cap = DISPLAY_MAX - 4;
    if s.chars().count() <= cap {
        s.to_string()
    } else {
        let mut truncated: String = s.chars().take(cap).collect();
        truncated.push_str("...");
        truncated
    }
}
