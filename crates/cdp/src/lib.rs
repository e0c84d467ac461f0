//! Chrome DevTools Protocol types and message envelopes.
//!
//! A hand-written subset of the protocol, covering the Runtime, Debugger and
//! Schema domains as far as the handler implements them.
//! <https://chromedevtools.github.io/devtools-protocol/tot/>

pub mod debugger;
pub mod runtime;
pub mod schema;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// JSON-RPC server error code used for all protocol-level failures.
const SERVER_ERROR: i64 = -32000;

/// An incoming CDP request frame: `{"id": N, "method": "Domain.name",
/// "params": {...}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    pub id: i64,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl Request {
    pub fn parse(raw: &str) -> Result<Request, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Splits `"Debugger.enable"` into `("Debugger", "enable")`.
    pub fn domain_and_method(&self) -> (&str, &str) {
        match self.method.split_once('.') {
            Some((domain, method)) => (domain, method),
            None => ("", self.method.as_str()),
        }
    }
}

/// Outcome of dispatching a request to a domain agent.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Ok(Value),
    Error(String),
}

impl Response {
    pub fn ok<T: Serialize>(result: T) -> Response {
        match serde_json::to_value(result) {
            Ok(value) => Response::Ok(value),
            Err(err) => Response::Error(err.to_string()),
        }
    }

    /// A success response with an empty result object.
    pub fn empty() -> Response {
        Response::Ok(Value::Object(Default::default()))
    }

    pub fn error(message: impl Into<String>) -> Response {
        Response::Error(message.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error(_))
    }

    /// Serializes into the wire frame answering the given request id.
    pub fn into_message(self, id: i64) -> String {
        let frame = match self {
            Response::Ok(result) => json!({ "id": id, "result": result }),
            Response::Error(message) => json!({
                "id": id,
                "error": { "code": SERVER_ERROR, "message": message },
            }),
        };
        frame.to_string()
    }
}

/// Serializes a notification frame: `{"method": ..., "params": {...}}`.
pub fn notification<T: Serialize>(method: &str, params: T) -> String {
    json!({ "method": method, "params": params }).to_string()
}
