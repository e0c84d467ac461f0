//! CDP domain agents. One agent per protocol domain, wired at connect time
//! and dropped at disconnect.

pub mod console;
pub mod debugger;
pub mod runtime;
pub mod schema;

use crate::error::DebugError;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Decodes a request's params into the method's argument struct.
pub(crate) fn parse_args<T: DeserializeOwned>(params: Value) -> Result<T, DebugError> {
    serde_json::from_value(params)
        .map_err(|_| DebugError::InvalidArgument("malformed request parameters"))
}
