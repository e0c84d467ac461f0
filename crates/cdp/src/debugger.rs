//! Debugger domain types.
//! <https://chromedevtools.github.io/devtools-protocol/tot/Debugger/>

use crate::runtime::RemoteObject;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type BreakpointId = String;
pub type CallFrameId = String;

/// <https://chromedevtools.github.io/devtools-protocol/tot/Debugger/#type-Location>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub script_id: String,
    pub line_number: i64,
    #[serde(default)]
    pub column_number: i64,
}

/// <https://chromedevtools.github.io/devtools-protocol/tot/Debugger/#type-Scope>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    #[serde(rename = "type")]
    pub kind: String,
    pub object: RemoteObject,
}

/// <https://chromedevtools.github.io/devtools-protocol/tot/Debugger/#type-CallFrame>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFrame {
    pub call_frame_id: CallFrameId,
    pub function_name: String,
    pub location: Location,
    pub scope_chain: Vec<Scope>,
    pub this: RemoteObject,
}

/// <https://chromedevtools.github.io/devtools-protocol/tot/Debugger/#method-setBreakpointByUrl>
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpointByUrlArgs {
    pub line_number: i64,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub url_regex: Option<String>,
    #[serde(default)]
    pub column_number: Option<i64>,
    #[serde(default)]
    pub condition: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpointByUrlResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakpoint_id: Option<BreakpointId>,
    pub locations: Vec<Location>,
}

/// <https://chromedevtools.github.io/devtools-protocol/tot/Debugger/#method-setBreakpoint>
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpointArgs {
    pub location: Location,
    #[serde(default)]
    pub condition: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpointResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakpoint_id: Option<BreakpointId>,
    pub actual_location: Location,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveBreakpointArgs {
    pub breakpoint_id: BreakpointId,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetScriptSourceArgs {
    pub script_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetScriptSourceResult {
    pub script_source: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPauseOnExceptionsArgs {
    pub state: String,
}

/// <https://chromedevtools.github.io/devtools-protocol/tot/Debugger/#method-evaluateOnCallFrame>
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateOnCallFrameArgs {
    pub call_frame_id: CallFrameId,
    pub expression: String,
    #[serde(default)]
    pub return_by_value: Option<bool>,
}

/// Params of the `Debugger.scriptParsed` / `Debugger.scriptFailedToParse`
/// notifications.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptParsedParams {
    pub script_id: String,
    pub url: String,
    pub start_line: i64,
    pub start_column: i64,
    pub end_line: i64,
    pub end_column: i64,
    pub execution_context_id: i64,
    pub hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_context_aux_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_live_edit: Option<bool>,
    #[serde(rename = "sourceMapURL", skip_serializing_if = "Option::is_none")]
    pub source_map_url: Option<String>,
    #[serde(rename = "hasSourceURL", skip_serializing_if = "Option::is_none")]
    pub has_source_url: Option<bool>,
}

/// Params of the `Debugger.paused` notification.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PausedParams {
    pub call_frames: Vec<CallFrame>,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hit_breakpoints: Option<Vec<BreakpointId>>,
}

/// Params of the `Debugger.breakpointResolved` notification.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointResolvedParams {
    pub breakpoint_id: BreakpointId,
    pub location: Location,
}
