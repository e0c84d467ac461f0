//! Abstract diagnostic surface of the debuggee JavaScript engine.
//!
//! The protocol handler never links against a concrete engine. It consumes
//! the [`DiagnosticEngine`] trait, which mirrors the C-style diagnostic API
//! of an embeddable engine: start/stop a debugging session, enumerate
//! scripts, place breakpoints, walk the stack at a break, and evaluate
//! expressions. Diagnostic data crosses the trait as `serde_json::Value`
//! shaped like the engine's own diagnostic objects (see the module docs on
//! each accessor), which keeps the handler independent of any engine's value
//! representation.
//!
//! Threading contract: every method of [`DiagnosticEngine`] must be called
//! on the engine thread. The single exception is the asynchronous break
//! request, which is split onto [`AsyncBreakHandle`] and may be invoked from
//! any thread.

mod error;
mod event;
mod value;

pub use error::{EngineError, EngineErrorCode, EngineResult};
pub use event::{BreakOnException, DebugEventKind, StepType};
pub use value::RawValue;

use serde_json::Value;
use std::sync::Arc;

/// Callback through which the engine delivers debug events.
///
/// Invoked on the engine thread only, with the event kind and the engine's
/// event data object (script metadata for source events, break information
/// for break events).
pub type EventSink = Box<dyn Fn(DebugEventKind, &Value)>;

/// Thread-safe handle for requesting an asynchronous break.
///
/// The engine promises to pause at the earliest safe point after a request
/// and deliver an [`DebugEventKind::AsyncBreak`] event. The engine considers
/// a pending request satisfied by *any* subsequent debug event.
pub trait AsyncBreakHandle: Send + Sync {
    fn request_async_break(&self) -> EngineResult<()>;
}

/// The engine's diagnostic capability set.
///
/// Data shapes, following the engine's diagnostic objects:
///
/// - script metadata: `{scriptId, url, startLine, startColumn, endLine,
///   endColumn, executionContextId?, hash?, executionContextAuxData?,
///   isLiveEdit?, sourceMappingUrl?, hasSourceUrl?}`
/// - source text: `{scriptId, source}`
/// - stack frame: `{index, scriptId, line, column, functionName?}`
/// - value descriptor: `{name?, type, className?, value?, display?, handle?}`
/// - stack properties: `{locals: [descriptor, ...], globals: descriptor}`
///   where the globals descriptor carries a `handle`
/// - object properties: `{properties: [descriptor, ...],
///   internalProperties: [descriptor, ...]}`
/// - breakpoint: `{breakpointId, scriptId?, line, column}`
/// - parse failure metadata (in [`EngineError::data`]): `{line, column,
///   message, exception?}`
pub trait DiagnosticEngine: 'static {
    /// Starts a debugging session and registers the event sink.
    fn start_debugging(&self, sink: EventSink) -> EngineResult<()>;

    /// Ends the debugging session. Callers tearing down swallow the error.
    fn stop_debugging(&self) -> EngineResult<()>;

    /// Returns the thread-safe async-break requester for this engine.
    fn break_handle(&self) -> Arc<dyn AsyncBreakHandle>;

    /// Enumerates all scripts loaded so far, as an array of script metadata.
    fn scripts(&self) -> EngineResult<Value>;

    /// Fetches the source text of a script.
    fn source(&self, script_id: i64) -> EngineResult<Value>;

    /// Returns the current stack trace as an array of frame objects.
    /// Fails with `NotAtBreak` while the engine is running.
    fn stack_trace(&self) -> EngineResult<Value>;

    /// Returns the scope information of one call frame.
    fn stack_properties(&self, frame_ordinal: i64) -> EngineResult<Value>;

    /// Resolves an object handle into a value descriptor.
    fn object_from_handle(&self, handle: i64) -> EngineResult<Value>;

    /// Returns the property descriptors of the object behind a handle.
    fn object_properties(&self, handle: i64) -> EngineResult<Value>;

    /// Places a breakpoint; the engine may move it to the nearest executable
    /// location and returns the breakpoint it actually created. Requesting a
    /// location already covered by an existing breakpoint yields that
    /// existing breakpoint.
    fn set_breakpoint(&self, script_id: i64, line: i64, column: i64) -> EngineResult<Value>;

    fn remove_breakpoint(&self, breakpoint_id: i64) -> EngineResult<()>;

    /// Enumerates breakpoints currently known to the engine.
    fn breakpoints(&self) -> EngineResult<Value>;

    /// Arms the next step. Fails with `NotAtBreak` while running.
    fn set_step_type(&self, step: StepType) -> EngineResult<()>;

    fn break_on_exception(&self) -> EngineResult<BreakOnException>;

    fn set_break_on_exception(&self, mode: BreakOnException) -> EngineResult<()>;

    /// Evaluates an expression in a call frame, returning a value
    /// descriptor. Fails with `NotAtBreak` while running, or with
    /// `ScriptException`/`ScriptCompile` carrying the exception descriptor.
    fn evaluate(&self, expression: &str, frame_ordinal: i64) -> EngineResult<Value>;

    /// Parses and runs a script at global scope, returning the raw result
    /// value.
    fn run_script(&self, source: &str, source_name: &str) -> EngineResult<RawValue>;

    /// Parses a script without running it. A parse failure carries the
    /// failure metadata in [`EngineError::data`].
    fn parse_script(&self, source: &str, source_name: &str) -> EngineResult<()>;
}
