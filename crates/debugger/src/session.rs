use crate::breakpoint::Breakpoint;
use crate::error::DebugError;
use crate::script::ScriptRecord;
use jsdebug_engine::{
    AsyncBreakHandle, BreakOnException, DiagnosticEngine, EngineResult, EventSink, RawValue,
    StepType,
};
use serde_json::Value;
use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

/// Owns the engine debugging session and adapts the raw diagnostic data into
/// the handler's types. Stopping is best-effort: teardown must not fail.
pub struct Session<E: DiagnosticEngine> {
    engine: Rc<E>,
    break_handle: Arc<dyn AsyncBreakHandle>,
    started: Cell<bool>,
}

impl<E: DiagnosticEngine> Session<E> {
    pub fn new(engine: Rc<E>) -> Session<E> {
        let break_handle = engine.break_handle();
        Session {
            engine,
            break_handle,
            started: Cell::new(false),
        }
    }

    pub fn start(&self, sink: EventSink) -> Result<(), DebugError> {
        self.engine.start_debugging(sink)?;
        self.started.set(true);
        Ok(())
    }

    pub fn break_handle(&self) -> Arc<dyn AsyncBreakHandle> {
        self.break_handle.clone()
    }

    pub fn request_async_break(&self) -> Result<(), DebugError> {
        self.break_handle.request_async_break()?;
        Ok(())
    }

    /// Enumerates the engine's loaded scripts. Failures collapse into an
    /// empty list; the scripts will still arrive through source events.
    pub fn scripts(&self) -> Vec<ScriptRecord> {
        match self.engine.scripts() {
            Ok(Value::Array(items)) => items.iter().map(ScriptRecord::from_metadata).collect(),
            Ok(_) => Vec::new(),
            Err(err) => {
                log::warn!("script enumeration failed: {}", err);
                Vec::new()
            }
        }
    }

    pub fn script_source(&self, script_id: i64) -> Result<String, DebugError> {
        let value = self.engine.source(script_id)?;
        Ok(value
            .get("source")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string())
    }

    pub fn stack_trace(&self) -> Result<Vec<Value>, DebugError> {
        match self.engine.stack_trace()? {
            Value::Array(frames) => Ok(frames),
            _ => Ok(Vec::new()),
        }
    }

    pub fn stack_properties(&self, frame_ordinal: i64) -> Result<Value, DebugError> {
        Ok(self.engine.stack_properties(frame_ordinal)?)
    }

    pub fn object_from_handle(&self, handle: i64) -> Result<Value, DebugError> {
        Ok(self.engine.object_from_handle(handle)?)
    }

    pub fn object_properties(&self, handle: i64) -> Result<Value, DebugError> {
        Ok(self.engine.object_properties(handle)?)
    }

    /// Asks the engine to place the breakpoint and records the engine's id
    /// and chosen location back into the record.
    pub fn resolve_breakpoint(&self, breakpoint: &mut Breakpoint) -> Result<(), DebugError> {
        let script_id: i64 = match breakpoint.script_id() {
            Some(id) => id
                .parse()
                .map_err(|_| DebugError::InvalidArgument("script id is not numeric"))?,
            None => return Err(DebugError::ScriptMustBeLoaded),
        };

        let resolved = self.engine.set_breakpoint(
            script_id,
            breakpoint.line_number(),
            breakpoint.column_number(),
        )?;

        breakpoint.on_resolved(
            resolved
                .get("breakpointId")
                .and_then(Value::as_i64)
                .unwrap_or(-1),
            resolved.get("line").and_then(Value::as_i64).unwrap_or(-1),
            resolved.get("column").and_then(Value::as_i64).unwrap_or(-1),
        );
        Ok(())
    }

    /// Best-effort removal, mirroring teardown paths that must not fail.
    pub fn remove_breakpoint(&self, breakpoint_id: i64) {
        if let Err(err) = self.engine.remove_breakpoint(breakpoint_id) {
            log::debug!("breakpoint {} removal failed: {}", breakpoint_id, err);
        }
    }

    /// Removes every breakpoint the engine still knows about.
    pub fn clear_breakpoints(&self) {
        match self.engine.breakpoints() {
            Ok(Value::Array(breakpoints)) => {
                for breakpoint in breakpoints {
                    if let Some(id) = breakpoint.get("breakpointId").and_then(Value::as_i64) {
                        self.remove_breakpoint(id);
                    }
                }
            }
            Ok(_) => {}
            Err(err) => log::debug!("breakpoint enumeration failed: {}", err),
        }
    }

    /// Arms a step, tolerating "not at break" (stepping while running is a
    /// benign race with the frontend).
    pub fn set_step_type_ignoring_not_at_break(&self, step: StepType) -> Result<(), DebugError> {
        match self.engine.set_step_type(step) {
            Ok(()) => Ok(()),
            Err(err) if err.is_not_at_break() => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn break_on_exception(&self) -> Result<BreakOnException, DebugError> {
        Ok(self.engine.break_on_exception()?)
    }

    pub fn set_break_on_exception(&self, mode: BreakOnException) -> Result<(), DebugError> {
        Ok(self.engine.set_break_on_exception(mode)?)
    }

    /// Raw frame evaluation; callers filter the engine's error codes.
    pub fn evaluate(&self, expression: &str, frame_ordinal: i64) -> EngineResult<Value> {
        self.engine.evaluate(expression, frame_ordinal)
    }

    pub fn run_script(&self, source: &str, source_name: &str) -> EngineResult<RawValue> {
        self.engine.run_script(source, source_name)
    }

    pub fn parse_script(&self, source: &str, source_name: &str) -> EngineResult<()> {
        self.engine.parse_script(source, source_name)
    }
}

impl<E: DiagnosticEngine> Drop for Session<E> {
    fn drop(&mut self) {
        if self.started.get() {
            if let Err(err) = self.engine.stop_debugging() {
                log::debug!("stop debugging failed: {}", err);
            }
        }
    }
}
