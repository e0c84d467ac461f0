use crate::agents::parse_args;
use crate::breakpoint::{Breakpoint, QueryKind};
use crate::channel::Frontend;
use crate::core::{BreakInfo, DebugEventObserver, DebuggerCore, SkipPauseRequest};
use crate::error::DebugError;
use crate::script::ScriptRecord;
use crate::wrap;
use jsdebug_cdp::debugger::{
    BreakpointResolvedParams, EvaluateOnCallFrameArgs, GetScriptSourceArgs,
    GetScriptSourceResult, PausedParams, RemoveBreakpointArgs, SetBreakpointArgs,
    SetBreakpointByUrlArgs, SetBreakpointByUrlResult, SetBreakpointResult,
    SetPauseOnExceptionsArgs,
};
use jsdebug_cdp::runtime::EvaluateResult;
use jsdebug_cdp::Response;
use jsdebug_engine::{BreakOnException, DiagnosticEngine, EngineErrorCode, StepType};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

const NOT_IMPLEMENTED: &str = "Not implemented";

/// The `Debugger` domain: script registry, breakpoint lifecycle, and the
/// pause/resume surface.
pub struct DebuggerAgent<E: DiagnosticEngine> {
    core: Rc<DebuggerCore<E>>,
    frontend: Frontend,
    weak_self: std::rc::Weak<DebuggerAgent<E>>,
    enabled: Cell<bool>,
    should_skip_all_pauses: Cell<bool>,
    scripts: RefCell<HashMap<String, ScriptRecord>>,
    breakpoints: RefCell<HashMap<String, Breakpoint>>,
}

impl<E: DiagnosticEngine> DebuggerAgent<E> {
    pub fn new(core: Rc<DebuggerCore<E>>, frontend: Frontend) -> Rc<DebuggerAgent<E>> {
        Rc::new_cyclic(|weak| DebuggerAgent {
            core,
            frontend,
            weak_self: weak.clone(),
            enabled: Cell::new(false),
            should_skip_all_pauses: Cell::new(false),
            scripts: RefCell::new(HashMap::new()),
            breakpoints: RefCell::new(HashMap::new()),
        })
    }

    pub fn dispatch(&self, method: &str, params: Value) -> Response {
        match method {
            "enable" => self.enable(),
            "disable" => self.disable(),
            "setBreakpointByUrl" => self.set_breakpoint_by_url(params),
            "setBreakpoint" => self.set_breakpoint(params),
            "removeBreakpoint" => self.remove_breakpoint(params),
            "stepOver" => self.step(StepType::Over),
            "stepInto" => self.step(StepType::In),
            "stepOut" => self.step(StepType::Out),
            "pause" => self.pause(),
            "resume" => self.resume(),
            "getScriptSource" => self.get_script_source(params),
            "setPauseOnExceptions" => self.set_pause_on_exceptions(params),
            "evaluateOnCallFrame" => self.evaluate_on_call_frame(params),
            // Known surface we deliberately do not implement.
            "setBreakpointsActive" | "setSkipAllPauses" | "continueToLocation"
            | "searchInContent" | "setScriptSource" | "restartFrame" | "setVariableValue"
            | "setAsyncCallStackDepth" | "setBlackboxPatterns" | "setBlackboxedRanges" => {
                Response::error(NOT_IMPLEMENTED)
            }
            _ => Response::error(NOT_IMPLEMENTED),
        }
    }

    fn enable(&self) -> Response {
        if self.enabled.get() {
            return Response::empty();
        }
        self.enabled.set(true);

        self.core.enable();
        let observer: std::rc::Weak<dyn DebugEventObserver> = self.weak_self.clone();
        self.core.set_observer(observer);

        // Replay every script the engine already loaded.
        for script in self.core.scripts() {
            self.register_script(script, true);
        }

        Response::empty()
    }

    fn disable(&self) -> Response {
        if !self.enabled.get() {
            return Response::empty();
        }
        self.enabled.set(false);

        self.core.disable();
        self.core.clear_observer();

        self.breakpoints.borrow_mut().clear();
        self.scripts.borrow_mut().clear();
        self.should_skip_all_pauses.set(false);

        Response::empty()
    }

    fn set_breakpoint_by_url(&self, params: Value) -> Response {
        let args: SetBreakpointByUrlArgs = match parse_args(params) {
            Ok(args) => args,
            Err(err) => return err.into(),
        };

        let (query, kind) = match (args.url, args.url_regex) {
            (Some(url), None) => (url, QueryKind::Url),
            (None, Some(url_regex)) => (url_regex, QueryKind::UrlRegex),
            _ => return DebugError::UrlRequired.into(),
        };

        let column_number = args.column_number.unwrap_or(0);
        if column_number < 0 {
            return DebugError::InvalidColumnNumber.into();
        }

        let mut breakpoint = Breakpoint::by_query(
            query,
            kind,
            args.line_number,
            column_number,
            args.condition.unwrap_or_default(),
        );

        let key = breakpoint.fingerprint();
        if self.breakpoints.borrow().contains_key(&key) {
            return DebugError::BreakpointExists.into();
        }

        let mut locations = Vec::new();
        {
            let scripts = self.scripts.borrow();
            for script in scripts.values() {
                if breakpoint.try_load_script(script) {
                    match self.try_resolve(&mut breakpoint) {
                        Ok(true) => locations.push(breakpoint.actual_location()),
                        Ok(false) => {}
                        Err(err) => return Response::error(err.to_string()),
                    }
                }
            }
        }

        // Resolution may have landed on an existing engine breakpoint, in
        // which case this request created nothing.
        let breakpoint_id = if self.actual_breakpoint_exists(&breakpoint) {
            None
        } else {
            self.breakpoints.borrow_mut().insert(key.clone(), breakpoint);
            Some(key)
        };

        Response::ok(SetBreakpointByUrlResult {
            breakpoint_id,
            locations,
        })
    }

    fn set_breakpoint(&self, params: Value) -> Response {
        let args: SetBreakpointArgs = match parse_args(params) {
            Ok(args) => args,
            Err(err) => return err.into(),
        };

        let mut breakpoint = Breakpoint::from_location(
            &args.location.script_id,
            args.location.line_number,
            args.location.column_number,
            args.condition.unwrap_or_default(),
        );

        let key = breakpoint.fingerprint();
        if self.breakpoints.borrow().contains_key(&key) {
            return DebugError::BreakpointExists.into();
        }

        match self.try_resolve(&mut breakpoint) {
            Ok(true) => {
                let actual_location = breakpoint.actual_location();
                let breakpoint_id = if self.actual_breakpoint_exists(&breakpoint) {
                    None
                } else {
                    self.breakpoints.borrow_mut().insert(key.clone(), breakpoint);
                    Some(key)
                };
                Response::ok(SetBreakpointResult {
                    breakpoint_id,
                    actual_location,
                })
            }
            Ok(false) | Err(_) => DebugError::BreakpointCouldNotResolve.into(),
        }
    }

    fn remove_breakpoint(&self, params: Value) -> Response {
        let args: RemoveBreakpointArgs = match parse_args(params) {
            Ok(args) => args,
            Err(err) => return err.into(),
        };

        match self.breakpoints.borrow_mut().remove(&args.breakpoint_id) {
            Some(breakpoint) => {
                if breakpoint.is_resolved() {
                    self.core.session().remove_breakpoint(breakpoint.actual_id());
                }
                Response::empty()
            }
            None => DebugError::BreakpointNotFound.into(),
        }
    }

    fn step(&self, step: StepType) -> Response {
        match self.core.step(step) {
            Ok(()) => Response::empty(),
            Err(err) => err.into(),
        }
    }

    fn pause(&self) -> Response {
        match self.core.pause_on_next_statement() {
            Ok(()) => Response::empty(),
            Err(err) => err.into(),
        }
    }

    fn resume(&self) -> Response {
        if !self.enabled.get() {
            return DebugError::NotEnabled.into();
        }
        self.core.continue_run();
        Response::empty()
    }

    fn get_script_source(&self, params: Value) -> Response {
        if !self.enabled.get() {
            return DebugError::NotEnabled.into();
        }
        let args: GetScriptSourceArgs = match parse_args(params) {
            Ok(args) => args,
            Err(err) => return err.into(),
        };

        let scripts = self.scripts.borrow();
        match scripts.get(&args.script_id) {
            Some(script) => match script.source(self.core.session()) {
                Ok(script_source) => Response::ok(GetScriptSourceResult { script_source }),
                Err(err) => err.into(),
            },
            None => DebugError::ScriptNotFound(args.script_id).into(),
        }
    }

    fn set_pause_on_exceptions(&self, params: Value) -> Response {
        let args: SetPauseOnExceptionsArgs = match parse_args(params) {
            Ok(args) => args,
            Err(err) => return err.into(),
        };

        let mode = match args.state.as_str() {
            "none" => BreakOnException::None,
            "all" => BreakOnException::FirstChance,
            "uncaught" => BreakOnException::Uncaught,
            other => return DebugError::UnrecognizedState(other.to_string()).into(),
        };

        match self.core.session().set_break_on_exception(mode) {
            Ok(()) => Response::empty(),
            Err(err) => err.into(),
        }
    }

    fn evaluate_on_call_frame(&self, params: Value) -> Response {
        let args: EvaluateOnCallFrameArgs = match parse_args(params) {
            Ok(args) => args,
            Err(err) => return err.into(),
        };

        let ordinal = match wrap::parse_object_id(&args.call_frame_id) {
            Ok(parsed) => match parsed.ordinal {
                Some(ordinal) => ordinal,
                None => return DebugError::InvalidCallFrameId.into(),
            },
            Err(_) => return DebugError::InvalidCallFrameId.into(),
        };

        if let Err(err) = self.core.call_frame(ordinal) {
            return err.into();
        }

        match self.core.evaluate_in_frame(&args.expression, ordinal) {
            Ok(descriptor) => match wrap::wrap_object(&descriptor) {
                Ok(result) => Response::ok(EvaluateResult {
                    result,
                    exception_details: None,
                }),
                Err(err) => err.into(),
            },
            Err(err)
                if matches!(
                    err.code,
                    EngineErrorCode::ScriptException | EngineErrorCode::ScriptCompile
                ) =>
            {
                match err.data.as_ref().and_then(|exception| {
                    let result = wrap::wrap_exception(exception).ok()?;
                    let details = wrap::wrap_exception_details(exception).ok()?;
                    Some((result, details))
                }) {
                    Some((result, details)) => Response::ok(EvaluateResult {
                        result,
                        exception_details: Some(details),
                    }),
                    None => DebugError::from(err).into(),
                }
            }
            Err(err) => DebugError::from(err).into(),
        }
    }

    /// Places the breakpoint in the engine if its script is loaded. Returns
    /// whether the breakpoint is now resolved.
    fn try_resolve(&self, breakpoint: &mut Breakpoint) -> Result<bool, DebugError> {
        if !breakpoint.is_script_loaded() {
            return Err(DebugError::ScriptMustBeLoaded);
        }
        self.core.session().resolve_breakpoint(breakpoint)?;
        Ok(breakpoint.is_resolved())
    }

    // The engine hands back an existing breakpoint when a new request lands
    // on an already-covered location after resolution, so a "new" breakpoint
    // has to be checked against the map once resolved.
    fn actual_breakpoint_exists(&self, breakpoint: &Breakpoint) -> bool {
        let breakpoints = self.breakpoints.borrow();
        breakpoints.values().any(|existing| {
            if breakpoint.is_resolved() {
                existing.actual_id() == breakpoint.actual_id()
            } else {
                existing.script_id() == breakpoint.script_id()
                    && existing.line_number() == breakpoint.line_number()
                    && existing.column_number() == breakpoint.column_number()
            }
        })
    }

    /// Emits the parse notification, records the script, and retries any
    /// pending breakpoints against it.
    fn register_script(&self, script: ScriptRecord, success: bool) {
        let mut params = script.parsed_params();
        if success {
            self.frontend
                .send_notification("Debugger.scriptParsed", &params);
        } else {
            // scriptFailedToParse carries the same fields minus liveEdit.
            params.is_live_edit = None;
            self.frontend
                .send_notification("Debugger.scriptFailedToParse", &params);
        }

        {
            let mut breakpoints = self.breakpoints.borrow_mut();
            for (key, breakpoint) in breakpoints.iter_mut() {
                if breakpoint.try_load_script(&script) {
                    match self.try_resolve(breakpoint) {
                        Ok(true) => self.frontend.send_notification(
                            "Debugger.breakpointResolved",
                            BreakpointResolvedParams {
                                breakpoint_id: key.clone(),
                                location: breakpoint.actual_location(),
                            },
                        ),
                        Ok(false) => {}
                        Err(err) => log::warn!("breakpoint resolution failed: {}", err),
                    }
                }
            }
        }

        self.scripts
            .borrow_mut()
            .insert(script.script_id().to_string(), script);
    }

    /// Applies a hit breakpoint's condition: the debugger stops only when
    /// the condition evaluates truthy.
    fn evaluate_condition(&self, breakpoint_id: i64) -> SkipPauseRequest {
        if breakpoint_id < 0 {
            return SkipPauseRequest::NoSkip;
        }

        let condition = {
            let breakpoints = self.breakpoints.borrow();
            match breakpoints
                .values()
                .find(|breakpoint| breakpoint.actual_id() == breakpoint_id)
            {
                Some(breakpoint) if !breakpoint.condition().is_empty() => {
                    breakpoint.condition().to_string()
                }
                _ => return SkipPauseRequest::NoSkip,
            }
        };

        match self.core.evaluate_in_frame(&condition, 0) {
            Ok(result) => {
                if result.get("value").map(wrap::is_truthy).unwrap_or(false) {
                    SkipPauseRequest::NoSkip
                } else {
                    SkipPauseRequest::Continue
                }
            }
            Err(err)
                if matches!(
                    err.code,
                    EngineErrorCode::ScriptException | EngineErrorCode::ScriptCompile
                ) =>
            {
                SkipPauseRequest::Continue
            }
            Err(err) => {
                // Infrastructure failure; pause rather than silently skip.
                log::warn!("condition evaluation failed: {}", err);
                SkipPauseRequest::NoSkip
            }
        }
    }

    fn hit_breakpoint_keys(&self, breakpoint_id: i64) -> Vec<String> {
        if breakpoint_id < 0 {
            return Vec::new();
        }
        let breakpoints = self.breakpoints.borrow();
        breakpoints
            .iter()
            .filter(|(_, breakpoint)| breakpoint.actual_id() == breakpoint_id)
            .map(|(key, _)| key.clone())
            .collect()
    }
}

impl<E: DiagnosticEngine> DebugEventObserver for DebuggerAgent<E> {
    fn source_event(&self, metadata: &Value, success: bool) {
        self.register_script(ScriptRecord::from_metadata(metadata), success);
    }

    fn break_event(&self, info: &BreakInfo) -> SkipPauseRequest {
        let request = if self.should_skip_all_pauses.get() {
            SkipPauseRequest::Continue
        } else {
            self.evaluate_condition(info.hit_breakpoint())
        };
        if request != SkipPauseRequest::NoSkip {
            return request;
        }

        let frames = match self.core.call_frames() {
            Ok(frames) => frames,
            Err(err) => {
                log::warn!("stack unavailable at break: {}", err);
                Vec::new()
            }
        };
        let call_frames = frames
            .iter()
            .enumerate()
            .filter_map(|(ordinal, frame)| {
                match wrap::wrap_call_frame(ordinal as i64, frame) {
                    Ok(call_frame) => Some(call_frame),
                    Err(err) => {
                        log::warn!("skipping unusable call frame: {}", err);
                        None
                    }
                }
            })
            .collect();

        let data = info
            .exception()
            .and_then(|exception| wrap::wrap_exception(exception).ok())
            .and_then(|remote| serde_json::to_value(remote).ok());

        let hit_breakpoints = self.hit_breakpoint_keys(info.hit_breakpoint());
        self.frontend.send_notification(
            "Debugger.paused",
            PausedParams {
                call_frames,
                reason: info.reason().to_string(),
                data,
                hit_breakpoints: if hit_breakpoints.is_empty() {
                    None
                } else {
                    Some(hit_breakpoints)
                },
            },
        );

        SkipPauseRequest::NoSkip
    }

    fn resume_event(&self) {
        self.frontend
            .send_notification("Debugger.resumed", serde_json::json!({}));
    }
}

impl<E: DiagnosticEngine> Drop for DebuggerAgent<E> {
    fn drop(&mut self) {
        let _ = self.disable();
    }
}
