#![allow(dead_code)]

//! Test support: a scripted engine implementing the diagnostic interface,
//! plus single-threaded and two-thread session harnesses.

use jsdebug_debugger::{ProtocolChannel, ProtocolHandler};
use jsdebug_engine::{
    AsyncBreakHandle, BreakOnException, DebugEventKind, DiagnosticEngine, EngineError,
    EngineErrorCode, EngineResult, EventSink, RawValue, StepType,
};
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

struct BreakFlag(AtomicBool);

impl AsyncBreakHandle for BreakFlag {
    fn request_async_break(&self) -> EngineResult<()> {
        self.0.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct ScriptEntry {
    id: i64,
    url: String,
    source: String,
}

#[derive(Clone)]
struct BreakpointEntry {
    id: i64,
    script_id: i64,
    line: i64,
    column: i64,
}

#[derive(Default)]
struct EngineState {
    sink: Option<Rc<dyn Fn(DebugEventKind, &Value)>>,
    started: bool,
    at_break: bool,
    scripts: Vec<ScriptEntry>,
    next_script_id: i64,
    breakpoints: Vec<BreakpointEntry>,
    next_breakpoint_id: i64,
    step: Option<StepType>,
    break_on_exception: Option<BreakOnException>,
    frames: Vec<Value>,
    eval_results: HashMap<String, Result<Value, EngineError>>,
    global_values: HashMap<String, RawValue>,
    global_errors: HashMap<String, Value>,
    parse_errors: HashMap<String, Value>,
    stack_properties: HashMap<i64, Value>,
    objects: HashMap<i64, Value>,
    object_properties: HashMap<i64, Value>,
}

/// A scripted stand-in for the engine: tests drive it statement by
/// statement and stub the evaluation surface.
pub struct FakeEngine {
    break_requested: Arc<BreakFlag>,
    state: RefCell<EngineState>,
}

impl FakeEngine {
    pub fn new() -> FakeEngine {
        let mut state = EngineState::default();
        state.next_script_id = 1;
        state.next_breakpoint_id = 1;
        FakeEngine {
            break_requested: Arc::new(BreakFlag(AtomicBool::new(false))),
            state: RefCell::new(state),
        }
    }

    /// Registers a script without firing a source event, as if it loaded
    /// before the debugger attached.
    pub fn preload_script(&self, url: &str, source: &str) -> i64 {
        let mut state = self.state.borrow_mut();
        let id = state.next_script_id;
        state.next_script_id += 1;
        state.scripts.push(ScriptEntry {
            id,
            url: url.to_string(),
            source: source.to_string(),
        });
        id
    }

    /// Compiles a script, firing the source event.
    pub fn load_script(&self, url: &str, source: &str) -> i64 {
        let id = self.preload_script(url, source);
        let metadata = self.script_metadata(id);
        self.fire(DebugEventKind::SourceCompile, &metadata);
        id
    }

    /// A script that fails to compile.
    pub fn fail_script(&self, url: &str, source: &str) -> i64 {
        let id = self.preload_script(url, source);
        let metadata = self.script_metadata(id);
        self.fire(DebugEventKind::CompileError, &metadata);
        id
    }

    /// Executes one statement: honors a pending async break request, then
    /// breakpoints, then an armed step.
    pub fn run_statement(&self, script_id: i64, line: i64) {
        self.set_current_frame(script_id, line);

        if self.break_requested.0.swap(false, Ordering::SeqCst) {
            self.fire_break(DebugEventKind::AsyncBreak, json!({}));
            self.set_current_frame(script_id, line);
        }

        let hit = self.state.borrow().breakpoints.iter().find_map(|bp| {
            (bp.script_id == script_id && bp.line == line).then_some(bp.id)
        });
        if let Some(breakpoint_id) = hit {
            self.fire_break(
                DebugEventKind::Breakpoint,
                json!({
                    "breakpointId": breakpoint_id,
                    "scriptId": script_id,
                    "line": line,
                    "column": 0,
                }),
            );
            return;
        }

        let stepped = self.state.borrow_mut().step.take().is_some();
        if stepped {
            self.fire_break(
                DebugEventKind::StepComplete,
                json!({ "scriptId": script_id, "line": line, "column": 0 }),
            );
        }
    }

    pub fn run_statements(&self, script_id: i64, lines: &[i64]) {
        for line in lines {
            self.run_statement(script_id, *line);
        }
    }

    /// Throws an uncaught exception at the given location.
    pub fn throw_uncaught(&self, script_id: i64, line: i64, exception: Value) {
        self.set_current_frame(script_id, line);
        let fires = !matches!(
            self.state.borrow().break_on_exception,
            None | Some(BreakOnException::None)
        );
        if fires {
            self.fire_break(
                DebugEventKind::RuntimeException,
                json!({
                    "scriptId": script_id,
                    "line": line,
                    "column": 0,
                    "exception": exception,
                    "uncaught": true,
                }),
            );
        }
    }

    pub fn stub_eval(&self, expression: &str, descriptor: Value) {
        self.state
            .borrow_mut()
            .eval_results
            .insert(expression.to_string(), Ok(descriptor));
    }

    pub fn stub_eval_exception(&self, expression: &str, exception: Value) {
        self.state.borrow_mut().eval_results.insert(
            expression.to_string(),
            Err(EngineError::with_data(
                EngineErrorCode::ScriptException,
                "evaluation threw",
                exception,
            )),
        );
    }

    pub fn stub_global(&self, expression: &str, value: RawValue) {
        self.state
            .borrow_mut()
            .global_values
            .insert(expression.to_string(), value);
    }

    pub fn stub_global_error(&self, expression: &str, error: Value) {
        self.state
            .borrow_mut()
            .global_errors
            .insert(expression.to_string(), error);
    }

    pub fn stub_parse_error(&self, source: &str, metadata: Value) {
        self.state
            .borrow_mut()
            .parse_errors
            .insert(source.to_string(), metadata);
    }

    pub fn stub_stack_properties(&self, ordinal: i64, properties: Value) {
        self.state
            .borrow_mut()
            .stack_properties
            .insert(ordinal, properties);
    }

    pub fn stub_object(&self, handle: i64, object: Value, properties: Value) {
        let mut state = self.state.borrow_mut();
        state.objects.insert(handle, object);
        state.object_properties.insert(handle, properties);
    }

    pub fn breakpoint_count(&self) -> usize {
        self.state.borrow().breakpoints.len()
    }

    pub fn break_on_exception_mode(&self) -> Option<BreakOnException> {
        self.state.borrow().break_on_exception
    }

    fn script_metadata(&self, script_id: i64) -> Value {
        let state = self.state.borrow();
        let script = state
            .scripts
            .iter()
            .find(|script| script.id == script_id)
            .expect("unknown script");
        json!({
            "scriptId": script.id,
            "url": script.url,
            "startLine": 0,
            "startColumn": 0,
            "endLine": script.source.lines().count() as i64,
            "endColumn": 0,
        })
    }

    fn set_current_frame(&self, script_id: i64, line: i64) {
        self.state.borrow_mut().frames = vec![json!({
            "index": 0,
            "scriptId": script_id,
            "line": line,
            "column": 0,
            "functionName": "global",
        })];
    }

    fn fire(&self, kind: DebugEventKind, data: &Value) {
        let sink = self.state.borrow().sink.clone();
        if let Some(sink) = sink {
            sink(kind, data);
        }
    }

    fn fire_break(&self, kind: DebugEventKind, data: Value) {
        self.state.borrow_mut().at_break = true;
        self.fire(kind, &data);
        self.state.borrow_mut().at_break = false;
    }

    fn require_break(&self) -> EngineResult<()> {
        if self.state.borrow().at_break {
            Ok(())
        } else {
            Err(EngineError::not_at_break())
        }
    }
}

fn escape_expression(expression: &str) -> String {
    expression.replace('\\', "\\\\").replace('"', "\\\"")
}

fn raw_to_json(value: &RawValue) -> Value {
    match value {
        RawValue::Undefined | RawValue::Null => Value::Null,
        RawValue::Boolean(b) => json!(b),
        RawValue::Number(n) => json!(n),
        RawValue::String(s) => json!(s),
        RawValue::Object(v) | RawValue::Array(v) | RawValue::Error(v) => v.clone(),
        _ => Value::Null,
    }
}

impl DiagnosticEngine for FakeEngine {
    fn start_debugging(&self, sink: EventSink) -> EngineResult<()> {
        let mut state = self.state.borrow_mut();
        state.sink = Some(Rc::from(sink));
        state.started = true;
        Ok(())
    }

    fn stop_debugging(&self) -> EngineResult<()> {
        let mut state = self.state.borrow_mut();
        state.sink = None;
        state.started = false;
        Ok(())
    }

    fn break_handle(&self) -> Arc<dyn AsyncBreakHandle> {
        self.break_requested.clone()
    }

    fn scripts(&self) -> EngineResult<Value> {
        let ids: Vec<i64> = self.state.borrow().scripts.iter().map(|s| s.id).collect();
        Ok(Value::Array(
            ids.into_iter().map(|id| self.script_metadata(id)).collect(),
        ))
    }

    fn source(&self, script_id: i64) -> EngineResult<Value> {
        let state = self.state.borrow();
        state
            .scripts
            .iter()
            .find(|script| script.id == script_id)
            .map(|script| json!({ "scriptId": script.id, "source": script.source }))
            .ok_or_else(|| EngineError::new(EngineErrorCode::InvalidArgument, "unknown script"))
    }

    fn stack_trace(&self) -> EngineResult<Value> {
        self.require_break()?;
        Ok(Value::Array(self.state.borrow().frames.clone()))
    }

    fn stack_properties(&self, frame_ordinal: i64) -> EngineResult<Value> {
        self.state
            .borrow()
            .stack_properties
            .get(&frame_ordinal)
            .cloned()
            .ok_or_else(|| EngineError::new(EngineErrorCode::InvalidArgument, "unknown frame"))
    }

    fn object_from_handle(&self, handle: i64) -> EngineResult<Value> {
        self.state
            .borrow()
            .objects
            .get(&handle)
            .cloned()
            .ok_or_else(|| EngineError::new(EngineErrorCode::InvalidArgument, "unknown handle"))
    }

    fn object_properties(&self, handle: i64) -> EngineResult<Value> {
        self.state
            .borrow()
            .object_properties
            .get(&handle)
            .cloned()
            .ok_or_else(|| EngineError::new(EngineErrorCode::InvalidArgument, "unknown handle"))
    }

    fn set_breakpoint(&self, script_id: i64, line: i64, column: i64) -> EngineResult<Value> {
        let mut state = self.state.borrow_mut();
        if !state.scripts.iter().any(|script| script.id == script_id) {
            return Err(EngineError::new(
                EngineErrorCode::InvalidArgument,
                "unknown script",
            ));
        }

        // Re-requesting a covered location yields the existing breakpoint.
        if let Some(existing) = state
            .breakpoints
            .iter()
            .find(|bp| bp.script_id == script_id && bp.line == line && bp.column == column)
        {
            return Ok(json!({
                "breakpointId": existing.id,
                "line": existing.line,
                "column": existing.column,
            }));
        }

        let id = state.next_breakpoint_id;
        state.next_breakpoint_id += 1;
        state.breakpoints.push(BreakpointEntry {
            id,
            script_id,
            line,
            column,
        });
        Ok(json!({ "breakpointId": id, "line": line, "column": column }))
    }

    fn remove_breakpoint(&self, breakpoint_id: i64) -> EngineResult<()> {
        let mut state = self.state.borrow_mut();
        let before = state.breakpoints.len();
        state.breakpoints.retain(|bp| bp.id != breakpoint_id);
        if state.breakpoints.len() == before {
            return Err(EngineError::new(
                EngineErrorCode::InvalidArgument,
                "unknown breakpoint",
            ));
        }
        Ok(())
    }

    fn breakpoints(&self) -> EngineResult<Value> {
        Ok(Value::Array(
            self.state
                .borrow()
                .breakpoints
                .iter()
                .map(|bp| {
                    json!({
                        "breakpointId": bp.id,
                        "scriptId": bp.script_id,
                        "line": bp.line,
                        "column": bp.column,
                    })
                })
                .collect(),
        ))
    }

    fn set_step_type(&self, step: StepType) -> EngineResult<()> {
        self.require_break()?;
        self.state.borrow_mut().step = Some(step);
        Ok(())
    }

    fn break_on_exception(&self) -> EngineResult<BreakOnException> {
        Ok(self
            .state
            .borrow()
            .break_on_exception
            .unwrap_or(BreakOnException::None))
    }

    fn set_break_on_exception(&self, mode: BreakOnException) -> EngineResult<()> {
        self.state.borrow_mut().break_on_exception = Some(mode);
        Ok(())
    }

    fn evaluate(&self, expression: &str, _frame_ordinal: i64) -> EngineResult<Value> {
        self.require_break()?;
        match self.state.borrow().eval_results.get(expression) {
            Some(result) => result.clone(),
            None => Err(EngineError::new(
                EngineErrorCode::Internal,
                format!("no scripted evaluation for {:?}", expression),
            )),
        }
    }

    fn run_script(&self, source: &str, _source_name: &str) -> EngineResult<RawValue> {
        let state = self.state.borrow();

        for (expression, error) in &state.global_errors {
            let needle = format!("eval(\"{}\")", escape_expression(expression));
            if source.contains(&needle) {
                return Ok(RawValue::Object(json!({ "error": error })));
            }
        }
        for (expression, value) in &state.global_values {
            let needle = format!("eval(\"{}\")", escape_expression(expression));
            if source.contains(&needle) {
                return Ok(RawValue::Object(json!({ "value": raw_to_json(value) })));
            }
        }

        Err(EngineError::new(
            EngineErrorCode::ScriptCompile,
            format!("no scripted global evaluation for {:?}", source),
        ))
    }

    fn parse_script(&self, source: &str, _source_name: &str) -> EngineResult<()> {
        match self.state.borrow().parse_errors.get(source) {
            Some(metadata) => Err(EngineError::with_data(
                EngineErrorCode::ScriptCompile,
                "script parse failed",
                metadata.clone(),
            )),
            None => Ok(()),
        }
    }
}

/// Single-threaded harness: the test thread plays both transport and engine,
/// pumping the queue explicitly. Only usable for flows that never pause.
pub struct LocalSession {
    pub engine: Rc<FakeEngine>,
    pub handler: Rc<ProtocolHandler<FakeEngine>>,
    pub channel: ProtocolChannel,
    messages: Arc<Mutex<Vec<String>>>,
    next_id: Cell<i64>,
}

impl LocalSession {
    pub fn connect(break_on_first_line: bool) -> LocalSession {
        let _ = env_logger::try_init();

        let engine = Rc::new(FakeEngine::new());
        let handler = ProtocolHandler::new(engine.clone()).expect("handler construction");
        let channel = handler.channel();
        let messages: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        let sink = messages.clone();
        channel
            .connect(break_on_first_line, move |frame| {
                sink.lock().unwrap().push(frame.to_string());
            })
            .expect("connect");
        handler.process_command_queue();

        LocalSession {
            engine,
            handler,
            channel,
            messages,
            next_id: Cell::new(1),
        }
    }

    /// Sends a CDP command and pumps the queue.
    pub fn send(&self, method: &str, params: Value) -> i64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let frame = json!({ "id": id, "method": method, "params": params }).to_string();
        self.channel.send_command(&frame).expect("send_command");
        self.handler.process_command_queue();
        id
    }

    /// Sends a command and returns its response frame.
    pub fn request(&self, method: &str, params: Value) -> Value {
        let id = self.send(method, params);
        self.response(id)
            .unwrap_or_else(|| panic!("no response for {} (id {})", method, id))
    }

    pub fn host_request(&self, request: &str) {
        self.channel.send_request(request).expect("send_request");
        self.handler.process_command_queue();
    }

    pub fn frames(&self) -> Vec<Value> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|frame| serde_json::from_str(frame).expect("frame is JSON"))
            .collect()
    }

    pub fn response(&self, id: i64) -> Option<Value> {
        self.frames()
            .into_iter()
            .find(|frame| frame.get("id").and_then(Value::as_i64) == Some(id))
    }

    pub fn notifications(&self, method: &str) -> Vec<Value> {
        self.frames()
            .into_iter()
            .filter(|frame| frame.get("method").and_then(Value::as_str) == Some(method))
            .collect()
    }
}

/// Two-thread harness: the engine lives on a spawned thread running
/// `script`; the test thread acts as the transport.
pub struct TestClient {
    pub channel: ProtocolChannel,
    messages: mpsc::Receiver<String>,
    next_id: Cell<i64>,
}

impl TestClient {
    pub fn send(&self, method: &str, params: Value) -> i64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let frame = json!({ "id": id, "method": method, "params": params }).to_string();
        self.channel.send_command(&frame).expect("send_command");
        id
    }

    /// Waits for the first frame matching the predicate, skipping others.
    pub fn expect<F: Fn(&Value) -> bool>(&self, what: &str, matches: F) -> Value {
        let mut seen = Vec::new();
        loop {
            match self.messages.recv_timeout(RECV_TIMEOUT) {
                Ok(frame) => {
                    let frame: Value = serde_json::from_str(&frame).expect("frame is JSON");
                    if matches(&frame) {
                        return frame;
                    }
                    seen.push(frame);
                }
                Err(_) => panic!("timed out waiting for {}; saw {:?}", what, seen),
            }
        }
    }

    pub fn expect_response(&self, id: i64) -> Value {
        self.expect(&format!("response {}", id), |frame| {
            frame.get("id").and_then(Value::as_i64) == Some(id)
        })
    }

    pub fn expect_notification(&self, method: &str) -> Value {
        self.expect(method, |frame| {
            frame.get("method").and_then(Value::as_str) == Some(method)
        })
    }

    /// Asserts that no queued frame carries the given method.
    pub fn assert_not_notified(&self, method: &str) {
        while let Ok(frame) = self.messages.recv_timeout(Duration::from_millis(200)) {
            let frame: Value = serde_json::from_str(&frame).expect("frame is JSON");
            assert_ne!(
                frame.get("method").and_then(Value::as_str),
                Some(method),
                "unexpected {} notification: {}",
                method,
                frame
            );
        }
    }
}

pub fn run_session<F>(break_on_first_line: bool, script: F) -> (TestClient, thread::JoinHandle<()>)
where
    F: FnOnce(&FakeEngine, &ProtocolHandler<FakeEngine>) + Send + 'static,
{
    let _ = env_logger::try_init();

    let (channel_tx, channel_rx) = mpsc::channel();
    let engine_thread = thread::spawn(move || {
        let engine = Rc::new(FakeEngine::new());
        let handler = ProtocolHandler::new(engine.clone()).expect("handler construction");
        channel_tx.send(handler.channel()).expect("hand off channel");
        script(&engine, &handler);
    });

    let channel = channel_rx.recv().expect("receive channel");
    let (message_tx, message_rx) = mpsc::channel::<String>();
    let message_tx = Mutex::new(message_tx);
    channel
        .connect(break_on_first_line, move |frame| {
            let _ = message_tx.lock().unwrap().send(frame.to_string());
        })
        .expect("connect");

    (
        TestClient {
            channel,
            messages: message_rx,
            next_id: Cell::new(1),
        },
        engine_thread,
    )
}
