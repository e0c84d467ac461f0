use crate::error::DebugError;
use crate::script::ScriptRecord;
use crate::session::Session;
use jsdebug_engine::{DebugEventKind, DiagnosticEngine, EngineResult, StepType};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Decision produced by a break handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipPauseRequest {
    NoSkip,
    Continue,
    StepFrame,
    StepInto,
    StepOut,
}

/// Break event data as delivered by the engine.
#[derive(Debug)]
pub struct BreakInfo {
    pub kind: DebugEventKind,
    pub data: Value,
}

impl BreakInfo {
    /// The engine breakpoint id that was hit, or -1.
    pub fn hit_breakpoint(&self) -> i64 {
        self.data
            .get("breakpointId")
            .and_then(Value::as_i64)
            .unwrap_or(-1)
    }

    pub fn reason(&self) -> &'static str {
        if self.kind == DebugEventKind::RuntimeException {
            "exception"
        } else {
            "other"
        }
    }

    pub fn exception(&self) -> Option<&Value> {
        self.data.get("exception")
    }
}

/// Receives the core's fanned-out engine events. Installed by the Debugger
/// agent while enabled.
pub trait DebugEventObserver {
    fn source_event(&self, metadata: &Value, success: bool);
    fn break_event(&self, info: &BreakInfo) -> SkipPauseRequest;
    fn resume_event(&self);
}

/// The protocol handler's services as seen from the core and the agents.
pub trait MessagePump {
    fn process_command_queue(&self);
    fn process_deferred_go(&self);
    /// Synchronous pump that returns once execution resumes.
    fn wait_for_debugger(&self);
    /// Releases the nested pump and marks startup as running.
    fn continue_run(&self);
    fn run_if_waiting_for_debugger(&self);
}

/// Pause/step state machine over one engine session.
pub struct DebuggerCore<E: DiagnosticEngine> {
    session: Session<E>,
    pump: RefCell<Option<Weak<dyn MessagePump>>>,
    observer: RefCell<Option<Weak<dyn DebugEventObserver>>>,
    enabled: Cell<bool>,
    paused: Cell<bool>,
    running_nested_loop: Cell<bool>,
    should_pause_on_next_statement: Cell<bool>,
}

impl<E: DiagnosticEngine> DebuggerCore<E> {
    pub fn new(session: Session<E>) -> DebuggerCore<E> {
        DebuggerCore {
            session,
            pump: RefCell::new(None),
            observer: RefCell::new(None),
            enabled: Cell::new(false),
            paused: Cell::new(false),
            running_nested_loop: Cell::new(false),
            should_pause_on_next_statement: Cell::new(false),
        }
    }

    pub fn session(&self) -> &Session<E> {
        &self.session
    }

    pub(crate) fn attach_pump(&self, pump: Weak<dyn MessagePump>) {
        *self.pump.borrow_mut() = Some(pump);
    }

    /// Starts the engine session, routing debug events into the core.
    pub fn start(core: &Rc<DebuggerCore<E>>) -> Result<(), DebugError> {
        let weak = Rc::downgrade(core);
        core.session.start(Box::new(move |kind, data| {
            if let Some(core) = weak.upgrade() {
                core.handle_debug_event(kind, data);
            }
        }))
    }

    pub fn set_observer(&self, observer: Weak<dyn DebugEventObserver>) {
        *self.observer.borrow_mut() = Some(observer);
    }

    pub fn clear_observer(&self) {
        *self.observer.borrow_mut() = None;
    }

    pub fn enable(&self) {
        if !self.enabled.get() {
            self.enabled.set(true);
        }
    }

    pub fn disable(&self) {
        if self.enabled.get() {
            self.enabled.set(false);
            self.session.clear_breakpoints();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.get()
    }

    pub fn pause_on_next_statement(&self) -> Result<(), DebugError> {
        self.should_pause_on_next_statement.set(true);
        self.session.request_async_break()
    }

    pub fn step(&self, step: StepType) -> Result<(), DebugError> {
        self.session.set_step_type_ignoring_not_at_break(step)?;
        self.continue_run();
        Ok(())
    }

    /// Releases the nested pump without touching the pause-on-next flag.
    pub fn continue_run(&self) {
        if let Some(pump) = self.pump() {
            pump.continue_run();
        }
    }

    /// Resumes and drops any pending pause-on-next request.
    pub fn go(&self) {
        self.should_pause_on_next_statement.set(false);
        self.continue_run();
    }

    pub fn scripts(&self) -> Vec<ScriptRecord> {
        self.session.scripts()
    }

    pub fn call_frame(&self, ordinal: i64) -> Result<Value, DebugError> {
        if ordinal < 0 {
            return Err(DebugError::InvalidOrdinal);
        }
        let mut frames = self.session.stack_trace()?;
        if (ordinal as usize) < frames.len() {
            Ok(frames.swap_remove(ordinal as usize))
        } else {
            Err(DebugError::InvalidOrdinal)
        }
    }

    pub fn call_frames(&self) -> Result<Vec<Value>, DebugError> {
        self.session.stack_trace()
    }

    pub fn evaluate_in_frame(&self, expression: &str, ordinal: i64) -> EngineResult<Value> {
        self.session.evaluate(expression, ordinal)
    }

    /// Entry point for every engine debug event.
    pub fn handle_debug_event(&self, kind: DebugEventKind, data: &Value) {
        log::trace!("debug event {:?}", kind);

        // Drain whatever the transport enqueued before the engine re-entered.
        if let Some(pump) = self.pump() {
            pump.process_command_queue();
        }

        if !self.enabled.get() {
            return;
        }

        match kind {
            DebugEventKind::SourceCompile | DebugEventKind::CompileError => {
                if let Some(observer) = self.observer() {
                    observer.source_event(data, kind == DebugEventKind::SourceCompile);
                }
                // The engine considers a pending break request satisfied by
                // any debug event, so re-arm it.
                if self.should_pause_on_next_statement.get() {
                    if let Err(err) = self.session.request_async_break() {
                        log::warn!("async break re-request failed: {}", err);
                    }
                }
            }
            DebugEventKind::Breakpoint
            | DebugEventKind::StepComplete
            | DebugEventKind::DebuggerStatement
            | DebugEventKind::RuntimeException => self.handle_break(kind, data),
            DebugEventKind::AsyncBreak => {
                if self.should_pause_on_next_statement.get() {
                    self.should_pause_on_next_statement.set(false);
                    self.handle_break(kind, data);
                }
            }
        }
    }

    fn handle_break(&self, kind: DebugEventKind, data: &Value) {
        if self.running_nested_loop.get() {
            // Don't allow reentrancy.
            return;
        }
        let observer = match self.observer() {
            Some(observer) => observer,
            None => return,
        };

        self.paused.set(true);

        let info = BreakInfo {
            kind,
            data: data.clone(),
        };
        let request = observer.break_event(&info);

        if request == SkipPauseRequest::NoSkip {
            self.running_nested_loop.set(true);
            if let Some(pump) = self.pump() {
                pump.process_deferred_go();
                pump.wait_for_debugger();
            }
            self.running_nested_loop.set(false);
        }

        self.paused.set(false);

        let step = match request {
            SkipPauseRequest::StepFrame | SkipPauseRequest::StepInto => Some(StepType::In),
            SkipPauseRequest::StepOut => Some(StepType::Out),
            _ => None,
        };
        if let Some(step) = step {
            if let Err(err) = self.session.set_step_type_ignoring_not_at_break(step) {
                log::warn!("failed to arm step after break: {}", err);
            }
        }

        observer.resume_event();
    }

    fn pump(&self) -> Option<Rc<dyn MessagePump>> {
        self.pump.borrow().as_ref().and_then(|pump| pump.upgrade())
    }

    fn observer(&self) -> Option<Rc<dyn DebugEventObserver>> {
        self.observer
            .borrow()
            .as_ref()
            .and_then(|observer| observer.upgrade())
    }
}
