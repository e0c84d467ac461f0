use crate::agents::console::ConsoleAgent;
use crate::agents::debugger::DebuggerAgent;
use crate::agents::runtime::RuntimeAgent;
use crate::agents::schema::SchemaAgent;
use crate::channel::{ChannelShared, Command, Frontend, ProtocolChannel, StartupState};
use crate::core::{DebuggerCore, MessagePump};
use crate::error::DebugError;
use crate::session::Session;
use jsdebug_cdp::{Request, Response};
use jsdebug_engine::{DiagnosticEngine, RawValue, StepType};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::Arc;

const NOT_IMPLEMENTED: &str = "Not implemented";

struct Agents<E: DiagnosticEngine> {
    console: Rc<ConsoleAgent>,
    debugger: Rc<DebuggerAgent<E>>,
    runtime: Rc<RuntimeAgent<E>>,
    schema: Rc<SchemaAgent>,
}

/// The engine-thread side of the bridge: drains the command queue, routes
/// CDP requests to the domain agents, and runs the nested pump while the
/// engine is paused.
///
/// The handler is deliberately not `Send`; the transport talks to it through
/// [`ProtocolChannel`].
pub struct ProtocolHandler<E: DiagnosticEngine> {
    shared: Arc<ChannelShared>,
    frontend: Frontend,
    core: Rc<DebuggerCore<E>>,
    agents: RefCell<Option<Agents<E>>>,
    weak_self: Weak<ProtocolHandler<E>>,
    is_connected: Cell<bool>,
    waiting_for_debugger: Cell<bool>,
    deferred_go: Cell<bool>,
    processing: Cell<bool>,
}

impl<E: DiagnosticEngine> ProtocolHandler<E> {
    /// Builds a handler over an engine and starts its debugging session.
    pub fn new(engine: Rc<E>) -> Result<Rc<ProtocolHandler<E>>, DebugError> {
        let shared = ChannelShared::new();
        let core = Rc::new(DebuggerCore::new(Session::new(engine)));

        let handler = Rc::new_cyclic(|weak: &Weak<ProtocolHandler<E>>| ProtocolHandler {
            shared: shared.clone(),
            frontend: Frontend::new(shared.clone()),
            core: core.clone(),
            agents: RefCell::new(None),
            weak_self: weak.clone(),
            is_connected: Cell::new(false),
            waiting_for_debugger: Cell::new(false),
            deferred_go: Cell::new(false),
            processing: Cell::new(false),
        });

        let pump: Weak<dyn MessagePump> = handler.weak_self.clone();
        core.attach_pump(pump);
        DebuggerCore::start(&core)?;

        Ok(handler)
    }

    /// The transport-side handle for this handler.
    pub fn channel(&self) -> ProtocolChannel {
        ProtocolChannel::new(self.shared.clone(), self.core.session().break_handle())
    }

    pub fn is_connected(&self) -> bool {
        self.is_connected.get()
    }

    /// Blocks the engine thread in the pump until a frontend releases it via
    /// `Runtime.runIfWaitingForDebugger` (or disconnects).
    pub fn wait_for_debugger(&self) {
        self.waiting_for_debugger.set(true);
        self.process_command_queue();
    }

    /// Forwards a console API call to the connected frontend.
    pub fn console_api_event(&self, kind: &str, args: &[RawValue]) {
        if !self.is_connected.get() {
            return;
        }
        let runtime = self
            .agents
            .borrow()
            .as_ref()
            .map(|agents| agents.runtime.clone());
        if let Some(runtime) = runtime {
            runtime.console_api_called(kind, args);
        }
    }

    /// Drains the command queue on the engine thread. Nested calls return
    /// immediately; while `waiting_for_debugger` is set the drain blocks on
    /// the queue condition.
    pub fn process_command_queue(&self) {
        if self.processing.get() {
            // don't enter recursively
            return;
        }
        self.processing.set(true);

        loop {
            let current: Vec<Command> = {
                let mut state = self.shared.state.lock().unwrap();
                while self.waiting_for_debugger.get() && state.queue.is_empty() {
                    state = self.shared.available.wait(state).unwrap();
                }
                std::mem::take(&mut state.queue)
            };

            let had_commands = !current.is_empty();
            for command in current {
                self.dispatch_command(command);
            }

            if !self.waiting_for_debugger.get() && !had_commands {
                break;
            }
        }

        self.processing.set(false);
    }

    fn dispatch_command(&self, command: Command) {
        log::debug!("dispatching {:?}", command);
        match command {
            Command::Connect => {
                if let Err(err) = self.handle_connect() {
                    log::warn!("connect failed: {}", err);
                }
            }
            Command::Disconnect => {
                if let Err(err) = self.handle_disconnect() {
                    log::warn!("disconnect failed: {}", err);
                }
            }
            Command::MessageReceived(message) => self.handle_message(&message),
            Command::HostRequest(request) => self.handle_host_request(&request),
        }
    }

    fn handle_connect(&self) -> Result<(), DebugError> {
        if self.is_connected.get() {
            return Err(DebugError::AlreadyConnected);
        }

        let pump: Weak<dyn MessagePump> = self.weak_self.clone();
        *self.agents.borrow_mut() = Some(Agents {
            console: Rc::new(ConsoleAgent::new()),
            debugger: DebuggerAgent::new(self.core.clone(), self.frontend.clone()),
            runtime: Rc::new(RuntimeAgent::new(
                self.core.clone(),
                self.frontend.clone(),
                pump,
            )),
            schema: Rc::new(SchemaAgent::new()),
        });

        self.core.pause_on_next_statement()?;
        self.is_connected.set(true);
        Ok(())
    }

    fn handle_disconnect(&self) -> Result<(), DebugError> {
        if !self.is_connected.get() {
            return Err(DebugError::NotConnected);
        }

        // Dropping the Debugger agent detaches it from the core and clears
        // the engine's breakpoints.
        *self.agents.borrow_mut() = None;

        self.run_if_waiting();
        self.is_connected.set(false);
        Ok(())
    }

    fn handle_message(&self, raw: &str) {
        let request = match Request::parse(raw) {
            Ok(request) => request,
            Err(err) => {
                // Only this message fails; the queue keeps draining.
                log::warn!("dropping malformed protocol message: {}", err);
                return;
            }
        };

        let agents = match self.agents.borrow().as_ref() {
            Some(agents) => (
                agents.console.clone(),
                agents.debugger.clone(),
                agents.runtime.clone(),
                agents.schema.clone(),
            ),
            None => {
                log::debug!("protocol message received while disconnected");
                return;
            }
        };
        let (console, debugger, runtime, schema) = agents;

        let Request { id, method, params } = request;
        let (domain, name) = match method.split_once('.') {
            Some(parts) => parts,
            None => ("", method.as_str()),
        };
        let response = match domain {
            "Console" => console.dispatch(name, params),
            "Debugger" => debugger.dispatch(name, params),
            "Runtime" => runtime.dispatch(name, params),
            "Schema" => schema.dispatch(name, params),
            _ => Response::error(NOT_IMPLEMENTED),
        };

        self.frontend.send_response(id, response);
    }

    fn handle_host_request(&self, request: &str) {
        match request {
            "Debugger.go" => self.core.go(),
            "Debugger.deferredGo" => self.deferred_go.set(true),
            "Debugger.stepInto" => {
                if let Err(err) = self.core.step(StepType::In) {
                    log::warn!("host step request failed: {}", err);
                }
            }
            "Console.log" => {
                // reserved
            }
            other => log::warn!("unknown host request: {}", other),
        }
    }

    fn run_if_waiting(&self) {
        let startup = self.shared.state.lock().unwrap().startup_state;
        if startup == StartupState::Pause {
            if let Err(err) = self.core.pause_on_next_statement() {
                log::warn!("startup pause request failed: {}", err);
            }
        }
        self.waiting_for_debugger.set(false);
    }
}

impl<E: DiagnosticEngine> MessagePump for ProtocolHandler<E> {
    fn process_command_queue(&self) {
        ProtocolHandler::process_command_queue(self);
    }

    fn process_deferred_go(&self) {
        if !self.deferred_go.get() {
            return;
        }
        self.deferred_go.set(false);

        // Turn the deferred resume into the next queue dispatch.
        {
            let mut state = self.shared.state.lock().unwrap();
            state
                .queue
                .push(Command::HostRequest("Debugger.go".to_string()));
            self.shared.available.notify_all();
        }
        if let Err(err) = self.core.session().request_async_break() {
            log::warn!("async break request for deferred go failed: {}", err);
        }
    }

    fn wait_for_debugger(&self) {
        ProtocolHandler::wait_for_debugger(self);
    }

    fn continue_run(&self) {
        self.waiting_for_debugger.set(false);
        self.shared.state.lock().unwrap().startup_state = StartupState::Running;
    }

    fn run_if_waiting_for_debugger(&self) {
        self.run_if_waiting();
    }
}
