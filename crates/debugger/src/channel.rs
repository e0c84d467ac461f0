use crate::error::DebugError;
use jsdebug_cdp::Response;
use jsdebug_engine::AsyncBreakHandle;
use serde::Serialize;
use std::sync::{Arc, Condvar, Mutex};

/// Queue entries produced by the transport side, drained on the engine
/// thread.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    Connect,
    Disconnect,
    MessageReceived(String),
    HostRequest(String),
}

/// What the engine should do once the frontend finishes its handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupState {
    Pause,
    Continue,
    Running,
}

/// Delivers serialized protocol frames to the transport.
pub type ResponseCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Notifies the host that commands are waiting in the queue.
pub type QueueCallback = Arc<dyn Fn() + Send + Sync>;

pub(crate) struct ChannelState {
    pub queue: Vec<Command>,
    pub response_callback: Option<ResponseCallback>,
    pub queue_callback: Option<QueueCallback>,
    pub startup_state: StartupState,
}

/// The cross-thread half of the protocol handler: command FIFO plus the
/// callback slots, all behind one mutex.
pub(crate) struct ChannelShared {
    pub state: Mutex<ChannelState>,
    pub available: Condvar,
}

impl ChannelShared {
    pub fn new() -> Arc<ChannelShared> {
        Arc::new(ChannelShared {
            state: Mutex::new(ChannelState {
                queue: Vec::new(),
                response_callback: None,
                queue_callback: None,
                startup_state: StartupState::Running,
            }),
            available: Condvar::new(),
        })
    }
}

/// Transport-side handle to the protocol handler. Cloneable and sendable;
/// every operation only touches the shared queue and the engine's
/// thread-safe async-break request.
#[derive(Clone)]
pub struct ProtocolChannel {
    shared: Arc<ChannelShared>,
    break_handle: Arc<dyn AsyncBreakHandle>,
}

impl ProtocolChannel {
    pub(crate) fn new(
        shared: Arc<ChannelShared>,
        break_handle: Arc<dyn AsyncBreakHandle>,
    ) -> ProtocolChannel {
        ProtocolChannel {
            shared,
            break_handle,
        }
    }

    /// Attaches a frontend. Fails while another frontend is attached.
    pub fn connect(
        &self,
        break_on_first_line: bool,
        on_response: impl Fn(&str) + Send + Sync + 'static,
    ) -> Result<(), DebugError> {
        {
            let mut state = self.shared.state.lock().unwrap();
            if state.response_callback.is_some() {
                return Err(DebugError::AlreadyConnected);
            }
            state.response_callback = Some(Arc::new(on_response));
            state.startup_state = if break_on_first_line {
                StartupState::Pause
            } else {
                StartupState::Continue
            };
            state.queue.push(Command::Connect);
            self.shared.available.notify_all();
        }
        self.break_handle.request_async_break()?;
        Ok(())
    }

    pub fn disconnect(&self) -> Result<(), DebugError> {
        {
            let mut state = self.shared.state.lock().unwrap();
            if state.response_callback.is_none() {
                return Err(DebugError::NotConnected);
            }
            state.response_callback = None;
            state.queue.push(Command::Disconnect);
            self.shared.available.notify_all();
        }
        self.break_handle.request_async_break()?;
        Ok(())
    }

    /// Enqueues a raw CDP frame for the engine thread.
    pub fn send_command(&self, command: &str) -> Result<(), DebugError> {
        let callback = {
            let mut state = self.shared.state.lock().unwrap();
            state
                .queue
                .push(Command::MessageReceived(command.to_string()));
            self.shared.available.notify_all();
            state.queue_callback.clone()
        };

        // Trigger a debugger break so the engine drains soon.
        self.break_handle.request_async_break()?;

        if let Some(callback) = callback {
            callback();
        }
        Ok(())
    }

    /// Enqueues an internal host request token.
    pub fn send_request(&self, request: &str) -> Result<(), DebugError> {
        {
            let mut state = self.shared.state.lock().unwrap();
            state.queue.push(Command::HostRequest(request.to_string()));
            self.shared.available.notify_all();
        }
        self.break_handle.request_async_break()?;
        Ok(())
    }

    pub fn set_command_queue_callback(&self, callback: Option<QueueCallback>) {
        self.shared.state.lock().unwrap().queue_callback = callback;
    }
}

/// Agent-side capability for pushing frames to the connected frontend.
/// Delivery is synchronous and unbuffered; the callback slot is cloned out
/// of the lock before invocation.
#[derive(Clone)]
pub struct Frontend {
    shared: Arc<ChannelShared>,
}

impl Frontend {
    pub(crate) fn new(shared: Arc<ChannelShared>) -> Frontend {
        Frontend { shared }
    }

    pub fn send_response(&self, id: i64, response: Response) {
        self.deliver(&response.into_message(id));
    }

    pub fn send_notification<T: Serialize>(&self, method: &str, params: T) {
        self.deliver(&jsdebug_cdp::notification(method, params));
    }

    /// Nothing is buffered, so there is nothing to flush.
    pub fn flush(&self) {}

    fn deliver(&self, frame: &str) {
        let callback = self.shared.state.lock().unwrap().response_callback.clone();
        if let Some(callback) = callback {
            callback(frame);
        }
    }
}
