//! Bridges a JavaScript engine's diagnostic API to the Chrome DevTools
//! Protocol.
//!
//! The embedder constructs a [`ProtocolHandler`] over a
//! [`jsdebug_engine::DiagnosticEngine`] on the engine thread and hands the
//! [`ProtocolChannel`] to whatever transport carries CDP frames (a WebSocket
//! server, typically). Commands cross threads through a mutex-protected
//! queue; the engine thread drains it whenever the engine pauses at an
//! asynchronous break, a breakpoint, or an explicit
//! [`ProtocolHandler::process_command_queue`] call.
//!
//! While the debuggee is paused, the handler runs a nested message pump on
//! the engine's suspended stack, so `Debugger.resume` and friends arrive
//! even though user script is not executing.

mod agents;
mod breakpoint;
mod channel;
mod core;
mod error;
mod handler;
mod script;
mod session;
pub mod wrap;

pub use crate::agents::runtime::CompileFailureReply;
pub use crate::breakpoint::{Breakpoint, QueryKind};
pub use crate::channel::{Frontend, ProtocolChannel, QueueCallback, ResponseCallback, StartupState};
pub use crate::core::{BreakInfo, DebugEventObserver, DebuggerCore, MessagePump, SkipPauseRequest};
pub use crate::error::{DebugError, ErrorCode};
pub use crate::handler::ProtocolHandler;
pub use crate::script::ScriptRecord;
pub use crate::session::Session;
