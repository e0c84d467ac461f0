use jsdebug_cdp::Response;
use jsdebug_engine::{EngineError, EngineErrorCode};

/// Error kinds surfaced by the protocol handler and its agents.
#[derive(Debug)]
pub enum DebugError {
    InvalidArgument(&'static str),
    AlreadyConnected,
    NotConnected,
    NotEnabled,
    NotImplemented,
    InvalidObjectId,
    InvalidOrdinal,
    InvalidCallFrameId,
    InvalidColumnNumber,
    UrlRequired,
    BreakpointExists,
    BreakpointNotFound,
    BreakpointCouldNotResolve,
    ScriptMustBeLoaded,
    ScriptNotFound(String),
    ScriptParse,
    UnrecognizedState(String),
    Engine(EngineError),
}

/// Stable error classes for C-style embedders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidArgument,
    InvalidState,
    NotFound,
    NotImplemented,
    OutOfMemory,
    EngineError,
    InternalError,
}

impl DebugError {
    pub fn code(&self) -> ErrorCode {
        use DebugError::*;
        match self {
            InvalidArgument(_) | InvalidObjectId | InvalidOrdinal | InvalidCallFrameId
            | InvalidColumnNumber | UrlRequired | UnrecognizedState(_) => ErrorCode::InvalidArgument,
            AlreadyConnected | NotConnected | NotEnabled | BreakpointExists
            | ScriptMustBeLoaded => ErrorCode::InvalidState,
            BreakpointNotFound | ScriptNotFound(_) => ErrorCode::NotFound,
            NotImplemented => ErrorCode::NotImplemented,
            BreakpointCouldNotResolve | ScriptParse => ErrorCode::EngineError,
            Engine(err) => match err.code {
                EngineErrorCode::OutOfMemory => ErrorCode::OutOfMemory,
                EngineErrorCode::InvalidArgument => ErrorCode::InvalidArgument,
                _ => ErrorCode::EngineError,
            },
        }
    }
}

impl std::error::Error for DebugError {}

impl std::fmt::Display for DebugError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use DebugError::*;
        match self {
            InvalidArgument(message) => write!(f, "{}", message),
            AlreadyConnected => write!(f, "Handler is already connected"),
            NotConnected => write!(f, "No handler is currently connected"),
            NotEnabled => write!(f, "Not enabled"),
            NotImplemented => write!(f, "Not implemented"),
            InvalidObjectId => write!(f, "Invalid object ID"),
            InvalidOrdinal => write!(f, "Invalid ordinal value"),
            InvalidCallFrameId => write!(f, "Invalid call frame ID specified"),
            InvalidColumnNumber => write!(f, "Invalid column number specified"),
            UrlRequired => write!(f, "Either url or urlRegex must be specified"),
            BreakpointExists => write!(f, "Breakpoint at specified location already exists"),
            BreakpointNotFound => write!(f, "Breakpoint could not be found"),
            BreakpointCouldNotResolve => write!(f, "Breakpoint could not be resolved"),
            ScriptMustBeLoaded => write!(f, "Script must be loaded before resolving"),
            ScriptNotFound(id) => write!(f, "Script not found: {}", id),
            ScriptParse => write!(f, "Script parse failed"),
            UnrecognizedState(state) => write!(f, "Unrecognized state value: {}", state),
            Engine(err) => write!(f, "{}", err),
        }
    }
}

impl From<EngineError> for DebugError {
    fn from(err: EngineError) -> Self {
        DebugError::Engine(err)
    }
}

impl From<DebugError> for Response {
    fn from(err: DebugError) -> Self {
        Response::error(err.to_string())
    }
}
