use serde_json::Value;

/// Status classes reported by the engine's diagnostic API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorCode {
    InvalidArgument,
    OutOfMemory,
    /// The requested operation is only valid while the engine is paused.
    NotAtBreak,
    /// Script evaluation threw.
    ScriptException,
    /// Script source failed to parse.
    ScriptCompile,
    Internal,
}

/// A non-success status from the engine, with an optional data payload
/// (exception descriptor or parse failure metadata).
#[derive(Debug, Clone)]
pub struct EngineError {
    pub code: EngineErrorCode,
    pub message: String,
    pub data: Option<Value>,
}

impl EngineError {
    pub fn new(code: EngineErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(code: EngineErrorCode, message: impl Into<String>, data: Value) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn not_at_break() -> Self {
        Self::new(EngineErrorCode::NotAtBreak, "engine is not at a break")
    }

    pub fn is_not_at_break(&self) -> bool {
        self.code == EngineErrorCode::NotAtBreak
    }
}

impl std::error::Error for EngineError {}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "engine error ({:?}): {}", self.code, self.message)
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
