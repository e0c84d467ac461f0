/// Debug events delivered through the event sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugEventKind {
    /// A script was compiled successfully. Event data is script metadata.
    SourceCompile,
    /// A script failed to compile. Event data is script metadata.
    CompileError,
    /// Execution hit an engine breakpoint. Event data carries
    /// `breakpointId` and the break location.
    Breakpoint,
    /// A previously armed step finished.
    StepComplete,
    /// A `debugger;` statement executed.
    DebuggerStatement,
    /// A runtime exception satisfying the break-on-exception mode was
    /// thrown. Event data carries the `exception` descriptor.
    RuntimeException,
    /// The engine honored an asynchronous break request.
    AsyncBreak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepType {
    In,
    Out,
    Over,
}

/// When the engine should break on thrown exceptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakOnException {
    None,
    FirstChance,
    Uncaught,
}
