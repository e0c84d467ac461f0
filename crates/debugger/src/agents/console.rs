use jsdebug_cdp::Response;

const NOT_IMPLEMENTED: &str = "Not implemented";

/// The Console domain. Console messages reach the frontend through
/// `Runtime.consoleAPICalled`; this agent only answers the domain's
/// lifecycle methods.
pub struct ConsoleAgent;

impl ConsoleAgent {
    pub fn new() -> ConsoleAgent {
        ConsoleAgent
    }

    pub fn dispatch(&self, method: &str, _params: serde_json::Value) -> Response {
        match method {
            "enable" | "disable" | "clearMessages" => Response::empty(),
            _ => Response::error(NOT_IMPLEMENTED),
        }
    }
}
