use jsdebug_cdp::schema::{Domain, GetDomainsResult};
use jsdebug_cdp::Response;

const NOT_IMPLEMENTED: &str = "Not implemented";

/// The Schema domain: advertises which domains this backend speaks.
pub struct SchemaAgent;

impl SchemaAgent {
    pub fn new() -> SchemaAgent {
        SchemaAgent
    }

    pub fn dispatch(&self, method: &str, _params: serde_json::Value) -> Response {
        match method {
            "getDomains" => Response::ok(GetDomainsResult {
                domains: vec![
                    Domain::new("Console", "1.2"),
                    Domain::new("Debugger", "1.2"),
                    Domain::new("Runtime", "1.2"),
                ],
            }),
            _ => Response::error(NOT_IMPLEMENTED),
        }
    }
}
