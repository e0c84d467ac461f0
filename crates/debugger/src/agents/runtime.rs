use crate::agents::parse_args;
use crate::channel::Frontend;
use crate::core::{DebuggerCore, MessagePump};
use crate::error::DebugError;
use crate::wrap;
use jsdebug_cdp::runtime::{
    CompileScriptArgs, CompileScriptResult, ConsoleApiCalledParams, EvaluateArgs,
    EvaluateResult, ExceptionDetails, ExecutionContextCreatedParams,
    ExecutionContextDescription, GetPropertiesArgs, GetPropertiesResult,
    InternalPropertyDescriptor, PropertyDescriptor,
};
use jsdebug_cdp::Response;
use jsdebug_engine::{DiagnosticEngine, EngineError, EngineErrorCode, RawValue};
use serde_json::Value;
use std::cell::Cell;
use std::rc::{Rc, Weak};

const NOT_IMPLEMENTED: &str = "Not implemented";
const SIDE_EFFECT_TEXT: &str = "Possible side effects of expression evaluation";
const DEFAULT_CONTEXT_ID: i64 = 1;
const EVAL_SOURCE_NAME: &str = "#eval";

/// What `compileScript` answers when parsing fails. Both behaviors ship in
/// real backends; `Succeed` is the only one that carries the details to the
/// client, since CDP error responses have no payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileFailureReply {
    Fail,
    Succeed,
}

/// The `Runtime` domain: evaluation, property introspection, and console
/// forwarding.
pub struct RuntimeAgent<E: DiagnosticEngine> {
    core: Rc<DebuggerCore<E>>,
    frontend: Frontend,
    pump: Weak<dyn MessagePump>,
    enabled: Cell<bool>,
    compile_failure_reply: CompileFailureReply,
}

impl<E: DiagnosticEngine> RuntimeAgent<E> {
    pub fn new(
        core: Rc<DebuggerCore<E>>,
        frontend: Frontend,
        pump: Weak<dyn MessagePump>,
    ) -> RuntimeAgent<E> {
        RuntimeAgent {
            core,
            frontend,
            pump,
            enabled: Cell::new(false),
            compile_failure_reply: CompileFailureReply::Succeed,
        }
    }

    pub fn dispatch(&self, method: &str, params: Value) -> Response {
        match method {
            "enable" => self.enable(),
            "disable" => self.disable(),
            "evaluate" => self.evaluate(params),
            "getProperties" => self.get_properties(params),
            "compileScript" => self.compile_script(params),
            "runIfWaitingForDebugger" => self.run_if_waiting_for_debugger(),
            // Known surface we deliberately do not implement.
            "awaitPromise" | "callFunctionOn" | "releaseObject" | "releaseObjectGroup"
            | "discardConsoleEntries" | "setCustomObjectFormatterEnabled" | "runScript" => {
                Response::error(NOT_IMPLEMENTED)
            }
            _ => Response::error(NOT_IMPLEMENTED),
        }
    }

    fn enable(&self) -> Response {
        if self.enabled.get() {
            return Response::empty();
        }
        self.enabled.set(true);

        // A single default execution context.
        self.frontend.send_notification(
            "Runtime.executionContextCreated",
            ExecutionContextCreatedParams {
                context: ExecutionContextDescription {
                    id: DEFAULT_CONTEXT_ID,
                    origin: "default".to_string(),
                    name: "default".to_string(),
                },
            },
        );

        Response::empty()
    }

    fn disable(&self) -> Response {
        self.enabled.set(false);
        Response::empty()
    }

    fn evaluate(&self, params: Value) -> Response {
        let args: EvaluateArgs = match parse_args(params) {
            Ok(args) => args,
            Err(err) => return err.into(),
        };

        // Side-effect-free evaluation cannot be guaranteed, so the
        // expression is never run.
        if args.throw_on_side_effect.unwrap_or(false) {
            return Response::ok(EvaluateResult {
                result: wrap::undefined_remote(),
                exception_details: Some(ExceptionDetails {
                    exception_id: 0,
                    text: SIDE_EFFECT_TEXT.to_string(),
                    line_number: -1,
                    column_number: -1,
                    script_id: None,
                    url: None,
                    exception: None,
                }),
            });
        }

        if args.await_promise.unwrap_or(false) {
            return Response::error(NOT_IMPLEMENTED);
        }

        let silent = args.silent.unwrap_or(false);

        match self.core.evaluate_in_frame(&args.expression, 0) {
            Ok(descriptor) => match wrap::wrap_object(&descriptor) {
                Ok(result) => Response::ok(EvaluateResult {
                    result,
                    exception_details: None,
                }),
                Err(err) => err.into(),
            },
            Err(err) if err.is_not_at_break() => self.evaluate_global(&args.expression, silent),
            Err(err) => match script_exception_response(&err) {
                Some(response) => response,
                None => self.evaluate_failure(DebugError::from(err).to_string(), silent),
            },
        }
    }

    /// Global-scope fallback used while the engine is running: evaluate the
    /// expression through a wrapper that captures either the value or the
    /// thrown error.
    fn evaluate_global(&self, expression: &str, silent: bool) -> Response {
        let escaped = expression.replace('\\', "\\\\").replace('"', "\\\"");
        let wrapper = format!(
            "try{{({{value:eval(\"{}\")}})}}catch(e){{({{error:e}})}}",
            escaped
        );

        let outcome = match self.core.session().run_script(&wrapper, EVAL_SOURCE_NAME) {
            Ok(RawValue::Object(object)) => object,
            Ok(_) => return self.evaluate_failure(DebugError::ScriptParse.to_string(), silent),
            Err(err) => {
                return self.evaluate_failure(DebugError::from(err).to_string(), silent)
            }
        };

        if let Some(error) = outcome.get("error") {
            let text = match error {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            return Response::ok(EvaluateResult {
                result: wrap::undefined_remote(),
                exception_details: Some(ExceptionDetails {
                    exception_id: 0,
                    text,
                    line_number: 0,
                    column_number: 0,
                    script_id: None,
                    url: None,
                    exception: None,
                }),
            });
        }

        match outcome.get("value") {
            Some(value) => match wrap::wrap_value(&RawValue::from_json(value)) {
                Ok(result) => Response::ok(EvaluateResult {
                    result,
                    exception_details: None,
                }),
                Err(err) => err.into(),
            },
            None => self.evaluate_failure(DebugError::ScriptParse.to_string(), silent),
        }
    }

    fn evaluate_failure(&self, message: String, silent: bool) -> Response {
        if silent {
            Response::ok(EvaluateResult {
                result: wrap::undefined_remote(),
                exception_details: Some(ExceptionDetails {
                    exception_id: 0,
                    text: message,
                    line_number: 0,
                    column_number: 0,
                    script_id: None,
                    url: None,
                    exception: None,
                }),
            })
        } else {
            Response::error(message)
        }
    }

    fn get_properties(&self, params: Value) -> Response {
        let args: GetPropertiesArgs = match parse_args(params) {
            Ok(args) => args,
            Err(err) => return err.into(),
        };

        // Accessor-only queries are unsupported; just return an empty list.
        if args.accessor_properties_only.unwrap_or(false) {
            return Response::ok(GetPropertiesResult {
                result: Vec::new(),
                internal_properties: None,
            });
        }

        let parsed = match wrap::parse_object_id(&args.object_id) {
            Ok(parsed) => parsed,
            Err(err) => return err.into(),
        };

        if let Some(handle) = parsed.handle {
            return self.properties_for_handle(handle);
        }

        if let (Some(ordinal), Some(name)) = (parsed.ordinal, parsed.name.as_deref()) {
            match name {
                "locals" => return self.local_properties(ordinal),
                "globals" => return self.global_properties(ordinal),
                _ => {}
            }
        }

        DebugError::InvalidObjectId.into()
    }

    fn properties_for_handle(&self, handle: i64) -> Response {
        match self.core.session().object_properties(handle) {
            Ok(properties) => wrap_property_lists(&properties),
            Err(err) => err.into(),
        }
    }

    fn local_properties(&self, ordinal: i64) -> Response {
        let properties = match self.core.session().stack_properties(ordinal) {
            Ok(properties) => properties,
            Err(err) => return err.into(),
        };

        let locals = match properties.get("locals") {
            Some(Value::Array(locals)) => locals.as_slice(),
            _ => &[],
        };
        match wrap_descriptors(locals) {
            Ok(result) => Response::ok(GetPropertiesResult {
                result,
                internal_properties: Some(Vec::new()),
            }),
            Err(err) => err.into(),
        }
    }

    fn global_properties(&self, ordinal: i64) -> Response {
        let properties = match self.core.session().stack_properties(ordinal) {
            Ok(properties) => properties,
            Err(err) => return err.into(),
        };

        match properties
            .get("globals")
            .and_then(|globals| globals.get("handle"))
            .and_then(Value::as_i64)
        {
            Some(handle) => self.properties_for_handle(handle),
            None => Response::error("No globals available for call frame"),
        }
    }

    fn compile_script(&self, params: Value) -> Response {
        let args: CompileScriptArgs = match parse_args(params) {
            Ok(args) => args,
            Err(err) => return err.into(),
        };

        // Persisting compiled scripts is unsupported.
        if args.persist_script {
            return Response::error(NOT_IMPLEMENTED);
        }

        match self
            .core
            .session()
            .parse_script(&args.expression, &args.source_url)
        {
            // No script id on success: nothing was persisted.
            Ok(()) => Response::ok(CompileScriptResult::default()),
            Err(err) => {
                let exception_details = compile_exception_details(&err);
                match self.compile_failure_reply {
                    CompileFailureReply::Succeed => Response::ok(CompileScriptResult {
                        script_id: None,
                        exception_details,
                    }),
                    CompileFailureReply::Fail => {
                        Response::error(DebugError::ScriptParse.to_string())
                    }
                }
            }
        }
    }

    fn run_if_waiting_for_debugger(&self) -> Response {
        if !self.enabled.get() {
            return DebugError::NotEnabled.into();
        }
        if let Some(pump) = self.pump.upgrade() {
            pump.run_if_waiting_for_debugger();
        }
        Response::empty()
    }

    /// Forwards a console API call as a `Runtime.consoleAPICalled`
    /// notification.
    pub fn console_api_called(&self, kind: &str, args: &[RawValue]) {
        let mut wrapped = Vec::new();
        for arg in args {
            match wrap::wrap_value(arg) {
                Ok(remote) => wrapped.push(remote),
                Err(err) => log::warn!("cannot wrap console argument: {}", err),
            }
        }

        self.frontend.send_notification(
            "Runtime.consoleAPICalled",
            ConsoleApiCalledParams {
                kind: kind.to_string(),
                args: wrapped,
                execution_context_id: 0,
                timestamp: 0.0,
            },
        );
    }
}

/// Success response carrying the thrown exception for script-level
/// evaluation failures, when the engine delivered the exception descriptor.
fn script_exception_response(err: &EngineError) -> Option<Response> {
    if !matches!(
        err.code,
        EngineErrorCode::ScriptException | EngineErrorCode::ScriptCompile
    ) {
        return None;
    }
    let exception = err.data.as_ref()?;
    let result = wrap::wrap_exception(exception).ok()?;
    let exception_details = wrap::wrap_exception_details(exception).ok()?;
    Some(Response::ok(EvaluateResult {
        result,
        exception_details: Some(exception_details),
    }))
}

fn compile_exception_details(err: &EngineError) -> Option<ExceptionDetails> {
    let metadata = err.data.as_ref()?;
    let int = |name: &str| metadata.get(name).and_then(Value::as_i64).unwrap_or(0);
    let text = metadata
        .get("exception")
        .and_then(|exception| exception.get("message"))
        .and_then(Value::as_str)
        .or_else(|| metadata.get("message").and_then(Value::as_str))
        .unwrap_or("")
        .to_string();

    Some(ExceptionDetails {
        exception_id: 0,
        text,
        line_number: int("line"),
        column_number: int("column"),
        script_id: None,
        url: None,
        exception: wrap::wrap_value(&RawValue::Object(metadata.clone())).ok(),
    })
}

fn wrap_descriptors(descriptors: &[Value]) -> Result<Vec<PropertyDescriptor>, DebugError> {
    descriptors.iter().map(wrap::wrap_property).collect()
}

fn wrap_property_lists(properties: &Value) -> Response {
    let list = match properties.get("properties") {
        Some(Value::Array(list)) => list.as_slice(),
        _ => &[],
    };
    let internal = match properties.get("internalProperties") {
        Some(Value::Array(list)) => list.as_slice(),
        _ => &[],
    };

    let result = match wrap_descriptors(list) {
        Ok(result) => result,
        Err(err) => return err.into(),
    };
    let internal_properties: Result<Vec<InternalPropertyDescriptor>, DebugError> =
        internal.iter().map(wrap::wrap_internal_property).collect();
    match internal_properties {
        Ok(internal_properties) => Response::ok(GetPropertiesResult {
            result,
            internal_properties: Some(internal_properties),
        }),
        Err(err) => err.into(),
    }
}
