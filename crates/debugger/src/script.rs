use crate::error::DebugError;
use crate::session::Session;
use jsdebug_cdp::debugger::ScriptParsedParams;
use jsdebug_engine::DiagnosticEngine;
use serde_json::Value;
use std::cell::RefCell;

/// A script known to the debugger. Metadata is immutable once the record is
/// created; the source text is fetched lazily and cached.
#[derive(Debug)]
pub struct ScriptRecord {
    script_id: String,
    url: String,
    start_line: i64,
    start_column: i64,
    end_line: i64,
    end_column: i64,
    execution_context_id: i64,
    hash: String,
    execution_context_aux_data: Option<Value>,
    is_live_edit: bool,
    source_map_url: String,
    has_source_url: bool,
    source: RefCell<Option<String>>,
}

impl ScriptRecord {
    pub fn from_metadata(metadata: &Value) -> ScriptRecord {
        let int = |name: &str| metadata.get(name).and_then(Value::as_i64).unwrap_or(0);
        let string = |name: &str| {
            metadata
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string()
        };

        // Aux data arrives either as a JSON blob to parse or already parsed.
        let aux_data = match metadata.get("executionContextAuxData") {
            Some(Value::String(raw)) if !raw.is_empty() => serde_json::from_str(raw).ok(),
            Some(value @ Value::Object(_)) => Some(value.clone()),
            _ => None,
        };

        ScriptRecord {
            script_id: id_string(metadata.get("scriptId")),
            url: string("url"),
            start_line: int("startLine"),
            start_column: int("startColumn"),
            end_line: int("endLine"),
            end_column: int("endColumn"),
            execution_context_id: metadata
                .get("executionContextId")
                .and_then(Value::as_i64)
                .unwrap_or(1),
            hash: string("hash"),
            execution_context_aux_data: aux_data,
            is_live_edit: metadata
                .get("isLiveEdit")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            source_map_url: string("sourceMappingUrl"),
            has_source_url: metadata
                .get("hasSourceUrl")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            source: RefCell::new(None),
        }
    }

    pub fn script_id(&self) -> &str {
        &self.script_id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn numeric_id(&self) -> Result<i64, DebugError> {
        self.script_id
            .parse()
            .map_err(|_| DebugError::InvalidArgument("script id is not numeric"))
    }

    /// The script's source text, fetched through the session on first use.
    pub fn source<E: DiagnosticEngine>(&self, session: &Session<E>) -> Result<String, DebugError> {
        if let Some(source) = self.source.borrow().as_ref() {
            return Ok(source.clone());
        }
        let source = session.script_source(self.numeric_id()?)?;
        *self.source.borrow_mut() = Some(source.clone());
        Ok(source)
    }

    pub fn parsed_params(&self) -> ScriptParsedParams {
        ScriptParsedParams {
            script_id: self.script_id.clone(),
            url: self.url.clone(),
            start_line: self.start_line,
            start_column: self.start_column,
            end_line: self.end_line,
            end_column: self.end_column,
            execution_context_id: self.execution_context_id,
            hash: self.hash.clone(),
            execution_context_aux_data: self.execution_context_aux_data.clone(),
            is_live_edit: Some(self.is_live_edit),
            source_map_url: Some(self.source_map_url.clone()),
            has_source_url: Some(self.has_source_url),
        }
    }
}

fn id_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}
