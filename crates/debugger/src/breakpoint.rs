use crate::script::ScriptRecord;
use jsdebug_cdp::debugger::Location;
use regex::Regex;

/// How a breakpoint request addresses its script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Url,
    UrlRegex,
    ScriptId,
}

impl QueryKind {
    fn tag(self) -> &'static str {
        match self {
            QueryKind::Url => "url",
            QueryKind::UrlRegex => "urlRegex",
            QueryKind::ScriptId => "scriptId",
        }
    }
}

/// A requested breakpoint plus its engine resolution state.
///
/// The nominal location (query/line/column) is what the frontend asked for;
/// `actual_*` reflect where the engine actually placed the breakpoint once a
/// matching script was loaded.
#[derive(Debug)]
pub struct Breakpoint {
    query: String,
    kind: QueryKind,
    line_number: i64,
    column_number: i64,
    condition: String,
    regex: Option<Regex>,
    script_id: Option<String>,
    actual_id: i64,
    actual_line: i64,
    actual_column: i64,
}

impl Breakpoint {
    pub fn by_query(
        query: String,
        kind: QueryKind,
        line_number: i64,
        column_number: i64,
        condition: String,
    ) -> Breakpoint {
        let regex = match kind {
            QueryKind::UrlRegex => match Regex::new(&query) {
                Ok(regex) => Some(regex),
                Err(err) => {
                    log::warn!("invalid breakpoint url regex {:?}: {}", query, err);
                    None
                }
            },
            _ => None,
        };

        Breakpoint {
            query,
            kind,
            line_number,
            column_number,
            condition,
            regex,
            script_id: None,
            actual_id: -1,
            actual_line: -1,
            actual_column: -1,
        }
    }

    /// A breakpoint addressed at a specific script, which therefore counts
    /// as loaded from the start.
    pub fn from_location(
        script_id: &str,
        line_number: i64,
        column_number: i64,
        condition: String,
    ) -> Breakpoint {
        let mut breakpoint = Breakpoint::by_query(
            script_id.to_string(),
            QueryKind::ScriptId,
            line_number,
            column_number,
            condition,
        );
        breakpoint.script_id = Some(script_id.to_string());
        breakpoint
    }

    /// Deterministic key identifying the requested breakpoint.
    pub fn fingerprint(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}",
            self.kind.tag(),
            self.line_number,
            self.column_number,
            self.query,
            self.condition
        )
    }

    /// Binds this breakpoint to a newly loaded script when the query matches.
    /// An already-resolved breakpoint never rebinds.
    pub fn try_load_script(&mut self, script: &ScriptRecord) -> bool {
        if self.is_resolved() {
            return false;
        }
        let matches = match self.kind {
            QueryKind::Url => script.url() == self.query,
            QueryKind::UrlRegex => self
                .regex
                .as_ref()
                .map(|regex| regex.is_match(script.url()))
                .unwrap_or(false),
            QueryKind::ScriptId => script.script_id() == self.query,
        };
        if matches {
            self.script_id = Some(script.script_id().to_string());
        }
        matches
    }

    pub fn is_script_loaded(&self) -> bool {
        self.script_id.is_some()
    }

    pub fn is_resolved(&self) -> bool {
        self.actual_id >= 0
    }

    pub fn on_resolved(&mut self, actual_id: i64, actual_line: i64, actual_column: i64) {
        self.actual_id = actual_id;
        self.actual_line = actual_line;
        self.actual_column = actual_column;
    }

    pub fn actual_location(&self) -> Location {
        Location {
            script_id: self.script_id.clone().unwrap_or_default(),
            line_number: self.actual_line,
            column_number: self.actual_column,
        }
    }

    pub fn script_id(&self) -> Option<&str> {
        self.script_id.as_deref()
    }

    pub fn condition(&self) -> &str {
        &self.condition
    }

    pub fn line_number(&self) -> i64 {
        self.line_number
    }

    pub fn column_number(&self) -> i64 {
        self.column_number
    }

    pub fn actual_id(&self) -> i64 {
        self.actual_id
    }
}
