use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub status: CommandStatus,
    pub message: String,
    #[serde(default)]
    pub details: Value,
}

impl ExecutionOutcome {
    pub fn success(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::Ok,
            message: message.into(),
            details,
        }
    }

    pub fn failure(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::Failure,
            message: message.into(),
            details,
        }
    }

    pub fn user_error(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::UserError,
            message: message.into(),
            details,
        }
    }

    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.status.exit_code()
    }

    /// `details` as a JSON object; non-object payloads are kept under `value`.
    fn details_object(&self) -> Value {
        match &self.details {
            Value::Null => Value::Object(Map::new()),
            Value::Object(_) => self.details.clone(),
            other => json!({ "value": other }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum CommandStatus {
    Ok,
    UserError,
    Failure,
}

impl CommandStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandStatus::Ok => "ok",
            CommandStatus::UserError => "user-error",
            CommandStatus::Failure => "error",
        }
    }

    /// 0 for success, 1 when the user can fix the input, 2 when the
    /// environment or filesystem let us down.
    pub fn exit_code(&self) -> i32 {
        match self {
            CommandStatus::Ok => 0,
            CommandStatus::UserError => 1,
            CommandStatus::Failure => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandGroup {
    Update,
    Imports,
    Snapshot,
}

impl fmt::Display for CommandGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandGroup::Update => "update",
            CommandGroup::Imports => "imports",
            CommandGroup::Snapshot => "snapshot",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CommandInfo {
    pub group: CommandGroup,
    pub name: &'static str,
}

impl CommandInfo {
    #[must_use]
    pub const fn new(group: CommandGroup, name: &'static str) -> Self {
        Self { group, name }
    }

    /// `reqsplit <name>`, the prefix of every status line.
    pub fn label(&self) -> String {
        format!("reqsplit {}", self.name)
    }
}

/// The `--json` envelope for one command run.
#[must_use]
pub fn to_json_response(info: CommandInfo, outcome: &ExecutionOutcome) -> Value {
    json!({
        "command": info.name,
        "status": outcome.status.as_str(),
        "exit_code": outcome.exit_code(),
        "message": format_status_message(info, &outcome.message),
        "details": outcome.details_object(),
    })
}

#[must_use]
pub fn format_status_message(info: CommandInfo, message: &str) -> String {
    let label = info.label();
    match message.trim() {
        "" => label,
        text if text.starts_with(&label) => text.to_string(),
        text => format!("{label}: {text}"),
    }
}
