#![deny(clippy::all, warnings)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod commands;
pub mod config;
pub mod effects;
pub mod errors;
pub mod outcome;
pub mod process;
pub mod python;
pub mod scan;
pub mod scratch;
pub mod snapshot;
pub mod writer;

#[cfg(test)]
pub(crate) mod testing;

pub use commands::{
    list_imports, show_snapshot, update_requirements, ImportsRequest, SnapshotRequest,
    UpdateMode, UpdateRequest,
};
pub use config::{CommandContext, Config, EnvSnapshot, GlobalOptions};
pub use effects::{PythonRuntime, SharedRuntime, SystemPythonRuntime};
pub use errors::{Phase, SplitError};
pub use outcome::{
    format_status_message, to_json_response, CommandGroup, CommandInfo, CommandStatus,
    ExecutionOutcome,
};
pub use process::RunOutput;
pub use snapshot::EnvironmentRequest;
