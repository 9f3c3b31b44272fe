//! Global options, environment capture, project configuration, and the
//! per-command context that ties them to a Python runtime.

pub mod context;
pub mod file;
pub mod settings;

pub use context::CommandContext;
pub use file::{Config, CONFIG_FILE_NAME};
pub use settings::{EnvSettings, EnvSnapshot, GlobalOptions};
