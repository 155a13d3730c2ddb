use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Exit code used when the wrapper fails before the plugin could run.
pub const EXIT_WRAPPER_FAILURE: i32 = 125;
/// Exit code used when the plugin exists but cannot be executed.
pub const EXIT_CANNOT_EXECUTE: i32 = 126;
/// Exit code used when the plugin binary cannot be found.
pub const EXIT_NOT_FOUND: i32 = 127;

#[derive(Error, Debug)]
pub enum WrapperError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Could not compute current path: {0}")]
    Location(String),

    #[error("Could not find CNI implementation plugin on {}", .0.display())]
    PluginNotFound(PathBuf),

    #[error("Error parsing STDIN as JSON: {0}")]
    InvalidInput(String),

    #[error("Could not marshal-back the JSON input: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("Could not execute CNI plugin {}: {source}", .path.display())]
    Launch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl WrapperError {
    /// Exit status the wrapper terminates with when this error aborts a run.
    ///
    /// Follows the `env(1)` convention so that wrapper failures stay apart
    /// from the codes plugins commonly return.
    pub fn exit_code(&self) -> i32 {
        match self {
            WrapperError::PluginNotFound(_) | WrapperError::Location(_) => EXIT_NOT_FOUND,
            WrapperError::Launch { source, .. } => match source.kind() {
                io::ErrorKind::NotFound => EXIT_NOT_FOUND,
                io::ErrorKind::PermissionDenied => EXIT_CANNOT_EXECUTE,
                _ => EXIT_WRAPPER_FAILURE,
            },
            _ => EXIT_WRAPPER_FAILURE,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, WrapperError>;
