use std::{io, path::PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AutowireError>;

#[derive(Debug, Error)]
pub enum AutowireError {
    /// Invalid or unresolvable configuration. Fatal at startup.
    #[error("invalid autowire configuration: {0}")]
    Configuration(String),

    /// The host registered this plugin after the framework compiler.
    #[error("the {plugin} plugin must come before {before} in the plugin list")]
    Ordering { plugin: String, before: String },

    /// A candidate file could not be parsed. The file is skipped.
    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// The optional preprocessor config could not be read. Defaults are used.
    #[error("failed to resolve preprocessor config {}: {message}", path.display())]
    PreprocessorResolution { path: PathBuf, message: String },

    /// A component file whose path does not produce an identifier.
    #[error("cannot derive a component name from {}", path.display())]
    InvalidName { path: PathBuf },

    /// A directory could not be registered with the file watcher.
    #[error("failed to watch {}: {message}", path.display())]
    Watch { path: PathBuf, message: String },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl AutowireError {
    pub fn config(message: impl Into<String>) -> Self {
        AutowireError::Configuration(message.into())
    }

    /// Whether the build can continue past this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AutowireError::Parse { .. }
                | AutowireError::PreprocessorResolution { .. }
                | AutowireError::InvalidName { .. }
        )
    }
}
