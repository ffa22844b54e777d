//! Error types for workshop-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from registry and settings operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Underlying I/O failure (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error (write/save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load; includes file path and line context from serde_yaml.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`; cannot locate `~/.workshop/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// The workshop YAML file did not exist at the expected path.
    #[error("workshop not found at {path}")]
    WorkshopNotFound { path: PathBuf },

    /// A workbench name was looked up in a workshop that does not contain it.
    #[error("workbench '{workbench}' not found in workshop '{workshop}'")]
    WorkbenchNotFound { workshop: String, workbench: String },

    /// A workbench with the same name is already part of the workshop.
    #[error("workbench '{workbench}' already exists in workshop '{workshop}'")]
    DuplicateWorkbench { workshop: String, workbench: String },

    /// Names end up as tmux session/window names and file names.
    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },
}
