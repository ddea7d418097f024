//! Error types for the editor

use paper_model::{ModelError, SchemaError};
use thiserror::Error;

/// Problems found while assembling an editor from its extensions.
///
/// These are fatal at construction; an editor is never built from a
/// configuration that produced one.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Kind '{kind}' is declared twice (second declaration by extension '{extension}')")]
    DuplicateKind { kind: String, extension: String },

    #[error("Plugin key '{0}' is registered twice")]
    DuplicatePlugin(String),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Invalid input rule pattern '{pattern}': {message}")]
    InputRule { pattern: String, message: String },

    #[error("Invalid key chord '{0}'")]
    KeyChord(String),

    #[error("Invalid default document: {0}")]
    DefaultValue(ModelError),

    #[error("Config file error: {0}")]
    File(String),
}

/// A step that cannot be applied to the document it targets.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StepError {
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("No node at position {0}")]
    NoNodeAt(usize),

    #[error("Cannot {action}: {reason}")]
    Structure { action: &'static str, reason: String },
}

impl StepError {
    pub fn structure(action: &'static str, reason: impl Into<String>) -> Self {
        StepError::Structure {
            action,
            reason: reason.into(),
        }
    }
}

/// Why `EditorState::apply` refused a transaction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransactionError {
    #[error("Transaction was built against a different document")]
    Mismatched,

    #[error("Transaction contains a failed step: {0}")]
    Step(#[from] StepError),

    #[error("Resulting document is invalid: {0}")]
    Invalid(ModelError),

    #[error("Transaction rejected by plugin '{0}'")]
    Filtered(String),

    #[error("Plugins kept appending transactions after {0} rounds")]
    AppendLoop(usize),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    /// A region node was read before the identity pass gave it an id.
    #[error("Embedded region '{kind}' has no editorId")]
    MissingIdentity { kind: String },

    #[error("No embedded region with editorId '{0}'")]
    UnknownRegion(String),

    #[error("Surface offset {offset} is outside region '{editor_id}' (length {len})")]
    OffsetOutOfRange {
        editor_id: String,
        offset: usize,
        len: usize,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Step error: {0}")]
    Step(#[from] StepError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

pub type EditorResult<T> = Result<T, EditorError>;
