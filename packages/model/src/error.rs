use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while building a [`Schema`](crate::Schema).
///
/// All of these are configuration errors: they surface at construction time
/// and are never recovered from.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Duplicate node kind '{0}'")]
    DuplicateNode(String),

    #[error("Duplicate mark kind '{0}'")]
    DuplicateMark(String),

    #[error("Schema is missing the '{0}' node kind")]
    MissingNode(String),

    #[error("Unknown node kind or group '{name}' in content expression '{expr}'")]
    UnknownContentName { expr: String, name: String },

    #[error("Unknown mark kind or group '{name}' referenced by '{owner}'")]
    UnknownMark { owner: String, name: String },

    #[error("Invalid content expression '{expr}' at {pos}: {message}")]
    InvalidExpression {
        expr: String,
        pos: usize,
        message: String,
    },

    #[error("Content expression '{0}' mixes inline and block content")]
    MixedContent(String),
}

impl SchemaError {
    pub fn invalid_expression(expr: &str, pos: usize, message: impl Into<String>) -> Self {
        Self::InvalidExpression {
            expr: expr.to_string(),
            pos,
            message: message.into(),
        }
    }
}

/// Errors raised by document operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Unknown node kind '{0}'")]
    UnknownNode(String),

    #[error("Unknown mark kind '{0}'")]
    UnknownMark(String),

    #[error("No value supplied for required attribute '{attr}' of '{kind}'")]
    MissingAttr { kind: String, attr: String },

    #[error("Invalid content for node '{0}'")]
    InvalidContent(String),

    #[error("Mark '{mark}' is not allowed in '{node}'")]
    MarkNotAllowed { mark: String, node: String },

    #[error("Empty text nodes are not allowed")]
    EmptyText,

    #[error("Position {pos} out of range (size {size})")]
    OutOfRange { pos: usize, size: usize },

    #[error("Replace failed: {0}")]
    Replace(String),

    #[error("Invalid document JSON: {0}")]
    Json(String),
}

impl ModelError {
    pub fn replace(message: impl Into<String>) -> Self {
        Self::Replace(message.into())
    }

    pub fn out_of_range(pos: usize, size: usize) -> Self {
        Self::OutOfRange { pos, size }
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}
