//! Error type for filter compilation.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced while decoding or compiling a filter tree.
///
/// None of these are transient: they describe malformed input or a
/// misconfigured [`SqlConfig`](crate::SqlConfig), so retrying the same
/// compilation will fail the same way.
#[derive(Debug, Error)]
pub enum Error {
    /// The leaf field was rejected by the whitelist.
    #[error("field name is not in whitelist: {field}")]
    FieldNotWhitelisted { field: String },

    /// The operator is neither built in nor registered as a custom operation.
    #[error("unknown operation: {operator}")]
    UnknownOperator { operator: String },

    /// The leaf names a predicate that is not registered.
    #[error("unknown predicate: {predicate}")]
    UnknownPredicate { predicate: String },

    /// A range operator received no usable bounds.
    #[error("wrong number of parameters for {operator} operation: expected {expected}, got {actual}")]
    WrongArity {
        operator: String,
        expected: usize,
        actual: usize,
    },

    /// A JSON field reference declares a cast type that is not a plain identifier.
    #[error("invalid type '{ty}' in JSON field reference: {field}")]
    InvalidJsonType { field: String, ty: String },

    /// A custom operation or predicate rejected its input.
    #[error("{operator}: {message}")]
    Operation { operator: String, message: String },

    /// The filter payload could not be decoded.
    #[error("can't parse filter: {0}")]
    Decode(#[from] serde_json::Error),
}

impl Error {
    /// Build an [`Error::Operation`] from inside a custom handler.
    pub fn operation(operator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Operation {
            operator: operator.into(),
            message: message.into(),
        }
    }
}
