//! Error Types
//!
//! Two families of errors exist in the runtime:
//!
//! - [`ReactiveError`]: raised by the reactive core itself. Mutation-policy
//!   violations (writing while frozen, sealed, or during a computed
//!   evaluation) are always returned synchronously to the caller of the write.
//! - [`EvalError`]: raised by the binding layer (expressions and templates).
//!   These are caught at the binding boundary, logged, and replaced with a
//!   safe default so one broken binding cannot halt the rest of the tree.

use thiserror::Error;

/// Errors produced by the reactive core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    /// The owning runtime is frozen (user-toggled read-only).
    #[error("cannot write `{key}`: owner is frozen")]
    Frozen { key: String },

    /// The owning runtime is sealed (externally suspended).
    #[error("cannot write `{key}`: owner is sealed")]
    Sealed { key: String },

    /// A write was attempted while a computed value was being derived.
    #[error("cannot write `{key}` while computing `{computed}`: computed values must be pure")]
    ComputedWrite { computed: String, key: String },

    /// The owning runtime has been torn down.
    #[error("cannot write `{key}`: owner has been destroyed")]
    Destroyed { key: String },

    /// No derivation is registered under this name.
    #[error("no computed value registered as `{0}`")]
    UnknownComputed(String),

    /// Index-based write past what the operation allows.
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// An operation was applied to the wrong kind of container.
    #[error("`{operation}` is not supported on a {kind}")]
    WrongKind {
        operation: &'static str,
        kind: &'static str,
    },

    /// Configuration could not be parsed.
    #[error("invalid runtime configuration: {0}")]
    Config(String),
}

/// Errors produced while evaluating a binding expression or template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("undefined variable `{0}`")]
    UndefinedVariable(String),

    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Reactive(#[from] ReactiveError),
}

impl EvalError {
    /// Build a free-form evaluation error.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

/// Result alias used throughout the reactive core.
pub type Result<T, E = ReactiveError> = std::result::Result<T, E>;
