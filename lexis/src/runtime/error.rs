// Error handling for the Lexis runtime

use crate::parser::ParseError;
use crate::runtime::values::{Exception, Value};
use thiserror::Error;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Runtime errors that can occur while resolving names or applying closures.
///
/// Every variant except [`RuntimeError::Internal`] is typed: it is visible to
/// the interpreted program as an exception value with a stable id.
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    /// Wrong arity or malformed parameter / closed-variable specification
    #[error("argument error: {0}")]
    Argument(String),

    /// Wrong dynamic type of an evaluated operand
    #[error("type error: {0}")]
    Type(String),

    /// Argument list access out of bounds
    #[error("index error: index {index} is not in range [0, {length})")]
    Index { index: usize, length: usize },

    /// Argument list lookup miss
    #[error("quark error: {0}")]
    Quark(String),

    /// Reserved name rebind or self-parenting
    #[error("nameset error: {0}")]
    Nameset(String),

    /// Unbound symbol during resolution
    #[error("eval error: {0}")]
    Eval(String),

    /// Mutation of a const symbol
    #[error("const error: {0}")]
    Const(String),

    /// Closure application nested deeper than the configured limit
    #[error("recursion error: {0}")]
    Recursion(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Exception raised by the interpreted program
    #[error("{0}")]
    Exception(Exception),

    /// Internal runtime failure, e.g. a poisoned lock
    #[error("internal error: {0}")]
    Internal(String),
}

impl RuntimeError {
    /// Stable exception id of a typed error, `None` for internal failures.
    pub fn eid(&self) -> Option<&str> {
        match self {
            RuntimeError::Argument(_) => Some("argument-error"),
            RuntimeError::Type(_) => Some("type-error"),
            RuntimeError::Index { .. } => Some("index-error"),
            RuntimeError::Quark(_) => Some("quark-error"),
            RuntimeError::Nameset(_) => Some("nameset-error"),
            RuntimeError::Eval(_) => Some("eval-error"),
            RuntimeError::Const(_) => Some("const-error"),
            RuntimeError::Recursion(_) => Some("recursion-error"),
            RuntimeError::Parse(_) => Some("syntax-error"),
            RuntimeError::Exception(e) => Some(&e.eid),
            RuntimeError::Internal(_) => None,
        }
    }

    /// Convert a typed error to the exception value seen by `try`.
    pub fn to_exception(&self) -> Option<Exception> {
        let reason = match self {
            RuntimeError::Exception(e) => return Some(e.clone()),
            RuntimeError::Internal(_) => return None,
            RuntimeError::Argument(m)
            | RuntimeError::Type(m)
            | RuntimeError::Quark(m)
            | RuntimeError::Nameset(m)
            | RuntimeError::Eval(m)
            | RuntimeError::Const(m)
            | RuntimeError::Recursion(m) => m.clone(),
            RuntimeError::Index { index, length } => {
                format!("index {} is not in range [0, {})", index, length)
            }
            RuntimeError::Parse(e) => e.to_string(),
        };
        let eid = self.eid()?;
        Some(Exception::new(eid, Some(reason), Value::Nil))
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, RuntimeError::Internal(_))
    }
}
