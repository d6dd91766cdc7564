//! Execution outcome types for non-local return.
//!
//! Evaluation never unwinds for `return`: every evaluation site yields an
//! [`ExecutionOutcome`] and forwards [`ExecutionOutcome::Return`] until the
//! nearest closure application turns it back into a completed value.

use crate::runtime::values::Value;

/// Result of evaluating a form: a completed value, or a `return` escape
/// carrying its payload toward the enclosing closure call.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome<T = Value> {
    Complete(T),
    Return(Value),
}

impl<T> ExecutionOutcome<T> {
    pub fn is_return(&self) -> bool {
        matches!(self, ExecutionOutcome::Return(_))
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ExecutionOutcome<U> {
        match self {
            ExecutionOutcome::Complete(value) => ExecutionOutcome::Complete(f(value)),
            ExecutionOutcome::Return(payload) => ExecutionOutcome::Return(payload),
        }
    }
}

impl ExecutionOutcome<Value> {
    /// The completed value, or the payload of an escape that reached a
    /// catching boundary.
    pub fn into_value(self) -> Value {
        match self {
            ExecutionOutcome::Complete(value) | ExecutionOutcome::Return(value) => value,
        }
    }
}

/// Unwrap a `RuntimeResult<ExecutionOutcome<T>>` into its completed value,
/// forwarding errors with `?` and a `Return` escape as an early `Ok`.
#[macro_export]
macro_rules! complete {
    ($outcome:expr) => {
        match $outcome? {
            $crate::runtime::execution_outcome::ExecutionOutcome::Complete(value) => value,
            $crate::runtime::execution_outcome::ExecutionOutcome::Return(payload) => {
                return Ok($crate::runtime::execution_outcome::ExecutionOutcome::Return(payload))
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::error::RuntimeResult;

    fn forward(outcome: ExecutionOutcome) -> RuntimeResult<ExecutionOutcome<i64>> {
        let value = complete!(Ok::<_, crate::runtime::RuntimeError>(outcome));
        match value {
            Value::Integer(n) => Ok(ExecutionOutcome::Complete(n + 1)),
            _ => Ok(ExecutionOutcome::Complete(0)),
        }
    }

    #[test]
    fn complete_unwraps_values() {
        let result = forward(ExecutionOutcome::Complete(Value::Integer(41))).unwrap();
        assert_eq!(result, ExecutionOutcome::Complete(42));
    }

    #[test]
    fn complete_forwards_return() {
        let result = forward(ExecutionOutcome::Return(Value::Integer(7))).unwrap();
        assert_eq!(result, ExecutionOutcome::Return(Value::Integer(7)));
        assert!(result.is_return());
    }

    #[test]
    fn into_value_takes_either_arm() {
        assert_eq!(
            ExecutionOutcome::Return(Value::Boolean(true)).into_value(),
            Value::Boolean(true)
        );
        assert_eq!(
            ExecutionOutcome::Complete(Value::Nil).map(|_| 3),
            ExecutionOutcome::Complete(3)
        );
    }
}
