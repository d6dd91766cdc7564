// Control builtins: evaluation, non-local return, scoping, iteration and
// exceptions

use crate::complete;
use crate::quark::QUARK_WHAT;
use crate::runtime::closure::Closure;
use crate::runtime::environment::NamesetRef;
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::evaluator::Evaluator;
use crate::runtime::execution_outcome::ExecutionOutcome;
use crate::runtime::sync::ScopeGuard;
use crate::runtime::values::{eval_arguments, Exception, Value, ValueIter};
use std::sync::Arc;

pub(crate) fn arity_error(name: &str, expected: &str, got: usize) -> RuntimeError {
    RuntimeError::Argument(format!(
        "{} expects {} arguments, got {}",
        name, expected, got
    ))
}

/// Evaluate, then re-evaluate the result until a fixed point or `nil`.
pub fn eval(evaluator: &Evaluator, nameset: &NamesetRef, args: &[Value]) -> RuntimeResult<ExecutionOutcome> {
    let [form] = args else {
        return Err(arity_error("eval", "1", args.len()));
    };
    let mut object = complete!(form.eval(evaluator, nameset));
    while !object.is_nil() {
        let next = complete!(object.eval(evaluator, nameset));
        if next.same(&object) {
            break;
        }
        object = next;
    }
    Ok(ExecutionOutcome::Complete(object))
}

pub fn protect(_evaluator: &Evaluator, _nameset: &NamesetRef, args: &[Value]) -> RuntimeResult<ExecutionOutcome> {
    let [form] = args else {
        return Err(arity_error("protect", "1", args.len()));
    };
    Ok(ExecutionOutcome::Complete(form.clone()))
}

pub fn return_(evaluator: &Evaluator, nameset: &NamesetRef, args: &[Value]) -> RuntimeResult<ExecutionOutcome> {
    match args {
        [] => Ok(ExecutionOutcome::Return(Value::Nil)),
        [form] => {
            let payload = complete!(form.eval(evaluator, nameset));
            Ok(ExecutionOutcome::Return(payload))
        }
        _ => Err(RuntimeError::Argument(
            "too many arguments with return".to_string(),
        )),
    }
}

/// Evaluate a form in a child scope released on every exit path.
pub fn block(evaluator: &Evaluator, nameset: &NamesetRef, args: &[Value]) -> RuntimeResult<ExecutionOutcome> {
    let [form] = args else {
        return Err(arity_error("block", "1", args.len()));
    };
    let scope = ScopeGuard::new(nameset.child()?);
    form.eval(evaluator, &scope)
}

/// `(for (names...) (iterables...) body)`: step every iterator in lockstep
/// until the shortest one ends.
pub fn for_(evaluator: &Evaluator, nameset: &NamesetRef, args: &[Value]) -> RuntimeResult<ExecutionOutcome> {
    let [symbols, iterables, body] = args else {
        return Err(arity_error("for", "3", args.len()));
    };
    let names = symbols.as_list().ok_or_else(|| {
        RuntimeError::Type(format!(
            "invalid object of type {} as for symbol list",
            symbols.type_name()
        ))
    })?;
    let sources = iterables.as_list().ok_or_else(|| {
        RuntimeError::Type(format!(
            "invalid object of type {} as for iterable list",
            iterables.type_name()
        ))
    })?;
    if names.len() != sources.len() {
        return Err(RuntimeError::Argument(
            "for symbol and iterable lists differ in length".to_string(),
        ));
    }
    if names.is_empty() {
        return Err(RuntimeError::Argument("empty for symbol list".to_string()));
    }

    let mut iterators: Vec<ValueIter> = Vec::with_capacity(sources.len());
    for source in sources {
        let object = complete!(source.eval(evaluator, nameset));
        iterators.push(object.make_iterator()?);
    }

    let scope = ScopeGuard::new(nameset.child()?);
    let mut cells = Vec::with_capacity(names.len());
    for name in names {
        let quark = match name {
            Value::Lexical(quark) => *quark,
            other => {
                return Err(RuntimeError::Type(format!(
                    "invalid object of type {} as for symbol",
                    other.type_name()
                )))
            }
        };
        cells.push(scope.symdef(quark, Value::Nil)?);
    }

    let mut result = Value::Nil;
    while !iterators.iter().any(ValueIter::is_end) {
        for (cell, iterator) in cells.iter().zip(iterators.iter_mut()) {
            cell.set_value(iterator.current())?;
            iterator.advance();
        }
        result = complete!(body.eval(evaluator, &scope));
    }
    Ok(ExecutionOutcome::Complete(result))
}

/// Raise an exception built from the evaluated arguments.
pub fn throw(evaluator: &Evaluator, nameset: &NamesetRef, args: &[Value]) -> RuntimeResult<ExecutionOutcome> {
    let argv = complete!(eval_arguments(evaluator, nameset, args));
    let exception = match argv.as_slice() {
        [] => Exception::new("user-exception", None, Value::Nil),
        [Value::Exception(exception)] => (**exception).clone(),
        [Value::String(eid)] => Exception::new(eid.as_str(), None, Value::Nil),
        [Value::String(eid), Value::String(reason)] => {
            Exception::new(eid.as_str(), Some(reason.clone()), Value::Nil)
        }
        [Value::String(eid), Value::String(reason), payload] => {
            Exception::new(eid.as_str(), Some(reason.clone()), payload.clone())
        }
        [_] | [_, _] | [_, _, _] => {
            return Err(RuntimeError::Type(
                "invalid object with throw, exception id and reason must be strings".to_string(),
            ))
        }
        _ => return Err(arity_error("throw", "at most 3", argv.len())),
    };
    Err(RuntimeError::Exception(exception))
}

/// `(try form [handler])`. A `return` is never caught. A typed failure
/// yields its payload, or runs the handler with the exception bound to
/// `what`. An internal failure yields `nil`, or reaches the handler as an
/// `internal-error` exception.
pub fn try_(evaluator: &Evaluator, nameset: &NamesetRef, args: &[Value]) -> RuntimeResult<ExecutionOutcome> {
    match args {
        [form] => match form.eval(evaluator, nameset) {
            Ok(outcome) => Ok(outcome),
            Err(error) => match error.to_exception() {
                Some(exception) => Ok(ExecutionOutcome::Complete(exception.payload)),
                None => {
                    log::debug!("try absorbed an internal failure: {}", error);
                    Ok(ExecutionOutcome::Complete(Value::Nil))
                }
            },
        },
        [form, handler] => match form.eval(evaluator, nameset) {
            Ok(outcome) => Ok(outcome),
            Err(error) => {
                let exception = error.to_exception().unwrap_or_else(|| {
                    log::debug!("try caught an internal failure: {}", error);
                    Exception::new("internal-error", Some(error.to_string()), Value::Nil)
                });
                let scope = ScopeGuard::new(nameset.child()?);
                scope.symcst(QUARK_WHAT, Value::Exception(Arc::new(exception)))?;
                handler.eval(evaluator, &scope)
            }
        },
        _ => Err(arity_error("try", "1 or 2", args.len())),
    }
}

fn closure(lambda: bool, nameset: &NamesetRef, args: &[Value]) -> RuntimeResult<ExecutionOutcome> {
    let closure = match args {
        [params, form] => Closure::from_spec(nameset, lambda, params, None, form.clone())?,
        [params, closed, form] => {
            Closure::from_spec(nameset, lambda, params, Some(closed), form.clone())?
        }
        _ => {
            let name = if lambda { "lambda" } else { "gamma" };
            return Err(arity_error(name, "2 or 3", args.len()));
        }
    };
    Ok(ExecutionOutcome::Complete(Value::Closure(Arc::new(closure))))
}

pub fn lambda(_evaluator: &Evaluator, nameset: &NamesetRef, args: &[Value]) -> RuntimeResult<ExecutionOutcome> {
    closure(true, nameset, args)
}

pub fn gamma(_evaluator: &Evaluator, nameset: &NamesetRef, args: &[Value]) -> RuntimeResult<ExecutionOutcome> {
    closure(false, nameset, args)
}
