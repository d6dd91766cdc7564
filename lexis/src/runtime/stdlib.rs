//! Lexis Standard Library
//!
//! Builds the global nameset. Every entry is a const symbol holding a
//! builtin:
//! - Control builtins: `eval`, `protect`, `return`, `block`, `for`,
//!   `throw`, `try`, `lambda`, `gamma`
//! - Definitions: `const`, `trans`, `unref`
//! - A small prelude: `if`, `list`, `nameset`, `+`, `-`, `==`, `<`

use crate::complete;
use crate::quark::Quark;
use crate::runtime::control;
use crate::runtime::environment::NamesetRef;
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::evaluator::Evaluator;
use crate::runtime::execution_outcome::ExecutionOutcome;
use crate::runtime::localset::Localset;
use crate::runtime::symbol::Symbol;
use crate::runtime::values::{eval_arguments, resolve_qualifier, Arity, Builtin, Value};
use std::collections::HashMap;
use std::sync::Arc;

type NativeFn = fn(&Evaluator, &NamesetRef, &[Value]) -> RuntimeResult<ExecutionOutcome>;

pub struct StandardLibrary;

impl StandardLibrary {
    /// Creates the top-level nameset populated with every builtin.
    pub fn create_global_environment() -> NamesetRef {
        let mut table = HashMap::new();
        Self::load_control_functions(&mut table);
        Self::load_definition_functions(&mut table);
        Self::load_prelude_functions(&mut table);
        NamesetRef::new(Localset::from_bindings(table))
    }

    fn define(table: &mut HashMap<Quark, Value>, name: &str, arity: Arity, func: NativeFn) {
        let quark = Quark::intern(name);
        let builtin = Value::Builtin(Arc::new(Builtin::new(name, arity, func)));
        table.insert(
            quark,
            Value::Symbol(Arc::new(Symbol::with_value(quark, builtin, true))),
        );
    }

    fn load_control_functions(table: &mut HashMap<Quark, Value>) {
        Self::define(table, "eval", Arity::Fixed(1), control::eval);
        Self::define(table, "protect", Arity::Fixed(1), control::protect);
        Self::define(table, "return", Arity::Range(0, 1), control::return_);
        Self::define(table, "block", Arity::Fixed(1), control::block);
        Self::define(table, "for", Arity::Fixed(3), control::for_);
        Self::define(table, "throw", Arity::Range(0, 3), control::throw);
        Self::define(table, "try", Arity::Range(1, 2), control::try_);
        Self::define(table, "lambda", Arity::Range(2, 3), control::lambda);
        Self::define(table, "gamma", Arity::Range(2, 3), control::gamma);
    }

    fn load_definition_functions(table: &mut HashMap<Quark, Value>) {
        Self::define(table, "const", Arity::Fixed(2), Self::define_const);
        Self::define(table, "trans", Arity::Fixed(2), Self::define_trans);
        Self::define(table, "unref", Arity::Fixed(1), Self::undefine);
    }

    fn load_prelude_functions(table: &mut HashMap<Quark, Value>) {
        Self::define(table, "if", Arity::Range(2, 3), Self::if_);
        Self::define(table, "list", Arity::Variadic(0), Self::list);
        Self::define(table, "nameset", Arity::Range(0, 1), Self::nameset);
        Self::define(table, "+", Arity::Variadic(0), Self::add);
        Self::define(table, "-", Arity::Variadic(1), Self::subtract);
        Self::define(table, "==", Arity::Fixed(2), Self::equal);
        Self::define(table, "<", Arity::Fixed(2), Self::less_than);
    }

    // `(const name value)`
    fn define_const(
        evaluator: &Evaluator,
        nameset: &NamesetRef,
        args: &[Value],
    ) -> RuntimeResult<ExecutionOutcome> {
        let [name, form] = args else {
            return Err(control::arity_error("const", "2", args.len()));
        };
        let value = complete!(form.eval(evaluator, nameset));
        let value = match name {
            Value::Lexical(quark) => nameset.cdef(*quark, value)?,
            Value::Qualified(path) => {
                let (object, quark) = resolve_qualifier(nameset, path)?;
                object.cdef_attr(quark, value)?
            }
            other => return Err(Self::invalid_name("const", other)),
        };
        Ok(ExecutionOutcome::Complete(value))
    }

    // `(trans name value)`
    fn define_trans(
        evaluator: &Evaluator,
        nameset: &NamesetRef,
        args: &[Value],
    ) -> RuntimeResult<ExecutionOutcome> {
        let [name, form] = args else {
            return Err(control::arity_error("trans", "2", args.len()));
        };
        let value = complete!(form.eval(evaluator, nameset));
        let value = match name {
            Value::Lexical(quark) => nameset.vdef(*quark, value)?,
            Value::Qualified(path) => {
                let (object, quark) = resolve_qualifier(nameset, path)?;
                object.vdef_attr(quark, value)?
            }
            other => return Err(Self::invalid_name("trans", other)),
        };
        Ok(ExecutionOutcome::Complete(value))
    }

    // `(unref name)`
    fn undefine(
        _evaluator: &Evaluator,
        nameset: &NamesetRef,
        args: &[Value],
    ) -> RuntimeResult<ExecutionOutcome> {
        let [name] = args else {
            return Err(control::arity_error("unref", "1", args.len()));
        };
        let value = match name {
            Value::Lexical(quark) => nameset.udef(*quark)?,
            Value::Qualified(path) => {
                let (object, quark) = resolve_qualifier(nameset, path)?;
                object.udef_attr(quark)?
            }
            other => return Err(Self::invalid_name("unref", other)),
        };
        Ok(ExecutionOutcome::Complete(value))
    }

    fn invalid_name(operation: &str, object: &Value) -> RuntimeError {
        RuntimeError::Type(format!(
            "invalid object of type {} as name with {}",
            object.type_name(),
            operation
        ))
    }

    fn if_(evaluator: &Evaluator, nameset: &NamesetRef, args: &[Value]) -> RuntimeResult<ExecutionOutcome> {
        let (condition, then, otherwise) = match args {
            [condition, then] => (condition, then, None),
            [condition, then, otherwise] => (condition, then, Some(otherwise)),
            _ => return Err(control::arity_error("if", "2 or 3", args.len())),
        };
        if complete!(condition.eval(evaluator, nameset)).is_truthy() {
            then.eval(evaluator, nameset)
        } else {
            match otherwise {
                Some(otherwise) => otherwise.eval(evaluator, nameset),
                None => Ok(ExecutionOutcome::Complete(Value::Nil)),
            }
        }
    }

    fn list(evaluator: &Evaluator, nameset: &NamesetRef, args: &[Value]) -> RuntimeResult<ExecutionOutcome> {
        let items = complete!(eval_arguments(evaluator, nameset, args));
        Ok(ExecutionOutcome::Complete(Value::list(items)))
    }

    // `(nameset)` is a fresh root, `(nameset parent)` a child of `parent`
    fn nameset(evaluator: &Evaluator, nameset: &NamesetRef, args: &[Value]) -> RuntimeResult<ExecutionOutcome> {
        let argv = complete!(eval_arguments(evaluator, nameset, args));
        let created = match argv.as_slice() {
            [] => NamesetRef::new(Localset::new()),
            [Value::Nameset(parent)] => parent.child()?,
            [other] => {
                return Err(RuntimeError::Type(format!(
                    "invalid object of type {} as parent nameset",
                    other.type_name()
                )))
            }
            _ => return Err(control::arity_error("nameset", "0 or 1", argv.len())),
        };
        Ok(ExecutionOutcome::Complete(Value::Nameset(created)))
    }

    fn add(evaluator: &Evaluator, nameset: &NamesetRef, args: &[Value]) -> RuntimeResult<ExecutionOutcome> {
        let argv = complete!(eval_arguments(evaluator, nameset, args));
        let mut sum = Number::Integer(0);
        for value in &argv {
            sum = sum.add(Number::from_value("+", value)?)?;
        }
        Ok(ExecutionOutcome::Complete(sum.into()))
    }

    fn subtract(evaluator: &Evaluator, nameset: &NamesetRef, args: &[Value]) -> RuntimeResult<ExecutionOutcome> {
        let argv = complete!(eval_arguments(evaluator, nameset, args));
        let (first, rest) = argv
            .split_first()
            .ok_or_else(|| control::arity_error("-", "at least 1", 0))?;
        let first = Number::from_value("-", first)?;
        if rest.is_empty() {
            return Ok(ExecutionOutcome::Complete(Number::Integer(0).sub(first)?.into()));
        }
        let mut result = first;
        for value in rest {
            result = result.sub(Number::from_value("-", value)?)?;
        }
        Ok(ExecutionOutcome::Complete(result.into()))
    }

    fn equal(evaluator: &Evaluator, nameset: &NamesetRef, args: &[Value]) -> RuntimeResult<ExecutionOutcome> {
        let argv = complete!(eval_arguments(evaluator, nameset, args));
        let [left, right] = argv.as_slice() else {
            return Err(control::arity_error("==", "2", argv.len()));
        };
        let equal = match (Number::try_from_value(left), Number::try_from_value(right)) {
            (Some(a), Some(b)) => a.as_real() == b.as_real(),
            _ => left == right,
        };
        Ok(ExecutionOutcome::Complete(Value::Boolean(equal)))
    }

    fn less_than(evaluator: &Evaluator, nameset: &NamesetRef, args: &[Value]) -> RuntimeResult<ExecutionOutcome> {
        let argv = complete!(eval_arguments(evaluator, nameset, args));
        let [left, right] = argv.as_slice() else {
            return Err(control::arity_error("<", "2", argv.len()));
        };
        let less = match (Number::from_value("<", left)?, Number::from_value("<", right)?) {
            (Number::Integer(a), Number::Integer(b)) => a < b,
            (a, b) => a.as_real() < b.as_real(),
        };
        Ok(ExecutionOutcome::Complete(Value::Boolean(less)))
    }
}

#[derive(Debug, Clone, Copy)]
enum Number {
    Integer(i64),
    Real(f64),
}

impl Number {
    fn try_from_value(value: &Value) -> Option<Number> {
        match value {
            Value::Integer(i) => Some(Number::Integer(*i)),
            Value::Real(r) => Some(Number::Real(*r)),
            _ => None,
        }
    }

    fn from_value(operation: &str, value: &Value) -> RuntimeResult<Number> {
        Self::try_from_value(value).ok_or_else(|| {
            RuntimeError::Type(format!(
                "invalid object of type {} with {}",
                value.type_name(),
                operation
            ))
        })
    }

    fn as_real(self) -> f64 {
        match self {
            Number::Integer(i) => i as f64,
            Number::Real(r) => r,
        }
    }

    fn add(self, other: Number) -> RuntimeResult<Number> {
        match (self, other) {
            (Number::Integer(a), Number::Integer(b)) => a
                .checked_add(b)
                .map(Number::Integer)
                .ok_or_else(|| RuntimeError::Type("integer overflow with +".to_string())),
            (a, b) => Ok(Number::Real(a.as_real() + b.as_real())),
        }
    }

    fn sub(self, other: Number) -> RuntimeResult<Number> {
        match (self, other) {
            (Number::Integer(a), Number::Integer(b)) => a
                .checked_sub(b)
                .map(Number::Integer)
                .ok_or_else(|| RuntimeError::Type("integer overflow with -".to_string())),
            (a, b) => Ok(Number::Real(a.as_real() - b.as_real())),
        }
    }
}

impl From<Number> for Value {
    fn from(number: Number) -> Value {
        match number {
            Number::Integer(i) => Value::Integer(i),
            Number::Real(r) => Value::Real(r),
        }
    }
}
