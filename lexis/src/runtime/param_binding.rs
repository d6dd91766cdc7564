use crate::complete;
use crate::quark::{Quark, QUARK_ARGS, QUARK_CONST};
use crate::runtime::args_list::ArgsList;
use crate::runtime::environment::NamesetRef;
use crate::runtime::execution_outcome::ExecutionOutcome;
use crate::runtime::{RuntimeError, RuntimeResult, Value};

/// One parsed element of a parameter specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSpec {
    Name(Quark),
    Const(Quark),
    Variadic { constant: bool },
}

impl ParamSpec {
    pub fn quark(&self) -> Quark {
        match self {
            ParamSpec::Name(quark) | ParamSpec::Const(quark) => *quark,
            ParamSpec::Variadic { .. } => QUARK_ARGS,
        }
    }

    pub fn is_const(&self) -> bool {
        match self {
            ParamSpec::Name(_) => false,
            ParamSpec::Const(_) => true,
            ParamSpec::Variadic { constant } => *constant,
        }
    }
}

/// Parse `nil` or a list of names, `(const name)` pairs and strings.
pub fn parse_parameters(spec: &Value) -> RuntimeResult<Vec<ParamSpec>> {
    let elements = spec.as_list().ok_or_else(|| {
        RuntimeError::Argument(format!(
            "invalid object of type {} as argument list",
            spec.type_name()
        ))
    })?;
    elements.iter().map(parse_parameter).collect()
}

fn parse_parameter(element: &Value) -> RuntimeResult<ParamSpec> {
    match element {
        Value::Lexical(quark) => Ok(param(*quark, false)),
        Value::String(name) => Ok(param(Quark::intern(name), false)),
        Value::List(pair) => match pair.as_slice() {
            [Value::Lexical(tag), Value::Lexical(quark)] if *tag == QUARK_CONST => {
                Ok(param(*quark, true))
            }
            _ => Err(RuntimeError::Argument(format!(
                "invalid argument pair {}",
                element
            ))),
        },
        other => Err(RuntimeError::Argument(format!(
            "invalid object of type {} as argument",
            other.type_name()
        ))),
    }
}

fn param(quark: Quark, constant: bool) -> ParamSpec {
    if quark == QUARK_ARGS {
        ParamSpec::Variadic { constant }
    } else if constant {
        ParamSpec::Const(quark)
    } else {
        ParamSpec::Name(quark)
    }
}

/// Parse `nil` or a list of closed-variable names.
pub fn parse_closed_variables(spec: &Value) -> RuntimeResult<Vec<Quark>> {
    let elements = spec.as_list().ok_or_else(|| {
        RuntimeError::Argument(format!(
            "invalid object of type {} as closed variable list",
            spec.type_name()
        ))
    })?;
    elements
        .iter()
        .map(|element| match element {
            Value::Lexical(quark) => Ok(*quark),
            Value::String(name) => Ok(Quark::intern(name)),
            other => Err(RuntimeError::Argument(format!(
                "invalid object of type {} as closed variable",
                other.type_name()
            ))),
        })
        .collect()
}

/// Bind the actual arguments of a call into an activation record.
///
/// Each actual is evaluated through `eval_cb` in the caller's scope. Fixed
/// slots are filled in order, surplus actuals go to the variadic slot as a
/// list, and a variadic slot with nothing left binds `nil`. A `Return`
/// raised by an actual belongs to the caller and is forwarded unchanged.
pub fn bind_arguments<F>(
    params: &ArgsList,
    actuals: &[Value],
    record: &NamesetRef,
    mut eval_cb: F,
) -> RuntimeResult<ExecutionOutcome<()>>
where
    F: FnMut(&Value) -> RuntimeResult<ExecutionOutcome>,
{
    let variadic = params.is_variadic();
    let fixed = if variadic { params.len() - 1 } else { params.len() };

    if actuals.len() < fixed {
        return Err(RuntimeError::Argument("missing arguments at call".to_string()));
    }
    if actuals.len() > fixed && !variadic {
        return Err(RuntimeError::Argument("too many arguments at call".to_string()));
    }

    for (index, actual) in actuals.iter().take(fixed).enumerate() {
        let value = complete!(eval_cb(actual));
        record.symset(params.quark_at(index)?, params.const_at(index)?, value)?;
    }

    if variadic {
        let mut rest = Vec::with_capacity(actuals.len() - fixed);
        for actual in &actuals[fixed..] {
            rest.push(complete!(eval_cb(actual)));
        }
        record.symset(QUARK_ARGS, params.const_at(fixed)?, Value::list(rest))?;
    }
    Ok(ExecutionOutcome::Complete(()))
}
