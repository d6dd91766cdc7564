// Closures: parameters, closed variables and a body form, applied through
// a fresh activation record on every call

use crate::complete;
use crate::quark::{Quark, QUARK_SELF};
use crate::runtime::args_list::ArgsList;
use crate::runtime::environment::NamesetRef;
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::evaluator::Evaluator;
use crate::runtime::execution_outcome::ExecutionOutcome;
use crate::runtime::localset::Localset;
use crate::runtime::multiset::Multiset;
use crate::runtime::param_binding::{bind_arguments, parse_closed_variables, parse_parameters};
use crate::runtime::sync::{read_lock, write_lock, ReentrantLock, ScopeGuard};
use crate::runtime::values::{eval_arguments, Method, Value};
use std::sync::{Arc, RwLock};

/// A callable value built by `lambda` or `gamma`.
///
/// A lambda links its activation record to the caller's nameset, so free
/// names resolve at the call site. A gamma links it to the global nameset.
#[derive(Debug)]
pub struct Closure {
    lambda: bool,
    state: RwLock<ClosureState>,
    closed: NamesetRef,
    apply_lock: ReentrantLock,
}

#[derive(Debug, Clone)]
struct ClosureState {
    params: ArgsList,
    form: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClosureMethod {
    LambdaP,
    GammaP,
    GetForm,
    SetForm,
    AddArgument,
    AddClosedVariable,
}

impl ClosureMethod {
    fn from_quark(quark: Quark) -> Option<Self> {
        match &*quark.name() {
            "lambda-p" => Some(ClosureMethod::LambdaP),
            "gamma-p" => Some(ClosureMethod::GammaP),
            "get-form" => Some(ClosureMethod::GetForm),
            "set-form" => Some(ClosureMethod::SetForm),
            "add-argument" => Some(ClosureMethod::AddArgument),
            "add-closed-variable" => Some(ClosureMethod::AddClosedVariable),
            _ => None,
        }
    }
}

impl Closure {
    /// An empty closure: no parameters, no closed variables, `nil` body.
    pub fn new(lambda: bool) -> Self {
        Closure {
            lambda,
            state: RwLock::new(ClosureState {
                params: ArgsList::new(),
                form: Value::Nil,
            }),
            closed: NamesetRef::new(Localset::new()),
            apply_lock: ReentrantLock::new(),
        }
    }

    /// Build a closure from raw specifications. Closed variables are
    /// evaluated now, in `nameset`, and captured as mutable bindings.
    pub fn from_spec(
        nameset: &NamesetRef,
        lambda: bool,
        params: &Value,
        closed: Option<&Value>,
        form: Value,
    ) -> RuntimeResult<Self> {
        let closure = Closure::new(lambda);
        for spec in parse_parameters(params)? {
            closure.add_argument(spec.quark(), spec.is_const())?;
        }
        if let Some(closed) = closed {
            for quark in parse_closed_variables(closed)? {
                closure.add_closed_variable(quark, nameset.eval(quark)?)?;
            }
        }
        closure.set_form(form)?;
        log::debug!(
            "built {} with arguments {}",
            if lambda { "lambda" } else { "gamma" },
            closure.arguments()?
        );
        Ok(closure)
    }

    pub fn is_lambda(&self) -> bool {
        self.lambda
    }

    pub fn is_gamma(&self) -> bool {
        !self.lambda
    }

    pub fn add_argument(&self, quark: Quark, constant: bool) -> RuntimeResult<()> {
        write_lock(&self.state)?.params.add(quark, constant)
    }

    pub fn add_closed_variable(&self, quark: Quark, value: Value) -> RuntimeResult<()> {
        self.closed.vdef(quark, value)?;
        Ok(())
    }

    pub fn closed_variables(&self) -> &NamesetRef {
        &self.closed
    }

    pub fn arguments(&self) -> RuntimeResult<ArgsList> {
        Ok(read_lock(&self.state)?.params.clone())
    }

    pub fn form(&self) -> RuntimeResult<Value> {
        Ok(read_lock(&self.state)?.form.clone())
    }

    pub fn set_form(&self, form: Value) -> RuntimeResult<()> {
        write_lock(&self.state)?.form = form;
        Ok(())
    }

    /// Call protocol: bind the actuals into a fresh activation record, link
    /// it, then evaluate the body. A `return` escaping the body completes
    /// the call. The record is reset on every exit path.
    ///
    /// The actuals are evaluated in the caller before the closure lock is
    /// taken, so only body evaluation is serialized per closure.
    pub fn apply(
        self: &Arc<Self>,
        evaluator: &Evaluator,
        nameset: &NamesetRef,
        args: &[Value],
    ) -> RuntimeResult<ExecutionOutcome> {
        let _depth = evaluator.enter_call()?;
        let ClosureState { params, form } = read_lock(&self.state)?.clone();
        if evaluator.config().trace_calls {
            log::trace!("apply {} {} to {} arguments", self.kind(), params, args.len());
        }

        let multiset = Arc::new(Multiset::new());
        let record = ScopeGuard::new(NamesetRef::from(Arc::clone(&multiset)));
        record.symcst(QUARK_SELF, Value::Closure(Arc::clone(self)))?;
        complete!(bind_arguments(&params, args, &record, |actual| {
            actual.eval(evaluator, nameset)
        }));

        let _lock = self.apply_lock.lock()?;
        let parent = if self.lambda {
            nameset.clone()
        } else {
            evaluator.global().clone()
        };
        multiset.linkset(parent, self.closed.clone())?;

        let result = form.eval(evaluator, &record)?.into_value();
        evaluator.post(&result);
        Ok(ExecutionOutcome::Complete(result))
    }

    /// Attribute lookup: closed variables first, then method quarks.
    pub fn eval_attr(self: &Arc<Self>, quark: Quark) -> RuntimeResult<Value> {
        let _lock = self.apply_lock.lock()?;
        if self.closed.exists(quark)? {
            return self.closed.eval(quark);
        }
        if ClosureMethod::from_quark(quark).is_some() {
            return Ok(Value::Method(Arc::new(Method {
                object: Value::Closure(Arc::clone(self)),
                quark,
            })));
        }
        Err(RuntimeError::Eval(format!(
            "unbound attribute {} in object of type closure",
            quark
        )))
    }

    pub fn cdef(&self, quark: Quark, value: Value) -> RuntimeResult<Value> {
        let _lock = self.apply_lock.lock()?;
        if self.closed.exists(quark)? {
            return self.closed.cdef(quark, value);
        }
        Err(self.not_closed("cdef", quark))
    }

    pub fn vdef(&self, quark: Quark, value: Value) -> RuntimeResult<Value> {
        let _lock = self.apply_lock.lock()?;
        if self.closed.exists(quark)? {
            return self.closed.vdef(quark, value);
        }
        Err(self.not_closed("vdef", quark))
    }

    pub fn udef(&self, quark: Quark) -> RuntimeResult<Value> {
        let _lock = self.apply_lock.lock()?;
        if self.closed.exists(quark)? {
            return self.closed.udef(quark);
        }
        Err(self.not_closed("udef", quark))
    }

    fn not_closed(&self, operation: &str, quark: Quark) -> RuntimeError {
        RuntimeError::Type(format!(
            "invalid {} of {}: not a closed variable of this {}",
            operation,
            quark,
            self.kind()
        ))
    }

    fn kind(&self) -> &'static str {
        if self.lambda {
            "lambda"
        } else {
            "gamma"
        }
    }

    pub fn apply_method(
        self: &Arc<Self>,
        evaluator: &Evaluator,
        nameset: &NamesetRef,
        quark: Quark,
        args: &[Value],
    ) -> RuntimeResult<ExecutionOutcome> {
        let method = ClosureMethod::from_quark(quark).ok_or_else(|| {
            RuntimeError::Eval(format!("invalid method {} for object of type closure", quark))
        })?;
        let argv = complete!(eval_arguments(evaluator, nameset, args));
        let _lock = self.apply_lock.lock()?;
        let result = match (method, argv.as_slice()) {
            (ClosureMethod::LambdaP, []) => Value::Boolean(self.lambda),
            (ClosureMethod::GammaP, []) => Value::Boolean(!self.lambda),
            (ClosureMethod::GetForm, []) => self.form()?,
            (ClosureMethod::SetForm, [form]) => {
                self.set_form(form.clone())?;
                Value::Nil
            }
            (ClosureMethod::AddArgument, [name]) => {
                self.add_argument(name_of(name)?, false)?;
                Value::Nil
            }
            (ClosureMethod::AddArgument, [name, Value::Boolean(constant)]) => {
                self.add_argument(name_of(name)?, *constant)?;
                Value::Nil
            }
            (ClosureMethod::AddClosedVariable, [name, value]) => {
                self.add_closed_variable(name_of(name)?, value.clone())?;
                Value::Nil
            }
            _ => {
                return Err(RuntimeError::Argument(format!(
                    "invalid arguments with closure method {}",
                    quark
                )))
            }
        };
        Ok(ExecutionOutcome::Complete(result))
    }
}

fn name_of(value: &Value) -> RuntimeResult<Quark> {
    match value {
        Value::String(name) => Ok(Quark::intern(name)),
        Value::Lexical(quark) => Ok(*quark),
        other => Err(RuntimeError::Type(format!(
            "invalid object of type {} as a name",
            other.type_name()
        ))),
    }
}

impl Drop for Closure {
    fn drop(&mut self) {
        if let Err(e) = self.closed.reset() {
            log::warn!("failed to reset closed variables: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quark::QUARK_ARGS;
    use crate::runtime::evaluator::Evaluator;
    use crate::runtime::values::{Arity, Builtin};
    use pretty_assertions::assert_eq;
    use std::sync::{mpsc, Mutex};
    use std::thread;
    use std::time::Duration;

    fn q(name: &str) -> Quark {
        Quark::intern(name)
    }

    fn call(evaluator: &Evaluator, closure: &Arc<Closure>, args: &[Value]) -> RuntimeResult<Value> {
        Value::Closure(Arc::clone(closure))
            .apply(evaluator, evaluator.global(), args)
            .map(ExecutionOutcome::into_value)
    }

    #[test]
    fn applies_body_over_bound_arguments() {
        let evaluator = Evaluator::new();
        let closure = Arc::new(Closure::new(true));
        closure.add_argument(q("x"), false).unwrap();
        closure.set_form(Value::lexical("x")).unwrap();
        assert_eq!(call(&evaluator, &closure, &[Value::Integer(5)]).unwrap(), Value::Integer(5));
    }

    #[test]
    fn self_is_bound_to_the_closure() {
        let evaluator = Evaluator::new();
        let closure = Arc::new(Closure::new(true));
        closure.set_form(Value::lexical("self")).unwrap();
        match call(&evaluator, &closure, &[]).unwrap() {
            Value::Closure(found) => assert!(Arc::ptr_eq(&found, &closure)),
            other => panic!("expected closure, got {:?}", other),
        }
    }

    #[test]
    fn closed_variables_are_captured_at_construction() {
        let evaluator = Evaluator::new();
        let global = evaluator.global();
        global.vdef(q("closure-captured"), Value::Integer(1)).unwrap();
        let closure = Arc::new(
            Closure::from_spec(
                global,
                true,
                &Value::Nil,
                Some(&Value::list(vec![Value::lexical("closure-captured")])),
                Value::lexical("closure-captured"),
            )
            .unwrap(),
        );
        global.vdef(q("closure-captured"), Value::Integer(2)).unwrap();
        assert_eq!(call(&evaluator, &closure, &[]).unwrap(), Value::Integer(1));

        // closed variables are attributes of the closure
        assert_eq!(closure.eval_attr(q("closure-captured")).unwrap(), Value::Integer(1));
        closure.vdef(q("closure-captured"), Value::Integer(3)).unwrap();
        assert_eq!(call(&evaluator, &closure, &[]).unwrap(), Value::Integer(3));
        assert!(matches!(
            closure.vdef(q("closure-not-closed"), Value::Nil),
            Err(RuntimeError::Type(_))
        ));
    }

    #[test]
    fn failed_capture_is_an_error() {
        let evaluator = Evaluator::new();
        let result = Closure::from_spec(
            evaluator.global(),
            true,
            &Value::Nil,
            Some(&Value::list(vec![Value::lexical("closure-nowhere")])),
            Value::Nil,
        );
        assert!(matches!(result, Err(RuntimeError::Eval(_))));
    }

    #[test]
    fn variadic_marker_must_be_last() {
        let closure = Closure::new(false);
        closure.add_argument(QUARK_ARGS, false).unwrap();
        assert!(matches!(
            closure.add_argument(q("closure-late"), false),
            Err(RuntimeError::Argument(_))
        ));
    }

    #[test]
    fn method_quarks_resolve_to_methods() {
        let evaluator = Evaluator::new();
        let closure = Arc::new(Closure::new(false));
        let method = closure.eval_attr(q("gamma-p")).unwrap();
        assert!(matches!(method, Value::Method(_)));
        let outcome = method.apply(&evaluator, evaluator.global(), &[]).unwrap();
        assert_eq!(outcome, ExecutionOutcome::Complete(Value::Boolean(true)));
        assert!(matches!(closure.eval_attr(q("no-such-method")), Err(RuntimeError::Eval(_))));

        let set_form = closure.eval_attr(q("set-form")).unwrap();
        set_form
            .apply(&evaluator, evaluator.global(), &[Value::Integer(4)])
            .unwrap();
        assert_eq!(closure.form().unwrap(), Value::Integer(4));
    }

    #[test]
    fn record_is_reset_after_a_failing_body() {
        let evaluator = Evaluator::new();
        let closure = Arc::new(Closure::new(true));
        closure.add_argument(q("x"), false).unwrap();
        closure.set_form(Value::lexical("closure-unbound")).unwrap();
        assert!(call(&evaluator, &closure, &[Value::Integer(1)]).is_err());
        // the lock was released: a second call proceeds from another thread
        let evaluator = Arc::new(evaluator);
        let handle = {
            let evaluator = Arc::clone(&evaluator);
            let closure = Arc::clone(&closure);
            std::thread::spawn(move || {
                closure.set_form(Value::lexical("x")).unwrap();
                call(&evaluator, &closure, &[Value::Integer(2)]).unwrap()
            })
        };
        assert_eq!(handle.join().unwrap(), Value::Integer(2));
    }

    #[test]
    fn actuals_are_evaluated_before_the_closure_lock() {
        let evaluator = Arc::new(Evaluator::new());
        let (sender, receiver) = mpsc::channel();
        let sender = Mutex::new(sender);
        let signal = Builtin::new("closure-signal", Arity::Fixed(0), move |_, _, _| {
            sender
                .lock()
                .map_err(|e| RuntimeError::Internal(e.to_string()))?
                .send(())
                .map_err(|e| RuntimeError::Internal(e.to_string()))?;
            Ok(ExecutionOutcome::Complete(Value::Integer(1)))
        });
        evaluator
            .global()
            .symcst(q("closure-signal"), Value::Builtin(Arc::new(signal)))
            .unwrap();

        let closure = Arc::new(Closure::new(true));
        closure.add_argument(q("x"), false).unwrap();
        closure.set_form(Value::lexical("x")).unwrap();

        let held = closure.apply_lock.lock().unwrap();
        let handle = {
            let evaluator = Arc::clone(&evaluator);
            let closure = Arc::clone(&closure);
            thread::spawn(move || {
                let actual = Value::list(vec![Value::lexical("closure-signal")]);
                call(&evaluator, &closure, &[actual]).unwrap()
            })
        };
        // the caller-side argument runs while another thread holds the body
        assert!(receiver.recv_timeout(Duration::from_secs(5)).is_ok());
        drop(held);
        assert_eq!(handle.join().unwrap(), Value::Integer(1));
    }

    #[test]
    fn a_parameter_cannot_rebind_self() {
        let evaluator = Evaluator::new();
        let closure = Arc::new(Closure::new(true));
        closure.add_argument(QUARK_SELF, false).unwrap();
        closure.set_form(Value::lexical("self")).unwrap();
        assert!(matches!(
            call(&evaluator, &closure, &[Value::Integer(5)]),
            Err(RuntimeError::Const(_))
        ));
    }
}
