// Runtime value system for Lexis

use crate::complete;
use crate::quark::Quark;
use crate::runtime::closure::Closure;
use crate::runtime::environment::NamesetRef;
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::evaluator::Evaluator;
use crate::runtime::execution_outcome::ExecutionOutcome;
use crate::runtime::symbol::Symbol;
use itertools::Itertools;
use std::fmt;
use std::sync::Arc;

// Remaining native stack below which evaluation moves to a fresh segment
const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

/// Every object the runtime manipulates.
///
/// Scalars are held by value. Everything that may be shared between
/// namesets, closures and threads is held behind an `Arc`.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    String(String),
    /// An unevaluated name.
    Lexical(Quark),
    /// An unevaluated `a:b:c` name.
    Qualified(Arc<[Quark]>),
    /// A non-empty sequence. The empty list is `Nil`.
    List(Arc<Vec<Value>>),
    Symbol(Arc<Symbol>),
    Closure(Arc<Closure>),
    Builtin(Arc<Builtin>),
    Method(Arc<Method>),
    Nameset(NamesetRef),
    Exception(Arc<Exception>),
}

impl Value {
    /// Builds a list value; an empty vector reads as `nil`.
    pub fn list(items: Vec<Value>) -> Value {
        if items.is_empty() {
            Value::Nil
        } else {
            Value::List(Arc::new(items))
        }
    }

    pub fn lexical(name: &str) -> Value {
        Value::Lexical(Quark::intern(name))
    }

    pub fn qualified(names: &[&str]) -> Value {
        Value::Qualified(names.iter().map(|name| Quark::intern(name)).collect())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::String(_) => "string",
            Value::Lexical(_) => "lexical",
            Value::Qualified(_) => "qualified",
            Value::List(_) => "list",
            Value::Symbol(_) => "symbol",
            Value::Closure(_) => "closure",
            Value::Builtin(_) => "builtin",
            Value::Method(_) => "method",
            Value::Nameset(nameset) => nameset.type_name(),
            Value::Exception(_) => "exception",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Boolean(false))
    }

    /// Elements of a list, `nil` being the empty list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::Nil => Some(&[]),
            Value::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// The object a binding stands for: a symbol cell yields its content.
    pub fn resolve(&self) -> RuntimeResult<Value> {
        match self {
            Value::Symbol(symbol) => symbol.value(),
            other => Ok(other.clone()),
        }
    }

    /// Object identity: pointer identity for shared objects, value identity
    /// for scalars.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Real(a), Value::Real(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Lexical(a), Value::Lexical(b)) => a == b,
            (Value::Qualified(a), Value::Qualified(b)) => Arc::ptr_eq(a, b),
            (Value::List(a), Value::List(b)) => Arc::ptr_eq(a, b),
            (Value::Symbol(a), Value::Symbol(b)) => Arc::ptr_eq(a, b),
            (Value::Closure(a), Value::Closure(b)) => Arc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => Arc::ptr_eq(a, b),
            (Value::Method(a), Value::Method(b)) => Arc::ptr_eq(a, b),
            (Value::Nameset(a), Value::Nameset(b)) => a.ptr_eq(b),
            (Value::Exception(a), Value::Exception(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Evaluate this object as a form in `nameset`.
    pub fn eval(&self, evaluator: &Evaluator, nameset: &NamesetRef) -> RuntimeResult<ExecutionOutcome> {
        // the call-depth limit is reached before the native stack runs out
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.eval_form(evaluator, nameset))
    }

    fn eval_form(&self, evaluator: &Evaluator, nameset: &NamesetRef) -> RuntimeResult<ExecutionOutcome> {
        match self {
            Value::Lexical(quark) => Ok(ExecutionOutcome::Complete(nameset.eval(*quark)?)),
            Value::Qualified(path) => {
                let (first, rest) = path
                    .split_first()
                    .ok_or_else(|| RuntimeError::Internal("empty qualified name".to_string()))?;
                let mut object = nameset.eval(*first)?;
                for quark in rest {
                    object = object.eval_attr(*quark)?;
                }
                Ok(ExecutionOutcome::Complete(object))
            }
            Value::Symbol(symbol) => Ok(ExecutionOutcome::Complete(symbol.value()?)),
            Value::List(form) => {
                let (head, args) = form
                    .split_first()
                    .ok_or_else(|| RuntimeError::Internal("empty form".to_string()))?;
                let callable = complete!(head.eval(evaluator, nameset));
                callable.apply(evaluator, nameset, args)
            }
            literal => Ok(ExecutionOutcome::Complete(literal.clone())),
        }
    }

    /// Apply this object to unevaluated arguments in the caller's nameset.
    pub fn apply(
        &self,
        evaluator: &Evaluator,
        nameset: &NamesetRef,
        args: &[Value],
    ) -> RuntimeResult<ExecutionOutcome> {
        match self {
            Value::Closure(closure) => closure.apply(evaluator, nameset, args),
            Value::Builtin(builtin) => builtin.call(evaluator, nameset, args),
            Value::Method(method) => {
                method
                    .object
                    .apply_method(evaluator, nameset, method.quark, args)
            }
            other => Err(RuntimeError::Type(format!(
                "object of type {} is not callable",
                other.type_name()
            ))),
        }
    }

    /// Resolve `quark` as an attribute of this object.
    pub fn eval_attr(&self, quark: Quark) -> RuntimeResult<Value> {
        match self {
            Value::Nameset(nameset) => nameset.eval(quark),
            Value::Closure(closure) => closure.eval_attr(quark),
            Value::Exception(exception) => exception.attribute(quark),
            other => Err(RuntimeError::Eval(format!(
                "unbound attribute {} in object of type {}",
                quark,
                other.type_name()
            ))),
        }
    }

    pub fn apply_method(
        &self,
        evaluator: &Evaluator,
        nameset: &NamesetRef,
        quark: Quark,
        args: &[Value],
    ) -> RuntimeResult<ExecutionOutcome> {
        match self {
            Value::Closure(closure) => closure.apply_method(evaluator, nameset, quark, args),
            other => Err(RuntimeError::Eval(format!(
                "invalid method {} for object of type {}",
                quark,
                other.type_name()
            ))),
        }
    }

    /// Define-const `quark` inside this object.
    pub fn cdef_attr(&self, quark: Quark, value: Value) -> RuntimeResult<Value> {
        match self {
            Value::Nameset(nameset) => nameset.cdef(quark, value),
            Value::Closure(closure) => closure.cdef(quark, value),
            other => Err(not_a_container("cdef", quark, other)),
        }
    }

    pub fn vdef_attr(&self, quark: Quark, value: Value) -> RuntimeResult<Value> {
        match self {
            Value::Nameset(nameset) => nameset.vdef(quark, value),
            Value::Closure(closure) => closure.vdef(quark, value),
            other => Err(not_a_container("vdef", quark, other)),
        }
    }

    pub fn udef_attr(&self, quark: Quark) -> RuntimeResult<Value> {
        match self {
            Value::Nameset(nameset) => nameset.udef(quark),
            Value::Closure(closure) => closure.udef(quark),
            other => Err(not_a_container("udef", quark, other)),
        }
    }

    /// A cursor over the elements of an iterable object.
    pub fn make_iterator(&self) -> RuntimeResult<ValueIter> {
        match self {
            Value::Nil => Ok(ValueIter::new(Arc::new(Vec::new()))),
            Value::List(items) => Ok(ValueIter::new(Arc::clone(items))),
            Value::String(text) => Ok(ValueIter::new(Arc::new(
                text.chars().map(|c| Value::String(c.to_string())).collect(),
            ))),
            other => Err(RuntimeError::Type(format!(
                "object of type {} is not iterable",
                other.type_name()
            ))),
        }
    }
}

fn not_a_container(operation: &str, quark: Quark, object: &Value) -> RuntimeError {
    RuntimeError::Type(format!(
        "invalid {} of {} in object of type {}",
        operation,
        quark,
        object.type_name()
    ))
}

/// Evaluate every argument in order, forwarding a `Return` raised by any of
/// them.
pub fn eval_arguments(
    evaluator: &Evaluator,
    nameset: &NamesetRef,
    args: &[Value],
) -> RuntimeResult<ExecutionOutcome<Vec<Value>>> {
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        values.push(complete!(arg.eval(evaluator, nameset)));
    }
    Ok(ExecutionOutcome::Complete(values))
}

/// Split a qualified path into the object named by its qualifier and the
/// final quark.
pub fn resolve_qualifier(nameset: &NamesetRef, path: &[Quark]) -> RuntimeResult<(Value, Quark)> {
    let (last, qualifier) = path
        .split_last()
        .ok_or_else(|| RuntimeError::Internal("empty qualified name".to_string()))?;
    let (first, rest) = qualifier.split_first().ok_or_else(|| {
        RuntimeError::Eval(format!("qualified name {} has no qualifier", last))
    })?;
    let mut object = nameset.eval(*first)?;
    for quark in rest {
        object = object.eval_attr(*quark)?;
    }
    Ok((object, *last))
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Real(a), Value::Real(b)) => a == b,
            (Value::Qualified(a), Value::Qualified(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Exception(a), Value::Exception(b)) => a == b,
            (a, b) => a.same(b),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{:?}", r),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Lexical(quark) => write!(f, "{}", quark),
            Value::Qualified(path) => write!(f, "{}", path.iter().join(":")),
            Value::List(items) => write!(f, "({})", items.iter().join(" ")),
            Value::Symbol(symbol) => write!(f, "#<symbol {}>", symbol.quark()),
            Value::Closure(closure) => {
                let kind = if closure.is_lambda() { "lambda" } else { "gamma" };
                write!(f, "#<{}>", kind)
            }
            Value::Builtin(builtin) => write!(f, "#<builtin {}>", builtin.name),
            Value::Method(method) => write!(f, "#<method {}>", method.quark),
            Value::Nameset(nameset) => write!(f, "#<{}>", nameset.type_name()),
            Value::Exception(exception) => write!(f, "#<exception {}>", exception),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(r: f64) -> Self {
        Value::Real(r)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// The program's view of a typed failure.
#[derive(Debug, Clone, PartialEq)]
pub struct Exception {
    pub eid: String,
    pub reason: Option<String>,
    pub payload: Value,
}

impl Exception {
    pub fn new(eid: impl Into<String>, reason: Option<String>, payload: Value) -> Self {
        Exception {
            eid: eid.into(),
            reason,
            payload,
        }
    }

    pub fn attribute(&self, quark: Quark) -> RuntimeResult<Value> {
        match &*quark.name() {
            "eid" => Ok(Value::String(self.eid.clone())),
            "reason" => Ok(self
                .reason
                .clone()
                .map(Value::String)
                .unwrap_or(Value::Nil)),
            "object" => Ok(self.payload.clone()),
            _ => Err(RuntimeError::Eval(format!(
                "unbound attribute {} in object of type exception",
                quark
            ))),
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "{}: {}", self.eid, reason),
            None => write!(f, "{}", self.eid),
        }
    }
}

/// Number of arguments a builtin accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    /// Inclusive bounds.
    Range(usize, usize),
    /// At least this many.
    Variadic(usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Fixed(n) => count == n,
            Arity::Range(min, max) => (min..=max).contains(&count),
            Arity::Variadic(min) => count >= min,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Fixed(n) => write!(f, "{}", n),
            Arity::Range(min, max) => write!(f, "between {} and {}", min, max),
            Arity::Variadic(min) => write!(f, "at least {}", min),
        }
    }
}

pub type BuiltinFn =
    dyn Fn(&Evaluator, &NamesetRef, &[Value]) -> RuntimeResult<ExecutionOutcome> + Send + Sync;

/// A native operation. It receives its arguments unevaluated.
#[derive(Clone)]
pub struct Builtin {
    pub name: String,
    pub arity: Arity,
    pub func: Arc<BuiltinFn>,
}

impl Builtin {
    pub fn new<F>(name: &str, arity: Arity, func: F) -> Self
    where
        F: Fn(&Evaluator, &NamesetRef, &[Value]) -> RuntimeResult<ExecutionOutcome>
            + Send
            + Sync
            + 'static,
    {
        Builtin {
            name: name.to_string(),
            arity,
            func: Arc::new(func),
        }
    }

    pub fn call(
        &self,
        evaluator: &Evaluator,
        nameset: &NamesetRef,
        args: &[Value],
    ) -> RuntimeResult<ExecutionOutcome> {
        if !self.arity.accepts(args.len()) {
            return Err(RuntimeError::Argument(format!(
                "{} expects {} arguments, got {}",
                self.name,
                self.arity,
                args.len()
            )));
        }
        (self.func)(evaluator, nameset, args)
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

/// An object bound to one of its method quarks, e.g. `f:set-form`.
#[derive(Debug, Clone)]
pub struct Method {
    pub object: Value,
    pub quark: Quark,
}

/// Cursor over an iterable object, as consumed by `for`.
#[derive(Debug, Clone)]
pub struct ValueIter {
    items: Arc<Vec<Value>>,
    position: usize,
}

impl ValueIter {
    fn new(items: Arc<Vec<Value>>) -> Self {
        ValueIter { items, position: 0 }
    }

    pub fn is_end(&self) -> bool {
        self.position >= self.items.len()
    }

    /// The element under the cursor, `nil` past the end.
    pub fn current(&self) -> Value {
        self.items.get(self.position).cloned().unwrap_or(Value::Nil)
    }

    pub fn advance(&mut self) {
        if !self.is_end() {
            self.position += 1;
        }
    }
}
