// Namesets: environment frames and the scope chain used for name resolution

use crate::quark::{Quark, QUARK_THIS, QUARK_WHOM};
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::localset::Localset;
use crate::runtime::symbol::Symbol;
use crate::runtime::values::Value;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// A quark to object table with a parent link.
///
/// Implementations only provide the local table operations and the parent
/// slot. Recursive resolution and the define/undefine protocol live on
/// [`NamesetRef`], which is how every nameset is shared.
pub trait Nameset: fmt::Debug + Send + Sync {
    fn type_name(&self) -> &'static str;

    /// Insert or overwrite a local binding.
    fn bind(&self, quark: Quark, object: Value) -> RuntimeResult<()>;

    fn exists(&self, quark: Quark) -> RuntimeResult<bool>;

    fn get(&self, quark: Quark) -> RuntimeResult<Option<Value>>;

    /// Remove a local binding, returning whether one was removed.
    fn remove(&self, quark: Quark) -> RuntimeResult<bool>;

    fn parent(&self) -> RuntimeResult<Option<NamesetRef>>;

    /// Replace the parent link and its `..` binding in one step.
    /// Go through [`NamesetRef::set_parent`], which rejects self-parenting.
    fn link_parent(&self, parent: Option<NamesetRef>) -> RuntimeResult<()>;

    /// Clear every binding and detach the parent.
    fn reset(&self) -> RuntimeResult<()>;

    fn binding_names(&self) -> RuntimeResult<Vec<Quark>>;
}

/// Shared handle to a nameset. Parents, closed-variable stores and
/// activation records are all held through this type.
#[derive(Clone)]
pub struct NamesetRef(Arc<dyn Nameset>);

impl NamesetRef {
    pub fn new<N: Nameset + 'static>(nameset: N) -> Self {
        NamesetRef(Arc::new(nameset))
    }

    /// Creates a fresh Localset whose parent is this nameset.
    pub fn child(&self) -> RuntimeResult<NamesetRef> {
        let child = NamesetRef::new(Localset::new());
        child.set_parent(Some(self.clone()))?;
        Ok(child)
    }

    pub fn addr(&self) -> *const () {
        Arc::as_ptr(&self.0) as *const ()
    }

    pub fn ptr_eq(&self, other: &NamesetRef) -> bool {
        self.addr() == other.addr()
    }

    pub fn set_parent(&self, parent: Option<NamesetRef>) -> RuntimeResult<()> {
        if let Some(parent) = &parent {
            if parent.ptr_eq(self) {
                return Err(RuntimeError::Nameset(
                    "a nameset cannot be its own parent".to_string(),
                ));
            }
        }
        self.0.link_parent(parent)
    }

    pub fn whom(&self) -> RuntimeResult<Option<Value>> {
        self.get(QUARK_WHOM)
    }

    /// Attach or detach the context object, exposed as the `whom` binding.
    pub fn set_whom(&self, whom: Option<Value>) -> RuntimeResult<()> {
        self.remove(QUARK_WHOM)?;
        if let Some(whom) = whom {
            self.bind(QUARK_WHOM, whom)?;
        }
        Ok(())
    }

    /// Bind a mutable symbol.
    pub fn symdef(&self, quark: Quark, value: Value) -> RuntimeResult<Arc<Symbol>> {
        self.symset(quark, false, value)
    }

    /// Bind a const symbol.
    pub fn symcst(&self, quark: Quark, value: Value) -> RuntimeResult<Arc<Symbol>> {
        self.symset(quark, true, value)
    }

    /// Bind `quark` to a symbol holding `value`. A symbol already bound in
    /// this table takes the value itself, so a const symbol refuses.
    pub fn symset(&self, quark: Quark, constant: bool, value: Value) -> RuntimeResult<Arc<Symbol>> {
        match self.get(quark)? {
            Some(Value::Symbol(symbol)) => {
                if constant {
                    symbol.cdef(value)?;
                } else {
                    symbol.set_value(value)?;
                }
                Ok(symbol)
            }
            Some(other) => Err(redefinition(quark, &other)),
            None => {
                let symbol = Arc::new(Symbol::with_value(quark, value, constant));
                self.bind(quark, Value::Symbol(Arc::clone(&symbol)))?;
                Ok(symbol)
            }
        }
    }

    /// Whether `quark` is bound here or in any parent.
    pub fn valid(&self, quark: Quark) -> RuntimeResult<bool> {
        Ok(self.find(quark)?.is_some())
    }

    /// The bound object for `quark`, searching this nameset then its parents.
    pub fn find(&self, quark: Quark) -> RuntimeResult<Option<Value>> {
        let mut current = self.clone();
        loop {
            if let Some(object) = current.get(quark)? {
                return Ok(Some(object));
            }
            match current.parent()? {
                Some(parent) => current = parent,
                None => return Ok(None),
            }
        }
    }

    /// Resolve `quark` to a value: `this` is the nameset itself, otherwise
    /// the nearest binding in the scope chain.
    pub fn eval(&self, quark: Quark) -> RuntimeResult<Value> {
        if quark == QUARK_THIS {
            return Ok(Value::Nameset(self.clone()));
        }
        match self.find(quark)? {
            Some(object) => object.resolve(),
            None => Err(RuntimeError::Eval(format!("unbound symbol {}", quark))),
        }
    }

    /// Define-const. An existing local binding handles the request itself,
    /// so a const symbol refuses it.
    pub fn cdef(&self, quark: Quark, value: Value) -> RuntimeResult<Value> {
        check_definable(quark, "cdef")?;
        match self.get(quark)? {
            Some(Value::Symbol(symbol)) => symbol.cdef(value.clone())?,
            Some(other) => return Err(redefinition(quark, &other)),
            None => {
                self.symcst(quark, value.clone())?;
            }
        }
        Ok(value)
    }

    /// Define a mutable binding, or update the existing local one.
    pub fn vdef(&self, quark: Quark, value: Value) -> RuntimeResult<Value> {
        check_definable(quark, "vdef")?;
        match self.get(quark)? {
            Some(Value::Symbol(symbol)) => symbol.vdef(value.clone())?,
            Some(other) => return Err(redefinition(quark, &other)),
            None => {
                self.symdef(quark, value.clone())?;
            }
        }
        Ok(value)
    }

    /// Remove a local binding; a const symbol refuses.
    pub fn udef(&self, quark: Quark) -> RuntimeResult<Value> {
        check_definable(quark, "udef")?;
        if let Some(object) = self.get(quark)? {
            if let Value::Symbol(symbol) = &object {
                symbol.udef()?;
            }
            self.remove(quark)?;
        }
        Ok(Value::Nil)
    }

    /// Names visible from this nameset, nearest scope first, deduplicated.
    pub fn visible_names(&self) -> RuntimeResult<Vec<String>> {
        let mut names = Vec::new();
        let mut current = Some(self.clone());
        while let Some(nameset) = current {
            for quark in nameset.binding_names()? {
                names.push(quark.name().to_string());
            }
            current = nameset.parent()?;
        }
        names.sort();
        names.dedup();
        Ok(names)
    }
}

fn check_definable(quark: Quark, operation: &str) -> RuntimeResult<()> {
    if quark.is_reserved() {
        return Err(RuntimeError::Nameset(format!(
            "invalid {} of reserved name {}",
            operation, quark
        )));
    }
    Ok(())
}

fn redefinition(quark: Quark, object: &Value) -> RuntimeError {
    RuntimeError::Type(format!(
        "cannot redefine {} bound to object of type {}",
        quark,
        object.type_name()
    ))
}

impl Deref for NamesetRef {
    type Target = dyn Nameset;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl<N: Nameset + 'static> From<Arc<N>> for NamesetRef {
    fn from(nameset: Arc<N>) -> Self {
        NamesetRef(nameset)
    }
}

impl PartialEq for NamesetRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for NamesetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // never recurse into the bindings: `..` and `whom` may point back here
        write!(f, "NamesetRef({} @ {:p})", self.type_name(), self.addr())
    }
}
