// Symbol cells: the unit of storage inside every nameset table

use crate::quark::Quark;
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::sync::{read_lock, write_lock};
use crate::runtime::values::Value;
use std::sync::RwLock;

/// A mutable, possibly const, cell holding one value under a name.
#[derive(Debug)]
pub struct Symbol {
    quark: Quark,
    state: RwLock<SymbolState>,
}

#[derive(Debug)]
struct SymbolState {
    value: Value,
    constant: bool,
}

impl Symbol {
    pub fn new(quark: Quark) -> Self {
        Self::with_value(quark, Value::Nil, false)
    }

    pub fn with_value(quark: Quark, value: Value, constant: bool) -> Self {
        Symbol {
            quark,
            state: RwLock::new(SymbolState { value, constant }),
        }
    }

    pub fn quark(&self) -> Quark {
        self.quark
    }

    pub fn value(&self) -> RuntimeResult<Value> {
        Ok(read_lock(&self.state)?.value.clone())
    }

    pub fn is_const(&self) -> RuntimeResult<bool> {
        Ok(read_lock(&self.state)?.constant)
    }

    pub fn set_const(&self, constant: bool) -> RuntimeResult<()> {
        write_lock(&self.state)?.constant = constant;
        Ok(())
    }

    /// Replace the value, refusing a const symbol.
    pub fn set_value(&self, value: Value) -> RuntimeResult<()> {
        let mut state = write_lock(&self.state)?;
        if state.constant {
            return Err(self.const_violation());
        }
        state.value = value;
        Ok(())
    }

    /// Define-const: set the value and mark the symbol const.
    pub fn cdef(&self, value: Value) -> RuntimeResult<()> {
        let mut state = write_lock(&self.state)?;
        if state.constant {
            return Err(self.const_violation());
        }
        state.value = value;
        state.constant = true;
        Ok(())
    }

    /// Define: set the value, keeping the symbol mutable.
    pub fn vdef(&self, value: Value) -> RuntimeResult<()> {
        self.set_value(value)
    }

    /// Check that this symbol may be undefined. The owning nameset removes it.
    pub fn udef(&self) -> RuntimeResult<()> {
        if read_lock(&self.state)?.constant {
            return Err(self.const_violation());
        }
        Ok(())
    }

    fn const_violation(&self) -> RuntimeError {
        RuntimeError::Const(format!("const violation for symbol {}", self.quark))
    }
}
