// Localset: single-table nameset for blocks, loop bodies and closed variables

use crate::quark::{Quark, QUARK_PARENT};
use crate::runtime::environment::{Nameset, NamesetRef};
use crate::runtime::error::RuntimeResult;
use crate::runtime::sync::{read_lock, write_lock};
use crate::runtime::values::Value;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct Localset {
    state: RwLock<LocalState>,
}

#[derive(Debug, Default)]
struct LocalState {
    table: HashMap<Quark, Value>,
    parent: Option<NamesetRef>,
}

impl Localset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a Localset already linked to `parent`.
    pub fn with_parent(parent: NamesetRef) -> Self {
        let mut table = HashMap::new();
        table.insert(QUARK_PARENT, Value::Nameset(parent.clone()));
        Localset {
            state: RwLock::new(LocalState {
                table,
                parent: Some(parent),
            }),
        }
    }

    /// Creates a root Localset over prepared bindings.
    pub fn from_bindings(table: HashMap<Quark, Value>) -> Self {
        Localset {
            state: RwLock::new(LocalState {
                table,
                parent: None,
            }),
        }
    }
}

impl Nameset for Localset {
    fn type_name(&self) -> &'static str {
        "localset"
    }

    fn bind(&self, quark: Quark, object: Value) -> RuntimeResult<()> {
        write_lock(&self.state)?.table.insert(quark, object);
        Ok(())
    }

    fn exists(&self, quark: Quark) -> RuntimeResult<bool> {
        Ok(read_lock(&self.state)?.table.contains_key(&quark))
    }

    fn get(&self, quark: Quark) -> RuntimeResult<Option<Value>> {
        Ok(read_lock(&self.state)?.table.get(&quark).cloned())
    }

    fn remove(&self, quark: Quark) -> RuntimeResult<bool> {
        Ok(write_lock(&self.state)?.table.remove(&quark).is_some())
    }

    fn parent(&self) -> RuntimeResult<Option<NamesetRef>> {
        Ok(read_lock(&self.state)?.parent.clone())
    }

    fn link_parent(&self, parent: Option<NamesetRef>) -> RuntimeResult<()> {
        let mut state = write_lock(&self.state)?;
        match &parent {
            Some(nameset) => state
                .table
                .insert(QUARK_PARENT, Value::Nameset(nameset.clone())),
            None => state.table.remove(&QUARK_PARENT),
        };
        state.parent = parent;
        Ok(())
    }

    fn reset(&self) -> RuntimeResult<()> {
        // drop the bindings outside the lock, they may own other namesets
        let (table, parent) = {
            let mut state = write_lock(&self.state)?;
            (std::mem::take(&mut state.table), state.parent.take())
        };
        drop(table);
        drop(parent);
        Ok(())
    }

    fn binding_names(&self) -> RuntimeResult<Vec<Quark>> {
        Ok(read_lock(&self.state)?.table.keys().copied().collect())
    }
}
