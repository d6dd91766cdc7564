// Multiset: three-tier nameset used as a closure activation record

use crate::quark::{Quark, QUARK_PARENT};
use crate::runtime::environment::{Nameset, NamesetRef};
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::sync::{read_lock, write_lock};
use crate::runtime::values::Value;
use std::collections::HashMap;
use std::sync::RwLock;

/// Activation record of a closure call.
///
/// Arguments are bound into the secondary table while the record is
/// unlocked. [`Multiset::linkset`] then attaches the closed variables as the
/// extra nameset, attaches the parent and locks the secondary table: from
/// that point new names land in the primary table.
#[derive(Debug, Default)]
pub struct Multiset {
    state: RwLock<MultiState>,
}

#[derive(Debug, Default)]
struct MultiState {
    secondary: HashMap<Quark, Value>,
    primary: HashMap<Quark, Value>,
    extra: Option<NamesetRef>,
    parent: Option<NamesetRef>,
    locked: bool,
}

impl MultiState {
    fn insert(&mut self, quark: Quark, object: Value) -> Option<Value> {
        if !self.locked || self.secondary.contains_key(&quark) {
            self.secondary.insert(quark, object)
        } else {
            self.primary.insert(quark, object)
        }
    }
}

impl Multiset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finalize the record: set the extra nameset, set the parent, lock the
    /// secondary table. All three happen under one write lock.
    pub fn linkset(&self, parent: NamesetRef, extra: NamesetRef) -> RuntimeResult<()> {
        let this = self as *const Multiset as *const ();
        if parent.addr() == this || extra.addr() == this {
            return Err(RuntimeError::Nameset(
                "an activation record cannot link to itself".to_string(),
            ));
        }
        let mut state = write_lock(&self.state)?;
        state.extra = Some(extra);
        state.insert(QUARK_PARENT, Value::Nameset(parent.clone()));
        state.parent = Some(parent);
        state.locked = true;
        Ok(())
    }

    pub fn is_locked(&self) -> RuntimeResult<bool> {
        Ok(read_lock(&self.state)?.locked)
    }

    pub fn extra(&self) -> RuntimeResult<Option<NamesetRef>> {
        Ok(read_lock(&self.state)?.extra.clone())
    }

    pub fn in_secondary(&self, quark: Quark) -> RuntimeResult<bool> {
        Ok(read_lock(&self.state)?.secondary.contains_key(&quark))
    }

    pub fn in_primary(&self, quark: Quark) -> RuntimeResult<bool> {
        Ok(read_lock(&self.state)?.primary.contains_key(&quark))
    }
}

impl Nameset for Multiset {
    fn type_name(&self) -> &'static str {
        "multiset"
    }

    fn bind(&self, quark: Quark, object: Value) -> RuntimeResult<()> {
        write_lock(&self.state)?.insert(quark, object);
        Ok(())
    }

    fn exists(&self, quark: Quark) -> RuntimeResult<bool> {
        let extra = {
            let state = read_lock(&self.state)?;
            if state.secondary.contains_key(&quark) || state.primary.contains_key(&quark) {
                return Ok(true);
            }
            state.extra.clone()
        };
        match extra {
            Some(extra) => extra.exists(quark),
            None => Ok(false),
        }
    }

    fn get(&self, quark: Quark) -> RuntimeResult<Option<Value>> {
        let extra = {
            let state = read_lock(&self.state)?;
            if let Some(object) = state.secondary.get(&quark) {
                return Ok(Some(object.clone()));
            }
            if let Some(object) = state.primary.get(&quark) {
                return Ok(Some(object.clone()));
            }
            state.extra.clone()
        };
        match extra {
            Some(extra) => extra.get(quark),
            None => Ok(None),
        }
    }

    fn remove(&self, quark: Quark) -> RuntimeResult<bool> {
        let extra = {
            let mut state = write_lock(&self.state)?;
            if state.secondary.remove(&quark).is_some() {
                return Ok(true);
            }
            if state.primary.remove(&quark).is_some() {
                return Ok(true);
            }
            state.extra.clone()
        };
        match extra {
            Some(extra) => extra.remove(quark),
            None => Ok(false),
        }
    }

    fn parent(&self) -> RuntimeResult<Option<NamesetRef>> {
        Ok(read_lock(&self.state)?.parent.clone())
    }

    fn link_parent(&self, parent: Option<NamesetRef>) -> RuntimeResult<()> {
        let mut state = write_lock(&self.state)?;
        state.secondary.remove(&QUARK_PARENT);
        state.primary.remove(&QUARK_PARENT);
        if let Some(nameset) = &parent {
            state.insert(QUARK_PARENT, Value::Nameset(nameset.clone()));
        }
        state.parent = parent;
        Ok(())
    }

    fn reset(&self) -> RuntimeResult<()> {
        // tables, extra and parent go, and the secondary table unlocks
        let taken = std::mem::take(&mut *write_lock(&self.state)?);
        drop(taken);
        Ok(())
    }

    fn binding_names(&self) -> RuntimeResult<Vec<Quark>> {
        let state = read_lock(&self.state)?;
        let mut names: Vec<Quark> = state
            .secondary
            .keys()
            .chain(state.primary.keys())
            .copied()
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}
