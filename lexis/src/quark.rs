//! Process-wide quark table.
//!
//! A quark is the interned identity of a name. Interning is append-only for
//! the lifetime of the process, so a quark can be compared, hashed and copied
//! freely between threads.

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Interned name identity. Equality is integer equality.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Quark(u32);

/// Denotes the current nameset.
pub const QUARK_THIS: Quark = Quark(0);
/// Denotes the parent nameset.
pub const QUARK_PARENT: Quark = Quark(1);
/// Context object of a nameset.
pub const QUARK_WHOM: Quark = Quark(2);
/// The closure being applied, bound in every activation record.
pub const QUARK_SELF: Quark = Quark(3);
/// Variadic marker: collects the surplus actual arguments.
pub const QUARK_ARGS: Quark = Quark(4);
/// Tag of a `(const name)` parameter pair.
pub const QUARK_CONST: Quark = Quark(5);
/// Exception binding inside a `try` handler.
pub const QUARK_WHAT: Quark = Quark(6);

const RESERVED: [&str; 7] = ["this", "..", "whom", "self", "args", "const", "what"];

struct QuarkTable {
    ids: HashMap<Arc<str>, u32>,
    names: Vec<Arc<str>>,
}

impl QuarkTable {
    fn new() -> Self {
        let mut table = QuarkTable {
            ids: HashMap::new(),
            names: Vec::new(),
        };
        for name in RESERVED {
            table.insert(name);
        }
        table
    }

    fn insert(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.names.len() as u32;
        let name: Arc<str> = Arc::from(name);
        self.names.push(Arc::clone(&name));
        self.ids.insert(name, id);
        id
    }
}

lazy_static! {
    static ref QUARKS: RwLock<QuarkTable> = RwLock::new(QuarkTable::new());
}

impl Quark {
    /// Returns the quark of `name`, interning it on first use.
    pub fn intern(name: &str) -> Quark {
        // the table only ever grows, a poisoned guard still holds a consistent table
        {
            let table = QUARKS.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(&id) = table.ids.get(name) {
                return Quark(id);
            }
        }
        let mut table = QUARKS.write().unwrap_or_else(PoisonError::into_inner);
        Quark(table.insert(name))
    }

    /// The interned text of this quark.
    pub fn name(&self) -> Arc<str> {
        let table = QUARKS.read().unwrap_or_else(PoisonError::into_inner);
        match table.names.get(self.0 as usize) {
            Some(name) => Arc::clone(name),
            None => Arc::from("#<unknown quark>"),
        }
    }

    pub fn id(&self) -> u32 {
        self.0
    }

    /// True for `this` and `..`, which can never be defined or undefined.
    pub fn is_reserved(&self) -> bool {
        *self == QUARK_THIS || *self == QUARK_PARENT
    }
}

impl fmt::Display for Quark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl fmt::Debug for Quark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Quark({}, {:?})", self.0, &*self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn reserved_quarks_have_fixed_ids() {
        assert_eq!(Quark::intern("this"), QUARK_THIS);
        assert_eq!(Quark::intern(".."), QUARK_PARENT);
        assert_eq!(Quark::intern("args"), QUARK_ARGS);
        assert_eq!(&*QUARK_WHAT.name(), "what");
        assert!(QUARK_THIS.is_reserved());
        assert!(QUARK_PARENT.is_reserved());
        assert!(!QUARK_SELF.is_reserved());
    }

    #[test]
    fn interning_is_stable() {
        let a = Quark::intern("quark-table-stable");
        let b = Quark::intern("quark-table-stable");
        assert_eq!(a, b);
        assert_ne!(a, Quark::intern("quark-table-other"));
        assert_eq!(a.to_string(), "quark-table-stable");
    }

    #[test]
    fn concurrent_interning_yields_one_quark() {
        let handles: Vec<_> = (0..8)
            .map(|_| thread::spawn(|| Quark::intern("quark-table-contended")))
            .collect();
        let quarks: Vec<Quark> = handles
            .into_iter()
            .map(|h| h.join().expect("interning thread panicked"))
            .collect();
        assert!(quarks.windows(2).all(|w| w[0] == w[1]));
    }
}
