// Formal parameter list of a closure

use crate::quark::{Quark, QUARK_ARGS};
use crate::runtime::error::{RuntimeError, RuntimeResult};
use std::fmt;

/// Ordered `(quark, const)` parameter slots. Names are unique and the
/// variadic marker `args`, when present, is always the last slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgsList {
    slots: Vec<(Quark, bool)>,
}

impl ArgsList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, quark: Quark, constant: bool) -> RuntimeResult<()> {
        if self.exists(quark) {
            return Err(RuntimeError::Argument(format!(
                "duplicate argument name {}",
                quark
            )));
        }
        if self.is_variadic() {
            return Err(RuntimeError::Argument(format!(
                "cannot add argument {} after the variadic argument",
                quark
            )));
        }
        self.slots.push((quark, constant));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn quark_at(&self, index: usize) -> RuntimeResult<Quark> {
        self.slot(index).map(|(quark, _)| quark)
    }

    pub fn const_at(&self, index: usize) -> RuntimeResult<bool> {
        self.slot(index).map(|(_, constant)| constant)
    }

    fn slot(&self, index: usize) -> RuntimeResult<(Quark, bool)> {
        self.slots
            .get(index)
            .copied()
            .ok_or(RuntimeError::Index {
                index,
                length: self.slots.len(),
            })
    }

    /// Position of `quark`, `None` when it is not a parameter.
    pub fn find(&self, quark: Quark) -> Option<usize> {
        self.slots.iter().position(|(q, _)| *q == quark)
    }

    /// Position of `quark`, failing with a quark-error when absent.
    pub fn lookup(&self, quark: Quark) -> RuntimeResult<usize> {
        self.find(quark).ok_or_else(|| {
            RuntimeError::Quark(format!("argument {} not found in argument list", quark))
        })
    }

    pub fn exists(&self, quark: Quark) -> bool {
        self.find(quark).is_some()
    }

    /// Whether `quark` is a const parameter; false when it is not a parameter.
    pub fn is_const(&self, quark: Quark) -> bool {
        self.slots.iter().any(|&(q, constant)| q == quark && constant)
    }

    pub fn is_variadic(&self) -> bool {
        matches!(self.slots.last(), Some((quark, _)) if *quark == QUARK_ARGS)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Quark, bool)> + '_ {
        self.slots.iter().copied()
    }
}

impl fmt::Display for ArgsList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots: Vec<String> = self
            .slots
            .iter()
            .map(|(quark, constant)| {
                if *constant {
                    format!("(const {})", quark)
                } else {
                    quark.to_string()
                }
            })
            .collect();
        write!(f, "({})", slots.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn lookup_miss_is_a_quark_error() {
        let args = ArgsList::new();
        assert_eq!(args.find(Quark::intern("args-list-miss")), None);
        assert!(matches!(
            args.lookup(Quark::intern("args-list-miss")),
            Err(RuntimeError::Quark(_))
        ));
        assert!(!args.is_const(Quark::intern("args-list-miss")));
    }

    #[test]
    fn out_of_bounds_is_an_index_error() {
        let mut args = ArgsList::new();
        args.add(Quark::intern("args-list-a"), false).unwrap();
        assert!(matches!(
            args.quark_at(1),
            Err(RuntimeError::Index { index: 1, length: 1 })
        ));
        assert!(matches!(args.const_at(5), Err(RuntimeError::Index { .. })));
    }

    #[test]
    fn duplicates_are_rejected() {
        let mut args = ArgsList::new();
        args.add(Quark::intern("args-list-dup"), false).unwrap();
        let err = args.add(Quark::intern("args-list-dup"), true).unwrap_err();
        assert!(matches!(err, RuntimeError::Argument(_)));
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn display_shows_const_pairs() {
        let mut args = ArgsList::new();
        args.add(Quark::intern("x"), false).unwrap();
        args.add(Quark::intern("y"), true).unwrap();
        args.add(QUARK_ARGS, false).unwrap();
        assert_eq!(args.to_string(), "(x (const y) args)");
        assert!(args.is_variadic());
    }

    proptest! {
        #[test]
        fn slots_round_trip(flags in prop::collection::vec(any::<bool>(), 1..12)) {
            let mut args = ArgsList::new();
            let quarks: Vec<Quark> = (0..flags.len())
                .map(|i| Quark::intern(&format!("args-list-prop-{}", i)))
                .collect();
            for (quark, constant) in quarks.iter().zip(&flags) {
                args.add(*quark, *constant).unwrap();
            }
            for (index, (quark, constant)) in quarks.iter().zip(&flags).enumerate() {
                prop_assert_eq!(args.find(*quark), Some(index));
                prop_assert_eq!(args.lookup(*quark).unwrap(), index);
                prop_assert_eq!(args.quark_at(index).unwrap(), *quark);
                prop_assert_eq!(args.const_at(index).unwrap(), *constant);
                prop_assert_eq!(args.is_const(*quark), *constant);
            }
        }

        #[test]
        fn nothing_follows_the_variadic_marker(name in "[a-z]{1,8}", constant in any::<bool>()) {
            let mut args = ArgsList::new();
            args.add(QUARK_ARGS, false).unwrap();
            let result = args.add(Quark::intern(&format!("after-{}", name)), constant);
            prop_assert!(matches!(result, Err(RuntimeError::Argument(_))));
            let again = args.add(QUARK_ARGS, constant);
            prop_assert!(matches!(again, Err(RuntimeError::Argument(_))));
        }
    }
}
