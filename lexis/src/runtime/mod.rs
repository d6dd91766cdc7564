//! Lexis Runtime System
//!
//! Namesets, closures and the control builtins. The heavy logic is
//! implemented in the submodules listed below.

pub mod args_list;
pub mod closure;
pub mod control;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod execution_outcome;
pub mod localset;
pub mod multiset;
pub mod param_binding;
pub mod stdlib;
pub mod symbol;
pub mod sync;
pub mod values;

#[cfg(all(test, feature = "pest"))]
mod stdlib_tests;

pub use args_list::ArgsList;
pub use closure::Closure;
pub use environment::{Nameset, NamesetRef};
pub use error::{RuntimeError, RuntimeResult};
pub use evaluator::Evaluator;
pub use execution_outcome::ExecutionOutcome;
pub use localset::Localset;
pub use multiset::Multiset;
pub use param_binding::ParamSpec;
pub use stdlib::StandardLibrary;
pub use symbol::Symbol;
pub use values::{Arity, Builtin, Exception, Value};
