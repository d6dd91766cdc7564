// Lexis Library
// Lexical environments, closures and control builtins for a dynamic runtime
pub mod config;
pub mod input_handling;
pub mod parser;
pub mod quark;
pub mod runtime;

// Re-export the entry points most callers need.
pub use config::RuntimeConfig;
pub use parser::ParseError;
#[cfg(feature = "pest")]
pub use parser::{parse, parse_form};
pub use quark::Quark;
pub use runtime::{
    Closure, Evaluator, Exception, ExecutionOutcome, Localset, Multiset, Nameset, NamesetRef,
    RuntimeError, RuntimeResult, Value,
};
