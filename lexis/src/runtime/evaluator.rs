// Lexis Evaluator - owns the global nameset and drives evaluation

use crate::config::RuntimeConfig;
use crate::runtime::environment::NamesetRef;
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::stdlib::StandardLibrary;
use crate::runtime::values::Value;
use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};

thread_local! {
    static CALL_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Evaluation context shared by every form: the global nameset, the
/// runtime configuration and result bookkeeping.
///
/// An evaluator is `Send + Sync`; share it between threads with `Arc`.
#[derive(Debug)]
pub struct Evaluator {
    global: NamesetRef,
    config: RuntimeConfig,
    posted: AtomicU64,
}

/// Holds one level of closure call depth on the current thread.
pub struct CallDepthGuard {
    _private: (),
}

impl Drop for CallDepthGuard {
    fn drop(&mut self) {
        CALL_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

impl Evaluator {
    /// Create a new evaluator with the standard library loaded
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Evaluator {
            global: StandardLibrary::create_global_environment(),
            config,
            posted: AtomicU64::new(0),
        }
    }

    pub fn global(&self) -> &NamesetRef {
        &self.global
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Result bookkeeping, invoked after a value is produced.
    pub fn post(&self, value: &Value) {
        let count = self.posted.fetch_add(1, Ordering::Relaxed) + 1;
        log::trace!("posted result #{} of type {}", count, value.type_name());
    }

    pub fn posted_results(&self) -> u64 {
        self.posted.load(Ordering::Relaxed)
    }

    /// Evaluate a form in the global nameset.
    pub fn evaluate(&self, form: &Value) -> RuntimeResult<Value> {
        self.evaluate_in(&self.global, form)
    }

    /// Evaluate a form in `nameset`. A `return` escaping to the top level
    /// yields its payload.
    pub fn evaluate_in(&self, nameset: &NamesetRef, form: &Value) -> RuntimeResult<Value> {
        let value = form.eval(self, nameset)?.into_value();
        self.post(&value);
        Ok(value)
    }

    /// Read `source` and evaluate every top-level form, returning the last
    /// value (`nil` for empty input).
    #[cfg(feature = "pest")]
    pub fn evaluate_str(&self, source: &str) -> RuntimeResult<Value> {
        let forms = crate::parser::parse(source)?;
        let mut last = Value::Nil;
        for form in &forms {
            last = self.evaluate(form)?;
        }
        Ok(last)
    }

    /// Enter a closure call on the current thread, failing once the
    /// configured depth is exceeded.
    pub fn enter_call(&self) -> RuntimeResult<CallDepthGuard> {
        let limit = self.config.max_call_depth;
        CALL_DEPTH.with(|depth| {
            let current = depth.get();
            if current >= limit {
                return Err(RuntimeError::Recursion(format!(
                    "call depth limit of {} exceeded",
                    limit
                )));
            }
            depth.set(current + 1);
            Ok(CallDepthGuard { _private: () })
        })
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Evaluator {
    fn drop(&mut self) {
        if let Err(e) = self.global.reset() {
            log::warn!("failed to reset the global nameset: {}", e);
        }
    }
}
