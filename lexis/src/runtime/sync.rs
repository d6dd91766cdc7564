//! Lock helpers shared by namesets, symbols and closures.

use crate::runtime::environment::NamesetRef;
use crate::runtime::error::{RuntimeError, RuntimeResult};
use std::sync::{Condvar, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread::{self, ThreadId};

pub fn read_lock<T>(lock: &RwLock<T>) -> RuntimeResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|e| RuntimeError::Internal(format!("RwLock poisoned: {}", e)))
}

pub fn write_lock<T>(lock: &RwLock<T>) -> RuntimeResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|e| RuntimeError::Internal(format!("RwLock poisoned: {}", e)))
}

/// Exclusive lock that the owning thread may acquire again without blocking.
///
/// Closure application holds it for the whole call, and a call may re-enter
/// the same closure (recursion, `self` lookups) on the same thread.
#[derive(Debug, Default)]
pub struct ReentrantLock {
    owner: Mutex<Option<(ThreadId, usize)>>,
    released: Condvar,
}

impl ReentrantLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> RuntimeResult<ReentrantGuard<'_>> {
        let me = thread::current().id();
        let mut owner = self
            .owner
            .lock()
            .map_err(|e| RuntimeError::Internal(format!("Mutex poisoned: {}", e)))?;
        loop {
            let state = *owner;
            match state {
                None => {
                    *owner = Some((me, 1));
                    break;
                }
                Some((id, depth)) if id == me => {
                    *owner = Some((me, depth + 1));
                    break;
                }
                Some(_) => {
                    owner = self
                        .released
                        .wait(owner)
                        .map_err(|e| RuntimeError::Internal(format!("Mutex poisoned: {}", e)))?;
                }
            }
        }
        Ok(ReentrantGuard { lock: self })
    }

    /// Whether the calling thread currently holds the lock.
    pub fn is_held_by_current_thread(&self) -> bool {
        let owner = self.owner.lock().unwrap_or_else(PoisonError::into_inner);
        matches!(*owner, Some((id, _)) if id == thread::current().id())
    }
}

#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct ReentrantGuard<'a> {
    lock: &'a ReentrantLock,
}

impl Drop for ReentrantGuard<'_> {
    fn drop(&mut self) {
        // the owner slot is always left consistent, recover it if poisoned
        let mut owner = self.lock.owner.lock().unwrap_or_else(PoisonError::into_inner);
        let state = *owner;
        match state {
            Some((id, depth)) if depth > 1 => *owner = Some((id, depth - 1)),
            _ => {
                *owner = None;
                self.lock.released.notify_one();
            }
        }
    }
}

/// Owns a transient nameset and resets it when dropped, on every exit path.
pub struct ScopeGuard {
    scope: NamesetRef,
}

impl ScopeGuard {
    pub fn new(scope: NamesetRef) -> Self {
        ScopeGuard { scope }
    }

    pub fn scope(&self) -> &NamesetRef {
        &self.scope
    }
}

impl std::ops::Deref for ScopeGuard {
    type Target = NamesetRef;

    fn deref(&self) -> &NamesetRef {
        &self.scope
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        if let Err(e) = self.scope.reset() {
            log::warn!("failed to reset transient {}: {}", self.scope.type_name(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn owner_can_reenter() {
        let lock = ReentrantLock::new();
        let outer = lock.lock().unwrap();
        let inner = lock.lock().unwrap();
        assert!(lock.is_held_by_current_thread());
        drop(inner);
        assert!(lock.is_held_by_current_thread());
        drop(outer);
        assert!(!lock.is_held_by_current_thread());
    }

    #[test]
    fn other_threads_are_excluded() {
        let lock = Arc::new(ReentrantLock::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let lock = Arc::clone(&lock);
                let inside = Arc::clone(&inside);
                let peak = Arc::clone(&peak);
                thread::spawn(move || {
                    for _ in 0..20 {
                        let _guard = lock.lock().unwrap();
                        let _again = lock.lock().unwrap();
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_micros(50));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }
}
