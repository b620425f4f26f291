//! String-keyed mutexes for coordinating shared remote resources.

use std::collections::HashMap;

use parking_lot::{Condvar, Mutex};
use tracing::debug;

/// Per-channel table of named exclusive locks.
///
/// Callers pick the key (for example `apt` or `port-setup`) and a
/// human-readable description recorded while the mutex is held. Keys
/// are independent: blocking on `"X"` never delays an operation on
/// `"Y"`.
///
/// The table is per-channel mutable state rebuilt empty on every
/// construction; waiter queues are never persisted.
///
/// # Example
///
/// ```
/// use locus_remote::MutexTable;
///
/// let table = MutexTable::new();
/// table.acquire("apt", "installing packages");
/// assert!(!table.try_acquire("apt", "second caller"));
/// table.release("apt");
/// assert!(table.try_acquire("apt", "second caller"));
/// ```
#[derive(Debug, Default)]
pub struct MutexTable {
    /// Held keys, each with its holder's description.
    held: Mutex<HashMap<String, String>>,
    freed: Condvar,
}

impl MutexTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until the named mutex is free, then holds it.
    pub fn acquire(&self, key: &str, description: &str) {
        let mut held = self.held.lock();
        while held.contains_key(key) {
            debug!(mutex = key, waiting_for = %held[key], "waiting on mutex");
            self.freed.wait(&mut held);
        }
        held.insert(key.to_string(), description.to_string());
    }

    /// Holds the named mutex if free; returns false without blocking
    /// otherwise.
    pub fn try_acquire(&self, key: &str, description: &str) -> bool {
        let mut held = self.held.lock();
        if held.contains_key(key) {
            return false;
        }
        held.insert(key.to_string(), description.to_string());
        true
    }

    /// Releases the named mutex and wakes its waiters. Releasing an
    /// unheld key is a no-op.
    pub fn release(&self, key: &str) {
        let mut held = self.held.lock();
        if held.remove(key).is_some() {
            // waiters on other keys re-check and sleep again
            self.freed.notify_all();
        }
    }

    /// True while the named mutex is held.
    #[must_use]
    pub fn is_held(&self, key: &str) -> bool {
        self.held.lock().contains_key(key)
    }
}
