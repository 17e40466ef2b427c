//! Page-level transaction locking: an unimplemented hook.
//!
//! The engine's correctness under concurrent writers is not guaranteed by
//! the core itself — multi-user concurrency control is explicitly out of
//! scope. This type exists only so the shape of the hook (acquire before
//! `BufferPool::get_page`, release on commit/abort) is visible at the call
//! boundary; it grants every request immediately and never blocks or
//! detects conflicts.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use crate::heap_page::{HeapPageId, Permission};
use crate::transaction::TransactionId;

pub struct LockManager {
    held: RwLock<HashMap<TransactionId, HashSet<HeapPageId>>>,
}

impl LockManager {
    pub fn new() -> Self {
        LockManager {
            held: RwLock::new(HashMap::new()),
        }
    }

    /// No-op hook: records that `tid` has touched `pid` and returns
    /// immediately. A real implementation would block here on conflicting
    /// holders and may raise `TransactionAborted` under wait-die/wound-wait.
    pub fn acquire_lock(&self, tid: TransactionId, pid: HeapPageId, _perm: Permission) {
        self.held.write().unwrap().entry(tid).or_default().insert(pid);
    }

    pub fn release_locks(&self, tid: TransactionId) {
        self.held.write().unwrap().remove(&tid);
    }

    pub fn holds_lock(&self, tid: TransactionId, pid: HeapPageId) -> bool {
        self.held
            .read()
            .unwrap()
            .get(&tid)
            .map(|pages| pages.contains(&pid))
            .unwrap_or(false)
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}
