use parking_lot::{ArcMutexGuard, Mutex, RawMutex};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// One mutex per key, created on demand.
///
/// Entries nobody holds are pruned whenever a new key is locked, so the
/// table stays proportional to the number of keys in use.
pub(crate) struct KeyedLocks<K> {
    locks: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub(crate) fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Blocks until the lock for `key` is held.
    pub(crate) fn lock(&self, key: &K) -> ArcMutexGuard<RawMutex, ()> {
        let lock = {
            let mut locks = self.locks.lock();
            if !locks.contains_key(key) {
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            Arc::clone(locks.entry(key.clone()).or_default())
        };
        lock.lock_arc()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().len()
    }
}
