//! Per-content-id edit locks.
//!
//! At most one patch per content id is in flight. A second caller waits on a
//! condvar until the holder releases or the timeout passes. Entries older than
//! the TTL belong to a holder that is presumed gone and are taken over.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;
use thiserror::Error;

/// The id is held by someone else for longer than the caller would wait.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("`{key}` is being edited by {holder}")]
pub struct LockConflict {
    pub key: String,
    pub holder: String,
}

struct Holder {
    actor: String,
    since: Instant,
    token: u64,
}

#[derive(Default)]
struct State {
    held: FxHashMap<String, Holder>,
    next_token: u64,
}

pub struct LockTable {
    state: Mutex<State>,
    released: Condvar,
    ttl: Duration,
}

impl LockTable {
    pub fn new(ttl: Duration) -> Self {
        Self {
            state: Mutex::new(State::default()),
            released: Condvar::new(),
            ttl,
        }
    }

    /// Acquire `key` for `actor`, waiting at most `timeout`.
    ///
    /// A zero timeout fails fast.
    pub fn acquire(
        &self,
        key: &str,
        actor: &str,
        timeout: Duration,
    ) -> Result<LockGuard<'_>, LockConflict> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();

        loop {
            let now = Instant::now();
            let holder = match state.held.get(key) {
                Some(h) if now.duration_since(h.since) < self.ttl => h.actor.clone(),
                // Free, or stale
                _ => break,
            };
            if now >= deadline {
                return Err(LockConflict {
                    key: key.to_string(),
                    holder,
                });
            }
            self.released.wait_until(&mut state, deadline);
        }

        state.next_token += 1;
        let token = state.next_token;
        state.held.insert(
            key.to_string(),
            Holder {
                actor: actor.to_string(),
                since: Instant::now(),
                token,
            },
        );

        Ok(LockGuard {
            table: self,
            key: key.to_string(),
            token,
        })
    }

    /// Current holder of `key`, if any (stale entries included).
    pub fn holder(&self, key: &str) -> Option<String> {
        self.state.lock().held.get(key).map(|h| h.actor.clone())
    }

    fn release(&self, key: &str, token: u64) {
        let mut state = self.state.lock();
        // A stale guard must not release a lock taken over by someone else
        if state.held.get(key).is_some_and(|h| h.token == token) {
            state.held.remove(key);
        }
        drop(state);
        self.released.notify_all();
    }
}

/// Releases the lock on drop, on every exit path.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard<'a> {
    table: &'a LockTable,
    key: String,
    token: u64,
}

impl LockGuard<'_> {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.table.release(&self.key, self.token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    const LONG: Duration = Duration::from_secs(60);

    #[test]
    fn test_conflict_names_holder() {
        let table = LockTable::new(LONG);
        let _guard = table.acquire("hero", "alice", Duration::ZERO).unwrap();

        let err = table.acquire("hero", "bob", Duration::ZERO).err().unwrap();
        assert_eq!(err.holder, "alice");
        assert_eq!(err.to_string(), "`hero` is being edited by alice");

        // Other ids are independent
        assert!(table.acquire("footer", "bob", Duration::ZERO).is_ok());
    }

    #[test]
    fn test_release_on_drop() {
        let table = LockTable::new(LONG);
        {
            let guard = table.acquire("hero", "alice", Duration::ZERO).unwrap();
            assert_eq!(guard.key(), "hero");
            assert_eq!(table.holder("hero").as_deref(), Some("alice"));
        }
        assert!(table.holder("hero").is_none());
        assert!(table.acquire("hero", "bob", Duration::ZERO).is_ok());
    }

    #[test]
    fn test_stale_lock_is_taken_over() {
        let table = LockTable::new(Duration::from_millis(10));
        let stale = table.acquire("hero", "alice", Duration::ZERO).unwrap();
        thread::sleep(Duration::from_millis(20));

        let fresh = table.acquire("hero", "bob", Duration::ZERO).unwrap();
        assert_eq!(table.holder("hero").as_deref(), Some("bob"));

        // The stale guard must not release bob's lock
        drop(stale);
        assert_eq!(table.holder("hero").as_deref(), Some("bob"));
        drop(fresh);
        assert!(table.holder("hero").is_none());
    }

    #[test]
    fn test_waiter_gets_lock_after_release() {
        let table = Arc::new(LockTable::new(LONG));
        let guard = table.acquire("hero", "alice", Duration::ZERO).unwrap();

        let waiter = {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                table
                    .acquire("hero", "bob", Duration::from_secs(5))
                    .map(|_| ())
            })
        };
        thread::sleep(Duration::from_millis(20));
        drop(guard);
        assert!(waiter.join().unwrap().is_ok());
    }

    #[test]
    fn test_mutual_exclusion() {
        let table = Arc::new(LockTable::new(LONG));
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let table = Arc::clone(&table);
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                thread::spawn(move || {
                    let _guard = table
                        .acquire("hero", &format!("actor-{i}"), Duration::from_secs(10))
                        .unwrap();
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_inside.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(2));
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    }
}
