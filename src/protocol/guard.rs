//! Scoped reentrancy guard.
//!
//! One operation runs at a time. Callers on other threads wait their turn; a
//! nested entry from the thread already inside is rejected instead of
//! deadlocking.

use std::sync::{Mutex, MutexGuard};
use std::thread::{self, ThreadId};

use crate::error::{Error, Result};

/// Mutual exclusion over the engine's mutating entry points
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    lock: Mutex<()>,
    owner: Mutex<Option<ThreadId>>,
}

/// Proof that an operation holds the guard; released on drop
#[derive(Debug)]
pub struct GuardToken<'a> {
    guard: &'a ReentrancyGuard,
    operation: &'static str,
    _lock: MutexGuard<'a, ()>,
}

impl ReentrancyGuard {
    /// Create an unlocked guard
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the guard for `operation`
    pub fn enter(&self, operation: &'static str) -> Result<GuardToken<'_>> {
        let current = thread::current().id();
        if *self.owner.lock().map_err(|_| Error::Lock)? == Some(current) {
            return Err(Error::ReentrantCall(operation));
        }

        // Guards no data, so poisoning is harmless
        let lock = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *self.owner.lock().map_err(|_| Error::Lock)? = Some(current);

        Ok(GuardToken {
            guard: self,
            operation,
            _lock: lock,
        })
    }

    /// Check whether an operation currently holds the guard
    pub fn is_entered(&self) -> bool {
        self.owner.lock().map(|owner| owner.is_some()).unwrap_or(true)
    }
}

impl GuardToken<'_> {
    /// Operation holding the guard
    pub fn operation(&self) -> &'static str {
        self.operation
    }
}

impl Drop for GuardToken<'_> {
    fn drop(&mut self) {
        if let Ok(mut owner) = self.guard.owner.lock() {
            *owner = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_enter_and_release() {
        let guard = ReentrancyGuard::new();
        {
            let token = guard.enter("deposit").unwrap();
            assert_eq!(token.operation(), "deposit");
            assert!(guard.is_entered());
        }
        assert!(!guard.is_entered());
        assert!(guard.enter("mint").is_ok());
    }

    #[test]
    fn test_nested_entry_rejected() {
        let guard = ReentrancyGuard::new();
        let _token = guard.enter("deposit").unwrap();

        let nested = guard.enter("redeem");
        assert_eq!(nested.unwrap_err(), Error::ReentrantCall("redeem"));
    }

    #[test]
    fn test_released_after_error_path() {
        let guard = ReentrancyGuard::new();
        let run = || -> Result<()> {
            let _token = guard.enter("mint")?;
            Err(Error::InvalidAmount)
        };

        assert_eq!(run(), Err(Error::InvalidAmount));
        assert!(!guard.is_entered());
    }

    #[test]
    fn test_other_threads_wait() {
        let guard = Arc::new(ReentrancyGuard::new());
        let token = guard.enter("deposit").unwrap();

        let waiting = {
            let guard = Arc::clone(&guard);
            std::thread::spawn(move || guard.enter("mint").map(|_| ()))
        };

        drop(token);
        assert!(waiting.join().unwrap().is_ok());
    }
}
