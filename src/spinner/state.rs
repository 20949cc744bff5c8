//! The lock-guarded spin flag.

use std::sync::{Arc, Mutex, PoisonError};

/// Shared boolean that keeps spin loops running while set.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct SpinFlag {
    inner: Arc<Mutex<bool>>,
}

impl SpinFlag {
    /// Create a cleared flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag, returning the previous value.
    pub fn set(&self, spinning: bool) -> bool {
        // A panicking writer cannot leave a bool half-written.
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, spinning)
    }

    /// Read the flag.
    pub fn is_spinning(&self) -> bool {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_cleared() {
        assert!(!SpinFlag::new().is_spinning());
    }

    #[test]
    fn set_returns_previous_value() {
        let flag = SpinFlag::new();
        assert!(!flag.set(true));
        assert!(flag.set(true));
        assert!(flag.set(false));
        assert!(!flag.set(false));
    }

    #[test]
    fn clones_share_state() {
        let flag = SpinFlag::new();
        let other = flag.clone();

        flag.set(true);
        assert!(other.is_spinning());

        other.set(false);
        assert!(!flag.is_spinning());
    }

    #[test]
    fn survives_poisoned_lock() {
        let flag = SpinFlag::new();
        let poisoner = flag.clone();

        let _ = std::thread::spawn(move || {
            let _guard = poisoner.inner.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        flag.set(true);
        assert!(flag.is_spinning());
    }
}
