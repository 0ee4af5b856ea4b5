//! Opaque owner tokens for single-slot callback registrations
//!
//! Consumers that install a callback keep their [`OwnerId`] and later clear
//! the registration only if the slot still carries that same owner.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(u64);

impl OwnerId {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "owner#{}", self.0)
    }
}

/// Hands out distinct owner ids for one daemon instance
#[derive(Debug)]
pub struct OwnerIds {
    next: AtomicU64,
}

impl OwnerIds {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn allocate(&self) -> OwnerId {
        OwnerId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for OwnerIds {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocated_ids_are_distinct() {
        let ids = OwnerIds::new();
        let a = ids.allocate();
        let b = ids.allocate();
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "owner#1");
    }
}
