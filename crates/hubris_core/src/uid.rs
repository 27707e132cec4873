//! Unique identifiers and their allocator.
//!
//! A [`Uid`] is a plain `u64` with no inherent data. Every UID is issued by a
//! single [`UidAllocator`] owned by the coordinator's registry, so entity and
//! player registrations draw from the same sequence and never collide.

use serde::{Deserialize, Serialize};
use tracing::error;

/// A unique identifier for a registered entity or player.
///
/// UIDs increase monotonically from zero and are never reused within a
/// process lifetime, even after the registration they named is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Uid(pub u64);

impl Uid {
    /// Create a UID from a raw `u64` identifier.
    #[must_use]
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw `u64` identifier.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Uid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Uid({})", self.0)
    }
}

/// Issues monotonically increasing UIDs, starting at zero.
///
/// There is no free-list: a removed registration's UID is retired for good.
#[derive(Debug, Default)]
pub struct UidAllocator {
    next_id: u64,
    exhausted: bool,
}

impl UidAllocator {
    /// Creates a new allocator whose first UID is `Uid(0)`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh UID.
    ///
    /// The counter saturates at `u64::MAX`. Reaching it would take centuries
    /// of continuous registration, so it is logged rather than reported.
    pub fn allocate(&mut self) -> Uid {
        let id = self.next_id;
        match self.next_id.checked_add(1) {
            Some(next) => self.next_id = next,
            None => {
                if !self.exhausted {
                    error!(id, "uid counter exhausted");
                    self.exhausted = true;
                }
            }
        }
        Uid(id)
    }

    /// Returns the number of UIDs issued so far.
    #[must_use]
    pub fn issued(&self) -> u64 {
        self.next_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uid_accessors() {
        let uid = Uid::from_raw(42);
        assert_eq!(uid.id(), 42);
        assert_eq!(uid.to_string(), "Uid(42)");
    }

    #[test]
    fn test_allocator_starts_at_zero() {
        let mut alloc = UidAllocator::new();
        assert_eq!(alloc.allocate(), Uid(0));
        assert_eq!(alloc.allocate(), Uid(1));
        assert_eq!(alloc.allocate(), Uid(2));
        assert_eq!(alloc.issued(), 3);
    }

    #[test]
    fn test_allocator_is_strictly_increasing() {
        let mut alloc = UidAllocator::new();
        let uids: Vec<Uid> = (0..100).map(|_| alloc.allocate()).collect();
        assert!(uids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_allocator_saturates_instead_of_wrapping() {
        let mut alloc = UidAllocator {
            next_id: u64::MAX,
            exhausted: false,
        };
        assert_eq!(alloc.allocate(), Uid(u64::MAX));
        assert_eq!(alloc.allocate(), Uid(u64::MAX));
        assert!(alloc.exhausted);
    }
}
