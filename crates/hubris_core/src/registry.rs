//! Entity and player registry.
//!
//! The coordinator keeps one registry for its whole lifetime. It associates
//! freshly issued [`Uid`]s with caller-supplied handles in two separate
//! mappings, one for generic entities and one for players. Both mappings share
//! a single [`UidAllocator`], so a UID is never a key in both at once.
//!
//! Handles are opaque: the registry never constructs or inspects
//! them. A missing UID is a normal outcome and is reported as `None`/`false`.

use std::collections::HashMap;

use tracing::trace;

use crate::uid::{Uid, UidAllocator};

/// Registry of live entities and players, keyed by [`Uid`].
///
/// `E` is the entity handle type and `P` the player handle type. They default
/// to the same type since players are structurally ordinary entities kept in
/// their own namespace.
#[derive(Debug)]
pub struct Registry<E, P = E> {
    /// Shared UID counter for both mappings.
    allocator: UidAllocator,
    /// Live entity registrations.
    entities: HashMap<Uid, E>,
    /// Live player registrations.
    players: HashMap<Uid, P>,
}

impl<E, P> Registry<E, P> {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            allocator: UidAllocator::new(),
            entities: HashMap::new(),
            players: HashMap::new(),
        }
    }

    /// Register an entity handle and return its fresh UID.
    ///
    /// Registering the same handle twice yields two distinct UIDs.
    pub fn register_entity(&mut self, handle: E) -> Uid {
        let uid = self.allocator.allocate();
        self.entities.insert(uid, handle);
        trace!(%uid, "entity registered");
        uid
    }

    /// Register a player handle and return its fresh UID.
    pub fn register_player(&mut self, handle: P) -> Uid {
        let uid = self.allocator.allocate();
        self.players.insert(uid, handle);
        trace!(%uid, "player registered");
        uid
    }

    /// Remove an entity registration.
    ///
    /// Returns `true` if the UID was registered as an entity and is now gone.
    pub fn unregister_entity(&mut self, uid: Uid) -> bool {
        let removed = self.entities.remove(&uid).is_some();
        if removed {
            trace!(%uid, "entity unregistered");
        }
        removed
    }

    /// Remove a player registration.
    ///
    /// Returns `true` if the UID was registered as a player and is now gone.
    pub fn unregister_player(&mut self, uid: Uid) -> bool {
        let removed = self.players.remove(&uid).is_some();
        if removed {
            trace!(%uid, "player unregistered");
        }
        removed
    }

    /// Returns the entity handle registered under `uid`.
    #[must_use]
    pub fn get_entity(&self, uid: Uid) -> Option<&E> {
        self.entities.get(&uid)
    }

    /// Returns the player handle registered under `uid`.
    #[must_use]
    pub fn get_player(&self, uid: Uid) -> Option<&P> {
        self.players.get(&uid)
    }

    /// Returns `true` if `uid` is a live entity registration.
    #[must_use]
    pub fn contains_entity(&self, uid: Uid) -> bool {
        self.entities.contains_key(&uid)
    }

    /// Returns `true` if `uid` is a live player registration.
    #[must_use]
    pub fn contains_player(&self, uid: Uid) -> bool {
        self.players.contains_key(&uid)
    }

    /// Read-only view of all live entities, for iteration by other
    /// subsystems. Mutation goes through register/unregister only.
    #[must_use]
    pub fn entity_snapshot(&self) -> &HashMap<Uid, E> {
        &self.entities
    }

    /// Read-only view of all live players.
    #[must_use]
    pub fn player_snapshot(&self) -> &HashMap<Uid, P> {
        &self.players
    }

    /// Returns the number of live entity registrations.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Returns the number of live player registrations.
    #[must_use]
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Returns how many UIDs have been issued across both mappings.
    #[must_use]
    pub fn issued(&self) -> u64 {
        self.allocator.issued()
    }
}

impl<E, P> Default for Registry<E, P> {
    fn default() -> Self {
        Self::new()
    }
}
