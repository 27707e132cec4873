//=========================================================================
// Input Dispatch
//=========================================================================
//
// Turns the keys held this frame into queued commands.
//
// Architecture:
//   pressed keys → diff against held set → CommandMap → CommandFilter → queue
//
// Only keys that went down this frame produce commands, so a held key fires
// once. Each player type is allowed its own subset of commands.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;

use tracing::trace;

//=== CommandMap ==========================================================

/// Key → command bindings.
#[derive(Debug, Clone)]
pub struct CommandMap<K, C> {
    bindings: HashMap<K, C>,
}

impl<K: Eq + Hash, C> CommandMap<K, C> {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// Binds `key` to `command`, returning the command it replaced.
    pub fn bind(&mut self, key: K, command: C) -> Option<C> {
        self.bindings.insert(key, command)
    }

    /// Removes the binding for `key`.
    pub fn unbind(&mut self, key: &K) -> bool {
        self.bindings.remove(key).is_some()
    }

    /// Returns the command bound to `key`.
    #[must_use]
    pub fn command_for(&self, key: &K) -> Option<&C> {
        self.bindings.get(key)
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns `true` if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<K: Eq + Hash, C> Default for CommandMap<K, C> {
    fn default() -> Self {
        Self::new()
    }
}

//=== CommandFilter =======================================================

/// Per player type allow-lists. A player type with no entry is allowed
/// nothing.
#[derive(Debug, Clone)]
pub struct CommandFilter<T, C> {
    allowed: HashMap<T, HashSet<C>>,
}

impl<T: Eq + Hash, C: Eq + Hash> CommandFilter<T, C> {
    /// Creates a filter that permits nothing.
    #[must_use]
    pub fn new() -> Self {
        Self {
            allowed: HashMap::new(),
        }
    }

    /// Allows `kind` to issue `command`.
    pub fn allow(&mut self, kind: T, command: C) {
        self.allowed.entry(kind).or_default().insert(command);
    }

    /// Revokes `command` from `kind`. Returns `true` if it had been allowed.
    pub fn deny(&mut self, kind: &T, command: &C) -> bool {
        self.allowed
            .get_mut(kind)
            .is_some_and(|commands| commands.remove(command))
    }

    /// Returns `true` if `kind` may issue `command`.
    #[must_use]
    pub fn permits(&self, kind: &T, command: &C) -> bool {
        self.allowed
            .get(kind)
            .is_some_and(|commands| commands.contains(command))
    }
}

impl<T: Eq + Hash, C: Eq + Hash> Default for CommandFilter<T, C> {
    fn default() -> Self {
        Self::new()
    }
}

//=== InputDispatcher =====================================================

/// Diffs pressed keys frame to frame and queues the permitted commands.
#[derive(Debug, Clone)]
pub struct InputDispatcher<K, C, T> {
    map: CommandMap<K, C>,
    filter: CommandFilter<T, C>,
    /// Keys held as of the last processed frame.
    held: HashSet<K>,
    /// Commands awaiting [`InputDispatcher::drain`].
    queue: VecDeque<C>,
}

impl<K, C, T> InputDispatcher<K, C, T>
where
    K: Eq + Hash + Copy,
    C: Eq + Hash + Clone,
    T: Eq + Hash,
{
    /// Creates a dispatcher from bindings and filters.
    #[must_use]
    pub fn new(map: CommandMap<K, C>, filter: CommandFilter<T, C>) -> Self {
        Self {
            map,
            filter,
            held: HashSet::new(),
            queue: VecDeque::new(),
        }
    }

    /// Bindings used by this dispatcher.
    pub fn map_mut(&mut self) -> &mut CommandMap<K, C> {
        &mut self.map
    }

    /// Filters used by this dispatcher.
    pub fn filter_mut(&mut self) -> &mut CommandFilter<T, C> {
        &mut self.filter
    }

    /// Processes one frame of input for a player of type `kind`.
    ///
    /// `pressed` is every key currently down. Keys that were not down last
    /// frame are looked up and, if permitted, queued in the order given.
    /// Returns how many commands were queued.
    pub fn process_frame<I>(&mut self, kind: &T, pressed: I) -> usize
    where
        I: IntoIterator<Item = K>,
    {
        let mut now_held = HashSet::new();
        let mut queued = 0;

        for key in pressed {
            // Duplicates within a frame count once.
            if !now_held.insert(key) || self.held.contains(&key) {
                continue;
            }
            let Some(command) = self.map.command_for(&key) else {
                continue;
            };
            if self.filter.permits(kind, command) {
                self.queue.push_back(command.clone());
                queued += 1;
            }
        }

        self.held = now_held;
        if queued > 0 {
            trace!(queued, pending = self.queue.len(), "commands queued");
        }
        queued
    }

    /// Removes and yields every queued command, oldest first.
    pub fn drain(&mut self) -> impl Iterator<Item = C> + '_ {
        self.queue.drain(..)
    }

    /// Number of queued commands.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Forgets held keys and drops queued commands.
    pub fn reset(&mut self) {
        self.held.clear();
        self.queue.clear();
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
