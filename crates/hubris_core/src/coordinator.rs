//! The process-wide coordinator.
//!
//! A [`Coordinator`] owns one [`Registry`] and one [`TickBroadcaster`] for its
//! whole lifetime and forwards the host's per-frame callbacks into the
//! broadcaster. Hosts that want the single-instance guarantee construct it
//! through [`Coordinator::install`], which claims the process-wide
//! [`InstanceSlot`]; a losing install is discarded silently.
//!
//! ## Frame contract
//!
//! Once per host frame, on one thread and in this order:
//!
//! 1. [`Coordinator::on_fixed_frame`]
//! 2. [`Coordinator::on_frame`]
//! 3. [`Coordinator::on_late_frame`]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, error, info};

use crate::error::HubrisError;
use crate::registry::Registry;
use crate::tick::{Phase, Subscription, TickBroadcaster, TickConfig};
use crate::uid::Uid;

/// The slot used by [`Coordinator::install`].
pub static GLOBAL_SLOT: InstanceSlot = InstanceSlot::new();

/// Guard allowing at most one installed coordinator at a time.
///
/// Claiming is a compare-and-set on an atomic flag, serialised by a mutex so
/// that competing installs during host start-up resolve one at a time.
#[derive(Debug)]
pub struct InstanceSlot {
    active: AtomicBool,
    lock: Mutex<()>,
}

impl InstanceSlot {
    /// Create an unclaimed slot.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            lock: Mutex::new(()),
        }
    }

    /// Returns `true` while a coordinator holds this slot.
    #[must_use]
    pub fn is_claimed(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn claim(&'static self) -> Option<SlotClaim> {
        // The guarded data is `()`, so a poisoned lock carries no broken state.
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SlotClaim { slot: self })
    }
}

impl Default for InstanceSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases the slot when the owning coordinator goes away.
#[derive(Debug)]
struct SlotClaim {
    slot: &'static InstanceSlot,
}

impl Drop for SlotClaim {
    fn drop(&mut self) {
        let _guard = self.slot.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.slot.active.store(false, Ordering::Release);
    }
}

/// Owns the registry and tick broadcaster and drives them from host frames.
#[derive(Debug)]
pub struct Coordinator<E, P = E> {
    /// Live entity and player registrations.
    registry: Registry<E, P>,
    /// Fixed/regular/late notification source.
    broadcaster: TickBroadcaster,
    /// Present when this coordinator was installed into a slot.
    claim: Option<SlotClaim>,
}

impl<E, P> Coordinator<E, P> {
    /// Create a standalone coordinator that does not claim any slot.
    ///
    /// # Errors
    ///
    /// Returns [`HubrisError::InvalidInterval`] if the tick configuration is
    /// unusable. This is fatal: the host should not retry with the same
    /// configuration.
    pub fn new(config: TickConfig) -> Result<Self, HubrisError> {
        let broadcaster = TickBroadcaster::new(config).inspect_err(|e| {
            error!(error = %e, "coordinator misconfigured");
        })?;
        Ok(Self {
            registry: Registry::new(),
            broadcaster,
            claim: None,
        })
    }

    /// Install the process-wide coordinator.
    ///
    /// Returns `Ok(None)` if another coordinator is already installed; the
    /// newcomer is discarded and nothing is reported beyond a debug log.
    ///
    /// # Errors
    ///
    /// Returns [`HubrisError::InvalidInterval`] if the configuration is
    /// unusable.
    pub fn install(config: TickConfig) -> Result<Option<Self>, HubrisError> {
        Self::install_in(&GLOBAL_SLOT, config)
    }

    /// Install a coordinator into a caller-owned slot.
    ///
    /// # Errors
    ///
    /// See [`Coordinator::install`].
    pub fn install_in(
        slot: &'static InstanceSlot,
        config: TickConfig,
    ) -> Result<Option<Self>, HubrisError> {
        let mut coordinator = Self::new(config)?;
        match slot.claim() {
            Some(claim) => {
                coordinator.claim = Some(claim);
                info!(
                    interval_secs = coordinator.broadcaster.config().interval_secs,
                    "coordinator installed"
                );
                Ok(Some(coordinator))
            }
            None => {
                debug!("coordinator already installed, discarding duplicate");
                Ok(None)
            }
        }
    }

    /// Returns `true` if this coordinator holds an instance slot.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.claim.is_some()
    }

    /// Tear the coordinator down, releasing its slot.
    pub fn shutdown(self) {
        info!(
            tick_id = self.broadcaster.tick_id(),
            entities = self.registry.entity_count(),
            players = self.registry.player_count(),
            "coordinator shut down"
        );
    }

    //--- Host frame callbacks ---------------------------------------------

    /// Forward the host's fixed-step callback.
    ///
    /// # Errors
    ///
    /// Propagates listener failures under the abort policy.
    pub fn on_fixed_frame(&mut self, delta_secs: f64) -> Result<(), HubrisError> {
        self.broadcaster.fixed_step(delta_secs)
    }

    /// Forward the host's per-frame callback.
    ///
    /// # Errors
    ///
    /// Propagates listener failures under the abort policy.
    pub fn on_frame(&mut self, delta_secs: f64) -> Result<(), HubrisError> {
        self.broadcaster.regular(delta_secs)
    }

    /// Forward the host's late-frame callback.
    ///
    /// # Errors
    ///
    /// Propagates listener failures under the abort policy.
    pub fn on_late_frame(&mut self, delta_secs: f64) -> Result<(), HubrisError> {
        self.broadcaster.late(delta_secs)
    }

    //--- Accessors ---------------------------------------------------------

    /// Returns a reference to the registry.
    #[must_use]
    pub fn registry(&self) -> &Registry<E, P> {
        &self.registry
    }

    /// Returns a mutable reference to the registry.
    pub fn registry_mut(&mut self) -> &mut Registry<E, P> {
        &mut self.registry
    }

    /// Returns a reference to the tick broadcaster.
    #[must_use]
    pub fn broadcaster(&self) -> &TickBroadcaster {
        &self.broadcaster
    }

    /// Returns a mutable reference to the tick broadcaster.
    pub fn broadcaster_mut(&mut self) -> &mut TickBroadcaster {
        &mut self.broadcaster
    }

    /// Returns the number of completed ticks.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.broadcaster.tick_id()
    }

    //--- Registry pass-throughs -------------------------------------------

    /// See [`Registry::register_entity`].
    pub fn register_entity(&mut self, handle: E) -> Uid {
        self.registry.register_entity(handle)
    }

    /// See [`Registry::register_player`].
    pub fn register_player(&mut self, handle: P) -> Uid {
        self.registry.register_player(handle)
    }

    /// See [`Registry::unregister_entity`].
    pub fn unregister_entity(&mut self, uid: Uid) -> bool {
        self.registry.unregister_entity(uid)
    }

    /// See [`Registry::unregister_player`].
    pub fn unregister_player(&mut self, uid: Uid) -> bool {
        self.registry.unregister_player(uid)
    }

    /// See [`Registry::get_entity`].
    #[must_use]
    pub fn get_entity(&self, uid: Uid) -> Option<&E> {
        self.registry.get_entity(uid)
    }

    /// See [`Registry::get_player`].
    #[must_use]
    pub fn get_player(&self, uid: Uid) -> Option<&P> {
        self.registry.get_player(uid)
    }

    //--- Subscription pass-throughs ---------------------------------------

    /// Subscribe to the fixed-step phase.
    pub fn subscribe_fixed<F: FnMut() + 'static>(&mut self, listener: F) -> Subscription {
        self.broadcaster.subscribe(Phase::Fixed, listener)
    }

    /// Subscribe to the regular phase.
    pub fn subscribe_regular<F: FnMut() + 'static>(&mut self, listener: F) -> Subscription {
        self.broadcaster.subscribe(Phase::Regular, listener)
    }

    /// Subscribe to the late phase.
    pub fn subscribe_late<F: FnMut() + 'static>(&mut self, listener: F) -> Subscription {
        self.broadcaster.subscribe(Phase::Late, listener)
    }

    /// Remove a listener. Returns `true` if it was still subscribed.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.broadcaster.unsubscribe(subscription)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn test_new_rejects_bad_interval() {
        let result = Coordinator::<u32>::new(TickConfig::with_interval(-0.5));
        assert!(matches!(result, Err(HubrisError::InvalidInterval(_))));
    }

    #[test]
    fn test_standalone_coordinator_is_not_installed() {
        let coordinator = Coordinator::<u32>::new(TickConfig::default()).unwrap();
        assert!(!coordinator.is_installed());
    }

    #[test]
    fn test_second_install_is_discarded() {
        static SLOT: InstanceSlot = InstanceSlot::new();

        let first = Coordinator::<u32>::install_in(&SLOT, TickConfig::default())
            .unwrap()
            .expect("first install wins");
        assert!(first.is_installed());
        assert!(SLOT.is_claimed());

        let second = Coordinator::<u32>::install_in(&SLOT, TickConfig::default()).unwrap();
        assert!(second.is_none());

        first.shutdown();
        assert!(!SLOT.is_claimed());

        let third = Coordinator::<u32>::install_in(&SLOT, TickConfig::default()).unwrap();
        assert!(third.is_some());
    }

    #[test]
    fn test_misconfigured_install_leaves_slot_free() {
        static SLOT: InstanceSlot = InstanceSlot::new();

        let result = Coordinator::<u32>::install_in(&SLOT, TickConfig::with_interval(0.0));
        assert!(result.is_err());
        assert!(!SLOT.is_claimed());
    }

    #[test]
    fn test_drop_releases_slot() {
        static SLOT: InstanceSlot = InstanceSlot::new();

        {
            let _coordinator = Coordinator::<u32>::install_in(&SLOT, TickConfig::default())
                .unwrap()
                .expect("slot is free");
            assert!(SLOT.is_claimed());
        }
        assert!(!SLOT.is_claimed());
    }

    #[test]
    fn test_concurrent_installs_admit_one() {
        static SLOT: InstanceSlot = InstanceSlot::new();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                std::thread::spawn(|| {
                    // Coordinators hold `!Send` listeners, so report only the outcome.
                    Coordinator::<u32>::install_in(&SLOT, TickConfig::default())
                        .unwrap()
                        .map(std::mem::forget)
                        .is_some()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert!(SLOT.is_claimed());
    }

    #[test]
    fn test_frame_callbacks_drive_broadcaster() {
        let mut coordinator = Coordinator::<u32>::new(TickConfig::with_interval(1.0)).unwrap();
        let regular = Rc::new(Cell::new(0));
        let counter = Rc::clone(&regular);
        coordinator.subscribe_regular(move || counter.set(counter.get() + 1));

        for _ in 0..3 {
            coordinator.on_fixed_frame(0.4).unwrap();
            coordinator.on_frame(0.4).unwrap();
            coordinator.on_late_frame(0.4).unwrap();
        }

        assert_eq!(regular.get(), 1);
        assert_eq!(coordinator.tick_id(), 1);
    }

    #[test]
    fn test_registry_pass_throughs() {
        let mut coordinator = Coordinator::<&str>::new(TickConfig::default()).unwrap();
        let crate_uid = coordinator.register_entity("crate");
        let alice = coordinator.register_player("alice");

        assert_eq!(coordinator.get_entity(crate_uid), Some(&"crate"));
        assert_eq!(coordinator.get_player(alice), Some(&"alice"));
        assert!(coordinator.get_player(crate_uid).is_none());
        assert!(coordinator.unregister_player(alice));
        assert!(!coordinator.unregister_player(alice));
        assert!(coordinator.unregister_entity(crate_uid));
        assert_eq!(coordinator.registry().entity_count(), 0);
    }
}
