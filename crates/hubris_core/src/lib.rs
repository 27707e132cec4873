//! # hubris_core
//!
//! Engine-agnostic core of the Hubris coordinator.
//!
//! This crate provides:
//!
//! - [`Uid`] and [`UidAllocator`] — monotonically increasing identifiers.
//! - [`Registry`] — UID-keyed entity and player handles in separate namespaces.
//! - [`TickBroadcaster`] — fixed-period fixed/regular/late notifications.
//! - [`Coordinator`] — owns both and forwards host frame callbacks, with an
//!   optional process-wide single-instance guard.
//! - [`InputDispatcher`] — pressed-key diffing into per-player-type commands.
//! - [`HubrisConfig`] — JSON configuration.
//!
//! Everything here runs on the host's frame thread; nothing blocks.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod input;
pub mod registry;
pub mod tick;
pub mod uid;

pub use config::HubrisConfig;
pub use coordinator::{Coordinator, GLOBAL_SLOT, InstanceSlot};
pub use error::HubrisError;
pub use input::{CommandFilter, CommandMap, InputDispatcher};
pub use registry::Registry;
pub use tick::{
    ListenerFailurePolicy, ListenerResult, OverflowPolicy, Phase, Subscription, TickBroadcaster,
    TickConfig, TickState,
};
pub use uid::{Uid, UidAllocator};
