//! Tick broadcaster.
//!
//! Turns the host's per-frame delta-time feed into a fixed-period triplet of
//! notifications:
//!
//! 1. **Fixed**: delivered on every fixed-step phase, unconditionally. The
//!    fixed phase also accumulates time and arms the broadcaster once the
//!    configured interval has been exceeded.
//! 2. **Regular**: delivered once per armed cycle, during the regular phase.
//! 3. **Late**: delivered once per armed cycle, during the late phase, which
//!    then disarms the broadcaster and completes the tick.
//!
//! The host calls the three phases in order once per frame. Exactly one
//! regular+late pair fires per interval crossing and pairs never overlap.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::error::HubrisError;

/// Result type returned by fallible listeners.
pub type ListenerResult = anyhow::Result<()>;

type BoxedListener = Box<dyn FnMut() -> ListenerResult>;

/// What happens to the time accumulated past the interval when a tick arms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Reset the accumulator to zero, discarding any overshoot.
    #[default]
    Reset,
    /// Subtract one interval, keeping the overshoot for the next cycle.
    CarryOver,
}

/// How the broadcaster reacts to a listener returning an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerFailurePolicy {
    /// Log the failure and keep notifying the remaining listeners.
    #[default]
    Isolate,
    /// Skip the remaining listeners of the phase and report the failure.
    Abort,
}

/// Configuration for the tick broadcaster. Fixed once the broadcaster is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Seconds of accumulated fixed-step time needed to arm a tick.
    pub interval_secs: f64,
    /// Treatment of the overshoot past the interval.
    pub overflow: OverflowPolicy,
    /// Treatment of failing listeners.
    pub listener_failures: ListenerFailurePolicy,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            interval_secs: 1.0 / 20.0,
            overflow: OverflowPolicy::Reset,
            listener_failures: ListenerFailurePolicy::Isolate,
        }
    }
}

impl TickConfig {
    /// Create a config with the given interval and default policies.
    #[must_use]
    pub fn with_interval(interval_secs: f64) -> Self {
        Self {
            interval_secs,
            ..Self::default()
        }
    }

    /// Checks the interval is a positive, finite number of seconds.
    ///
    /// # Errors
    ///
    /// Returns [`HubrisError::InvalidInterval`] otherwise.
    pub fn validate(&self) -> Result<(), HubrisError> {
        if self.interval_secs.is_finite() && self.interval_secs > 0.0 {
            Ok(())
        } else {
            Err(HubrisError::InvalidInterval(self.interval_secs))
        }
    }
}

/// One of the three notification phases of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Fixed-step phase; fires every frame.
    Fixed,
    /// Regular phase; fires once per tick.
    Regular,
    /// Late phase; fires once per tick and completes it.
    Late,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Fixed => "fixed",
            Phase::Regular => "regular",
            Phase::Late => "late",
        };
        f.write_str(name)
    }
}

/// Handle returned by a subscription, used to unsubscribe later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    id: u64,
    phase: Phase,
}

impl Subscription {
    /// The phase this subscription listens to.
    #[must_use]
    pub fn phase(self) -> Phase {
        self.phase
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.phase, self.id)
    }
}

/// Whether a tick is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickState {
    /// Accumulating time.
    Idle,
    /// Interval exceeded; regular and late notifications are pending.
    Armed,
}

/// Ordered list of listeners for one phase.
struct ListenerList {
    entries: Vec<(Subscription, BoxedListener)>,
}

impl ListenerList {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn remove(&mut self, subscription: Subscription) -> bool {
        match self.entries.iter().position(|(s, _)| *s == subscription) {
            Some(pos) => {
                // `remove`, not `swap_remove`: survivors keep subscription order.
                self.entries.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Invoke every listener in subscription order.
    fn notify(&mut self, policy: ListenerFailurePolicy) -> Result<(), HubrisError> {
        for (subscription, listener) in &mut self.entries {
            if let Err(source) = listener() {
                match policy {
                    ListenerFailurePolicy::Isolate => {
                        warn!(%subscription, error = %source, "listener failed");
                    }
                    ListenerFailurePolicy::Abort => {
                        return Err(HubrisError::Listener {
                            phase: subscription.phase,
                            subscription: *subscription,
                            source,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// Fixed-period broadcaster of fixed/regular/late notifications.
pub struct TickBroadcaster {
    /// Broadcaster configuration.
    config: TickConfig,
    /// Fixed-step seconds accumulated since the last arm.
    accumulator: f64,
    /// Current state of the pending-tick flag.
    state: TickState,
    /// Whether regular listeners already fired for the armed cycle.
    regular_fired: bool,
    /// Number of completed ticks.
    tick_id: u64,
    /// Next subscription identifier.
    next_subscription: u64,
    fixed: ListenerList,
    regular: ListenerList,
    late: ListenerList,
}

impl TickBroadcaster {
    /// Create a broadcaster with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`HubrisError::InvalidInterval`] if the interval is not a
    /// positive, finite number.
    pub fn new(config: TickConfig) -> Result<Self, HubrisError> {
        config.validate()?;
        Ok(Self {
            config,
            accumulator: 0.0,
            state: TickState::Idle,
            regular_fired: false,
            tick_id: 0,
            next_subscription: 0,
            fixed: ListenerList::new(),
            regular: ListenerList::new(),
            late: ListenerList::new(),
        })
    }

    /// Returns the broadcaster configuration.
    #[must_use]
    pub fn config(&self) -> &TickConfig {
        &self.config
    }

    /// Returns the number of completed ticks.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.tick_id
    }

    /// Returns the seconds accumulated towards the next tick.
    #[must_use]
    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    /// Returns whether a tick is pending.
    #[must_use]
    pub fn state(&self) -> TickState {
        self.state
    }

    /// Returns the number of listeners subscribed to `phase`.
    #[must_use]
    pub fn listener_count(&self, phase: Phase) -> usize {
        self.list(phase).entries.len()
    }

    fn list(&self, phase: Phase) -> &ListenerList {
        match phase {
            Phase::Fixed => &self.fixed,
            Phase::Regular => &self.regular,
            Phase::Late => &self.late,
        }
    }

    fn list_mut(&mut self, phase: Phase) -> &mut ListenerList {
        match phase {
            Phase::Fixed => &mut self.fixed,
            Phase::Regular => &mut self.regular,
            Phase::Late => &mut self.late,
        }
    }

    /// Subscribe an infallible listener to `phase`.
    pub fn subscribe<F>(&mut self, phase: Phase, mut listener: F) -> Subscription
    where
        F: FnMut() + 'static,
    {
        self.try_subscribe(phase, move || {
            listener();
            Ok(())
        })
    }

    /// Subscribe a fallible listener to `phase`.
    ///
    /// What happens when it fails depends on the configured
    /// [`ListenerFailurePolicy`].
    pub fn try_subscribe<F>(&mut self, phase: Phase, listener: F) -> Subscription
    where
        F: FnMut() -> ListenerResult + 'static,
    {
        let subscription = Subscription {
            id: self.next_subscription,
            phase,
        };
        self.next_subscription += 1;
        self.list_mut(phase)
            .entries
            .push((subscription, Box::new(listener)));
        trace!(%subscription, "listener subscribed");
        subscription
    }

    /// Subscribe to the fixed-step phase.
    pub fn subscribe_fixed<F: FnMut() + 'static>(&mut self, listener: F) -> Subscription {
        self.subscribe(Phase::Fixed, listener)
    }

    /// Subscribe to the regular phase.
    pub fn subscribe_regular<F: FnMut() + 'static>(&mut self, listener: F) -> Subscription {
        self.subscribe(Phase::Regular, listener)
    }

    /// Subscribe to the late phase.
    pub fn subscribe_late<F: FnMut() + 'static>(&mut self, listener: F) -> Subscription {
        self.subscribe(Phase::Late, listener)
    }

    /// Remove a listener. Returns `true` if it was still subscribed.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let removed = self.list_mut(subscription.phase).remove(subscription);
        if removed {
            trace!(%subscription, "listener unsubscribed");
        }
        removed
    }

    /// Run the fixed-step phase.
    ///
    /// Fixed listeners are always notified first. The elapsed time is then
    /// accumulated and, if the interval has been exceeded, the
    /// broadcaster arms.
    ///
    /// # Errors
    ///
    /// Returns [`HubrisError::Listener`] if a listener fails under
    /// [`ListenerFailurePolicy::Abort`]. Time is accumulated regardless.
    pub fn fixed_step(&mut self, delta_secs: f64) -> Result<(), HubrisError> {
        let notified = self.fixed.notify(self.config.listener_failures);

        self.accumulator += delta_secs;
        if self.accumulator > self.config.interval_secs {
            match self.config.overflow {
                // Crossings while armed merge into the pending tick.
                OverflowPolicy::Reset => self.accumulator = 0.0,
                OverflowPolicy::CarryOver if self.state == TickState::Idle => {
                    self.accumulator -= self.config.interval_secs;
                }
                OverflowPolicy::CarryOver => {}
            }
            if self.state == TickState::Idle {
                self.state = TickState::Armed;
                trace!(
                    tick_id = self.tick_id,
                    accumulator = self.accumulator,
                    "tick armed"
                );
            }
        }

        notified
    }

    /// Run the regular phase. Notifies regular listeners once per armed cycle.
    ///
    /// # Errors
    ///
    /// Returns [`HubrisError::Listener`] if a listener fails under
    /// [`ListenerFailurePolicy::Abort`].
    pub fn regular(&mut self, _delta_secs: f64) -> Result<(), HubrisError> {
        if self.state != TickState::Armed || self.regular_fired {
            return Ok(());
        }
        self.regular_fired = true;
        self.regular.notify(self.config.listener_failures)
    }

    /// Run the late phase. If armed, notifies late listeners and completes
    /// the tick.
    ///
    /// Regular listeners are notified first if the host skipped the regular
    /// phase this cycle.
    ///
    /// # Errors
    ///
    /// Returns [`HubrisError::Listener`] if a listener fails under
    /// [`ListenerFailurePolicy::Abort`]. The tick completes regardless.
    pub fn late(&mut self, delta_secs: f64) -> Result<(), HubrisError> {
        if self.state != TickState::Armed {
            return Ok(());
        }

        let regular = self.regular(delta_secs);
        let late = self.late.notify(self.config.listener_failures);

        self.state = TickState::Idle;
        self.regular_fired = false;
        if self.config.overflow == OverflowPolicy::Reset {
            self.accumulator = 0.0;
        }
        self.tick_id += 1;
        debug!(tick_id = self.tick_id, "tick complete");

        regular.and(late)
    }
}

impl fmt::Debug for TickBroadcaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickBroadcaster")
            .field("config", &self.config)
            .field("accumulator", &self.accumulator)
            .field("state", &self.state)
            .field("tick_id", &self.tick_id)
            .field("fixed_listeners", &self.fixed.entries.len())
            .field("regular_listeners", &self.regular.entries.len())
            .field("late_listeners", &self.late.entries.len())
            .finish()
    }
}
