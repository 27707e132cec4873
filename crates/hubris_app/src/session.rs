//! Host session — one coordinator driven frame by frame.
//!
//! The session plays the part of the game engine: it owns the coordinator,
//! feeds it fixed/regular/late callbacks, then runs the input phase and
//! applies the resulting commands to the registry.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use anyhow::Result;
use tracing::{debug, info};

use hubris_core::{CommandFilter, CommandMap, Coordinator, InputDispatcher, Uid};

/// Keys the scripted player presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    F,
    X,
    Tab,
}

/// Commands the host understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Spawn,
    Despawn,
    Status,
}

/// Player types with distinct command permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerKind {
    Builder,
    Spectator,
}

/// A spawned prop.
#[derive(Debug, Clone)]
pub struct Prop {
    pub spawned_at_tick: u64,
}

/// A connected player.
#[derive(Debug, Clone)]
pub struct Player {
    pub name: String,
    pub kind: PlayerKind,
}

/// Entity handle stored in the registry.
#[derive(Debug, Clone)]
pub enum Handle {
    Prop(Prop),
    Player(Player),
}

/// Host state for one run.
pub struct Session {
    coordinator: Coordinator<Handle>,
    input: InputDispatcher<Key, Command, PlayerKind>,
    /// The player whose input is scripted.
    local_player: Uid,
    /// Props in spawn order, oldest first.
    props: VecDeque<Uid>,
    /// Regular-phase notifications seen so far.
    regular_ticks: Rc<Cell<u64>>,
    frame: u64,
}

impl Session {
    /// Build a session around an installed coordinator.
    pub fn new(mut coordinator: Coordinator<Handle>) -> Self {
        let local_player = coordinator.register_player(Handle::Player(Player {
            name: "builder".to_string(),
            kind: PlayerKind::Builder,
        }));
        coordinator.register_player(Handle::Player(Player {
            name: "observer".to_string(),
            kind: PlayerKind::Spectator,
        }));

        let regular_ticks = Rc::new(Cell::new(0));
        let counter = Rc::clone(&regular_ticks);
        coordinator.subscribe_regular(move || counter.set(counter.get() + 1));
        coordinator.subscribe_late(|| debug!("late tick"));

        Self {
            coordinator,
            input: default_input(),
            local_player,
            props: VecDeque::new(),
            regular_ticks,
            frame: 0,
        }
    }

    /// Run one host frame.
    pub fn frame(&mut self, delta_secs: f64) -> Result<()> {
        self.coordinator.on_fixed_frame(delta_secs)?;
        self.coordinator.on_frame(delta_secs)?;
        self.coordinator.on_late_frame(delta_secs)?;

        let kind = match self.coordinator.get_player(self.local_player) {
            Some(Handle::Player(player)) => player.kind,
            _ => PlayerKind::Spectator,
        };
        let pressed = scripted_keys(self.frame);
        self.input.process_frame(&kind, pressed.iter().copied());

        let commands: Vec<Command> = self.input.drain().collect();
        for command in commands {
            self.apply(command);
        }

        self.frame += 1;
        Ok(())
    }

    fn apply(&mut self, command: Command) {
        let tick_id = self.coordinator.tick_id();
        match command {
            Command::Spawn => {
                let uid = self.coordinator.register_entity(Handle::Prop(Prop {
                    spawned_at_tick: tick_id,
                }));
                self.props.push_back(uid);
                debug!(%uid, tick_id, "prop spawned");
            }
            Command::Despawn => {
                let Some(uid) = self.props.pop_front() else {
                    debug!("nothing to despawn");
                    return;
                };
                let removed = self.coordinator.unregister_entity(uid);
                debug!(%uid, removed, "prop despawned");
            }
            Command::Status => self.report(),
        }
    }

    /// Log a summary of the coordinator state.
    pub fn report(&self) {
        let registry = self.coordinator.registry();
        let oldest = self
            .props
            .front()
            .and_then(|uid| registry.get_entity(*uid))
            .and_then(|handle| match handle {
                Handle::Prop(prop) => Some(prop.spawned_at_tick),
                Handle::Player(_) => None,
            });
        let players: Vec<&str> = registry
            .player_snapshot()
            .values()
            .filter_map(|handle| match handle {
                Handle::Player(player) => Some(player.name.as_str()),
                Handle::Prop(_) => None,
            })
            .collect();
        info!(
            frame = self.frame,
            tick_id = self.coordinator.tick_id(),
            regular_ticks = self.regular_ticks.get(),
            props = registry.entity_count(),
            oldest_prop_tick = ?oldest,
            ?players,
            uids_issued = registry.issued(),
            "status"
        );
    }

    /// Tear down, releasing the coordinator slot.
    pub fn shutdown(self) {
        self.report();
        self.coordinator.shutdown();
    }
}

fn default_input() -> InputDispatcher<Key, Command, PlayerKind> {
    let mut map = CommandMap::new();
    map.bind(Key::F, Command::Spawn);
    map.bind(Key::X, Command::Despawn);
    map.bind(Key::Tab, Command::Status);

    let mut filter = CommandFilter::new();
    filter.allow(PlayerKind::Builder, Command::Spawn);
    filter.allow(PlayerKind::Builder, Command::Despawn);
    filter.allow(PlayerKind::Builder, Command::Status);
    filter.allow(PlayerKind::Spectator, Command::Status);

    InputDispatcher::new(map, filter)
}

/// Keys held on a given frame: taps F every 10 frames, X every 25, and holds
/// Tab for 5 frames out of every 120.
fn scripted_keys(frame: u64) -> Vec<Key> {
    let mut keys = Vec::new();
    if frame % 10 == 0 {
        keys.push(Key::F);
    }
    if frame % 25 == 24 {
        keys.push(Key::X);
    }
    if frame % 120 < 5 {
        keys.push(Key::Tab);
    }
    keys
}

#[cfg(test)]
mod tests {
    use hubris_core::TickConfig;

    use super::*;

    fn session() -> Session {
        Session::new(Coordinator::new(TickConfig::with_interval(0.05)).unwrap())
    }

    #[test]
    fn test_scripted_frames_spawn_and_despawn() {
        let mut session = session();
        for _ in 0..50 {
            session.frame(1.0 / 60.0).unwrap();
        }
        // Five spawns (frames 0, 10, 20, 30, 40), two despawns (24, 49).
        assert_eq!(session.props.len(), 3);
        assert_eq!(session.coordinator.registry().entity_count(), 3);
        assert_eq!(session.coordinator.registry().player_count(), 2);
    }

    #[test]
    fn test_despawn_removes_oldest_prop_first() {
        let mut session = session();
        session.apply(Command::Despawn);
        assert!(session.props.is_empty());

        session.apply(Command::Spawn);
        session.apply(Command::Spawn);
        let (oldest, newest) = (session.props[0], session.props[1]);

        session.apply(Command::Despawn);
        assert_eq!(session.props.front(), Some(&newest));
        assert!(session.coordinator.get_entity(oldest).is_none());
        assert!(session.coordinator.get_entity(newest).is_some());
    }

    #[test]
    fn test_regular_ticks_match_completed_ticks() {
        let mut session = session();
        for _ in 0..120 {
            session.frame(1.0 / 60.0).unwrap();
        }
        assert!(session.coordinator.tick_id() > 0);
        assert_eq!(session.regular_ticks.get(), session.coordinator.tick_id());
    }

    #[test]
    fn test_tab_is_held_for_five_frames() {
        let keys: Vec<_> = (0..5).map(scripted_keys).collect();
        assert!(keys.iter().all(|k| k.contains(&Key::Tab)));
        assert!(!scripted_keys(5).contains(&Key::Tab));
    }
}
