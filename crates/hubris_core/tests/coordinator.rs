//! End-to-end frame loop over the public API.

use std::cell::RefCell;
use std::rc::Rc;

use hubris_core::{
    Coordinator, HubrisConfig, HubrisError, InstanceSlot, ListenerFailurePolicy, Phase,
    TickConfig, Uid,
};

#[derive(Debug, Clone, PartialEq)]
struct Pawn {
    name: String,
}

fn pawn(name: &str) -> Pawn {
    Pawn {
        name: name.to_string(),
    }
}

fn run_frame<E>(coordinator: &mut Coordinator<E>, dt: f64) -> Result<(), HubrisError> {
    coordinator.on_fixed_frame(dt)?;
    coordinator.on_frame(dt)?;
    coordinator.on_late_frame(dt)
}

#[test]
fn test_listeners_broadcast_over_registered_entities() {
    let mut coordinator: Coordinator<Pawn> =
        Coordinator::new(TickConfig::with_interval(1.0)).unwrap();
    let a = coordinator.register_entity(pawn("a"));
    let b = coordinator.register_entity(pawn("b"));
    let player = coordinator.register_player(pawn("alice"));
    assert!(a < b && b < player);

    // A late listener collects the ticks; the host reads the registry
    // snapshot whenever a tick completes.
    let ticks = Rc::new(RefCell::new(0u32));
    let seen = Rc::clone(&ticks);
    coordinator.subscribe_late(move || *seen.borrow_mut() += 1);

    let mut visits = Vec::new();
    for _ in 0..6 {
        let before = *ticks.borrow();
        run_frame(&mut coordinator, 0.4).unwrap();
        if *ticks.borrow() > before {
            let mut names: Vec<_> = coordinator
                .registry()
                .entity_snapshot()
                .values()
                .map(|p| p.name.clone())
                .collect();
            names.sort();
            visits.push(names);
        }
    }

    // Crossings at the third and sixth frames.
    assert_eq!(*ticks.borrow(), 2);
    assert_eq!(visits, vec![vec!["a", "b"], vec!["a", "b"]]);
    assert_eq!(coordinator.get_player(player), Some(&pawn("alice")));
    assert!(coordinator.get_entity(player).is_none());
}

#[test]
fn test_phase_order_across_many_frames() {
    let mut coordinator: Coordinator<u8> =
        Coordinator::new(TickConfig::with_interval(0.25)).unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));

    for phase in [Phase::Late, Phase::Regular, Phase::Fixed] {
        let log = Rc::clone(&log);
        coordinator
            .broadcaster_mut()
            .subscribe(phase, move || log.borrow_mut().push(phase));
    }

    for _ in 0..20 {
        run_frame(&mut coordinator, 0.1).unwrap();
    }

    let log = log.borrow();
    for (i, phase) in log.iter().enumerate() {
        match phase {
            Phase::Regular => assert_eq!(log[i - 1], Phase::Fixed),
            Phase::Late => assert_eq!(log[i - 1], Phase::Regular),
            Phase::Fixed => {}
        }
    }
    let fixed = log.iter().filter(|p| **p == Phase::Fixed).count();
    let late = log.iter().filter(|p| **p == Phase::Late).count();
    assert_eq!(fixed, 20);
    assert_eq!(late as u64, coordinator.tick_id());
}

#[test]
fn test_abort_policy_surfaces_to_host() {
    let config = HubrisConfig::from_json_str(
        r#"{ "tick": { "interval_secs": 1.0, "listener_failures": "abort" } }"#,
    )
    .unwrap();
    assert_eq!(config.tick.listener_failures, ListenerFailurePolicy::Abort);

    let mut coordinator: Coordinator<u8> = Coordinator::new(config.tick).unwrap();
    coordinator
        .broadcaster_mut()
        .try_subscribe(Phase::Fixed, || Err(anyhow::anyhow!("sensor offline")));

    let err = run_frame(&mut coordinator, 0.1).unwrap_err();
    assert!(err.to_string().contains("sensor offline"));
}

#[test]
fn test_installed_coordinator_is_unique() {
    static SLOT: InstanceSlot = InstanceSlot::new();

    let mut first: Coordinator<u8> = Coordinator::install_in(&SLOT, TickConfig::default())
        .unwrap()
        .expect("slot is free");
    let uid = first.register_entity(1);
    assert_eq!(uid, Uid(0));

    assert!(
        Coordinator::<u8>::install_in(&SLOT, TickConfig::default())
            .unwrap()
            .is_none()
    );

    first.shutdown();
    assert!(!SLOT.is_claimed());
}
