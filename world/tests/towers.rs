use std::{sync::Arc, time::Duration};

use ar_defense_config::GameConfig;
use ar_defense_core::{
    ActionSource, Command, CreepType, Event, MissionPhase, PlacingId, SessionRole, SpawnId,
    StripState, TowerLevel, TowerSelector, TowerType,
};
use ar_defense_world::{apply, query, World};
use glam::Vec3;

const MISSION: &str = r#"{
    "missions": [
        {
            "difficulty": 1,
            "waves": [[0]],
            "maps": [{ "matrix": [[5, 1, 1, 1, 6], [0, 3, 0, 4, 0]] }]
        }
    ],
    "enciclopedia": { "towers": [], "creeps": [] },
    "initial_values": {
        "grid_diameter": 0.5,
        "wave_interval": 0,
        "coins": COINS,
        "player_hp": 3,
        "grace_time": 1
    }
}"#;

fn ready_world(coins: u32) -> World {
    let text = MISSION.replace("COINS", &coins.to_string());
    let config = GameConfig::from_json_str(&text).expect("valid mission");
    let mut world = World::new(Arc::new(config));
    let mut events = Vec::new();
    for command in [
        Command::LoadMission {
            mission: 0,
            role: SessionRole::Host,
        },
        Command::TemplatesLoaded,
        Command::PlaceMap { anchor: Vec3::ZERO },
    ] {
        apply(&mut world, command, &mut events);
    }
    assert_eq!(query::phase(&world), MissionPhase::ReadyToDefend);
    world
}

fn first_slot(world: &World) -> PlacingId {
    query::placing_slots(world)
        .first()
        .map(|(placing, _)| *placing)
        .expect("map has placing slots")
}

fn run(world: &mut World, command: Command) -> Vec<Event> {
    let mut events = Vec::new();
    apply(world, command, &mut events);
    events
}

fn select(world: &mut World, placing: PlacingId, source: ActionSource) -> Vec<Event> {
    run(
        world,
        Command::CheckPlacing {
            entities: vec![placing.entity()],
            source,
        },
    )
}

fn build(world: &mut World, kind: TowerType, source: ActionSource) -> Vec<Event> {
    run(world, Command::PlaceTower { kind, source })
}

fn upgrade(world: &mut World) -> Vec<Event> {
    run(
        world,
        Command::UpgradeTower {
            source: ActionSource::Host,
            expected: None,
        },
    )
}

fn last_strip(events: &[Event]) -> Option<StripState> {
    events.iter().rev().find_map(|event| match event {
        Event::StripChanged { state, .. } => Some(*state),
        _ => None,
    })
}

#[test]
fn build_is_rejected_when_coins_are_short() {
    let mut world = ready_world(20);
    let slot = first_slot(&world);
    let _ = select(&mut world, slot, ActionSource::Host);

    let events = build(&mut world, TowerType::Turret, ActionSource::Host);

    assert!(
        events.is_empty(),
        "unaffordable build must not emit events: {events:?}"
    );
    assert_eq!(query::coins(&world), 20);
    assert_eq!(query::tower_on(&world, slot), None);
}

#[test]
fn build_spends_coins_and_occupies_the_slot() {
    let mut world = ready_world(100);
    let slot = first_slot(&world);
    let events = select(&mut world, slot, ActionSource::Host);
    assert_eq!(last_strip(&events), Some(StripState::Placing));

    let events = build(&mut world, TowerType::Turret, ActionSource::Host);

    assert_eq!(query::coins(&world), 70);
    let tower = query::tower_on(&world, slot).expect("slot holds the new tower");
    assert!(events.contains(&Event::CoinsChanged { coins: 70 }));
    assert_eq!(
        last_strip(&events),
        Some(StripState::Tower(TowerSelector::new(
            TowerType::Turret,
            TowerLevel::Lvl1
        )))
    );
    assert!(events.contains(&Event::RangeIndicatorChanged {
        source: ActionSource::Host,
        tower: Some(tower),
    }));

    let again = build(&mut world, TowerType::Launcher, ActionSource::Host);
    assert!(again.is_empty(), "an occupied slot cannot take a second tower");
}

#[test]
fn upgrade_replaces_the_tower_in_place() {
    let mut world = ready_world(100);
    let slot = first_slot(&world);
    let _ = select(&mut world, slot, ActionSource::Host);
    let _ = build(&mut world, TowerType::Turret, ActionSource::Host);
    let old = query::tower_on(&world, slot).expect("tower");
    let old_position = query::tower_view(&world).get(old).expect("snapshot").position;

    let events = upgrade(&mut world);

    let new = query::tower_on(&world, slot).expect("upgraded tower");
    assert_ne!(old, new, "upgrade must create a fresh tower entity");
    assert!(events.contains(&Event::TowerRemoved { tower: old }));
    let view = query::tower_view(&world);
    assert!(view.get(old).is_none());
    let snapshot = view.get(new).expect("new snapshot");
    assert_eq!(snapshot.level, TowerLevel::Lvl2);
    assert_eq!(snapshot.position, old_position);
    assert!(snapshot.in_range.is_empty());
    assert_eq!(query::coins(&world), 20);
}

#[test]
fn upgrade_is_a_no_op_when_unaffordable_or_maxed() {
    let mut world = ready_world(40);
    let slot = first_slot(&world);
    let _ = select(&mut world, slot, ActionSource::Host);
    let _ = build(&mut world, TowerType::Turret, ActionSource::Host);
    let tower = query::tower_on(&world, slot);

    assert!(upgrade(&mut world).is_empty());
    assert_eq!(query::tower_on(&world, slot), tower);
    assert_eq!(query::coins(&world), 10);

    let mut rich = ready_world(1_000);
    let slot = first_slot(&rich);
    let _ = select(&mut rich, slot, ActionSource::Host);
    let _ = build(&mut rich, TowerType::Launcher, ActionSource::Host);
    assert!(!upgrade(&mut rich).is_empty());
    assert!(!upgrade(&mut rich).is_empty());
    let coins = query::coins(&rich);

    assert!(upgrade(&mut rich).is_empty(), "level 3 is the maximum");
    assert_eq!(query::coins(&rich), coins);
    assert_eq!(coins, 1_000 - 40 - 65 - 100);
}

#[test]
fn sell_refunds_half_the_current_level_cost() {
    let mut world = ready_world(200);
    let slot = first_slot(&world);
    let _ = select(&mut world, slot, ActionSource::Host);
    let _ = build(&mut world, TowerType::Barracks, ActionSource::Host);
    let _ = upgrade(&mut world);
    assert_eq!(query::coins(&world), 200 - 35 - 55);
    assert_eq!(query::troop_view(&world).iter().count(), 1);

    let events = run(
        &mut world,
        Command::SellTower {
            source: ActionSource::Host,
            expected: None,
        },
    );

    assert_eq!(query::coins(&world), 200 - 35 - 55 + 27);
    assert_eq!(query::tower_on(&world, slot), None);
    assert_eq!(query::troop_view(&world).iter().count(), 0);
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::TroopRemoved { killed: false, .. })));
    assert_eq!(last_strip(&events), Some(StripState::Placing));
}

#[test]
fn selection_toggles_per_source() {
    let mut world = ready_world(100);
    let slot = first_slot(&world);

    let _ = select(&mut world, slot, ActionSource::Host);
    let _ = select(&mut world, slot, ActionSource::Coop);
    assert_eq!(query::selection(&world, ActionSource::Host), Some(slot));
    assert_eq!(query::selection(&world, ActionSource::Coop), Some(slot));

    let events = select(&mut world, slot, ActionSource::Host);
    assert_eq!(query::selection(&world, ActionSource::Host), None);
    assert_eq!(query::selection(&world, ActionSource::Coop), Some(slot));
    assert!(events.contains(&Event::RangeIndicatorChanged {
        source: ActionSource::Host,
        tower: None,
    }));
    assert_eq!(
        last_strip(&events),
        Some(StripState::Ready),
        "host falls back to the start strip once every map is placed"
    );
}

#[test]
fn tapping_a_tower_selects_its_slot() {
    let mut world = ready_world(100);
    let slot = first_slot(&world);
    let _ = select(&mut world, slot, ActionSource::Coop);
    let _ = build(&mut world, TowerType::Turret, ActionSource::Coop);
    let tower = query::tower_on(&world, slot).expect("tower");

    let _ = select(&mut world, slot, ActionSource::Coop);
    assert_eq!(query::selection(&world, ActionSource::Coop), None);

    let _ = run(
        &mut world,
        Command::CheckPlacing {
            entities: vec![tower.entity()],
            source: ActionSource::Coop,
        },
    );
    assert_eq!(query::selection(&world, ActionSource::Coop), Some(slot));
}

#[test]
fn stale_selector_is_ignored() {
    let mut world = ready_world(200);
    let slot = first_slot(&world);
    let _ = select(&mut world, slot, ActionSource::Coop);
    let _ = build(&mut world, TowerType::Turret, ActionSource::Coop);

    let events = run(
        &mut world,
        Command::SellTower {
            source: ActionSource::Coop,
            expected: Some(TowerSelector::new(TowerType::Turret, TowerLevel::Lvl2)),
        },
    );

    assert!(events.is_empty());
    assert!(query::tower_on(&world, slot).is_some());
}

#[test]
fn rotation_turns_the_tower_and_moves_its_troop() {
    let mut world = ready_world(100);
    let slot = first_slot(&world);
    let _ = select(&mut world, slot, ActionSource::Host);
    let _ = build(&mut world, TowerType::Barracks, ActionSource::Host);
    let before = query::troop_view(&world)
        .iter()
        .next()
        .expect("troop")
        .position;

    let events = run(
        &mut world,
        Command::RotateTower {
            source: ActionSource::Host,
            clockwise: false,
        },
    );

    let heading = events.iter().find_map(|event| match event {
        Event::TowerRotated { heading, .. } => Some(*heading),
        _ => None,
    });
    assert!((heading.expect("rotation event") - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
    let after = query::troop_view(&world)
        .iter()
        .next()
        .expect("troop")
        .position;
    assert_ne!(before, after);
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::TroopRepositioned { .. })));
}

#[test]
fn selling_cancels_the_attack_cadence() {
    let mut world = ready_world(100);
    let slot = first_slot(&world);
    let _ = select(&mut world, slot, ActionSource::Host);
    let _ = build(&mut world, TowerType::Turret, ActionSource::Host);
    let tower = query::tower_on(&world, slot).expect("tower");

    let _ = run(&mut world, Command::StartDefense);
    let _ = run(
        &mut world,
        Command::BeginWave {
            wave: 0,
            releases: 1,
        },
    );
    let events = run(
        &mut world,
        Command::ReleaseCreep {
            spawn: SpawnId::new(0),
            kind: CreepType::Tank,
        },
    );
    let creep = events
        .iter()
        .find_map(|event| match event {
            Event::CreepSpawned { creep, .. } => Some(*creep),
            _ => None,
        })
        .expect("creep spawned");

    let _ = run(&mut world, Command::CreepEnteredRange { tower, creep });
    let events = run(
        &mut world,
        Command::Tick {
            dt: Duration::from_millis(10),
        },
    );
    assert!(events.contains(&Event::AttackReady { tower }));

    let _ = select(&mut world, slot, ActionSource::Host);
    let _ = run(
        &mut world,
        Command::SellTower {
            source: ActionSource::Host,
            expected: None,
        },
    );
    assert_eq!(query::tower_on(&world, slot), None);
    let events = run(
        &mut world,
        Command::Tick {
            dt: Duration::from_secs(1),
        },
    );
    assert!(
        !events
            .iter()
            .any(|event| matches!(event, Event::AttackReady { .. })),
        "a sold tower's cadence must not fire"
    );
}
