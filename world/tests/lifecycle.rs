use std::{sync::Arc, time::Duration};

use ar_defense_config::GameConfig;
use ar_defense_core::{
    Command, CreepType, Event, MissionOutcome, MissionPhase, RemovalReason, SessionRole, SpawnId,
    StripState, TemplateKey,
};
use ar_defense_world::{apply, query, World, SUMMARY_DELAY};
use glam::Vec3;

const MISSION: &str = r#"{
    "missions": [
        {
            "difficulty": 1,
            "waves": [[0]],
            "maps": [
                { "matrix": [[5, 1, 1, 1, 6], [0, 3, 0, 4, 0]] },
                { "matrix": [[0, 3], [0, 0]] }
            ]
        }
    ],
    "enciclopedia": { "towers": [], "creeps": [] },
    "initial_values": {
        "grid_diameter": 0.5,
        "wave_interval": 0,
        "coins": 50,
        "player_hp": HP,
        "grace_time": 1
    }
}"#;

fn world(player_hp: u32) -> World {
    let text = MISSION.replace("HP", &player_hp.to_string());
    let config = GameConfig::from_json_str(&text).expect("valid mission");
    World::new(Arc::new(config))
}

fn run(world: &mut World, command: Command) -> Vec<Event> {
    let mut events = Vec::new();
    apply(world, command, &mut events);
    events
}

fn tick(world: &mut World, total: Duration) -> Vec<Event> {
    let step = Duration::from_millis(100);
    let mut events = Vec::new();
    let mut elapsed = Duration::ZERO;
    while elapsed < total {
        apply(world, Command::Tick { dt: step }, &mut events);
        elapsed += step;
    }
    events
}

fn defending(player_hp: u32) -> World {
    let mut world = world(player_hp);
    for command in [
        Command::LoadMission {
            mission: 0,
            role: SessionRole::Host,
        },
        Command::TemplatesLoaded,
        Command::PlaceMap { anchor: Vec3::ZERO },
        Command::PlaceMap {
            anchor: Vec3::new(1.0, 0.0, 0.0),
        },
        Command::StartDefense,
    ] {
        let _ = run(&mut world, command);
    }
    assert_eq!(query::phase(&world), MissionPhase::Defending);
    world
}

fn release_only_creep(world: &mut World) {
    let _ = run(
        world,
        Command::BeginWave {
            wave: 0,
            releases: 1,
        },
    );
    let _ = run(
        world,
        Command::ReleaseCreep {
            spawn: SpawnId::new(0),
            kind: CreepType::Regular,
        },
    );
}

#[test]
fn loading_requests_templates_once() {
    let mut world = world(3);
    let events = run(
        &mut world,
        Command::LoadMission {
            mission: 0,
            role: SessionRole::Host,
        },
    );

    assert_eq!(query::phase(&world), MissionPhase::Loading);
    let keys = events.iter().find_map(|event| match event {
        Event::TemplatesRequested { keys } => Some(keys.len()),
        _ => None,
    });
    assert_eq!(keys, Some(TemplateKey::all().len()));
    assert_eq!(query::coins(&world), 50);

    let _ = run(&mut world, Command::TemplatesLoaded);
    assert_eq!(query::phase(&world), MissionPhase::PlacingMaps);
}

#[test]
fn template_failure_aborts_the_mission() {
    let mut world = world(3);
    let _ = run(
        &mut world,
        Command::LoadMission {
            mission: 0,
            role: SessionRole::Host,
        },
    );

    let events = run(
        &mut world,
        Command::TemplateLoadFailed {
            key: TemplateKey::Bomb,
        },
    );

    assert!(events.contains(&Event::LoadingFailed {
        key: TemplateKey::Bomb
    }));
    assert!(events.contains(&Event::MissionTornDown));
    assert_eq!(query::phase(&world), MissionPhase::Empty);
    assert_eq!(query::mission(&world), None);
}

#[test]
fn undo_removes_the_last_map_and_its_slots() {
    let mut world = world(3);
    for command in [
        Command::LoadMission {
            mission: 0,
            role: SessionRole::Host,
        },
        Command::TemplatesLoaded,
        Command::PlaceMap { anchor: Vec3::ZERO },
    ] {
        let _ = run(&mut world, command);
    }
    let first_map_slots = query::placing_slots(&world).len();
    let events = run(
        &mut world,
        Command::PlaceMap {
            anchor: Vec3::new(1.0, 0.0, 0.0),
        },
    );
    assert_eq!(query::phase(&world), MissionPhase::ReadyToDefend);
    assert!(events.iter().any(|event| matches!(
        event,
        Event::StripChanged {
            state: StripState::Ready,
            ..
        }
    )));

    let events = run(&mut world, Command::UndoMap);

    assert_eq!(query::placed_maps(&world), 1);
    assert_eq!(query::placing_slots(&world).len(), first_map_slots);
    assert_eq!(query::phase(&world), MissionPhase::PlacingMaps);
    assert!(events.contains(&Event::MapRemoved { map: 1 }));
    assert_eq!(
        events
            .iter()
            .filter(|event| matches!(event, Event::PlacingRemoved { .. }))
            .count(),
        1
    );
}

#[test]
fn start_is_ignored_until_every_map_is_placed() {
    let mut world = world(3);
    for command in [
        Command::LoadMission {
            mission: 0,
            role: SessionRole::Host,
        },
        Command::TemplatesLoaded,
        Command::PlaceMap { anchor: Vec3::ZERO },
    ] {
        let _ = run(&mut world, command);
    }

    assert!(run(&mut world, Command::StartDefense).is_empty());
    assert_eq!(query::phase(&world), MissionPhase::PlacingMaps);
}

#[test]
fn game_ticks_pay_passive_income() {
    let mut world = defending(3);

    let _ = tick(&mut world, Duration::from_millis(2_500));

    assert_eq!(query::game_ticks(&world), 3, "ticks fire at 0s, 1s and 2s");
    assert_eq!(query::coins(&world), 50 + 3 * 5);
}

#[test]
fn pause_freezes_the_clock() {
    let mut world = defending(3);
    let _ = tick(&mut world, Duration::from_millis(500));
    let elapsed = query::elapsed(&world);
    let ticks = query::game_ticks(&world);

    let _ = run(&mut world, Command::SetPaused { paused: true });
    assert_eq!(query::phase(&world), MissionPhase::PausedForBuild);
    let _ = tick(&mut world, Duration::from_secs(5));

    assert_eq!(query::elapsed(&world), elapsed);
    assert_eq!(query::game_ticks(&world), ticks);

    let _ = run(&mut world, Command::SetPaused { paused: false });
    let _ = tick(&mut world, Duration::from_secs(1));
    assert_eq!(query::game_ticks(&world), ticks + 1);
}

#[test]
fn creep_at_goal_completes_the_last_wave_once() {
    let mut world = defending(3);
    release_only_creep(&mut world);
    assert_eq!(query::pending_arrivals(&world), 0);

    let events = tick(&mut world, Duration::from_secs(5));

    assert!(events.iter().any(|event| matches!(
        event,
        Event::CreepRemoved {
            reason: RemovalReason::ReachedGoal,
            ..
        }
    )));
    assert_eq!(query::player_hp(&world), 2);
    assert_eq!(query::phase(&world), MissionPhase::Completed);
    let finished = events
        .iter()
        .filter(|event| matches!(event, Event::MissionFinished { .. }))
        .count();
    assert_eq!(finished, 1);

    let later = tick(&mut world, SUMMARY_DELAY);
    assert!(!later.iter().any(|event| matches!(
        event,
        Event::MissionFinished { .. } | Event::GameTicked { .. }
    )));
    assert!(later.contains(&Event::MissionTornDown));
    assert_eq!(query::phase(&world), MissionPhase::Empty);
    assert_eq!(query::pending_timers(&world), 0);
}

#[test]
fn last_hit_point_lost_fails_the_mission() {
    let mut world = defending(1);
    release_only_creep(&mut world);

    let events = tick(&mut world, Duration::from_secs(5));

    assert_eq!(query::player_hp(&world), 0);
    assert_eq!(query::phase(&world), MissionPhase::Failed);
    assert!(events.iter().any(|event| matches!(
        event,
        Event::MissionFinished {
            outcome: MissionOutcome::Failed,
            ..
        }
    )));
}

#[test]
fn mission_waits_for_announced_creeps() {
    let mut world = defending(3);
    let _ = run(
        &mut world,
        Command::BeginWave {
            wave: 0,
            releases: 2,
        },
    );
    let _ = run(
        &mut world,
        Command::ReleaseCreep {
            spawn: SpawnId::new(0),
            kind: CreepType::Speedy,
        },
    );

    let _ = tick(&mut world, Duration::from_secs(3));

    assert_eq!(query::player_hp(&world), 2);
    assert_eq!(query::pending_arrivals(&world), 1);
    assert_eq!(
        query::phase(&world),
        MissionPhase::Defending,
        "an announced creep that has not spawned keeps the mission open"
    );
}

#[test]
fn abort_tears_everything_down() {
    let mut world = defending(3);
    release_only_creep(&mut world);
    let _ = tick(&mut world, Duration::from_millis(300));

    let events = run(&mut world, Command::AbortMission);

    assert!(events.contains(&Event::MissionTornDown));
    assert_eq!(query::phase(&world), MissionPhase::Empty);
    assert_eq!(query::pending_timers(&world), 0);
    assert_eq!(query::creep_view(&world).iter().count(), 0);
    assert!(query::placing_slots(&world).is_empty());
}
