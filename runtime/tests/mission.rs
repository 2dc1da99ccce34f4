use std::{cell::RefCell, rc::Rc, sync::Arc, time::Duration};

use ar_defense_config::GameConfig;
use ar_defense_core::{
    Event, MissionPhase, RemovalReason, SessionRole, SoundKey, StripState, TowerType, ViewEvent,
};
use ar_defense_runtime::{
    AudioService, Collaborators, PeerLink, SceneSink, Simulation, ViewSink,
};
use ar_defense_system_session::{Input, PeerMessage};
use ar_defense_world::query;
use glam::Vec3;

const MISSION: &str = r#"{
    "missions": [
        {
            "difficulty": 1,
            "waves": [[0]],
            "maps": [{ "matrix": [[5, 1, 1, 1, 6], [0, 3, 0, 4, 0]] }]
        },
        {
            "difficulty": 1,
            "waves": [[0, 0]],
            "maps": [{ "matrix": [[5, 9, 1, 1, 1, 6]] }]
        }
    ],
    "enciclopedia": { "towers": [], "creeps": [] },
    "initial_values": {
        "grid_diameter": 0.5,
        "wave_interval": 0,
        "coins": 50,
        "player_hp": 3,
        "grace_time": 1
    }
}"#;

#[derive(Default)]
struct Recorded {
    views: Vec<ViewEvent>,
    peers: Vec<Vec<u8>>,
    sounds: Vec<SoundKey>,
    scene: Vec<Event>,
}

#[derive(Clone, Default)]
struct Recorder(Rc<RefCell<Recorded>>);

impl ViewSink for Recorder {
    fn present(&mut self, event: ViewEvent) {
        self.0.borrow_mut().views.push(event);
    }
}

impl PeerLink for Recorder {
    fn send_to_peers(&mut self, bytes: Vec<u8>) {
        self.0.borrow_mut().peers.push(bytes);
    }
}

impl AudioService for Recorder {
    fn play(&mut self, sound: SoundKey) {
        self.0.borrow_mut().sounds.push(sound);
    }
}

impl SceneSink for Recorder {
    fn apply(&mut self, event: &Event) {
        self.0.borrow_mut().scene.push(event.clone());
    }
}

impl Recorder {
    fn kills(&self) -> u32 {
        let kills = self
            .0
            .borrow()
            .scene
            .iter()
            .filter(|event| {
                matches!(
                    event,
                    Event::CreepRemoved {
                        reason: RemovalReason::Killed,
                        ..
                    }
                )
            })
            .count();
        u32::try_from(kills).expect("few kills")
    }

    fn summaries(&self) -> usize {
        self.0
            .borrow()
            .views
            .iter()
            .filter(|view| matches!(view, ViewEvent::ShowMissionCompleted { .. }))
            .count()
    }

    fn sent(&self) -> Vec<PeerMessage> {
        self.0
            .borrow()
            .peers
            .iter()
            .map(|bytes| PeerMessage::decode(bytes).expect("host sends valid envelopes"))
            .collect()
    }
}

fn simulation(role: SessionRole, connected: bool) -> (Simulation, Recorder) {
    let config = GameConfig::from_json_str(MISSION).expect("valid mission");
    let recorder = Recorder::default();
    let collaborators = Collaborators {
        view: Box::new(recorder.clone()),
        peers: Box::new(recorder.clone()),
        audio: Box::new(recorder.clone()),
        scene: Box::new(recorder.clone()),
    };
    let simulation = Simulation::new(Arc::new(config), role, connected, collaborators, 7);
    (simulation, recorder)
}

fn placed(role: SessionRole, connected: bool) -> (Simulation, Recorder) {
    placed_mission(0, role, connected)
}

fn placed_mission(index: usize, role: SessionRole, connected: bool) -> (Simulation, Recorder) {
    let (mut simulation, recorder) = simulation(role, connected);
    simulation.handle_input(Input::SelectMission { index });
    simulation.templates_loaded();
    simulation.handle_input(Input::PlaceMap { anchor: Vec3::ZERO });
    assert_eq!(
        query::phase(simulation.world()),
        MissionPhase::ReadyToDefend
    );
    (simulation, recorder)
}

#[test]
fn host_mission_runs_to_completion_and_back_to_the_menu() {
    let (mut simulation, recorder) = placed(SessionRole::Host, false);
    let (slot, _) = query::placing_slots(simulation.world())[0];
    simulation.handle_input(Input::Tap {
        entities: vec![slot.entity()],
    });
    simulation.handle_input(Input::BuildTower(TowerType::Turret));
    assert_eq!(query::coins(simulation.world()), 20);

    simulation.handle_input(Input::Start);
    simulation.advance(Duration::from_secs(8));

    let world = simulation.world();
    assert_eq!(query::phase(world), MissionPhase::Completed);
    assert_eq!(recorder.kills(), 1, "the turret beside the lane kills the only creep");
    assert_eq!(query::player_hp(world), 3);
    let ticks = u32::try_from(query::game_ticks(world)).expect("few ticks");
    assert_eq!(
        query::coins(world),
        50 - 30 + 5 * ticks + 10,
        "coins follow initial balance, spending, passive income and rewards"
    );

    simulation.advance(Duration::from_secs(6));
    assert_eq!(query::phase(simulation.world()), MissionPhase::Empty);

    assert_eq!(recorder.summaries(), 1, "the summary is shown exactly once");
    let recorded = recorder.0.borrow();
    assert!(recorded
        .views
        .contains(&ViewEvent::ReturnToMenu { connected: false }));
    assert!(recorded.sounds.contains(&SoundKey::TowerBuilding));
    assert!(recorded.peers.is_empty(), "an offline host sends nothing");
}

#[test]
fn hazard_kills_pay_rewards_on_top_of_passive_income() {
    let (mut simulation, recorder) = placed_mission(1, SessionRole::Host, false);

    simulation.handle_input(Input::Start);
    simulation.advance(Duration::from_secs(10));

    let world = simulation.world();
    assert_eq!(query::phase(world), MissionPhase::Completed);
    assert_eq!(recorder.kills(), 2);
    assert_eq!(query::player_hp(world), 3, "no creep reached the goal");
    let ticks = u32::try_from(query::game_ticks(world)).expect("few ticks");
    assert_eq!(query::coins(world), 50 + 5 * ticks + 2 * 10);
    assert_eq!(recorder.summaries(), 1);

    simulation.advance(Duration::from_secs(10));
    assert_eq!(query::phase(simulation.world()), MissionPhase::Empty);
    assert_eq!(recorder.summaries(), 1, "completion is reported exactly once");
}

#[test]
fn malformed_peer_bytes_are_dropped() {
    let (mut simulation, recorder) = placed(SessionRole::Host, true);
    let views_before = recorder.0.borrow().views.len();
    let peers_before = recorder.0.borrow().peers.len();

    simulation.receive_peer(b"not an envelope");
    simulation.receive_peer(br#"{"key":"insertTower","parameters":"%%%"}"#);
    simulation.receive_peer(br#"{"key":"launchRocket"}"#);

    assert_eq!(recorder.0.borrow().views.len(), views_before);
    assert_eq!(recorder.0.borrow().peers.len(), peers_before);
    assert_eq!(
        query::phase(simulation.world()),
        MissionPhase::ReadyToDefend
    );
}

#[test]
fn host_serves_coop_selection_and_builds() {
    let (mut simulation, recorder) = placed(SessionRole::Host, true);
    let (slot, _) = query::placing_slots(simulation.world())[0];

    let request = PeerMessage::RequestPlacingStatus(vec![slot.entity()]);
    simulation.receive_peer(&request.encode());
    simulation.receive_peer(&PeerMessage::InsertTower(TowerType::Launcher).encode());

    let sent = recorder.sent();
    assert!(sent.contains(&PeerMessage::ReceivePlacingStatus(StripState::Placing)));
    assert!(sent.contains(&PeerMessage::UpdateCoins("10".to_owned())));
    assert_eq!(query::coins(simulation.world()), 10);
    assert!(query::tower_on(simulation.world(), slot).is_some());
    assert_eq!(
        query::selection(simulation.world(), ar_defense_core::ActionSource::Host),
        None,
        "the host selection is untouched by co-op actions"
    );
}

#[test]
fn coop_forwards_actions_and_mirrors_host_counters() {
    let (mut simulation, recorder) = simulation(SessionRole::Coop, true);

    simulation.handle_input(Input::JoinSession);
    simulation.handle_input(Input::BuildTower(TowerType::Turret));
    assert_eq!(
        recorder.sent(),
        vec![
            PeerMessage::RequestMission,
            PeerMessage::InsertTower(TowerType::Turret),
        ]
    );

    simulation.receive_peer(&PeerMessage::ReceiveMission(0).encode());
    assert_eq!(query::phase(simulation.world()), MissionPhase::Loading);
    assert_eq!(query::role(simulation.world()), SessionRole::Coop);

    simulation.receive_peer(&PeerMessage::UpdateCoins("70".to_owned()).encode());
    assert!(recorder
        .0
        .borrow()
        .views
        .contains(&ViewEvent::UpdateCoins("70".to_owned())));
}

#[test]
fn elapsed_time_is_fed_in_fixed_steps() {
    let (mut simulation, recorder) = simulation(SessionRole::Host, false);
    let steps = |recorder: &Recorder| {
        recorder
            .0
            .borrow()
            .scene
            .iter()
            .filter(|event| matches!(event, Event::TimeAdvanced { .. }))
            .count()
    };

    simulation.advance(Duration::from_millis(120));
    assert_eq!(steps(&recorder), 2);

    simulation.advance(Duration::from_millis(30));
    assert_eq!(steps(&recorder), 3, "the remainder carries over");
}
