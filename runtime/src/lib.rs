#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Single-threaded event loop that drives an AR Defense mission.
//!
//! Every command is applied to the world, the resulting events are shown to
//! the scene collaborator, fed to the pure systems and translated by the
//! session coordinator. Commands produced along the way are queued and drained
//! before control returns to the caller.

use std::{collections::VecDeque, sync::Arc, time::Duration};

use ar_defense_config::GameConfig;
use ar_defense_core::{Command, Event, SessionRole, SoundKey, TemplateKey, ViewEvent};
use ar_defense_system_session::{Input, Outbound, PeerMessage, SessionCoordinator};
use ar_defense_system_tower_combat::TowerCombat;
use ar_defense_system_tower_targeting::RangeTracking;
use ar_defense_system_waves::WaveScheduler;
use ar_defense_world::{self as world, query, World};
use tracing::{debug, warn};

/// Fixed simulation step used to feed elapsed time into the world.
pub const STEP: Duration = Duration::from_millis(50);

/// Upper bound on commands drained by a single pump.
const CASCADE_LIMIT: usize = 10_000;

/// UI collaborator that presents counters, strips and overlays.
pub trait ViewSink {
    /// Presents a single view update.
    fn present(&mut self, event: ViewEvent);
}

/// Network collaborator that delivers encoded peer messages.
pub trait PeerLink {
    /// Sends the encoded message to every connected peer.
    fn send_to_peers(&mut self, bytes: Vec<u8>);
}

/// Audio collaborator.
pub trait AudioService {
    /// Plays the provided cue.
    fn play(&mut self, sound: SoundKey);
}

/// Rendering collaborator that mirrors world entities.
pub trait SceneSink {
    /// Reflects a world event in the scene.
    fn apply(&mut self, event: &Event);
}

/// External collaborators the simulation reports to.
pub struct Collaborators {
    /// UI sink.
    pub view: Box<dyn ViewSink>,
    /// Peer transport.
    pub peers: Box<dyn PeerLink>,
    /// Audio playback.
    pub audio: Box<dyn AudioService>,
    /// Scene renderer.
    pub scene: Box<dyn SceneSink>,
}

/// Mission simulation wired to its systems and collaborators.
pub struct Simulation {
    world: World,
    session: SessionCoordinator,
    range_tracking: RangeTracking,
    tower_combat: TowerCombat,
    waves: WaveScheduler,
    collaborators: Collaborators,
    queue: VecDeque<Command>,
    carry: Duration,
}

impl Simulation {
    /// Creates a simulation for the local role.
    #[must_use]
    pub fn new(
        config: Arc<GameConfig>,
        role: SessionRole,
        connected: bool,
        collaborators: Collaborators,
        seed: u64,
    ) -> Self {
        Self {
            world: World::with_seed(config, seed),
            session: SessionCoordinator::new(role, connected),
            range_tracking: RangeTracking::new(),
            tower_combat: TowerCombat::new(),
            waves: WaveScheduler::new(),
            collaborators,
            queue: VecDeque::new(),
            carry: Duration::ZERO,
        }
    }

    /// Read-only access to the authoritative world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Records whether a peer session is connected.
    pub fn set_connected(&mut self, connected: bool) {
        self.session.set_connected(connected);
    }

    /// Handles player input from the UI collaborator.
    pub fn handle_input(&mut self, input: Input) {
        debug!(?input, "input");
        let mut outbound = Vec::new();
        self.session.handle_input(input, &mut outbound);
        self.route(outbound);
        self.pump();
    }

    /// Handles bytes received from a peer; malformed messages are dropped.
    pub fn receive_peer(&mut self, bytes: &[u8]) {
        let message = match PeerMessage::decode(bytes) {
            Ok(message) => message,
            Err(error) => {
                warn!(%error, len = bytes.len(), "dropping malformed peer message");
                return;
            }
        };
        debug!(key = message.key(), "peer message");
        let mut outbound = Vec::new();
        self.session.handle_peer(message, &mut outbound);
        self.route(outbound);
        self.pump();
    }

    /// Reports that the rendering collaborator loaded every template.
    pub fn templates_loaded(&mut self) {
        self.submit(Command::TemplatesLoaded);
    }

    /// Reports that the rendering collaborator failed to load a template.
    pub fn template_failed(&mut self, key: TemplateKey) {
        self.submit(Command::TemplateLoadFailed { key });
    }

    /// Feeds elapsed real time into the world in fixed steps.
    ///
    /// Time shorter than [`STEP`] is carried into the next call.
    pub fn advance(&mut self, dt: Duration) {
        self.carry += dt;
        while self.carry >= STEP {
            self.carry -= STEP;
            self.submit(Command::Tick { dt: STEP });
        }
    }

    fn submit(&mut self, command: Command) {
        self.queue.push_back(command);
        self.pump();
    }

    fn route(&mut self, outbound: Vec<Outbound>) {
        for item in outbound {
            match item {
                Outbound::Command(command) => self.queue.push_back(command),
                Outbound::Peer(message) => self.collaborators.peers.send_to_peers(message.encode()),
                Outbound::View(event) => self.collaborators.view.present(event),
                Outbound::Sound(sound) => self.collaborators.audio.play(sound),
            }
        }
    }

    fn pump(&mut self) {
        let mut drained = 0;
        while let Some(command) = self.queue.pop_front() {
            drained += 1;
            if drained > CASCADE_LIMIT {
                warn!(
                    dropped = self.queue.len() + 1,
                    "command cascade exceeded its limit"
                );
                self.queue.clear();
                return;
            }

            let mut events = Vec::new();
            world::apply(&mut self.world, command, &mut events);
            if events.is_empty() {
                continue;
            }

            for event in &events {
                self.collaborators.scene.apply(event);
            }
            if events
                .iter()
                .any(|event| matches!(event, Event::PhaseChanged { .. }))
            {
                if let Some(index) = query::mission(&self.world) {
                    self.session.mission_loaded(index);
                }
            }

            self.run_systems(&events);

            let mut outbound = Vec::new();
            self.session.handle_events(&events, &mut outbound);
            self.route(outbound);
        }
    }

    fn run_systems(&mut self, events: &[Event]) {
        let towers = query::tower_view(&self.world);
        let creeps = query::creep_view(&self.world);
        let troops = query::troop_view(&self.world);
        let plan = query::wave_plan(&self.world);
        let spawns = query::spawn_points(&self.world);

        let mut commands = Vec::new();
        self.range_tracking
            .handle(events, &towers, &troops, &creeps, &mut commands);
        self.tower_combat.handle(events, &towers, &mut commands);
        self.waves
            .handle(events, plan.as_ref(), &spawns, &mut commands);

        self.queue.extend(commands);
    }
}
