//! Collaborators that log instead of rendering and tally what happened.

use std::{cell::RefCell, fmt, rc::Rc};

use ar_defense_core::{Event, RemovalReason, SoundKey, ViewEvent};
use ar_defense_runtime::{AudioService, Collaborators, PeerLink, SceneSink, ViewSink};
use ar_defense_system_session::PeerMessage;
use tracing::{debug, info};

#[derive(Debug, Default)]
struct Tally {
    coins: String,
    hp: String,
    waves: String,
    spawned: usize,
    killed: usize,
    leaked: usize,
    towers_built: usize,
    peer_messages: usize,
    summary: Option<(String, String)>,
}

/// Shared headless sink that records the run for the final report.
#[derive(Clone, Debug, Default)]
pub(crate) struct Report(Rc<RefCell<Tally>>);

impl Report {
    /// Builds the collaborator set backed by this report.
    pub(crate) fn collaborators(&self) -> Collaborators {
        Collaborators {
            view: Box::new(self.clone()),
            peers: Box::new(self.clone()),
            audio: Box::new(self.clone()),
            scene: Box::new(self.clone()),
        }
    }

    /// Reports whether a terminal summary was presented.
    pub(crate) fn finished(&self) -> bool {
        self.0.borrow().summary.is_some()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tally = self.0.borrow();
        match &tally.summary {
            Some((title, message)) => writeln!(f, "{title}: {message}")?,
            None => writeln!(f, "Mission unfinished")?,
        }
        write!(
            f,
            "coins {} | hp {} | waves {} | spawned {} | killed {} | leaked {} | towers {} | peer messages {}",
            tally.coins,
            tally.hp,
            tally.waves,
            tally.spawned,
            tally.killed,
            tally.leaked,
            tally.towers_built,
            tally.peer_messages,
        )
    }
}

impl ViewSink for Report {
    fn present(&mut self, event: ViewEvent) {
        let mut tally = self.0.borrow_mut();
        match event {
            ViewEvent::UpdateCoins(coins) => tally.coins = coins,
            ViewEvent::UpdateHp(hp) => tally.hp = hp,
            ViewEvent::UpdateWaves(waves) => tally.waves = waves,
            ViewEvent::ShowMissionCompleted { title, message } => {
                info!(%title, %message, "mission summary");
                tally.summary = Some((title, message));
            }
            ViewEvent::ShowError(error) => info!(%error, "error shown"),
            other => debug!(view = ?other, "view update"),
        }
    }
}

impl PeerLink for Report {
    fn send_to_peers(&mut self, bytes: Vec<u8>) {
        self.0.borrow_mut().peer_messages += 1;
        match PeerMessage::decode(&bytes) {
            Ok(message) => debug!(key = message.key(), "peer broadcast"),
            Err(error) => debug!(%error, "undecodable broadcast"),
        }
    }
}

impl AudioService for Report {
    fn play(&mut self, sound: SoundKey) {
        debug!(sound = sound.key(), "sound");
    }
}

impl SceneSink for Report {
    fn apply(&mut self, event: &Event) {
        let mut tally = self.0.borrow_mut();
        match event {
            Event::CreepSpawned { .. } => tally.spawned += 1,
            Event::CreepRemoved {
                reason: RemovalReason::Killed,
                ..
            } => tally.killed += 1,
            Event::CreepRemoved {
                reason: RemovalReason::ReachedGoal,
                ..
            } => tally.leaked += 1,
            Event::TowerPlaced { kind, level, .. } => {
                tally.towers_built += 1;
                info!(tower = kind.key(), level = level.key(), "tower built");
            }
            Event::WaveStarted { wave } => info!(wave = wave + 1, "wave started"),
            _ => {}
        }
    }
}
