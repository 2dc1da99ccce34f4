#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Role-aware mediation between player input, peers and the world.
//!
//! The host turns input into world commands and mirrors the resulting state
//! to its peers. A co-op peer forwards its actions to the host instead of
//! mutating anything locally, and a spectator only renders what it receives.

mod protocol;

use ar_defense_core::{
    ActionSource, Command, EntityId, Event, MissionPhase, SessionRole, SoundKey, StripState,
    TowerType, ViewEvent,
};
use glam::Vec3;
use tracing::debug;

pub use protocol::{PeerMessage, ProtocolError};

/// Player input delivered by the UI collaborator.
#[derive(Clone, Debug, PartialEq)]
pub enum Input {
    /// Starts the mission with the provided index as host.
    SelectMission {
        /// Mission index.
        index: usize,
    },
    /// Asks the host which mission to join.
    JoinSession,
    /// Anchors the next map at a raycast hit.
    PlaceMap {
        /// World translation of the hit.
        anchor: Vec3,
    },
    /// Removes the last anchored map.
    UndoMap,
    /// Taps the listed rendered entities.
    Tap {
        /// Entities under the tap, nearest first.
        entities: Vec<EntityId>,
    },
    /// Builds a tower on the selected slot.
    BuildTower(TowerType),
    /// Upgrades the selected tower.
    UpgradeTower,
    /// Sells the selected tower.
    SellTower,
    /// Rotates the selected tower.
    RotateTower {
        /// Rotation direction.
        clockwise: bool,
    },
    /// Starts the defence.
    Start,
    /// Pauses or resumes the defence.
    TogglePause,
    /// Leaves the mission.
    ReturnToMenu,
}

/// Side effect requested by the coordinator.
#[derive(Clone, Debug, PartialEq)]
pub enum Outbound {
    /// Mutates the local world.
    Command(Command),
    /// Sends a message to every connected peer.
    Peer(PeerMessage),
    /// Updates the UI.
    View(ViewEvent),
    /// Plays a sound cue.
    Sound(SoundKey),
}

/// Session coordinator that routes input and world events by role.
#[derive(Debug)]
pub struct SessionCoordinator {
    role: SessionRole,
    connected: bool,
    phase: MissionPhase,
    mission: Option<usize>,
    strip: StripState,
}

impl SessionCoordinator {
    /// Creates a coordinator for the provided role.
    #[must_use]
    pub fn new(role: SessionRole, connected: bool) -> Self {
        Self {
            role,
            connected,
            phase: MissionPhase::Empty,
            mission: None,
            strip: StripState::None,
        }
    }

    /// Local role.
    #[must_use]
    pub fn role(&self) -> SessionRole {
        self.role
    }

    /// Strip currently shown to the local player.
    #[must_use]
    pub fn strip(&self) -> StripState {
        self.strip
    }

    /// Records whether a peer session is connected.
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    fn broadcasts(&self) -> bool {
        self.role == SessionRole::Host && self.connected
    }

    /// Routes local input according to the role.
    pub fn handle_input(&mut self, input: Input, out: &mut Vec<Outbound>) {
        match self.role {
            SessionRole::Host => self.host_input(input, out),
            SessionRole::Coop => self.coop_input(input, out),
            SessionRole::Spectator => self.spectator_input(input, out),
        }
    }

    fn host_input(&mut self, input: Input, out: &mut Vec<Outbound>) {
        let source = ActionSource::Host;
        let command = match input {
            Input::SelectMission { index } => Command::LoadMission {
                mission: index,
                role: SessionRole::Host,
            },
            Input::JoinSession => {
                debug!("host ignores join requests");
                return;
            }
            Input::PlaceMap { anchor } => Command::PlaceMap { anchor },
            Input::UndoMap => Command::UndoMap,
            Input::Tap { entities } => Command::CheckPlacing { entities, source },
            Input::BuildTower(kind) => Command::PlaceTower { kind, source },
            Input::UpgradeTower => Command::UpgradeTower {
                source,
                expected: None,
            },
            Input::SellTower => Command::SellTower {
                source,
                expected: None,
            },
            Input::RotateTower { clockwise } => Command::RotateTower { source, clockwise },
            Input::Start => Command::StartDefense,
            Input::TogglePause => match self.phase {
                MissionPhase::Defending => Command::SetPaused { paused: true },
                MissionPhase::PausedForBuild => Command::SetPaused { paused: false },
                _ => return,
            },
            Input::ReturnToMenu => Command::AbortMission,
        };
        out.push(Outbound::Command(command));
    }

    fn coop_input(&mut self, input: Input, out: &mut Vec<Outbound>) {
        let message = match input {
            Input::JoinSession => PeerMessage::RequestMission,
            Input::Tap { entities } if !entities.is_empty() => {
                PeerMessage::RequestPlacingStatus(entities)
            }
            Input::BuildTower(kind) => PeerMessage::InsertTower(kind),
            Input::UpgradeTower => match self.strip {
                StripState::Tower(selector) => PeerMessage::UpgradeTower(selector),
                _ => return,
            },
            Input::SellTower => match self.strip {
                StripState::Tower(selector) => PeerMessage::SellTower(selector),
                _ => return,
            },
            Input::RotateTower { clockwise } => PeerMessage::RotateTower { clockwise },
            Input::ReturnToMenu => {
                out.push(Outbound::Command(Command::AbortMission));
                return;
            }
            other => {
                debug!(input = ?other, "input not available to co-op peers");
                return;
            }
        };
        out.push(Outbound::Peer(message));
    }

    fn spectator_input(&mut self, input: Input, out: &mut Vec<Outbound>) {
        match input {
            Input::JoinSession => out.push(Outbound::Peer(PeerMessage::RequestMission)),
            Input::ReturnToMenu => out.push(Outbound::Command(Command::AbortMission)),
            other => debug!(input = ?other, "spectators cannot act"),
        }
    }

    /// Handles a message received from a peer.
    pub fn handle_peer(&mut self, message: PeerMessage, out: &mut Vec<Outbound>) {
        if self.role == SessionRole::Host {
            self.host_peer(message, out);
        } else {
            self.guest_peer(message, out);
        }
    }

    fn host_peer(&mut self, message: PeerMessage, out: &mut Vec<Outbound>) {
        let source = ActionSource::Coop;
        let command = match message {
            PeerMessage::RequestMission => {
                if let Some(index) = self.mission {
                    out.push(Outbound::Peer(PeerMessage::ReceiveMission(index)));
                }
                return;
            }
            PeerMessage::RequestPlacingStatus(entities) if !entities.is_empty() => {
                Command::CheckPlacing { entities, source }
            }
            PeerMessage::InsertTower(kind) => Command::PlaceTower { kind, source },
            PeerMessage::UpgradeTower(selector) => Command::UpgradeTower {
                source,
                expected: Some(selector),
            },
            PeerMessage::SellTower(selector) => Command::SellTower {
                source,
                expected: Some(selector),
            },
            PeerMessage::RotateTower { clockwise } => Command::RotateTower { source, clockwise },
            other => {
                debug!(key = other.key(), "host ignores broadcast message");
                return;
            }
        };
        out.push(Outbound::Command(command));
    }

    fn guest_peer(&mut self, message: PeerMessage, out: &mut Vec<Outbound>) {
        match message {
            PeerMessage::ReceiveMission(index) => {
                self.mission = Some(index);
                out.push(Outbound::Command(Command::LoadMission {
                    mission: index,
                    role: self.role,
                }));
            }
            PeerMessage::ReceivePlacingStatus(state) if self.role == SessionRole::Coop => {
                self.strip = state;
                out.push(Outbound::View(ViewEvent::UpdateStrip(state.options())));
            }
            PeerMessage::UpdateCoins(value) => out.push(Outbound::View(ViewEvent::UpdateCoins(value))),
            PeerMessage::UpdateHp(value) => out.push(Outbound::View(ViewEvent::UpdateHp(value))),
            PeerMessage::UpdateWaves(value) => out.push(Outbound::View(ViewEvent::UpdateWaves(value))),
            PeerMessage::FinishMission { title, message } => {
                out.push(Outbound::View(ViewEvent::ShowMissionCompleted { title, message }));
            }
            PeerMessage::Sound(sound) => out.push(Outbound::Sound(sound)),
            other => debug!(key = other.key(), "peer ignores host-bound message"),
        }
    }

    /// Translates world events into UI updates and host broadcasts.
    pub fn handle_events(&mut self, events: &[Event], out: &mut Vec<Outbound>) {
        for event in events {
            self.handle_event(event, out);
        }
    }

    fn handle_event(&mut self, event: &Event, out: &mut Vec<Outbound>) {
        match event {
            Event::PhaseChanged { from, to } => self.phase_changed(*from, *to, out),
            Event::LoadingFailed { key } => {
                out.push(Outbound::View(ViewEvent::ShowError(format!(
                    "Failed to load {}",
                    key.asset_name()
                ))));
            }
            Event::CoinsChanged { coins } => {
                self.mirror(
                    ViewEvent::UpdateCoins(coins.to_string()),
                    PeerMessage::UpdateCoins(coins.to_string()),
                    out,
                );
            }
            Event::PlayerHpChanged { hp } => {
                self.mirror(
                    ViewEvent::UpdateHp(hp.to_string()),
                    PeerMessage::UpdateHp(hp.to_string()),
                    out,
                );
            }
            Event::WaveLabelChanged { label } => {
                self.mirror(
                    ViewEvent::UpdateWaves(label.clone()),
                    PeerMessage::UpdateWaves(label.clone()),
                    out,
                );
            }
            Event::StripChanged {
                source,
                state,
                options,
            } => match source {
                ActionSource::Host => {
                    self.strip = *state;
                    out.push(Outbound::View(ViewEvent::UpdateStrip(options.clone())));
                }
                ActionSource::Coop => {
                    if self.broadcasts() {
                        out.push(Outbound::Peer(PeerMessage::ReceivePlacingStatus(*state)));
                    }
                }
            },
            Event::SoundPlayed { sound } => {
                out.push(Outbound::Sound(*sound));
                if self.broadcasts() {
                    out.push(Outbound::Peer(PeerMessage::Sound(*sound)));
                }
            }
            Event::MissionFinished { title, message, .. } => {
                self.mirror(
                    ViewEvent::ShowMissionCompleted {
                        title: title.clone(),
                        message: message.clone(),
                    },
                    PeerMessage::FinishMission {
                        title: title.clone(),
                        message: message.clone(),
                    },
                    out,
                );
            }
            _ => {}
        }
    }

    fn mirror(&self, view: ViewEvent, message: PeerMessage, out: &mut Vec<Outbound>) {
        out.push(Outbound::View(view));
        if self.broadcasts() {
            out.push(Outbound::Peer(message));
        }
    }

    fn phase_changed(&mut self, from: MissionPhase, to: MissionPhase, out: &mut Vec<Outbound>) {
        self.phase = to;
        if from == MissionPhase::Loading {
            out.push(Outbound::View(ViewEvent::HideLoadingAssets));
        }
        if from == MissionPhase::PlacingMaps && self.role == SessionRole::Host {
            out.push(Outbound::View(ViewEvent::DisableFocusView));
        }
        match to {
            MissionPhase::Loading => out.push(Outbound::View(ViewEvent::ShowLoadingAssets)),
            MissionPhase::PlacingMaps if self.role == SessionRole::Host => {
                out.push(Outbound::View(ViewEvent::EnableFocusView));
            }
            MissionPhase::Empty => {
                self.strip = StripState::None;
                if self.role == SessionRole::Host {
                    self.mission = None;
                }
                out.push(Outbound::View(ViewEvent::ReturnToMenu {
                    connected: self.connected,
                }));
            }
            _ => {}
        }
    }

    /// Records the mission the local world loaded, so joining peers can be answered.
    pub fn mission_loaded(&mut self, index: usize) {
        self.mission = Some(index);
    }
}
