#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the AR Defense mission engine.
//!
//! This crate defines the message surface that connects the runtime, the
//! authoritative world, and pure systems. The runtime submits [`Command`]
//! values describing desired mutations, the world executes those commands via
//! its `apply` entry point, and then broadcasts [`Event`] values for systems
//! and collaborators to react to. Systems consume event streams, query
//! immutable snapshots, and respond exclusively with new command batches.

mod catalog;
mod map;
mod strip;

use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};

pub use catalog::{
    CreepType, HealthStatus, KeyParseError, SoundKey, TemplateKey, TowerLevel, TowerSelector,
    TowerType,
};
pub use map::{
    CreepPath, Direction, GridPosition, MapCell, MapGrid, OrientedCoordinate, CELL_SIZE,
    HIGHER_ELEVATION, LOWER_ELEVATION,
};
pub use strip::{StripOption, StripState};

/// Half width of the square box in which a troop engages creeps.
pub const TROOP_REACH: f32 = 0.1;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(u64);

        impl $name {
            /// Creates a new identifier with the provided numeric value.
            #[must_use]
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Retrieves the numeric representation of the identifier.
            #[must_use]
            pub const fn get(&self) -> u64 {
                self.0
            }

            /// Untyped handle shared with the rendering collaborator.
            #[must_use]
            pub const fn entity(&self) -> EntityId {
                EntityId(self.0)
            }
        }
    };
}

/// Untyped process-unique handle of a rendered entity.
///
/// Every typed identifier is allocated from the same counter, so an untyped
/// handle reported by a tap maps onto at most one typed entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates a new entity handle.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

entity_id!(
    /// Unique identifier assigned to a creep.
    CreepId
);
entity_id!(
    /// Unique identifier assigned to a tower.
    TowerId
);
entity_id!(
    /// Unique identifier assigned to a barracks troop.
    TroopId
);
entity_id!(
    /// Unique identifier assigned to an in-flight projectile.
    AmmoId
);
entity_id!(
    /// Unique identifier assigned to a tower placing slot.
    PlacingId
);

/// Index of a spawn point in placement order across every placed map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpawnId(u32);

impl SpawnId {
    /// Creates a new spawn identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the spawn identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Role a participant plays in a shared session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionRole {
    /// Owns the authoritative simulation.
    Host,
    /// Co-operates by forwarding actions to the host.
    Coop,
    /// Watches without issuing mutating actions.
    Spectator,
}

/// Side that issued a mutating action on the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActionSource {
    /// The host's own input.
    Host,
    /// Input forwarded by the co-op peer.
    Coop,
}

/// Lifecycle phase of the mission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissionPhase {
    /// No mission loaded; the menu is shown.
    Empty,
    /// Templates are being loaded by the rendering collaborator.
    Loading,
    /// Maps are being anchored one after another.
    PlacingMaps,
    /// Every map is placed; waiting for the start action.
    ReadyToDefend,
    /// Waves are running.
    Defending,
    /// Defence is frozen while the player builds.
    PausedForBuild,
    /// Every wave was cleared.
    Completed,
    /// The player ran out of hit points.
    Failed,
}

impl MissionPhase {
    /// Reports whether the defence is running or frozen.
    #[must_use]
    pub const fn is_defending(self) -> bool {
        matches!(self, Self::Defending | Self::PausedForBuild)
    }

    /// Reports whether the mission reached a terminal outcome.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Terminal outcome of a mission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissionOutcome {
    /// Every wave was cleared.
    Completed,
    /// The player ran out of hit points.
    Failed,
}

/// Kind of projectile fired by a tower.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AmmoKind {
    /// Straight turret bullet.
    Bullet,
    /// Arced launcher bomb.
    Bomb,
}

/// Why a creep left the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemovalReason {
    /// Hit points dropped below zero.
    Killed,
    /// The creep reached the goal.
    ReachedGoal,
    /// The creep entered a zip-line and will reappear elsewhere.
    ZipLine,
    /// The mission was torn down.
    Teardown,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Starts loading the mission with the provided configuration index.
    LoadMission {
        /// Index into the configured missions.
        mission: usize,
        /// Role of the local participant.
        role: SessionRole,
    },
    /// Reports that the rendering collaborator finished loading every template.
    TemplatesLoaded,
    /// Reports that a template could not be loaded.
    TemplateLoadFailed {
        /// Template that failed.
        key: TemplateKey,
    },
    /// Anchors the next unplaced map at the provided world position.
    PlaceMap {
        /// Translation of the anchor.
        anchor: Vec3,
    },
    /// Removes the most recently placed map.
    UndoMap,
    /// Begins the defence once every map is placed.
    StartDefense,
    /// Freezes or resumes the defence.
    SetPaused {
        /// Whether the defence should be frozen.
        paused: bool,
    },
    /// Abandons the mission and returns to the menu.
    AbortMission,
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Toggles the selection of the first placing slot among the tapped entities.
    CheckPlacing {
        /// Entities reported under the tap.
        entities: Vec<EntityId>,
        /// Side that tapped.
        source: ActionSource,
    },
    /// Builds a tower on the slot selected by `source`.
    PlaceTower {
        /// Tower type to build.
        kind: TowerType,
        /// Side issuing the action.
        source: ActionSource,
    },
    /// Upgrades the tower on the slot selected by `source`.
    UpgradeTower {
        /// Side issuing the action.
        source: ActionSource,
        /// Tower the issuer believes is selected; a mismatch ignores the request.
        expected: Option<TowerSelector>,
    },
    /// Sells the tower on the slot selected by `source`.
    SellTower {
        /// Side issuing the action.
        source: ActionSource,
        /// Tower the issuer believes is selected; a mismatch ignores the request.
        expected: Option<TowerSelector>,
    },
    /// Rotates the tower on the slot selected by `source` by a quarter turn.
    RotateTower {
        /// Side issuing the action.
        source: ActionSource,
        /// Rotation direction.
        clockwise: bool,
    },
    /// Reports that a creep entered a tower's reach.
    CreepEnteredRange {
        /// Tower whose reach was entered.
        tower: TowerId,
        /// Creep that entered.
        creep: CreepId,
    },
    /// Reports that a creep left a tower's reach.
    CreepLeftRange {
        /// Tower whose reach was left.
        tower: TowerId,
        /// Creep that left.
        creep: CreepId,
    },
    /// Reports that a creep came within a troop's reach.
    TroopContact {
        /// Troop touching the creep.
        troop: TroopId,
        /// Creep touching the troop.
        creep: CreepId,
    },
    /// Reports that a creep is no longer within a troop's reach.
    TroopContactEnded {
        /// Troop that lost contact.
        troop: TroopId,
        /// Creep that lost contact.
        creep: CreepId,
    },
    /// Fires a turret bullet at a creep.
    FireBullet {
        /// Firing tower.
        tower: TowerId,
        /// Target creep.
        creep: CreepId,
    },
    /// Launches a bomb at a creep.
    LaunchBomb {
        /// Firing tower.
        tower: TowerId,
        /// Target creep.
        creep: CreepId,
    },
    /// Displays the remaining grace time before the next wave.
    UpdateWaveCountdown {
        /// Whole seconds remaining.
        seconds: u32,
    },
    /// Dispatches the next wave.
    BeginWave {
        /// Zero-based wave index.
        wave: usize,
        /// Number of creeps the wave will release across every spawn.
        releases: u32,
    },
    /// Releases a single creep from a spawn point.
    ReleaseCreep {
        /// Spawn point releasing the creep.
        spawn: SpawnId,
        /// Type of creep to release.
        kind: CreepType,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Announces a lifecycle transition.
    PhaseChanged {
        /// Phase before the transition.
        from: MissionPhase,
        /// Phase after the transition.
        to: MissionPhase,
    },
    /// Asks the rendering collaborator to load the listed templates.
    TemplatesRequested {
        /// Templates to load.
        keys: Vec<TemplateKey>,
    },
    /// Reports that loading aborted because a template failed.
    LoadingFailed {
        /// Template that failed.
        key: TemplateKey,
    },
    /// Confirms that a map was anchored.
    MapPlaced {
        /// Index of the map within the mission.
        map: usize,
        /// Translation of the anchor.
        anchor: Vec3,
    },
    /// Confirms that the most recent map was removed.
    MapRemoved {
        /// Index of the removed map.
        map: usize,
    },
    /// Announces a new placing slot.
    PlacingCreated {
        /// Identifier of the slot.
        placing: PlacingId,
        /// World position of the slot.
        position: Vec3,
    },
    /// Announces that a placing slot was removed.
    PlacingRemoved {
        /// Identifier of the slot.
        placing: PlacingId,
    },
    /// Reports the current coin balance.
    CoinsChanged {
        /// Coins available.
        coins: u32,
    },
    /// Reports the current player hit points.
    PlayerHpChanged {
        /// Hit points remaining.
        hp: u32,
    },
    /// Reports new text for the wave indicator.
    WaveLabelChanged {
        /// Countdown (`0:03`) or progress (`1/3`) text.
        label: String,
    },
    /// Reports a new strip context for one side.
    StripChanged {
        /// Side whose selection changed.
        source: ActionSource,
        /// New strip context.
        state: StripState,
        /// Actions offered in the new context.
        options: Vec<StripOption>,
    },
    /// Shows or hides the reach indicator of a tower.
    RangeIndicatorChanged {
        /// Side whose selection drives the indicator.
        source: ActionSource,
        /// Tower whose reach is shown, or `None` to hide.
        tower: Option<TowerId>,
    },
    /// Confirms that a tower was constructed.
    TowerPlaced {
        /// Identifier of the tower.
        tower: TowerId,
        /// Tower type.
        kind: TowerType,
        /// Tower level.
        level: TowerLevel,
        /// Slot the tower stands on.
        placing: PlacingId,
        /// World position of the tower.
        position: Vec3,
        /// Yaw of the tower.
        heading: f32,
    },
    /// Confirms that a tower was removed.
    TowerRemoved {
        /// Identifier of the tower.
        tower: TowerId,
    },
    /// Reports that a tower turned.
    TowerRotated {
        /// Identifier of the tower.
        tower: TowerId,
        /// New yaw.
        heading: f32,
    },
    /// Reports that a tower became ready to attack its in-range creeps.
    AttackReady {
        /// Identifier of the tower.
        tower: TowerId,
    },
    /// Confirms that a troop was deployed.
    TroopDeployed {
        /// Identifier of the troop.
        troop: TroopId,
        /// Owning tower.
        tower: TowerId,
        /// World position of the troop.
        position: Vec3,
    },
    /// Reports that a troop moved with its rotated tower.
    TroopRepositioned {
        /// Identifier of the troop.
        troop: TroopId,
        /// New world position.
        position: Vec3,
    },
    /// Reports that a troop was removed.
    TroopRemoved {
        /// Identifier of the troop.
        troop: TroopId,
        /// Whether the troop died in combat.
        killed: bool,
    },
    /// Confirms that a creep entered the map.
    CreepSpawned {
        /// Identifier of the creep.
        creep: CreepId,
        /// Creep type.
        kind: CreepType,
        /// World position of the creep.
        position: Vec3,
    },
    /// Asks the renderer to animate a creep towards its next waypoint.
    CreepMoving {
        /// Identifier of the creep.
        creep: CreepId,
        /// World position of the waypoint.
        target: Vec3,
        /// Yaw while walking.
        heading: f32,
        /// Duration of the animation.
        duration: Duration,
    },
    /// Reports that a creep reached a waypoint.
    CreepAdvanced {
        /// Identifier of the creep.
        creep: CreepId,
        /// World position of the reached waypoint.
        position: Vec3,
    },
    /// Reports that a creep stopped to fight a troop.
    CreepPaused {
        /// Identifier of the creep.
        creep: CreepId,
    },
    /// Reports that a creep resumed walking.
    CreepResumed {
        /// Identifier of the creep.
        creep: CreepId,
    },
    /// Confirms that a creep left the registry.
    CreepRemoved {
        /// Identifier of the creep.
        creep: CreepId,
        /// Why the creep was removed.
        reason: RemovalReason,
    },
    /// Reports a health change of a creep or troop.
    HealthChanged {
        /// Damaged entity.
        entity: EntityId,
        /// Remaining health in `[0, 1]`.
        ratio: f32,
        /// Health bar band.
        status: HealthStatus,
    },
    /// Confirms that a projectile left its tower.
    AmmoLaunched {
        /// Identifier of the projectile.
        ammo: AmmoId,
        /// Firing tower.
        tower: TowerId,
        /// Projectile kind.
        kind: AmmoKind,
        /// Launch position.
        position: Vec3,
    },
    /// Asks the renderer to animate a projectile.
    AmmoMoved {
        /// Identifier of the projectile.
        ammo: AmmoId,
        /// World position at the end of the hop.
        position: Vec3,
        /// Duration of the hop.
        duration: Duration,
    },
    /// Confirms that a projectile hit or expired.
    AmmoRemoved {
        /// Identifier of the projectile.
        ammo: AmmoId,
    },
    /// Reports that a wave was dispatched.
    WaveStarted {
        /// Zero-based wave index.
        wave: usize,
    },
    /// Confirms that the defence started.
    DefenseStarted,
    /// Fires once per game tick while the defence runs.
    GameTicked {
        /// Number of game ticks since the defence started.
        tick: u64,
    },
    /// Asks the audio service to play a cue.
    SoundPlayed {
        /// Cue to play.
        sound: SoundKey,
    },
    /// Reports the terminal outcome of the mission.
    MissionFinished {
        /// Outcome reached.
        outcome: MissionOutcome,
        /// Summary title.
        title: String,
        /// Summary message.
        message: String,
    },
    /// Confirms that the mission was torn down and the menu should be shown.
    MissionTornDown,
}

/// Immutable representation of a single tower's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct TowerSnapshot {
    /// Identifier allocated to the tower by the world.
    pub id: TowerId,
    /// Tower type.
    pub kind: TowerType,
    /// Tower level.
    pub level: TowerLevel,
    /// World position of the tower.
    pub position: Vec3,
    /// Half width of the square reach box.
    pub reach: f32,
    /// Creeps inside the reach, in arrival order.
    pub in_range: Vec<CreepId>,
}

/// Read-only view of all towers stored inside the world.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TowerView {
    snapshots: Vec<TowerSnapshot>,
}

impl TowerView {
    /// Creates a new view from the provided snapshots, sorted by identifier.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<TowerSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured tower snapshots.
    pub fn iter(&self) -> impl Iterator<Item = &TowerSnapshot> {
        self.snapshots.iter()
    }

    /// Snapshot of the tower with the provided identifier.
    #[must_use]
    pub fn get(&self, id: TowerId) -> Option<&TowerSnapshot> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .and_then(|index| self.snapshots.get(index))
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<TowerSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a single creep's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct CreepSnapshot {
    /// Identifier allocated to the creep by the world.
    pub id: CreepId,
    /// Creep type.
    pub kind: CreepType,
    /// Current hit points.
    pub hp: f32,
    /// World position of the last reached waypoint.
    pub position: Vec3,
    /// Troop currently fighting the creep.
    pub engaged_by: Option<TroopId>,
}

/// Read-only view of all creeps stored inside the world.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CreepView {
    snapshots: Vec<CreepSnapshot>,
}

impl CreepView {
    /// Creates a new view from the provided snapshots, sorted by identifier.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<CreepSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured creep snapshots.
    pub fn iter(&self) -> impl Iterator<Item = &CreepSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<CreepSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a single troop's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct TroopSnapshot {
    /// Identifier allocated to the troop by the world.
    pub id: TroopId,
    /// Owning tower.
    pub tower: TowerId,
    /// Current hit points.
    pub hp: f32,
    /// World position of the troop.
    pub position: Vec3,
    /// Creep currently being fought.
    pub target: Option<CreepId>,
}

/// Read-only view of all troops stored inside the world.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TroopView {
    snapshots: Vec<TroopSnapshot>,
}

impl TroopView {
    /// Creates a new view from the provided snapshots, sorted by identifier.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<TroopSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured troop snapshots.
    pub fn iter(&self) -> impl Iterator<Item = &TroopSnapshot> {
        self.snapshots.iter()
    }
}

/// Wave timing and composition of the loaded mission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WavePlan {
    /// Countdown, in game ticks, before each wave is dispatched.
    pub grace_time: u32,
    /// Game ticks between a dispatch and the next countdown.
    pub wave_interval: u32,
    /// Creep types of every wave, in dispatch order.
    pub waves: Vec<Vec<CreepType>>,
}

impl WavePlan {
    /// Number of waves in the mission.
    #[must_use]
    pub fn total_waves(&self) -> usize {
        self.waves.len()
    }
}

/// Presentation updates delivered to the UI collaborator.
#[derive(Clone, Debug, PartialEq)]
pub enum ViewEvent {
    /// Updates the coin counter.
    UpdateCoins(String),
    /// Updates the hit point counter.
    UpdateHp(String),
    /// Updates the wave indicator.
    UpdateWaves(String),
    /// Replaces the action strip.
    UpdateStrip(Vec<StripOption>),
    /// Shows the loading overlay.
    ShowLoadingAssets,
    /// Hides the loading overlay.
    HideLoadingAssets,
    /// Shows the focus square used to anchor maps.
    EnableFocusView,
    /// Hides the focus square.
    DisableFocusView,
    /// Presents the mission summary.
    ShowMissionCompleted {
        /// Summary title.
        title: String,
        /// Summary message.
        message: String,
    },
    /// Presents an error message.
    ShowError(String),
    /// Returns to the menu.
    ReturnToMenu {
        /// Whether a peer session is still connected.
        connected: bool,
    },
}
