#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative mission state for AR Defense.
//!
//! The world owns the entity registry, the economy, the mission lifecycle
//! and a virtual-clock timer scheduler. It is mutated exclusively through
//! [`apply`] and observed through the read-only [`query`] module.

mod combat;
mod movement;
mod placement;
mod registry;
mod timers;

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use ar_defense_config::GameConfig;
use ar_defense_core::{
    ActionSource, Command, Event, GridPosition, MapCell, MissionOutcome, MissionPhase,
    PlacingId, SessionRole, StripState, TemplateKey,
};
use glam::Vec3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::{
    registry::Registry,
    timers::{Scheduler, TimerAction, TimerId},
};

const DEFAULT_SEED: u64 = 0x5eed_a11e_d0de_f3a5;

/// Coins credited on every game tick while defending.
pub const PASSIVE_INCOME: u32 = 5;
/// Interval between game ticks.
pub const GAME_TICK: Duration = Duration::from_secs(1);
/// Delay between the terminal summary and the return to the menu.
pub const SUMMARY_DELAY: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug)]
struct PlacedMap {
    anchor: Vec3,
}

#[derive(Clone, Copy, Debug)]
struct SpawnPoint {
    map: usize,
    cell: GridPosition,
    position: Vec3,
}

/// Represents the authoritative AR Defense mission state.
#[derive(Debug)]
pub struct World {
    config: Arc<GameConfig>,
    phase: MissionPhase,
    role: SessionRole,
    mission: Option<usize>,
    templates_loaded: bool,
    coins: u32,
    player_hp: u32,
    wave_count: usize,
    pending_arrivals: u32,
    game_ticks: u64,
    maps: Vec<PlacedMap>,
    spawns: Vec<SpawnPoint>,
    zip_entries: Vec<SpawnPoint>,
    selections: BTreeMap<ActionSource, PlacingId>,
    registry: Registry,
    timers: Scheduler,
    next_entity: u64,
    rng: ChaCha8Rng,
}

impl World {
    /// Creates an empty world backed by the provided configuration.
    #[must_use]
    pub fn new(config: Arc<GameConfig>) -> Self {
        Self::with_seed(config, DEFAULT_SEED)
    }

    /// Creates an empty world whose random choices follow `seed`.
    #[must_use]
    pub fn with_seed(config: Arc<GameConfig>, seed: u64) -> Self {
        Self {
            config,
            phase: MissionPhase::Empty,
            role: SessionRole::Host,
            mission: None,
            templates_loaded: false,
            coins: 0,
            player_hp: 0,
            wave_count: 0,
            pending_arrivals: 0,
            game_ticks: 0,
            maps: Vec::new(),
            spawns: Vec::new(),
            zip_entries: Vec::new(),
            selections: BTreeMap::new(),
            registry: Registry::default(),
            timers: Scheduler::default(),
            next_entity: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn allocate(&mut self) -> u64 {
        self.next_entity += 1;
        self.next_entity
    }

    fn grid_diameter(&self) -> f32 {
        self.config.initial_values().grid_diameter
    }

    fn total_waves(&self) -> usize {
        self.mission
            .and_then(|index| self.config.mission(index))
            .map_or(0, |mission| mission.waves().len())
    }

    fn set_phase(&mut self, to: MissionPhase, out: &mut Vec<Event>) {
        if self.phase == to {
            return;
        }
        let from = self.phase;
        self.phase = to;
        debug!(?from, ?to, "mission phase changed");
        out.push(Event::PhaseChanged { from, to });
    }

    fn emit_strip(&self, source: ActionSource, state: StripState, out: &mut Vec<Event>) {
        out.push(Event::StripChanged {
            source,
            state,
            options: state.options(),
        });
    }

    fn load_mission(&mut self, index: usize, role: SessionRole, out: &mut Vec<Event>) {
        if self.phase != MissionPhase::Empty {
            debug!(phase = ?self.phase, "ignoring mission load while a mission is active");
            return;
        }
        let config = Arc::clone(&self.config);
        let Some(mission) = config.mission(index) else {
            warn!(mission = index, "requested mission does not exist");
            return;
        };
        let initial = config.initial_values();

        self.mission = Some(index);
        self.role = role;
        self.coins = initial.coins;
        self.player_hp = initial.player_hp;
        self.wave_count = 0;
        self.pending_arrivals = 0;
        self.game_ticks = 0;
        info!(mission = index, ?role, maps = mission.maps().len(), "loading mission");

        out.push(Event::CoinsChanged { coins: self.coins });
        out.push(Event::PlayerHpChanged { hp: self.player_hp });
        out.push(Event::WaveLabelChanged {
            label: format!("0/{}", mission.waves().len()),
        });

        if self.templates_loaded {
            self.set_phase(MissionPhase::PlacingMaps, out);
        } else {
            self.set_phase(MissionPhase::Loading, out);
            out.push(Event::TemplatesRequested {
                keys: TemplateKey::all(),
            });
        }
    }

    fn finish_loading(&mut self, out: &mut Vec<Event>) {
        self.templates_loaded = true;
        if self.phase == MissionPhase::Loading {
            self.set_phase(MissionPhase::PlacingMaps, out);
        }
    }

    fn fail_loading(&mut self, key: TemplateKey, out: &mut Vec<Event>) {
        if self.phase != MissionPhase::Loading {
            return;
        }
        warn!(template = ?key, "template failed to load, aborting mission");
        out.push(Event::LoadingFailed { key });
        self.teardown(out);
    }

    fn place_map(&mut self, anchor: Vec3, out: &mut Vec<Event>) {
        if self.phase != MissionPhase::PlacingMaps {
            debug!(phase = ?self.phase, "map placement outside the placing phase");
            return;
        }
        let config = Arc::clone(&self.config);
        let Some(mission) = self.mission.and_then(|index| config.mission(index)) else {
            return;
        };
        let map_index = self.maps.len();
        let Some(map) = mission.maps().get(map_index) else {
            return;
        };
        let diameter = self.grid_diameter();

        for (cell, legend) in map.grid().iter() {
            let position = anchor + map.grid().local_position(cell, diameter);
            if legend.is_placing() {
                let placing = PlacingId::new(self.allocate());
                self.registry.insert_placing(registry::PlacingSlot {
                    id: placing,
                    map: map_index,
                    position,
                    tower: None,
                });
                out.push(Event::PlacingCreated { placing, position });
                continue;
            }
            let point = SpawnPoint {
                map: map_index,
                cell,
                position,
            };
            match legend {
                MapCell::Spawn => self.spawns.push(point),
                MapCell::ZipLineIn => self.zip_entries.push(point),
                _ => {}
            }
        }

        self.maps.push(PlacedMap { anchor });
        info!(map = map_index, x = anchor.x, y = anchor.y, z = anchor.z, "map placed");
        out.push(Event::MapPlaced {
            map: map_index,
            anchor,
        });

        if self.maps.len() == mission.maps().len() {
            self.set_phase(MissionPhase::ReadyToDefend, out);
            self.emit_strip(ActionSource::Host, StripState::Ready, out);
        } else {
            self.emit_strip(ActionSource::Host, StripState::Undo, out);
        }
    }

    fn undo_map(&mut self, out: &mut Vec<Event>) {
        if !matches!(
            self.phase,
            MissionPhase::PlacingMaps | MissionPhase::ReadyToDefend
        ) {
            return;
        }
        if self.maps.pop().is_none() {
            return;
        }
        let map_index = self.maps.len();

        let doomed: Vec<PlacingId> = self
            .registry
            .placings()
            .filter(|slot| slot.map == map_index)
            .map(|slot| slot.id)
            .collect();
        for placing in doomed {
            if let Some(slot) = self.registry.remove_placing(placing) {
                if let Some(tower) = slot.tower {
                    self.destroy_tower(tower, out);
                }
                out.push(Event::PlacingRemoved { placing });
            }
        }
        let registry = &self.registry;
        self.selections
            .retain(|_, placing| registry.placing(*placing).is_some());
        self.spawns.retain(|point| point.map != map_index);
        self.zip_entries.retain(|point| point.map != map_index);

        info!(map = map_index, "map placement undone");
        out.push(Event::MapRemoved { map: map_index });
        self.set_phase(MissionPhase::PlacingMaps, out);
        let state = if self.maps.is_empty() {
            StripState::None
        } else {
            StripState::Undo
        };
        self.emit_strip(ActionSource::Host, state, out);
    }

    fn start_defense(&mut self, out: &mut Vec<Event>) {
        if self.phase != MissionPhase::ReadyToDefend {
            debug!(phase = ?self.phase, "start requested before every map was placed");
            return;
        }
        self.set_phase(MissionPhase::Defending, out);
        out.push(Event::DefenseStarted);
        let _ = self
            .timers
            .schedule_repeating(Duration::ZERO, GAME_TICK, TimerAction::GameTick);

        if self.selections.remove(&ActionSource::Host).is_some() {
            out.push(Event::RangeIndicatorChanged {
                source: ActionSource::Host,
                tower: None,
            });
        }
        self.emit_strip(ActionSource::Host, StripState::None, out);
        info!(waves = self.total_waves(), "defence started");
    }

    fn set_paused(&mut self, paused: bool, out: &mut Vec<Event>) {
        match (self.phase, paused) {
            (MissionPhase::Defending, true) => self.set_phase(MissionPhase::PausedForBuild, out),
            (MissionPhase::PausedForBuild, false) => self.set_phase(MissionPhase::Defending, out),
            _ => {}
        }
    }

    fn tick(&mut self, dt: Duration, out: &mut Vec<Event>) {
        out.push(Event::TimeAdvanced { dt });
        if self.phase == MissionPhase::PausedForBuild {
            return;
        }
        let until = self.timers.now() + dt;
        while let Some((id, action)) = self.timers.pop_due(until) {
            self.fire(id, action, out);
        }
        self.timers.advance_to(until);
    }

    fn fire(&mut self, id: TimerId, action: TimerAction, out: &mut Vec<Event>) {
        match action {
            TimerAction::GameTick => self.game_tick(out),
            TimerAction::TowerAttack { tower } => self.tower_attack_due(tower, id, out),
            TimerAction::WaypointReached { creep } => self.waypoint_reached(creep, out),
            TimerAction::HazardTick { creep, remaining } => {
                self.hazard_tick(creep, remaining, out);
            }
            TimerAction::ZipLineArrival { kind, hp } => self.zip_line_arrival(kind, hp, out),
            TimerAction::TroopStrike { troop } => self.troop_strike(troop, id, out),
            TimerAction::CreepStrike { creep, troop } => self.creep_strike(creep, troop, id, out),
            TimerAction::TroopRespawn { tower } => self.respawn_troop(tower, out),
            TimerAction::AmmoStep { ammo } => self.ammo_step(ammo, out),
            TimerAction::CompletionCheck => self.check_mission_state(out),
            TimerAction::Teardown => self.teardown(out),
        }
    }

    fn game_tick(&mut self, out: &mut Vec<Event>) {
        self.game_ticks += 1;
        self.coins = self.coins.saturating_add(PASSIVE_INCOME);
        out.push(Event::CoinsChanged { coins: self.coins });
        out.push(Event::GameTicked {
            tick: self.game_ticks,
        });
        self.check_mission_state(out);
    }

    fn begin_wave(&mut self, wave: usize, releases: u32, out: &mut Vec<Event>) {
        let total = self.total_waves();
        if !self.phase.is_defending() || wave != self.wave_count || wave >= total {
            debug!(wave, dispatched = self.wave_count, "ignoring stale wave dispatch");
            return;
        }
        self.wave_count += 1;
        self.pending_arrivals = self.pending_arrivals.saturating_add(releases);
        info!(wave, releases, "wave dispatched");
        out.push(Event::WaveStarted { wave });
        out.push(Event::WaveLabelChanged {
            label: format!("{}/{}", self.wave_count, total),
        });
    }

    /// Evaluates the terminal conditions; a terminal phase ignores later checks.
    fn check_mission_state(&mut self, out: &mut Vec<Event>) {
        if !self.phase.is_defending() {
            return;
        }
        if self.player_hp == 0 {
            self.finish(MissionOutcome::Failed, out);
        } else if !self.registry.has_creeps()
            && self.pending_arrivals == 0
            && self.wave_count == self.total_waves()
        {
            self.finish(MissionOutcome::Completed, out);
        }
    }

    fn finish(&mut self, outcome: MissionOutcome, out: &mut Vec<Event>) {
        self.timers.clear();
        let total = self.total_waves();
        let (phase, title, message) = match outcome {
            MissionOutcome::Completed => (
                MissionPhase::Completed,
                "Mission Completed".to_owned(),
                format!(
                    "All {total} waves cleared with {} hit points left",
                    self.player_hp
                ),
            ),
            MissionOutcome::Failed => (
                MissionPhase::Failed,
                "Mission Failed".to_owned(),
                format!("The defence fell during wave {} of {total}", self.wave_count),
            ),
        };
        self.set_phase(phase, out);
        info!(?outcome, coins = self.coins, hp = self.player_hp, "mission finished");
        out.push(Event::MissionFinished {
            outcome,
            title,
            message,
        });
        let _ = self.timers.schedule(SUMMARY_DELAY, TimerAction::Teardown);
    }

    fn teardown(&mut self, out: &mut Vec<Event>) {
        if self.phase == MissionPhase::Empty {
            return;
        }
        self.registry.clear();
        self.timers.clear();
        self.maps.clear();
        self.spawns.clear();
        self.zip_entries.clear();
        self.selections.clear();
        self.mission = None;
        self.wave_count = 0;
        self.pending_arrivals = 0;
        info!("mission torn down");
        self.set_phase(MissionPhase::Empty, out);
        out.push(Event::MissionTornDown);
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::LoadMission { mission, role } => world.load_mission(mission, role, out_events),
        Command::TemplatesLoaded => world.finish_loading(out_events),
        Command::TemplateLoadFailed { key } => world.fail_loading(key, out_events),
        Command::PlaceMap { anchor } => world.place_map(anchor, out_events),
        Command::UndoMap => world.undo_map(out_events),
        Command::StartDefense => world.start_defense(out_events),
        Command::SetPaused { paused } => world.set_paused(paused, out_events),
        Command::AbortMission => world.teardown(out_events),
        Command::Tick { dt } => world.tick(dt, out_events),
        Command::CheckPlacing { entities, source } => {
            world.check_placing(&entities, source, out_events);
        }
        Command::PlaceTower { kind, source } => world.place_tower(kind, source, out_events),
        Command::UpgradeTower { source, expected } => {
            world.upgrade_tower(source, expected, out_events);
        }
        Command::SellTower { source, expected } => world.sell_tower(source, expected, out_events),
        Command::RotateTower { source, clockwise } => {
            world.rotate_tower(source, clockwise, out_events);
        }
        Command::CreepEnteredRange { tower, creep } => world.creep_entered_range(tower, creep),
        Command::CreepLeftRange { tower, creep } => world.creep_left_range(tower, creep),
        Command::TroopContact { troop, creep } => world.engage(troop, creep, out_events),
        Command::TroopContactEnded { troop, creep } => world.disengage(troop, creep, out_events),
        Command::FireBullet { tower, creep } => world.fire_bullet(tower, creep, out_events),
        Command::LaunchBomb { tower, creep } => world.launch_bomb(tower, creep, out_events),
        Command::UpdateWaveCountdown { seconds } => {
            if world.phase.is_defending() {
                out_events.push(Event::WaveLabelChanged {
                    label: format!("0:{seconds:02}"),
                });
            }
        }
        Command::BeginWave { wave, releases } => world.begin_wave(wave, releases, out_events),
        Command::ReleaseCreep { spawn, kind } => world.release_creep(spawn, kind, out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use ar_defense_core::{
        ActionSource, CreepSnapshot, CreepView, MissionPhase, PlacingId, SessionRole, SpawnId,
        TowerId, TowerSnapshot, TowerView, TroopSnapshot, TroopView, WavePlan,
    };
    use glam::Vec3;

    use super::World;

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(world: &World) -> MissionPhase {
        world.phase
    }

    /// Role of the local participant in the loaded mission.
    #[must_use]
    pub fn role(world: &World) -> SessionRole {
        world.role
    }

    /// Index of the loaded mission.
    #[must_use]
    pub fn mission(world: &World) -> Option<usize> {
        world.mission
    }

    /// Coins available.
    #[must_use]
    pub fn coins(world: &World) -> u32 {
        world.coins
    }

    /// Player hit points remaining.
    #[must_use]
    pub fn player_hp(world: &World) -> u32 {
        world.player_hp
    }

    /// Waves dispatched so far.
    #[must_use]
    pub fn wave_count(world: &World) -> usize {
        world.wave_count
    }

    /// Game ticks elapsed since the defence started.
    #[must_use]
    pub fn game_ticks(world: &World) -> u64 {
        world.game_ticks
    }

    /// Creeps announced by waves or travelling through zip-lines that are not yet on the map.
    #[must_use]
    pub fn pending_arrivals(world: &World) -> u32 {
        world.pending_arrivals
    }

    /// Number of maps anchored so far.
    #[must_use]
    pub fn placed_maps(world: &World) -> usize {
        world.maps.len()
    }

    /// Simulated time elapsed on the world clock.
    #[must_use]
    pub fn elapsed(world: &World) -> Duration {
        world.timers.now()
    }

    /// Number of live timers, including repeating ones.
    #[must_use]
    pub fn pending_timers(world: &World) -> usize {
        world.timers.pending()
    }

    /// Projectiles currently in flight.
    #[must_use]
    pub fn ammo_in_flight(world: &World) -> usize {
        world.registry.ammo_count()
    }

    /// Wave plan of the loaded mission.
    #[must_use]
    pub fn wave_plan(world: &World) -> Option<WavePlan> {
        world.mission.and_then(|index| world.config.wave_plan(index))
    }

    /// Spawn points of every placed map in placement order.
    #[must_use]
    pub fn spawn_points(world: &World) -> Vec<SpawnId> {
        (0..world.spawns.len())
            .filter_map(|index| u32::try_from(index).ok())
            .map(SpawnId::new)
            .collect()
    }

    /// Placing slots with their world positions, ordered by identifier.
    #[must_use]
    pub fn placing_slots(world: &World) -> Vec<(PlacingId, Vec3)> {
        world
            .registry
            .placings()
            .map(|slot| (slot.id, slot.position))
            .collect()
    }

    /// Tower standing on the provided placing slot.
    #[must_use]
    pub fn tower_on(world: &World, placing: PlacingId) -> Option<TowerId> {
        world.registry.placing(placing).and_then(|slot| slot.tower)
    }

    /// Slot currently selected by `source`.
    #[must_use]
    pub fn selection(world: &World, source: ActionSource) -> Option<PlacingId> {
        world.selections.get(&source).copied()
    }

    /// Captures a read-only view of the towers stored in the world.
    #[must_use]
    pub fn tower_view(world: &World) -> TowerView {
        let diameter = world.grid_diameter();
        TowerView::from_snapshots(
            world
                .registry
                .towers()
                .map(|tower| TowerSnapshot {
                    id: tower.id,
                    kind: tower.kind,
                    level: tower.level,
                    position: tower.position,
                    reach: tower.kind.reach(diameter),
                    in_range: tower.in_range.clone(),
                })
                .collect(),
        )
    }

    /// Captures a read-only view of the creeps stored in the world.
    #[must_use]
    pub fn creep_view(world: &World) -> CreepView {
        CreepView::from_snapshots(
            world
                .registry
                .creeps()
                .map(|creep| CreepSnapshot {
                    id: creep.id,
                    kind: creep.kind,
                    hp: creep.hp,
                    position: creep.position,
                    engaged_by: creep.engaged_by,
                })
                .collect(),
        )
    }

    /// Captures a read-only view of the troops stored in the world.
    #[must_use]
    pub fn troop_view(world: &World) -> TroopView {
        TroopView::from_snapshots(
            world
                .registry
                .troops()
                .map(|troop| TroopSnapshot {
                    id: troop.id,
                    tower: troop.tower,
                    hp: troop.hp,
                    position: troop.position,
                    target: troop.target,
                })
                .collect(),
        )
    }
}
