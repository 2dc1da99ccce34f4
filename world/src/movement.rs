//! Creep release, waypoint travel and legend effects.

use std::{sync::Arc, time::Duration};

use ar_defense_core::{
    CreepId, CreepPath, CreepType, Event, MapCell, RemovalReason, SoundKey, SpawnId,
};
use glam::Vec3;
use rand::Rng;
use tracing::{debug, warn};

use crate::{
    registry::{Creep, Movement},
    timers::TimerAction,
    SpawnPoint, World,
};

/// Delay between entering a zip-line and reappearing at an arrival point.
pub(crate) const ZIP_LINE_DELAY: Duration = Duration::from_millis(500);
/// Number of damage ticks applied after stepping on a hazard.
pub(crate) const HAZARD_TICKS: u8 = 3;
/// Damage dealt by each hazard tick.
pub(crate) const HAZARD_DAMAGE: f32 = 11.0;
const HAZARD_INTERVAL: Duration = Duration::from_secs(1);

impl World {
    pub(crate) fn release_creep(&mut self, spawn: SpawnId, kind: CreepType, out: &mut Vec<Event>) {
        if !self.phase.is_defending() {
            return;
        }
        self.pending_arrivals = self.pending_arrivals.saturating_sub(1);
        let Some(point) = self.spawns.get(spawn.get() as usize).copied() else {
            warn!(spawn = spawn.get(), "release from unknown spawn point");
            self.check_mission_state(out);
            return;
        };
        self.enter_route(point, kind, kind.max_hp(), out);
    }

    /// Places a creep at `point` on the route picked for the current wave.
    fn enter_route(&mut self, point: SpawnPoint, kind: CreepType, hp: f32, out: &mut Vec<Event>) {
        let Some(route) = self.route_from(point) else {
            warn!(map = point.map, "no route leaves the entry point");
            self.check_mission_state(out);
            return;
        };
        let Some(origin) = self.maps.get(point.map).map(|map| map.anchor) else {
            return;
        };

        let id = CreepId::new(self.allocate());
        self.registry.insert_creep(Creep {
            id,
            kind,
            hp,
            route,
            origin,
            path_index: 0,
            position: point.position,
            movement: Movement::Idle,
            engaged_by: None,
            hazard: None,
        });
        debug!(creep = id.get(), ?kind, "creep entered the map");
        out.push(Event::CreepSpawned {
            creep: id,
            kind,
            position: point.position,
        });
        out.push(Event::SoundPlayed {
            sound: SoundKey::CreepSpawn,
        });
        self.start_segment(id, out);
    }

    fn route_from(&self, point: SpawnPoint) -> Option<Arc<CreepPath>> {
        let mission = self.config.mission(self.mission?)?;
        let routes = mission.maps().get(point.map)?.routes_from(point.cell);
        if routes.is_empty() {
            return None;
        }
        routes.get(self.wave_count % routes.len()).cloned()
    }

    fn start_segment(&mut self, id: CreepId, out: &mut Vec<Event>) {
        let now = self.timers.now();
        let Some(creep) = self.registry.creep_mut(id) else {
            return;
        };
        let Some(waypoint) = creep.route.get(creep.path_index).copied() else {
            creep.movement = Movement::Idle;
            return;
        };
        let duration = creep.kind.step_duration();
        let timer = self
            .timers
            .schedule(duration, TimerAction::WaypointReached { creep: id });
        creep.movement = Movement::Travelling {
            timer,
            started: now,
            duration,
        };
        out.push(Event::CreepMoving {
            creep: id,
            target: creep.origin + waypoint.coordinate,
            heading: waypoint.heading,
            duration,
        });
    }

    pub(crate) fn waypoint_reached(&mut self, id: CreepId, out: &mut Vec<Event>) {
        let Some(creep) = self.registry.creep_mut(id) else {
            return;
        };
        let Some(waypoint) = creep.route.get(creep.path_index).copied() else {
            return;
        };
        creep.position = creep.origin + waypoint.coordinate;
        creep.movement = Movement::Idle;
        out.push(Event::CreepAdvanced {
            creep: id,
            position: creep.position,
        });

        match waypoint.legend {
            MapCell::Goal => self.reach_goal(id, out),
            MapCell::ZipLineOut => self.enter_zip_line(id, out),
            MapCell::Hazard => {
                self.start_hazard(id);
                self.advance(id, out);
            }
            _ => self.advance(id, out),
        }
    }

    fn advance(&mut self, id: CreepId, out: &mut Vec<Event>) {
        if let Some(creep) = self.registry.creep_mut(id) {
            creep.path_index += 1;
        }
        self.start_segment(id, out);
    }

    fn reach_goal(&mut self, id: CreepId, out: &mut Vec<Event>) {
        if self.remove_creep(id, RemovalReason::ReachedGoal, out).is_none() {
            return;
        }
        self.player_hp = self.player_hp.saturating_sub(1);
        debug!(creep = id.get(), hp = self.player_hp, "creep reached the goal");
        out.push(Event::PlayerHpChanged { hp: self.player_hp });
        out.push(Event::SoundPlayed {
            sound: SoundKey::CreepFinish,
        });
        self.check_mission_state(out);
    }

    fn enter_zip_line(&mut self, id: CreepId, out: &mut Vec<Event>) {
        let Some(creep) = self.remove_creep(id, RemovalReason::ZipLine, out) else {
            return;
        };
        self.pending_arrivals = self.pending_arrivals.saturating_add(1);
        let _ = self.timers.schedule(
            ZIP_LINE_DELAY,
            TimerAction::ZipLineArrival {
                kind: creep.kind,
                hp: creep.hp,
            },
        );
    }

    pub(crate) fn zip_line_arrival(&mut self, kind: CreepType, hp: f32, out: &mut Vec<Event>) {
        self.pending_arrivals = self.pending_arrivals.saturating_sub(1);
        if !self.phase.is_defending() {
            return;
        }
        if self.zip_entries.is_empty() {
            warn!(?kind, "zip-line arrival without any entry point");
            self.check_mission_state(out);
            return;
        }
        let pick = self.rng.gen_range(0..self.zip_entries.len());
        let point = self.zip_entries[pick];
        self.enter_route(point, kind, hp, out);
    }

    fn start_hazard(&mut self, id: CreepId) {
        let Some(creep) = self.registry.creep_mut(id) else {
            return;
        };
        self.timers.cancel_slot(&mut creep.hazard);
        creep.hazard = Some(self.timers.schedule(
            HAZARD_INTERVAL,
            TimerAction::HazardTick {
                creep: id,
                remaining: HAZARD_TICKS,
            },
        ));
    }

    pub(crate) fn hazard_tick(&mut self, id: CreepId, remaining: u8, out: &mut Vec<Event>) {
        let Some(creep) = self.registry.creep_mut(id) else {
            return;
        };
        creep.hazard = None;
        if !self.damage_creep(id, HAZARD_DAMAGE, out) || remaining <= 1 {
            return;
        }
        let timer = self.timers.schedule(
            HAZARD_INTERVAL,
            TimerAction::HazardTick {
                creep: id,
                remaining: remaining - 1,
            },
        );
        if let Some(creep) = self.registry.creep_mut(id) {
            creep.hazard = Some(timer);
        }
    }

    pub(crate) fn pause_creep(&mut self, id: CreepId, out: &mut Vec<Event>) {
        let now = self.timers.now();
        let Some(creep) = self.registry.creep_mut(id) else {
            return;
        };
        let remaining = match creep.movement {
            Movement::Travelling {
                timer,
                started,
                duration,
            } => {
                self.timers.cancel(timer);
                duration.saturating_sub(now.saturating_sub(started))
            }
            Movement::Idle => Duration::ZERO,
            Movement::Paused { .. } => return,
        };
        creep.movement = Movement::Paused { remaining };
        out.push(Event::CreepPaused { creep: id });
    }

    pub(crate) fn resume_creep(&mut self, id: CreepId, out: &mut Vec<Event>) {
        let now = self.timers.now();
        let Some(creep) = self.registry.creep_mut(id) else {
            return;
        };
        creep.engaged_by = None;
        let Movement::Paused { remaining } = creep.movement else {
            return;
        };
        let Some(waypoint) = creep.route.get(creep.path_index).copied() else {
            return;
        };
        let timer = self
            .timers
            .schedule(remaining, TimerAction::WaypointReached { creep: id });
        creep.movement = Movement::Travelling {
            timer,
            started: now,
            duration: remaining,
        };
        out.push(Event::CreepResumed { creep: id });
        out.push(Event::CreepMoving {
            creep: id,
            target: creep.origin + waypoint.coordinate,
            heading: waypoint.heading,
            duration: remaining,
        });
    }

    /// Removes a creep and every reference other entities hold to it.
    pub(crate) fn remove_creep(
        &mut self,
        id: CreepId,
        reason: RemovalReason,
        out: &mut Vec<Event>,
    ) -> Option<Creep> {
        let mut creep = self.registry.remove_creep(id)?;
        if let Movement::Travelling { timer, .. } = creep.movement {
            self.timers.cancel(timer);
        }
        self.timers.cancel_slot(&mut creep.hazard);
        for tower in self.registry.towers_mut() {
            tower.in_range.retain(|candidate| *candidate != id);
        }
        if let Some(troop) = creep
            .engaged_by
            .and_then(|troop| self.registry.troop_mut(troop))
        {
            if troop.target == Some(id) {
                troop.target = None;
                self.timers.cancel_slot(&mut troop.strike_timer);
                self.timers.cancel_slot(&mut troop.creep_timer);
            }
        }
        out.push(Event::CreepRemoved { creep: id, reason });
        Some(creep)
    }

    /// World position of the last waypoint the creep reached.
    pub(crate) fn creep_position(&self, id: CreepId) -> Option<Vec3> {
        self.registry.creep(id).map(|creep| creep.position)
    }
}
