#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that tracks which creeps overlap tower reach boxes and troops.
//!
//! Contacts are recomputed from world snapshots whenever an event may have
//! moved a creep, tower or troop. The system remembers the previous contact
//! sets and emits enter/leave commands for the difference only.

use std::collections::BTreeSet;

use ar_defense_core::{
    Command, CreepId, CreepSnapshot, CreepView, Event, TowerId, TowerType, TowerView, TroopId,
    TroopSnapshot, TroopView, TROOP_REACH,
};
use glam::Vec3;

/// Range tracking system that diffs contact sets between recomputations.
#[derive(Debug, Default)]
pub struct RangeTracking {
    towers: BTreeSet<(TowerId, CreepId)>,
    troops: BTreeSet<(TroopId, CreepId)>,
    tower_scratch: BTreeSet<(TowerId, CreepId)>,
    troop_scratch: BTreeSet<(TroopId, CreepId)>,
}

impl RangeTracking {
    /// Creates a new range tracker with no known contacts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes world events and emits contact changes as commands.
    pub fn handle(
        &mut self,
        events: &[Event],
        towers: &TowerView,
        troops: &TroopView,
        creeps: &CreepView,
        out: &mut Vec<Command>,
    ) {
        if events
            .iter()
            .any(|event| matches!(event, Event::MissionTornDown))
        {
            self.towers.clear();
            self.troops.clear();
            return;
        }
        if !events.iter().any(affects_contacts) {
            return;
        }

        self.collect_tower_contacts(towers, creeps);
        self.collect_troop_contacts(troops, creeps);

        for &(tower, creep) in self.tower_scratch.difference(&self.towers) {
            out.push(Command::CreepEnteredRange { tower, creep });
        }
        for &(tower, creep) in self.towers.difference(&self.tower_scratch) {
            if towers.get(tower).is_some() && has_creep(creeps, creep) {
                out.push(Command::CreepLeftRange { tower, creep });
            }
        }
        for &(troop, creep) in self.troops.difference(&self.troop_scratch) {
            if has_troop(troops, troop) && has_creep(creeps, creep) {
                out.push(Command::TroopContactEnded { troop, creep });
            }
        }
        // A free troop keeps retrying until the world accepts the engagement.
        for &(troop, creep) in &self.troop_scratch {
            let engaged = troops
                .iter()
                .any(|snapshot| snapshot.id == troop && snapshot.target == Some(creep));
            if !engaged || !self.troops.contains(&(troop, creep)) {
                out.push(Command::TroopContact { troop, creep });
            }
        }

        std::mem::swap(&mut self.towers, &mut self.tower_scratch);
        std::mem::swap(&mut self.troops, &mut self.troop_scratch);
    }

    fn collect_tower_contacts(&mut self, towers: &TowerView, creeps: &CreepView) {
        self.tower_scratch.clear();
        for tower in towers.iter() {
            if tower.kind == TowerType::Barracks {
                continue;
            }
            for creep in creeps.iter() {
                if within_box(tower.position, creep.position, tower.reach) {
                    let _ = self.tower_scratch.insert((tower.id, creep.id));
                }
            }
        }
    }

    fn collect_troop_contacts(&mut self, troops: &TroopView, creeps: &CreepView) {
        self.troop_scratch.clear();
        for troop in troops.iter() {
            let candidate = match troop.target {
                Some(target) => creeps
                    .iter()
                    .find(|creep| creep.id == target && touches(troop, creep)),
                None => creeps
                    .iter()
                    .find(|creep| creep.engaged_by.is_none() && touches(troop, creep)),
            };
            if let Some(creep) = candidate {
                let _ = self.troop_scratch.insert((troop.id, creep.id));
            }
        }
    }
}

fn touches(troop: &TroopSnapshot, creep: &CreepSnapshot) -> bool {
    within_box(troop.position, creep.position, TROOP_REACH)
}

fn has_creep(creeps: &CreepView, id: CreepId) -> bool {
    creeps.iter().any(|creep| creep.id == id)
}

fn has_troop(troops: &TroopView, id: TroopId) -> bool {
    troops.iter().any(|troop| troop.id == id)
}

fn affects_contacts(event: &Event) -> bool {
    matches!(
        event,
        Event::CreepSpawned { .. }
            | Event::CreepAdvanced { .. }
            | Event::CreepRemoved { .. }
            | Event::CreepResumed { .. }
            | Event::TowerPlaced { .. }
            | Event::TowerRemoved { .. }
            | Event::TroopDeployed { .. }
            | Event::TroopRepositioned { .. }
            | Event::TroopRemoved { .. }
    )
}

/// Square reach test on the horizontal plane; elevation is ignored.
fn within_box(center: Vec3, point: Vec3, reach: f32) -> bool {
    (point.x - center.x).abs() <= reach && (point.z - center.z).abs() <= reach
}
