//! Authoritative entity storage keyed by typed identifiers.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use ar_defense_core::{
    AmmoId, AmmoKind, CreepId, CreepPath, CreepType, PlacingId, TowerId, TowerLevel, TowerType,
    TroopId,
};
use glam::Vec3;

use crate::timers::TimerId;

/// Progress of a creep between two waypoints.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Movement {
    Idle,
    Travelling {
        timer: TimerId,
        started: Duration,
        duration: Duration,
    },
    Paused {
        remaining: Duration,
    },
}

#[derive(Clone, Debug)]
pub(crate) struct Creep {
    pub(crate) id: CreepId,
    pub(crate) kind: CreepType,
    pub(crate) hp: f32,
    pub(crate) route: Arc<CreepPath>,
    /// Anchor translation of the map the route belongs to.
    pub(crate) origin: Vec3,
    /// Index of the waypoint the creep is walking towards.
    pub(crate) path_index: usize,
    pub(crate) position: Vec3,
    pub(crate) movement: Movement,
    pub(crate) engaged_by: Option<TroopId>,
    pub(crate) hazard: Option<TimerId>,
}

#[derive(Clone, Debug)]
pub(crate) struct Tower {
    pub(crate) id: TowerId,
    pub(crate) kind: TowerType,
    pub(crate) level: TowerLevel,
    pub(crate) placing: PlacingId,
    pub(crate) position: Vec3,
    pub(crate) heading: f32,
    /// Creeps inside the reach in arrival order.
    pub(crate) in_range: Vec<CreepId>,
    pub(crate) attack_timer: Option<TimerId>,
    pub(crate) troop: Option<TroopId>,
    pub(crate) respawn_timer: Option<TimerId>,
}

#[derive(Clone, Debug)]
pub(crate) struct Troop {
    pub(crate) id: TroopId,
    pub(crate) tower: TowerId,
    pub(crate) hp: f32,
    pub(crate) max_hp: f32,
    pub(crate) position: Vec3,
    pub(crate) target: Option<CreepId>,
    pub(crate) strike_timer: Option<TimerId>,
    pub(crate) creep_timer: Option<TimerId>,
}

#[derive(Clone, Debug)]
pub(crate) struct Ammo {
    pub(crate) id: AmmoId,
    pub(crate) tower: TowerId,
    pub(crate) target: CreepId,
    pub(crate) kind: AmmoKind,
    /// Damage captured when the projectile was fired.
    pub(crate) attack: f32,
    pub(crate) position: Vec3,
    /// Last known target position, used once the target is gone.
    pub(crate) aim: Vec3,
    pub(crate) step: u32,
    pub(crate) speed: f32,
    pub(crate) apex: f32,
    pub(crate) timer: Option<TimerId>,
}

#[derive(Clone, Debug)]
pub(crate) struct PlacingSlot {
    pub(crate) id: PlacingId,
    pub(crate) map: usize,
    pub(crate) position: Vec3,
    pub(crate) tower: Option<TowerId>,
}

/// Exclusive owner of every live entity.
///
/// Removal is idempotent; other components hold identifiers only and look
/// entities up again before acting on them.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    creeps: BTreeMap<CreepId, Creep>,
    towers: BTreeMap<TowerId, Tower>,
    troops: BTreeMap<TroopId, Troop>,
    ammo: BTreeMap<AmmoId, Ammo>,
    placings: BTreeMap<PlacingId, PlacingSlot>,
}

macro_rules! collection {
    ($field:ident, $id:ty, $record:ty, $insert:ident, $get:ident, $get_mut:ident, $remove:ident) => {
        pub(crate) fn $insert(&mut self, record: $record) {
            let _ = self.$field.insert(record.id, record);
        }

        pub(crate) fn $get(&self, id: $id) -> Option<&$record> {
            self.$field.get(&id)
        }

        pub(crate) fn $get_mut(&mut self, id: $id) -> Option<&mut $record> {
            self.$field.get_mut(&id)
        }

        pub(crate) fn $remove(&mut self, id: $id) -> Option<$record> {
            self.$field.remove(&id)
        }
    };
}

impl Registry {
    collection!(creeps, CreepId, Creep, insert_creep, creep, creep_mut, remove_creep);
    collection!(towers, TowerId, Tower, insert_tower, tower, tower_mut, remove_tower);
    collection!(troops, TroopId, Troop, insert_troop, troop, troop_mut, remove_troop);
    collection!(ammo, AmmoId, Ammo, insert_ammo, ammo, ammo_mut, remove_ammo);
    collection!(
        placings,
        PlacingId,
        PlacingSlot,
        insert_placing,
        placing,
        placing_mut,
        remove_placing
    );

    pub(crate) fn creeps(&self) -> impl Iterator<Item = &Creep> {
        self.creeps.values()
    }

    pub(crate) fn towers(&self) -> impl Iterator<Item = &Tower> {
        self.towers.values()
    }

    pub(crate) fn towers_mut(&mut self) -> impl Iterator<Item = &mut Tower> {
        self.towers.values_mut()
    }

    pub(crate) fn troops(&self) -> impl Iterator<Item = &Troop> {
        self.troops.values()
    }

    pub(crate) fn placings(&self) -> impl Iterator<Item = &PlacingSlot> {
        self.placings.values()
    }

    pub(crate) fn ammo_count(&self) -> usize {
        self.ammo.len()
    }

    pub(crate) fn has_creeps(&self) -> bool {
        !self.creeps.is_empty()
    }

    /// Drops every entity.
    pub(crate) fn clear(&mut self) {
        self.creeps.clear();
        self.towers.clear();
        self.troops.clear();
        self.ammo.clear();
        self.placings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placing(id: u64) -> PlacingSlot {
        PlacingSlot {
            id: PlacingId::new(id),
            map: 0,
            position: Vec3::ZERO,
            tower: None,
        }
    }

    #[test]
    fn removal_is_idempotent() {
        let mut registry = Registry::default();
        registry.insert_placing(placing(4));

        assert!(registry.remove_placing(PlacingId::new(4)).is_some());
        assert!(registry.remove_placing(PlacingId::new(4)).is_none());
        assert!(registry.placing(PlacingId::new(4)).is_none());
    }

    #[test]
    fn clear_empties_every_collection() {
        let mut registry = Registry::default();
        registry.insert_placing(placing(1));
        registry.insert_tower(Tower {
            id: TowerId::new(2),
            kind: TowerType::Turret,
            level: TowerLevel::Lvl1,
            placing: PlacingId::new(1),
            position: Vec3::ZERO,
            heading: 0.0,
            in_range: Vec::new(),
            attack_timer: None,
            troop: None,
            respawn_timer: None,
        });

        registry.clear();
        assert_eq!(registry.placings().count(), 0);
        assert_eq!(registry.towers().count(), 0);
        assert!(!registry.has_creeps());
    }
}
