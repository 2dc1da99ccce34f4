//! Placing-slot selection and the tower build, upgrade, sell and rotate actions.

use std::f32::consts::{FRAC_PI_2, TAU};

use ar_defense_core::{
    ActionSource, EntityId, Event, MissionPhase, PlacingId, SoundKey, StripState, TowerId,
    TowerLevel, TowerSelector, TowerType,
};
use tracing::debug;

use crate::{combat::troop_position, registry::Tower, World};

impl World {
    /// Tower actions are accepted once maps are being placed and until the mission ends.
    fn accepts_tower_actions(&self) -> bool {
        matches!(
            self.phase,
            MissionPhase::PlacingMaps
                | MissionPhase::ReadyToDefend
                | MissionPhase::Defending
                | MissionPhase::PausedForBuild
        )
    }

    /// Resolves a tapped entity onto a placing slot, either directly or via its tower.
    fn resolve_slot(&self, entity: EntityId) -> Option<PlacingId> {
        let placing = PlacingId::new(entity.get());
        if self.registry.placing(placing).is_some() {
            return Some(placing);
        }
        self.registry
            .tower(TowerId::new(entity.get()))
            .map(|tower| tower.placing)
    }

    fn selected_tower(&self, source: ActionSource) -> Option<&Tower> {
        let placing = self.selections.get(&source)?;
        let tower = self.registry.placing(*placing)?.tower?;
        self.registry.tower(tower)
    }

    /// Strip shown when nothing is selected.
    fn idle_strip(&self, source: ActionSource) -> StripState {
        match (source, self.phase) {
            (ActionSource::Host, MissionPhase::ReadyToDefend) => StripState::Ready,
            (ActionSource::Host, MissionPhase::PlacingMaps) if !self.maps.is_empty() => {
                StripState::Undo
            }
            _ => StripState::None,
        }
    }

    /// Re-announces the strip and range indicator of `source` from its selection.
    fn refresh_selection(&self, source: ActionSource, out: &mut Vec<Event>) {
        let state = match self.selections.get(&source) {
            None => self.idle_strip(source),
            Some(_) => match self.selected_tower(source) {
                Some(tower) => StripState::Tower(TowerSelector::new(tower.kind, tower.level)),
                None => StripState::Placing,
            },
        };
        out.push(Event::RangeIndicatorChanged {
            source,
            tower: self.selected_tower(source).map(|tower| tower.id),
        });
        self.emit_strip(source, state, out);
    }

    /// Refreshes every side whose selection points at `placing`.
    fn refresh_slot(&self, placing: PlacingId, out: &mut Vec<Event>) {
        for (source, selected) in &self.selections {
            if *selected == placing {
                self.refresh_selection(*source, out);
            }
        }
    }

    pub(crate) fn check_placing(
        &mut self,
        entities: &[EntityId],
        source: ActionSource,
        out: &mut Vec<Event>,
    ) {
        if !self.accepts_tower_actions() {
            return;
        }
        let Some(placing) = entities.iter().find_map(|entity| self.resolve_slot(*entity)) else {
            debug!(?source, "tap did not hit a placing slot");
            return;
        };

        if self.selections.get(&source) == Some(&placing) {
            let _ = self.selections.remove(&source);
            debug!(?source, placing = placing.get(), "placing slot deselected");
        } else {
            let _ = self.selections.insert(source, placing);
            debug!(?source, placing = placing.get(), "placing slot selected");
        }
        self.refresh_selection(source, out);
    }

    pub(crate) fn place_tower(&mut self, kind: TowerType, source: ActionSource, out: &mut Vec<Event>) {
        if !self.accepts_tower_actions() {
            return;
        }
        let Some(placing) = self.selections.get(&source).copied() else {
            debug!(?source, "tower build without a selected slot");
            return;
        };
        if self
            .registry
            .placing(placing)
            .map_or(true, |slot| slot.tower.is_some())
        {
            return;
        }
        let cost = kind.cost(TowerLevel::Lvl1);
        if cost > self.coins {
            debug!(?kind, cost, coins = self.coins, "not enough coins to build");
            return;
        }

        self.coins -= cost;
        out.push(Event::CoinsChanged { coins: self.coins });
        let _ = self.build_tower(kind, TowerLevel::Lvl1, placing, 0.0, out);
        self.refresh_slot(placing, out);
    }

    fn build_tower(
        &mut self,
        kind: TowerType,
        level: TowerLevel,
        placing: PlacingId,
        heading: f32,
        out: &mut Vec<Event>,
    ) -> Option<TowerId> {
        let position = self.registry.placing(placing)?.position;
        let id = TowerId::new(self.allocate());
        self.registry.insert_tower(Tower {
            id,
            kind,
            level,
            placing,
            position,
            heading,
            in_range: Vec::new(),
            attack_timer: None,
            troop: None,
            respawn_timer: None,
        });
        if let Some(slot) = self.registry.placing_mut(placing) {
            slot.tower = Some(id);
        }
        debug!(tower = id.get(), ?kind, ?level, "tower built");
        out.push(Event::TowerPlaced {
            tower: id,
            kind,
            level,
            placing,
            position,
            heading,
        });
        out.push(Event::SoundPlayed {
            sound: SoundKey::TowerBuilding,
        });
        self.deploy_troop(id, out);
        Some(id)
    }

    /// Selected tower of `source`, unless the sender saw a different one.
    fn targeted_tower(
        &self,
        source: ActionSource,
        expected: Option<TowerSelector>,
    ) -> Option<(TowerId, TowerType, TowerLevel, PlacingId, f32)> {
        if !self.accepts_tower_actions() {
            return None;
        }
        let tower = self.selected_tower(source)?;
        if let Some(expected) = expected {
            if expected != TowerSelector::new(tower.kind, tower.level) {
                debug!(?source, %expected, "ignoring action aimed at a replaced tower");
                return None;
            }
        }
        Some((tower.id, tower.kind, tower.level, tower.placing, tower.heading))
    }

    pub(crate) fn upgrade_tower(
        &mut self,
        source: ActionSource,
        expected: Option<TowerSelector>,
        out: &mut Vec<Event>,
    ) {
        let Some((id, kind, level, placing, heading)) = self.targeted_tower(source, expected)
        else {
            return;
        };
        if level.is_max() {
            return;
        }
        let next = level.next();
        let cost = kind.cost(next);
        if cost > self.coins {
            debug!(?kind, cost, coins = self.coins, "not enough coins to upgrade");
            return;
        }

        self.coins -= cost;
        out.push(Event::CoinsChanged { coins: self.coins });
        self.destroy_tower(id, out);
        let _ = self.build_tower(kind, next, placing, heading, out);
        self.refresh_slot(placing, out);
    }

    pub(crate) fn sell_tower(
        &mut self,
        source: ActionSource,
        expected: Option<TowerSelector>,
        out: &mut Vec<Event>,
    ) {
        let Some((id, kind, level, placing, _)) = self.targeted_tower(source, expected) else {
            return;
        };
        let refund = kind.refund(level);
        self.coins = self.coins.saturating_add(refund);
        debug!(tower = id.get(), refund, "tower sold");
        out.push(Event::CoinsChanged { coins: self.coins });
        self.destroy_tower(id, out);
        self.refresh_slot(placing, out);
    }

    pub(crate) fn rotate_tower(&mut self, source: ActionSource, clockwise: bool, out: &mut Vec<Event>) {
        let Some((id, ..)) = self.targeted_tower(source, None) else {
            return;
        };
        let diameter = self.grid_diameter();
        let Some(tower) = self.registry.tower_mut(id) else {
            return;
        };
        let turn = if clockwise { -FRAC_PI_2 } else { FRAC_PI_2 };
        tower.heading = (tower.heading + turn).rem_euclid(TAU);
        let heading = tower.heading;
        let position = troop_position(tower.position, heading, tower.kind, diameter);
        let troop = tower.troop;
        out.push(Event::TowerRotated { tower: id, heading });

        if let Some(troop) = troop.and_then(|troop| self.registry.troop_mut(troop)) {
            troop.position = position;
            out.push(Event::TroopRepositioned {
                troop: troop.id,
                position,
            });
        }
    }
}
