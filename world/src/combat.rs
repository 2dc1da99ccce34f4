//! Range bookkeeping, projectiles, melee and damage resolution.

use std::time::Duration;

use ar_defense_core::{
    AmmoId, AmmoKind, CreepId, Event, HealthStatus, RemovalReason, SoundKey, TowerId, TowerType,
    TroopId,
};
use glam::{Quat, Vec3};
use rand::Rng;
use tracing::debug;

use crate::{
    registry::{Ammo, Troop},
    timers::{TimerAction, TimerId},
    World,
};

/// Delay between a creep's death and the completion check.
const COMPLETION_DELAY: Duration = Duration::from_millis(500);
/// Time a troop needs to respawn after dying.
const TROOP_RESPAWN: Duration = Duration::from_secs(3);
/// Time a turret spends turning towards its target before firing.
const AIM_DURATION: Duration = Duration::from_millis(100);
/// Flight time of a turret bullet.
const BULLET_FLIGHT: Duration = Duration::from_millis(100);
/// Height of the barrel above the tower base.
const MUZZLE_HEIGHT: f32 = 0.015;

const BOMB_STEPS: u32 = 20;
const BOMB_APEX_STEP: u32 = 9;
const BOMB_INITIAL_SPEED: f32 = 0.2;
const BOMB_SPEED_STEP: f32 = 0.005;
const BOMB_APEX_OFFSET: f32 = 0.15;

/// Yaw that makes an entity at `from` face `to`.
fn yaw_towards(from: Vec3, to: Vec3) -> f32 {
    let delta = to - from;
    delta.x.atan2(delta.z)
}

fn health(hp: f32, max_hp: f32) -> (f32, HealthStatus) {
    let ratio = if max_hp > 0.0 {
        (hp / max_hp).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (ratio, HealthStatus::from_ratio(ratio))
}

/// Position of the troop guarding a barracks facing `heading`.
pub(crate) fn troop_position(tower: Vec3, heading: f32, kind: TowerType, diameter: f32) -> Vec3 {
    let offset = 2.0 * kind.reach(diameter);
    tower + Quat::from_rotation_y(heading) * Vec3::new(0.0, 0.0, offset)
}

impl World {
    pub(crate) fn creep_entered_range(&mut self, tower: TowerId, creep: CreepId) {
        if self.registry.creep(creep).is_none() {
            return;
        }
        let Some(state) = self.registry.tower_mut(tower) else {
            return;
        };
        if state.kind == TowerType::Barracks {
            return;
        }
        if !state.in_range.contains(&creep) {
            state.in_range.push(creep);
        }
        let armed = state
            .attack_timer
            .is_some_and(|timer| self.timers.is_live(timer));
        if !armed {
            state.attack_timer = Some(self.timers.schedule_repeating(
                Duration::ZERO,
                state.kind.cadence(state.level),
                TimerAction::TowerAttack { tower },
            ));
        }
    }

    pub(crate) fn creep_left_range(&mut self, tower: TowerId, creep: CreepId) {
        if let Some(state) = self.registry.tower_mut(tower) {
            state.in_range.retain(|candidate| *candidate != creep);
        }
    }

    pub(crate) fn tower_attack_due(&mut self, tower: TowerId, timer: TimerId, out: &mut Vec<Event>) {
        let Some(state) = self.registry.tower_mut(tower) else {
            self.timers.cancel(timer);
            return;
        };
        if state.in_range.is_empty() {
            self.timers.cancel_slot(&mut state.attack_timer);
            return;
        }
        out.push(Event::AttackReady { tower });
    }

    pub(crate) fn fire_bullet(&mut self, tower: TowerId, creep: CreepId, out: &mut Vec<Event>) {
        let Some(target) = self.creep_position(creep) else {
            return;
        };
        let Some(state) = self.registry.tower_mut(tower) else {
            return;
        };
        let heading = yaw_towards(state.position, target);
        state.heading = heading;
        let origin = state.position + Vec3::Y * MUZZLE_HEIGHT;
        let attack = state.kind.attack(state.level);
        out.push(Event::TowerRotated { tower, heading });

        let id = AmmoId::new(self.allocate());
        let timer = self
            .timers
            .schedule(AIM_DURATION, TimerAction::AmmoStep { ammo: id });
        self.registry.insert_ammo(Ammo {
            id,
            tower,
            target: creep,
            kind: AmmoKind::Bullet,
            attack,
            position: origin,
            aim: target,
            step: 0,
            speed: BULLET_FLIGHT.as_secs_f32(),
            apex: origin.y,
            timer: Some(timer),
        });
    }

    pub(crate) fn launch_bomb(&mut self, tower: TowerId, creep: CreepId, out: &mut Vec<Event>) {
        let Some(target) = self.creep_position(creep) else {
            return;
        };
        let Some(state) = self.registry.tower(tower) else {
            return;
        };
        let origin = state.position + Vec3::Y * MUZZLE_HEIGHT;
        let apex = state.position.y + (target.y - state.position.y) / 2.0 + BOMB_APEX_OFFSET;
        let attack = state.kind.attack(state.level);

        let id = AmmoId::new(self.allocate());
        self.registry.insert_ammo(Ammo {
            id,
            tower,
            target: creep,
            kind: AmmoKind::Bomb,
            attack,
            position: origin,
            aim: target,
            step: 1,
            speed: BOMB_INITIAL_SPEED,
            apex,
            timer: None,
        });
        out.push(Event::AmmoLaunched {
            ammo: id,
            tower,
            kind: AmmoKind::Bomb,
            position: origin,
        });
        out.push(Event::SoundPlayed {
            sound: SoundKey::Bomb,
        });
        self.bomb_hop(id, out);
    }

    pub(crate) fn ammo_step(&mut self, id: AmmoId, out: &mut Vec<Event>) {
        let Some(ammo) = self.registry.ammo(id) else {
            return;
        };
        match ammo.kind {
            AmmoKind::Bullet => self.bullet_step(id, out),
            AmmoKind::Bomb => self.bomb_hop(id, out),
        }
    }

    fn bullet_step(&mut self, id: AmmoId, out: &mut Vec<Event>) {
        let target = self.registry.ammo(id).and_then(|ammo| self.creep_position(ammo.target));
        let Some(ammo) = self.registry.ammo_mut(id) else {
            return;
        };
        if ammo.step > 0 {
            self.impact(id, out);
            return;
        }
        if let Some(target) = target {
            ammo.aim = target;
        }
        out.push(Event::AmmoLaunched {
            ammo: id,
            tower: ammo.tower,
            kind: AmmoKind::Bullet,
            position: ammo.position,
        });
        out.push(Event::SoundPlayed {
            sound: SoundKey::Missile,
        });
        out.push(Event::AmmoMoved {
            ammo: id,
            position: ammo.aim,
            duration: BULLET_FLIGHT,
        });
        ammo.position = ammo.aim;
        ammo.step = 1;
        ammo.timer = Some(
            self.timers
                .schedule(BULLET_FLIGHT, TimerAction::AmmoStep { ammo: id }),
        );
    }

    /// Advances a bomb along its arc; the final step detonates it.
    fn bomb_hop(&mut self, id: AmmoId, out: &mut Vec<Event>) {
        let jitter = f32::from(self.rng.gen_range(-1i8..=1)) / 200.0;
        let target = self.registry.ammo(id).and_then(|ammo| self.creep_position(ammo.target));
        let Some(ammo) = self.registry.ammo_mut(id) else {
            return;
        };
        if ammo.step >= BOMB_STEPS {
            self.impact(id, out);
            return;
        }
        if let Some(target) = target {
            ammo.aim = target;
        }

        let remaining = (BOMB_STEPS - ammo.step) as f32;
        let mut next = ammo.position + (ammo.aim - ammo.position) / remaining;
        next.y = if ammo.step < BOMB_APEX_STEP {
            let climb = (BOMB_APEX_STEP - ammo.step) as f32;
            ammo.position.y + (ammo.apex - ammo.position.y) / climb
        } else {
            ammo.position.y + (ammo.aim.y - ammo.position.y) / remaining
        };
        next.y += jitter;

        if ammo.step < BOMB_APEX_STEP {
            ammo.speed += BOMB_SPEED_STEP;
        } else {
            ammo.speed = (ammo.speed - BOMB_SPEED_STEP).max(BOMB_SPEED_STEP);
        }
        ammo.step += 1;
        ammo.position = next;
        let duration = Duration::from_secs_f32(ammo.speed);
        ammo.timer = Some(
            self.timers
                .schedule(duration, TimerAction::AmmoStep { ammo: id }),
        );
        out.push(Event::AmmoMoved {
            ammo: id,
            position: next,
            duration,
        });
    }

    fn impact(&mut self, id: AmmoId, out: &mut Vec<Event>) {
        let Some(mut ammo) = self.registry.remove_ammo(id) else {
            return;
        };
        self.timers.cancel_slot(&mut ammo.timer);
        out.push(Event::AmmoRemoved { ammo: id });
        let _ = self.damage_creep(ammo.target, ammo.attack, out);
    }

    /// Applies damage and resolves death; returns whether the creep survived.
    pub(crate) fn damage_creep(&mut self, id: CreepId, attack: f32, out: &mut Vec<Event>) -> bool {
        let Some(creep) = self.registry.creep_mut(id) else {
            return false;
        };
        creep.hp -= attack;
        let (ratio, status) = health(creep.hp, creep.kind.max_hp());
        out.push(Event::HealthChanged {
            entity: id.entity(),
            ratio,
            status,
        });
        if creep.hp >= 0.0 {
            return true;
        }

        let reward = creep.kind.reward();
        let _ = self.remove_creep(id, RemovalReason::Killed, out);
        self.coins = self.coins.saturating_add(reward);
        debug!(creep = id.get(), reward, coins = self.coins, "creep killed");
        out.push(Event::CoinsChanged { coins: self.coins });
        let _ = self
            .timers
            .schedule(COMPLETION_DELAY, TimerAction::CompletionCheck);
        false
    }

    pub(crate) fn deploy_troop(&mut self, tower: TowerId, out: &mut Vec<Event>) {
        let diameter = self.grid_diameter();
        let Some(state) = self.registry.tower(tower) else {
            return;
        };
        if state.kind != TowerType::Barracks || state.troop.is_some() {
            return;
        }
        let position = troop_position(state.position, state.heading, state.kind, diameter);
        let max_hp = state.kind.troop_max_hp(state.level);

        let id = TroopId::new(self.allocate());
        self.registry.insert_troop(Troop {
            id,
            tower,
            hp: max_hp,
            max_hp,
            position,
            target: None,
            strike_timer: None,
            creep_timer: None,
        });
        if let Some(state) = self.registry.tower_mut(tower) {
            state.troop = Some(id);
            state.respawn_timer = None;
        }
        out.push(Event::TroopDeployed {
            troop: id,
            tower,
            position,
        });
        out.push(Event::HealthChanged {
            entity: id.entity(),
            ratio: 1.0,
            status: HealthStatus::Full,
        });
    }

    pub(crate) fn respawn_troop(&mut self, tower: TowerId, out: &mut Vec<Event>) {
        if let Some(state) = self.registry.tower_mut(tower) {
            state.respawn_timer = None;
        }
        self.deploy_troop(tower, out);
    }

    pub(crate) fn engage(&mut self, troop: TroopId, creep: CreepId, out: &mut Vec<Event>) {
        let Some(creep_kind) = self
            .registry
            .creep(creep)
            .filter(|state| state.engaged_by.is_none())
            .map(|state| state.kind)
        else {
            return;
        };
        let Some(cadence) = self
            .registry
            .troop(troop)
            .filter(|state| state.target.is_none())
            .and_then(|state| self.registry.tower(state.tower))
            .map(|tower| tower.kind.cadence(tower.level))
        else {
            return;
        };

        let strike = self.timers.schedule_repeating(
            Duration::ZERO,
            cadence,
            TimerAction::TroopStrike { troop },
        );
        let counter = self.timers.schedule_repeating(
            Duration::ZERO,
            creep_kind.cadence(),
            TimerAction::CreepStrike { creep, troop },
        );
        if let Some(state) = self.registry.troop_mut(troop) {
            state.target = Some(creep);
            state.strike_timer = Some(strike);
            state.creep_timer = Some(counter);
        }
        if let Some(state) = self.registry.creep_mut(creep) {
            state.engaged_by = Some(troop);
        }
        debug!(troop = troop.get(), creep = creep.get(), "troop engaged creep");
        self.pause_creep(creep, out);
    }

    pub(crate) fn disengage(&mut self, troop: TroopId, creep: CreepId, out: &mut Vec<Event>) {
        let Some(state) = self.registry.troop_mut(troop) else {
            return;
        };
        if state.target != Some(creep) {
            return;
        }
        state.target = None;
        self.timers.cancel_slot(&mut state.strike_timer);
        self.timers.cancel_slot(&mut state.creep_timer);
        self.resume_creep(creep, out);
    }

    pub(crate) fn troop_strike(&mut self, troop: TroopId, timer: TimerId, out: &mut Vec<Event>) {
        let strike = self.registry.troop(troop).and_then(|state| {
            let target = state.target?;
            let tower = self.registry.tower(state.tower)?;
            Some((target, tower.kind.attack(tower.level)))
        });
        let Some((target, attack)) = strike else {
            self.timers.cancel(timer);
            return;
        };
        out.push(Event::SoundPlayed {
            sound: SoundKey::Sword,
        });
        let _ = self.damage_creep(target, attack, out);
    }

    pub(crate) fn creep_strike(
        &mut self,
        creep: CreepId,
        troop: TroopId,
        timer: TimerId,
        out: &mut Vec<Event>,
    ) {
        let engaged = self
            .registry
            .troop(troop)
            .is_some_and(|state| state.target == Some(creep));
        let Some(attack) = self.registry.creep(creep).map(|state| state.kind.attack()) else {
            self.timers.cancel(timer);
            return;
        };
        if !engaged {
            self.timers.cancel(timer);
            return;
        }
        self.damage_troop(troop, attack, out);
    }

    fn damage_troop(&mut self, id: TroopId, attack: f32, out: &mut Vec<Event>) {
        let Some(troop) = self.registry.troop_mut(id) else {
            return;
        };
        troop.hp -= attack;
        let (ratio, status) = health(troop.hp, troop.max_hp);
        out.push(Event::HealthChanged {
            entity: id.entity(),
            ratio,
            status,
        });
        if troop.hp >= 0.0 {
            return;
        }

        let tower = troop.tower;
        debug!(troop = id.get(), tower = tower.get(), "troop died");
        self.dismiss_troop(id, true, out);
        let respawn = self
            .timers
            .schedule(TROOP_RESPAWN, TimerAction::TroopRespawn { tower });
        if let Some(state) = self.registry.tower_mut(tower) {
            state.respawn_timer = Some(respawn);
        }
    }

    /// Removes a troop, releasing the creep it was holding.
    pub(crate) fn dismiss_troop(&mut self, id: TroopId, killed: bool, out: &mut Vec<Event>) {
        let Some(mut troop) = self.registry.remove_troop(id) else {
            return;
        };
        self.timers.cancel_slot(&mut troop.strike_timer);
        self.timers.cancel_slot(&mut troop.creep_timer);
        if let Some(state) = self.registry.tower_mut(troop.tower) {
            if state.troop == Some(id) {
                state.troop = None;
            }
        }
        out.push(Event::TroopRemoved { troop: id, killed });
        if let Some(creep) = troop.target {
            self.resume_creep(creep, out);
        }
    }

    /// Removes a tower together with its troop and pending timers.
    pub(crate) fn destroy_tower(&mut self, id: TowerId, out: &mut Vec<Event>) {
        let Some(mut tower) = self.registry.remove_tower(id) else {
            return;
        };
        self.timers.cancel_slot(&mut tower.attack_timer);
        self.timers.cancel_slot(&mut tower.respawn_timer);
        if let Some(troop) = tower.troop {
            self.dismiss_troop(troop, false, out);
        }
        if let Some(slot) = self.registry.placing_mut(tower.placing) {
            if slot.tower == Some(id) {
                slot.tower = None;
            }
        }
        out.push(Event::TowerRemoved { tower: id });
    }
}
