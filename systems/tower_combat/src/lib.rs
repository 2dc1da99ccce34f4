#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that turns tower cadence firings into projectile commands.

use ar_defense_core::{Command, CreepId, Event, TowerId, TowerSnapshot, TowerType, TowerView};

/// Tower combat system that picks FIFO targets for towers ready to attack.
#[derive(Debug, Default)]
pub struct TowerCombat {
    scratch: Vec<Command>,
}

impl TowerCombat {
    /// Creates a new tower combat system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits a projectile command for each of the oldest in-range creeps of
    /// every tower that reported [`Event::AttackReady`], up to its capacity.
    pub fn handle(&mut self, events: &[Event], towers: &TowerView, out: &mut Vec<Command>) {
        self.scratch.clear();

        for event in events {
            let Event::AttackReady { tower } = event else {
                continue;
            };
            let Some(snapshot) = towers.get(*tower) else {
                continue;
            };
            self.queue_attacks(snapshot);
        }

        if self.scratch.is_empty() {
            return;
        }

        out.reserve(self.scratch.len());
        out.append(&mut self.scratch);
    }

    fn queue_attacks(&mut self, snapshot: &TowerSnapshot) {
        let capacity = snapshot.kind.capacity(snapshot.level);
        for &creep in snapshot.in_range.iter().take(capacity) {
            if let Some(command) = projectile(snapshot.kind, snapshot.id, creep) {
                self.scratch.push(command);
            }
        }
    }
}

fn projectile(kind: TowerType, tower: TowerId, creep: CreepId) -> Option<Command> {
    match kind {
        TowerType::Turret => Some(Command::FireBullet { tower, creep }),
        TowerType::Launcher => Some(Command::LaunchBomb { tower, creep }),
        TowerType::Barracks => None,
    }
}
