//! Static gameplay tables keyed by typed enums.

use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Enumerates the tower archetypes that can be constructed on a placing slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TowerType {
    /// Single-barrel tower firing straight bullets.
    Turret,
    /// Artillery tower lobbing bombs along an arced trajectory.
    Launcher,
    /// Tower deploying a melee troop that blocks creeps.
    Barracks,
}

impl TowerType {
    /// Every tower type in catalogue order.
    pub const ALL: [TowerType; 3] = [TowerType::Turret, TowerType::Launcher, TowerType::Barracks];

    /// Stable wire key of the tower type.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Turret => "turret",
            Self::Launcher => "launcher",
            Self::Barracks => "barracks",
        }
    }

    /// Coins required to own a tower of this type at the provided level.
    #[must_use]
    pub const fn cost(self, level: TowerLevel) -> u32 {
        match (self, level) {
            (Self::Turret, TowerLevel::Lvl1) => 30,
            (Self::Turret, TowerLevel::Lvl2) => 50,
            (Self::Turret, TowerLevel::Lvl3) => 80,
            (Self::Launcher, TowerLevel::Lvl1) => 40,
            (Self::Launcher, TowerLevel::Lvl2) => 65,
            (Self::Launcher, TowerLevel::Lvl3) => 100,
            (Self::Barracks, TowerLevel::Lvl1) => 35,
            (Self::Barracks, TowerLevel::Lvl2) => 55,
            (Self::Barracks, TowerLevel::Lvl3) => 85,
        }
    }

    /// Coins returned when selling a tower of this type at the provided level.
    #[must_use]
    pub const fn refund(self, level: TowerLevel) -> u32 {
        self.cost(level) / 2
    }

    /// Interval between consecutive attacks.
    #[must_use]
    pub const fn cadence(self, level: TowerLevel) -> Duration {
        let millis = match (self, level) {
            (Self::Turret, TowerLevel::Lvl1) => 1_000,
            (Self::Turret, TowerLevel::Lvl2) => 800,
            (Self::Turret, TowerLevel::Lvl3) => 600,
            (Self::Launcher, TowerLevel::Lvl1) => 2_000,
            (Self::Launcher, TowerLevel::Lvl2) => 1_800,
            (Self::Launcher, TowerLevel::Lvl3) => 1_500,
            (Self::Barracks, TowerLevel::Lvl1) => 1_000,
            (Self::Barracks, TowerLevel::Lvl2) => 900,
            (Self::Barracks, TowerLevel::Lvl3) => 800,
        };
        Duration::from_millis(millis)
    }

    /// Maximum number of creeps attacked per cadence firing.
    #[must_use]
    pub const fn capacity(self, level: TowerLevel) -> usize {
        match (self, level) {
            (Self::Turret, TowerLevel::Lvl1) => 1,
            (Self::Turret, TowerLevel::Lvl2) => 2,
            (Self::Turret, TowerLevel::Lvl3) => 3,
            (Self::Launcher, TowerLevel::Lvl3) => 2,
            (Self::Launcher, _) | (Self::Barracks, _) => 1,
        }
    }

    /// Damage dealt per hit by projectiles or troops of this tower.
    #[must_use]
    pub const fn attack(self, level: TowerLevel) -> f32 {
        match (self, level) {
            (Self::Turret, TowerLevel::Lvl1) => 10.0,
            (Self::Turret, TowerLevel::Lvl2) => 15.0,
            (Self::Turret, TowerLevel::Lvl3) => 22.0,
            (Self::Launcher, TowerLevel::Lvl1) => 25.0,
            (Self::Launcher, TowerLevel::Lvl2) => 35.0,
            (Self::Launcher, TowerLevel::Lvl3) => 50.0,
            (Self::Barracks, TowerLevel::Lvl1) => 8.0,
            (Self::Barracks, TowerLevel::Lvl2) => 12.0,
            (Self::Barracks, TowerLevel::Lvl3) => 18.0,
        }
    }

    /// Attack range; scaled by the grid diameter it gives the reach in cells.
    #[must_use]
    pub const fn range(self) -> f32 {
        match self {
            Self::Turret => 4.5,
            Self::Launcher => 6.5,
            Self::Barracks => 1.0,
        }
    }

    /// Half width of the square reach box around the tower, in world units.
    #[must_use]
    pub fn reach(self, grid_diameter: f32) -> f32 {
        grid_diameter * self.range() * crate::CELL_SIZE
    }

    /// Hit points of the troop deployed by a barracks; zero for other types.
    #[must_use]
    pub const fn troop_max_hp(self, level: TowerLevel) -> f32 {
        match (self, level) {
            (Self::Barracks, TowerLevel::Lvl1) => 40.0,
            (Self::Barracks, TowerLevel::Lvl2) => 60.0,
            (Self::Barracks, TowerLevel::Lvl3) => 90.0,
            _ => 0.0,
        }
    }
}

/// Upgrade tier of a tower.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TowerLevel {
    /// Freshly built tower.
    Lvl1,
    /// First upgrade.
    Lvl2,
    /// Maximum level.
    Lvl3,
}

impl TowerLevel {
    /// Every level in ascending order.
    pub const ALL: [TowerLevel; 3] = [TowerLevel::Lvl1, TowerLevel::Lvl2, TowerLevel::Lvl3];

    /// Stable wire key of the level.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Lvl1 => "lvl1",
            Self::Lvl2 => "lvl2",
            Self::Lvl3 => "lvl3",
        }
    }

    /// Level reached by upgrading; the maximum level maps onto itself.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Lvl1 => Self::Lvl2,
            Self::Lvl2 | Self::Lvl3 => Self::Lvl3,
        }
    }

    /// Reports whether the level can no longer be upgraded.
    #[must_use]
    pub const fn is_max(self) -> bool {
        matches!(self, Self::Lvl3)
    }
}

/// Compact `type-level` identifier exchanged with peers, e.g. `turret-lvl2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TowerSelector {
    /// Tower archetype.
    pub kind: TowerType,
    /// Tower level.
    pub level: TowerLevel,
}

impl TowerSelector {
    /// Creates a selector from its parts.
    #[must_use]
    pub const fn new(kind: TowerType, level: TowerLevel) -> Self {
        Self { kind, level }
    }
}

impl fmt::Display for TowerSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind.key(), self.level.key())
    }
}

/// Errors produced when parsing wire keys.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyParseError {
    /// Tower type key was not recognised.
    #[error("unknown tower type `{0}`")]
    UnknownTowerType(String),
    /// Tower level key was not recognised.
    #[error("unknown tower level `{0}`")]
    UnknownTowerLevel(String),
    /// Selector did not follow the `type-level` layout.
    #[error("malformed tower selector `{0}`")]
    MalformedSelector(String),
    /// Sound key was not recognised.
    #[error("unknown sound `{0}`")]
    UnknownSound(String),
}

impl FromStr for TowerType {
    type Err = KeyParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.key() == value)
            .ok_or_else(|| KeyParseError::UnknownTowerType(value.to_owned()))
    }
}

impl FromStr for TowerLevel {
    type Err = KeyParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.key() == value)
            .ok_or_else(|| KeyParseError::UnknownTowerLevel(value.to_owned()))
    }
}

impl FromStr for TowerSelector {
    type Err = KeyParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (kind, level) = value
            .split_once('-')
            .ok_or_else(|| KeyParseError::MalformedSelector(value.to_owned()))?;
        Ok(Self::new(kind.parse()?, level.parse()?))
    }
}

/// Enumerates the creep archetypes that waves are composed of.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreepType {
    /// Baseline creep.
    Regular,
    /// Fragile creep that crosses cells quickly.
    Speedy,
    /// Slow creep with a deep health pool.
    Tank,
}

impl CreepType {
    /// Every creep type, ordered by configuration index.
    pub const ALL: [CreepType; 3] = [CreepType::Regular, CreepType::Speedy, CreepType::Tank];

    /// Resolves the creep type referenced by a wave index in the game configuration.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Initial hit points.
    #[must_use]
    pub const fn max_hp(self) -> f32 {
        match self {
            Self::Regular => 30.0,
            Self::Speedy => 20.0,
            Self::Tank => 80.0,
        }
    }

    /// Time spent travelling between two consecutive waypoints.
    #[must_use]
    pub const fn step_duration(self) -> Duration {
        match self {
            Self::Regular => Duration::from_millis(1_000),
            Self::Speedy => Duration::from_millis(500),
            Self::Tank => Duration::from_millis(1_500),
        }
    }

    /// Coins credited when the creep is killed.
    #[must_use]
    pub const fn reward(self) -> u32 {
        match self {
            Self::Regular => 10,
            Self::Speedy => 8,
            Self::Tank => 20,
        }
    }

    /// Damage dealt to a troop per strike.
    #[must_use]
    pub const fn attack(self) -> f32 {
        match self {
            Self::Regular => 4.0,
            Self::Speedy => 2.0,
            Self::Tank => 8.0,
        }
    }

    /// Interval between strikes against a troop.
    #[must_use]
    pub const fn cadence(self) -> Duration {
        match self {
            Self::Regular => Duration::from_millis(1_000),
            Self::Speedy => Duration::from_millis(800),
            Self::Tank => Duration::from_millis(1_500),
        }
    }
}

/// Audio cues the simulation requests from the injected audio service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundKey {
    /// Launcher bomb release.
    Bomb,
    /// Turret bullet release.
    Missile,
    /// Troop melee strike.
    Sword,
    /// Creep entering the map.
    CreepSpawn,
    /// Tower constructed or upgraded.
    TowerBuilding,
    /// Creep reaching the goal.
    CreepFinish,
}

impl SoundKey {
    /// Every sound cue.
    pub const ALL: [SoundKey; 6] = [
        SoundKey::Bomb,
        SoundKey::Missile,
        SoundKey::Sword,
        SoundKey::CreepSpawn,
        SoundKey::TowerBuilding,
        SoundKey::CreepFinish,
    ];

    /// Stable wire key of the sound.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Bomb => "bomb",
            Self::Missile => "missile",
            Self::Sword => "sword",
            Self::CreepSpawn => "creep_spawn",
            Self::TowerBuilding => "tower_building",
            Self::CreepFinish => "creep_finish",
        }
    }
}

impl FromStr for SoundKey {
    type Err = KeyParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|sound| sound.key() == value)
            .ok_or_else(|| KeyParseError::UnknownSound(value.to_owned()))
    }
}

/// Coarse health band used to pick the health bar template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HealthStatus {
    /// More than half of the maximum health.
    Full,
    /// Between a quarter and a half.
    Half,
    /// A quarter or less.
    Low,
}

impl HealthStatus {
    /// Classifies a health ratio in `[0, 1]`.
    #[must_use]
    pub fn from_ratio(ratio: f32) -> Self {
        if ratio > 0.5 {
            Self::Full
        } else if ratio > 0.25 {
            Self::Half
        } else {
            Self::Low
        }
    }
}

/// Keys of the renderable templates the rendering collaborator loads before a mission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemplateKey {
    /// Goal marker.
    Goal,
    /// Path tile, also used for ramps.
    Path,
    /// Empty placing slot.
    TowerPlacing,
    /// Spawn portal.
    Spawn,
    /// Zip-line anchor.
    ZipLine,
    /// Turret projectile.
    Bullet,
    /// Launcher projectile.
    Bomb,
    /// Creep body.
    Creep(CreepType),
    /// Tower body.
    Tower(TowerType, TowerLevel),
    /// Health bar variant.
    Lifepoints(HealthStatus),
}

impl TemplateKey {
    /// Every template required to run a mission.
    #[must_use]
    pub fn all() -> Vec<TemplateKey> {
        let mut keys = vec![
            Self::Goal,
            Self::Path,
            Self::TowerPlacing,
            Self::Spawn,
            Self::ZipLine,
            Self::Bullet,
            Self::Bomb,
        ];
        keys.extend(CreepType::ALL.into_iter().map(Self::Creep));
        for kind in TowerType::ALL {
            keys.extend(TowerLevel::ALL.into_iter().map(|level| Self::Tower(kind, level)));
        }
        keys.extend(
            [HealthStatus::Full, HealthStatus::Half, HealthStatus::Low]
                .into_iter()
                .map(Self::Lifepoints),
        );
        keys
    }

    /// Asset name the rendering collaborator resolves the template from.
    #[must_use]
    pub fn asset_name(self) -> String {
        match self {
            Self::Goal => "goal".to_owned(),
            Self::Path => "path".to_owned(),
            Self::TowerPlacing => "tower_placing".to_owned(),
            Self::Spawn => "spawn_port".to_owned(),
            Self::ZipLine => "zip_line".to_owned(),
            Self::Bullet => "bullet".to_owned(),
            Self::Bomb => "flying_bomb".to_owned(),
            Self::Creep(kind) => format!("creep_{kind:?}").to_lowercase(),
            Self::Tower(kind, level) => format!("{}_{}", kind.key(), level.key()),
            Self::Lifepoints(status) => format!("lifepoints_{status:?}").to_lowercase(),
        }
    }

    /// Uniform scale applied to the template when it is instantiated.
    #[must_use]
    pub const fn scaling_factor(self) -> f32 {
        match self {
            Self::Goal | Self::Spawn => 0.1,
            Self::Path | Self::TowerPlacing => 0.125,
            Self::ZipLine => 0.02,
            Self::Bullet | Self::Bomb => 0.005,
            Self::Creep(CreepType::Tank) => 0.0012,
            Self::Creep(_) => 0.001,
            Self::Tower(_, TowerLevel::Lvl1) => 0.0004,
            Self::Tower(_, TowerLevel::Lvl2) => 0.00045,
            Self::Tower(_, TowerLevel::Lvl3) => 0.0005,
            Self::Lifepoints(_) => 0.02,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_text_round_trips_for_every_tower() {
        for kind in TowerType::ALL {
            for level in TowerLevel::ALL {
                let selector = TowerSelector::new(kind, level);
                let text = selector.to_string();
                assert_eq!(text.parse::<TowerSelector>(), Ok(selector));
            }
        }
        assert_eq!(
            TowerSelector::new(TowerType::Launcher, TowerLevel::Lvl2).to_string(),
            "launcher-lvl2"
        );
    }

    #[test]
    fn malformed_selectors_are_rejected() {
        assert_eq!(
            "turret".parse::<TowerSelector>(),
            Err(KeyParseError::MalformedSelector("turret".to_owned()))
        );
        assert_eq!(
            "cannon-lvl1".parse::<TowerSelector>(),
            Err(KeyParseError::UnknownTowerType("cannon".to_owned()))
        );
        assert_eq!(
            "turret-lvl9".parse::<TowerSelector>(),
            Err(KeyParseError::UnknownTowerLevel("lvl9".to_owned()))
        );
    }

    #[test]
    fn upgrades_saturate_at_max_level() {
        assert_eq!(TowerLevel::Lvl1.next(), TowerLevel::Lvl2);
        assert_eq!(TowerLevel::Lvl3.next(), TowerLevel::Lvl3);
        assert!(TowerLevel::Lvl3.is_max());
        for kind in TowerType::ALL {
            assert!(kind.cost(TowerLevel::Lvl1) < kind.cost(TowerLevel::Lvl2));
            assert!(kind.cost(TowerLevel::Lvl2) < kind.cost(TowerLevel::Lvl3));
        }
    }

    #[test]
    fn refund_is_half_the_level_cost() {
        assert_eq!(TowerType::Turret.refund(TowerLevel::Lvl1), 15);
        assert_eq!(TowerType::Barracks.refund(TowerLevel::Lvl1), 17);
    }

    #[test]
    fn turrets_and_launchers_reach_past_the_neighbouring_cells() {
        let cell = crate::CELL_SIZE;
        let turret = TowerType::Turret.reach(0.5);
        assert!(turret > 2.0 * cell && turret < 3.0 * cell);
        let launcher = TowerType::Launcher.reach(0.5);
        assert!(launcher > 3.0 * cell && launcher < 4.0 * cell);
        assert!((TowerType::Barracks.reach(0.5) - 0.05).abs() < 1e-6);
    }

    #[test]
    fn health_bands_cover_the_ratio_range() {
        assert_eq!(HealthStatus::from_ratio(1.0), HealthStatus::Full);
        assert_eq!(HealthStatus::from_ratio(0.5), HealthStatus::Half);
        assert_eq!(HealthStatus::from_ratio(0.2), HealthStatus::Low);
        assert_eq!(HealthStatus::from_ratio(0.0), HealthStatus::Low);
    }

    #[test]
    fn template_catalogue_lists_every_tower_level() {
        let keys = TemplateKey::all();
        assert_eq!(keys.len(), 7 + 3 + 9 + 3);
        assert!(keys.contains(&TemplateKey::Tower(TowerType::Barracks, TowerLevel::Lvl3)));
        assert_eq!(
            TemplateKey::Tower(TowerType::Turret, TowerLevel::Lvl2).asset_name(),
            "turret_lvl2"
        );
        assert_eq!(TemplateKey::Creep(CreepType::Speedy).asset_name(), "creep_speedy");
    }
}
