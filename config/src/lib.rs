#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Immutable game configuration shared by every mission.
//!
//! The configuration is a JSON document with snake_case keys describing the
//! missions, the encyclopedia texts, and the initial economy. Loading
//! validates every map legend and resolves every creep route up front, so a
//! dead-end map is rejected before a mission can start.

use std::{collections::BTreeMap, fs, path::Path, sync::Arc};

use ar_defense_core::{CreepPath, CreepType, GridPosition, MapCell, MapGrid, WavePlan};
use ar_defense_system_pathing::{resolve_paths, PathError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading the game configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration from {path}")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying IO failure.
        #[source]
        source: std::io::Error,
    },
    /// The document is not valid configuration JSON.
    #[error("malformed configuration document")]
    Parse(#[from] serde_json::Error),
    /// No missions were configured.
    #[error("configuration defines no missions")]
    NoMissions,
    /// The grid diameter is not a positive number.
    #[error("grid diameter must be positive, got {0}")]
    InvalidGridDiameter(f32),
    /// A mission has no maps.
    #[error("mission {mission} has no maps")]
    NoMaps {
        /// Mission index.
        mission: usize,
    },
    /// A map matrix is empty or ragged.
    #[error("map {map} of mission {mission} is not a rectangular matrix")]
    MalformedMatrix {
        /// Mission index.
        mission: usize,
        /// Map index.
        map: usize,
    },
    /// A map matrix contains an unknown legend code.
    #[error("map {map} of mission {mission} uses unknown legend {code} at ({row}, {column})")]
    UnknownLegend {
        /// Mission index.
        mission: usize,
        /// Map index.
        map: usize,
        /// Row of the offending cell.
        row: usize,
        /// Column of the offending cell.
        column: usize,
        /// Offending code.
        code: u8,
    },
    /// A wave references an unknown creep type.
    #[error("wave {wave} of mission {mission} references unknown creep type {index}")]
    UnknownCreep {
        /// Mission index.
        mission: usize,
        /// Wave index.
        wave: usize,
        /// Offending creep index.
        index: usize,
    },
    /// A mission with waves has no spawn point on any map.
    #[error("mission {mission} has waves but no spawn point")]
    NoSpawn {
        /// Mission index.
        mission: usize,
    },
    /// A mission sends creeps into zip-lines without any arrival point.
    #[error("mission {mission} has zip-line exits but no zip-line entry")]
    MissingZipLineEntry {
        /// Mission index.
        mission: usize,
    },
    /// A route could not be resolved.
    #[error("map {map} of mission {mission} has an unusable route")]
    Route {
        /// Mission index.
        mission: usize,
        /// Map index.
        map: usize,
        /// Resolver failure.
        #[source]
        source: PathError,
    },
}

/// Loads and validates the configuration stored at `path`.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file cannot be read or fails validation.
pub fn load(path: impl AsRef<Path>) -> Result<Arc<GameConfig>, ConfigError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    GameConfig::from_json_str(&text).map(Arc::new)
}

/// Economy and timing values applied when a mission starts.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct InitialValues {
    /// Offset, in cells, applied when centring a map on its anchor.
    pub grid_diameter: f32,
    /// Game ticks between a wave dispatch and the next countdown.
    pub wave_interval: u32,
    /// Starting coin balance.
    pub coins: u32,
    /// Starting player hit points.
    pub player_hp: u32,
    /// Countdown, in game ticks, before each wave.
    pub grace_time: u32,
    /// Informational creep count per wave shown in the menu.
    #[serde(default)]
    pub creeps_per_wave: u32,
}

/// Encyclopedia entry describing a tower or creep in the menu.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncyclopediaEntry {
    /// Display name.
    pub name: String,
    /// Long description.
    #[serde(default)]
    pub description: String,
}

/// Menu texts for towers and creeps.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encyclopedia {
    /// Tower entries.
    #[serde(default)]
    pub towers: Vec<EncyclopediaEntry>,
    /// Creep entries.
    #[serde(default)]
    pub creeps: Vec<EncyclopediaEntry>,
}

#[derive(Deserialize)]
struct RawConfig {
    missions: Vec<RawMission>,
    #[serde(default, rename = "enciclopedia")]
    encyclopedia: Encyclopedia,
    initial_values: InitialValues,
}

#[derive(Deserialize)]
struct RawMission {
    #[serde(default)]
    difficulty: u32,
    waves: Vec<Vec<usize>>,
    maps: Vec<RawMap>,
}

#[derive(Deserialize)]
struct RawMap {
    matrix: Vec<Vec<u8>>,
}

/// Validated game configuration.
#[derive(Clone, Debug)]
pub struct GameConfig {
    missions: Vec<Mission>,
    encyclopedia: Encyclopedia,
    initial_values: InitialValues,
}

impl GameConfig {
    /// Parses and validates a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] describing the first problem encountered.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(text)?;
        let diameter = raw.initial_values.grid_diameter;
        if !(diameter.is_finite() && diameter > 0.0) {
            return Err(ConfigError::InvalidGridDiameter(diameter));
        }
        if raw.missions.is_empty() {
            return Err(ConfigError::NoMissions);
        }

        let missions = raw
            .missions
            .into_iter()
            .enumerate()
            .map(|(index, mission)| Mission::from_raw(index, mission, diameter))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            missions,
            encyclopedia: raw.encyclopedia,
            initial_values: raw.initial_values,
        })
    }

    /// Mission at the provided index.
    #[must_use]
    pub fn mission(&self, index: usize) -> Option<&Mission> {
        self.missions.get(index)
    }

    /// Every configured mission in menu order.
    #[must_use]
    pub fn missions(&self) -> &[Mission] {
        &self.missions
    }

    /// Menu texts.
    #[must_use]
    pub fn encyclopedia(&self) -> &Encyclopedia {
        &self.encyclopedia
    }

    /// Starting economy and timing values.
    #[must_use]
    pub fn initial_values(&self) -> &InitialValues {
        &self.initial_values
    }

    /// Wave timing and composition of the mission at `index`.
    #[must_use]
    pub fn wave_plan(&self, index: usize) -> Option<WavePlan> {
        let mission = self.missions.get(index)?;
        Some(WavePlan {
            grace_time: self.initial_values.grace_time,
            wave_interval: self.initial_values.wave_interval,
            waves: mission.waves.clone(),
        })
    }
}

/// Validated mission definition.
#[derive(Clone, Debug)]
pub struct Mission {
    difficulty: u32,
    waves: Vec<Vec<CreepType>>,
    maps: Vec<MissionMap>,
}

impl Mission {
    fn from_raw(index: usize, raw: RawMission, diameter: f32) -> Result<Self, ConfigError> {
        if raw.maps.is_empty() {
            return Err(ConfigError::NoMaps { mission: index });
        }

        let waves = raw
            .waves
            .iter()
            .enumerate()
            .map(|(wave, creeps)| {
                creeps
                    .iter()
                    .map(|&creep| {
                        CreepType::from_index(creep).ok_or(ConfigError::UnknownCreep {
                            mission: index,
                            wave,
                            index: creep,
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        let maps = raw
            .maps
            .into_iter()
            .enumerate()
            .map(|(map, raw_map)| MissionMap::from_raw(index, map, raw_map, diameter))
            .collect::<Result<Vec<_>, _>>()?;

        let has = |legend| {
            maps.iter()
                .any(|map: &MissionMap| !map.grid.positions_of(legend).is_empty())
        };
        if !waves.is_empty() && !has(MapCell::Spawn) {
            return Err(ConfigError::NoSpawn { mission: index });
        }
        if has(MapCell::ZipLineOut) && !has(MapCell::ZipLineIn) {
            return Err(ConfigError::MissingZipLineEntry { mission: index });
        }

        Ok(Self {
            difficulty: raw.difficulty,
            waves,
            maps,
        })
    }

    /// Difficulty rating shown in the menu.
    #[must_use]
    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Creep types of every wave.
    #[must_use]
    pub fn waves(&self) -> &[Vec<CreepType>] {
        &self.waves
    }

    /// Maps in placement order.
    #[must_use]
    pub fn maps(&self) -> &[MissionMap] {
        &self.maps
    }
}

/// Validated map together with the routes leaving each start cell.
#[derive(Clone, Debug)]
pub struct MissionMap {
    grid: MapGrid,
    routes: BTreeMap<GridPosition, Vec<Arc<CreepPath>>>,
}

impl MissionMap {
    fn from_raw(
        mission: usize,
        map: usize,
        raw: RawMap,
        diameter: f32,
    ) -> Result<Self, ConfigError> {
        let mut rows = Vec::with_capacity(raw.matrix.len());
        for (row, codes) in raw.matrix.iter().enumerate() {
            let mut cells = Vec::with_capacity(codes.len());
            for (column, &code) in codes.iter().enumerate() {
                let cell = MapCell::from_code(code).ok_or(ConfigError::UnknownLegend {
                    mission,
                    map,
                    row,
                    column,
                    code,
                })?;
                cells.push(cell);
            }
            rows.push(cells);
        }
        let grid =
            MapGrid::from_rows(rows).ok_or(ConfigError::MalformedMatrix { mission, map })?;

        let mut routes = BTreeMap::new();
        for (start, legend) in grid.iter() {
            if !matches!(legend, MapCell::Spawn | MapCell::ZipLineIn) {
                continue;
            }
            let resolved = resolve_paths(&grid, start, diameter)
                .map_err(|source| ConfigError::Route {
                    mission,
                    map,
                    source,
                })?
                .into_iter()
                .map(Arc::new)
                .collect();
            let _ = routes.insert(start, resolved);
        }

        Ok(Self { grid, routes })
    }

    /// Legend matrix of the map.
    #[must_use]
    pub fn grid(&self) -> &MapGrid {
        &self.grid
    }

    /// Routes leaving the spawn or zip-line entry at `start`.
    #[must_use]
    pub fn routes_from(&self, start: GridPosition) -> &[Arc<CreepPath>] {
        self.routes
            .get(&start)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
