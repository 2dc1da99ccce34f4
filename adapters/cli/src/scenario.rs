//! Scripted host actions for headless runs.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Sequence of host actions replayed against a simulation.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    /// Whether the host behaves as if a peer were connected.
    #[serde(default)]
    pub(crate) connected: bool,
    /// Actions in execution order.
    #[serde(default, rename = "step")]
    pub(crate) steps: Vec<Step>,
}

/// Single scripted action.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub(crate) enum Step {
    /// Loads a mission as host.
    SelectMission { index: usize },
    /// Anchors the next map at the provided translation.
    PlaceMap { anchor: [f32; 3] },
    /// Anchors every remaining map along the x axis.
    PlaceAllMaps {
        #[serde(default = "default_spacing")]
        spacing: f32,
    },
    /// Removes the last anchored map.
    UndoMap,
    /// Taps the placing slot with the provided index.
    TapSlot { slot: usize },
    /// Builds a tower, named by its wire key, on the selected slot.
    Build { tower: String },
    /// Upgrades the selected tower.
    Upgrade,
    /// Sells the selected tower.
    Sell,
    /// Rotates the selected tower.
    Rotate {
        #[serde(default)]
        clockwise: bool,
    },
    /// Starts the defence.
    Start,
    /// Pauses or resumes the defence.
    TogglePause,
    /// Lets simulated time pass.
    Wait { seconds: f32 },
    /// Delivers a raw peer envelope.
    Receive { envelope: String },
    /// Leaves the mission.
    ReturnToMenu,
}

fn default_spacing() -> f32 {
    1.0
}

impl Scenario {
    /// Reads a scenario from a TOML file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("failed to parse scenario {}", path.display()))
    }

    /// Parses a scenario from TOML text.
    pub(crate) fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Plays the provided mission start to finish without building anything.
    pub(crate) fn full_run(mission: usize) -> Self {
        Self {
            connected: false,
            steps: vec![
                Step::SelectMission { index: mission },
                Step::PlaceAllMaps {
                    spacing: default_spacing(),
                },
                Step::Start,
                Step::Wait { seconds: 600.0 },
            ],
        }
    }
}
