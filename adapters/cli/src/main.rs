#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays AR Defense missions headlessly.

mod headless;
mod scenario;

use std::{path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use ar_defense_core::{MissionPhase, SessionRole, TowerType};
use ar_defense_runtime::Simulation;
use ar_defense_system_session::Input;
use ar_defense_world::query;
use clap::Parser;
use glam::Vec3;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    headless::Report,
    scenario::{Scenario, Step},
};

/// Interval at which waits feed time into the simulation.
const WAIT_SLICE: Duration = Duration::from_secs(1);

/// Runs an AR Defense mission without rendering.
#[derive(Debug, Parser)]
#[command(name = "ar-defense", version, about)]
struct Cli {
    /// Game configuration JSON.
    #[arg(long, default_value = "demos/mission.json")]
    config: PathBuf,
    /// Scenario script (TOML); a plain full run of `--mission` when omitted.
    #[arg(long)]
    scenario: Option<PathBuf>,
    /// Mission played when no scenario is given.
    #[arg(long, default_value_t = 0)]
    mission: usize,
    /// Seed for zip-line and bomb jitter randomness.
    #[arg(long, default_value_t = 7)]
    seed: u64,
    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, default_value = "info")]
    log_filter: String,
}

/// Entry point for the AR Defense command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_filter);

    let config = ar_defense_config::load(&cli.config).with_context(|| {
        format!(
            "failed to load game configuration from {}",
            cli.config.display()
        )
    })?;
    let scenario = match &cli.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::full_run(cli.mission),
    };

    let report = Report::default();
    let mut simulation = Simulation::new(
        config,
        SessionRole::Host,
        scenario.connected,
        report.collaborators(),
        cli.seed,
    );
    play(&mut simulation, &report, &scenario.steps)?;

    println!("{report}");
    Ok(())
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn play(simulation: &mut Simulation, report: &Report, steps: &[Step]) -> Result<()> {
    for (index, step) in steps.iter().enumerate() {
        perform(simulation, report, step)
            .with_context(|| format!("step {} ({step:?}) failed", index + 1))?;
        // Headless runs have nothing to load.
        if query::phase(simulation.world()) == MissionPhase::Loading {
            simulation.templates_loaded();
        }
    }
    Ok(())
}

fn perform(simulation: &mut Simulation, report: &Report, step: &Step) -> Result<()> {
    let input = match step {
        Step::SelectMission { index } => Input::SelectMission { index: *index },
        Step::PlaceMap { anchor } => Input::PlaceMap {
            anchor: Vec3::from_array(*anchor),
        },
        Step::PlaceAllMaps { spacing } => return place_all_maps(simulation, *spacing),
        Step::UndoMap => Input::UndoMap,
        Step::TapSlot { slot } => {
            let slots = query::placing_slots(simulation.world());
            let Some((placing, _)) = slots.get(*slot) else {
                bail!("there is no placing slot {slot}, only {}", slots.len());
            };
            Input::Tap {
                entities: vec![placing.entity()],
            }
        }
        Step::Build { tower } => {
            let kind: TowerType = tower
                .parse()
                .with_context(|| format!("'{tower}' is not a tower"))?;
            Input::BuildTower(kind)
        }
        Step::Upgrade => Input::UpgradeTower,
        Step::Sell => Input::SellTower,
        Step::Rotate { clockwise } => Input::RotateTower {
            clockwise: *clockwise,
        },
        Step::Start => Input::Start,
        Step::TogglePause => Input::TogglePause,
        Step::Wait { seconds } => {
            let total = Duration::try_from_secs_f32(*seconds)
                .with_context(|| format!("cannot wait {seconds} seconds"))?;
            wait(simulation, report, total);
            return Ok(());
        }
        Step::Receive { envelope } => {
            simulation.receive_peer(envelope.as_bytes());
            return Ok(());
        }
        Step::ReturnToMenu => Input::ReturnToMenu,
    };
    simulation.handle_input(input);
    Ok(())
}

fn place_all_maps(simulation: &mut Simulation, spacing: f32) -> Result<()> {
    while query::phase(simulation.world()) == MissionPhase::PlacingMaps {
        let placed = query::placed_maps(simulation.world());
        let offset = placed as f32 * spacing;
        simulation.handle_input(Input::PlaceMap {
            anchor: Vec3::new(offset, 0.0, 0.0),
        });
        if query::placed_maps(simulation.world()) == placed {
            bail!("map {} could not be placed", placed + 1);
        }
    }
    Ok(())
}

/// Advances time in slices, stopping early once the mission is over.
fn wait(simulation: &mut Simulation, report: &Report, total: Duration) {
    let mut waited = Duration::ZERO;
    while waited < total {
        let slice = WAIT_SLICE.min(total - waited);
        simulation.advance(slice);
        waited += slice;
        if report.finished() && query::phase(simulation.world()) == MissionPhase::Empty {
            info!(seconds = waited.as_secs_f32(), "mission over, wait cut short");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use ar_defense_config::GameConfig;

    fn simulation(report: &Report) -> Simulation {
        let config = GameConfig::from_json_str(include_str!("../../../demos/mission.json"))
            .expect("demo configuration is valid");
        Simulation::new(
            Arc::new(config),
            SessionRole::Host,
            false,
            report.collaborators(),
            7,
        )
    }

    #[test]
    fn demo_scenario_plays_to_the_end() {
        let report = Report::default();
        let mut simulation = simulation(&report);
        let scenario = Scenario::from_toml_str(include_str!("../../../demos/scenario.toml"))
            .expect("demo scenario parses");

        play(&mut simulation, &report, &scenario.steps).expect("demo scenario runs");

        assert!(report.finished(), "the mission reached a summary");
        assert_eq!(query::phase(simulation.world()), MissionPhase::Empty);
    }

    #[test]
    fn full_run_places_every_map_of_the_zip_line_mission() {
        let report = Report::default();
        let mut simulation = simulation(&report);

        play(&mut simulation, &report, &Scenario::full_run(1).steps[..2])
            .expect("maps are placed");

        assert_eq!(query::placed_maps(simulation.world()), 2);
        assert_eq!(
            query::phase(simulation.world()),
            MissionPhase::ReadyToDefend
        );
    }

    #[test]
    fn missing_slots_fail_the_step() {
        let report = Report::default();
        let mut simulation = simulation(&report);

        let result = play(&mut simulation, &report, &[Step::TapSlot { slot: 3 }]);

        assert!(result.is_err(), "no mission is loaded, so there are no slots");
    }
}
