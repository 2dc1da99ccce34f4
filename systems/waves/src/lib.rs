#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that turns game ticks into wave countdowns and creep releases.
//!
//! Once the defence starts, every game tick first releases the next queued
//! creep of each spawn point and then advances the wave clock: the grace
//! countdown is announced down to zero, where the next wave is dispatched,
//! followed by the configured interval before the countdown restarts.

use std::collections::VecDeque;

use ar_defense_core::{Command, CreepType, Event, MissionPhase, SpawnId, WavePlan};

/// Wave scheduler that owns the grace countdown and per-spawn release queues.
#[derive(Debug, Default)]
pub struct WaveScheduler {
    armed: bool,
    grace: i64,
    interval: i64,
    dispatched: usize,
    queues: Vec<(SpawnId, VecDeque<CreepType>)>,
}

impl WaveScheduler {
    /// Creates an idle scheduler; it arms itself when the defence starts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports whether the scheduler is counting game ticks.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Number of waves dispatched since the defence started.
    #[must_use]
    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    /// Consumes world events and emits wave commands.
    pub fn handle(
        &mut self,
        events: &[Event],
        plan: Option<&WavePlan>,
        spawns: &[SpawnId],
        out: &mut Vec<Command>,
    ) {
        for event in events {
            match event {
                Event::DefenseStarted => {
                    if let Some(plan) = plan {
                        self.arm(plan);
                    }
                }
                Event::PhaseChanged {
                    to: MissionPhase::Completed | MissionPhase::Failed | MissionPhase::Empty,
                    ..
                }
                | Event::MissionTornDown => self.disarm(),
                Event::GameTicked { .. } if self.armed => {
                    if let Some(plan) = plan {
                        self.tick(plan, spawns, out);
                    }
                }
                _ => {}
            }
        }
    }

    fn arm(&mut self, plan: &WavePlan) {
        self.armed = true;
        self.grace = i64::from(plan.grace_time);
        self.interval = i64::from(plan.wave_interval);
        self.dispatched = 0;
        self.queues.clear();
    }

    fn disarm(&mut self) {
        self.armed = false;
        self.queues.clear();
    }

    fn tick(&mut self, plan: &WavePlan, spawns: &[SpawnId], out: &mut Vec<Command>) {
        for (spawn, queue) in &mut self.queues {
            if let Some(kind) = queue.pop_front() {
                out.push(Command::ReleaseCreep {
                    spawn: *spawn,
                    kind,
                });
            }
        }
        self.queues.retain(|(_, queue)| !queue.is_empty());

        if self.dispatched >= plan.total_waves() {
            return;
        }

        if self.grace >= 0 {
            out.push(Command::UpdateWaveCountdown {
                seconds: u32::try_from(self.grace).unwrap_or(u32::MAX),
            });
            if self.grace == 0 {
                self.dispatch(plan, spawns, out);
            }
            self.grace -= 1;
        } else if self.interval == 0 {
            self.grace = i64::from(plan.grace_time);
            self.interval = i64::from(plan.wave_interval);
        } else {
            self.interval -= 1;
        }
    }

    fn dispatch(&mut self, plan: &WavePlan, spawns: &[SpawnId], out: &mut Vec<Command>) {
        let wave = self.dispatched;
        let Some(creeps) = plan.waves.get(wave) else {
            return;
        };
        let releases = creeps.len() * spawns.len();
        out.push(Command::BeginWave {
            wave,
            releases: u32::try_from(releases).unwrap_or(u32::MAX),
        });
        self.dispatched += 1;

        for &spawn in spawns {
            let mut queue: VecDeque<CreepType> = creeps.iter().copied().collect();
            if let Some(kind) = queue.pop_front() {
                out.push(Command::ReleaseCreep { spawn, kind });
            }
            if !queue.is_empty() {
                self.queues.push((spawn, queue));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(grace_time: u32, wave_interval: u32, waves: Vec<Vec<CreepType>>) -> WavePlan {
        WavePlan {
            grace_time,
            wave_interval,
            waves,
        }
    }

    fn tick(n: u64) -> Event {
        Event::GameTicked { tick: n }
    }

    fn run_ticks(
        scheduler: &mut WaveScheduler,
        plan: &WavePlan,
        spawns: &[SpawnId],
        ticks: u64,
    ) -> Vec<Vec<Command>> {
        (1..=ticks)
            .map(|n| {
                let mut out = Vec::new();
                scheduler.handle(&[tick(n)], Some(plan), spawns, &mut out);
                out
            })
            .collect()
    }

    #[test]
    fn ticks_are_ignored_until_the_defence_starts() {
        let mut scheduler = WaveScheduler::new();
        let plan = plan(0, 0, vec![vec![CreepType::Regular]]);
        let mut out = Vec::new();

        scheduler.handle(&[tick(1)], Some(&plan), &[SpawnId::new(0)], &mut out);

        assert!(out.is_empty());
        assert!(!scheduler.is_armed());
    }

    #[test]
    fn grace_counts_down_before_the_first_dispatch() {
        let mut scheduler = WaveScheduler::new();
        let plan = plan(2, 0, vec![vec![CreepType::Regular, CreepType::Tank]]);
        let spawns = [SpawnId::new(0)];
        let mut out = Vec::new();
        scheduler.handle(&[Event::DefenseStarted], Some(&plan), &spawns, &mut out);

        let ticks = run_ticks(&mut scheduler, &plan, &spawns, 4);

        assert_eq!(ticks[0], vec![Command::UpdateWaveCountdown { seconds: 2 }]);
        assert_eq!(ticks[1], vec![Command::UpdateWaveCountdown { seconds: 1 }]);
        assert_eq!(
            ticks[2],
            vec![
                Command::UpdateWaveCountdown { seconds: 0 },
                Command::BeginWave {
                    wave: 0,
                    releases: 2,
                },
                Command::ReleaseCreep {
                    spawn: SpawnId::new(0),
                    kind: CreepType::Regular,
                },
            ]
        );
        assert_eq!(
            ticks[3],
            vec![Command::ReleaseCreep {
                spawn: SpawnId::new(0),
                kind: CreepType::Tank,
            }],
            "the remaining creep follows one tick later and no waves remain"
        );
        assert_eq!(scheduler.dispatched(), 1);
    }

    #[test]
    fn every_spawn_releases_the_whole_wave() {
        let mut scheduler = WaveScheduler::new();
        let plan = plan(0, 0, vec![vec![CreepType::Speedy, CreepType::Speedy]]);
        let spawns = [SpawnId::new(0), SpawnId::new(1)];
        let mut out = Vec::new();
        scheduler.handle(&[Event::DefenseStarted], Some(&plan), &spawns, &mut out);

        let ticks = run_ticks(&mut scheduler, &plan, &spawns, 3);

        assert!(ticks[0].contains(&Command::BeginWave {
            wave: 0,
            releases: 4,
        }));
        let released: usize = ticks
            .iter()
            .flatten()
            .filter(|command| matches!(command, Command::ReleaseCreep { .. }))
            .count();
        assert_eq!(released, 4);
    }

    #[test]
    fn interval_separates_consecutive_waves() {
        let mut scheduler = WaveScheduler::new();
        let plan = plan(
            1,
            1,
            vec![vec![CreepType::Regular], vec![CreepType::Regular]],
        );
        let spawns = [SpawnId::new(0)];
        let mut out = Vec::new();
        scheduler.handle(&[Event::DefenseStarted], Some(&plan), &spawns, &mut out);

        let ticks = run_ticks(&mut scheduler, &plan, &spawns, 8);
        let dispatches: Vec<usize> = ticks
            .iter()
            .enumerate()
            .filter(|(_, commands)| {
                commands
                    .iter()
                    .any(|command| matches!(command, Command::BeginWave { .. }))
            })
            .map(|(index, _)| index)
            .collect();

        // grace 1, 0 (dispatch), interval 1, 0 (restart), grace 1, 0 (dispatch)
        assert_eq!(dispatches, vec![1, 5]);
        assert!(ticks[6].is_empty() && ticks[7].is_empty());
    }

    #[test]
    fn terminal_phase_disarms_the_scheduler() {
        let mut scheduler = WaveScheduler::new();
        let plan = plan(0, 0, vec![vec![CreepType::Regular, CreepType::Regular]]);
        let spawns = [SpawnId::new(0)];
        let mut out = Vec::new();
        scheduler.handle(&[Event::DefenseStarted], Some(&plan), &spawns, &mut out);
        let _ = run_ticks(&mut scheduler, &plan, &spawns, 1);

        scheduler.handle(
            &[Event::PhaseChanged {
                from: MissionPhase::Defending,
                to: MissionPhase::Failed,
            }],
            Some(&plan),
            &spawns,
            &mut out,
        );
        let ticks = run_ticks(&mut scheduler, &plan, &spawns, 2);

        assert!(!scheduler.is_armed());
        assert!(ticks.iter().all(Vec::is_empty));
    }
}
