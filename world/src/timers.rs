//! Virtual-clock timer scheduler owned by the world.

use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap},
    time::Duration,
};

use ar_defense_core::{AmmoId, CreepId, CreepType, TowerId, TroopId};

/// Handle of a scheduled timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct TimerId(u64);

/// Work performed when a timer fires.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum TimerAction {
    GameTick,
    TowerAttack { tower: TowerId },
    WaypointReached { creep: CreepId },
    HazardTick { creep: CreepId, remaining: u8 },
    ZipLineArrival { kind: CreepType, hp: f32 },
    TroopStrike { troop: TroopId },
    CreepStrike { creep: CreepId, troop: TroopId },
    TroopRespawn { tower: TowerId },
    AmmoStep { ammo: AmmoId },
    CompletionCheck,
    Teardown,
}

#[derive(Clone, Copy, Debug)]
struct Entry {
    due: Duration,
    period: Option<Duration>,
    action: TimerAction,
}

/// Deterministic scheduler ordering firings by due time, then creation order.
///
/// Cancelled timers are dropped from the entry table; their heap slots are
/// skipped lazily when popped.
#[derive(Debug, Default)]
pub(crate) struct Scheduler {
    now: Duration,
    next_id: u64,
    heap: BinaryHeap<Reverse<(Duration, TimerId)>>,
    entries: HashMap<TimerId, Entry>,
}

impl Scheduler {
    pub(crate) fn now(&self) -> Duration {
        self.now
    }

    /// Schedules a one-shot timer firing `delay` from now.
    pub(crate) fn schedule(&mut self, delay: Duration, action: TimerAction) -> TimerId {
        self.insert(delay, None, action)
    }

    /// Schedules a timer firing after `delay` and then every `period`.
    pub(crate) fn schedule_repeating(
        &mut self,
        delay: Duration,
        period: Duration,
        action: TimerAction,
    ) -> TimerId {
        self.insert(delay, Some(period), action)
    }

    fn insert(&mut self, delay: Duration, period: Option<Duration>, action: TimerAction) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let due = self.now + delay;
        let _ = self.entries.insert(
            id,
            Entry {
                due,
                period,
                action,
            },
        );
        self.heap.push(Reverse((due, id)));
        id
    }

    /// Cancels a timer; cancelling twice or after a one-shot fired is a no-op.
    pub(crate) fn cancel(&mut self, id: TimerId) {
        let _ = self.entries.remove(&id);
    }

    /// Cancels the timer stored in `slot`, leaving the slot empty.
    pub(crate) fn cancel_slot(&mut self, slot: &mut Option<TimerId>) {
        if let Some(id) = slot.take() {
            self.cancel(id);
        }
    }

    pub(crate) fn is_live(&self, id: TimerId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Pops the next live firing due no later than `until`, moving the clock to it.
    pub(crate) fn pop_due(&mut self, until: Duration) -> Option<(TimerId, TimerAction)> {
        while let Some(Reverse((due, id))) = self.heap.peek().copied() {
            if due > until {
                return None;
            }
            let _ = self.heap.pop();
            let Some(entry) = self.entries.get_mut(&id) else {
                continue;
            };
            if entry.due != due {
                continue;
            }

            self.now = due;
            let action = entry.action;
            match entry.period {
                Some(period) => {
                    entry.due = due + period;
                    self.heap.push(Reverse((entry.due, id)));
                }
                None => {
                    let _ = self.entries.remove(&id);
                }
            }
            return Some((id, action));
        }
        None
    }

    /// Moves the clock forward once every due firing was drained.
    pub(crate) fn advance_to(&mut self, until: Duration) {
        if until > self.now {
            self.now = until;
        }
    }

    /// Cancels every timer without touching the clock.
    pub(crate) fn clear(&mut self) {
        self.heap.clear();
        self.entries.clear();
    }

    pub(crate) fn pending(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(scheduler: &mut Scheduler, until: Duration) -> Vec<TimerAction> {
        let mut fired = Vec::new();
        while let Some((_, action)) = scheduler.pop_due(until) {
            fired.push(action);
        }
        scheduler.advance_to(until);
        fired
    }

    #[test]
    fn firings_follow_due_time_then_creation_order() {
        let mut scheduler = Scheduler::default();
        let _ = scheduler.schedule(Duration::from_millis(500), TimerAction::Teardown);
        let _ = scheduler.schedule(Duration::from_millis(200), TimerAction::GameTick);
        let _ = scheduler.schedule(Duration::from_millis(200), TimerAction::CompletionCheck);

        let fired = drain(&mut scheduler, Duration::from_secs(1));
        assert_eq!(
            fired,
            vec![
                TimerAction::GameTick,
                TimerAction::CompletionCheck,
                TimerAction::Teardown
            ]
        );
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(scheduler.now(), Duration::from_secs(1));
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let mut scheduler = Scheduler::default();
        let id = scheduler.schedule(Duration::from_millis(100), TimerAction::Teardown);
        scheduler.cancel(id);
        scheduler.cancel(id);

        assert!(drain(&mut scheduler, Duration::from_secs(1)).is_empty());
        assert!(!scheduler.is_live(id));
    }

    #[test]
    fn repeating_timers_fire_immediately_then_every_period() {
        let mut scheduler = Scheduler::default();
        let id = scheduler.schedule_repeating(
            Duration::ZERO,
            Duration::from_secs(1),
            TimerAction::GameTick,
        );

        assert_eq!(drain(&mut scheduler, Duration::ZERO).len(), 1);
        assert_eq!(drain(&mut scheduler, Duration::from_millis(2_500)).len(), 2);
        assert!(scheduler.is_live(id));

        let mut slot = Some(id);
        scheduler.cancel_slot(&mut slot);
        assert!(slot.is_none());
        assert!(drain(&mut scheduler, Duration::from_secs(10)).is_empty());
    }
}
