//! Frame-counted deferred work
//!
//! Timed behaviour (turn speed ramp, stage regeneration, chain clears) is
//! queued here against the simulation tick instead of wall-clock timers, so
//! a reset can drop every pending callback at once.

use serde::{Deserialize, Serialize};

/// Deferred work items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Task {
    /// Raise the turn speed one step
    SpeedStep,
    /// Build the next stage's field
    RegenerateField,
    /// Detonate the next block of a maze chain clear
    ChainClearStep,
    /// Conclude the turn
    EndTurn,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    due: u64,
    task: Task,
    /// Re-arm period for repeating tasks
    every: Option<u32>,
}

/// Pending tasks keyed by the tick they fire on
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schedule {
    entries: Vec<Entry>,
}

impl Schedule {
    /// Run `task` once, `delay` ticks after `now`
    pub fn after(&mut self, now: u64, delay: u32, task: Task) {
        self.entries.push(Entry {
            due: now + delay.max(1) as u64,
            task,
            every: None,
        });
    }

    /// Run `task` every `period` ticks, starting one period after `now`
    pub fn every(&mut self, now: u64, period: u32, task: Task) {
        let period = period.max(1);
        self.entries.push(Entry {
            due: now + period as u64,
            task,
            every: Some(period),
        });
    }

    /// Pop every task due at or before `now` in scheduling order
    ///
    /// Repeating tasks are re-armed relative to `now`.
    pub fn take_due(&mut self, now: u64) -> Vec<Task> {
        let mut due = Vec::new();
        self.entries.retain_mut(|entry| {
            if entry.due > now {
                return true;
            }
            due.push(entry.task);
            match entry.every {
                Some(period) => {
                    entry.due = now + period as u64;
                    true
                }
                None => false,
            }
        });
        due
    }

    pub fn cancel(&mut self, task: Task) {
        self.entries.retain(|e| e.task != task);
    }

    pub fn is_pending(&self, task: Task) -> bool {
        self.entries.iter().any(|e| e.task == task)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_shot_fires_once() {
        let mut schedule = Schedule::default();
        schedule.after(10, 5, Task::RegenerateField);

        assert!(schedule.take_due(14).is_empty());
        assert_eq!(schedule.take_due(15), vec![Task::RegenerateField]);
        assert!(schedule.take_due(16).is_empty());
        assert!(schedule.is_empty());
    }

    #[test]
    fn test_repeating_rearms() {
        let mut schedule = Schedule::default();
        schedule.every(0, 30, Task::SpeedStep);

        let fired: usize = (1..=90).map(|t| schedule.take_due(t).len()).sum();
        assert_eq!(fired, 3);
        assert!(schedule.is_pending(Task::SpeedStep));
    }

    #[test]
    fn test_cancel_and_clear() {
        let mut schedule = Schedule::default();
        schedule.every(0, 1, Task::ChainClearStep);
        schedule.after(0, 30, Task::EndTurn);

        schedule.cancel(Task::ChainClearStep);
        assert!(!schedule.is_pending(Task::ChainClearStep));
        assert_eq!(schedule.len(), 1);

        schedule.clear();
        assert!(schedule.take_due(100).is_empty());
    }

    #[test]
    fn test_zero_delay_waits_one_tick() {
        let mut schedule = Schedule::default();
        schedule.after(5, 0, Task::EndTurn);
        assert!(schedule.take_due(5).is_empty());
        assert_eq!(schedule.take_due(6), vec![Task::EndTurn]);
    }
}
