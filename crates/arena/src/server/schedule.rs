//! Delayed work, keyed by the tick it becomes due.

use std::collections::BTreeMap;

/// Work deferred to a later tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledTask {
    /// Replace a bot that died.
    RespawnBot,
}

/// Tick-based timer queue.
#[derive(Debug, Default)]
pub struct Scheduler {
    tasks: BTreeMap<u64, Vec<ScheduledTask>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `task` to run on tick `due`.
    pub fn schedule(&mut self, due: u64, task: ScheduledTask) {
        self.tasks.entry(due).or_default().push(task);
    }

    /// Remove and return every task due at or before `now`, oldest first.
    pub fn drain_due(&mut self, now: u64) -> Vec<ScheduledTask> {
        let later = self.tasks.split_off(&(now + 1));
        let due = std::mem::replace(&mut self.tasks, later);
        due.into_values().flatten().collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tasks_run_once_when_due() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(10, ScheduledTask::RespawnBot);
        scheduler.schedule(5, ScheduledTask::RespawnBot);
        scheduler.schedule(20, ScheduledTask::RespawnBot);
        assert_eq!(scheduler.len(), 3);

        assert!(scheduler.drain_due(4).is_empty());
        assert_eq!(scheduler.drain_due(10).len(), 2);
        assert!(scheduler.drain_due(10).is_empty());
        assert_eq!(scheduler.len(), 1);

        assert_eq!(scheduler.drain_due(100), vec![ScheduledTask::RespawnBot]);
        assert!(scheduler.is_empty());
    }
}
