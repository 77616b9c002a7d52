//! Deferred actions on the simulation clock
//!
//! UI sequencing delays ("start the round a second after the flood", "ignore
//! clicks for 200 ms") are scheduled tasks with cancellable handles. While a
//! blocking task is pending, input is locked.

use serde::{Deserialize, Serialize};

/// Handle for cancelling a scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskHandle(u32);

/// What to do when a task comes due
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeferredAction {
    /// Start the round (after the tactical lane was chosen)
    AutoStartRound,
    /// Only lifts the input lock
    Unblock,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScheduledTask {
    handle: TaskHandle,
    due: f64,
    action: DeferredAction,
    blocking: bool,
}

/// Cooperative scheduler driven by `advance`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scheduler {
    /// Seconds since the match started
    now: f64,
    tasks: Vec<ScheduledTask>,
    next_handle: u32,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule an action `delay_ms` from now
    pub fn schedule(&mut self, delay_ms: u32, action: DeferredAction, blocking: bool) -> TaskHandle {
        let handle = TaskHandle(self.next_handle);
        self.next_handle += 1;
        self.tasks.push(ScheduledTask {
            handle,
            due: self.now + f64::from(delay_ms) / 1000.0,
            action,
            blocking,
        });
        handle
    }

    /// Cancel a pending task. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.handle != handle);
        self.tasks.len() != before
    }

    /// Drop every pending task (match restart)
    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    pub fn is_pending(&self, handle: TaskHandle) -> bool {
        self.tasks.iter().any(|t| t.handle == handle)
    }

    /// True while any blocking task is pending
    pub fn is_blocking(&self) -> bool {
        self.tasks.iter().any(|t| t.blocking)
    }

    /// Advance the clock and return due actions in firing order
    pub fn advance(&mut self, dt: f32) -> Vec<DeferredAction> {
        self.now += f64::from(dt);
        let now = self.now;

        let mut due: Vec<ScheduledTask> = Vec::new();
        self.tasks.retain(|t| {
            if t.due <= now {
                due.push(t.clone());
                false
            } else {
                true
            }
        });
        due.sort_by(|a, b| a.due.total_cmp(&b.due).then(a.handle.0.cmp(&b.handle.0)));
        due.into_iter().map(|t| t.action).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_fires_after_delay() {
        let mut sched = Scheduler::new();
        sched.schedule(1000, DeferredAction::AutoStartRound, true);
        assert!(sched.is_blocking());

        assert!(sched.advance(0.5).is_empty());
        assert!(sched.is_blocking());
        assert_eq!(sched.advance(0.5), vec![DeferredAction::AutoStartRound]);
        assert!(!sched.is_blocking());
    }

    #[test]
    fn test_cancel_prevents_firing() {
        let mut sched = Scheduler::new();
        let handle = sched.schedule(200, DeferredAction::Unblock, true);
        assert!(sched.cancel(handle));
        assert!(!sched.cancel(handle));
        assert!(sched.advance(1.0).is_empty());
        assert!(!sched.is_blocking());
    }

    #[test]
    fn test_due_tasks_fire_in_order() {
        let mut sched = Scheduler::new();
        sched.schedule(300, DeferredAction::AutoStartRound, false);
        sched.schedule(100, DeferredAction::Unblock, false);
        assert_eq!(
            sched.advance(1.0),
            vec![DeferredAction::Unblock, DeferredAction::AutoStartRound]
        );
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut sched = Scheduler::new();
        let handle = sched.schedule(100, DeferredAction::Unblock, true);
        sched.clear();
        assert!(!sched.is_pending(handle));
        assert!(!sched.is_blocking());
    }
}
