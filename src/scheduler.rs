use crate::dom::NodeId;

/// Follow-up work the page schedules on its virtual clock. Timers never run
/// scripts; every callback the storefront ever installs is one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TimerTask {
    NotificationEnter { node: NodeId },
    NotificationExit { node: NodeId },
    NotificationRemove { node: NodeId },
    ReloadPage,
    RunSearch { query: String },
    HideAlerts,
}

#[derive(Debug, Clone)]
pub(crate) struct ScheduledTask {
    pub(crate) id: i64,
    pub(crate) due_at: i64,
    pub(crate) order: i64,
    pub(crate) task: TimerTask,
}

/// A timer visible to tests: when it fires and which id cancels it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTimer {
    pub id: i64,
    pub due_at: i64,
}

#[derive(Debug)]
pub(crate) struct Scheduler {
    task_queue: Vec<ScheduledTask>,
    now_ms: i64,
    timer_step_limit: usize,
    next_timer_id: i64,
    next_task_order: i64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            task_queue: Vec::new(),
            now_ms: 0,
            timer_step_limit: 10_000,
            next_timer_id: 1,
            next_task_order: 0,
        }
    }
}

impl Scheduler {
    pub(crate) fn now_ms(&self) -> i64 {
        self.now_ms
    }

    pub(crate) fn set_now(&mut self, now_ms: i64) {
        self.now_ms = self.now_ms.max(now_ms);
    }

    pub(crate) fn timer_step_limit(&self) -> usize {
        self.timer_step_limit
    }

    pub(crate) fn set_timer_step_limit(&mut self, max_steps: usize) {
        self.timer_step_limit = max_steps;
    }

    pub(crate) fn schedule(&mut self, delay_ms: i64, task: TimerTask) -> i64 {
        let id = self.next_timer_id;
        self.next_timer_id += 1;
        let order = self.next_task_order;
        self.next_task_order += 1;
        self.task_queue.push(ScheduledTask {
            id,
            due_at: self.now_ms.saturating_add(delay_ms.max(0)),
            order,
            task,
        });
        id
    }

    pub(crate) fn clear(&mut self, timer_id: i64) -> bool {
        let before = self.task_queue.len();
        self.task_queue.retain(|task| task.id != timer_id);
        before != self.task_queue.len()
    }

    /// Removes and returns the earliest task due at or before `deadline`,
    /// breaking due-time ties by scheduling order.
    pub(crate) fn take_next_due(&mut self, deadline: i64) -> Option<ScheduledTask> {
        let index = self
            .task_queue
            .iter()
            .enumerate()
            .filter(|(_, task)| task.due_at <= deadline)
            .min_by_key(|(_, task)| (task.due_at, task.order))
            .map(|(index, _)| index)?;
        Some(self.task_queue.remove(index))
    }

    pub(crate) fn pending(&self) -> Vec<PendingTimer> {
        let mut timers: Vec<PendingTimer> = self
            .task_queue
            .iter()
            .map(|task| PendingTimer {
                id: task.id,
                due_at: task.due_at,
            })
            .collect();
        timers.sort_by_key(|timer| (timer.due_at, timer.id));
        timers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_tasks_fire_in_time_then_insertion_order() {
        let mut scheduler = Scheduler::default();
        let first = scheduler.schedule(100, TimerTask::HideAlerts);
        let second = scheduler.schedule(100, TimerTask::ReloadPage);
        let third = scheduler.schedule(50, TimerTask::HideAlerts);

        assert_eq!(scheduler.take_next_due(200).map(|t| t.id), Some(third));
        assert_eq!(scheduler.take_next_due(200).map(|t| t.id), Some(first));
        assert_eq!(scheduler.take_next_due(200).map(|t| t.id), Some(second));
        assert!(scheduler.take_next_due(200).is_none());
    }

    #[test]
    fn clear_cancels_only_the_target_timer() {
        let mut scheduler = Scheduler::default();
        let keep = scheduler.schedule(10, TimerTask::HideAlerts);
        let cancel = scheduler.schedule(10, TimerTask::ReloadPage);
        assert!(scheduler.clear(cancel));
        assert!(!scheduler.clear(cancel));
        assert_eq!(scheduler.pending().len(), 1);
        assert_eq!(scheduler.pending()[0].id, keep);
    }

    #[test]
    fn scheduling_near_i64_max_does_not_overflow() {
        let mut scheduler = Scheduler::default();
        scheduler.set_now(i64::MAX - 1);
        scheduler.schedule(1_000, TimerTask::ReloadPage);
        assert_eq!(scheduler.pending()[0].due_at, i64::MAX);
    }

    #[test]
    fn tasks_due_after_deadline_stay_queued() {
        let mut scheduler = Scheduler::default();
        scheduler.schedule(500, TimerTask::RunSearch {
            query: "planner".into(),
        });
        assert!(scheduler.take_next_due(499).is_none());
        assert!(scheduler.take_next_due(500).is_some());
    }
}
