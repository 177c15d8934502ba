//! Turn scheduler
//!
//! Cooperative task queue in the worker's single-threaded model. A turn
//! processes only the tasks queued before it began; anything scheduled
//! while a turn runs waits for a later turn.

use std::collections::VecDeque;

/// Identifier handed out by `observe`; delivery tasks and disconnects use it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub(crate) u32);

/// Work deferred to a later turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnTask {
    /// Close the open batch, encode it, post the envelope.
    FlushMutations,
    /// Deliver one observer's queued records.
    NotifyObserver(ObserverId),
}

/// Cooperative turn queue.
#[derive(Debug, Default)]
pub struct TurnQueue {
    tasks: VecDeque<TurnTask>,
}

impl TurnQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, task: TurnTask) {
        self.tasks.push_back(task);
    }

    pub(crate) fn pop(&mut self) -> Option<TurnTask> {
        self.tasks.pop_front()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tasks_pop_in_schedule_order() {
        let mut queue = TurnQueue::new();
        queue.schedule(TurnTask::FlushMutations);
        queue.schedule(TurnTask::NotifyObserver(ObserverId(1)));
        assert_eq!(queue.pop(), Some(TurnTask::FlushMutations));
        assert_eq!(queue.pop(), Some(TurnTask::NotifyObserver(ObserverId(1))));
        assert_eq!(queue.pop(), None);
    }
}
