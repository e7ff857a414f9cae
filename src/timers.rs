//! Purpose-keyed deferred work.
//!
//! Every timed effect in the engine - the highlight fade, the scroll-settle
//! debounce, the mutation-settle debounce - is a cancelable deadline keyed by
//! purpose. Scheduling a purpose again supersedes the previous deadline, so a
//! burst of scroll events keeps pushing one settle task instead of racing
//! several. The queue holds no clock of its own; callers pass `now`.

use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Remove a faded-out highlight (and apply a queued replacement).
    FadeOut,
    /// A burst of raw scroll events went quiet.
    ScrollSettle,
    /// A burst of document mutations went quiet.
    MutationSettle,
}

#[derive(Debug, Default)]
pub struct TaskQueue {
    slots: Vec<(TaskKind, Instant)>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `kind` to fire at `at`, replacing any pending deadline of the
    /// same kind.
    pub fn schedule(&mut self, kind: TaskKind, at: Instant) {
        self.slots.retain(|(k, _)| *k != kind);
        self.slots.push((kind, at));
    }

    pub fn cancel(&mut self, kind: TaskKind) {
        self.slots.retain(|(k, _)| *k != kind);
    }

    pub fn is_scheduled(&self, kind: TaskKind) -> bool {
        self.slots.iter().any(|(k, _)| *k == kind)
    }

    /// Earliest pending deadline; bounds the event loop's poll timeout.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.slots.iter().map(|(_, at)| *at).min()
    }

    /// Remove and return every task due at `now`, earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<TaskKind> {
        let mut due: Vec<(TaskKind, Instant)> = Vec::new();
        self.slots.retain(|entry| {
            if entry.1 <= now {
                due.push(*entry);
                false
            } else {
                true
            }
        });
        due.sort_by_key(|(_, at)| *at);
        due.into_iter().map(|(kind, _)| kind).collect()
    }
}
