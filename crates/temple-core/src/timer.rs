//! Delayed actions driven by the session clock.
//!
//! Nothing here runs on its own: the frame loop advances the clock by each
//! frame's delta and handles whatever fell due.

use std::time::Duration;

/// Actions the session schedules for later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    /// Put the puzzle ball back, unless attempt `attempt` has already been
    /// reset by other means.
    ResetBall { attempt: u64 },
    /// Hide the notice with this generation, unless it has been replaced.
    HideNotice { generation: u64 },
}

#[derive(Debug, Clone)]
struct Pending<T> {
    due: Duration,
    seq: u64,
    action: T,
}

/// Clock plus a queue of actions waiting for their due time.
#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    now: Duration,
    next_seq: u64,
    pending: Vec<Pending<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            now: Duration::ZERO,
            next_seq: 0,
            pending: Vec::new(),
        }
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time elapsed since the scheduler was created.
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn now_ms(&self) -> u128 {
        self.now.as_millis()
    }

    /// Queues `action` to fire `delay_ms` from now.
    pub fn schedule(&mut self, delay_ms: u64, action: T) {
        self.schedule_after(Duration::from_millis(delay_ms), action);
    }

    pub fn schedule_after(&mut self, delay: Duration, action: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(Pending {
            due: self.now + delay,
            seq,
            action,
        });
    }

    /// Moves the clock forward and returns every action that fell due, ordered
    /// by due time and then by scheduling order.
    pub fn advance(&mut self, dt: Duration) -> Vec<T> {
        self.now += dt;
        let now = self.now;

        let (mut due, waiting): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|p| p.due <= now);
        self.pending = waiting;

        due.sort_by_key(|p| (p.due, p.seq));
        due.into_iter().map(|p| p.action).collect()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }
}
