//! Transient on-screen messages.

use std::collections::VecDeque;

use crate::timer::{Scheduler, TimerAction};

/// How many past notices are kept.
pub const HISTORY_LIMIT: usize = 32;

/// A message currently on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub generation: u64,
}

/// Holds at most one notice. Showing a new one replaces the old one, and each
/// notice schedules its own hide.
#[derive(Debug, Default)]
pub struct NoticeBoard {
    current: Option<Notice>,
    generation: u64,
    history: VecDeque<String>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shows `text` for `duration_ms` and returns the notice's generation.
    pub fn show(
        &mut self,
        text: impl Into<String>,
        duration_ms: u64,
        scheduler: &mut Scheduler<TimerAction>,
    ) -> u64 {
        let text = text.into();
        self.generation += 1;
        let generation = self.generation;

        tracing::info!(%text, generation, "notice shown");
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(text.clone());
        self.current = Some(Notice { text, generation });
        scheduler.schedule(duration_ms, TimerAction::HideNotice { generation });
        generation
    }

    /// Hides the notice if it is still the one with `generation`.
    pub fn hide(&mut self, generation: u64) -> bool {
        match &self.current {
            Some(notice) if notice.generation == generation => {
                self.current = None;
                true
            }
            _ => false,
        }
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_ref().map(|n| n.text.as_str())
    }

    /// The last [`HISTORY_LIMIT`] texts shown, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &str> {
        self.history.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn fire(board: &mut NoticeBoard, scheduler: &mut Scheduler<TimerAction>, ms: u64) {
        for action in scheduler.advance(Duration::from_millis(ms)) {
            if let TimerAction::HideNotice { generation } = action {
                board.hide(generation);
            }
        }
    }

    #[test]
    fn test_notice_hides_after_duration() {
        let mut board = NoticeBoard::new();
        let mut scheduler = Scheduler::new();
        board.show("Puzzle complete", 1500, &mut scheduler);
        assert_eq!(board.current(), Some("Puzzle complete"));

        fire(&mut board, &mut scheduler, 1499);
        assert_eq!(board.current(), Some("Puzzle complete"));
        fire(&mut board, &mut scheduler, 1);
        assert_eq!(board.current(), None);
    }

    #[test]
    fn test_stale_hide_does_not_clear_replacement() {
        let mut board = NoticeBoard::new();
        let mut scheduler = Scheduler::new();
        board.show("first", 1000, &mut scheduler);
        fire(&mut board, &mut scheduler, 800);
        board.show("second", 1000, &mut scheduler);

        // The first notice's hide falls due here but must not touch the second.
        fire(&mut board, &mut scheduler, 300);
        assert_eq!(board.current(), Some("second"));

        fire(&mut board, &mut scheduler, 700);
        assert_eq!(board.current(), None);
        assert_eq!(board.history().collect::<Vec<_>>(), ["first", "second"]);
    }

    #[test]
    fn test_history_keeps_latest() {
        let mut board = NoticeBoard::new();
        let mut scheduler = Scheduler::new();
        for i in 0..HISTORY_LIMIT + 5 {
            board.show(format!("notice {i}"), 1000, &mut scheduler);
        }

        let history: Vec<_> = board.history().collect();
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history[0], "notice 5");
        assert_eq!(history[HISTORY_LIMIT - 1], format!("notice {}", HISTORY_LIMIT + 4));
    }
}
