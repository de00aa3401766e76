//! Payment watch state machine.
//!
//! ```text
//!                      ┌──── NoReceipt / QueryError (attempt < max) ───┐
//!                      ▼                                               │
//!              AwaitingReceipt ────────────────────────────────────────┘
//!               │      │      │
//!        Valid  │      │      │ NoReceipt / QueryError (attempt == max)
//!               ▼      │      ▼
//!          Confirmed   │   TimedOut
//!                      ▼
//!               Failed (Invalid)
//! ```
//!
//! The machine is pure: it does not poll, sleep, or touch inventory. The task
//! in [`super::task`] feeds it one event per poll and acts on the result.

use crate::payment::Verdict;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchState {
    AwaitingReceipt,
    Confirmed,
    Failed(String),
    TimedOut,
}

impl WatchState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WatchState::AwaitingReceipt)
    }
}

/// What one poll observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    NoReceipt,
    Verdict(Verdict),
    QueryError(String),
}

impl From<Verdict> for WatchEvent {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::NotYetFinal => WatchEvent::NoReceipt,
            other => WatchEvent::Verdict(other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaymentWatch {
    state: WatchState,
    attempts: u32,
    max_attempts: u32,
}

impl PaymentWatch {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            state: WatchState::AwaitingReceipt,
            attempts: 0,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn state(&self) -> &WatchState {
        &self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Applies one poll result. Terminal states ignore further events.
    pub fn step(&mut self, event: WatchEvent) -> &WatchState {
        if self.state.is_terminal() {
            return &self.state;
        }
        self.attempts += 1;
        let exhausted = self.attempts >= self.max_attempts;

        self.state = match event {
            WatchEvent::Verdict(Verdict::Valid) => WatchState::Confirmed,
            WatchEvent::Verdict(Verdict::Invalid(reason)) => WatchState::Failed(reason),
            WatchEvent::Verdict(Verdict::NotYetFinal)
            | WatchEvent::NoReceipt
            | WatchEvent::QueryError(_) => {
                if exhausted {
                    WatchState::TimedOut
                } else {
                    WatchState::AwaitingReceipt
                }
            }
        };
        &self.state
    }
}
