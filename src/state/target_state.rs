//! Lifecycle states of a crawl target
//!
//! ```text
//! Queued -> InFlight -> Delivered
//!                    -> Skipped
//!                    -> Failed
//! ```
//!
//! A target dropped as a duplicate at dequeue time never leaves `Queued`.

use crate::SeekError;
use std::fmt;

/// Represents the current state of a target in the crawl process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetState {
    /// Waiting in the frontier
    Queued,

    /// Claimed by a worker; robots, rate gate and fetch in progress
    InFlight,

    /// Page emitted on the page stream
    Delivered,

    /// Excluded by robots.txt or URL filtering; no error reported
    Skipped,

    /// Fetch or parse failed; error emitted on the error stream
    Failed,
}

impl TargetState {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Skipped | Self::Failed)
    }

    /// Returns true if `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: TargetState) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::InFlight)
                | (Self::InFlight, Self::Delivered)
                | (Self::InFlight, Self::Skipped)
                | (Self::InFlight, Self::Failed)
        )
    }

    /// Moves to `next`, rejecting transitions the lifecycle does not allow
    pub fn transition(self, next: TargetState) -> Result<TargetState, SeekError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(SeekError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InFlight => "in_flight",
            Self::Delivered => "delivered",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
