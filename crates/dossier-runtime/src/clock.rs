//! Workflow clock backed by tokio time.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use dossier_core::Clock;

/// [`Clock`] over `tokio::time::Instant`.
///
/// Follows tokio's paused time in tests. Wall-clock timestamps are the
/// construction time plus elapsed tokio time, so they advance with it.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: Instant,
    wall_origin: DateTime<Utc>,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            wall_origin: Utc::now(),
        }
    }

    /// The instant `now()` is measured from.
    pub fn origin(&self) -> Instant {
        self.origin
    }

    /// Tokio instant for a duration on this clock.
    pub fn instant_at(&self, offset: Duration) -> Instant {
        self.origin + offset
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        let offset =
            chrono::Duration::from_std(self.now()).unwrap_or_else(|_| chrono::Duration::zero());
        self.wall_origin + offset
    }
}
