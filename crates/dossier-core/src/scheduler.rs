//! Clocks and the timer queue behind the processing engine.
//!
//! The engine never sleeps. It asks a [`Scheduler`] to deliver a timer after a
//! delay and returns; whoever drives the workflow pops due timers from the
//! [`TimerQueue`] and hands them back. Tests drive a [`ManualClock`] to
//! fast-forward virtual time, the runtime crate drives tokio time.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeZone, Utc};

/// Source of monotonic and wall-clock time.
pub trait Clock: Send + Sync {
    /// Monotonic time since the clock's origin.
    fn now(&self) -> Duration;

    /// Wall-clock time, used for result timestamps.
    fn timestamp(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Real time, measured from construction.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Virtual time that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle and give another
/// to the workflow.
#[derive(Debug, Clone)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
    epoch: DateTime<Utc>,
}

impl ManualClock {
    /// Start at zero with the wall clock pinned to 2025-01-01T00:00:00Z.
    pub fn new() -> Self {
        let epoch = Utc
            .with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);
        Self::with_epoch(epoch)
    }

    pub fn with_epoch(epoch: DateTime<Utc>) -> Self {
        Self {
            nanos: Arc::new(AtomicU64::new(0)),
            epoch,
        }
    }

    pub fn advance(&self, by: Duration) {
        self.nanos
            .fetch_add(saturating_nanos(by), Ordering::SeqCst);
    }

    pub fn set(&self, to: Duration) {
        self.nanos.store(saturating_nanos(to), Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }

    fn timestamp(&self) -> DateTime<Utc> {
        let offset =
            chrono::Duration::from_std(self.now()).unwrap_or_else(|_| chrono::Duration::zero());
        self.epoch + offset
    }
}

fn saturating_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

/// Handle for a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// Schedule and cancel delayed deliveries of `T`.
pub trait Scheduler<T> {
    fn now(&self) -> Duration;

    fn timestamp(&self) -> DateTime<Utc>;

    fn schedule(&mut self, delay: Duration, timer: T) -> TimerId;

    /// Cancel a pending timer. Returns false if it already fired or was cancelled.
    fn cancel(&mut self, id: TimerId) -> bool;
}

/// Deadline-ordered queue of pending timers.
///
/// Cancellation removes the entry immediately, so a cancelled timer can never
/// be popped afterwards. Timers with the same deadline pop in scheduling order.
pub struct TimerQueue<T> {
    clock: Arc<dyn Clock>,
    next_id: u64,
    pending: BTreeMap<(Duration, TimerId), T>,
    deadlines: BTreeMap<TimerId, Duration>,
}

impl<T> TimerQueue<T> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            next_id: 0,
            pending: BTreeMap::new(),
            deadlines: BTreeMap::new(),
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Pop the earliest timer whose deadline has passed.
    pub fn pop_due(&mut self) -> Option<(TimerId, T)> {
        let now = self.clock.now();
        let key = *self.pending.keys().next()?;
        if key.0 > now {
            return None;
        }
        let timer = self.pending.remove(&key)?;
        self.deadlines.remove(&key.1);
        Some((key.1, timer))
    }

    /// Deadline of the earliest pending timer.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.keys().next().map(|(deadline, _)| *deadline)
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.deadlines.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop every pending timer.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.deadlines.clear();
    }
}

impl<T> Scheduler<T> for TimerQueue<T> {
    fn now(&self) -> Duration {
        self.clock.now()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.clock.timestamp()
    }

    fn schedule(&mut self, delay: Duration, timer: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let deadline = self.clock.now().saturating_add(delay);
        self.pending.insert((deadline, id), timer);
        self.deadlines.insert(id, deadline);
        id
    }

    fn cancel(&mut self, id: TimerId) -> bool {
        match self.deadlines.remove(&id) {
            Some(deadline) => self.pending.remove(&(deadline, id)).is_some(),
            None => false,
        }
    }
}

impl<T> fmt::Debug for TimerQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerQueue")
            .field("now", &self.clock.now())
            .field("pending", &self.deadlines)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue() -> (ManualClock, TimerQueue<&'static str>) {
        let clock = ManualClock::new();
        let queue = TimerQueue::new(Arc::new(clock.clone()));
        (clock, queue)
    }

    #[test]
    fn test_pop_due_respects_deadlines() {
        let (clock, mut queue) = queue();
        queue.schedule(Duration::from_millis(20), "late");
        queue.schedule(Duration::from_millis(10), "early");

        assert!(queue.pop_due().is_none());
        assert_eq!(queue.next_deadline(), Some(Duration::from_millis(10)));

        clock.advance(Duration::from_millis(15));
        assert_eq!(queue.pop_due().map(|(_, t)| t), Some("early"));
        assert!(queue.pop_due().is_none());

        clock.advance(Duration::from_millis(5));
        assert_eq!(queue.pop_due().map(|(_, t)| t), Some("late"));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_same_deadline_pops_in_schedule_order() {
        let (clock, mut queue) = queue();
        queue.schedule(Duration::from_millis(5), "first");
        queue.schedule(Duration::from_millis(5), "second");
        clock.advance(Duration::from_millis(5));

        assert_eq!(queue.pop_due().map(|(_, t)| t), Some("first"));
        assert_eq!(queue.pop_due().map(|(_, t)| t), Some("second"));
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let (clock, mut queue) = queue();
        let id = queue.schedule(Duration::from_millis(1), "gone");
        assert!(queue.is_pending(id));
        assert!(queue.cancel(id));
        assert!(!queue.cancel(id));

        clock.advance(Duration::from_secs(60));
        assert!(queue.pop_due().is_none());
        assert!(!queue.is_pending(id));
    }

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new();
        let other = clock.clone();
        other.advance(Duration::from_secs(2));
        assert_eq!(clock.now(), Duration::from_secs(2));
        assert_eq!(
            clock.timestamp().to_rfc3339(),
            "2025-01-01T00:00:02+00:00"
        );
    }
}
