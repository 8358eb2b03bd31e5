//! Progress bookkeeping for a running job.

use std::time::{Duration, Instant};

use crate::notify::Progress;

/// Lets an event through at most once per interval. The first event always passes.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn ready(&mut self) -> bool {
        self.ready_at(Instant::now())
    }

    pub fn ready_at(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// Counts settled frames and decides when to report them.
#[derive(Debug)]
pub struct ProgressTracker {
    total: usize,
    done: usize,
    started: Instant,
    progress: Throttle,
    messages: Throttle,
}

impl ProgressTracker {
    pub fn new(total: usize, progress_interval: Duration, message_interval: Duration) -> Self {
        Self {
            total,
            done: 0,
            started: Instant::now(),
            progress: Throttle::new(progress_interval),
            messages: Throttle::new(message_interval),
        }
    }

    /// Count one more settled frame.
    pub fn record_done(&mut self) {
        self.done += 1;
    }

    pub fn done(&self) -> usize {
        self.done
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn snapshot(&self) -> Progress {
        Progress::estimate(
            self.done,
            self.total,
            self.started.elapsed().as_millis() as u64,
        )
    }

    pub fn progress_due(&mut self) -> bool {
        self.progress.ready()
    }

    pub fn message_due(&mut self) -> bool {
        self.messages.ready()
    }
}
