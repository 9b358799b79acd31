//! Periodic execution of collection cycles.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::debug;

const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Fixed-cadence tick source.
///
/// Ticks fall at `start + k * interval`. When a cycle overruns, one missed
/// tick fires immediately and any others are dropped.
#[derive(Debug, Clone)]
pub struct Ticker {
    interval: Duration,
    next: Instant,
}

impl Ticker {
    pub fn new(start: Instant, interval: Duration) -> Self {
        Self {
            interval,
            next: start + interval,
        }
    }

    /// Returns the instant at which the next cycle should start, given that
    /// the previous one finished at `now`.
    pub fn advance(&mut self, now: Instant) -> Instant {
        let due = self.next;

        if due > now {
            self.next = due + self.interval;
            return due;
        }

        // Late: the pending tick fires now, later ticks re-align to the cadence.
        while self.next <= now {
            self.next += self.interval;
        }
        now
    }
}

/// Runs a cycle immediately and then on every tick until stopped.
pub struct Scheduler {
    interval: Duration,
    run_once: bool,
    shutdown: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(interval: Duration, run_once: bool) -> Self {
        Self {
            interval,
            run_once,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Uses `flag` as the shutdown signal; setting it stops the loop before
    /// the next cycle.
    pub fn with_shutdown(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = flag;
        self
    }

    fn stopping(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Runs `cycle` until shutdown, the first error, or after one cycle in
    /// run-once mode.
    pub fn run<E, F>(&self, mut cycle: F) -> Result<(), E>
    where
        F: FnMut() -> Result<(), E>,
    {
        let mut ticker = Ticker::new(Instant::now(), self.interval);
        let mut count: u64 = 0;

        loop {
            count += 1;
            debug!("starting cycle {}", count);
            cycle()?;

            if self.run_once {
                debug!("run-once mode, stopping after first cycle");
                return Ok(());
            }

            let deadline = ticker.advance(Instant::now());
            if !self.sleep_until(deadline) {
                debug!("shutdown requested after {} cycles", count);
                return Ok(());
            }
        }
    }

    /// Sleeps in short slices; returns false if shutdown was requested.
    fn sleep_until(&self, deadline: Instant) -> bool {
        loop {
            if self.stopping() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }
}
