// src/pipeline/scheduler.rs

//! Sweep scheduling.
//!
//! The loop alternates between a full sweep and a jittered sleep. Heartbeats
//! are checked while sleeping, so there is never more than one thing running.
//! An interrupt is honored between sweeps and during the sleep; a sweep in
//! progress is allowed to finish.

use std::future::Future;
use std::time::Duration;

use futures::FutureExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::Instant;

use crate::engine::Engine;
use crate::error::Result;
use crate::models::{MAX_INTERVAL_SECS, ScheduleConfig};

/// `now + wait`, clamped to the longest supported interval.
fn deadline(now: Instant, wait: Duration) -> Instant {
    now + wait.min(Duration::from_secs(MAX_INTERVAL_SECS))
}

/// Randomized sleep between sweeps, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jitter {
    pub base: u64,
    pub variance: u64,
    pub floor: u64,
}

impl Jitter {
    pub fn new(base: u64, variance: u64, floor: u64) -> Self {
        Self {
            base,
            variance,
            floor,
        }
    }

    pub fn from_config(schedule: &ScheduleConfig) -> Self {
        Self::new(
            schedule.request_rate_secs,
            schedule.variance_secs,
            schedule.min_rate_secs,
        )
    }

    /// Inclusive range a sample falls into.
    pub fn bounds(&self) -> (u64, u64) {
        let lo = self.base.saturating_sub(self.variance).max(self.floor);
        let hi = self.base.saturating_add(self.variance).max(self.floor);
        (lo, hi)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let (lo, hi) = self.bounds();
        Duration::from_secs(rng.gen_range(lo..=hi))
    }
}

/// Next-sweep and next-heartbeat deadlines.
#[derive(Debug, Clone)]
pub struct Ticker {
    next_sweep: Instant,
    heartbeat: Option<(Duration, Instant)>,
}

impl Ticker {
    /// First sweep is due immediately; first heartbeat one period from now.
    pub fn new(now: Instant, heartbeat_period: Option<Duration>) -> Self {
        Self {
            next_sweep: now,
            heartbeat: heartbeat_period.map(|period| (period, deadline(now, period))),
        }
    }

    pub fn schedule_sweep(&mut self, now: Instant, wait: Duration) {
        self.next_sweep = deadline(now, wait);
    }

    pub fn until_sweep(&self, now: Instant) -> Duration {
        self.next_sweep.saturating_duration_since(now)
    }

    /// Time left before the next heartbeat, if heartbeats are enabled.
    pub fn until_heartbeat(&self, now: Instant) -> Option<Duration> {
        self.heartbeat
            .map(|(_, due)| due.saturating_duration_since(now))
    }

    pub fn heartbeat_due(&self, now: Instant) -> bool {
        matches!(self.heartbeat, Some((_, due)) if now >= due)
    }

    pub fn mark_heartbeat(&mut self, now: Instant) {
        if let Some((period, due)) = self.heartbeat.as_mut() {
            *due = deadline(now, *period);
        }
    }
}

/// Why the loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Shutdown requested
    Interrupted,
    /// Configured number of sweeps done
    Completed { sweeps: u64 },
}

/// Drives an [`Engine`] until interrupted or out of sweeps.
pub struct Scheduler {
    jitter: Jitter,
    heartbeat_period: Option<Duration>,
    max_sweeps: u64,
    startup_message: bool,
    rng: StdRng,
}

impl Scheduler {
    pub fn new(schedule: &ScheduleConfig) -> Self {
        Self {
            jitter: Jitter::from_config(schedule),
            heartbeat_period: schedule.heartbeat_period(),
            max_sweeps: schedule.max_sweeps,
            startup_message: false,
            rng: StdRng::from_entropy(),
        }
    }

    /// Use a fixed seed for reproducible sleeps.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Send "Starting up!" before the first sweep.
    pub fn with_startup_message(mut self, enabled: bool) -> Self {
        self.startup_message = enabled;
        self
    }

    /// Run sweeps until `shutdown` resolves or `max_sweeps` is reached.
    ///
    /// Only a fatal sweep error (snapshot persistence) is returned as `Err`.
    pub async fn run<F>(&mut self, engine: &mut Engine, shutdown: F) -> Result<StopReason>
    where
        F: Future<Output = ()>,
    {
        let mut shutdown = std::pin::pin!(shutdown);

        if self.startup_message {
            tokio::select! {
                biased;
                _ = shutdown.as_mut() => {
                    log::info!("Shutdown requested during startup");
                    return Ok(StopReason::Interrupted);
                }
                _ = engine.announce("Starting up!") => {}
            }
        }

        let mut ticker = Ticker::new(Instant::now(), self.heartbeat_period);

        loop {
            if shutdown.as_mut().now_or_never().is_some() {
                log::info!("Shutdown requested");
                return Ok(StopReason::Interrupted);
            }

            engine.sweep().await?;

            let sweeps = engine.sweep_count();
            if self.max_sweeps > 0 && sweeps >= self.max_sweeps {
                log::info!("Completed {sweeps} sweeps");
                return Ok(StopReason::Completed { sweeps });
            }

            let wait = self.jitter.sample(&mut self.rng);
            log::info!("Sleeping for {} seconds", wait.as_secs());
            ticker.schedule_sweep(Instant::now(), wait);

            loop {
                let now = Instant::now();
                if ticker.heartbeat_due(now) {
                    engine.heartbeat().await;
                    ticker.mark_heartbeat(now);
                }

                let until_sweep = ticker.until_sweep(now);
                if until_sweep.is_zero() {
                    break;
                }
                let nap = ticker
                    .until_heartbeat(now)
                    .map_or(until_sweep, |h| h.min(until_sweep));

                tokio::select! {
                    biased;
                    _ = shutdown.as_mut() => {
                        log::info!("Shutdown requested while sleeping");
                        return Ok(StopReason::Interrupted);
                    }
                    _ = tokio::time::sleep(nap) => {}
                }
            }
        }
    }
}
