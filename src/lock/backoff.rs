//! Randomized exponential backoff with bounded over-cap rounds.
//!
//! Each acquisition owns a fresh [`Backoff`]. Below the cap the delay grows
//! by a random factor in `[1, 2)` per attempt, which keeps many waiters on the
//! same lock from retrying in lockstep. Once the delay reaches the cap, the
//! schedule restarts from `restart_delay`; after `max_over_cap_retries` such
//! rounds the next request fails with [`SyncFileError::LockTimeout`].

use crate::config::LockConfig;
use crate::error::{Result, SyncFileError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};

fn as_millis_f64(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Per-acquisition retry schedule.
///
/// Deciding the next delay is separate from waiting it out, so the same
/// schedule drives both the blocking and the async acquisition loops.
#[derive(Debug)]
pub struct Backoff<R = StdRng> {
    current_ms: f64,
    restart_ms: f64,
    cap_ms: f64,
    max_over_cap_retries: u32,
    over_cap_rounds: u32,
    attempts: u32,
    started: Option<Instant>,
    rng: R,
}

impl Backoff<StdRng> {
    pub fn new(config: &LockConfig) -> Result<Self> {
        Self::with_rng(config, StdRng::from_entropy())
    }
}

impl<R: Rng> Backoff<R> {
    /// Fails with [`SyncFileError::InvalidConfig`] for a schedule that could
    /// never reach its cap.
    pub fn with_rng(config: &LockConfig, rng: R) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            current_ms: as_millis_f64(config.initial_delay),
            restart_ms: as_millis_f64(config.restart_delay),
            cap_ms: as_millis_f64(config.delay_cap),
            max_over_cap_retries: config.max_over_cap_retries,
            over_cap_rounds: 0,
            attempts: 0,
            started: None,
            rng,
        })
    }

    /// Delay to wait before the next claim attempt.
    ///
    /// The wall-clock start mark is taken on the first call; the timeout
    /// error reports the time elapsed since then.
    pub fn next_delay(&mut self) -> Result<Duration> {
        let started = *self.started.get_or_insert_with(Instant::now);
        let delay_ms = self.current_ms;

        if delay_ms < self.cap_ms {
            let growth: f64 = self.rng.gen();
            self.current_ms = delay_ms * (1.0 + growth);
        } else if self.over_cap_rounds < self.max_over_cap_retries {
            self.current_ms = self.restart_ms;
            self.over_cap_rounds += 1;
        } else {
            return Err(SyncFileError::lock_timeout(started.elapsed()));
        }

        self.attempts += 1;
        Ok(Duration::from_millis(delay_ms.floor() as u64))
    }

    /// Delay the next call would hand out, floored to whole milliseconds.
    pub fn current_delay(&self) -> Duration {
        Duration::from_millis(self.current_ms.floor() as u64)
    }

    /// Delays handed out so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn over_cap_rounds(&self) -> u32 {
        self.over_cap_rounds
    }

    /// Time since the first [`Backoff::next_delay`] call, zero before it.
    pub fn elapsed(&self) -> Duration {
        self.started.map(|s| s.elapsed()).unwrap_or_default()
    }
}
