//! Fixed-timestep tick scheduler for Orbarena rooms.
//!
//! Drives a room's simulation at a fixed rate (default 40 Hz) and marks
//! every `tick_rate_hz / broadcast_hz`-th tick as a broadcast tick. Budget
//! monitoring warns when a tick's work eats most of its time slice.
//!
//! # Overruns
//!
//! When the loop wakes up late, missed ticks are skipped and the next tick
//! is scheduled from *now*. A room that falls behind never bursts through
//! a backlog of ticks.
//!
//! # Integration
//!
//! The scheduler sits inside a room actor's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = mailbox.recv() => { /* join / input / leave */ }
//!         info = scheduler.wait_for_tick() => {
//!             orbarena_sim::step(&mut state, &inputs);
//!             if info.broadcast { /* fan out a snapshot */ }
//!             scheduler.record_tick_end();
//!         }
//!     }
//! }
//! ```

use std::time::{Duration, Instant};

use rand::Rng;
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Full configuration for the tick scheduler.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Simulation ticks per second. Default: 40.
    pub tick_rate_hz: u32,
    /// Broadcast ticks per second. Default: 20. The tick rate is kept an
    /// integer multiple of this.
    pub broadcast_hz: u32,
    /// Budget warning threshold (0.0–1.0). Default: 0.80 (80%).
    /// A tracing warning is emitted when tick execution exceeds this
    /// fraction of the tick budget.
    pub budget_warn_threshold: f64,
    /// Budget critical threshold (0.0–1.0). Default: 1.0 (100%).
    pub budget_critical_threshold: f64,
    /// Random jitter (0–max µs) added to the *first* tick to desynchronize
    /// rooms created at the same instant.
    pub initial_jitter_us: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 40,
            broadcast_hz: 20,
            budget_warn_threshold: 0.80,
            budget_critical_threshold: 1.0,
            initial_jitter_us: 2_000, // 0–2 ms default jitter
        }
    }
}

impl TickConfig {
    /// Maximum supported tick rate.
    pub const MAX_TICK_RATE_HZ: u32 = 128;

    /// Create a config for a specific tick and broadcast rate.
    pub fn with_rates(tick_rate_hz: u32, broadcast_hz: u32) -> Self {
        Self {
            tick_rate_hz,
            broadcast_hz,
            ..Default::default()
        }
    }

    /// Clamp and fix any out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`TickScheduler::new`]. Rules:
    /// - `tick_rate_hz` clamped to `1..=MAX_TICK_RATE_HZ`.
    /// - `broadcast_hz` clamped to `1..=tick_rate_hz`.
    /// - `tick_rate_hz` moved to the nearest multiple of `broadcast_hz`
    ///   that does not exceed the maximum.
    /// - Thresholds clamped to `0.0..=1.0`, warn ≤ critical.
    pub fn validated(mut self) -> Self {
        let requested = self.tick_rate_hz;
        self.tick_rate_hz = self.tick_rate_hz.clamp(1, Self::MAX_TICK_RATE_HZ);
        self.broadcast_hz = self.broadcast_hz.clamp(1, self.tick_rate_hz);

        let b = self.broadcast_hz;
        let mut every = ((self.tick_rate_hz + b / 2) / b).max(1);
        if b * every > Self::MAX_TICK_RATE_HZ {
            every = Self::MAX_TICK_RATE_HZ / b;
        }
        self.tick_rate_hz = b * every;

        if self.tick_rate_hz != requested {
            warn!(
                requested,
                tick_rate_hz = self.tick_rate_hz,
                broadcast_hz = self.broadcast_hz,
                "tick rate adjusted"
            );
        }

        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        self.budget_critical_threshold = self.budget_critical_threshold.clamp(0.0, 1.0);
        if self.budget_warn_threshold > self.budget_critical_threshold {
            self.budget_warn_threshold = self.budget_critical_threshold;
        }
        self
    }

    /// Duration of a single tick.
    ///
    /// Only meaningful on a validated config; a zero rate is treated as 1.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate_hz.max(1) as f64)
    }

    /// Number of ticks between broadcasts.
    pub fn broadcast_every(&self) -> u32 {
        (self.tick_rate_hz / self.broadcast_hz.max(1)).max(1)
    }
}

// ---------------------------------------------------------------------------
// Tick info (returned to caller each tick)
// ---------------------------------------------------------------------------

/// Information about a completed tick, returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Monotonically increasing tick number (starts at 1).
    pub tick: u64,
    /// Fixed delta time for this tick (always `1 / tick_rate`).
    pub dt: Duration,
    /// `true` on every `broadcast_every`-th tick.
    pub broadcast: bool,
    /// `true` if this tick fired late (scheduler detected overrun).
    pub overrun: bool,
    /// How many ticks were skipped due to overrun (0 in normal operation).
    pub ticks_skipped: u64,
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Runtime metrics for the tick scheduler.
///
/// All timing values refer to the work reported via
/// [`TickScheduler::record_tick_end`].
#[derive(Debug, Clone, Default)]
pub struct TickMetrics {
    /// Total ticks executed.
    pub total_ticks: u64,
    /// Total overruns detected.
    pub total_overruns: u64,
    /// Total ticks skipped after overruns.
    pub total_skipped: u64,
    /// Exponential moving average of tick execution time (α = 0.1).
    pub avg_tick_time: Duration,
    /// Maximum tick execution time observed.
    pub max_tick_time: Duration,
    /// Current budget utilization (0.0–∞). >1.0 means overrun.
    pub budget_utilization: f64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fixed-timestep tick scheduler.
///
/// One `TickScheduler` per room actor.
pub struct TickScheduler {
    config: TickConfig,
    tick_duration: Duration,
    broadcast_every: u64,
    tick_count: u64,
    /// When the next tick should fire (Tokio instant for `sleep_until`).
    next_tick: TokioInstant,
    /// Wall-clock instant when the last tick's work started.
    /// Set by `wait_for_tick`, consumed by `record_tick_end`.
    tick_start: Option<Instant>,
    metrics: TickMetrics,
}

impl TickScheduler {
    /// Create a new scheduler from config.
    ///
    /// The first tick is scheduled with optional jitter so rooms created
    /// together do not tick in lockstep.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let tick_duration = config.tick_duration();

        let jitter = if config.initial_jitter_us > 0 {
            let us = rand::rng().random_range(0..config.initial_jitter_us);
            Duration::from_micros(us)
        } else {
            Duration::ZERO
        };

        debug!(
            rate_hz = config.tick_rate_hz,
            broadcast_hz = config.broadcast_hz,
            budget_ms = tick_duration.as_secs_f64() * 1000.0,
            "tick scheduler created"
        );

        Self {
            broadcast_every: u64::from(config.broadcast_every()),
            config,
            tick_duration,
            tick_count: 0,
            next_tick: TokioInstant::now() + tick_duration + jitter,
            tick_start: None,
            metrics: TickMetrics::default(),
        }
    }

    /// Wait until the next tick is due. Returns [`TickInfo`] for the tick.
    ///
    /// Cancel-safe: dropping the future before it resolves (as
    /// `tokio::select!` does when another branch wins) leaves the schedule
    /// untouched.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let next = self.next_tick;
        let tick_dur = self.tick_duration;

        time::sleep_until(next).await;

        let now = TokioInstant::now();
        self.tick_count += 1;
        self.tick_start = Some(Instant::now());

        // >10% late counts as an overrun.
        let late_by = now.saturating_duration_since(next);
        let overrun = late_by > tick_dur / 10;
        let mut ticks_skipped = 0u64;

        if overrun {
            ticks_skipped = (late_by.as_nanos() / tick_dur.as_nanos()) as u64;
            if ticks_skipped > 0 {
                warn!(
                    tick = self.tick_count,
                    skipped = ticks_skipped,
                    late_ms = late_by.as_secs_f64() * 1000.0,
                    "tick overrun, skipping ahead"
                );
            }
            self.metrics.total_overruns += 1;
        }
        // Always schedule from now, not from the missed deadline.
        self.next_tick = now + tick_dur;

        self.metrics.total_skipped += ticks_skipped;
        self.metrics.total_ticks += 1;

        let broadcast = self.tick_count % self.broadcast_every == 0;
        trace!(tick = self.tick_count, overrun, broadcast, "tick fired");

        TickInfo {
            tick: self.tick_count,
            dt: tick_dur,
            broadcast,
            overrun,
            ticks_skipped,
        }
    }

    /// Record that the work for the current tick has finished.
    ///
    /// Enables budget warnings and execution-time metrics. A call without
    /// a preceding [`wait_for_tick`](Self::wait_for_tick) is a no-op.
    pub fn record_tick_end(&mut self) {
        let Some(start) = self.tick_start.take() else {
            return;
        };
        let elapsed = start.elapsed();
        let budget = self.tick_duration;

        let utilization = elapsed.as_secs_f64() / budget.as_secs_f64();
        self.metrics.budget_utilization = utilization;

        if utilization >= self.config.budget_critical_threshold {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                budget_ms = budget.as_secs_f64() * 1000.0,
                utilization_pct = format!("{:.1}", utilization * 100.0),
                "tick exceeded budget"
            );
        } else if utilization >= self.config.budget_warn_threshold {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                budget_ms = budget.as_secs_f64() * 1000.0,
                utilization_pct = format!("{:.1}", utilization * 100.0),
                "tick approaching budget limit"
            );
        }

        if elapsed > self.metrics.max_tick_time {
            self.metrics.max_tick_time = elapsed;
        }
        let alpha = 0.1;
        let prev = self.metrics.avg_tick_time.as_secs_f64();
        let curr = elapsed.as_secs_f64();
        self.metrics.avg_tick_time = Duration::from_secs_f64(prev * (1.0 - alpha) + curr * alpha);
    }

    /// Current tick count.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Snapshot of current metrics.
    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }

    /// The effective tick rate in Hz after validation.
    pub fn tick_rate_hz(&self) -> u32 {
        self.config.tick_rate_hz
    }

    /// The effective broadcast rate in Hz after validation.
    pub fn broadcast_hz(&self) -> u32 {
        self.config.broadcast_hz
    }

    /// The fixed tick duration.
    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }
}
