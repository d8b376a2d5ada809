//! Fixed-rate tick scheduler for Hostrelay.
//!
//! Paces the snapshot broadcaster: every tick is one round of
//! `GameStateUpdate`s. A tick that fires late doesn't trigger a burst of
//! make-up ticks; the missed ones are counted and dropped, because a
//! client has no use for three stale snapshots in a row.
//!
//! ```ignore
//! let mut scheduler = TickScheduler::with_rate(64);
//! loop {
//!     tokio::select! {
//!         _ = shutdown.cancelled() => break,
//!         _ = scheduler.wait_for_tick() => {
//!             broadcast_snapshots().await;
//!             scheduler.record_tick_end();
//!         }
//!     }
//! }
//! ```

use std::time::{Duration, Instant};

use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

/// Weight of the newest sample in [`TickMetrics::avg_tick_time`].
const AVG_ALPHA: f64 = 0.1;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Ticks per second, clamped to `1..=MAX_TICK_RATE_HZ`.
    pub tick_rate_hz: u32,
    /// Fraction of the period a tick's work may use before a warning is
    /// logged.
    pub budget_warn_threshold: f64,
    /// Fraction of the period past which the tick is reported as over
    /// budget.
    pub budget_critical_threshold: f64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 64,
            budget_warn_threshold: 0.8,
            budget_critical_threshold: 1.0,
        }
    }
}

impl TickConfig {
    pub const MAX_TICK_RATE_HZ: u32 = 128;

    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self {
            tick_rate_hz,
            ..Self::default()
        }
    }

    /// Brings every field into range. [`TickScheduler::new`] calls this.
    pub fn validated(self) -> Self {
        let tick_rate_hz = self.tick_rate_hz.clamp(1, Self::MAX_TICK_RATE_HZ);
        if tick_rate_hz != self.tick_rate_hz {
            warn!(
                requested = self.tick_rate_hz,
                tick_rate_hz, "tick rate out of range, clamped"
            );
        }
        let critical = self.budget_critical_threshold.clamp(0.0, 1.0);
        let warn_at = self.budget_warn_threshold.clamp(0.0, 1.0).min(critical);
        Self {
            tick_rate_hz,
            budget_warn_threshold: warn_at,
            budget_critical_threshold: critical,
        }
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate_hz.max(1)))
    }
}

// ---------------------------------------------------------------------------
// Tick info and metrics
// ---------------------------------------------------------------------------

/// Returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// 1 for the first tick.
    pub tick: u64,
    pub dt: Duration,
    /// Fired more than a tenth of a period after its deadline.
    pub overrun: bool,
    /// Whole periods that went by without a tick.
    pub ticks_skipped: u64,
}

/// Running totals. Work times come from
/// [`TickScheduler::record_tick_end`].
#[derive(Debug, Clone, Default)]
pub struct TickMetrics {
    pub total_ticks: u64,
    pub total_overruns: u64,
    pub total_skipped: u64,
    pub avg_tick_time: Duration,
    pub max_tick_time: Duration,
    /// Work time of the last recorded tick over the period.
    pub budget_utilization: f64,
}

impl TickMetrics {
    fn record_work(&mut self, elapsed: Duration, period: Duration) {
        self.budget_utilization = elapsed.as_secs_f64() / period.as_secs_f64();
        self.max_tick_time = self.max_tick_time.max(elapsed);
        let avg = self.avg_tick_time.as_secs_f64() * (1.0 - AVG_ALPHA)
            + elapsed.as_secs_f64() * AVG_ALPHA;
        self.avg_tick_time = Duration::from_secs_f64(avg);
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fixed-period scheduler that skips, never catches up.
pub struct TickScheduler {
    config: TickConfig,
    period: Duration,
    tick_count: u64,
    deadline: TokioInstant,
    /// Wall-clock start of the tick in progress, if any.
    work_started: Option<Instant>,
    metrics: TickMetrics,
}

impl TickScheduler {
    /// The first tick is due one period from now.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let period = config.tick_duration();
        debug!(
            rate_hz = config.tick_rate_hz,
            period_us = period.as_micros() as u64,
            "tick scheduler created"
        );
        Self {
            config,
            period,
            tick_count: 0,
            deadline: TokioInstant::now() + period,
            work_started: None,
            metrics: TickMetrics::default(),
        }
    }

    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self::new(TickConfig::with_rate(tick_rate_hz))
    }

    /// Sleeps until the next deadline.
    ///
    /// Cancel-safe: nothing is updated until the sleep completes, so a
    /// `select!` that drops this future loses no tick.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        time::sleep_until(self.deadline).await;

        let now = TokioInstant::now();
        let late_by = now.saturating_duration_since(self.deadline);
        let overrun = late_by > self.period / 10;
        let ticks_skipped = if overrun {
            (late_by.as_nanos() / self.period.as_nanos()) as u64
        } else {
            0
        };

        self.tick_count += 1;
        self.work_started = Some(Instant::now());
        self.deadline = now + self.period;

        self.metrics.total_ticks += 1;
        if overrun {
            self.metrics.total_overruns += 1;
            self.metrics.total_skipped += ticks_skipped;
            if ticks_skipped > 0 {
                warn!(
                    tick = self.tick_count,
                    skipped = ticks_skipped,
                    late_us = late_by.as_micros() as u64,
                    "tick late, skipping missed ticks"
                );
            }
        }
        trace!(tick = self.tick_count, overrun, "tick");

        TickInfo {
            tick: self.tick_count,
            dt: self.period,
            overrun,
            ticks_skipped,
        }
    }

    /// Marks the current tick's work as done. Does nothing unless a tick
    /// is in progress.
    pub fn record_tick_end(&mut self) {
        let Some(started) = self.work_started.take() else {
            return;
        };
        let elapsed = started.elapsed();
        self.metrics.record_work(elapsed, self.period);

        let utilization = self.metrics.budget_utilization;
        if utilization >= self.config.budget_warn_threshold {
            let over = utilization >= self.config.budget_critical_threshold;
            warn!(
                tick = self.tick_count,
                elapsed_us = elapsed.as_micros() as u64,
                utilization_pct = (utilization * 100.0).round() as u64,
                over_budget = over,
                "tick work near or over budget"
            );
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }

    pub fn tick_rate_hz(&self) -> u32 {
        self.config.tick_rate_hz
    }

    pub fn tick_duration(&self) -> Duration {
        self.period
    }
}
