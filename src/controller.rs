//! Wake interval control
use log::{debug, warn};

use crate::{
    aligner::EpochAlignment,
    cfg::Config,
    prelude::{Duration, Epoch},
    scheduler::WakePeriod,
};

/// [WakeIntervalController] schedules the next wake up on the next grid epoch.
#[derive(Debug, Clone, Copy)]
pub struct WakeIntervalController {
    /// Nominal solution period
    solution_period: Duration,
    /// Wake interval upper bound
    max_interval: Duration,
    /// Timer clock (Hz)
    timer_clock_hz: f64,
}

impl WakeIntervalController {
    pub fn new(cfg: &Config) -> Self {
        Self {
            solution_period: cfg.solution_period(),
            max_interval: cfg.max_wake_interval,
            timer_clock_hz: cfg.timer_clock_hz,
        }
    }

    /// Time until next grid epoch, not clamped yet.
    pub fn interval(&self, alignment: &EpochAlignment, solution_epoch: Epoch) -> Duration {
        alignment.expected + self.solution_period - solution_epoch
    }

    /// [WakePeriod] that brings us to the next solution epoch.
    pub fn next_period(&self, alignment: &EpochAlignment, solution_epoch: Epoch) -> WakePeriod {
        let dt = self.interval(alignment, solution_epoch);

        if dt > self.max_interval || dt <= Duration::ZERO {
            warn!("wake interval {} out of range: clamped", dt);
        }

        let period = WakePeriod::from_interval(dt, self.max_interval, self.timer_clock_hz);
        debug!("next wake up in {} ({} ticks)", dt, period.ticks());
        period
    }

    /// [WakePeriod] deployed before the first solution
    pub fn initial_period(&self, cfg: &Config) -> WakePeriod {
        WakePeriod::from_interval(
            cfg.initial_wake_interval,
            self.max_interval,
            self.timer_clock_hz,
        )
    }
}
