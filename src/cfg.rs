use log::error;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::Deserialize;

use crate::prelude::{Carrier, Duration};

/// Configuration Error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("solution rate must be positive and finite (got {0} Hz)")]
    InvalidSolutionRate(f64),
    #[error("at least one satellite is required to attempt a solution")]
    InvalidMinimalSatellites,
    #[error("timer clock must be positive and finite (got {0} Hz)")]
    InvalidTimerClock(f64),
    #[error("sample rate must be positive and finite (got {0} Hz)")]
    InvalidSampleRate(f64),
    #[error("wake interval must be positive (got {0})")]
    InvalidWakeInterval(Duration),
    #[error("wake interval {0} does not fit the timer reload register")]
    WakeIntervalOverflow(Duration),
    #[error("alignment tolerance must be positive (got {0})")]
    InvalidAlignmentTolerance(Duration),
}

fn default_solution_rate() -> f64 {
    2.0
}

fn default_min_sv() -> usize {
    4
}

fn default_min_snr() -> f64 {
    2.0
}

fn default_dops_decimation() -> u32 {
    10
}

fn default_sat_view_decimation() -> u32 {
    10
}

fn default_max_wake_interval() -> Duration {
    Duration::from_seconds(2.0)
}

fn default_initial_wake_interval() -> Duration {
    Duration::from_seconds(1.0)
}

fn default_alignment_tolerance() -> Duration {
    Duration::from_milliseconds(10.0)
}

fn default_timer_clock() -> f64 {
    65_472_000.0
}

fn default_sample_rate() -> f64 {
    16_368_000.0
}

/// [Config] of the navigation loop.
/// This is fixed at setup time and never retuned while running.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct Config {
    /// Solution rate (Hz). Solutions and observations
    /// are aligned to a grid of this rate.
    #[cfg_attr(feature = "serde", serde(default = "default_solution_rate"))]
    pub solution_rate_hz: f64,
    /// Minimal number of usable channels to attempt a solution.
    #[cfg_attr(feature = "serde", serde(default = "default_min_sv"))]
    pub min_sv: usize,
    /// Channels must exhibit a SNR strictly above this value to contribute.
    #[cfg_attr(feature = "serde", serde(default = "default_min_snr"))]
    pub min_snr: f64,
    /// DOP messages are only sent every Nth solution.
    #[cfg_attr(feature = "serde", serde(default = "default_dops_decimation"))]
    pub dops_decimation: u32,
    /// Satellites in view (GSV) are only described every Nth solution.
    #[cfg_attr(feature = "serde", serde(default = "default_sat_view_decimation"))]
    pub sat_view_decimation: u32,
    /// Upper bound of the wake interval. Whatever the solution time,
    /// we will always wake up within this interval.
    #[cfg_attr(feature = "serde", serde(default = "default_max_wake_interval"))]
    pub max_wake_interval: Duration,
    /// Wake interval programmed at setup, before any solution exists.
    #[cfg_attr(feature = "serde", serde(default = "default_initial_wake_interval"))]
    pub initial_wake_interval: Duration,
    /// Observations propagated further than this are not published.
    #[cfg_attr(feature = "serde", serde(default = "default_alignment_tolerance"))]
    pub alignment_tolerance: Duration,
    /// Timer input clock (Hz), converts wake intervals to ticks.
    #[cfg_attr(feature = "serde", serde(default = "default_timer_clock"))]
    pub timer_clock_hz: f64,
    /// Sampling clock (Hz), converts channel sample counters to seconds.
    #[cfg_attr(feature = "serde", serde(default = "default_sample_rate"))]
    pub sample_rate_hz: f64,
    /// Tracked [Carrier]
    #[cfg_attr(feature = "serde", serde(default))]
    pub carrier: Carrier,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            solution_rate_hz: default_solution_rate(),
            min_sv: default_min_sv(),
            min_snr: default_min_snr(),
            dops_decimation: default_dops_decimation(),
            sat_view_decimation: default_sat_view_decimation(),
            max_wake_interval: default_max_wake_interval(),
            initial_wake_interval: default_initial_wake_interval(),
            alignment_tolerance: default_alignment_tolerance(),
            timer_clock_hz: default_timer_clock(),
            sample_rate_hz: default_sample_rate(),
            carrier: Carrier::default(),
        }
    }
}

impl Config {
    /// Nominal solution period
    pub fn solution_period(&self) -> Duration {
        Duration::from_seconds(1.0 / self.solution_rate_hz)
    }

    /// Verifies this [Config] makes sense before deploying it.
    pub fn validate(&self) -> Result<(), Error> {
        let positive = |x: f64| x.is_finite() && x > 0.0;

        if !positive(self.solution_rate_hz) {
            error!("invalid solution rate: {}", self.solution_rate_hz);
            return Err(Error::InvalidSolutionRate(self.solution_rate_hz));
        }
        if self.min_sv == 0 {
            return Err(Error::InvalidMinimalSatellites);
        }
        if !positive(self.timer_clock_hz) {
            return Err(Error::InvalidTimerClock(self.timer_clock_hz));
        }
        if !positive(self.sample_rate_hz) {
            return Err(Error::InvalidSampleRate(self.sample_rate_hz));
        }
        if self.alignment_tolerance <= Duration::ZERO {
            return Err(Error::InvalidAlignmentTolerance(self.alignment_tolerance));
        }

        for interval in [self.max_wake_interval, self.initial_wake_interval] {
            if interval <= Duration::ZERO {
                error!("invalid wake interval: {}", interval);
                return Err(Error::InvalidWakeInterval(interval));
            }
            let ticks = (interval.to_seconds() * self.timer_clock_hz).round();
            if ticks < 1.0 || ticks > u32::MAX as f64 {
                error!("wake interval {} cannot be programmed", interval);
                return Err(Error::WakeIntervalOverflow(interval));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{Config, Error};
    use crate::prelude::Duration;

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.solution_period(), Duration::from_milliseconds(500.0));
    }

    #[test]
    fn invalid_configs() {
        let mut cfg = Config::default();
        cfg.solution_rate_hz = 0.0;
        assert_eq!(cfg.validate(), Err(Error::InvalidSolutionRate(0.0)));

        let mut cfg = Config::default();
        cfg.min_sv = 0;
        assert_eq!(cfg.validate(), Err(Error::InvalidMinimalSatellites));

        let mut cfg = Config::default();
        cfg.max_wake_interval = Duration::ZERO;
        assert_eq!(
            cfg.validate(),
            Err(Error::InvalidWakeInterval(Duration::ZERO))
        );

        let mut cfg = Config::default();
        cfg.max_wake_interval = Duration::from_seconds(3600.0);
        assert!(matches!(
            cfg.validate(),
            Err(Error::WakeIntervalOverflow(_))
        ));

        let mut cfg = Config::default();
        cfg.sample_rate_hz = f64::NAN;
        assert!(matches!(cfg.validate(), Err(Error::InvalidSampleRate(_))));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn config_from_json() {
        let cfg: Config = serde_json::from_str(
            r#"{
                "solution_rate_hz": 5.0,
                "min_sv": 5,
                "dops_decimation": 2
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.solution_rate_hz, 5.0);
        assert_eq!(cfg.min_sv, 5);
        assert_eq!(cfg.dops_decimation, 2);
        assert_eq!(cfg.sat_view_decimation, 10);
        assert_eq!(cfg.alignment_tolerance, Duration::from_milliseconds(10.0));
    }
}
