//! Time alignment of measurements to the solution grid
use log::debug;

use crate::{
    constants::SPEED_OF_LIGHT_M_S,
    ephemeris::EphemerisSource,
    measurement::{ChannelMeasurement, NavigationMeasurement, Snapshot},
    prelude::{Duration, Epoch},
};

/// [EpochAlignment] of a solution with respect to the fixed rate solution grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochAlignment {
    /// Nearest grid [Epoch]
    pub expected: Epoch,
    /// expected - solution time
    pub t_err: Duration,
}

impl EpochAlignment {
    /// Aligns `epoch` to the nearest instant of the `rate_hz` grid.
    /// The grid is defined within the GPS week, in the timescale of `epoch`.
    pub fn new(epoch: Epoch, rate_hz: f64) -> Self {
        let (week, nanos) = epoch.to_time_of_week();
        let tow_s = nanos as f64 / 1.0E9;

        let expected_tow_s = (tow_s * rate_hz).round() / rate_hz;
        let expected_nanos = (expected_tow_s * 1.0E9).round() as u64;

        let expected = Epoch::from_time_of_week(week, expected_nanos, epoch.time_scale);

        Self {
            expected,
            t_err: expected - epoch,
        }
    }

    /// Alignment error in seconds
    pub fn t_err_seconds(&self) -> f64 {
        self.t_err.to_seconds()
    }

    /// True if measurements may be propagated onto the grid
    /// without exceeding `tolerance`.
    pub fn within(&self, tolerance: Duration) -> bool {
        self.t_err.abs() < tolerance
    }
}

/// Forms [NavigationMeasurement]s from raw [ChannelMeasurement]s.
/// Satellites for which we have no healthy ephemeris are dropped.
/// Returns the number of formed measurements.
pub fn navigation_measurements(
    channels: &Snapshot<ChannelMeasurement>,
    ephemerides: &dyn EphemerisSource,
    sample_rate_hz: f64,
    carrier_frequency_hz: f64,
    output: &mut Snapshot<NavigationMeasurement>,
) -> usize {
    output.clear();

    for meas in channels {
        let eph = match ephemerides.lookup(meas.sv) {
            Some(eph) if eph.healthy => eph,
            Some(_) => {
                debug!("{} unhealthy: dropped", meas.sv);
                continue;
            },
            None => {
                debug!("{} no ephemeris: dropped", meas.sv);
                continue;
            },
        };

        let clock_correction_s = eph.clock_correction_seconds(meas.tow_s);
        let raw_doppler_hz = meas.doppler_hz + eph.clock_drift() * carrier_frequency_hz;

        output.push(NavigationMeasurement {
            sv: meas.sv,
            snr: meas.snr,
            raw_pseudorange_m: meas.pseudorange_m,
            pseudorange_m: meas.pseudorange_m + SPEED_OF_LIGHT_M_S * clock_correction_s,
            carrier_phase_cycles: meas.carrier_phase_cycles,
            raw_doppler_hz,
            doppler_hz: raw_doppler_hz,
            receiver_time_s: meas.sample_count as f64 / sample_rate_hz,
            clock_correction_s,
            tdcp: false,
        });
    }

    output.len()
}

/// Estimates Doppler shifts by differencing carrier phase against the
/// previous cycle. Satellites that were not observed previously
/// keep their instantaneous Doppler.
/// Returns the number of satellites that have a TDCP Doppler.
pub fn tdcp_doppler(
    current: &Snapshot<NavigationMeasurement>,
    previous: &Snapshot<NavigationMeasurement>,
    output: &mut Snapshot<NavigationMeasurement>,
) -> usize {
    output.clear();
    let mut n_tdcp = 0;

    for meas in current {
        let mut meas = *meas;
        meas.doppler_hz = meas.raw_doppler_hz;
        meas.tdcp = false;

        if let Some(prev) = previous.find(meas.sv) {
            let dt = meas.receiver_time_s - prev.receiver_time_s;
            if dt.is_finite() && dt > 0.0 {
                meas.doppler_hz = (meas.carrier_phase_cycles - prev.carrier_phase_cycles) / dt;
                meas.tdcp = true;
                n_tdcp += 1;
            } else {
                debug!("{} invalid tdcp interval {}s", meas.sv, dt);
            }
        }

        output.push(meas);
    }

    n_tdcp
}

/// Propagates measurements by `t_err_s` using their Doppler.
/// `wavelength_m` converts Doppler to range rate.
pub fn repropagate(measurements: &mut [NavigationMeasurement], t_err_s: f64, wavelength_m: f64) {
    for meas in measurements.iter_mut() {
        meas.pseudorange_m -= t_err_s * meas.doppler_hz * wavelength_m;
        meas.carrier_phase_cycles += t_err_s * meas.doppler_hz;
    }
}
