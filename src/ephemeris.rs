use crate::{
    constants::{GPS_PRN_SLOTS, GPS_WEEK_SECONDS},
    prelude::{Constellation, Epoch, SV},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Clock part of an [Ephemeris] frame, as decoded by the telemetry subsystem.
/// Orbital terms are none of our business: the [SolutionEngine](crate::prelude::SolutionEngine)
/// resolves them from its own store.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ephemeris {
    /// [SV]
    pub sv: SV,

    /// Time of Clock that must be expressed in correct timescale
    pub toc: Epoch,

    /// Healthy satellite
    pub healthy: bool,

    /// Clock polynomial terms: (bias (s), drift (s.s⁻¹), drift rate (s.s⁻²))
    pub clock_polynomials: (f64, f64, f64),

    /// Total group delay (s)
    pub tgd_s: f64,
}

impl Ephemeris {
    /// Satellite clock correction in seconds, at satellite time of week `tow_s`.
    /// The total group delay is compensated for.
    pub fn clock_correction_seconds(&self, tow_s: f64) -> f64 {
        let (_, toc_nanos) = self.toc.to_time_of_week();
        let dt_s = wrap_week_seconds(tow_s - toc_nanos as f64 / 1.0E9);
        let (a0, a1, a2) = self.clock_polynomials;
        a0 + a1 * dt_s + a2 * dt_s.powi(2) - self.tgd_s
    }

    /// Satellite clock drift (s.s⁻¹)
    pub fn clock_drift(&self) -> f64 {
        self.clock_polynomials.1
    }
}

/// Wraps a time of week difference into `[-half week, +half week)`,
/// so differences spanning a week rollover remain meaningful.
fn wrap_week_seconds(dt_s: f64) -> f64 {
    let half_week = GPS_WEEK_SECONDS / 2.0;
    (dt_s + half_week).rem_euclid(GPS_WEEK_SECONDS) - half_week
}

/// [EphemerisSource] provides [Ephemeris] data to the navigation loop
/// and to the solution engine.
pub trait EphemerisSource {
    /// Provide latest [Ephemeris] frame for requested [SV], if we have one.
    fn lookup(&self, sv: SV) -> Option<Ephemeris>;
}

/// [EphemerisTable] stores one [Ephemeris] per GPS PRN.
#[derive(Debug, Clone, Copy)]
pub struct EphemerisTable {
    inner: [Option<Ephemeris>; GPS_PRN_SLOTS],
}

impl Default for EphemerisTable {
    fn default() -> Self {
        Self {
            inner: [None; GPS_PRN_SLOTS],
        }
    }
}

impl EphemerisTable {
    fn slot(sv: SV) -> Option<usize> {
        if sv.constellation != Constellation::GPS {
            return None;
        }
        let prn = sv.prn as usize;
        if prn == 0 || prn > GPS_PRN_SLOTS {
            None
        } else {
            Some(prn - 1)
        }
    }

    /// Stores (or replaces) this [Ephemeris].
    /// Returns false if this [SV] cannot be stored.
    pub fn update(&mut self, eph: Ephemeris) -> bool {
        match Self::slot(eph.sv) {
            Some(slot) => {
                self.inner[slot] = Some(eph);
                true
            },
            None => false,
        }
    }

    /// Forgets [Ephemeris] of this [SV]
    pub fn invalidate(&mut self, sv: SV) {
        if let Some(slot) = Self::slot(sv) {
            self.inner[slot] = None;
        }
    }
}

impl EphemerisSource for EphemerisTable {
    fn lookup(&self, sv: SV) -> Option<Ephemeris> {
        Self::slot(sv).and_then(|slot| self.inner[slot])
    }
}
