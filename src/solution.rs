//! Navigation solutions and the solution engine contract
use thiserror::Error;

use crate::{
    ephemeris::EphemerisSource,
    measurement::NavigationMeasurement,
    prelude::{Epoch, Vector3},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Reasons why the [SolutionEngine] could not resolve.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    #[error("not enough measurements provided ({0})")]
    NotEnoughMeasurements(usize),
    #[error("insufficient geometry")]
    InsufficientGeometry,
    #[error("solution did not converge")]
    Divergence,
    #[error("failed to invert matrix")]
    MatrixInversion,
    #[error("resolved time is invalid")]
    InvalidTime,
    #[error("solver error: {0}")]
    Other(String),
}

/// Dilution of precision attached to each [NavigationSolution]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DilutionOfPrecision {
    /// Geometric DOP
    pub gdop: f64,
    /// Position DOP
    pub pdop: f64,
    /// Horizontal DOP
    pub hdop: f64,
    /// Vertical DOP
    pub vdop: f64,
    /// Temporal DOP
    pub tdop: f64,
}

/// P.V.T [NavigationSolution]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NavigationSolution {
    /// Solution [Epoch]
    pub epoch: Epoch,
    /// Position in ECEF (m)
    pub position_ecef_m: Vector3<f64>,
    /// Latitude (rad), longitude (rad) and height above ellipsoid (m)
    pub position_llh: (f64, f64, f64),
    /// Velocity in local North East Down frame (m.s⁻¹)
    pub velocity_ned_m_s: Vector3<f64>,
    /// Receiver clock offset (s)
    pub clock_offset_s: f64,
    /// Number of satellites that contributed
    pub n_used: usize,
}

/// [SolutionEngine] resolves [NavigationSolution]s from a set of
/// time aligned [NavigationMeasurement]s.
pub trait SolutionEngine {
    /// [NavigationSolution] resolution attempt.
    /// ## Inputs
    /// - measurements: time aligned [NavigationMeasurement]s
    /// - ephemerides: [EphemerisSource] indexed by satellite
    fn solve(
        &mut self,
        measurements: &[NavigationMeasurement],
        ephemerides: &dyn EphemerisSource,
    ) -> Result<(NavigationSolution, DilutionOfPrecision), SolveError>;
}
