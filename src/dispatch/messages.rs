//! Outbound messages. Encoding them is up to each sink.
use crate::{
    constants::GSV_SATELLITES_PER_SENTENCE,
    prelude::{Epoch, Vector3, SV},
    solution::DilutionOfPrecision,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Header of an observation set
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ObservationHeader {
    /// Grid [Epoch] the observations were propagated to
    pub epoch: Epoch,
    /// Wrapping sequence counter
    pub sequence: u8,
    /// Number of observations in this set
    pub n_obs: u8,
}

/// Single satellite observation
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Observation {
    pub sv: SV,
    /// Pseudo range (m)
    pub pseudorange_m: f64,
    /// Carrier phase (cycles)
    pub carrier_phase_cycles: f64,
    /// Doppler (Hz)
    pub doppler_hz: f64,
    pub snr: f64,
    pub lock_count: u8,
    pub flags: u8,
    /// Index within the observation set
    pub index: u8,
}

/// [TelemetryMessage]s of the binary protocol
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TelemetryMessage {
    /// Solution time
    GpsTime { epoch: Epoch },
    /// Geodetic position: latitude (rad), longitude (rad), height (m)
    PositionLlh {
        epoch: Epoch,
        llh: (f64, f64, f64),
        n_sats: u8,
    },
    /// Velocity in local NED frame (m.s⁻¹)
    VelocityNed {
        epoch: Epoch,
        ned_m_s: Vector3<f64>,
        n_sats: u8,
    },
    /// Dilution of precision
    Dops {
        epoch: Epoch,
        dops: DilutionOfPrecision,
    },
    ObservationHeader(ObservationHeader),
    Observation(Observation),
}

/// Binary message identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TelemetryType {
    GpsTime,
    PositionLlh,
    VelocityNed,
    Dops,
    ObservationHeader,
    Observation,
}

impl TelemetryMessage {
    pub fn message_type(&self) -> TelemetryType {
        match self {
            Self::GpsTime { .. } => TelemetryType::GpsTime,
            Self::PositionLlh { .. } => TelemetryType::PositionLlh,
            Self::VelocityNed { .. } => TelemetryType::VelocityNed,
            Self::Dops { .. } => TelemetryType::Dops,
            Self::ObservationHeader(_) => TelemetryType::ObservationHeader,
            Self::Observation(_) => TelemetryType::Observation,
        }
    }
}

/// One GSV entry
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SatelliteInView {
    pub sv: SV,
    pub snr: f64,
}

/// [NmeaSentence]s
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NmeaSentence {
    /// Fix data
    Gga {
        epoch: Epoch,
        llh: (f64, f64, f64),
        n_sats: u8,
        hdop: f64,
    },
    /// Satellites in view, described over several sentences
    Gsv {
        /// Total number of sentences
        total: u8,
        /// Sentence number (1 based)
        number: u8,
        /// Total number of satellites in view
        sats_in_view: u8,
        satellites: [Option<SatelliteInView>; GSV_SATELLITES_PER_SENTENCE],
    },
}

/// NMEA sentence identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NmeaType {
    Gga,
    Gsv,
}

impl NmeaSentence {
    pub fn message_type(&self) -> NmeaType {
        match self {
            Self::Gga { .. } => NmeaType::Gga,
            Self::Gsv { .. } => NmeaType::Gsv,
        }
    }
}

impl std::fmt::Display for NmeaType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Gga => write!(f, "GPGGA"),
            Self::Gsv => write!(f, "GPGSV"),
        }
    }
}
