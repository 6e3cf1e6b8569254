#![doc = include_str!("../README.md")]
#![cfg_attr(docrs, feature(doc_cfg))]

extern crate gnss_rs as gnss;

// private modules
mod aligner;
mod carrier;
mod cfg;
mod collector;
mod constants;
mod controller;
mod critical;
mod dispatch;
mod ephemeris;
mod measurement;
mod nav_loop;
mod scheduler;
mod solution;

#[cfg(test)]
mod tests;

// prelude
pub mod prelude {
    pub use crate::aligner::{
        navigation_measurements, repropagate, tdcp_doppler, EpochAlignment,
    };
    pub use crate::carrier::Carrier;
    pub use crate::cfg::Config;
    pub use crate::collector::{collect, TrackingChannels};
    pub use crate::constants::{MAX_CHANNELS, SPEED_OF_LIGHT_M_S};
    pub use crate::controller::WakeIntervalController;
    pub use crate::critical::{CriticalSection, InterruptMask, NoMask};
    pub use crate::dispatch::{
        Decimator, Dispatcher, NmeaSentence, NmeaSink, NmeaType, Observation, ObservationHeader,
        SatelliteInView, TelemetryMessage, TelemetrySink, TelemetryType,
    };
    pub use crate::ephemeris::{Ephemeris, EphemerisSource, EphemerisTable};
    pub use crate::measurement::{ChannelMeasurement, NavigationMeasurement, Snapshot};
    pub use crate::nav_loop::{CycleReport, LoopStatistics, NavigationLoop, Peripherals};
    pub use crate::scheduler::{HardwareTimer, TimerScheduler, WakePeriod, WakeSignal};
    pub use crate::solution::{
        DilutionOfPrecision, NavigationSolution, SolutionEngine, SolveError,
    };
    // re-export
    pub use gnss::prelude::{Constellation, SV};
    pub use hifitime::{Duration, Epoch, TimeScale};
    pub use nalgebra::Vector3;
}

// pub export
pub use cfg::Error;
pub use solution::SolveError;
