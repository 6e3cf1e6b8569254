//! Output dispatch
use log::trace;

use crate::{
    constants::{GSV_SATELLITES_PER_SENTENCE, OBSERVATION_LOCK_COUNT},
    measurement::NavigationMeasurement,
    prelude::Epoch,
    solution::{DilutionOfPrecision, NavigationSolution},
};

mod messages;

pub use messages::{
    NmeaSentence, NmeaType, Observation, ObservationHeader, SatelliteInView, TelemetryMessage,
    TelemetryType,
};

/// Binary telemetry output. Fire and forget: transport failures are not reported.
pub trait TelemetrySink {
    fn send(&mut self, message: TelemetryMessage);
}

/// NMEA output. Fire and forget: transport failures are not reported.
pub trait NmeaSink {
    fn send(&mut self, sentence: NmeaSentence);
}

/// [Decimator] lets one event out of `factor` through,
/// starting with the very first one.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decimator {
    factor: u32,
    count: u32,
}

impl Decimator {
    pub fn new(factor: u32) -> Self {
        Self { factor, count: 0 }
    }

    /// Counts one event, returns true if it should go through.
    pub fn tick(&mut self) -> bool {
        if self.factor <= 1 {
            return true;
        }
        let pass = self.count == 0;
        self.count = (self.count + 1) % self.factor;
        pass
    }
}

fn saturating_u8(n: usize) -> u8 {
    u8::try_from(n).unwrap_or(u8::MAX)
}

/// [Dispatcher] forwards solutions and observations to both sinks.
pub struct Dispatcher {
    telemetry: Box<dyn TelemetrySink + Send>,
    nmea: Box<dyn NmeaSink + Send>,
    dops: Decimator,
    sat_view: Decimator,
    obs_sequence: u8,
}

impl Dispatcher {
    pub fn new(
        telemetry: Box<dyn TelemetrySink + Send>,
        nmea: Box<dyn NmeaSink + Send>,
        dops_decimation: u32,
        sat_view_decimation: u32,
    ) -> Self {
        Self {
            telemetry,
            nmea,
            obs_sequence: 0,
            dops: Decimator::new(dops_decimation),
            sat_view: Decimator::new(sat_view_decimation),
        }
    }

    /// Publishes observations propagated to grid [Epoch]:
    /// one header followed by one message per satellite.
    pub fn send_observations(&mut self, epoch: Epoch, measurements: &[NavigationMeasurement]) {
        let header = ObservationHeader {
            epoch,
            sequence: self.obs_sequence,
            n_obs: saturating_u8(measurements.len()),
        };

        self.obs_sequence = self.obs_sequence.wrapping_add(1);
        self.telemetry
            .send(TelemetryMessage::ObservationHeader(header));

        for (index, meas) in measurements.iter().enumerate() {
            self.telemetry
                .send(TelemetryMessage::Observation(Observation {
                    sv: meas.sv,
                    pseudorange_m: meas.pseudorange_m,
                    carrier_phase_cycles: meas.carrier_phase_cycles,
                    doppler_hz: meas.doppler_hz,
                    snr: meas.snr,
                    lock_count: OBSERVATION_LOCK_COUNT,
                    flags: 0,
                    index: saturating_u8(index),
                }));
        }

        trace!("{} - published {} observations", epoch, measurements.len());
    }

    /// Publishes the [NavigationSolution] on the binary telemetry:
    /// time, position, velocity then (decimated) DOPs.
    pub fn send_solution(&mut self, solution: &NavigationSolution, dops: &DilutionOfPrecision) {
        let epoch = solution.epoch;
        let n_sats = saturating_u8(solution.n_used);

        self.telemetry.send(TelemetryMessage::GpsTime { epoch });

        self.telemetry.send(TelemetryMessage::PositionLlh {
            epoch,
            llh: solution.position_llh,
            n_sats,
        });

        self.telemetry.send(TelemetryMessage::VelocityNed {
            epoch,
            ned_m_s: solution.velocity_ned_m_s,
            n_sats,
        });

        if self.dops.tick() {
            self.telemetry
                .send(TelemetryMessage::Dops { epoch, dops: *dops });
        }
    }

    /// Publishes the [NavigationSolution] as NMEA:
    /// fix data, then (decimated) satellites in view.
    pub fn send_nmea(
        &mut self,
        solution: &NavigationSolution,
        dops: &DilutionOfPrecision,
        measurements: &[NavigationMeasurement],
    ) {
        self.nmea.send(NmeaSentence::Gga {
            epoch: solution.epoch,
            llh: solution.position_llh,
            n_sats: saturating_u8(solution.n_used),
            hdop: dops.hdop,
        });

        if !self.sat_view.tick() {
            return;
        }

        let sats_in_view = saturating_u8(measurements.len());
        let total = saturating_u8(measurements.len().div_ceil(GSV_SATELLITES_PER_SENTENCE));

        for (number, chunk) in measurements
            .chunks(GSV_SATELLITES_PER_SENTENCE)
            .enumerate()
        {
            let mut satellites = [None; GSV_SATELLITES_PER_SENTENCE];
            for (slot, meas) in satellites.iter_mut().zip(chunk) {
                *slot = Some(SatelliteInView {
                    sv: meas.sv,
                    snr: meas.snr,
                });
            }

            self.nmea.send(NmeaSentence::Gsv {
                total,
                number: saturating_u8(number + 1),
                sats_in_view,
                satellites,
            });
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Decimator, Dispatcher, NmeaSentence, NmeaType, TelemetryMessage, TelemetryType};
    use crate::{
        constants::OBSERVATION_LOCK_COUNT,
        measurement::NavigationMeasurement,
        prelude::{Constellation, Epoch, TimeScale, SV},
        solution::{DilutionOfPrecision, NavigationSolution},
        tests::{init_logger, mocks::TestSinks},
    };

    use rstest::*;

    fn measurements(n: u8) -> Vec<NavigationMeasurement> {
        (1..=n)
            .map(|prn| NavigationMeasurement {
                sv: SV::new(Constellation::GPS, prn),
                pseudorange_m: 20_000_000.0 + prn as f64,
                snr: 40.0,
                ..Default::default()
            })
            .collect()
    }

    fn solution() -> NavigationSolution {
        NavigationSolution {
            epoch: Epoch::from_time_of_week(2100, 1_000_000_000_000, TimeScale::GPST),
            n_used: 6,
            ..Default::default()
        }
    }

    #[rstest]
    #[case(1, 25, 25)]
    #[case(0, 25, 25)]
    #[case(10, 1, 1)]
    #[case(10, 10, 1)]
    #[case(10, 11, 2)]
    #[case(10, 100, 10)]
    #[case(3, 10, 4)]
    fn decimation(#[case] factor: u32, #[case] events: usize, #[case] expected: usize) {
        let mut decimator = Decimator::new(factor);
        let passed = (0..events).filter(|_| decimator.tick()).count();
        assert_eq!(passed, expected);

        if factor > 1 {
            let floor = events / factor as usize;
            assert!(passed >= floor && passed <= floor + 1);
        }
    }

    #[test]
    fn solution_message_order() {
        init_logger();

        let sinks = TestSinks::default();
        let (telemetry, nmea) = sinks.boxed();
        let mut dispatcher = Dispatcher::new(telemetry, nmea, 10, 10);

        let dops = DilutionOfPrecision {
            hdop: 1.2,
            ..Default::default()
        };

        dispatcher.send_solution(&solution(), &dops);
        dispatcher.send_solution(&solution(), &dops);

        assert_eq!(
            sinks.telemetry_types(),
            vec![
                TelemetryType::GpsTime,
                TelemetryType::PositionLlh,
                TelemetryType::VelocityNed,
                TelemetryType::Dops,
                TelemetryType::GpsTime,
                TelemetryType::PositionLlh,
                TelemetryType::VelocityNed,
            ]
        );
    }

    #[test]
    fn observations() {
        init_logger();

        let sinks = TestSinks::default();
        let (telemetry, nmea) = sinks.boxed();
        let mut dispatcher = Dispatcher::new(telemetry, nmea, 10, 10);

        let epoch = solution().epoch;
        let meas = measurements(4);

        dispatcher.send_observations(epoch, &meas);

        let messages = sinks.telemetry();
        assert_eq!(messages.len(), 5);

        match messages[0] {
            TelemetryMessage::ObservationHeader(header) => {
                assert_eq!(header.epoch, epoch);
                assert_eq!(header.sequence, 0);
                assert_eq!(header.n_obs, 4);
            },
            other => panic!("expecting observation header, got {:?}", other),
        }

        for (i, message) in messages[1..].iter().enumerate() {
            match message {
                TelemetryMessage::Observation(obs) => {
                    assert_eq!(obs.index as usize, i);
                    assert_eq!(obs.sv, meas[i].sv);
                    assert_eq!(obs.pseudorange_m, meas[i].pseudorange_m);
                    assert_eq!(obs.lock_count, OBSERVATION_LOCK_COUNT);
                },
                other => panic!("expecting observation, got {:?}", other),
            }
        }
    }

    #[test]
    fn observation_sequence_wraps() {
        let sinks = TestSinks::default();
        let (telemetry, nmea) = sinks.boxed();
        let mut dispatcher = Dispatcher::new(telemetry, nmea, 10, 10);

        let epoch = solution().epoch;
        for _ in 0..257 {
            dispatcher.send_observations(epoch, &[]);
        }

        let sequences = sinks
            .telemetry()
            .iter()
            .filter_map(|msg| match msg {
                TelemetryMessage::ObservationHeader(header) => Some(header.sequence),
                _ => None,
            })
            .collect::<Vec<_>>();

        assert_eq!(sequences.len(), 257);
        assert_eq!(sequences[255], 255);
        assert_eq!(sequences[256], 0);
    }

    #[test]
    fn satellites_in_view() {
        init_logger();

        let sinks = TestSinks::default();
        let (telemetry, nmea) = sinks.boxed();
        let mut dispatcher = Dispatcher::new(telemetry, nmea, 10, 10);

        let meas = measurements(6);
        dispatcher.send_nmea(&solution(), &DilutionOfPrecision::default(), &meas);
        dispatcher.send_nmea(&solution(), &DilutionOfPrecision::default(), &meas);

        assert_eq!(
            sinks.nmea_types(),
            vec![NmeaType::Gga, NmeaType::Gsv, NmeaType::Gsv, NmeaType::Gga]
        );

        let nmea = sinks.nmea();
        match nmea[2] {
            NmeaSentence::Gsv {
                total,
                number,
                sats_in_view,
                satellites,
            } => {
                assert_eq!((total, number, sats_in_view), (2, 2, 6));
                assert_eq!(satellites.iter().flatten().count(), 2);
                assert_eq!(satellites[0].map(|sat| sat.sv.prn), Some(5));
            },
            other => panic!("expecting GSV, got {:?}", other),
        }
    }
}
