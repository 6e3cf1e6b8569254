//! Navigation solution loop
use std::{
    sync::Arc,
    thread::{self, JoinHandle},
};

use log::{debug, info, trace, warn};

use crate::{
    aligner::{navigation_measurements, repropagate, tdcp_doppler, EpochAlignment},
    cfg::{Config, Error},
    collector::{collect, TrackingChannels},
    controller::WakeIntervalController,
    critical::InterruptMask,
    dispatch::{Dispatcher, NmeaSink, TelemetrySink},
    ephemeris::EphemerisSource,
    measurement::{ChannelMeasurement, NavigationMeasurement, Snapshot},
    prelude::{Duration, Epoch},
    scheduler::{TimerScheduler, WakePeriod},
    solution::{SolutionEngine, SolveError},
};

/// Collaborators of the [NavigationLoop]
pub struct Peripherals {
    /// Tracking subsystem
    pub tracking: Box<dyn TrackingChannels + Send>,
    /// Masks the tracking interrupts while we copy channel states
    pub mask: Box<dyn InterruptMask + Send>,
    /// Ephemeris storage
    pub ephemerides: Box<dyn EphemerisSource + Send>,
    /// P.V.T solver
    pub engine: Box<dyn SolutionEngine + Send>,
    /// Binary telemetry output
    pub telemetry: Box<dyn TelemetrySink + Send>,
    /// NMEA output
    pub nmea: Box<dyn NmeaSink + Send>,
}

/// What happened during one cycle
#[derive(Debug, Clone, PartialEq)]
pub enum CycleReport {
    /// Not enough usable channels: nothing happened.
    Skipped { accepted: usize },
    /// Solution attempt failed: nothing was published.
    SolveFailed { accepted: usize, error: SolveError },
    /// Solution was published.
    Solved {
        accepted: usize,
        /// Number of satellites with a time differenced Doppler
        n_tdcp: usize,
        /// Alignment error to the solution grid
        t_err: Duration,
        /// Observations were published
        observations: bool,
        /// Newly programmed [WakePeriod]
        period: WakePeriod,
    },
}

/// Running counters of the [NavigationLoop]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStatistics {
    pub cycles: u64,
    pub skipped: u64,
    pub solve_failures: u64,
    pub solutions: u64,
    pub suppressed_observations: u64,
    /// Timer ticks that fired while the worker was busy
    pub absorbed_ticks: u64,
}

/// Buffers owned by the worker, reused at every cycle.
#[derive(Debug, Default)]
struct LoopState {
    /// latest channel snapshot
    channels: Snapshot<ChannelMeasurement>,
    /// current navigation measurements
    current: Snapshot<NavigationMeasurement>,
    /// navigation measurements of the last cycle that passed the readiness gate
    previous: Snapshot<NavigationMeasurement>,
    /// measurements forwarded to the engine, then propagated to the grid
    aligned: Snapshot<NavigationMeasurement>,
    /// previous solution [Epoch]
    last_solution: Option<Epoch>,
}

/// [NavigationLoop] is the navigation worker: it wakes up on each timer
/// interrupt, resolves, publishes and schedules the next wake up.
pub struct NavigationLoop {
    cfg: Config,
    scheduler: Arc<TimerScheduler>,
    tracking: Box<dyn TrackingChannels + Send>,
    mask: Box<dyn InterruptMask + Send>,
    ephemerides: Box<dyn EphemerisSource + Send>,
    engine: Box<dyn SolutionEngine + Send>,
    dispatcher: Dispatcher,
    controller: WakeIntervalController,
    state: LoopState,
    stats: LoopStatistics,
}

impl NavigationLoop {
    /// Builds a new [NavigationLoop] and deploys the timer [TimerScheduler].
    /// The timer interrupt should be routed to [TimerScheduler::on_interrupt].
    pub fn new(
        cfg: &Config,
        scheduler: Arc<TimerScheduler>,
        peripherals: Peripherals,
    ) -> Result<Self, Error> {
        cfg.validate()?;

        let controller = WakeIntervalController::new(cfg);
        scheduler.setup(controller.initial_period(cfg));

        info!(
            "navigation loop: {}Hz solutions, min_sv={}, min_snr={}",
            cfg.solution_rate_hz, cfg.min_sv, cfg.min_snr
        );

        let Peripherals {
            tracking,
            mask,
            ephemerides,
            engine,
            telemetry,
            nmea,
        } = peripherals;

        let dispatcher = Dispatcher::new(
            telemetry,
            nmea,
            cfg.dops_decimation,
            cfg.sat_view_decimation,
        );

        Ok(Self {
            cfg: cfg.clone(),
            scheduler,
            controller,
            dispatcher,
            tracking,
            mask,
            ephemerides,
            engine,
            state: LoopState::default(),
            stats: LoopStatistics::default(),
        })
    }

    /// Runs forever: waits for the timer then processes one cycle.
    pub fn run(&mut self) {
        loop {
            self.scheduler.wait();
            let report = self.run_cycle();
            trace!("{:?}", report);
        }
    }

    /// Moves this loop to its own dedicated thread.
    pub fn spawn(mut self) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("solution".to_string())
            .spawn(move || self.run())
    }

    /// Processes one cycle. This runs to completion and never blocks.
    pub fn run_cycle(&mut self) -> CycleReport {
        self.stats.cycles += 1;

        let absorbed = self.scheduler.take_absorbed_ticks();
        if absorbed > 0 {
            debug!("{} timer tick(s) absorbed while busy", absorbed);
            self.stats.absorbed_ticks += absorbed as u64;
        }

        let accepted = collect(
            self.tracking.as_ref(),
            self.mask.as_ref(),
            self.cfg.min_snr,
            &mut self.state.channels,
        );

        if accepted < self.cfg.min_sv {
            debug!(
                "not enough usable channels ({}/{}): cycle skipped",
                accepted, self.cfg.min_sv
            );
            self.stats.skipped += 1;
            return CycleReport::Skipped { accepted };
        }

        let ephemerides = self.ephemerides.as_ref();

        navigation_measurements(
            &self.state.channels,
            ephemerides,
            self.cfg.sample_rate_hz,
            self.cfg.carrier.frequency(),
            &mut self.state.current,
        );

        let n_tdcp = tdcp_doppler(
            &self.state.current,
            &self.state.previous,
            &mut self.state.aligned,
        );

        let report = match self
            .engine
            .solve(self.state.aligned.as_slice(), ephemerides)
        {
            Ok((solution, dops)) => {
                let alignment = EpochAlignment::new(solution.epoch, self.cfg.solution_rate_hz);

                repropagate(
                    self.state.aligned.as_mut_slice(),
                    alignment.t_err_seconds(),
                    self.cfg.carrier.wavelength(),
                );

                let observations = alignment.within(self.cfg.alignment_tolerance);

                if observations {
                    self.dispatcher
                        .send_observations(alignment.expected, self.state.aligned.as_slice());
                } else {
                    debug!(
                        "{} - alignment error {} too large: observations suppressed",
                        solution.epoch, alignment.t_err
                    );
                    self.stats.suppressed_observations += 1;
                }

                self.dispatcher.send_solution(&solution, &dops);
                self.dispatcher
                    .send_nmea(&solution, &dops, self.state.aligned.as_slice());

                let period = self.controller.next_period(&alignment, solution.epoch);
                self.scheduler.reload(period);

                if let Some(last) = self.state.last_solution {
                    debug!("{} - solution (+{})", solution.epoch, solution.epoch - last);
                }

                self.state.last_solution = Some(solution.epoch);
                self.stats.solutions += 1;

                CycleReport::Solved {
                    accepted,
                    n_tdcp,
                    t_err: alignment.t_err,
                    observations,
                    period,
                }
            },
            Err(error) => {
                warn!("solution attempt failed: {}", error);
                self.stats.solve_failures += 1;
                CycleReport::SolveFailed { accepted, error }
            },
        };

        // preserves TDCP continuity, whatever the solution outcome
        self.state.previous.copy_from(&self.state.current);

        report
    }

    /// Navigation measurements retained for time differencing
    pub fn previous_measurements(&self) -> &[NavigationMeasurement] {
        self.state.previous.as_slice()
    }

    /// [Epoch] of the latest solution
    pub fn last_solution_epoch(&self) -> Option<Epoch> {
        self.state.last_solution
    }

    /// [LoopStatistics] so far
    pub fn statistics(&self) -> LoopStatistics {
        self.stats
    }

    /// Shared [TimerScheduler]
    pub fn scheduler(&self) -> Arc<TimerScheduler> {
        self.scheduler.clone()
    }
}
