//! Timer scheduling of the navigation worker
use std::{
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        OnceLock,
    },
    thread::{self, Thread},
};

use log::{debug, info};

use crate::prelude::Duration;

/// [HardwareTimer] is the free running up-counter that paces the solutions.
/// Timers are memory mapped peripherals, shared between the interrupt
/// context and the worker, hence all methods take `&self`.
pub trait HardwareTimer {
    /// Configure reload `period` (ticks) and `prescaler`, start counting.
    fn configure(&self, period: u32, prescaler: u32);
    /// Update the reload value
    fn reload(&self, period: u32);
    /// Clear the interrupt pending flag
    fn clear_pending(&self);
    /// Enable the overflow interrupt
    fn enable_interrupt(&self);
}

/// [WakePeriod] of the timer, in ticks. Always within `[1, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct WakePeriod(u32);

impl WakePeriod {
    /// Builds a [WakePeriod] from a time interval. The interval is clamped
    /// to `max`, non finite or non positive intervals are replaced by `max`.
    pub fn from_interval(interval: Duration, max: Duration, clock_hz: f64) -> Self {
        let max_ticks = Self::to_ticks(max, clock_hz).max(1.0);

        let interval = if interval > Duration::ZERO && interval <= max {
            interval
        } else {
            max
        };

        let ticks = Self::to_ticks(interval, clock_hz);
        if !ticks.is_finite() {
            return Self(max_ticks.min(u32::MAX as f64) as u32);
        }

        Self(ticks.clamp(1.0, max_ticks).min(u32::MAX as f64) as u32)
    }

    fn to_ticks(interval: Duration, clock_hz: f64) -> f64 {
        (interval.to_seconds() * clock_hz).round()
    }

    /// Number of timer ticks
    pub fn ticks(&self) -> u32 {
        self.0
    }

    /// Converts back to a time interval
    pub fn interval(&self, clock_hz: f64) -> Duration {
        Duration::from_seconds(self.0 as f64 / clock_hz)
    }
}

/// [WakeSignal] hands the timer interrupt off to a single worker.
/// The worker registers itself then suspends, the interrupt wakes
/// the registered worker at most once. Interrupts occurring
/// while nobody is registered are lost.
#[derive(Debug, Default)]
pub struct WakeSignal {
    /// worker is registered and waiting
    armed: AtomicBool,
    /// interrupt handed off to the worker
    fired: AtomicBool,
    worker: OnceLock<Thread>,
}

impl WakeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when a worker is registered
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// Interrupt side: wakes the registered worker, if any.
    /// Never blocks. Returns true if a worker was woken.
    pub fn notify(&self) -> bool {
        if !self.armed.swap(false, Ordering::AcqRel) {
            return false;
        }

        self.fired.store(true, Ordering::Release);

        if let Some(worker) = self.worker.get() {
            worker.unpark();
        }

        true
    }

    /// Worker side: registers the calling thread and suspends until notified.
    /// Only one thread may ever wait on a [WakeSignal].
    pub fn wait(&self) {
        let worker = self.worker.get_or_init(thread::current);
        debug_assert_eq!(
            worker.id(),
            thread::current().id(),
            "wake signal shared by several workers"
        );

        self.fired.store(false, Ordering::Release);
        self.armed.store(true, Ordering::Release);

        // spurious wake ups are possible
        while !self.fired.swap(false, Ordering::AcqRel) {
            thread::park();
        }
    }
}

/// [TimerScheduler] paces the navigation worker.
pub struct TimerScheduler {
    timer: Box<dyn HardwareTimer + Send + Sync>,
    signal: WakeSignal,
    /// programmed period in ticks, 0 until deployed
    period: AtomicU32,
    /// ticks that fired while the worker was busy
    absorbed: AtomicU32,
}

impl TimerScheduler {
    /// Prescaler we deploy: the timer counts at its input clock rate
    pub const PRESCALER: u32 = 0;

    pub fn new(timer: Box<dyn HardwareTimer + Send + Sync>) -> Self {
        Self {
            timer,
            signal: WakeSignal::new(),
            period: AtomicU32::new(0),
            absorbed: AtomicU32::new(0),
        }
    }

    /// Programs the timer with `initial` [WakePeriod] and enables its interrupt.
    pub fn setup(&self, initial: WakePeriod) {
        self.period.store(initial.ticks(), Ordering::Release);
        self.timer.configure(initial.ticks(), Self::PRESCALER);
        self.timer.enable_interrupt();
        info!("timer scheduler deployed: period={} ticks", initial.ticks());
    }

    /// Timer interrupt handler. Must be called from the timer vector.
    /// Returns true if the worker was woken up.
    /// Lock free: this never logs, ticks absorbed while the worker
    /// is busy are only counted (see [Self::take_absorbed_ticks]).
    pub fn on_interrupt(&self) -> bool {
        let woken = self.signal.notify();
        if !woken {
            self.absorbed.fetch_add(1, Ordering::Relaxed);
        }
        self.timer.clear_pending();
        woken
    }

    /// Number of ticks absorbed since last call. Worker side.
    pub fn take_absorbed_ticks(&self) -> u32 {
        self.absorbed.swap(0, Ordering::Relaxed)
    }

    /// Suspends the calling worker until next interrupt
    pub fn wait(&self) {
        self.signal.wait();
    }

    /// True when the worker is currently waiting
    pub fn worker_waiting(&self) -> bool {
        self.signal.is_armed()
    }

    /// Current [WakePeriod], None until [Self::setup] deployed the timer.
    pub fn period(&self) -> Option<WakePeriod> {
        match self.period.load(Ordering::Acquire) {
            0 => None,
            ticks => Some(WakePeriod(ticks)),
        }
    }

    /// Reloads the timer with a new [WakePeriod]
    pub fn reload(&self, period: WakePeriod) {
        self.period.store(period.ticks(), Ordering::Release);
        self.timer.reload(period.ticks());
        debug!("timer reloaded: period={} ticks", period.ticks());
    }
}

#[cfg(test)]
mod test {
    use super::{TimerScheduler, WakePeriod, WakeSignal};
    use crate::{
        prelude::Duration,
        tests::{init_logger, mocks::TestTimer},
    };

    use rand::{rngs::SmallRng, Rng, SeedableRng};
    use rstest::*;

    use std::{sync::Arc, thread, time::Duration as StdDuration};

    const CLOCK_HZ: f64 = 65_472_000.0;

    fn max() -> Duration {
        Duration::from_seconds(2.0)
    }

    fn spin_until(mut f: impl FnMut() -> bool) {
        while !f() {
            thread::sleep(StdDuration::from_millis(1));
        }
    }

    #[rstest]
    #[case(1.0, 65_472_000)]
    #[case(0.502, 32_866_944)]
    #[case(2.0, 130_944_000)]
    #[case(2.5, 130_944_000)]
    #[case(1.0E6, 130_944_000)]
    #[case(0.0, 130_944_000)]
    #[case(-0.5, 130_944_000)]
    #[case(1.0E-9, 1)]
    fn wake_period_clamping(#[case] interval_s: f64, #[case] ticks: u32) {
        let period = WakePeriod::from_interval(Duration::from_seconds(interval_s), max(), CLOCK_HZ);
        assert_eq!(period.ticks(), ticks);
    }

    #[test]
    fn wake_period_random_sweep() {
        let mut rng = SmallRng::seed_from_u64(42);
        let max_ticks = WakePeriod::from_interval(max(), max(), CLOCK_HZ).ticks();

        for _ in 0..10_000 {
            let interval_s = rng.random_range(-1.0E3..1.0E3);
            let period =
                WakePeriod::from_interval(Duration::from_seconds(interval_s), max(), CLOCK_HZ);
            assert!(period.ticks() > 0, "null period for {}s", interval_s);
            assert!(period.ticks() <= max_ticks, "runaway period for {}s", interval_s);
        }
    }

    #[test]
    fn interrupt_without_worker_is_absorbed() {
        let signal = WakeSignal::new();
        assert!(!signal.is_armed());
        assert!(!signal.notify());
        assert!(!signal.notify());
    }

    #[test]
    fn interrupt_wakes_worker_once() {
        init_logger();

        let signal = Arc::new(WakeSignal::new());
        let worker_signal = signal.clone();

        let worker = thread::spawn(move || {
            worker_signal.wait();
        });

        spin_until(|| signal.is_armed());

        assert!(signal.notify(), "worker should have been woken");
        assert!(!signal.notify(), "second tick must be absorbed");

        worker.join().unwrap();
        assert!(!signal.is_armed());
    }

    #[test]
    fn worker_cycles() {
        init_logger();

        let signal = Arc::new(WakeSignal::new());
        let worker_signal = signal.clone();

        let worker = thread::spawn(move || {
            for _ in 0..5 {
                worker_signal.wait();
            }
        });

        let mut woken = 0;
        while woken < 5 {
            spin_until(|| signal.is_armed());
            if signal.notify() {
                woken += 1;
            }
        }

        worker.join().unwrap();
        assert_eq!(woken, 5);
    }

    #[test]
    fn scheduler_setup_and_reload() {
        init_logger();

        let timer = TestTimer::default();
        let scheduler = TimerScheduler::new(Box::new(timer.clone()));
        assert_eq!(scheduler.period(), None, "timer is not deployed yet");

        let initial = WakePeriod::from_interval(Duration::from_seconds(1.0), max(), CLOCK_HZ);
        scheduler.setup(initial);

        assert_eq!(timer.configured(), Some((65_472_000, TimerScheduler::PRESCALER)));
        assert!(timer.interrupt_enabled());
        assert_eq!(scheduler.period(), Some(initial));

        assert!(!scheduler.on_interrupt());
        assert_eq!(timer.cleared(), 1, "pending flag must be cleared on every tick");

        assert!(!scheduler.on_interrupt());
        assert_eq!(scheduler.take_absorbed_ticks(), 2);
        assert_eq!(scheduler.take_absorbed_ticks(), 0);

        let next = WakePeriod::from_interval(Duration::from_seconds(0.5), max(), CLOCK_HZ);
        scheduler.reload(next);
        assert_eq!(scheduler.period(), Some(next));
        assert_eq!(timer.reloads(), vec![32_736_000]);
    }
}
