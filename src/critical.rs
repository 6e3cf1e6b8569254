//! Interrupt masking
use log::trace;

/// [InterruptMask] masks and unmasks the interrupts that may
/// preempt the navigation worker (typically the tracking loop updates).
pub trait InterruptMask {
    /// Mask interrupts
    fn disable(&self);
    /// Unmask interrupts
    fn enable(&self);
}

/// [CriticalSection] masks interrupts for as long as it lives.
/// Interrupts are unmasked when the guard is dropped, whatever the exit path.
pub struct CriticalSection<'a> {
    mask: &'a dyn InterruptMask,
}

impl<'a> CriticalSection<'a> {
    /// Enter a new [CriticalSection]
    pub fn enter(mask: &'a dyn InterruptMask) -> Self {
        mask.disable();
        Self { mask }
    }

    /// Runs `f` with interrupts masked
    pub fn with<R>(mask: &'a dyn InterruptMask, f: impl FnOnce() -> R) -> R {
        let _cs = Self::enter(mask);
        f()
    }
}

impl Drop for CriticalSection<'_> {
    fn drop(&mut self) {
        self.mask.enable();
        trace!("left critical section");
    }
}

/// [InterruptMask] for hosted targets where the tracking updater
/// does not run in interrupt context.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMask;

impl InterruptMask for NoMask {
    fn disable(&self) {}
    fn enable(&self) {}
}
