//! Channel and navigation measurements
use crate::{constants::MAX_CHANNELS, prelude::SV};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Raw [ChannelMeasurement] as produced by one tracking channel.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelMeasurement {
    /// Tracked [SV]
    pub sv: SV,
    /// Raw pseudo range (m)
    pub pseudorange_m: f64,
    /// Accumulated carrier phase (cycles)
    pub carrier_phase_cycles: f64,
    /// Instantaneous Doppler (Hz) from the carrier loop
    pub doppler_hz: f64,
    /// Signal to noise ratio
    pub snr: f64,
    /// Satellite time of week (s) at the latched sample,
    /// from the decoded navigation message
    pub tow_s: f64,
    /// Sample counter at which this measurement was latched
    pub sample_count: u64,
}

/// [NavigationMeasurement] is a [ChannelMeasurement] after clock corrections,
/// expressed in a common receiver time reference.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NavigationMeasurement {
    /// [SV]
    pub sv: SV,
    /// Uncorrected pseudo range (m)
    pub raw_pseudorange_m: f64,
    /// Pseudo range (m), corrected for the satellite clock
    pub pseudorange_m: f64,
    /// Carrier phase (cycles)
    pub carrier_phase_cycles: f64,
    /// Instantaneous Doppler (Hz) corrected for satellite clock drift
    pub raw_doppler_hz: f64,
    /// Doppler (Hz) actually used: either time differenced or instantaneous
    pub doppler_hz: f64,
    /// Signal to noise ratio
    pub snr: f64,
    /// Receiver time (s)
    pub receiver_time_s: f64,
    /// Satellite clock correction (s)
    pub clock_correction_s: f64,
    /// True when [Self::doppler_hz] results from carrier phase differencing
    pub tdcp: bool,
}

/// Fixed capacity measurement buffer, reused at every cycle.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<T: Copy + Default> {
    len: usize,
    inner: [T; MAX_CHANNELS],
}

impl<T: Copy + Default> Default for Snapshot<T> {
    fn default() -> Self {
        Self {
            len: 0,
            inner: [T::default(); MAX_CHANNELS],
        }
    }
}

impl<T: Copy + Default> Snapshot<T> {
    /// Buffer capacity
    pub const CAPACITY: usize = MAX_CHANNELS;

    /// Number of valid entries
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == Self::CAPACITY
    }

    /// Forget all entries. The storage is kept.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Appends a new entry, returns false when full.
    pub fn push(&mut self, item: T) -> bool {
        if self.is_full() {
            return false;
        }
        self.inner[self.len] = item;
        self.len += 1;
        true
    }

    pub fn as_slice(&self) -> &[T] {
        &self.inner[..self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.inner[..self.len]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Overwrites self with the content of other, without allocating.
    pub fn copy_from(&mut self, other: &Self) {
        self.inner[..other.len].copy_from_slice(other.as_slice());
        self.len = other.len;
    }
}

impl<'a, T: Copy + Default> IntoIterator for &'a Snapshot<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Snapshot<NavigationMeasurement> {
    /// Returns [NavigationMeasurement] for this [SV], if it exists
    pub fn find(&self, sv: SV) -> Option<&NavigationMeasurement> {
        self.iter().find(|m| m.sv == sv)
    }
}
