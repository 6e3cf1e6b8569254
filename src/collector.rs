//! Measurement collection
use itertools::Itertools;
use log::{debug, trace};

use crate::{
    critical::{CriticalSection, InterruptMask},
    measurement::{ChannelMeasurement, Snapshot},
};

/// [TrackingChannels] exposes the tracking subsystem.
pub trait TrackingChannels {
    /// Total number of tracking channels (used or not)
    fn channel_count(&self) -> usize;

    /// True when channel `i` currently tracks a signal
    fn channel_in_use(&self, i: usize) -> bool;

    /// Latest [ChannelMeasurement] of channel `i`.
    /// This is always called with interrupts masked, it must not block.
    fn read_measurement(&self, i: usize) -> ChannelMeasurement;
}

/// Collects a [ChannelMeasurement] from each channel in use whose SNR is above `min_snr`.
/// `snapshot` is cleared first, returns the number of accepted channels.
pub fn collect(
    tracking: &dyn TrackingChannels,
    mask: &dyn InterruptMask,
    min_snr: f64,
    snapshot: &mut Snapshot<ChannelMeasurement>,
) -> usize {
    snapshot.clear();

    for i in 0..tracking.channel_count() {
        if !tracking.channel_in_use(i) {
            continue;
        }

        // only the copy itself is protected
        let meas = CriticalSection::with(mask, || tracking.read_measurement(i));

        if meas.snr <= min_snr {
            trace!("channel #{} ({}) rejected: snr={:.1}", i, meas.sv, meas.snr);
            continue;
        }

        if !snapshot.push(meas) {
            debug!("measurement buffer full: dropping channel #{}", i);
            break;
        }
    }

    trace!(
        "collected {} channels: {}",
        snapshot.len(),
        snapshot.iter().map(|meas| meas.sv).join(", ")
    );

    snapshot.len()
}

#[cfg(test)]
mod test {
    use super::collect;
    use crate::{
        constants::MAX_CHANNELS,
        critical::NoMask,
        measurement::{ChannelMeasurement, Snapshot},
        prelude::{Constellation, SV},
        tests::{init_logger, mocks::TestTracking},
    };

    fn channel(prn: u8, snr: f64) -> ChannelMeasurement {
        ChannelMeasurement {
            sv: SV::new(Constellation::GPS, prn),
            snr,
            ..Default::default()
        }
    }

    #[test]
    fn snr_mask_and_usage() {
        init_logger();

        let tracking = TestTracking::new(vec![
            Some(channel(1, 10.0)),
            None,
            Some(channel(3, 2.0)),
            Some(channel(4, 2.5)),
            Some(channel(5, 0.0)),
        ]);

        let mut snapshot = Snapshot::default();
        let n = collect(&tracking, &NoMask, 2.0, &mut snapshot);

        assert_eq!(n, 2);
        let prns = snapshot.iter().map(|m| m.sv.prn).collect::<Vec<_>>();
        assert_eq!(prns, vec![1, 4]);
    }

    #[test]
    fn snapshot_is_reset_and_capped() {
        init_logger();

        let tracking = TestTracking::new(
            (1..=MAX_CHANNELS as u8 + 4)
                .map(|prn| Some(channel(prn, 40.0)))
                .collect(),
        );

        let mut snapshot = Snapshot::default();
        snapshot.push(channel(31, 50.0));

        let n = collect(&tracking, &NoMask, 2.0, &mut snapshot);
        assert_eq!(n, MAX_CHANNELS);
        assert_eq!(snapshot.as_slice()[0].sv.prn, 1);
    }

    #[test]
    fn reads_are_masked() {
        init_logger();

        let tracking = TestTracking::new(vec![Some(channel(7, 30.0)), Some(channel(8, 30.0))]);
        let mask = tracking.mask();

        let mut snapshot = Snapshot::default();
        collect(&tracking, &mask, 2.0, &mut snapshot);

        assert_eq!(tracking.unmasked_reads(), 0, "channel read with interrupts enabled");
        assert_eq!(mask.depth(), 0, "interrupts left masked");
    }
}
