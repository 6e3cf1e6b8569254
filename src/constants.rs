/// Speed of light in m.s⁻¹
pub const SPEED_OF_LIGHT_M_S: f64 = 299_792_458.0;

/// Maximal number of tracking channels we snapshot per cycle.
/// All per cycle buffers are sized after this.
pub const MAX_CHANNELS: usize = 14;

/// Duration of one GPS week (s)
pub const GPS_WEEK_SECONDS: f64 = 604_800.0;

/// Number of GPS PRN slots held in the [EphemerisTable](crate::prelude::EphemerisTable)
pub const GPS_PRN_SLOTS: usize = 32;

/// Lock counter reported in observations: we do not track cycle slips
/// and always report a continuous lock.
pub const OBSERVATION_LOCK_COUNT: u8 = 255;

/// Maximal number of satellites described by a single GSV sentence
pub const GSV_SATELLITES_PER_SENTENCE: usize = 4;
