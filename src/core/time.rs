//! Time representation for the preview engine.
//! All playback positions, durations and offsets are whole milliseconds (i64).

/// Time in milliseconds. Positions are non-negative; offsets may be signed.
pub type Millis = i64;

/// Time constants for conversions
pub mod constants {
    use super::Millis;

    pub const MILLIS_PER_SECOND: Millis = 1_000;
    pub const MILLIS_PER_MINUTE: Millis = 60_000;
}

/// Time zero constant
pub const ZERO: Millis = 0;

/// Convert seconds (f64) to milliseconds, rounding to the nearest millisecond
#[inline]
pub fn from_seconds(seconds: f64) -> Millis {
    (seconds * constants::MILLIS_PER_SECOND as f64).round() as Millis
}

/// Convert milliseconds to seconds (f64)
#[inline]
pub fn to_seconds(millis: Millis) -> f64 {
    millis as f64 / constants::MILLIS_PER_SECOND as f64
}

/// Clamp a position into `[0, duration]`.
/// A non-positive duration collapses every position to zero.
#[inline]
pub fn clamp_position(position: Millis, duration: Millis) -> Millis {
    position.clamp(ZERO, duration.max(ZERO))
}

/// Format time as MM:SS.mmm (minutes are not wrapped into hours)
pub fn format_time(millis: Millis) -> String {
    let sign = if millis < 0 { "-" } else { "" };
    let millis = millis.abs();
    let minutes = millis / constants::MILLIS_PER_MINUTE;
    let seconds = (millis % constants::MILLIS_PER_MINUTE) / constants::MILLIS_PER_SECOND;
    let rest = millis % constants::MILLIS_PER_SECOND;

    format!("{}{:02}:{:02}.{:03}", sign, minutes, seconds, rest)
}
