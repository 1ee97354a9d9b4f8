//! Circular time-of-day statistics
//!
//! Posting times are points on a 24-hour clock, so they are mapped onto the
//! unit circle (0° = 00:00) before they are combined. Only the mean is a true
//! circular statistic; median and standard deviation are computed linearly on
//! the raw angles, and every result is mapped back through [`angle_to_time`].

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Seconds in one day
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Number of hour slots in the modal-hour indicator
pub const HOURS_PER_DAY: usize = 24;

/// Degrees in a full circle
const FULL_CIRCLE_DEG: f64 = 360.0;

/// A time of day with minute resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClockTime {
    hour: u32,
    minute: u32,
}

impl ClockTime {
    /// Create a clock time, rejecting hours outside 0-23 and minutes outside 0-59
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    /// Clock time of a timestamp (seconds are discarded)
    pub fn from_datetime(timestamp: &NaiveDateTime) -> Self {
        Self {
            hour: timestamp.hour(),
            minute: timestamp.minute(),
        }
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    /// Packed `hour * 100 + minute` form (14:30 -> 1430)
    pub fn packed(&self) -> u32 {
        self.hour * 100 + self.minute
    }

    /// Angle on the 24-hour circle in degrees
    pub fn angle(&self) -> f64 {
        time_to_angle(self.packed())
    }
}

impl std::fmt::Display for ClockTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Convert a packed time (`hour * 100 + minute`) to degrees on the clock circle.
///
/// No range validation is done: a packed value with minute >= 60 still maps to a
/// deterministic angle.
pub fn time_to_angle(packed: u32) -> f64 {
    let seconds = f64::from(packed % 100) * 60.0 + f64::from(packed / 100) * 3600.0;
    seconds * FULL_CIRCLE_DEG / SECONDS_PER_DAY
}

/// Convert an angle in degrees back to a time-like integer.
///
/// The result is the decimal concatenation of the truncated hour and minute,
/// without zero padding: 09:05 becomes `95` and 11:00 becomes `110`. Negative
/// angles wrap by one day. Rounding near a full turn can produce hour 24
/// (e.g. `240`); that value is kept as-is. Angles past one turn are not wrapped.
///
/// Returns `None` for a non-finite angle or when the concatenation does not fit
/// in a `u32`.
pub fn angle_to_time(angle: f64) -> Option<u32> {
    let mut seconds = angle * SECONDS_PER_DAY / FULL_CIRCLE_DEG;
    if !seconds.is_finite() {
        return None;
    }
    if seconds < 0.0 {
        seconds = seconds.rem_euclid(SECONDS_PER_DAY);
    }

    let remainder = seconds % 3600.0;
    let hours = ((seconds - remainder) / 3600.0).round();
    let minutes = ((remainder - remainder % 60.0) / 60.0).round();
    if hours > f64::from(u32::MAX) {
        return None;
    }

    concat_digits(hours as u32, minutes as u32)
}

/// `concat_digits(9, 5) == Some(95)`, `concat_digits(14, 30) == Some(1430)`
fn concat_digits(high: u32, low: u32) -> Option<u32> {
    let mut shift: u32 = 10;
    while low >= shift {
        shift = shift.checked_mul(10)?;
    }
    high.checked_mul(shift)?.checked_add(low)
}

/// Circular mean of angles in degrees, in `(-180, 180]`.
///
/// Each angle becomes a unit vector; the result is the direction of their
/// average. When the vectors cancel out exactly the direction is that of the
/// zero vector (0°).
pub fn mean_angle(angles: &[f64]) -> f64 {
    let n = angles.len() as f64;
    let (sum_cos, sum_sin) = angles.iter().fold((0.0_f64, 0.0_f64), |(c, s), deg| {
        let rad = deg.to_radians();
        (c + rad.cos(), s + rad.sin())
    });
    (sum_sin / n).atan2(sum_cos / n).to_degrees()
}

/// Linear median of the raw angle values (not a circular median)
pub fn median_angle(angles: &[f64]) -> f64 {
    if angles.is_empty() {
        return f64::NAN;
    }
    let mut sorted = angles.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Population standard deviation (N divisor) of the raw angle values
pub fn stddev_angle(angles: &[f64]) -> f64 {
    if angles.is_empty() {
        return f64::NAN;
    }
    let n = angles.len() as f64;
    let mean = angles.iter().sum::<f64>() / n;
    let variance = angles.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// Mean posting time, encoded by [`angle_to_time`]; `None` for no angles
pub fn mean_time_from_angles(angles: &[f64]) -> Option<u32> {
    angle_to_time(mean_angle(angles))
}

/// Median posting time, encoded by [`angle_to_time`]; `None` for no angles
pub fn median_time_from_angles(angles: &[f64]) -> Option<u32> {
    angle_to_time(median_angle(angles))
}

/// Standard deviation of posting times, encoded by [`angle_to_time`]; `None` for no angles
pub fn stddev_time_from_angles(angles: &[f64]) -> Option<u32> {
    angle_to_time(stddev_angle(angles))
}

/// Every hour whose frequency equals the maximum frequency, ascending
pub fn modal_hours(hours: &[u32]) -> Vec<u32> {
    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for &hour in hours {
        *counts.entry(hour).or_insert(0) += 1;
    }

    let max_count = counts.values().copied().max().unwrap_or(0);
    counts
        .into_iter()
        .filter(|&(_, count)| count == max_count)
        .map(|(hour, _)| hour)
        .collect()
}

/// 24-slot 0/1 indicator of the modal hours. Hours outside 0-23 are ignored.
pub fn mode_indicator(modes: &[u32]) -> [u8; HOURS_PER_DAY] {
    let mut slots = [0u8; HOURS_PER_DAY];
    for &hour in modes {
        if let Some(slot) = slots.get_mut(hour as usize) {
            *slot = 1;
        }
    }
    slots
}
