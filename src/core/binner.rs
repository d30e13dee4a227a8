use std::{iter::once, num::NonZeroU32};

use crate::core::Error;

/// Length of the time domain: minutes since midnight are within `[0, 1440)`.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// What to do with a record whose time falls outside of the day.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, clap::ValueEnum, serde::Serialize)]
pub enum OutOfDomainPolicy {
    /// Leave the record out of the aggregation.
    #[default]
    Exclude,

    /// Fail the entire computation.
    Reject,
}

/// Partitions the day into contiguous half-open bins of a fixed width.
///
/// The last bin is shorter when the interval does not divide the day evenly.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[must_use]
pub struct TimeBinner {
    interval: NonZeroU32,
}

impl Default for TimeBinner {
    /// Per-minute resolution.
    fn default() -> Self {
        Self { interval: NonZeroU32::MIN }
    }
}

impl TimeBinner {
    pub fn try_new(bin_interval: u32) -> Result<Self, Error> {
        NonZeroU32::new(bin_interval)
            .map(|interval| Self { interval })
            .ok_or(Error::InvalidBinInterval(bin_interval))
    }

    /// Get the start of the bin containing the time, or `None` when the time is outside the day.
    #[must_use]
    pub fn assign_bin(self, time: f64) -> Option<u32> {
        // NaN is never contained:
        if !(0.0..f64::from(MINUTES_PER_DAY)).contains(&time) {
            return None;
        }
        #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let index = (time / f64::from(self.interval.get())).floor() as u32;
        Some(index * self.interval.get())
    }

    /// Bin boundaries, ascending, closed by the end of the day.
    pub fn boundaries(self) -> impl Iterator<Item = u32> {
        (0..MINUTES_PER_DAY).step_by(self.interval.get() as usize).chain(once(MINUTES_PER_DAY))
    }

    /// Starts of all bins of the day, ascending.
    pub fn bin_starts(self) -> impl Iterator<Item = u32> {
        self.boundaries().take_while(|boundary| *boundary < MINUTES_PER_DAY)
    }

    /// Exclusive end of the bin starting at `bin_start`.
    #[must_use]
    pub fn bin_end(self, bin_start: u32) -> u32 {
        bin_start.saturating_add(self.interval.get()).min(MINUTES_PER_DAY)
    }
}
