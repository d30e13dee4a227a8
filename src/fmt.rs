use std::fmt::{Debug, Display, Formatter};

use chrono::TimeDelta;

/// Minutes since midnight, rendered as `H:MM`.
#[derive(Copy, Clone, Eq, PartialEq, derive_more::From)]
pub struct ClockTime(pub u32);

impl Debug for ClockTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for ClockTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let time_delta = TimeDelta::minutes(i64::from(self.0));
        write!(f, "{}:{:02}", time_delta.num_hours(), time_delta.num_minutes() % 60)
    }
}
