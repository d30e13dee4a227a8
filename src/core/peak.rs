use serde::Serialize;

use crate::fmt::ClockTime;

/// Maximum of a rolling series and the bin where it is first reached.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[must_use]
pub struct Peak {
    pub max_value: f64,

    /// Start of the first bin reaching [`Peak::max_value`], `None` when no window was defined.
    pub max_time: Option<u32>,

    /// [`Peak::max_time`] as `H:MM`, only when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_time: Option<String>,
}

impl Peak {
    pub const NOT_AVAILABLE: &'static str = "N/A";

    /// Find the maximum over the defined points.
    ///
    /// Ties resolve to the earliest point, so the series must be ordered by time.
    pub fn from_rolling(
        rolling: impl IntoIterator<Item = (u32, Option<f64>)>,
        format_as_clock: bool,
    ) -> Self {
        let argmax = rolling
            .into_iter()
            .filter_map(|(time, sum)| Some((time, sum?)))
            .fold(None, |max, (time, sum)| match max {
                Some((_, max_sum)) if sum <= max_sum => max,
                _ => Some((time, sum)),
            });
        match argmax {
            Some((max_time, max_value)) => Self {
                max_value,
                max_time: Some(max_time),
                formatted_time: format_as_clock.then(|| ClockTime(max_time).to_string()),
            },
            None => Self::default(),
        }
    }

    /// Human-readable peak time: formatted when available, raw minutes otherwise.
    #[must_use]
    pub fn time_label(&self) -> String {
        match (&self.formatted_time, self.max_time) {
            (Some(formatted_time), _) => formatted_time.clone(),
            (None, Some(max_time)) => max_time.to_string(),
            (None, None) => Self::NOT_AVAILABLE.to_owned(),
        }
    }
}
