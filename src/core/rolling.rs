use std::{collections::VecDeque, num::NonZeroUsize};

/// How the window behaves before it has seen enough points.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, clap::ValueEnum, serde::Serialize)]
pub enum WindowPolicy {
    /// Sum whatever is available: the first points cover `min(window, i + 1)` values.
    #[default]
    Shrinking,

    /// Leave the points undefined until the window is full.
    Full,
}

impl<T> RollingSum for T where T: ?Sized {}

pub trait RollingSum {
    /// Sum the trailing `window` values ending at every point of the series.
    ///
    /// The window counts points, not keys: missing keys are not zero-filled here.
    fn rolling_sum<K>(
        self,
        window: NonZeroUsize,
        policy: WindowPolicy,
    ) -> impl Iterator<Item = (K, Option<f64>)>
    where
        Self: Iterator<Item = (K, f64)> + Sized,
    {
        // The window may be arbitrarily larger than the series:
        let mut trailing = VecDeque::new();
        self.map(move |(key, value)| {
            if trailing.len() == window.get() {
                trailing.pop_front();
            }
            trailing.push_back(value);
            let is_defined =
                (policy == WindowPolicy::Shrinking) || (trailing.len() == window.get());

            // Equal windows must sum to bit-identical values for the first-occurrence argmax:
            (key, is_defined.then(|| trailing.iter().sum()))
        })
    }
}
