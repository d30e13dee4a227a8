use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use signal_hook::consts::{SIGINT, SIGTERM};

use crate::core::Error;

/// Cooperative cancellation checked between group computations.
#[derive(Clone, Debug, Default)]
#[must_use]
pub struct Cancellation {
    is_cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Cancellation {
    pub const fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Cancel on the first `SIGINT` or `SIGTERM`, and terminate the process on the second one.
    pub fn on_termination_signals(self) -> std::io::Result<Self> {
        for signal in [SIGINT, SIGTERM] {
            signal_hook::flag::register_conditional_shutdown(signal, 1, self.flag())?;
            signal_hook::flag::register(signal, self.flag())?;
        }
        Ok(self)
    }

    fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.is_cancelled)
    }

    pub fn cancel(&self) {
        self.is_cancelled.store(true, Ordering::Relaxed);
    }

    pub fn check(&self) -> Result<(), Error> {
        if self.is_cancelled.load(Ordering::Relaxed) {
            Err(Error::Cancelled)
        } else if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            Err(Error::DeadlineExceeded)
        } else {
            Ok(())
        }
    }
}
