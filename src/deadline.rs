use log::warn;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

pub trait Clock {
    fn elapsed(&self) -> Duration;
}

pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Cooperative wall-clock budget shared by all migration loops. Once a check observes the
/// budget as exhausted (or the run as cancelled), every later check reports it as exhausted.
pub struct Deadline {
    clock: Box<dyn Clock>,
    budget: Duration,
    cancellation_token: CancellationToken,
    cut_short: bool,
}

impl Deadline {
    pub fn new(budget: Duration, cancellation_token: CancellationToken) -> Self {
        Self::with_clock(Box::new(MonotonicClock::start()), budget, cancellation_token)
    }

    pub fn with_clock(
        clock: Box<dyn Clock>,
        budget: Duration,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            clock,
            budget,
            cancellation_token,
            cut_short: false,
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }

    pub fn remaining_time(&self) -> Duration {
        self.budget.saturating_sub(self.clock.elapsed())
    }

    pub fn exceeded(&mut self) -> bool {
        if self.cut_short {
            return true;
        }
        if self.cancellation_token.is_cancelled() {
            warn!("Termination requested, stopping before the next unit of work");
            self.cut_short = true;
        } else if self.clock.elapsed() > self.budget {
            warn!(
                "Run time budget of {}s exhausted, stopping before the next unit of work",
                self.budget.as_secs()
            );
            self.cut_short = true;
        }
        self.cut_short
    }

    pub fn is_cut_short(&self) -> bool {
        self.cut_short
    }
}
