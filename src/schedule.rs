/// Sleep scheduling between liveness reports.
///
/// Far from the deadline the supervisor wakes once per reporting interval.
/// Inside the last interval it sleeps straight to the countdown boundary,
/// then ticks once per second until the deadline.
use std::time::Duration;

const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

/// Errors building a [`SleepSchedule`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// A zero reporting interval would never let the loop sleep.
    ZeroInterval,
}

impl std::fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduleError::ZeroInterval => {
                write!(f, "report interval must be at least one second")
            }
        }
    }
}

impl std::error::Error for ScheduleError {}

/// Countdown threshold and reporting interval for the supervise loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepSchedule {
    countdown: Duration,
    interval: Duration,
}

impl Default for SleepSchedule {
    fn default() -> Self {
        Self {
            countdown: Duration::from_secs(10),
            interval: Duration::from_secs(60),
        }
    }
}

impl SleepSchedule {
    /// Build a schedule. `interval` must be at least one second; a zero
    /// `countdown` disables the per-second countdown.
    pub fn new(countdown: Duration, interval: Duration) -> Result<Self, ScheduleError> {
        if interval < COUNTDOWN_TICK {
            return Err(ScheduleError::ZeroInterval);
        }
        Ok(Self {
            countdown,
            interval,
        })
    }

    /// How long to wait on the child before the next report.
    ///
    /// Never exceeds `remaining`, and is non-zero whenever `remaining` is.
    pub fn quantum(&self, remaining: Duration) -> Duration {
        if remaining <= self.countdown {
            COUNTDOWN_TICK.min(remaining)
        } else if remaining <= self.interval {
            remaining - self.countdown
        } else {
            self.interval.min(remaining)
        }
    }
}
