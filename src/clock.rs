/// Wall-clock sampling at whole-second resolution.
///
/// Every "now" the supervisor compares against its deadline is truncated to
/// the second, so two samples taken within the same second compare equal and
/// the displayed remaining time never jitters by sub-second amounts.
use chrono::{DateTime, SubsecRound, Utc};
use std::time::Duration;

/// Source of the current time.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// The system UTC clock, truncated to whole seconds.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(0)
    }
}

/// Render a duration as `H:MM:SS`. Hours are unbounded; sub-seconds are dropped.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours}:{minutes:02}:{seconds:02}")
}

/// Render a timestamp the way the startup banner shows the kill time.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}
