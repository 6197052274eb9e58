/// Context detection for suggestion generation
///
/// Pins down "now", "today" and the current time block once per run so every
/// generator sees the same clock.

use crate::db::TimeBlock;
use chrono::{DateTime, Local, NaiveDate, TimeZone, Timelike, Utc};

/// Current context information
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    pub now: DateTime<Utc>,
    /// Calendar day in the user's timezone
    pub today: NaiveDate,
    pub time_block: TimeBlock,
}

/// Context detector
pub struct ContextDetector;

impl ContextDetector {
    /// Detect current context from the local wall clock
    pub fn detect() -> Context {
        Self::at(Local::now())
    }

    /// Context as seen from a given wall-clock moment
    pub fn at<Tz: TimeZone>(moment: DateTime<Tz>) -> Context {
        Context {
            now: moment.with_timezone(&Utc),
            today: moment.date_naive(),
            time_block: TimeBlock::for_hour(moment.hour()),
        }
    }
}
