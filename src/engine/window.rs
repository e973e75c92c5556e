use chrono::{DateTime, Duration, Utc};

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

// The windows are wider than the poll interval so a pickup time can never
// slip between two consecutive cycles unnoticed.
pub fn assignment_window(now: DateTime<Utc>, config: &Config) -> TimeWindow {
    TimeWindow {
        start: now + Duration::minutes(config.assignment_window_start_mins),
        end: now + Duration::minutes(config.assignment_window_end_mins),
    }
}

pub fn reminder_window(now: DateTime<Utc>, config: &Config) -> TimeWindow {
    TimeWindow {
        start: now + Duration::minutes(config.reminder_window_start_mins),
        end: now + Duration::minutes(config.reminder_window_end_mins),
    }
}
