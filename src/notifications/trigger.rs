use std::fmt;

use chrono::{DateTime, Datelike, Timelike, Utc};

/// A five-field calendar pattern (minute hour day-of-month month day-of-week)
/// pinned to one instant. Months run 1-12 and Sunday is day 0, in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarTrigger {
    pub minute: u32,
    pub hour: u32,
    pub day_of_month: u32,
    pub month: u32,
    pub day_of_week: u32,
}

impl CalendarTrigger {
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self {
            minute: at.minute(),
            hour: at.hour(),
            day_of_month: at.day(),
            month: at.month(),
            day_of_week: at.weekday().num_days_from_sunday(),
        }
    }

    /// Whether the wall-clock minute containing `at` matches every field.
    pub fn matches(&self, at: DateTime<Utc>) -> bool {
        *self == Self::from_datetime(at)
    }
}

impl fmt::Display for CalendarTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.minute, self.hour, self.day_of_month, self.month, self.day_of_week
        )
    }
}
