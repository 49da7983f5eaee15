use serde::{Deserialize, Serialize};

pub const DEFAULT_DAYS: i64 = 14;
pub const DEFAULT_WEEKS: i64 = 12;
pub const DEFAULT_MONTHS: i64 = 12;

/// Window lengths for the three retention tiers.
///
/// Weeks and months are counts; the engine converts them to days as `weeks * 7` and
/// `months * 30`. A month is always thirty days, no calendar-month arithmetic is done.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub daily_window_days: i64,
    pub weekly_window_weeks: i64,
    pub monthly_window_months: i64,
}

impl RetentionPolicy {
    pub fn new(days: i64, weeks: i64, months: i64) -> Self {
        Self {
            daily_window_days: days,
            weekly_window_weeks: weeks,
            monthly_window_months: months,
        }
    }

    pub fn weekly_window_days(&self) -> i64 {
        self.weekly_window_weeks * 7
    }

    pub fn monthly_window_days(&self) -> i64 {
        self.monthly_window_months * 30
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_DAYS, DEFAULT_WEEKS, DEFAULT_MONTHS)
    }
}
