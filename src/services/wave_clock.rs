//! Calendar rules for the drip waves.
//!
//! Wave 1 starts right after payment. Waves 2 and 3 become eligible back to
//! back with a one-day buffer, on a weekday at the fixed send hour, and only
//! send while the business send window is open.

use crate::models::campaign::Wave;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};

/// Business-hours gate for waves 2 and 3, expressed in UTC.
#[derive(Debug, Clone, PartialEq)]
pub struct SendWindow {
    /// Hour a scheduled wave becomes eligible on its first day.
    pub send_time: NaiveTime,
    /// Half-open `[start, end)` intervals during which sending is allowed.
    pub intervals: Vec<(NaiveTime, NaiveTime)>,
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

impl Default for SendWindow {
    /// 10:00 US-Eastern send hour; 9–11 AM and 12:30–2 PM Eastern windows.
    fn default() -> Self {
        Self {
            send_time: hm(15, 0),
            intervals: vec![(hm(14, 0), hm(16, 0)), (hm(17, 30), hm(19, 0))],
        }
    }
}

impl SendWindow {
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        if is_weekend(now.date_naive()) {
            return false;
        }
        let time = now.time();
        self.intervals
            .iter()
            .any(|(start, end)| *start <= time && time < *end)
    }
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Number of daily batches one wave needs: `ceil(target / quota)`.
pub fn days_per_wave(recruiter_target: i32, daily_quota: i32) -> i64 {
    let target = recruiter_target.max(0) as i64;
    let quota = daily_quota.max(1) as i64;
    (target + quota - 1) / quota
}

/// Days after creation at which `wave` may start. Wave 1 has no offset.
pub fn wave_offset_days(wave: Wave, days_per_wave: i64) -> i64 {
    match wave {
        Wave::First => 0,
        Wave::Second => days_per_wave + 1,
        Wave::Third => 2 * days_per_wave + 1,
    }
}

/// `base + days`, moved forward past a weekend and pinned to `send_time`.
pub fn next_business_slot(base: DateTime<Utc>, days: i64, send_time: NaiveTime) -> DateTime<Utc> {
    let mut date = (base + Duration::days(days)).date_naive();
    while is_weekend(date) {
        date = date.succ_opt().unwrap_or(date);
    }
    date.and_time(send_time).and_utc()
}

/// Earliest moment `wave` may begin for a campaign created at `created_at`.
/// Returns `None` for wave 1, which is never time-gated.
pub fn scheduled_not_before(
    created_at: DateTime<Utc>,
    recruiter_target: i32,
    daily_quota: i32,
    wave: Wave,
    window: &SendWindow,
) -> Option<DateTime<Utc>> {
    if wave == Wave::First {
        return None;
    }
    let offset = wave_offset_days(wave, days_per_wave(recruiter_target, daily_quota));
    Some(next_business_slot(created_at, offset, window.send_time))
}
