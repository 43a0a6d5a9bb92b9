use crate::models::campaign::WaveState;
use chrono::NaiveDate;

/// A wave gets at most one batch per UTC calendar day. A short batch still
/// uses up the day.
pub fn quota_available(wave: &WaveState, today: NaiveDate) -> bool {
    wave.last_send_date != Some(today)
}
