//! Wall-clock arithmetic for daily triggers.

use chrono::{DateTime, Days, LocalResult, NaiveDateTime, NaiveTime, TimeDelta, TimeZone};
use std::time::Duration;

/// Longest single sleep between wall-clock checks. Keeps timers honest across
/// suspend/resume and manual clock changes.
pub const MAX_WAIT_STEP: Duration = Duration::from_secs(60);

const GAP_SEARCH_MINUTES: i64 = 4 * 60;

/// Next instant strictly after `now` whose local time is `hour:minute`.
///
/// Ambiguous local times (DST fall-back) resolve to the earliest instant.
/// Times skipped by a DST gap resolve to the first valid instant after it.
pub fn next_occurrence<Tz: TimeZone>(
    now: &DateTime<Tz>,
    hour: u32,
    minute: u32,
) -> Option<DateTime<Tz>> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
    let tz = now.timezone();
    let today = now.date_naive();

    for offset in 0..=2 {
        let naive = today.checked_add_days(Days::new(offset))?.and_time(time);
        let candidate = match tz.from_local_datetime(&naive) {
            LocalResult::Single(t) => t,
            LocalResult::Ambiguous(earliest, _) => earliest,
            LocalResult::None => match end_of_gap(&tz, naive) {
                Some(t) => t,
                None => continue,
            },
        };
        if candidate > *now {
            return Some(candidate);
        }
    }
    None
}

/// First local minute after `naive` that exists. Gaps never exceed a few hours.
fn end_of_gap<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    (1..=GAP_SEARCH_MINUTES)
        .find_map(|m| tz.from_local_datetime(&(naive + TimeDelta::minutes(m))).earliest())
}

/// How long to sleep before checking the clock again.
pub fn wait_step<Tz: TimeZone>(now: &DateTime<Tz>, target: &DateTime<Tz>) -> Duration {
    let remaining = (target.clone() - now.clone()).to_std().unwrap_or_default();
    remaining.min(MAX_WAIT_STEP)
}
