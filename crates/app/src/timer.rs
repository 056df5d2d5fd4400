//! Wall-clock math for the daily scheduler run.
use chrono::{DateTime, Duration, NaiveTime, TimeZone};

/// First instant strictly after `now` whose local time is `run_at`.
///
/// On a day where `run_at` falls in a DST gap the run moves one hour later;
/// on an ambiguous day the earlier instant wins.
pub fn next_run<Tz: TimeZone>(now: &DateTime<Tz>, run_at: NaiveTime) -> Option<DateTime<Tz>> {
    let tz = now.timezone();
    let mut date = now.date_naive();
    for _ in 0..3 {
        let local = date.and_time(run_at);
        let candidate = tz
            .from_local_datetime(&local)
            .earliest()
            .or_else(|| tz.from_local_datetime(&(local + Duration::hours(1))).earliest());
        if let Some(candidate) = candidate
            && candidate > *now
        {
            return Some(candidate);
        }
        date = date.succ_opt()?;
    }
    None
}

/// How long to sleep until `next`; zero when it is already past.
pub fn until<Tz: TimeZone>(now: &DateTime<Tz>, next: &DateTime<Tz>) -> std::time::Duration {
    next.clone()
        .signed_duration_since(now.clone())
        .to_std()
        .unwrap_or_default()
}
