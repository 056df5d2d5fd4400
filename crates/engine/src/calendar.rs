//! Calendar-day helpers.
//!
//! The scheduler reasons in local calendar days while everything is stored in
//! UTC. A [`DayWindow`] is one local day expressed as a half-open UTC range.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::{EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DayWindow {
    pub date: NaiveDate,
    /// Local midnight of `date`, inclusive.
    pub start: DateTime<Utc>,
    /// Local midnight of the following day, exclusive.
    pub end: DateTime<Utc>,
}

/// DST shifts are whole multiples of 15 minutes.
const GAP_STEP_MINUTES: i64 = 15;
const MAX_GAP_STEPS: i64 = 24 * 60 / GAP_STEP_MINUTES;

/// First instant of `date` in `tz`.
///
/// Where midnight falls in a DST gap (America/Santiago, America/Havana) the
/// day starts at the first local time after the gap.
fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> ResultEngine<DateTime<Utc>> {
    let midnight = date.and_time(NaiveTime::MIN);
    (0..MAX_GAP_STEPS)
        .map(|step| midnight + Duration::minutes(step * GAP_STEP_MINUTES))
        .find_map(|local| tz.from_local_datetime(&local).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| EngineError::Validation(format!("no local start of day on {date}")))
}

impl DayWindow {
    /// The local calendar day `instant` falls in.
    pub fn containing<Tz: TimeZone>(instant: &DateTime<Tz>) -> ResultEngine<Self> {
        let tz = instant.timezone();
        let date = instant.date_naive();
        let next = date
            .succ_opt()
            .ok_or_else(|| EngineError::Validation(format!("no day after {date}")))?;
        Ok(Self {
            date,
            start: local_midnight(&tz, date)?,
            end: local_midnight(&tz, next)?,
        })
    }

    #[cfg(test)]
    fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

#[cfg(test)]
mod tests {
    use chrono::FixedOffset;
    use chrono_tz::America::Santiago;

    use super::*;

    #[test]
    fn utc_day_window() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 13, 45, 0).unwrap();
        let window = DayWindow::containing(&now).unwrap();
        assert_eq!(window.date, NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
        assert_eq!(window.start, Utc.with_ymd_and_hms(2026, 10, 18, 0, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap());
        assert!(window.contains(now.with_timezone(&Utc)));
        assert!(!window.contains(window.end));
    }

    #[test]
    fn local_day_is_shifted_to_utc() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        // 00:30 local on the 18th is still the 17th in UTC.
        let now = tz.with_ymd_and_hms(2026, 10, 18, 0, 30, 0).unwrap();
        let window = DayWindow::containing(&now).unwrap();
        assert_eq!(window.date, NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
        assert_eq!(window.start, Utc.with_ymd_and_hms(2026, 10, 17, 22, 0, 0).unwrap());
        assert!(window.contains(now.with_timezone(&Utc)));
    }

    #[test]
    fn day_starting_in_a_dst_gap_begins_after_the_gap() {
        // Chile moves from -04 to -03 at local midnight of 2026-09-06.
        let gap_day = Santiago.with_ymd_and_hms(2026, 9, 6, 12, 0, 0).unwrap();
        let window = DayWindow::containing(&gap_day).unwrap();
        assert_eq!(window.date, NaiveDate::from_ymd_opt(2026, 9, 6).unwrap());
        assert_eq!(window.start, Utc.with_ymd_and_hms(2026, 9, 6, 4, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2026, 9, 7, 3, 0, 0).unwrap());

        let day_before = Santiago.with_ymd_and_hms(2026, 9, 5, 12, 0, 0).unwrap();
        let before = DayWindow::containing(&day_before).unwrap();
        assert_eq!(before.start, Utc.with_ymd_and_hms(2026, 9, 5, 4, 0, 0).unwrap());
        assert_eq!(before.end, window.start);
    }
}
