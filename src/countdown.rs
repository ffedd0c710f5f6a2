//! Next-prayer countdown
//!
//! A pure query over today's timings: which of the five prayers comes next
//! and how long until it. Sunrise is never reported.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::source::DailyTimings;
use crate::types::Prayer;

/// Result of a countdown query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    pub prayer: Prayer,
    pub at: DateTime<Utc>,
    /// Time left until `at`, in whole seconds
    #[serde(with = "crate::types::duration_seconds")]
    pub remaining: Duration,
}

impl Countdown {
    /// `HH:MM:SS` rendering of the remaining time
    pub fn format_remaining(&self) -> String {
        format_hms(self.remaining)
    }
}

/// Nearest strictly-future prayer of today, else tomorrow's Fajr.
///
/// When `tomorrow_fajr` is unknown, today's Fajr moved forward by 24 hours
/// stands in for it.
pub fn next_prayer_countdown(
    now: DateTime<Utc>,
    today: &DailyTimings,
    tomorrow_fajr: Option<DateTime<Utc>>,
) -> Countdown {
    let (prayer, at) = today
        .salah()
        .find(|(_, at)| *at > now)
        .unwrap_or_else(|| {
            (
                Prayer::Fajr,
                tomorrow_fajr.unwrap_or_else(|| today.fajr + Duration::hours(24)),
            )
        });
    Countdown {
        prayer,
        at,
        remaining: Duration::seconds((at - now).num_seconds()),
    }
}

/// Render a duration as `HH:MM:SS`; negative durations render as zero
pub fn format_hms(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use pretty_assertions::assert_eq;

    fn timings() -> DailyTimings {
        let at = |h, m| Utc.with_ymd_and_hms(2024, 3, 10, h, m, 0).unwrap();
        DailyTimings {
            date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            fajr: at(4, 2),
            sunrise: at(5, 30),
            dhuhr: at(11, 45),
            asr: at(15, 5),
            maghrib: at(17, 50),
            isha: at(21, 22),
            hijri_date: None,
        }
    }

    #[test]
    fn test_after_isha_counts_to_tomorrow_fajr() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 23, 59, 0).unwrap();
        let countdown = next_prayer_countdown(now, &timings(), None);
        assert_eq!(countdown.prayer, Prayer::Fajr);
        assert_eq!(countdown.remaining, Duration::hours(4) + Duration::minutes(3));
        assert_eq!(countdown.format_remaining(), "04:03:00");
    }

    #[test]
    fn test_uses_tomorrow_fajr_when_known() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 22, 0, 0).unwrap();
        let tomorrow = Utc.with_ymd_and_hms(2024, 3, 11, 4, 0, 0).unwrap();
        let countdown = next_prayer_countdown(now, &timings(), Some(tomorrow));
        assert_eq!(countdown.at, tomorrow);
        assert_eq!(countdown.remaining, Duration::hours(6));
    }

    #[test]
    fn test_sunrise_is_skipped() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 5, 0, 0).unwrap();
        let countdown = next_prayer_countdown(now, &timings(), None);
        assert_eq!(countdown.prayer, Prayer::Dhuhr);
    }

    #[test]
    fn test_exact_prayer_instant_is_not_future() {
        let t = timings();
        let countdown = next_prayer_countdown(t.asr, &t, None);
        assert_eq!(countdown.prayer, Prayer::Maghrib);
    }

    #[test]
    fn test_idempotent_queries() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 30).unwrap();
        let t = timings();
        assert_eq!(next_prayer_countdown(now, &t, None), next_prayer_countdown(now, &t, None));
    }

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(Duration::seconds(3725)), "01:02:05");
        assert_eq!(format_hms(Duration::seconds(-5)), "00:00:00");
    }
}
