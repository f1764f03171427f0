use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

use crate::recon::util::elapsed_days;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmissionStatus {
    Missing,
    Stale { days: i64 },
    Current { days: i64 },
}

impl SubmissionStatus {
    pub fn is_current(self) -> bool {
        matches!(self, Self::Current { .. })
    }

    #[cfg(test)]
    pub fn is_stale(self) -> bool {
        matches!(self, Self::Stale { .. })
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("missing"),
            Self::Current { .. } => f.write_str("ok"),
            Self::Stale { days } => write!(f, "stale ({days} days)"),
        }
    }
}

/// Inclusive threshold: a submission exactly `stale_days` old is still current.
pub fn classify(last: Option<&NaiveDateTime>, now: &NaiveDateTime, stale_days: u32) -> SubmissionStatus {
    let Some(last) = last else {
        return SubmissionStatus::Missing;
    };
    let days = elapsed_days(last, now);
    if days <= i64::from(stale_days) {
        SubmissionStatus::Current { days }
    } else {
        SubmissionStatus::Stale { days }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recon::config::DEFAULT_STALE_DAYS;
    use chrono::{Duration, NaiveDate};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 30)
            .and_then(|d| d.and_hms_opt(9, 0, 0))
            .expect("valid datetime")
    }

    #[test]
    fn missing_without_timestamp() {
        assert_eq!(classify(None, &now(), DEFAULT_STALE_DAYS), SubmissionStatus::Missing);
    }

    #[test]
    fn threshold_is_inclusive() {
        let now = now();
        let day29 = now - Duration::days(29);
        let day30 = now - Duration::days(30);
        let day31 = now - Duration::days(31);
        assert_eq!(classify(Some(&day29), &now, 30), SubmissionStatus::Current { days: 29 });
        assert_eq!(classify(Some(&day30), &now, 30), SubmissionStatus::Current { days: 30 });
        assert_eq!(classify(Some(&day31), &now, 30), SubmissionStatus::Stale { days: 31 });
    }

    #[test]
    fn threshold_is_a_parameter() {
        let now = now();
        let day10 = now - Duration::days(10);
        assert!(classify(Some(&day10), &now, 7).is_stale());
        assert!(classify(Some(&day10), &now, 14).is_current());
    }

    #[test]
    fn future_timestamps_count_as_current() {
        let now = now();
        let ahead = now + Duration::hours(5);
        assert!(classify(Some(&ahead), &now, 30).is_current());
    }

    #[test]
    fn display_matches_report_text() {
        assert_eq!(SubmissionStatus::Missing.to_string(), "missing");
        assert_eq!(SubmissionStatus::Current { days: 3 }.to_string(), "ok");
        assert_eq!(SubmissionStatus::Stale { days: 45 }.to_string(), "stale (45 days)");
    }
}
