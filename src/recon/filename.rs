//! Device identity and capture time from artifact filenames.
//!
//! Client scripts name their uploads `<device>_<user>_<date>_<time>.<ext>`,
//! with two date/time spellings in the wild. Each spelling is a [`Grammar`]:
//! a named, pure function from filename to timestamp. Grammars are tried in
//! order and the first one that yields a valid timestamp wins.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::sync::LazyLock;

use crate::error::ReconError;

#[derive(Debug, Clone, Copy)]
pub struct Grammar {
    pub name: &'static str,
    pub parse: fn(&str) -> Option<NaiveDateTime>,
}

/// Browser inventory logs first, then photos.
pub const GRAMMARS: &[Grammar] = &[
    Grammar {
        name: "log",
        parse: parse_log_timestamp,
    },
    Grammar {
        name: "photo",
        parse: parse_photo_timestamp,
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub device: String,
    pub user: String,
    pub timestamp: Option<NaiveDateTime>,
    pub grammar: Option<&'static str>,
}

static LOG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+)_(.+)_(\d{4}-\d{2}-\d{2})_(.+)\.([A-Za-z0-9]+)$")
        .expect("log filename pattern is valid")
});

static PHOTO_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+)_(.+)_(\d{8})_(\d{6})\.([A-Za-z0-9]+)$")
        .expect("photo filename pattern is valid")
});

/// `<device>_<user>_<YYYY-MM-DD>_<time>.<ext>` where the time field holds six
/// digits with optional separators (`103000`, `10-30-00`, `10:30:00`, `10_30_00`).
pub fn parse_log_timestamp(name: &str) -> Option<NaiveDateTime> {
    let caps = LOG_PATTERN.captures(name)?;
    let date = NaiveDate::parse_from_str(&caps[3], "%Y-%m-%d").ok()?;
    let digits: String = caps[4].chars().filter(|c| !"-:_ .".contains(*c)).collect();
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let time = NaiveTime::parse_from_str(&digits, "%H%M%S").ok()?;
    Some(date.and_time(time))
}

/// `<device>_<user>_<YYYYMMDD>_<HHMMSS>.<ext>`.
pub fn parse_photo_timestamp(name: &str) -> Option<NaiveDateTime> {
    let caps = PHOTO_PATTERN.captures(name)?;
    let date = NaiveDate::parse_from_str(&caps[3], "%Y%m%d").ok()?;
    let time = NaiveTime::parse_from_str(&caps[4], "%H%M%S").ok()?;
    Some(date.and_time(time))
}

pub fn parse_timestamp(name: &str) -> Option<(&'static str, NaiveDateTime)> {
    GRAMMARS
        .iter()
        .find_map(|grammar| (grammar.parse)(name).map(|ts| (grammar.name, ts)))
}

fn file_stem(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

/// Device and user are always the first two `_` fields of the stem, even when
/// no grammar recognises the date portion.
pub fn parse_filename(name: &str) -> Result<ParsedName, ReconError> {
    let mut parts = file_stem(name).split('_');
    let device = parts.next().unwrap_or_default().trim();
    let user = parts.next().unwrap_or_default().trim();
    if device.is_empty() || user.is_empty() {
        return Err(ReconError::parse(
            name,
            "expected <device>_<user>_... segments",
        ));
    }

    let parsed = parse_timestamp(name);
    Ok(ParsedName {
        device: device.to_string(),
        user: user.to_string(),
        timestamp: parsed.map(|(_, ts)| ts),
        grammar: parsed.map(|(grammar, _)| grammar),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .and_then(|date| date.and_hms_opt(h, mi, s))
            .expect("valid datetime")
    }

    #[test]
    fn browser_log_name_parses() {
        let got = parse_filename("PC01_alice_2024-05-01_103000.json").expect("parse");
        assert_eq!(got.device, "PC01");
        assert_eq!(got.user, "alice");
        assert_eq!(got.timestamp, Some(ts(2024, 5, 1, 10, 30, 0)));
        assert_eq!(got.grammar, Some("log"));
    }

    #[test]
    fn photo_name_parses() {
        let got = parse_filename("PC02_bob_20240501_103000.jpg").expect("parse");
        assert_eq!(got.device, "PC02");
        assert_eq!(got.user, "bob");
        assert_eq!(got.timestamp, Some(ts(2024, 5, 1, 10, 30, 0)));
        assert_eq!(got.grammar, Some("photo"));
    }

    #[test]
    fn log_time_separators_are_normalized() {
        for name in [
            "PC01_alice_2024-05-01_10-30-00.json",
            "PC01_alice_2024-05-01_10:30:00.json",
            "PC01_alice_2024-05-01_10_30_00.json",
        ] {
            assert_eq!(
                parse_log_timestamp(name),
                Some(ts(2024, 5, 1, 10, 30, 0)),
                "{name}"
            );
        }
    }

    #[test]
    fn missing_date_segments_keep_identity() {
        let got = parse_filename("PC03_carol.json").expect("parse");
        assert_eq!(got.device, "PC03");
        assert_eq!(got.user, "carol");
        assert_eq!(got.timestamp, None);
        assert_eq!(got.grammar, None);

        let got = parse_filename("PC03_carol_latest.json").expect("parse");
        assert_eq!(got.user, "carol");
        assert_eq!(got.timestamp, None);
    }

    #[test]
    fn invalid_calendar_date_yields_null_timestamp() {
        let got = parse_filename("PC04_dave_2024-13-01_103000.json").expect("parse");
        assert_eq!(got.device, "PC04");
        assert_eq!(got.timestamp, None);

        let got = parse_filename("PC04_dave_20240230_103000.jpg").expect("parse");
        assert_eq!(got.timestamp, None);
    }

    #[test]
    fn names_without_two_segments_fail() {
        assert!(parse_filename("PC05.json").is_err());
        assert!(parse_filename("_alice_2024-05-01_103000.json").is_err());
    }

    #[test]
    fn grammars_are_independent() {
        assert_eq!(parse_photo_timestamp("PC01_alice_2024-05-01_103000.json"), None);
        assert_eq!(parse_log_timestamp("PC02_bob_20240501_103000.jpg"), None);
    }
}
