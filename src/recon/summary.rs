use anyhow::Result;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;
use std::path::Path;

use crate::recon::classify::{SubmissionStatus, classify};
use crate::recon::ledger::Ledger;
use crate::recon::registry::Registry;
use crate::recon::util::{format_optional, write_atomic};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Overall {
    Complete,
    Partial,
    Incomplete,
}

impl Overall {
    pub fn from_statuses(browser: SubmissionStatus, photo: SubmissionStatus) -> Self {
        match (browser.is_current(), photo.is_current()) {
            (true, true) => Self::Complete,
            (true, false) | (false, true) => Self::Partial,
            (false, false) => Self::Incomplete,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Partial => "partial",
            Self::Incomplete => "incomplete",
        }
    }
}

impl fmt::Display for Overall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub device: String,
    pub user: String,
    pub os: String,
    pub browser_status: SubmissionStatus,
    pub photo_status: SubmissionStatus,
    pub extension_count: usize,
    pub browser_time: Option<NaiveDateTime>,
    pub photo_time: Option<NaiveDateTime>,
    pub overall: Overall,
}

/// One row per registry device, in registry order. Ledger rows for devices
/// the registry no longer lists are ignored.
pub fn build(
    registry: &Registry,
    ledger: &Ledger,
    now: &NaiveDateTime,
    stale_days: u32,
) -> Vec<SummaryRow> {
    registry
        .iter()
        .map(|device| {
            let history = ledger.get(&device.device);
            let browser_time = history.and_then(|row| row.browser_time);
            let photo_time = history.and_then(|row| row.photo_time);
            let browser_status = classify(browser_time.as_ref(), now, stale_days);
            let photo_status = classify(photo_time.as_ref(), now, stale_days);
            SummaryRow {
                device: device.device.clone(),
                user: device.user.clone(),
                os: device.os.clone(),
                browser_status,
                photo_status,
                extension_count: history.map(|row| row.extension_count).unwrap_or(0),
                browser_time,
                photo_time,
                overall: Overall::from_statuses(browser_status, photo_status),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryStats {
    pub total: usize,
    pub complete: usize,
    pub partial: usize,
    pub incomplete: usize,
    /// Devices not yet complete, in registry order.
    pub pending: Vec<String>,
}

impl SummaryStats {
    pub fn from_rows(rows: &[SummaryRow]) -> Self {
        let mut stats = Self {
            total: rows.len(),
            ..Self::default()
        };
        for row in rows {
            match row.overall {
                Overall::Complete => stats.complete += 1,
                Overall::Partial => stats.partial += 1,
                Overall::Incomplete => stats.incomplete += 1,
            }
            if row.overall != Overall::Complete {
                stats.pending.push(row.device.clone());
            }
        }
        stats
    }

    /// Fraction of devices that are complete; 0 for an empty registry.
    pub fn completion_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.complete as f64 / self.total as f64
        }
    }

    pub fn completion_percent(&self) -> f64 {
        self.completion_rate() * 100.0
    }
}

#[derive(Debug, Serialize)]
struct SummaryCsvRow<'a> {
    device: &'a str,
    user: &'a str,
    os: &'a str,
    browser_status: String,
    photo_status: String,
    extension_count: usize,
    browser_time: String,
    photo_time: String,
    overall: &'static str,
}

#[derive(Debug, Serialize)]
struct LegacyCsvRow<'a> {
    device: &'a str,
    user: &'a str,
    browser: String,
    photo: String,
    overall: &'static str,
}

pub fn summary_csv(rows: &[SummaryRow]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if rows.is_empty() {
        writer.write_record([
            "device",
            "user",
            "os",
            "browser_status",
            "photo_status",
            "extension_count",
            "browser_time",
            "photo_time",
            "overall",
        ])?;
    }
    for row in rows {
        writer.serialize(SummaryCsvRow {
            device: &row.device,
            user: &row.user,
            os: &row.os,
            browser_status: row.browser_status.to_string(),
            photo_status: row.photo_status.to_string(),
            extension_count: row.extension_count,
            browser_time: format_optional(row.browser_time.as_ref()),
            photo_time: format_optional(row.photo_time.as_ref()),
            overall: row.overall.as_str(),
        })?;
    }
    Ok(writer.into_inner().map_err(|err| err.into_error())?)
}

/// Status-only export kept for consumers of the older five-column sheet.
pub fn legacy_csv(rows: &[SummaryRow]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if rows.is_empty() {
        writer.write_record(["device", "user", "browser", "photo", "overall"])?;
    }
    for row in rows {
        writer.serialize(LegacyCsvRow {
            device: &row.device,
            user: &row.user,
            browser: row.browser_status.to_string(),
            photo: row.photo_status.to_string(),
            overall: row.overall.as_str(),
        })?;
    }
    Ok(writer.into_inner().map_err(|err| err.into_error())?)
}

pub fn write_summary(path: &Path, rows: &[SummaryRow]) -> Result<()> {
    write_atomic(path, &summary_csv(rows)?)
}

pub fn write_legacy(path: &Path, rows: &[SummaryRow]) -> Result<()> {
    write_atomic(path, &legacy_csv(rows)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recon::ledger::SubmissionUpdate;
    use crate::recon::registry::DeviceRecord;
    use chrono::{Duration, NaiveDate};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 30)
            .and_then(|d| d.and_hms_opt(9, 0, 0))
            .expect("valid datetime")
    }

    fn device(name: &str, user: &str) -> DeviceRecord {
        DeviceRecord {
            device: name.to_string(),
            user: user.to_string(),
            os: "Windows 11".to_string(),
            captured_at: String::new(),
        }
    }

    fn fixture() -> (Registry, Ledger) {
        let now = now();
        let recent = now - Duration::days(3);
        let registry = Registry::from_records([
            device("A", "alice"),
            device("B", "bob"),
            device("C", "carol"),
        ]);
        let mut ledger = Ledger::new();
        ledger.upsert(
            SubmissionUpdate {
                device: "A".to_string(),
                user: "alice".to_string(),
                browser_time: Some(recent),
                photo_time: Some(recent),
                extension_count: 5,
            },
            now,
        );
        ledger.upsert(
            SubmissionUpdate {
                device: "B".to_string(),
                user: "bob".to_string(),
                browser_time: Some(recent),
                photo_time: Some(now - Duration::days(45)),
                extension_count: 2,
            },
            now,
        );
        ledger.upsert(
            SubmissionUpdate {
                device: "Z".to_string(),
                user: "retired".to_string(),
                browser_time: Some(recent),
                photo_time: Some(recent),
                extension_count: 1,
            },
            now,
        );
        (registry, ledger)
    }

    #[test]
    fn classifies_complete_partial_incomplete() {
        let (registry, ledger) = fixture();
        let rows = build(&registry, &ledger, &now(), 30);
        let got = rows
            .iter()
            .map(|r| (r.device.as_str(), r.overall))
            .collect::<Vec<_>>();
        assert_eq!(
            got,
            vec![
                ("A", Overall::Complete),
                ("B", Overall::Partial),
                ("C", Overall::Incomplete),
            ]
        );
        assert_eq!(rows[1].photo_status, SubmissionStatus::Stale { days: 45 });
        assert_eq!(rows[2].browser_status, SubmissionStatus::Missing);
        assert_eq!(rows[2].extension_count, 0);

        let stats = SummaryStats::from_rows(&rows);
        assert_eq!((stats.complete, stats.partial, stats.incomplete), (1, 1, 1));
        assert!((stats.completion_rate() - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.pending, vec!["B".to_string(), "C".to_string()]);
    }

    #[test]
    fn ledger_only_devices_are_not_reported() {
        let (registry, ledger) = fixture();
        let rows = build(&registry, &ledger, &now(), 30);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.device != "Z"));
    }

    #[test]
    fn both_stale_is_incomplete() {
        let stale = SubmissionStatus::Stale { days: 40 };
        assert_eq!(Overall::from_statuses(stale, stale), Overall::Incomplete);
        assert_eq!(
            Overall::from_statuses(SubmissionStatus::Missing, SubmissionStatus::Current { days: 0 }),
            Overall::Partial
        );
    }

    #[test]
    fn empty_registry_has_zero_rate() {
        assert_eq!(SummaryStats::from_rows(&[]).completion_rate(), 0.0);
    }

    #[test]
    fn csv_exports_render_status_text() {
        let (registry, ledger) = fixture();
        let rows = build(&registry, &ledger, &now(), 30);

        let summary = String::from_utf8(summary_csv(&rows).expect("csv")).expect("utf8");
        let mut lines = summary.lines();
        assert_eq!(
            lines.next(),
            Some("device,user,os,browser_status,photo_status,extension_count,browser_time,photo_time,overall")
        );
        assert_eq!(
            lines.next(),
            Some("A,alice,Windows 11,ok,ok,5,2024-06-27 09:00:00,2024-06-27 09:00:00,complete")
        );

        let legacy = String::from_utf8(legacy_csv(&rows).expect("csv")).expect("utf8");
        assert!(legacy.starts_with("device,user,browser,photo,overall\n"));
        assert!(legacy.contains("B,bob,ok,stale (45 days),partial"));
        assert!(legacy.contains("C,carol,missing,missing,incomplete"));
    }
}
