//! Device-keyed submission history persisted as CSV.
//!
//! The ledger is the only writer of [`HistoryRow`]s. Rows are never deleted;
//! each reconciliation run loads the table, upserts one row per registry
//! device and rewrites the file wholesale. Concurrent runs against the same
//! file race on that cycle and can lose updates.

use anyhow::Result;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{ErrorCode, ReconError};
use crate::recon::util::{format_optional, now_epoch_secs, parse_optional, write_atomic};
use crate::recon::warn::{self, WarnEvent};

pub const COLUMNS: [&str; 6] = [
    "device",
    "user",
    "browser_time",
    "photo_time",
    "extension_count",
    "last_reconciled",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow {
    pub device: String,
    pub user: String,
    pub browser_time: Option<NaiveDateTime>,
    pub photo_time: Option<NaiveDateTime>,
    pub extension_count: usize,
    pub last_reconciled: Option<NaiveDateTime>,
}

/// Fields observed for one device in one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionUpdate {
    pub device: String,
    pub user: String,
    pub browser_time: Option<NaiveDateTime>,
    pub photo_time: Option<NaiveDateTime>,
    pub extension_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    device: String,
    #[serde(default)]
    user: String,
    #[serde(default)]
    browser_time: String,
    #[serde(default)]
    photo_time: String,
    #[serde(default)]
    extension_count: String,
    #[serde(default)]
    last_reconciled: String,
}

impl CsvRow {
    fn into_row(self) -> Result<HistoryRow, ReconError> {
        let device = self.device.trim().to_string();
        let bad = |field: &str, value: &str| {
            ReconError::parse(
                format!("history row {device}"),
                format!("invalid {field} `{value}`"),
            )
        };
        let browser_time =
            parse_optional(&self.browser_time).map_err(|_| bad("browser_time", &self.browser_time))?;
        let photo_time =
            parse_optional(&self.photo_time).map_err(|_| bad("photo_time", &self.photo_time))?;
        let last_reconciled = parse_optional(&self.last_reconciled)
            .map_err(|_| bad("last_reconciled", &self.last_reconciled))?;
        let extension_count = match self.extension_count.trim() {
            "" => 0,
            raw => raw
                .parse::<usize>()
                .map_err(|_| bad("extension_count", raw))?,
        };
        Ok(HistoryRow {
            device: device.clone(),
            user: self.user.trim().to_string(),
            browser_time,
            photo_time,
            extension_count,
            last_reconciled,
        })
    }

    fn from_row(row: &HistoryRow) -> Self {
        Self {
            device: row.device.clone(),
            user: row.user.clone(),
            browser_time: format_optional(row.browser_time.as_ref()),
            photo_time: format_optional(row.photo_time.as_ref()),
            extension_count: row.extension_count.to_string(),
            last_reconciled: format_optional(row.last_reconciled.as_ref()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    rows: BTreeMap<String, HistoryRow>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, device: &str) -> Option<&HistoryRow> {
        self.rows.get(device)
    }

    pub fn rows(&self) -> impl Iterator<Item = &HistoryRow> {
        self.rows.values()
    }

    /// Insert a first observation or refresh an existing row.
    ///
    /// On an existing row, the browser time and extension count move
    /// together and only when a browser time is supplied; the photo time
    /// moves only when supplied; the recorded user is kept. The
    /// `last_reconciled` stamp is always set to `now`.
    pub fn upsert(&mut self, update: SubmissionUpdate, now: NaiveDateTime) -> &HistoryRow {
        let row = self
            .rows
            .entry(update.device.clone())
            .and_modify(|row| {
                if update.browser_time.is_some() {
                    row.browser_time = update.browser_time;
                    row.extension_count = update.extension_count;
                }
                if update.photo_time.is_some() {
                    row.photo_time = update.photo_time;
                }
            })
            .or_insert_with(|| HistoryRow {
                device: update.device.clone(),
                user: update.user.clone(),
                browser_time: update.browser_time,
                photo_time: update.photo_time,
                extension_count: update.extension_count,
                last_reconciled: None,
            });
        row.last_reconciled = Some(now);
        row
    }

    pub fn parse_csv(raw: &str) -> Result<Self, ReconError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(raw.as_bytes());
        let mut ledger = Ledger::new();
        for record in reader.deserialize::<CsvRow>() {
            let record = record.map_err(|err| ReconError::parse("history ledger", err))?;
            if record.device.trim().is_empty() {
                continue;
            }
            let row = record.into_row()?;
            // A hand-edited file may repeat a device; the later row wins.
            ledger.rows.insert(row.device.clone(), row);
        }
        Ok(ledger)
    }

    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        if self.rows.is_empty() {
            writer.write_record(COLUMNS)?;
        }
        for row in self.rows.values() {
            writer.serialize(CsvRow::from_row(row))?;
        }
        Ok(writer.into_inner().map_err(|err| err.into_error())?)
    }

    /// Strict load: a missing file is an empty ledger, a corrupt one is an error.
    pub fn load(path: &Path) -> Result<Self, ReconError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Self::new()),
            Err(err) => return Err(ReconError::io(path, err)),
        };
        Self::parse_csv(&raw)
    }

    /// Lenient load used by reconciliation: an unreadable ledger is reported
    /// and replaced by an empty one instead of stopping the run. The bad file
    /// is copied aside first so the next save cannot erase it.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(ledger) => ledger,
            Err(err) => {
                warn::emit_error(
                    "ledger",
                    "load",
                    &path.display().to_string(),
                    "unreadable-ledger-started-empty",
                    &err,
                );
                set_aside(path);
                Self::new()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_atomic(path, &self.to_csv()?)
    }
}

/// Copy an unreadable ledger to `<path>.corrupt-<epoch>`. Returns the copy's
/// path, or `None` after warning that the only copy is about to be replaced.
fn set_aside(path: &Path) -> Option<PathBuf> {
    let copied = now_epoch_secs().and_then(|secs| {
        let mut aside = path.as_os_str().to_owned();
        aside.push(format!(".corrupt-{secs}"));
        let aside = PathBuf::from(aside);
        fs::copy(path, &aside).map_err(|err| ReconError::io(&aside, err))?;
        Ok(aside)
    });
    match copied {
        Ok(aside) => Some(aside),
        Err(err) => {
            warn::emit(WarnEvent {
                code: ErrorCode::E003IoFailure.as_str(),
                stage: "ledger",
                action: "copy-aside",
                target: &path.display().to_string(),
                reason: "corrupt-ledger-not-preserved",
                err: &format!("{err:#}"),
            });
            None
        }
    }
}
