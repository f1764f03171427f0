use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ErrorCode, ReconError};
use crate::recon::kind::ArtifactKind;
use crate::recon::scanner::{ArtifactFile, list_artifacts};
use crate::recon::util::{elapsed_days, file_sha256, write_atomic, year_month};
use crate::recon::warn::{self, WarnEvent};

/// Artifact files of one kind grouped by the `YYYY-MM` of their own
/// filename timestamp.
#[derive(Debug, Clone, Default)]
pub struct Buckets {
    pub by_month: BTreeMap<String, Vec<ArtifactFile>>,
    /// Files whose name yields no timestamp, plus names without a device.
    pub unparsed: Vec<String>,
}

impl Buckets {
    pub fn total(&self) -> usize {
        self.by_month.values().map(Vec::len).sum()
    }

    pub fn count(&self, month: &str) -> usize {
        self.by_month.get(month).map(Vec::len).unwrap_or(0)
    }
}

pub fn bucket_files(
    folder: &Path,
    kind: ArtifactKind,
    extension: &str,
) -> Result<Buckets, ReconError> {
    let listing = list_artifacts(folder, kind, extension)?;
    let mut buckets = Buckets {
        unparsed: listing.skipped,
        ..Buckets::default()
    };
    for file in listing.files {
        match file.timestamp {
            Some(ts) => buckets.by_month.entry(year_month(&ts)).or_default().push(file),
            None => buckets.unparsed.push(file.filename),
        }
    }
    Ok(buckets)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArchiveOutcome {
    pub kind: String,
    pub scanned: usize,
    pub archived: usize,
    pub already_archived: usize,
    pub retained: usize,
    pub skipped_unparsed: usize,
    pub failed: usize,
    pub folder_missing: bool,
}

pub fn archive_destination(archive_root: &Path, kind: ArtifactKind, month: &str, name: &str) -> PathBuf {
    archive_root.join(kind.archive_dir()).join(month).join(name)
}

fn same_content(source: &Path, dest: &Path) -> Result<bool> {
    let Ok(dest_meta) = fs::metadata(dest) else {
        return Ok(false);
    };
    let source_meta =
        fs::metadata(source).with_context(|| format!("failed to stat {}", source.display()))?;
    if source_meta.len() != dest_meta.len() {
        return Ok(false);
    }
    Ok(file_sha256(source)? == file_sha256(dest)?)
}

enum CopyResult {
    Copied,
    AlreadyPresent,
}

fn copy_into_archive(source: &Path, dest: &Path) -> Result<CopyResult> {
    if same_content(source, dest)? {
        return Ok(CopyResult::AlreadyPresent);
    }
    let bytes = fs::read(source).with_context(|| format!("failed to read {}", source.display()))?;
    write_atomic(dest, &bytes)?;
    Ok(CopyResult::Copied)
}

/// Copy every file older than `retention_days` into its month bucket under
/// `archive_root`. Sources are never removed.
pub fn archive(
    folder: &Path,
    kind: ArtifactKind,
    extension: &str,
    archive_root: &Path,
    retention_days: u32,
    now: &NaiveDateTime,
) -> ArchiveOutcome {
    let mut outcome = ArchiveOutcome {
        kind: kind.as_str().to_string(),
        ..ArchiveOutcome::default()
    };
    let buckets = match bucket_files(folder, kind, extension) {
        Ok(buckets) => buckets,
        Err(err) => {
            warn::emit_error(
                "archive",
                "read-folder",
                &folder.display().to_string(),
                "nothing-archived",
                &err,
            );
            outcome.folder_missing = true;
            return outcome;
        }
    };

    outcome.skipped_unparsed = buckets.unparsed.len();
    outcome.scanned = buckets.total() + outcome.skipped_unparsed;

    for (month, files) in &buckets.by_month {
        for file in files {
            let Some(ts) = file.timestamp else {
                continue;
            };
            if elapsed_days(&ts, now) <= i64::from(retention_days) {
                outcome.retained += 1;
                continue;
            }
            let dest = archive_destination(archive_root, kind, month, &file.filename);
            match copy_into_archive(&file.path, &dest) {
                Ok(CopyResult::Copied) => outcome.archived += 1,
                Ok(CopyResult::AlreadyPresent) => outcome.already_archived += 1,
                Err(err) => {
                    outcome.failed += 1;
                    warn::emit(WarnEvent {
                        code: ErrorCode::E003IoFailure.as_str(),
                        stage: "archive",
                        action: "copy",
                        target: &file.path.display().to_string(),
                        reason: "copy-failed-continuing",
                        err: &format!("{err:#}"),
                    });
                }
            }
        }
    }

    outcome
}
