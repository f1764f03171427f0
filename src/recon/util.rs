use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Storage format for every timestamp the tool persists.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Wall-clock time in the machine's local zone, which is the zone the
/// client scripts stamp their filenames in.
pub fn now_local() -> NaiveDateTime {
    Local::now().naive_local()
}

pub fn now_epoch_secs() -> Result<u64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn format_optional(ts: Option<&NaiveDateTime>) -> String {
    ts.map(format_timestamp).unwrap_or_default()
}

/// Empty cells are `None`; anything else must match [`TIMESTAMP_FORMAT`].
pub fn parse_optional(raw: &str) -> Result<Option<NaiveDateTime>, chrono::ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    NaiveDateTime::parse_from_str(trimmed, TIMESTAMP_FORMAT).map(Some)
}

/// Whole days elapsed from `then` to `now`, rounded towards negative infinity.
pub fn elapsed_days(then: &NaiveDateTime, now: &NaiveDateTime) -> i64 {
    let secs = now.signed_duration_since(*then).num_seconds();
    secs.div_euclid(86_400)
}

pub fn year_month(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m").to_string()
}

pub fn file_sha256(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Replace `path` with `bytes` through a sibling temp file and a rename, so a
/// crash mid-write leaves the previous content in place.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create temp file in {}", parent.display()))?;
    tmp.write_all(bytes)
        .with_context(|| format!("failed to write temp file for {}", path.display()))?;
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("failed to sync temp file for {}", path.display()))?;
    tmp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}
