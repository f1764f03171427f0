use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::ReconError;
use crate::recon::filename::parse_filename;
use crate::recon::kind::ArtifactKind;
use crate::recon::warn::{self, WarnEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFile {
    pub filename: String,
    pub device: String,
    pub user: String,
    pub timestamp: Option<NaiveDateTime>,
    pub path: PathBuf,
    pub kind: ArtifactKind,
    pub modified: Option<SystemTime>,
}

/// Every artifact file in a folder, visited in filename order.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub files: Vec<ArtifactFile>,
    /// Names matching the extension filter that carry no device/user pair.
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ScanResult {
    pub kind: ArtifactKind,
    pub folder: PathBuf,
    pub latest: BTreeMap<String, ArtifactFile>,
    pub matched: usize,
    pub skipped: Vec<String>,
    pub unparsed_timestamps: usize,
    /// False when the folder could not be read; the kind counts as absent.
    pub available: bool,
}

impl ScanResult {
    pub fn absent(kind: ArtifactKind, folder: &Path) -> Self {
        Self {
            kind,
            folder: folder.to_path_buf(),
            latest: BTreeMap::new(),
            matched: 0,
            skipped: Vec::new(),
            unparsed_timestamps: 0,
            available: false,
        }
    }

    pub fn get(&self, device: &str) -> Option<&ArtifactFile> {
        self.latest.get(device)
    }

    /// Devices whose selected artifact has no usable filename timestamp.
    pub fn needs_review(&self) -> Vec<&str> {
        self.latest
            .values()
            .filter(|file| file.timestamp.is_none())
            .map(|file| file.device.as_str())
            .collect()
    }
}

fn read_folder_error(folder: &Path, err: std::io::Error) -> ReconError {
    if err.kind() == ErrorKind::NotFound {
        ReconError::NotFound {
            what: "artifact folder",
            path: folder.to_path_buf(),
        }
    } else {
        ReconError::io(folder, err)
    }
}

pub fn list_artifacts(
    folder: &Path,
    kind: ArtifactKind,
    extension: &str,
) -> Result<Listing, ReconError> {
    let root = std::path::absolute(folder).map_err(|err| ReconError::io(folder, err))?;
    let read_dir = fs::read_dir(&root).map_err(|err| read_folder_error(folder, err))?;
    let suffix = format!(".{extension}");

    let mut entries = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|err| ReconError::io(&root, err))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(ToOwned::to_owned) else {
            continue;
        };
        if !name.ends_with(&suffix) {
            continue;
        }
        let modified = entry.metadata().ok().and_then(|meta| meta.modified().ok());
        entries.push((name, path, modified));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut listing = Listing::default();
    for (name, path, modified) in entries {
        match parse_filename(&name) {
            Ok(parsed) => listing.files.push(ArtifactFile {
                filename: name,
                device: parsed.device,
                user: parsed.user,
                timestamp: parsed.timestamp,
                path,
                kind,
                modified,
            }),
            Err(_) => listing.skipped.push(name),
        }
    }
    Ok(listing)
}

/// Whether `candidate` should replace the current best file for its device.
///
/// A parsed timestamp always beats a missing one, and only a strictly newer
/// timestamp displaces the incumbent. Between two files without timestamps
/// the strictly newer modification time wins.
pub fn supersedes(candidate: &ArtifactFile, incumbent: &ArtifactFile) -> bool {
    match (candidate.timestamp, incumbent.timestamp) {
        (Some(new), Some(old)) => new > old,
        (Some(_), None) => true,
        (None, Some(_)) => false,
        (None, None) => match (candidate.modified, incumbent.modified) {
            (Some(new), Some(old)) => new > old,
            (Some(_), None) => true,
            _ => false,
        },
    }
}

pub fn reduce_latest(files: Vec<ArtifactFile>) -> BTreeMap<String, ArtifactFile> {
    let mut latest: BTreeMap<String, ArtifactFile> = BTreeMap::new();
    for file in files {
        match latest.get(&file.device) {
            Some(incumbent) if !supersedes(&file, incumbent) => {}
            _ => {
                latest.insert(file.device.clone(), file);
            }
        }
    }
    latest
}

pub fn scan(folder: &Path, kind: ArtifactKind, extension: &str) -> Result<ScanResult, ReconError> {
    let listing = list_artifacts(folder, kind, extension)?;
    let matched = listing.files.len() + listing.skipped.len();
    let unparsed_timestamps = listing
        .files
        .iter()
        .filter(|file| file.timestamp.is_none())
        .count();

    Ok(ScanResult {
        kind,
        folder: folder.to_path_buf(),
        latest: reduce_latest(listing.files),
        matched,
        skipped: listing.skipped,
        unparsed_timestamps,
        available: true,
    })
}

/// [`scan`] that reports a failure and degrades to an empty result.
pub fn scan_or_absent(folder: &Path, kind: ArtifactKind, extension: &str) -> ScanResult {
    match scan(folder, kind, extension) {
        Ok(result) => {
            for device in result.needs_review() {
                warn::emit(WarnEvent {
                    code: "NEEDS_REVIEW",
                    stage: "scan",
                    action: "select-latest",
                    target: device,
                    reason: "selected-file-has-no-timestamp",
                    err: kind.as_str(),
                });
            }
            result
        }
        Err(err) => {
            warn::emit_error(
                "scan",
                "read-folder",
                &folder.display().to_string(),
                &format!("{}-treated-as-absent", kind.as_str()),
                &err,
            );
            ScanResult::absent(kind, folder)
        }
    }
}
