use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::recon::kind::ArtifactKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevcheckPaths {
    pub home: PathBuf,
    pub registry: PathBuf,
    pub browser_logs_dir: PathBuf,
    pub face_photos_dir: PathBuf,
    pub archive_root: PathBuf,
    pub history_file: PathBuf,
    pub summary_file: PathBuf,
    pub legacy_file: PathBuf,
    pub reports_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl DevcheckPaths {
    pub fn under(home: PathBuf) -> Self {
        Self {
            registry: home.join("registry.csv"),
            browser_logs_dir: home.join("browser_logs"),
            face_photos_dir: home.join("face_photos"),
            archive_root: home.join("archives"),
            history_file: home.join("history.csv"),
            summary_file: home.join("summary.csv"),
            legacy_file: home.join("reconciliation.csv"),
            reports_dir: home.join("reports"),
            logs_dir: home.join("logs"),
            home,
        }
    }

    pub fn artifact_dir(&self, kind: ArtifactKind) -> &PathBuf {
        match kind {
            ArtifactKind::BrowserLog => &self.browser_logs_dir,
            ArtifactKind::FacePhoto => &self.face_photos_dir,
        }
    }
}

/// Path overrides read from the `[paths]` table of the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartialPaths {
    pub registry: Option<PathBuf>,
    pub browser_logs_dir: Option<PathBuf>,
    pub face_photos_dir: Option<PathBuf>,
    pub archive_root: Option<PathBuf>,
    pub history_file: Option<PathBuf>,
    pub summary_file: Option<PathBuf>,
    pub legacy_file: Option<PathBuf>,
    pub reports_dir: Option<PathBuf>,
    pub logs_dir: Option<PathBuf>,
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

fn resolve_home() -> Result<PathBuf> {
    match env::var("DEVCHECK_HOME") {
        Ok(v) if !v.trim().is_empty() => Ok(PathBuf::from(v.trim())),
        _ => env::current_dir().context("current directory could not be resolved"),
    }
}

pub fn resolve_paths(file: &PartialPaths) -> Result<DevcheckPaths> {
    let mut paths = DevcheckPaths::under(resolve_home()?);

    let overlay = |slot: &mut PathBuf, from_file: &Option<PathBuf>, var: &str| {
        if let Some(p) = from_file {
            *slot = p.clone();
        }
        *slot = env_or_default_path(var, slot.clone());
    };

    overlay(&mut paths.registry, &file.registry, "DEVCHECK_REGISTRY");
    overlay(
        &mut paths.browser_logs_dir,
        &file.browser_logs_dir,
        "DEVCHECK_BROWSER_LOGS_DIR",
    );
    overlay(
        &mut paths.face_photos_dir,
        &file.face_photos_dir,
        "DEVCHECK_FACE_PHOTOS_DIR",
    );
    overlay(&mut paths.archive_root, &file.archive_root, "DEVCHECK_ARCHIVE_ROOT");
    overlay(&mut paths.history_file, &file.history_file, "DEVCHECK_HISTORY_FILE");
    overlay(&mut paths.summary_file, &file.summary_file, "DEVCHECK_SUMMARY_FILE");
    overlay(&mut paths.legacy_file, &file.legacy_file, "DEVCHECK_LEGACY_FILE");
    overlay(&mut paths.reports_dir, &file.reports_dir, "DEVCHECK_REPORTS_DIR");
    overlay(&mut paths.logs_dir, &file.logs_dir, "DEVCHECK_LOGS_DIR");

    Ok(paths)
}
