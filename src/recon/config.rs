use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ReconError;
use crate::recon::kind::ArtifactKind;
use crate::recon::paths::{DevcheckPaths, PartialPaths, resolve_paths};

include!(concat!(env!("OUT_DIR"), "/devcheck_env_allowlist.rs"));

pub const DEFAULT_STALE_DAYS: u32 = 30;
pub const DEFAULT_RETENTION_DAYS: u32 = 90;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DevcheckThresholds {
    pub stale_days: u32,
    pub retention_days: u32,
}

impl Default for DevcheckThresholds {
    fn default() -> Self {
        Self {
            stale_days: DEFAULT_STALE_DAYS,
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DevcheckArtifactsConfig {
    pub browser_log_extension: String,
    pub face_photo_extension: String,
}

impl Default for DevcheckArtifactsConfig {
    fn default() -> Self {
        Self {
            browser_log_extension: ArtifactKind::BrowserLog.default_extension().to_string(),
            face_photo_extension: ArtifactKind::FacePhoto.default_extension().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DevcheckNotifyConfig {
    pub endpoint: Option<String>,
    pub max_listed: usize,
    pub timeout_secs: u64,
}

impl Default for DevcheckNotifyConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            max_listed: 10,
            timeout_secs: 10,
        }
    }
}

/// Everything a run needs; built once and handed to each component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevcheckConfig {
    pub paths: DevcheckPaths,
    pub thresholds: DevcheckThresholds,
    pub artifacts: DevcheckArtifactsConfig,
    pub notify: DevcheckNotifyConfig,
}

impl DevcheckConfig {
    #[cfg(test)]
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self {
            paths: DevcheckPaths::under(home.into()),
            thresholds: DevcheckThresholds::default(),
            artifacts: DevcheckArtifactsConfig::default(),
            notify: DevcheckNotifyConfig::default(),
        }
    }

    pub fn extension(&self, kind: ArtifactKind) -> &str {
        match kind {
            ArtifactKind::BrowserLog => &self.artifacts.browser_log_extension,
            ArtifactKind::FacePhoto => &self.artifacts.face_photo_extension,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialDevcheckConfig {
    paths: Option<PartialPaths>,
    thresholds: Option<DevcheckThresholds>,
    artifacts: Option<DevcheckArtifactsConfig>,
    notify: Option<DevcheckNotifyConfig>,
}

fn env_or_u32(var: &str, fallback: u32) -> u32 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u32>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_usize(var: &str, fallback: usize) -> usize {
    match env::var(var) {
        Ok(v) => v.trim().parse::<usize>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn env_or_optional_string(var: &str, fallback: Option<String>) -> Option<String> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        // An explicitly empty value switches notification off.
        Ok(_) => None,
        Err(_) => fallback,
    }
}

fn normalize_extension(raw: &str) -> String {
    raw.trim().trim_start_matches('.').to_string()
}

pub fn validate(cfg: &DevcheckConfig) -> Result<(), ReconError> {
    if cfg.thresholds.stale_days == 0 {
        return Err(ReconError::InvalidConfig(
            "stale_days must be >= 1".to_string(),
        ));
    }
    if cfg.thresholds.retention_days == 0 {
        return Err(ReconError::InvalidConfig(
            "retention_days must be >= 1".to_string(),
        ));
    }
    if cfg.notify.max_listed == 0 {
        return Err(ReconError::InvalidConfig(
            "notify.max_listed must be >= 1".to_string(),
        ));
    }
    if cfg.notify.timeout_secs == 0 {
        return Err(ReconError::InvalidConfig(
            "notify.timeout_secs must be >= 1".to_string(),
        ));
    }
    for kind in ArtifactKind::ALL {
        if cfg.extension(kind).is_empty() {
            return Err(ReconError::InvalidConfig(format!(
                "{} extension cannot be empty",
                kind.as_str()
            )));
        }
    }
    if let Some(endpoint) = &cfg.notify.endpoint
        && !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
    {
        return Err(ReconError::InvalidConfig(format!(
            "notify.endpoint must be an http(s) URL: {endpoint}"
        )));
    }
    Ok(())
}

pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("DEVCHECK_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    let home = dirs::home_dir()?;
    Some(home.join(".devcheck").join("devcheck.toml"))
}

fn read_file_config(path: Option<&Path>) -> Result<PartialDevcheckConfig> {
    let Some(path) = path else {
        return Ok(PartialDevcheckConfig::default());
    };
    if !path.exists() {
        return Ok(PartialDevcheckConfig::default());
    }

    let raw = fs::read_to_string(path)?;
    toml::from_str(&raw).map_err(|err| {
        anyhow!(ReconError::InvalidConfig(format!(
            "{}: {err}",
            path.display()
        )))
    })
}

pub fn load_config() -> Result<DevcheckConfig> {
    let config_path = resolve_config_path();
    let parsed = read_file_config(config_path.as_deref())?;

    let paths = resolve_paths(&parsed.paths.unwrap_or_default())?;
    let mut cfg = DevcheckConfig {
        paths,
        thresholds: parsed.thresholds.unwrap_or_default(),
        artifacts: parsed.artifacts.unwrap_or_default(),
        notify: parsed.notify.unwrap_or_default(),
    };

    cfg.thresholds.stale_days = env_or_u32("DEVCHECK_STALE_DAYS", cfg.thresholds.stale_days);
    cfg.thresholds.retention_days =
        env_or_u32("DEVCHECK_RETENTION_DAYS", cfg.thresholds.retention_days);
    cfg.artifacts.browser_log_extension = normalize_extension(&env_or_string(
        "DEVCHECK_BROWSER_LOG_EXT",
        &cfg.artifacts.browser_log_extension,
    ));
    cfg.artifacts.face_photo_extension = normalize_extension(&env_or_string(
        "DEVCHECK_FACE_PHOTO_EXT",
        &cfg.artifacts.face_photo_extension,
    ));
    cfg.notify.endpoint =
        env_or_optional_string("DEVCHECK_NOTIFY_ENDPOINT", cfg.notify.endpoint.take());
    cfg.notify.max_listed = env_or_usize("DEVCHECK_NOTIFY_MAX_LISTED", cfg.notify.max_listed);
    cfg.notify.timeout_secs =
        env_or_u64("DEVCHECK_NOTIFY_TIMEOUT_SECS", cfg.notify.timeout_secs);

    validate(&cfg)?;
    Ok(cfg)
}

/// `DEVCHECK_*` variables present in the environment that nothing reads.
pub fn unknown_env_vars() -> Vec<String> {
    let mut out = env::vars()
        .map(|(key, _)| key)
        .filter(|key| key.starts_with("DEVCHECK_"))
        .filter(|key| !GENERATED_ENV_ALLOWLIST.contains(&key.as_str()))
        .collect::<Vec<_>>();
    out.sort();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_validate() {
        let cfg = DevcheckConfig::with_home("/srv/devcheck");
        assert!(validate(&cfg).is_ok());
        assert_eq!(cfg.thresholds.stale_days, 30);
        assert_eq!(cfg.thresholds.retention_days, 90);
        assert_eq!(cfg.extension(ArtifactKind::FacePhoto), "jpg");
        assert_eq!(
            cfg.paths.artifact_dir(ArtifactKind::BrowserLog),
            &PathBuf::from("/srv/devcheck/browser_logs")
        );
    }

    #[test]
    fn generated_allowlist_holds_every_setting_and_no_log_marker() {
        for name in [
            "DEVCHECK_HOME",
            "DEVCHECK_CONFIG_PATH",
            "DEVCHECK_STALE_DAYS",
            "DEVCHECK_NOTIFY_TIMEOUT_SECS",
            "DEVCHECK_LOGS_DIR",
        ] {
            assert!(GENERATED_ENV_ALLOWLIST.contains(&name), "{name} missing");
        }
        assert!(!GENERATED_ENV_ALLOWLIST.contains(&"DEVCHECK_WARN"));
        assert!(!GENERATED_ENV_ALLOWLIST.contains(&"DEVCHECK_"));
    }

    #[test]
    fn zero_thresholds_are_rejected() {
        let mut cfg = DevcheckConfig::with_home("/srv/devcheck");
        cfg.thresholds.stale_days = 0;
        assert!(validate(&cfg).is_err());

        let mut cfg = DevcheckConfig::with_home("/srv/devcheck");
        cfg.thresholds.retention_days = 0;
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn non_http_endpoint_is_rejected() {
        let mut cfg = DevcheckConfig::with_home("/srv/devcheck");
        cfg.notify.endpoint = Some("hooks.example.test/abc".to_string());
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn partial_toml_sections_keep_field_defaults() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("devcheck.toml");
        fs::write(
            &path,
            "[thresholds]\nstale_days = 14\n\n[notify]\nendpoint = \"https://hooks.example.test/x\"\n",
        )
        .expect("write config");

        let parsed = read_file_config(Some(&path)).expect("parse");
        let thresholds = parsed.thresholds.expect("thresholds");
        assert_eq!(thresholds.stale_days, 14);
        assert_eq!(thresholds.retention_days, DEFAULT_RETENTION_DAYS);
        let notify = parsed.notify.expect("notify");
        assert_eq!(notify.max_listed, 10);
        assert_eq!(
            notify.endpoint.as_deref(),
            Some("https://hooks.example.test/x")
        );
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("devcheck.toml");
        fs::write(&path, "[thresholds\nstale_days = ").expect("write config");
        assert!(read_file_config(Some(&path)).is_err());
    }

    #[test]
    fn extension_normalization_strips_leading_dot() {
        assert_eq!(normalize_extension(" .jpg "), "jpg");
        assert_eq!(normalize_extension("json"), "json");
    }
}
