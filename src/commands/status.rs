use anyhow::Result;

use crate::commands::CommandReport;
use crate::recon::config::{DevcheckConfig, resolve_config_path, unknown_env_vars};
use crate::recon::kind::ArtifactKind;

pub fn run(cfg: &DevcheckConfig) -> Result<CommandReport> {
    let paths = &cfg.paths;
    let mut report = CommandReport::new("status");

    match resolve_config_path() {
        Some(path) if path.exists() => report.detail(format!("config_file={}", path.display())),
        Some(path) => report.detail(format!("config_file={} (absent, defaults used)", path.display())),
        None => report.detail("config_file=none"),
    }
    report.detail(format!("home={}", paths.home.display()));
    report.detail(format!("registry={}", paths.registry.display()));
    report.detail(format!("browser_logs_dir={}", paths.browser_logs_dir.display()));
    report.detail(format!("face_photos_dir={}", paths.face_photos_dir.display()));
    report.detail(format!("archive_root={}", paths.archive_root.display()));
    report.detail(format!("history_file={}", paths.history_file.display()));
    report.detail(format!("summary_file={}", paths.summary_file.display()));
    report.detail(format!("legacy_file={}", paths.legacy_file.display()));
    report.detail(format!("reports_dir={}", paths.reports_dir.display()));
    report.detail(format!("logs_dir={}", paths.logs_dir.display()));
    report.detail(format!("stale_days={}", cfg.thresholds.stale_days));
    report.detail(format!("retention_days={}", cfg.thresholds.retention_days));
    for kind in ArtifactKind::ALL {
        report.detail(format!("{}_extension={}", kind.as_str(), cfg.extension(kind)));
    }
    // Webhook URLs embed a secret token; only say whether one is set.
    report.detail(format!(
        "notify_endpoint={}",
        if cfg.notify.endpoint.is_some() { "configured" } else { "unset" }
    ));
    report.detail(format!("notify_max_listed={}", cfg.notify.max_listed));

    if !paths.registry.exists() {
        report.issue(format!("missing device registry ({})", paths.registry.display()));
    }
    for kind in ArtifactKind::ALL {
        let dir = paths.artifact_dir(kind);
        if !dir.is_dir() {
            report.issue(format!("missing {} folder ({})", kind.label(), dir.display()));
        }
    }
    if !paths.history_file.exists() {
        report.detail("history ledger not created yet");
    }
    for var in unknown_env_vars() {
        report.issue(format!("unrecognized environment variable {var}"));
    }

    Ok(report)
}
