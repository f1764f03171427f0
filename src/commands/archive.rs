use anyhow::Result;

use crate::commands::CommandReport;
use crate::error::ReconError;
use crate::recon::archive::archive;
use crate::recon::audit;
use crate::recon::config::DevcheckConfig;
use crate::recon::kind::ArtifactKind;
use crate::recon::util::now_local;

/// Copy aged artifacts of both kinds into the archive tree. `days` overrides
/// the configured retention for this run only.
pub fn run(cfg: &DevcheckConfig, days: Option<u32>) -> Result<CommandReport> {
    let paths = &cfg.paths;
    let retention_days = days.unwrap_or(cfg.thresholds.retention_days);
    if retention_days == 0 {
        return Err(ReconError::InvalidConfig("retention days must be >= 1".to_string()).into());
    }
    let now = now_local();
    let mut report = CommandReport::new("archive");
    report.detail(format!(
        "archive_root={} retention_days={retention_days}",
        paths.archive_root.display()
    ));

    let mut archived_total = 0usize;
    for kind in ArtifactKind::ALL {
        let folder = paths.artifact_dir(kind);
        let outcome = archive(
            folder,
            kind,
            cfg.extension(kind),
            &paths.archive_root,
            retention_days,
            &now,
        );
        archived_total += outcome.archived;
        if outcome.folder_missing {
            report.issue(format!(
                "{} folder unavailable: {}",
                kind.as_str(),
                folder.display()
            ));
            continue;
        }
        report.detail(format!(
            "{} scanned={} archived={} already_archived={} retained={} skipped_unparsed={} failed={}",
            kind.as_str(),
            outcome.scanned,
            outcome.archived,
            outcome.already_archived,
            outcome.retained,
            outcome.skipped_unparsed,
            outcome.failed
        ));
        if outcome.failed > 0 {
            report.issue(format!(
                "{} file(s) of kind {} could not be copied",
                outcome.failed,
                kind.as_str()
            ));
        }
    }

    audit::record(
        paths,
        "archive",
        if report.ok { "ok" } else { "degraded" },
        &format!("archived={archived_total} retention_days={retention_days}"),
    );
    Ok(report)
}
