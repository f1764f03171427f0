use anyhow::Result;

use crate::commands::CommandReport;
use crate::recon::archive::bucket_files;
use crate::recon::audit;
use crate::recon::config::DevcheckConfig;
use crate::recon::kind::ArtifactKind;
use crate::recon::ledger::Ledger;
use crate::recon::registry::Registry;
use crate::recon::report::{KindSection, OverallData, overall_report_name, render_overall};
use crate::recon::summary::{self, SummaryStats};
use crate::recon::util::{now_local, write_atomic};
use crate::recon::warn;

pub fn run(cfg: &DevcheckConfig) -> Result<CommandReport> {
    let paths = &cfg.paths;
    let now = now_local();
    let mut report = CommandReport::new("report-overall");

    let stats = match Registry::load(&paths.registry) {
        Ok(registry) => {
            let ledger = Ledger::load_or_empty(&paths.history_file);
            let rows = summary::build(&registry, &ledger, &now, cfg.thresholds.stale_days);
            SummaryStats::from_rows(&rows)
        }
        Err(err) => {
            report.issue(format!("submission summary left empty: {err}"));
            SummaryStats::default()
        }
    };

    let mut sections = Vec::new();
    for kind in ArtifactKind::ALL {
        let folder = cfg.paths.artifact_dir(kind);
        let section = match bucket_files(folder, kind, cfg.extension(kind)) {
            Ok(buckets) => {
                KindSection::from_buckets(kind, &buckets, &now, cfg.thresholds.stale_days)
            }
            Err(err) => {
                warn::emit_error(
                    "report",
                    "bucket-files",
                    &folder.display().to_string(),
                    "section-marked-unavailable",
                    &err,
                );
                report.issue(format!("{} folder unavailable: {err}", kind.as_str()));
                KindSection::unavailable(kind)
            }
        };
        report.detail(format!(
            "{} files={} this_month={} last_month={} stale_devices={}",
            kind.as_str(),
            section.total,
            section.current_month,
            section.previous_month,
            section.stale_devices.len()
        ));
        sections.push(section);
    }

    let data = OverallData {
        stats,
        sections,
        stale_days: cfg.thresholds.stale_days,
        retention_days: cfg.thresholds.retention_days,
    };
    let out_path = paths
        .reports_dir
        .join("periodic")
        .join(overall_report_name(&now));
    write_atomic(&out_path, render_overall(&data, &now).as_bytes())?;

    report.detail(format!(
        "devices={} complete={} rate={:.1}%",
        data.stats.total,
        data.stats.complete,
        data.stats.completion_percent()
    ));
    report.detail(format!("overall_report={}", out_path.display()));
    audit::record(
        paths,
        "report-overall",
        if report.ok { "ok" } else { "degraded" },
        &format!("written={}", out_path.display()),
    );
    Ok(report)
}
