use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::Path;

use crate::commands::CommandReport;
use crate::error::ErrorCode;
use crate::recon::audit;
use crate::recon::config::DevcheckConfig;
use crate::recon::kind::ArtifactKind;
use crate::recon::ledger::{Ledger, SubmissionUpdate};
use crate::recon::notify;
use crate::recon::payload::extension_count_or_zero;
use crate::recon::registry::Registry;
use crate::recon::scanner::{ScanResult, scan_or_absent};
use crate::recon::summary::{self, SummaryStats};
use crate::recon::util::now_local;
use crate::recon::warn::{self, WarnEvent};

#[derive(Debug, Clone, Copy)]
pub struct ReconcileOptions {
    pub notify: bool,
}

fn scan_kind(cfg: &DevcheckConfig, kind: ArtifactKind, report: &mut CommandReport) -> ScanResult {
    let result = scan_or_absent(cfg.paths.artifact_dir(kind), kind, cfg.extension(kind));
    if result.available {
        report.detail(format!(
            "{} folder={} matched={} devices={} skipped={} undated={}",
            result.kind.as_str(),
            result.folder.display(),
            result.matched,
            result.latest.len(),
            result.skipped.len(),
            result.unparsed_timestamps
        ));
    } else {
        report.detail(format!(
            "{} folder={} unavailable; every device counts as missing",
            result.kind.as_str(),
            result.folder.display()
        ));
    }
    for device in result.needs_review() {
        report.detail(format!(
            "needs_review device={device} kind={}",
            result.kind.as_str()
        ));
    }
    result
}

fn write_or_flag(
    report: &mut CommandReport,
    action: &'static str,
    path: &Path,
    write: impl FnOnce(&Path) -> Result<()>,
) {
    if let Err(err) = write(path) {
        warn::emit(WarnEvent {
            code: ErrorCode::E003IoFailure.as_str(),
            stage: "reconcile",
            action,
            target: &path.display().to_string(),
            reason: "export-skipped-continuing",
            err: &format!("{err:#}"),
        });
        report.issue(format!("failed to write {}: {err:#}", path.display()));
    }
}

pub fn run(cfg: &DevcheckConfig, options: ReconcileOptions) -> Result<CommandReport> {
    let paths = &cfg.paths;
    let now = now_local();
    let mut report = CommandReport::new("reconcile");

    let registry = Registry::load(&paths.registry).with_context(|| {
        format!(
            "cannot reconcile without a device registry at {}",
            paths.registry.display()
        )
    })?;
    report.detail(format!("registry_devices={}", registry.len()));

    let browser = scan_kind(cfg, ArtifactKind::BrowserLog, &mut report);
    let photos = scan_kind(cfg, ArtifactKind::FacePhoto, &mut report);

    let mut ledger = Ledger::load_or_empty(&paths.history_file);
    for device in &registry {
        let browser_file = browser.get(&device.device);
        let update = SubmissionUpdate {
            device: device.device.clone(),
            user: device.user.clone(),
            browser_time: browser_file.and_then(|file| file.timestamp),
            photo_time: photos.get(&device.device).and_then(|file| file.timestamp),
            extension_count: browser_file
                .filter(|file| file.timestamp.is_some())
                .map(|file| extension_count_or_zero(&file.path))
                .unwrap_or(0),
        };
        ledger.upsert(update, now);
    }
    ledger
        .save(&paths.history_file)
        .with_context(|| format!("failed to save {}", paths.history_file.display()))?;
    report.detail(format!(
        "history={} rows={}",
        paths.history_file.display(),
        ledger.len()
    ));

    let unregistered = browser
        .latest
        .keys()
        .chain(photos.latest.keys())
        .filter(|device| !registry.contains(device))
        .collect::<BTreeSet<_>>();
    for device in unregistered {
        report.detail(format!("unregistered device={device}"));
    }

    let rows = summary::build(&registry, &ledger, &now, cfg.thresholds.stale_days);
    write_or_flag(&mut report, "write-summary", &paths.summary_file, |path| {
        summary::write_summary(path, &rows)
    });
    write_or_flag(&mut report, "write-legacy", &paths.legacy_file, |path| {
        summary::write_legacy(path, &rows)
    });
    for row in &rows {
        report.detail(format!(
            "device={} overall={} browser={} photo={} extensions={}",
            row.device, row.overall, row.browser_status, row.photo_status, row.extension_count
        ));
    }

    let stats = SummaryStats::from_rows(&rows);
    report.detail(format!(
        "total={} complete={} partial={} incomplete={} rate={:.1}%",
        stats.total,
        stats.complete,
        stats.partial,
        stats.incomplete,
        stats.completion_percent()
    ));
    report.detail(format!("summary={}", paths.summary_file.display()));
    report.detail(format!("legacy_summary={}", paths.legacy_file.display()));

    let delivery = if options.notify {
        notify::notify(&cfg.notify, &stats)
    } else {
        notify::NotifyOutcome::Skipped
    };
    report.detail(format!("notification={}", delivery.as_str()));

    audit::record(
        paths,
        "reconcile",
        if report.ok { "ok" } else { "degraded" },
        &format!(
            "devices={} complete={} notification={}",
            stats.total,
            stats.complete,
            delivery.as_str()
        ),
    );
    Ok(report)
}
