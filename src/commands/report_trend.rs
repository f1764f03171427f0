use anyhow::Result;

use crate::commands::CommandReport;
use crate::recon::audit;
use crate::recon::config::DevcheckConfig;
use crate::recon::ledger::Ledger;
use crate::recon::report::{
    TrendData, extension_stats_csv, extension_stats_name, render_trend, trend_report_name,
};
use crate::recon::util::{now_local, write_atomic};

pub fn run(cfg: &DevcheckConfig) -> Result<CommandReport> {
    let paths = &cfg.paths;
    let now = now_local();
    let mut report = CommandReport::new("report-trend");

    if !paths.history_file.exists() {
        report.issue(format!(
            "history ledger not found at {}; run `devcheck reconcile` first",
            paths.history_file.display()
        ));
        audit::record(paths, "report-trend", "skipped", "history ledger missing");
        return Ok(report);
    }
    let ledger = match Ledger::load(&paths.history_file) {
        Ok(ledger) => ledger,
        Err(err) => {
            report.issue(format!("history ledger unreadable: {err}"));
            audit::record(paths, "report-trend", "failed", &err.to_string());
            return Ok(report);
        }
    };

    let data = TrendData::from_ledger(&ledger);
    let markdown_path = paths.reports_dir.join(trend_report_name(&now));
    let csv_path = paths.reports_dir.join(extension_stats_name(&now));
    write_atomic(&markdown_path, render_trend(&data, &now).as_bytes())?;
    write_atomic(&csv_path, &extension_stats_csv(&data.extensions)?)?;

    report.detail(format!("devices_in_history={}", data.devices));
    report.detail(format!("months_with_browser_logs={}", data.browser_by_month.len()));
    report.detail(format!("months_with_face_photos={}", data.photo_by_month.len()));
    report.detail(format!(
        "extensions mean={:.2} median={:.2} min={:.2} max={:.2}",
        data.extensions.mean, data.extensions.median, data.extensions.min, data.extensions.max
    ));
    report.detail(format!("trend_report={}", markdown_path.display()));
    report.detail(format!("extension_stats={}", csv_path.display()));

    audit::record(
        paths,
        "report-trend",
        "ok",
        &format!("written={}", markdown_path.display()),
    );
    Ok(report)
}
