use anyhow::Result;

use crate::commands::{CommandReport, archive, report_overall, report_trend};
use crate::recon::config::DevcheckConfig;

type Step = fn(&DevcheckConfig) -> Result<CommandReport>;

fn archive_default(cfg: &DevcheckConfig) -> Result<CommandReport> {
    archive::run(cfg, None)
}

const STEPS: [(&str, Step); 3] = [
    ("report-trend", report_trend::run),
    ("report-overall", report_overall::run),
    ("archive", archive_default),
];

/// Trend report, overall report, then archival with the configured
/// retention. A failing step is recorded and the next one still runs.
pub fn run(cfg: &DevcheckConfig) -> Result<CommandReport> {
    let mut report = CommandReport::new("run-all");
    for (name, step) in STEPS {
        match step(cfg) {
            Ok(step_report) => {
                report.detail(format!(
                    "step={name} status={}",
                    if step_report.ok { "ok" } else { "issues" }
                ));
                report.merge(step_report);
            }
            Err(err) => report.issue(format!("step={name} failed: {err:#}")),
        }
    }
    Ok(report)
}
