//! Markdown and CSV renderers for the trend and overall reports.
//!
//! Everything here is pure: callers gather the inputs (ledger, registry,
//! month buckets) and write the returned text wherever the paths point.

use anyhow::Result;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::recon::archive::Buckets;
use crate::recon::kind::ArtifactKind;
use crate::recon::ledger::Ledger;
use crate::recon::scanner::reduce_latest;
use crate::recon::summary::SummaryStats;
use crate::recon::util::{elapsed_days, format_timestamp, year_month};

const BAR_WIDTH: usize = 40;

pub fn trend_report_name(now: &NaiveDateTime) -> String {
    format!("trend_report_{}.md", now.format("%Y%m%d"))
}

pub fn extension_stats_name(now: &NaiveDateTime) -> String {
    format!("extension_stats_{}.csv", now.format("%Y%m%d"))
}

pub fn overall_report_name(now: &NaiveDateTime) -> String {
    format!("overall_report_{}.md", now.format("%Y%m%d"))
}

fn bar(count: usize, max: usize) -> String {
    if max == 0 || count == 0 {
        return String::new();
    }
    let width = (count * BAR_WIDTH).div_ceil(max).max(1);
    "#".repeat(width)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtensionStats {
    pub mean: f64,
    pub max: f64,
    pub min: f64,
    pub median: f64,
}

impl ExtensionStats {
    /// All zero for an empty sample.
    pub fn from_counts(counts: &[usize]) -> Self {
        if counts.is_empty() {
            return Self::default();
        }
        let mut sorted = counts.to_vec();
        sorted.sort_unstable();
        let n = sorted.len();
        let median = if n % 2 == 1 {
            sorted[n / 2] as f64
        } else {
            (sorted[n / 2 - 1] + sorted[n / 2]) as f64 / 2.0
        };
        Self {
            mean: sorted.iter().sum::<usize>() as f64 / n as f64,
            max: sorted[n - 1] as f64,
            min: sorted[0] as f64,
            median,
        }
    }

    pub fn metrics(&self) -> [(&'static str, f64); 4] {
        [
            ("mean", self.mean),
            ("max", self.max),
            ("min", self.min),
            ("median", self.median),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrendData {
    pub browser_by_month: BTreeMap<String, usize>,
    pub photo_by_month: BTreeMap<String, usize>,
    pub extensions: ExtensionStats,
    pub devices: usize,
}

impl TrendData {
    /// Extension statistics cover devices with a recorded browser inventory.
    pub fn from_ledger(ledger: &Ledger) -> Self {
        let mut data = Self {
            devices: ledger.len(),
            ..Self::default()
        };
        let mut counts = Vec::new();
        for row in ledger.rows() {
            if let Some(ts) = row.browser_time {
                *data.browser_by_month.entry(year_month(&ts)).or_default() += 1;
                counts.push(row.extension_count);
            }
            if let Some(ts) = row.photo_time {
                *data.photo_by_month.entry(year_month(&ts)).or_default() += 1;
            }
        }
        data.extensions = ExtensionStats::from_counts(&counts);
        data
    }
}

fn push_month_chart(out: &mut String, title: &str, by_month: &BTreeMap<String, usize>) {
    out.push_str(&format!("## {title}\n\n"));
    if by_month.is_empty() {
        out.push_str("No submissions recorded.\n\n");
        return;
    }
    let max = by_month.values().copied().max().unwrap_or(0);
    out.push_str("```\n");
    for (month, count) in by_month.iter().rev() {
        out.push_str(&format!(
            "{month} | {:<width$} {count}\n",
            bar(*count, max),
            width = BAR_WIDTH
        ));
    }
    out.push_str("```\n\n");
}

pub fn render_trend(data: &TrendData, now: &NaiveDateTime) -> String {
    let mut out = String::new();
    out.push_str("# Submission trend report\n\n");
    out.push_str(&format!("Generated: {}\n", format_timestamp(now)));
    out.push_str(&format!("Devices in history: {}\n\n", data.devices));
    push_month_chart(&mut out, "Browser inventory submissions per month", &data.browser_by_month);
    push_month_chart(&mut out, "Face photo submissions per month", &data.photo_by_month);

    out.push_str("## Browser extension counts\n\n");
    out.push_str("| metric | value |\n|---|---|\n");
    for (metric, value) in data.extensions.metrics() {
        out.push_str(&format!("| {metric} | {value:.2} |\n"));
    }
    out
}

pub fn extension_stats_csv(stats: &ExtensionStats) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["metric", "value"])?;
    for (metric, value) in stats.metrics() {
        writer.write_record([metric.to_string(), format!("{value:.2}")])?;
    }
    Ok(writer.into_inner().map_err(|err| err.into_error())?)
}

fn previous_month(now: &NaiveDateTime) -> String {
    let first = NaiveDate::from_ymd_opt(now.year(), now.month(), 1).unwrap_or(now.date());
    (first - Duration::days(1)).format("%Y-%m").to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KindSection {
    pub kind: ArtifactKind,
    pub available: bool,
    pub by_month: BTreeMap<String, usize>,
    pub total: usize,
    pub unparsed: usize,
    pub current_month: usize,
    pub previous_month: usize,
    pub stale_devices: Vec<String>,
}

impl KindSection {
    pub fn from_buckets(
        kind: ArtifactKind,
        buckets: &Buckets,
        now: &NaiveDateTime,
        stale_days: u32,
    ) -> Self {
        let by_month = buckets
            .by_month
            .iter()
            .map(|(month, files)| (month.clone(), files.len()))
            .collect::<BTreeMap<_, _>>();
        let files = buckets.by_month.values().flatten().cloned().collect();
        let stale_devices = reduce_latest(files)
            .into_values()
            .filter(|file| {
                file.timestamp
                    .is_some_and(|ts| elapsed_days(&ts, now) > i64::from(stale_days))
            })
            .map(|file| file.device)
            .collect();
        Self {
            kind,
            available: true,
            total: buckets.total(),
            unparsed: buckets.unparsed.len(),
            current_month: buckets.count(&year_month(now)),
            previous_month: buckets.count(&previous_month(now)),
            by_month,
            stale_devices,
        }
    }

    pub fn unavailable(kind: ArtifactKind) -> Self {
        Self {
            kind,
            available: false,
            by_month: BTreeMap::new(),
            total: 0,
            unparsed: 0,
            current_month: 0,
            previous_month: 0,
            stale_devices: Vec::new(),
        }
    }

    pub fn delta(&self) -> i64 {
        self.current_month as i64 - self.previous_month as i64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallData {
    pub stats: SummaryStats,
    pub sections: Vec<KindSection>,
    pub stale_days: u32,
    pub retention_days: u32,
}

pub fn render_overall(data: &OverallData, now: &NaiveDateTime) -> String {
    let mut out = String::new();
    out.push_str("# Overall submission report\n\n");
    out.push_str(&format!("Generated: {}\n\n", format_timestamp(now)));

    out.push_str("## 1. Submission summary\n\n");
    let stats = &data.stats;
    out.push_str(&format!("- Registered devices: {}\n", stats.total));
    out.push_str(&format!("- Complete: {}\n", stats.complete));
    out.push_str(&format!("- Partial: {}\n", stats.partial));
    out.push_str(&format!("- Incomplete: {}\n", stats.incomplete));
    out.push_str(&format!("- Completion rate: {:.1}%\n\n", stats.completion_percent()));

    out.push_str("## 2. Files per month\n\n");
    for section in &data.sections {
        out.push_str(&format!("### {}\n\n", section.kind.label()));
        if !section.available {
            out.push_str("Folder unavailable.\n\n");
            continue;
        }
        if section.by_month.is_empty() {
            out.push_str("No dated files.\n\n");
            continue;
        }
        out.push_str("| month | files |\n|---|---|\n");
        for (month, count) in section.by_month.iter().rev() {
            out.push_str(&format!("| {month} | {count} |\n"));
        }
        out.push('\n');
    }

    out.push_str("## 3. File totals\n\n");
    out.push_str("| kind | dated files | undated files |\n|---|---|---|\n");
    for section in &data.sections {
        out.push_str(&format!(
            "| {} | {} | {} |\n",
            section.kind.label(),
            section.total,
            section.unparsed
        ));
    }
    out.push('\n');

    out.push_str(&format!(
        "## 4. This month vs last month ({} vs {})\n\n",
        year_month(now),
        previous_month(now)
    ));
    out.push_str("| kind | this month | last month | delta |\n|---|---|---|---|\n");
    for section in &data.sections {
        out.push_str(&format!(
            "| {} | {} | {} | {:+} |\n",
            section.kind.label(),
            section.current_month,
            section.previous_month,
            section.delta()
        ));
    }
    out.push('\n');

    out.push_str(&format!(
        "## 5. Devices without a file in the last {} days\n\n",
        data.stale_days
    ));
    for section in &data.sections {
        out.push_str(&format!(
            "- {}: {}",
            section.kind.label(),
            section.stale_devices.len()
        ));
        if !section.stale_devices.is_empty() {
            out.push_str(&format!(" ({})", section.stale_devices.join(", ")));
        }
        out.push('\n');
    }
    out.push('\n');

    out.push_str("## 6. Next actions\n\n");
    for item in action_items(data) {
        out.push_str(&format!("- [ ] {item}\n"));
    }
    out
}

pub fn action_items(data: &OverallData) -> Vec<String> {
    let mut items = Vec::new();
    if !data.stats.pending.is_empty() {
        items.push(format!(
            "Follow up with {} device(s) that have not fully submitted",
            data.stats.pending.len()
        ));
    }
    for section in &data.sections {
        if !section.available {
            items.push(format!("Check the {} folder, it could not be read", section.kind.label()));
        } else if !section.stale_devices.is_empty() {
            items.push(format!(
                "Request a fresh {} from {} device(s)",
                section.kind.label(),
                section.stale_devices.len()
            ));
        }
        if section.unparsed > 0 {
            items.push(format!(
                "Rename or remove {} {} file(s) without a readable date",
                section.unparsed,
                section.kind.label()
            ));
        }
    }
    items.push(format!(
        "Archive files older than {} days",
        data.retention_days
    ));
    items
}
