use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};

use crate::commands::{CommandReport, archive, report_overall, report_trend, run_all};
use crate::recon::config::DevcheckConfig;

const MENU: &str = "\
==== devcheck ====
1) Trend report
2) Overall report
3) Archive old files (default retention)
4) Archive old files (choose retention days)
5) Run all
0) Exit
> ";

fn read_choice(input: &mut impl BufRead) -> Result<Option<String>> {
    let mut line = String::new();
    let read = input.read_line(&mut line).context("failed to read menu input")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn show(output: &mut impl Write, result: Result<CommandReport>) -> Result<bool> {
    match result {
        Ok(report) => {
            write!(output, "{}", report.render_text())?;
            Ok(report.ok)
        }
        Err(err) => {
            writeln!(output, "error: {err:#}")?;
            Ok(false)
        }
    }
}

/// Interactive loop over `input`/`output`. Ends on `0` or end of input.
pub fn run_with_io(
    cfg: &DevcheckConfig,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<CommandReport> {
    let mut report = CommandReport::new("menu");
    let mut actions = 0usize;
    let mut failed = 0usize;

    loop {
        write!(output, "{MENU}")?;
        output.flush()?;
        let Some(choice) = read_choice(input)? else {
            writeln!(output)?;
            break;
        };
        let result = match choice.as_str() {
            "0" => break,
            "1" => report_trend::run(cfg),
            "2" => report_overall::run(cfg),
            "3" => archive::run(cfg, None),
            "4" => {
                write!(
                    output,
                    "Retention days [{}]: ",
                    cfg.thresholds.retention_days
                )?;
                output.flush()?;
                let Some(raw) = read_choice(input)? else {
                    writeln!(output)?;
                    break;
                };
                let days = if raw.is_empty() {
                    Some(cfg.thresholds.retention_days)
                } else {
                    raw.parse::<u32>().ok().filter(|days| *days > 0)
                };
                match days {
                    Some(days) => archive::run(cfg, Some(days)),
                    None => {
                        writeln!(output, "Invalid number of days: {raw}")?;
                        continue;
                    }
                }
            }
            "5" => run_all::run(cfg),
            other => {
                writeln!(output, "Invalid choice: {other}")?;
                continue;
            }
        };
        actions += 1;
        if !show(output, result)? {
            failed += 1;
        }
    }

    report.detail(format!("actions_run={actions}"));
    if failed > 0 {
        report.detail(format!("actions_with_issues={failed}"));
    }
    Ok(report)
}

pub fn run(cfg: &DevcheckConfig) -> Result<CommandReport> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    run_with_io(cfg, &mut stdin.lock(), &mut stdout.lock())
}
