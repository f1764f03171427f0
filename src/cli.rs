use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands::{
    CommandReport, archive, menu, reconcile, report_overall, report_trend, run_all, status,
};
use crate::recon::config::load_config;

#[derive(Debug, Parser)]
#[command(
    name = "devcheck",
    version,
    about = "Reconcile device submissions against the registry, report on them and archive old files"
)]
struct Cli {
    /// Print the command report as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scan submissions, update the history ledger and write the summaries.
    Reconcile {
        /// Skip the chat notification.
        #[arg(long)]
        no_notify: bool,
    },
    /// Write a Markdown report.
    Report {
        #[command(subcommand)]
        kind: ReportKind,
    },
    /// Copy files older than the retention window into the archive tree.
    Archive {
        /// Retention in days; defaults to the configured value.
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        days: Option<u32>,
    },
    /// Trend report, overall report, then archive.
    RunAll,
    /// Interactive menu.
    Menu,
    /// Show resolved configuration and missing inputs.
    Status,
}

#[derive(Debug, Subcommand)]
enum ReportKind {
    /// Monthly submission counts and extension statistics from the ledger.
    Trend,
    /// Registry-wide summary with per-month file counts.
    Overall,
}

fn print_report(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", report.render_text());
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let cfg = load_config()?;

    let report = match cli.command {
        Command::Reconcile { no_notify } => reconcile::run(
            &cfg,
            reconcile::ReconcileOptions {
                notify: !no_notify,
            },
        )?,
        Command::Report { kind } => match kind {
            ReportKind::Trend => report_trend::run(&cfg)?,
            ReportKind::Overall => report_overall::run(&cfg)?,
        },
        Command::Archive { days } => archive::run(&cfg, days)?,
        Command::RunAll => run_all::run(&cfg)?,
        Command::Menu => menu::run(&cfg)?,
        Command::Status => status::run(&cfg)?,
    };

    print_report(&report, cli.json)?;
    if !report.ok {
        std::process::exit(2);
    }
    Ok(())
}
