use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod escalation;
mod output;
mod readiness;
mod station;
mod subagent;
mod table;
mod util;
mod workflow;

use cli::{Command, DescribeArgs, EscalateArgs, FilterArgs, InitConfigArgs, RootArgs, RunArgs};
use config::{default_config, write_config, Settings};
use escalation::{EscalationReporter, Failure, HttpReviewTransport};
use station::StationContext;
use subagent::{render_description, Catalog, HttpSubagentTransport, DEFAULT_STARTING_MESSAGE};
use table::RawTable;
use workflow::{FileTableSource, Orchestrator, RemoteTableSource};

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.verbose);
    let config_flag = args.config.as_deref();

    match args.command {
        Command::Filter(args) => cmd_filter(args),
        Command::Run(args) => cmd_run(config_flag, args),
        Command::Escalate(args) => cmd_escalate(config_flag, args),
        Command::Describe(args) => cmd_describe(config_flag, args),
        Command::InitConfig(args) => cmd_init_config(args),
    }
}

/// Logs go to stderr; stdout carries command output only.
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn cmd_filter(args: FilterArgs) -> Result<()> {
    let text = fs::read_to_string(&args.table)
        .with_context(|| format!("read table {}", args.table.display()))?;
    let table = RawTable::from_text(&text)
        .with_context(|| format!("read borrower table {}", args.table.display()))?;
    let evaluation = readiness::evaluate(&table);
    tracing::info!(
        table = %args.table.display(),
        ready = evaluation.ready_count(),
        rows = evaluation.results.len(),
        "table evaluated"
    );
    if args.json {
        println!("{}", serde_json::to_string_pretty(&evaluation)?);
        return Ok(());
    }
    let ready = evaluation.ready().cloned().collect::<Vec<_>>();
    println!("{}", readiness::render_ready_list(&ready));
    if !evaluation.skipped.is_empty() {
        eprintln!("skipped {} malformed row(s)", evaluation.skipped.len());
    }
    Ok(())
}

fn cmd_run(config_flag: Option<&Path>, args: RunArgs) -> Result<()> {
    let settings = Settings::resolve(config_flag, args.thread_id.as_deref())?;
    let station = station_for(&settings);
    let catalog = Catalog::declare(&settings.config, &station)?;
    let transport =
        HttpSubagentTransport::new(Duration::from_secs(settings.config.dispatch_timeout_secs));
    let review = HttpReviewTransport::new(Duration::from_secs(settings.config.review_timeout_secs));
    let reporter = EscalationReporter::new(&settings, &station, &review);
    let orchestrator = Orchestrator::new(&station, &catalog, &transport, &reporter);

    let summary = match &args.table {
        Some(path) => orchestrator.run(&FileTableSource::new(path.clone()))?,
        None => orchestrator.run(&RemoteTableSource::new(&catalog.extraction, &transport))?,
    };

    if let Some(state) = summary.final_state() {
        tracing::debug!(%state, "run finished");
    }
    if let Some(out) = &args.out {
        output::write_json_atomic(out, &summary)?;
        tracing::info!(path = %out.display(), "wrote run summary");
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary.render_text().trim_end());
    }
    Ok(())
}

fn cmd_escalate(config_flag: Option<&Path>, args: EscalateArgs) -> Result<()> {
    let settings = Settings::resolve(config_flag, args.thread_id.as_deref())?;
    let station = station_for(&settings);
    let review = HttpReviewTransport::new(Duration::from_secs(settings.config.review_timeout_secs));
    let reporter = EscalationReporter::new(&settings, &station, &review);
    let failure = Failure::new(args.borrower_name, args.loan_number, args.message)
        .with_screenshot(args.screenshot);
    let escalation = reporter.report(&failure);
    println!("{}", escalation.outcome);
    Ok(())
}

fn cmd_describe(config_flag: Option<&Path>, args: DescribeArgs) -> Result<()> {
    let settings = Settings::resolve(config_flag, None)?;
    let station = station_for(&settings);
    let catalog = Catalog::declare(&settings.config, &station)?;
    if args.json {
        let value = serde_json::json!({
            "station_id": station.station_id(),
            "station_origin": station.origin().as_str(),
            "config_path": settings.config_path.as_ref().map(|p| p.display().to_string()),
            "capabilities": catalog.specs(),
            "default_starting_message": DEFAULT_STARTING_MESSAGE,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{}", render_description(&catalog).trim_end());
    }
    Ok(())
}

fn cmd_init_config(args: InitConfigArgs) -> Result<()> {
    write_config(&args.out, &default_config(), args.force)?;
    println!("Wrote config to {}", args.out.display());
    Ok(())
}

fn station_for(settings: &Settings) -> StationContext {
    StationContext::derive(
        settings.run_id.as_deref(),
        &settings.config.station.default_station_id,
        settings.config.station.shared_variables.iter().cloned(),
    )
}
