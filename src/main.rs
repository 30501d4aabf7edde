mod cli;
mod logging;

use std::process;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands, PathArgs};
use colored::*;
use dotenv::dotenv;
use torrent_harvest::{CopyStatus, HarvestConfig, HarvestEngine, HarvestResult};
use tracing::{error, info};

fn main() {
    dotenv().ok();

    let guard = logging::init_logger();

    let args = Cli::parse();

    let outcome = match args.command {
        Some(Commands::Harvest(args)) => run_harvest(&args.paths, args.report.as_deref()),
        Some(Commands::List(paths)) => run_list(&paths),
        Some(Commands::PrintConfig(paths)) => {
            resolve_config(&paths).map(|config| println!("Configuration: {:#?}", config))
        }
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = outcome {
        error!("Error: {:#}", err);
        drop(guard);
        process::exit(1);
    }
}

/// Environment configuration with command line overrides applied.
fn resolve_config(paths: &PathArgs) -> Result<HarvestConfig> {
    let mut config =
        torrent_harvest::config::load_configuration().context("Error loading configuration")?;
    if let Some(cache_root) = &paths.cache_root {
        config.cache_root = cache_root.clone();
    }
    if let Some(destination) = &paths.destination {
        config.destination_root = destination.clone();
    }
    if let Some(rule) = paths.completion_rule {
        config.completion_rule = rule;
    }
    Ok(config)
}

fn run_harvest(paths: &PathArgs, report: Option<&std::path::Path>) -> Result<()> {
    let config = resolve_config(paths)?;
    let engine = HarvestEngine::new(config);
    let result = engine.run().context("Harvest failed")?;

    print_outcomes(&result);
    print_summary(&result);

    if let Some(report) = report {
        torrent_harvest::report::append_csv(report, &result.outcomes)
            .with_context(|| format!("Error writing report {}", report.display()))?;
        info!("Report appended to {}", report.display());
    }

    Ok(())
}

fn run_list(paths: &PathArgs) -> Result<()> {
    let config = resolve_config(paths)?;
    let engine = HarvestEngine::new(config).with_dry_run(true);
    let result = engine.run().context("Listing failed")?;

    print_outcomes(&result);
    info!(
        "{} of {} torrents fully downloaded",
        format!("{}", result.torrents_completed).green(),
        result.torrents_found,
    );
    Ok(())
}

fn print_outcomes(result: &HarvestResult) {
    for outcome in &result.outcomes {
        let destination = outcome.task.destination.display();
        match &outcome.status {
            CopyStatus::Copied { bytes } => {
                println!("{} {} ({} bytes)", "copied ".green(), destination, bytes)
            }
            CopyStatus::Planned => println!("{} {}", "pending".cyan(), destination),
            CopyStatus::Skipped { reason } => {
                println!("{} {} ({})", "skipped".yellow(), destination, reason)
            }
        }
    }
}

fn print_summary(result: &HarvestResult) {
    let copied_bytes: u64 = result
        .copied()
        .map(|o| match o.status {
            CopyStatus::Copied { bytes } => bytes,
            _ => 0,
        })
        .sum();

    println!();
    info!(
        "Scan: {}, Read: {}, Filter: {}, Copy: {}",
        format!("{:.2}s", result.scan_duration.as_secs_f64()).green(),
        format!("{:.2}s", result.read_duration.as_secs_f64()).green(),
        format!("{:.2}s", result.filter_duration.as_secs_f64()).green(),
        format!("{:.2}s", result.copy_duration.as_secs_f64()).green(),
    );
    info!(
        "{} torrents found, {} complete, {} copied ({} bytes), {} skipped",
        format!("{}", result.torrents_found).cyan(),
        format!("{}", result.torrents_completed).cyan(),
        format!("{}", result.copied().count()).green(),
        copied_bytes,
        format!("{}", result.skipped().count()).yellow(),
    );
}
