use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use torrent_harvest::CompletionRule;

#[derive(Debug, Parser)] // requires `derive` feature
#[command(name = "torrent-harvest")]
#[command(about = "Copy finished downloads out of a torrent cache", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Copy the largest file of every fully downloaded torrent
    Harvest(HarvestArgs),
    /// Show what would be copied without writing anything
    List(PathArgs),
    /// Print configuration values
    PrintConfig(PathArgs),
}

#[derive(Debug, Args)]
pub struct PathArgs {
    /// Cache root holding one folder per torrent
    #[arg(long)]
    pub cache_root: Option<PathBuf>,
    /// Folder receiving the copied files; created with its parents if it
    /// does not exist
    #[arg(long)]
    pub destination: Option<PathBuf>,
    /// Which fragment decides completion
    #[arg(long, value_parser = parse_rule)]
    pub completion_rule: Option<CompletionRule>,
}

#[derive(Debug, Args)]
pub struct HarvestArgs {
    #[command(flatten)]
    pub paths: PathArgs,
    /// Append one CSV row per copy outcome to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

fn parse_rule(value: &str) -> Result<CompletionRule, String> {
    match value {
        "first-fragment" => Ok(CompletionRule::FirstFragment),
        "primary-file" => Ok(CompletionRule::PrimaryFile),
        other => Err(format!(
            "unknown completion rule '{}' (expected first-fragment or primary-file)",
            other
        )),
    }
}
