use config::{Config, Environment};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Error;

pub const DEFAULT_DESCRIPTOR_EXTENSION: &str = "torrent";

/// Which fragment decides whether a torrent is fully downloaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompletionRule {
    /// Fragment 0 must match the first declared length, whichever file is
    /// the primary one.
    #[default]
    FirstFragment,
    /// The primary (largest) file's fragment must match its declared length.
    PrimaryFile,
}

impl fmt::Display for CompletionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionRule::FirstFragment => write!(f, "first-fragment"),
            CompletionRule::PrimaryFile => write!(f, "primary-file"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub cache_root: PathBuf,
    pub destination_root: PathBuf,
    pub descriptor_extension: String,
    pub completion_rule: CompletionRule,
    /// Worker threads for the fan-out; `None` uses the global rayon pool.
    pub threads: Option<usize>,
}

impl HarvestConfig {
    pub fn new(cache_root: impl Into<PathBuf>, destination_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
            destination_root: destination_root.into(),
            descriptor_extension: DEFAULT_DESCRIPTOR_EXTENSION.to_string(),
            completion_rule: CompletionRule::default(),
            threads: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    cache_root: Option<PathBuf>,
    destination_root: Option<PathBuf>,
    descriptor_extension: String,
    completion_rule: CompletionRule,
    threads: Option<usize>,
}

/// Load configuration from `HARVEST_*` environment variables, falling back to
/// the Stremio cache and `~/Downloads` under `$HOME`.
pub fn load_configuration() -> Result<HarvestConfig, Error> {
    let home = env::var_os("HOME").map(PathBuf::from);
    load_from(
        Environment::with_prefix("HARVEST").try_parsing(true),
        home.as_deref(),
    )
}

pub(crate) fn load_from(source: Environment, home: Option<&Path>) -> Result<HarvestConfig, Error> {
    let raw = Config::builder()
        .set_default("descriptor_extension", DEFAULT_DESCRIPTOR_EXTENSION)?
        .set_default("completion_rule", CompletionRule::default().to_string())?
        .add_source(source)
        .build()?
        .try_deserialize::<RawConfig>()?;

    let cache_root = match raw.cache_root {
        Some(path) => path,
        None => default_cache_root(home.ok_or(Error::MissingHome)?),
    };
    let destination_root = match raw.destination_root {
        Some(path) => path,
        None => default_destination_root(home.ok_or(Error::MissingHome)?),
    };

    Ok(HarvestConfig {
        cache_root,
        destination_root,
        descriptor_extension: raw.descriptor_extension,
        completion_rule: raw.completion_rule,
        threads: raw.threads.filter(|&n| n > 0),
    })
}

pub fn default_cache_root(home: &Path) -> PathBuf {
    home.join("Library")
        .join("Application Support")
        .join("stremio")
        .join("stremio-cache")
}

pub fn default_destination_root(home: &Path) -> PathBuf {
    home.join("Downloads")
}
