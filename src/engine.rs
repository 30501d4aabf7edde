use rayon::prelude::*;
use std::fs;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::completion;
use crate::config::HarvestConfig;
use crate::copier::{self, PlannedCopy};
use crate::descriptor;
use crate::error::Error;
use crate::model::{CompletedTorrent, CopyOutcome, TorrentManifest};
use crate::scanner;

pub struct HarvestEngine {
    config: HarvestConfig,
    dry_run: bool,
}

#[derive(Debug)]
pub struct HarvestResult {
    pub scan_duration: Duration,
    pub read_duration: Duration,
    pub filter_duration: Duration,
    pub copy_duration: Duration,
    pub torrents_found: usize,
    pub torrents_completed: usize,
    pub outcomes: Vec<CopyOutcome>,
}

impl HarvestResult {
    pub fn copied(&self) -> impl Iterator<Item = &CopyOutcome> {
        self.outcomes.iter().filter(|o| o.is_copied())
    }

    pub fn skipped(&self) -> impl Iterator<Item = &CopyOutcome> {
        self.outcomes.iter().filter(|o| o.is_skipped())
    }
}

impl HarvestEngine {
    pub fn new(config: HarvestConfig) -> Self {
        Self {
            config,
            dry_run: false,
        }
    }

    /// Plan copies without touching the destination.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run the full harvest pipeline:
    /// 1. Scan the cache root for folders holding a descriptor
    /// 2. Parse every descriptor into a file manifest
    /// 3. Stat fragments and keep fully downloaded torrents
    /// 4. Copy each torrent's primary file into the destination root
    ///
    /// Every stage fans out in parallel and finishes before the next starts.
    /// Faults in stages 1-3 abort the run; copy failures are per torrent.
    pub fn run(&self) -> Result<HarvestResult, Error> {
        match self.config.threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()?;
                pool.install(|| self.run_stages())
            }
            None => self.run_stages(),
        }
    }

    fn run_stages(&self) -> Result<HarvestResult, Error> {
        let config = &self.config;

        // Phase 1: Scan
        info!("Scanning {}...", config.cache_root.display());
        let scan_start = Instant::now();
        let entries = scanner::scan_cache(&config.cache_root, &config.descriptor_extension)?;
        let scan_duration = scan_start.elapsed();
        let torrents_found = entries.len();
        debug!(
            "Scan completed in {:.2}s, {} torrents",
            scan_duration.as_secs_f64(),
            torrents_found,
        );

        // Phase 2: Read descriptors
        info!("Reading {} descriptors...", torrents_found);
        let read_start = Instant::now();
        let manifests = entries
            .into_par_iter()
            .map(descriptor::read_manifest)
            .collect::<Result<Vec<TorrentManifest>, Error>>()?;
        let read_duration = read_start.elapsed();
        debug!("Descriptors read in {:.2}s", read_duration.as_secs_f64());

        // Phase 3: Completion filter
        info!("Checking for fully downloaded torrents...");
        let filter_start = Instant::now();
        let rule = config.completion_rule;
        let completed: Vec<CompletedTorrent> = manifests
            .into_par_iter()
            .filter_map(|manifest| completion::filter_completed(manifest, rule))
            .collect();
        let filter_duration = filter_start.elapsed();
        let torrents_completed = completed.len();
        debug!(
            "Completion filter ({}) finished in {:.2}s, {} of {} torrents complete",
            rule,
            filter_duration.as_secs_f64(),
            torrents_completed,
            torrents_found,
        );

        // Phase 4: Copy
        let copy_start = Instant::now();
        let mut plans: Vec<PlannedCopy> = completed
            .iter()
            .filter_map(|torrent| copier::plan_copy(torrent, &config.destination_root))
            .collect();
        copier::resolve_collisions(&mut plans);

        let outcomes: Vec<CopyOutcome> = if self.dry_run {
            info!("Dry run, planning {} copies", plans.len());
            plans.into_par_iter().map(copier::plan_only).collect()
        } else {
            info!(
                "Copying {} files to {}...",
                plans.len(),
                config.destination_root.display()
            );
            if !plans.is_empty() {
                fs::create_dir_all(&config.destination_root)
                    .map_err(|err| Error::io(&config.destination_root, err))?;
            }
            plans.into_par_iter().map(copier::execute).collect()
        };
        let copy_duration = copy_start.elapsed();
        debug!("Copy stage finished in {:.2}s", copy_duration.as_secs_f64());

        Ok(HarvestResult {
            scan_duration,
            read_duration,
            filter_duration,
            copy_duration,
            torrents_found,
            torrents_completed,
            outcomes,
        })
    }
}
