use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::model::{CompletedTorrent, CopyOutcome, CopyStatus, CopyTask, FileDescriptor, SkipReason};

/// Index of the largest declared file. Ties go to the first occurrence.
pub fn select_primary(files: &[FileDescriptor]) -> Option<usize> {
    files
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, u64)>, (index, file)| match best {
            Some((_, length)) if length >= file.length => best,
            _ => Some((index, file.length)),
        })
        .map(|(index, _)| index)
}

/// Last component of a declared `/`-separated path, if it is a usable file
/// name.
pub fn declared_basename(path: &str) -> Option<&str> {
    path.rsplit('/')
        .find(|segment| !segment.is_empty())
        .filter(|name| *name != "." && *name != ".." && !name.contains('\\'))
}

/// A copy task along with any reason it must not run.
#[derive(Debug, Clone)]
pub struct PlannedCopy {
    pub torrent: String,
    pub task: CopyTask,
    pub blocked: Option<SkipReason>,
}

/// Pair the primary file of a completed torrent with its fragment.
///
/// The fragment is looked up by the primary file's declared index, so
/// fragments missing elsewhere in the torrent never shift the source.
pub fn plan_copy(torrent: &CompletedTorrent, destination_root: &Path) -> Option<PlannedCopy> {
    let files = &torrent.manifest.files;
    let index = select_primary(files)?;
    let primary = &files[index];
    let source = torrent.manifest.entry.folder_path.join(index.to_string());
    let name = torrent.manifest.entry.name.clone();

    let Some(basename) = declared_basename(&primary.path) else {
        return Some(PlannedCopy {
            torrent: name,
            task: CopyTask {
                source,
                destination: destination_root.to_path_buf(),
            },
            blocked: Some(SkipReason::InvalidName(primary.path.clone())),
        });
    };

    let blocked = if torrent.fragments.contains_key(&index) {
        None
    } else {
        Some(SkipReason::SourceMissing)
    };

    Some(PlannedCopy {
        torrent: name,
        task: CopyTask {
            source,
            destination: destination_root.join(basename),
        },
        blocked,
    })
}

/// Block every plan whose destination was already claimed by an earlier
/// plan. Only plans that will actually copy claim a destination.
pub fn resolve_collisions(plans: &mut [PlannedCopy]) {
    let mut claimed: HashSet<PathBuf> = HashSet::new();
    for plan in plans.iter_mut().filter(|plan| plan.blocked.is_none()) {
        if !claimed.insert(plan.task.destination.clone()) {
            warn!(
                "{} collides with an earlier torrent on {}",
                plan.torrent,
                plan.task.destination.display()
            );
            plan.blocked = Some(SkipReason::Collision);
        }
    }
}

/// Copy `task.source` to `task.destination` without ever replacing an
/// existing file. Failures are reported in the outcome, never raised.
pub fn execute(plan: PlannedCopy) -> CopyOutcome {
    let status = match plan.blocked {
        Some(reason) => CopyStatus::Skipped { reason },
        None => match copy_no_replace(&plan.task.source, &plan.task.destination) {
            Ok(bytes) => {
                debug!(
                    "Copied {} bytes from {} to {}",
                    bytes,
                    plan.task.source.display(),
                    plan.task.destination.display()
                );
                CopyStatus::Copied { bytes }
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => CopyStatus::Skipped {
                reason: SkipReason::DestinationExists,
            },
            Err(err) => CopyStatus::Skipped {
                reason: SkipReason::Io(err.to_string()),
            },
        },
    };

    if let CopyStatus::Skipped { reason } = &status {
        warn!("Skipped {}: {}", plan.torrent, reason);
    }

    CopyOutcome {
        torrent: plan.torrent,
        task: plan.task,
        status,
    }
}

pub fn plan_only(plan: PlannedCopy) -> CopyOutcome {
    let status = match plan.blocked {
        Some(reason) => CopyStatus::Skipped { reason },
        None if plan.task.destination.exists() => CopyStatus::Skipped {
            reason: SkipReason::DestinationExists,
        },
        None => CopyStatus::Planned,
    };
    CopyOutcome {
        torrent: plan.torrent,
        task: plan.task,
        status,
    }
}

fn copy_no_replace(source: &Path, destination: &Path) -> io::Result<u64> {
    let mut reader = File::open(source)?;
    let mut writer = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(destination)?;

    let copied = io::copy(&mut reader, &mut writer).and_then(|bytes| {
        writer.sync_all()?;
        Ok(bytes)
    });

    if copied.is_err() {
        drop(writer);
        if let Err(err) = fs::remove_file(destination) {
            warn!(
                "Could not remove partial copy {}: {}",
                destination.display(),
                err
            );
        }
    }
    copied
}
