use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use tracing::{debug, trace};

use crate::config::CompletionRule;
use crate::copier::select_primary;
use crate::model::{CompletedTorrent, FragmentStat, TorrentManifest};

/// Stat every fragment of a torrent, keeping only those present on disk.
///
/// Fragment `i` lives at `<folder>/<i>`. Any stat failure counts as absent.
pub fn stat_fragments(manifest: &TorrentManifest) -> BTreeMap<usize, FragmentStat> {
    let folder = &manifest.entry.folder_path;
    (0..manifest.files.len())
        .into_par_iter()
        .filter_map(|index| {
            let fragment = folder.join(index.to_string());
            match fs::metadata(&fragment) {
                Ok(metadata) => Some((
                    index,
                    FragmentStat {
                        index,
                        size: metadata.len(),
                    },
                )),
                Err(err) => {
                    trace!("Fragment {} absent: {}", fragment.display(), err);
                    None
                }
            }
        })
        .collect()
}

/// Whether the fragment chosen by `rule` exists and matches its declared
/// length exactly.
pub fn is_fully_downloaded(torrent: &CompletedTorrent, rule: CompletionRule) -> bool {
    let files = &torrent.manifest.files;
    let index = match rule {
        CompletionRule::FirstFragment => 0,
        CompletionRule::PrimaryFile => match select_primary(files) {
            Some(index) => index,
            None => return false,
        },
    };

    match (files.get(index), torrent.fragments.get(&index)) {
        (Some(declared), Some(stat)) => stat.size == declared.length,
        _ => false,
    }
}

/// Stat a manifest's fragments and keep it only if it counts as fully downloaded.
pub fn filter_completed(manifest: TorrentManifest, rule: CompletionRule) -> Option<CompletedTorrent> {
    let fragments = stat_fragments(&manifest);
    let torrent = CompletedTorrent { manifest, fragments };

    if is_fully_downloaded(&torrent, rule) {
        Some(torrent)
    } else {
        debug!(
            "{} is not fully downloaded ({} of {} fragments present)",
            torrent.manifest.entry.name,
            torrent.fragments.len(),
            torrent.manifest.files.len(),
        );
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CacheEntry, FileDescriptor};
    use std::path::Path;
    use tempfile::tempdir;

    fn manifest(folder: &Path, lengths: &[u64]) -> TorrentManifest {
        TorrentManifest {
            entry: CacheEntry {
                name: "abc".to_string(),
                folder_path: folder.to_path_buf(),
                descriptor_path: folder.join("abc.torrent"),
            },
            files: lengths
                .iter()
                .enumerate()
                .map(|(i, &length)| FileDescriptor {
                    path: format!("file{}.bin", i),
                    length,
                })
                .collect(),
        }
    }

    fn write_fragment(folder: &Path, index: usize, size: usize) {
        fs::write(folder.join(index.to_string()), vec![0u8; size]).unwrap();
    }

    #[test]
    fn test_fragment_stats_keep_declared_index() {
        let tmp = tempdir().unwrap();
        write_fragment(tmp.path(), 2, 30);
        write_fragment(tmp.path(), 0, 10);

        let fragments = stat_fragments(&manifest(tmp.path(), &[10, 20, 30]));
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[&0], FragmentStat { index: 0, size: 10 });
        assert_eq!(fragments[&2], FragmentStat { index: 2, size: 30 });
        assert!(!fragments.contains_key(&1));
    }

    #[test]
    fn test_first_fragment_exact_match_qualifies() {
        let tmp = tempdir().unwrap();
        write_fragment(tmp.path(), 0, 10);

        let result = filter_completed(manifest(tmp.path(), &[10, 500]), CompletionRule::FirstFragment);
        assert!(result.is_some());
    }

    #[test]
    fn test_first_fragment_size_must_be_exact() {
        let tmp = tempdir().unwrap();
        write_fragment(tmp.path(), 0, 11);
        assert!(filter_completed(manifest(tmp.path(), &[10]), CompletionRule::FirstFragment).is_none());

        write_fragment(tmp.path(), 0, 9);
        assert!(filter_completed(manifest(tmp.path(), &[10]), CompletionRule::FirstFragment).is_none());
    }

    #[test]
    fn test_missing_first_fragment_never_qualifies() {
        let tmp = tempdir().unwrap();
        write_fragment(tmp.path(), 1, 20);
        write_fragment(tmp.path(), 2, 30);

        let result = filter_completed(manifest(tmp.path(), &[10, 20, 30]), CompletionRule::FirstFragment);
        assert!(result.is_none());
    }

    #[test]
    fn test_primary_file_rule_checks_largest_fragment() {
        let tmp = tempdir().unwrap();
        write_fragment(tmp.path(), 0, 10);
        write_fragment(tmp.path(), 1, 25);

        let lengths = [10, 50];
        assert!(filter_completed(manifest(tmp.path(), &lengths), CompletionRule::FirstFragment).is_some());
        assert!(filter_completed(manifest(tmp.path(), &lengths), CompletionRule::PrimaryFile).is_none());

        write_fragment(tmp.path(), 1, 50);
        assert!(filter_completed(manifest(tmp.path(), &lengths), CompletionRule::PrimaryFile).is_some());
    }

    #[test]
    fn test_empty_manifest_never_qualifies() {
        let tmp = tempdir().unwrap();
        write_fragment(tmp.path(), 0, 0);
        assert!(filter_completed(manifest(tmp.path(), &[]), CompletionRule::FirstFragment).is_none());
        assert!(filter_completed(manifest(tmp.path(), &[]), CompletionRule::PrimaryFile).is_none());
    }
}
