use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// A cache subdirectory that holds a descriptor named after the folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub name: String,
    pub folder_path: PathBuf,
    pub descriptor_path: PathBuf,
}

/// One file declared by a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    pub path: String,
    pub length: u64,
}

/// A cache entry together with its declared files, in descriptor order.
///
/// The position of each file in `files` is the name of its on-disk fragment.
#[derive(Debug, Clone)]
pub struct TorrentManifest {
    pub entry: CacheEntry,
    pub files: Vec<FileDescriptor>,
}

/// Size of a fragment that exists on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentStat {
    pub index: usize,
    pub size: u64,
}

/// A manifest that passed the completion filter.
///
/// Fragment stats are keyed by their declared index; fragments missing on disk have
/// no key.
#[derive(Debug, Clone)]
pub struct CompletedTorrent {
    pub manifest: TorrentManifest,
    pub fragments: BTreeMap<usize, FragmentStat>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyTask {
    pub source: PathBuf,
    pub destination: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The destination file already existed and was left untouched.
    DestinationExists,
    /// Another torrent in the same run claimed this destination first.
    Collision,
    /// The primary file's fragment is not on disk.
    SourceMissing,
    /// The primary file's declared path has no usable file name.
    InvalidName(String),
    Io(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::DestinationExists => write!(f, "destination exists"),
            SkipReason::Collision => write!(f, "destination claimed by another torrent"),
            SkipReason::SourceMissing => write!(f, "source fragment missing"),
            SkipReason::InvalidName(path) => write!(f, "no usable file name in {:?}", path),
            SkipReason::Io(msg) => write!(f, "{}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyStatus {
    Copied { bytes: u64 },
    /// Dry runs stop after planning.
    Planned,
    Skipped { reason: SkipReason },
}

#[derive(Debug, Clone)]
pub struct CopyOutcome {
    pub torrent: String,
    pub task: CopyTask,
    pub status: CopyStatus,
}

impl CopyOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self.status, CopyStatus::Skipped { .. })
    }

    pub fn is_copied(&self) -> bool {
        matches!(self.status, CopyStatus::Copied { .. })
    }
}
