use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed descriptor {}: {source}", .path.display())]
    Descriptor {
        path: PathBuf,
        #[source]
        source: DescriptorError,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("HOME is not set; cache and destination roots must be configured explicitly")]
    MissingHome,
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

/// Why a descriptor could not be turned into a file manifest.
#[derive(Error, Debug)]
pub enum DescriptorError {
    #[error(transparent)]
    Decode(#[from] serde_bencode::Error),

    #[error("missing `{0}` field")]
    MissingField(&'static str),

    #[error("negative length {0}")]
    NegativeLength(i64),
}
