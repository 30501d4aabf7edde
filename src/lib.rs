pub mod completion;
pub mod config;
pub mod copier;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod model;
pub mod report;
pub mod scanner;

pub use crate::config::{CompletionRule, HarvestConfig};
pub use engine::{HarvestEngine, HarvestResult};
pub use error::Error;
pub use model::{CopyOutcome, CopyStatus, SkipReason};
