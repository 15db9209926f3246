pub mod driver;
pub mod fetch;
pub mod job;

use thiserror::Error;

use crate::error::{ArchiveError, FetchError};

pub use driver::{BatchDriver, ProgressReport};
pub use job::{IngestionJob, JobStatus};

/// Errors that escape an ingestion operation. Per-document failures never
/// do — they are contained inside the batch loop; everything here means
/// the call as a whole did not happen and is safe to retry.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Job '{id}' cannot be advanced: {reason}")]
    InvalidJobState { id: String, reason: String },

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}
