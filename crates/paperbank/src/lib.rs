pub mod archive;
pub mod classifier;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod sanitize;
pub mod storage;
pub mod telemetry;

pub use archive::{ArchiveScanner, FetchLimits, Manifest};
pub use classifier::{ClassifiedDocument, Classifier, Rejection};
pub use config::{load_config, load_config_from_str, Config};
pub use db::Database;
pub use error::{
    ArchiveError, ConfigError, FetchError, PaperbankError, Result, StorageError,
};
pub use ingest::{BatchDriver, IngestError, IngestionJob, JobStatus, ProgressReport};
pub use storage::{BlobStore, FileBlobStore};
