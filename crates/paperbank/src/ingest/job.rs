use std::fmt;
use std::path::{Path, PathBuf};

use chrono::Utc;

use super::IngestError;
use crate::db::job_repo::JobRow;

/// Lifecycle of one archive ingestion.
///
/// Transitions are monotonic; `Failed` is terminal and reachable from any
/// non-terminal state. `Completed` and `Failed` are never left — operator
/// re-creation of the job is the only recovery path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Archive accepted (or, for remote jobs, accepted for download).
    Uploaded,
    /// Remote download in progress; flips back to `Uploaded` on success.
    Fetching,
    /// At least one batch advance has run.
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Uploaded => "UPLOADED",
            JobStatus::Fetching => "FETCHING",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "UPLOADED" => Some(JobStatus::Uploaded),
            "FETCHING" => Some(JobStatus::Fetching),
            "PROCESSING" => Some(JobStatus::Processing),
            "COMPLETED" => Some(JobStatus::Completed),
            "FAILED" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Uploaded, Fetching)
                | (Fetching, Uploaded)
                | (Uploaded, Processing)
                // An archive with zero documents completes on its first advance.
                | (Uploaded, Completed)
                | (Processing, Processing)
                | (Processing, Completed)
        ) || (!self.is_terminal() && next == Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One archive's ingestion record. Retained indefinitely as an audit trail.
#[derive(Debug, Clone)]
pub struct IngestionJob {
    pub id: String,
    pub filename: String,
    /// Local archive file; `None` until a remote fetch completes.
    pub archive_path: Option<PathBuf>,
    pub source_url: Option<String>,
    /// Working directory; set by the first batch advance.
    pub extract_path: Option<PathBuf>,
    pub exam_type: String,
    pub exam_year: i32,
    /// Populated lazily at first extraction, not at creation.
    pub total_documents: u64,
    pub processed_documents: u64,
    pub status: JobStatus,
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl IngestionJob {
    fn new_internal(
        filename: &str,
        archive_path: Option<&Path>,
        source_url: Option<&str>,
        exam_type: &str,
        exam_year: i32,
    ) -> Self {
        let now = timestamp();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            filename: filename.to_string(),
            archive_path: archive_path.map(Path::to_path_buf),
            source_url: source_url.map(str::to_string),
            extract_path: None,
            exam_type: exam_type.to_string(),
            exam_year,
            total_documents: 0,
            processed_documents: 0,
            status: JobStatus::Uploaded,
            error: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Job for a directly uploaded archive, already resident on disk.
    pub fn new_upload(filename: &str, archive_path: &Path, exam_type: &str, exam_year: i32) -> Self {
        Self::new_internal(filename, Some(archive_path), None, exam_type, exam_year)
    }

    /// Job whose archive will be fetched from a remote URL.
    pub fn new_from_url(filename: &str, source_url: &str, exam_type: &str, exam_year: i32) -> Self {
        Self::new_internal(filename, None, Some(source_url), exam_type, exam_year)
    }

    pub(crate) fn from_row(row: JobRow) -> Result<Self, IngestError> {
        let status = JobStatus::parse(&row.status).ok_or_else(|| IngestError::InvalidJobState {
            id: row.id.clone(),
            reason: format!("unknown status '{}'", row.status),
        })?;
        Ok(Self {
            id: row.id,
            filename: row.filename,
            archive_path: row.archive_path.map(PathBuf::from),
            source_url: row.source_url,
            extract_path: row.extract_path.map(PathBuf::from),
            exam_type: row.exam_type,
            exam_year: row.exam_year,
            total_documents: row.total_documents,
            processed_documents: row.processed_documents,
            status,
            error: row.error,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    pub(crate) fn to_row(&self) -> JobRow {
        JobRow {
            id: self.id.clone(),
            filename: self.filename.clone(),
            archive_path: self
                .archive_path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
            source_url: self.source_url.clone(),
            extract_path: self
                .extract_path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
            exam_type: self.exam_type.clone(),
            exam_year: self.exam_year,
            total_documents: self.total_documents,
            processed_documents: self.processed_documents,
            status: self.status.as_str().to_string(),
            error: self.error.clone(),
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
        }
    }
}

pub(crate) fn timestamp() -> String {
    Utc::now().to_rfc3339()
}
