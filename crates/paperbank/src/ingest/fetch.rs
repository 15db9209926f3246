//! Detached remote-archive fetch.
//!
//! The download is the one operation that outlives the request that
//! started it. It runs as a spawned task; its outcome is written to the
//! job row (`FETCHING` → `UPLOADED` or `FAILED`) and observed by polling
//! the job, never returned to the initiator.

use std::path::{Path, PathBuf};

use log::{info, warn};

use super::job::{self, IngestionJob, JobStatus};
use super::IngestError;
use crate::archive::fetcher::{self, FetchLimits};
use crate::db::{job_repo, Database};
use crate::error::FetchError;

/// Drives one job through its download. Intended for `tokio::spawn`;
/// cancellable only by process exit.
pub async fn run(db: Database, work_directory: PathBuf, job_id: String, limits: FetchLimits) {
    if let Err(e) = fetch_archive(&db, &work_directory, &job_id, &limits).await {
        warn!("Archive fetch for job {} failed: {}", job_id, e);
        mark_failed(&db, &job_id, &e.to_string());
    }
}

/// Records the failure on the job unless it already reached a terminal
/// state; terminal states are never left.
fn mark_failed(db: &Database, job_id: &str, reason: &str) {
    let terminal = job_repo::find_by_id(db, job_id)
        .ok()
        .flatten()
        .and_then(|row| JobStatus::parse(&row.status))
        .map(|status| status.is_terminal())
        .unwrap_or(true);
    if !terminal {
        let _ = job_repo::update_status(
            db,
            job_id,
            JobStatus::Failed.as_str(),
            Some(reason),
            &job::timestamp(),
        );
    }
}

async fn fetch_archive(
    db: &Database,
    work_directory: &Path,
    job_id: &str,
    limits: &FetchLimits,
) -> Result<(), IngestError> {
    let row = job_repo::find_by_id(db, job_id)?
        .ok_or_else(|| IngestError::JobNotFound(job_id.to_string()))?;
    let job = IngestionJob::from_row(row)?;

    let source_url = job
        .source_url
        .clone()
        .ok_or_else(|| IngestError::InvalidJobState {
            id: job.id.clone(),
            reason: "job has no source URL".to_string(),
        })?;
    if !job.status.can_transition_to(JobStatus::Fetching) {
        return Err(IngestError::InvalidJobState {
            id: job.id.clone(),
            reason: format!("cannot start a fetch from status {}", job.status),
        });
    }

    let url = fetcher::validate_url(&source_url)?;

    job_repo::update_status(
        db,
        &job.id,
        JobStatus::Fetching.as_str(),
        None,
        &job::timestamp(),
    )?;

    tokio::fs::create_dir_all(work_directory)
        .await
        .map_err(|e| FetchError::Io {
            path: work_directory.to_path_buf(),
            source: e,
        })?;

    let dest = work_directory.join(format!("{}.zip", job.id));
    let size = fetcher::download(&url, &dest, limits).await?;
    info!("Fetched archive for job {} ({} bytes)", job.id, size);

    job_repo::set_archive_path(db, &job.id, &dest.to_string_lossy(), &job::timestamp())?;
    job_repo::update_status(
        db,
        &job.id,
        JobStatus::Uploaded.as_str(),
        None,
        &job::timestamp(),
    )?;
    Ok(())
}
