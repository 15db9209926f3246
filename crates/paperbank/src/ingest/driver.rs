use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, info_span, warn};

use crate::archive::{fetcher, ArchiveScanner, Manifest};
use crate::classifier::{Classifier, Rejection};
use crate::config::Config;
use crate::db::{catalog_repo, job_repo, Database};
use crate::error::{ConfigError, StorageError};
use crate::sanitize;
use crate::storage::BlobStore;

use super::job::{self, IngestionJob, JobStatus};
use super::IngestError;

/// Snapshot of a job's progress after one `advance` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressReport {
    pub job_id: String,
    pub processed: u64,
    pub total: u64,
    pub percentage: u8,
    pub status: JobStatus,
    /// Documents actually classified and catalogued by this call.
    pub stored: u64,
}

impl ProgressReport {
    fn of(job: &IngestionJob, stored: u64) -> Self {
        let percentage = if job.total_documents == 0 {
            0
        } else {
            ((job.processed_documents * 100) / job.total_documents).min(100) as u8
        };
        Self {
            job_id: job.id.clone(),
            processed: job.processed_documents,
            total: job.total_documents,
            percentage,
            status: job.status,
            stored,
        }
    }
}

/// Why one document in a slice was skipped. Contained here; never
/// propagates past `advance`.
#[derive(thiserror::Error, Debug)]
enum DocumentError {
    #[error("rejected: {0}")]
    Rejected(#[from] Rejection),

    #[error("storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("catalog insert failed: {0}")]
    Catalog(#[from] crate::db::DatabaseError),

    #[error("filename is not valid UTF-8")]
    NonUtf8Name,
}

/// Advances ingestion jobs one bounded slice at a time.
///
/// Each `advance` call is a complete unit of work sized by `slice_size`,
/// so external schedulers can invoke it repeatedly without any call
/// outliving a request deadline. At-most-one concurrent advance per job
/// is the caller's obligation (per-job lock or single-writer transaction
/// upstream); advances of different jobs are independent.
pub struct BatchDriver {
    db: Database,
    scanner: ArchiveScanner,
    classifier: Classifier,
    blob_store: Arc<dyn BlobStore>,
}

impl BatchDriver {
    pub fn new(
        db: Database,
        config: &Config,
        blob_store: Arc<dyn BlobStore>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            db,
            scanner: ArchiveScanner::new(&config.work_directory),
            classifier: Classifier::new(&config.classifier)?,
            blob_store,
        })
    }

    /// Registers a directly uploaded archive.
    pub fn create_job(
        &self,
        filename: &str,
        archive_path: &Path,
        exam_type: &str,
        exam_year: i32,
    ) -> Result<IngestionJob, IngestError> {
        let job = IngestionJob::new_upload(filename, archive_path, exam_type, exam_year);
        job_repo::insert(&self.db, &job.to_row())?;
        info!(job_id = %job.id, filename, "ingestion job created");
        Ok(job)
    }

    /// Registers a fetch-by-URL job. The URL is validated up front; the
    /// download itself runs detached (see `ingest::fetch`).
    pub fn create_job_from_url(
        &self,
        url: &str,
        filename: &str,
        exam_type: &str,
        exam_year: i32,
    ) -> Result<IngestionJob, IngestError> {
        fetcher::validate_url(url)?;
        let job = IngestionJob::new_from_url(filename, url, exam_type, exam_year);
        job_repo::insert(&self.db, &job.to_row())?;
        info!(job_id = %job.id, url, "fetch-by-url job created");
        Ok(job)
    }

    /// Loads a job for status inspection.
    pub fn find_job(&self, job_id: &str) -> Result<IngestionJob, IngestError> {
        let row = job_repo::find_by_id(&self.db, job_id)?
            .ok_or_else(|| IngestError::JobNotFound(job_id.to_string()))?;
        IngestionJob::from_row(row)
    }

    /// Processes the next `slice_size` documents of a job.
    ///
    /// The first call extracts the archive and persists the document
    /// manifest; later calls slice the manifest from the persisted offset.
    /// Progress advances by the number of documents *attempted*, so a
    /// permanently-rejected file can never stall the job. A terminal job
    /// reports itself idempotently with no side effects.
    pub fn advance(&self, job_id: &str, slice_size: usize) -> Result<ProgressReport, IngestError> {
        let mut job = self.find_job(job_id)?;
        let _span = info_span!("advance", job_id = %job.id, slice_size).entered();

        match job.status {
            JobStatus::Completed | JobStatus::Failed => {
                debug!(status = %job.status, "terminal job, nothing to do");
                return Ok(ProgressReport::of(&job, 0));
            }
            JobStatus::Fetching => {
                return Err(IngestError::InvalidJobState {
                    id: job.id.clone(),
                    reason: "archive download still in progress".to_string(),
                });
            }
            JobStatus::Uploaded | JobStatus::Processing => {}
        }

        let archive_path =
            job.archive_path
                .clone()
                .ok_or_else(|| IngestError::InvalidJobState {
                    id: job.id.clone(),
                    reason: "no archive attached to this job".to_string(),
                })?;

        let extract_path = match job.extract_path.clone().filter(|p| Manifest::exists(p)) {
            Some(path) => path,
            None => self.first_touch_extract(&mut job, &archive_path)?,
        };

        let manifest = Manifest::load(&extract_path)?;
        let total = manifest.len() as u64;
        let processed = job.processed_documents;

        let slice = manifest.slice(processed as usize, slice_size);
        let mut stored = 0u64;
        for relative in slice {
            let document_path = manifest.resolve(&extract_path, relative);
            let _doc_span =
                info_span!("document", file = %sanitize::redact_path(&document_path)).entered();
            match self.process_document(&document_path, &job) {
                Ok(()) => stored += 1,
                Err(DocumentError::Rejected(rejection)) => {
                    debug!(%rejection, "document excluded");
                }
                Err(e) => {
                    warn!(error = %e, "document skipped");
                }
            }
        }

        let attempted = slice.len() as u64;
        let new_processed = processed + attempted;
        let new_status = if new_processed >= total {
            JobStatus::Completed
        } else {
            JobStatus::Processing
        };
        job_repo::update_progress(
            &self.db,
            &job.id,
            new_processed,
            new_status.as_str(),
            &job::timestamp(),
        )?;

        job.processed_documents = new_processed;
        job.total_documents = total;
        job.status = new_status;

        if new_status == JobStatus::Completed {
            info!(processed = new_processed, total, "job completed");
            self.scanner
                .cleanup(Some(&extract_path), Some(&archive_path));
        } else {
            info!(processed = new_processed, total, attempted, stored, "batch advanced");
        }

        Ok(ProgressReport::of(&job, stored))
    }

    /// Marks a non-terminal job failed and releases its working files.
    pub fn fail_job(&self, job_id: &str, reason: &str) -> Result<(), IngestError> {
        let job = self.find_job(job_id)?;
        if job.status.is_terminal() {
            return Err(IngestError::InvalidJobState {
                id: job.id.clone(),
                reason: format!("job is already {}", job.status),
            });
        }
        job_repo::update_status(
            &self.db,
            &job.id,
            JobStatus::Failed.as_str(),
            Some(reason),
            &job::timestamp(),
        )?;
        self.scanner
            .cleanup(job.extract_path.as_deref(), job.archive_path.as_deref());
        warn!(job_id = %job.id, reason, "job failed");
        Ok(())
    }

    /// First-touch initialization: extract, enumerate, persist the
    /// manifest and the lazily-learned document total.
    fn first_touch_extract(
        &self,
        job: &mut IngestionJob,
        archive_path: &Path,
    ) -> Result<std::path::PathBuf, IngestError> {
        let _span = info_span!("extract").entered();
        let dest = self
            .scanner
            .extract(archive_path, &job.exam_type, job.exam_year)?;
        let documents = self.scanner.list_documents(&dest)?;
        let manifest = Manifest::build(&dest, documents)?;
        manifest.save(&dest)?;

        let total = manifest.len() as u64;
        job_repo::update_extract_state(
            &self.db,
            &job.id,
            &dest.to_string_lossy(),
            total,
            &job::timestamp(),
        )?;
        info!(total, "archive extracted");

        job.total_documents = total;
        job.extract_path = Some(dest.clone());
        Ok(dest)
    }

    fn process_document(&self, path: &Path, job: &IngestionJob) -> Result<(), DocumentError> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or(DocumentError::NonUtf8Name)?;

        let document = self.classifier.classify(filename)?;
        let locator = self.blob_store.store(path, &document)?;
        catalog_repo::insert(
            &self.db,
            &catalog_repo::NewPaper {
                document: &document,
                exam_type: &job.exam_type,
                exam_year: job.exam_year,
                file_path: &locator,
            },
        )?;

        debug!(
            code = %document.subject_code,
            branch = %document.branch,
            semester = document.semester,
            "document catalogued"
        );
        Ok(())
    }
}
