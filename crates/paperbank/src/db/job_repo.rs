//! Ingestion-job repository — CRUD operations for the `ingestion_jobs` table.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A raw ingestion-job row from the database.
#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: String,
    pub filename: String,
    pub archive_path: Option<String>,
    pub source_url: Option<String>,
    pub extract_path: Option<String>,
    pub exam_type: String,
    pub exam_year: i32,
    pub total_documents: u64,
    pub processed_documents: u64,
    pub status: String,
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            filename: row.get("filename")?,
            archive_path: row.get("archive_path")?,
            source_url: row.get("source_url")?,
            extract_path: row.get("extract_path")?,
            exam_type: row.get("exam_type")?,
            exam_year: row.get("exam_year")?,
            total_documents: row.get("total_documents")?,
            processed_documents: row.get("processed_documents")?,
            status: row.get("status")?,
            error: row.get("error")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Inserts a new job row.
pub fn insert(db: &Database, job: &JobRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO ingestion_jobs (id, filename, archive_path, source_url, extract_path,
             exam_type, exam_year, total_documents, processed_documents, status, error,
             created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                job.id,
                job.filename,
                job.archive_path,
                job.source_url,
                job.extract_path,
                job.exam_type,
                job.exam_year,
                job.total_documents,
                job.processed_documents,
                job.status,
                job.error,
                job.created_at,
                job.updated_at,
            ],
        )?;
        Ok(())
    })
}

/// Finds a job by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM ingestion_jobs WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], JobRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Lists all jobs, newest first. Jobs are an audit trail and are never
/// deleted by the pipeline.
pub fn list_all(db: &Database) -> Result<Vec<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM ingestion_jobs ORDER BY created_at DESC, id DESC")?;
        let rows: Vec<JobRow> = stmt
            .query_map([], JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Records first-touch extraction state: working directory and the lazily
/// discovered document total.
pub fn update_extract_state(
    db: &Database,
    id: &str,
    extract_path: &str,
    total_documents: u64,
    updated_at: &str,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE ingestion_jobs
             SET extract_path = ?2, total_documents = ?3, updated_at = ?4
             WHERE id = ?1",
            params![id, extract_path, total_documents, updated_at],
        )?;
        Ok(())
    })
}

/// Advances batch progress. Count and status move in one statement so a
/// crash between them can never be observed.
pub fn update_progress(
    db: &Database,
    id: &str,
    processed_documents: u64,
    status: &str,
    updated_at: &str,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE ingestion_jobs
             SET processed_documents = ?2, status = ?3, updated_at = ?4
             WHERE id = ?1",
            params![id, processed_documents, status, updated_at],
        )?;
        Ok(())
    })
}

/// Updates only the status (and optional error) of a job.
pub fn update_status(
    db: &Database,
    id: &str,
    status: &str,
    error: Option<&str>,
    updated_at: &str,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE ingestion_jobs SET status = ?2, error = ?3, updated_at = ?4 WHERE id = ?1",
            params![id, status, error, updated_at],
        )?;
        Ok(())
    })
}

/// Attaches the downloaded archive to a fetched-by-URL job.
pub fn set_archive_path(
    db: &Database,
    id: &str,
    archive_path: &str,
    updated_at: &str,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE ingestion_jobs SET archive_path = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, archive_path, updated_at],
        )?;
        Ok(())
    })
}

/// Counts jobs with the given status.
pub fn count_by_status(db: &Database, status: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM ingestion_jobs WHERE status = ?1",
            params![status],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}
