//! Catalog repository — classified papers and their faceted lookups.
//!
//! The catalog accepts duplicate inserts by design; deduplication, if
//! any, is the consumer's policy.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};
use crate::classifier::ClassifiedDocument;

/// A catalogued paper row.
#[derive(Debug, Clone)]
pub struct PaperRow {
    pub id: i64,
    pub degree: String,
    pub branch: String,
    pub semester: u8,
    pub subject_code: String,
    pub subject_name: String,
    pub exam_type: String,
    pub exam_year: i32,
    pub file_path: String,
    pub created_at: String,
}

impl PaperRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            degree: row.get("degree")?,
            branch: row.get("branch")?,
            semester: row.get("semester")?,
            subject_code: row.get("subject_code")?,
            subject_name: row.get("subject_name")?,
            exam_type: row.get("exam_type")?,
            exam_year: row.get("exam_year")?,
            file_path: row.get("file_path")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// A distinct subject within one session/branch/semester facet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectRow {
    pub subject_code: String,
    pub subject_name: String,
}

/// A new catalog record: classification output plus its session identity
/// and the blob-store locator.
#[derive(Debug)]
pub struct NewPaper<'a> {
    pub document: &'a ClassifiedDocument,
    pub exam_type: &'a str,
    pub exam_year: i32,
    pub file_path: &'a str,
}

/// Inserts a catalog record, returning the new row id.
pub fn insert(db: &Database, paper: &NewPaper<'_>) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO papers
             (degree, branch, semester, subject_code, subject_name, exam_type, exam_year, file_path, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, datetime('now'))",
            params![
                paper.document.degree,
                paper.document.branch,
                paper.document.semester,
                paper.document.subject_code,
                paper.document.subject_name,
                paper.exam_type,
                paper.exam_year,
                paper.file_path,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

/// All distinct exam sessions, newest year first.
pub fn exam_sessions(db: &Database) -> Result<Vec<(String, i32)>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT DISTINCT exam_type, exam_year FROM papers
             ORDER BY exam_year DESC, exam_type",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// All branches seen in one session.
pub fn branches_by_session(
    db: &Database,
    exam_type: &str,
    exam_year: i32,
) -> Result<Vec<String>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT DISTINCT branch FROM papers
             WHERE exam_type = ?1 AND exam_year = ?2
             ORDER BY branch",
        )?;
        let rows = stmt
            .query_map(params![exam_type, exam_year], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// All distinct subjects for a session/branch/semester facet.
pub fn subjects(
    db: &Database,
    exam_type: &str,
    exam_year: i32,
    branch: &str,
    semester: u8,
) -> Result<Vec<SubjectRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT DISTINCT subject_code, subject_name FROM papers
             WHERE exam_type = ?1 AND exam_year = ?2 AND branch = ?3 AND semester = ?4
             ORDER BY subject_code",
        )?;
        let rows = stmt
            .query_map(params![exam_type, exam_year, branch, semester], |row| {
                Ok(SubjectRow {
                    subject_code: row.get(0)?,
                    subject_name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// One paper for the fully-qualified facet, if any.
pub fn paper_details(
    db: &Database,
    exam_type: &str,
    exam_year: i32,
    branch: &str,
    semester: u8,
    subject_code: &str,
) -> Result<Option<PaperRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM papers
             WHERE exam_type = ?1 AND exam_year = ?2 AND branch = ?3
               AND semester = ?4 AND subject_code = ?5
             LIMIT 1",
        )?;
        let mut rows = stmt.query_map(
            params![exam_type, exam_year, branch, semester, subject_code],
            PaperRow::from_row,
        )?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Fetches one paper by id.
pub fn find_by_id(db: &Database, id: i64) -> Result<Option<PaperRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM papers WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], PaperRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}
