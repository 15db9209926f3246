use std::fs::File;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use walkdir::WalkDir;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::ArchiveError;

/// Extracts ingestion archives into per-session working directories and
/// enumerates the document payloads inside them.
pub struct ArchiveScanner {
    work_directory: PathBuf,
}

impl ArchiveScanner {
    pub fn new<P: AsRef<Path>>(work_directory: P) -> Self {
        Self {
            work_directory: work_directory.as_ref().to_path_buf(),
        }
    }

    pub fn work_directory(&self) -> &Path {
        &self.work_directory
    }

    /// Working directory derived from the session identity. Deterministic,
    /// so a restarted job lands in the same place.
    pub fn extract_dir(&self, exam_type: &str, exam_year: i32) -> PathBuf {
        self.work_directory
            .join(format!("extract_{}_{}", exam_type, exam_year))
    }

    /// Unpacks the archive into the session's working directory.
    ///
    /// Any pre-existing directory at that path is removed first: a second
    /// extraction of the same session fully replaces prior content.
    pub fn extract(
        &self,
        archive_path: &Path,
        exam_type: &str,
        exam_year: i32,
    ) -> Result<PathBuf, ArchiveError> {
        let dest = self.extract_dir(exam_type, exam_year);

        if dest.exists() {
            std::fs::remove_dir_all(&dest).map_err(|e| ArchiveError::Io {
                path: dest.clone(),
                source: e,
            })?;
        }
        std::fs::create_dir_all(&dest).map_err(|e| ArchiveError::Io {
            path: dest.clone(),
            source: e,
        })?;

        let file = File::open(archive_path).map_err(|e| ArchiveError::Io {
            path: archive_path.to_path_buf(),
            source: e,
        })?;
        let mut archive = ZipArchive::new(file).map_err(|e| ArchiveError::Corrupt {
            path: archive_path.to_path_buf(),
            source: e,
        })?;
        archive.extract(&dest).map_err(|e| match e {
            ZipError::Io(io) => ArchiveError::Io {
                path: dest.clone(),
                source: io,
            },
            other => ArchiveError::Corrupt {
                path: archive_path.to_path_buf(),
                source: other,
            },
        })?;

        info!(
            "Extracted {} entries of {} into {}",
            archive.len(),
            archive_path.display(),
            dest.display()
        );
        Ok(dest)
    }

    /// Recursively collects every PDF under the working directory.
    ///
    /// Entries are visited in name-sorted order, so the result is stable
    /// for an unmodified directory; the manifest written at extraction
    /// time is still the source of truth for batch slicing.
    pub fn list_documents(&self, extract_path: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
        let mut documents = Vec::new();

        for entry in WalkDir::new(extract_path).sort_by_file_name() {
            let entry = entry.map_err(|e| ArchiveError::Scan {
                path: extract_path.to_path_buf(),
                source: e,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let is_pdf = mime_guess::from_path(entry.path())
                .first()
                .map(|m| m == mime_guess::mime::APPLICATION_PDF)
                .unwrap_or(false);
            if is_pdf {
                debug!("Found document: {}", entry.path().display());
                documents.push(entry.into_path());
            }
        }

        info!(
            "Found {} documents under {}",
            documents.len(),
            extract_path.display()
        );
        Ok(documents)
    }

    /// Removes the working directory and the original archive. Only called
    /// once the owning job is terminal; failures are logged, not fatal.
    pub fn cleanup(&self, extract_path: Option<&Path>, archive_path: Option<&Path>) {
        if let Some(dir) = extract_path {
            if dir.exists() {
                if let Err(e) = std::fs::remove_dir_all(dir) {
                    warn!("Failed to remove working directory {}: {}", dir.display(), e);
                }
            }
        }
        if let Some(file) = archive_path {
            if file.exists() {
                if let Err(e) = std::fs::remove_file(file) {
                    warn!("Failed to remove archive {}: {}", file.display(), e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, entries: &[&str]) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        for name in entries {
            writer
                .start_file(name.to_string(), SimpleFileOptions::default())
                .unwrap();
            writer.write_all(b"%PDF-1.4").unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_extract_and_list() {
        let tmp = TempDir::new().unwrap();
        let zip_path = tmp.path().join("papers.zip");
        write_zip(
            &zip_path,
            &["a.pdf", "nested/b.pdf", "nested/deep/c.PDF", "notes.txt"],
        );

        let scanner = ArchiveScanner::new(tmp.path().join("work"));
        let dest = scanner.extract(&zip_path, "SUMMER", 2024).unwrap();
        assert!(dest.ends_with("extract_SUMMER_2024"));

        let documents = scanner.list_documents(&dest).unwrap();
        // Three PDFs (extension match is case-insensitive), txt excluded.
        assert_eq!(documents.len(), 3);
    }

    #[test]
    fn test_second_extraction_replaces_prior_content() {
        let tmp = TempDir::new().unwrap();
        let scanner = ArchiveScanner::new(tmp.path().join("work"));

        let first = tmp.path().join("first.zip");
        write_zip(&first, &["old.pdf"]);
        let dest = scanner.extract(&first, "WINTER", 2023).unwrap();
        assert!(dest.join("old.pdf").exists());

        let second = tmp.path().join("second.zip");
        write_zip(&second, &["new.pdf"]);
        let dest = scanner.extract(&second, "WINTER", 2023).unwrap();
        assert!(!dest.join("old.pdf").exists());
        assert!(dest.join("new.pdf").exists());
    }

    #[test]
    fn test_corrupt_archive_error() {
        let tmp = TempDir::new().unwrap();
        let bogus = tmp.path().join("broken.zip");
        std::fs::write(&bogus, b"this is not a zip file").unwrap();

        let scanner = ArchiveScanner::new(tmp.path().join("work"));
        let err = scanner.extract(&bogus, "SUMMER", 2024).unwrap_err();
        assert!(matches!(err, ArchiveError::Corrupt { .. }));
    }

    #[test]
    fn test_missing_archive_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let scanner = ArchiveScanner::new(tmp.path().join("work"));
        let err = scanner
            .extract(&tmp.path().join("absent.zip"), "SUMMER", 2024)
            .unwrap_err();
        assert!(matches!(err, ArchiveError::Io { .. }));
    }

    #[test]
    fn test_list_order_is_stable() {
        let tmp = TempDir::new().unwrap();
        let zip_path = tmp.path().join("papers.zip");
        write_zip(&zip_path, &["c.pdf", "a.pdf", "b/x.pdf", "b/a.pdf"]);

        let scanner = ArchiveScanner::new(tmp.path().join("work"));
        let dest = scanner.extract(&zip_path, "SUMMER", 2024).unwrap();

        let first = scanner.list_documents(&dest).unwrap();
        let second = scanner.list_documents(&dest).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_cleanup_removes_both() {
        let tmp = TempDir::new().unwrap();
        let zip_path = tmp.path().join("papers.zip");
        write_zip(&zip_path, &["a.pdf"]);

        let scanner = ArchiveScanner::new(tmp.path().join("work"));
        let dest = scanner.extract(&zip_path, "SUMMER", 2024).unwrap();

        scanner.cleanup(Some(&dest), Some(&zip_path));
        assert!(!dest.exists());
        assert!(!zip_path.exists());

        // Idempotent on already-removed paths.
        scanner.cleanup(Some(&dest), Some(&zip_path));
    }
}
