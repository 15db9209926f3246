use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;

use crate::classifier::ClassifiedDocument;
use crate::error::StorageError;
use crate::sanitize;
use crate::storage::BlobStore;

/// Filesystem blob store. The locator it returns is the blob's filename
/// relative to the storage directory, which stays stable across moves of
/// the directory itself.
pub struct FileBlobStore {
    storage_directory: PathBuf,
}

impl FileBlobStore {
    pub fn new<P: AsRef<Path>>(storage_directory: P) -> Self {
        Self {
            storage_directory: storage_directory.as_ref().to_path_buf(),
        }
    }

    pub fn storage_directory(&self) -> &Path {
        &self.storage_directory
    }

    /// Blob name derived from the classification: `CODE_Subject_Name.pdf`.
    fn blob_filename(document: &ClassifiedDocument) -> String {
        format!(
            "{}_{}.pdf",
            document.subject_code,
            sanitize::blob_component(&document.subject_name)
        )
    }

    fn ensure_directory(&self) -> Result<(), StorageError> {
        if !self.storage_directory.exists() {
            std::fs::create_dir_all(&self.storage_directory).map_err(|e| {
                StorageError::CreateDirectory {
                    path: self.storage_directory.clone(),
                    source: e,
                }
            })?;
        }
        Ok(())
    }

    /// Writes content under `filename`, appending `_2`, `_3`, ... on
    /// conflict. Uses `create_new` so the check and the create are one
    /// atomic operation.
    fn store_with_atomic_creation(
        &self,
        filename: &str,
        content: &[u8],
    ) -> Result<PathBuf, StorageError> {
        let (base, ext) = match filename.rfind('.') {
            Some(dot) => (&filename[..dot], Some(&filename[dot..])),
            None => (filename, None),
        };

        for counter in 1..=1000 {
            let try_filename = if counter == 1 {
                filename.to_string()
            } else {
                match ext {
                    Some(ext) => format!("{}_{}{}", base, counter, ext),
                    None => format!("{}_{}", base, counter),
                }
            };

            let try_path = self.storage_directory.join(&try_filename);
            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&try_path)
            {
                Ok(mut file) => {
                    file.write_all(content)
                        .map_err(|e| StorageError::WriteFile {
                            path: try_path.clone(),
                            source: e,
                        })?;
                    return Ok(try_path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(StorageError::WriteFile {
                        path: try_path,
                        source: e,
                    });
                }
            }
        }

        Err(StorageError::FileExists(
            self.storage_directory.join(filename),
        ))
    }
}

impl BlobStore for FileBlobStore {
    fn store(
        &self,
        local_path: &Path,
        document: &ClassifiedDocument,
    ) -> Result<String, StorageError> {
        self.ensure_directory()?;

        let content = std::fs::read(local_path).map_err(|e| StorageError::ReadSource {
            path: local_path.to_path_buf(),
            source: e,
        })?;

        let stored = self.store_with_atomic_creation(&Self::blob_filename(document), &content)?;

        debug!(
            "Stored {} -> {}",
            sanitize::redact_path(local_path),
            stored.display()
        );

        let locator = stored
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_string())
            .unwrap_or_else(|| stored.display().to_string());
        Ok(locator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_document() -> ClassifiedDocument {
        ClassifiedDocument {
            degree: "B.Tech".to_string(),
            branch: "CSE".to_string(),
            semester: 3,
            subject_code: "SE1BECS".to_string(),
            subject_name: "Applied Mathematics Iii".to_string(),
        }
    }

    fn write_source(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"%PDF-1.4 test").unwrap();
        path
    }

    #[test]
    fn test_store_names_blob_from_classification() {
        let tmp = TempDir::new().unwrap();
        let source = write_source(tmp.path(), "raw.pdf");

        let store = FileBlobStore::new(tmp.path().join("storage"));
        let locator = store.store(&source, &sample_document()).unwrap();

        assert_eq!(locator, "SE1BECS_Applied_Mathematics_Iii.pdf");
        let blob = store.storage_directory().join(&locator);
        assert_eq!(std::fs::read(blob).unwrap(), b"%PDF-1.4 test");
        // Source is left in place; the working directory owns its lifecycle.
        assert!(source.exists());
    }

    #[test]
    fn test_store_conflict_appends_counter() {
        let tmp = TempDir::new().unwrap();
        let source = write_source(tmp.path(), "raw.pdf");
        let store = FileBlobStore::new(tmp.path().join("storage"));

        let first = store.store(&source, &sample_document()).unwrap();
        let second = store.store(&source, &sample_document()).unwrap();
        let third = store.store(&source, &sample_document()).unwrap();

        assert_eq!(first, "SE1BECS_Applied_Mathematics_Iii.pdf");
        assert_eq!(second, "SE1BECS_Applied_Mathematics_Iii_2.pdf");
        assert_eq!(third, "SE1BECS_Applied_Mathematics_Iii_3.pdf");
    }

    #[test]
    fn test_store_missing_source_is_read_error() {
        let tmp = TempDir::new().unwrap();
        let store = FileBlobStore::new(tmp.path().join("storage"));

        let err = store
            .store(&tmp.path().join("absent.pdf"), &sample_document())
            .unwrap_err();
        assert!(matches!(err, StorageError::ReadSource { .. }));
    }

    #[test]
    fn test_store_creates_storage_directory() {
        let tmp = TempDir::new().unwrap();
        let source = write_source(tmp.path(), "raw.pdf");
        let nested = tmp.path().join("deep").join("storage");

        let store = FileBlobStore::new(&nested);
        store.store(&source, &sample_document()).unwrap();
        assert!(nested.exists());
    }
}
