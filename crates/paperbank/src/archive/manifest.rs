//! Document manifest.
//!
//! The ordered list of documents is enumerated exactly once, at first
//! extraction, and persisted next to the extracted files. Batch slicing
//! always reads the manifest, so the offset arithmetic never depends on
//! two directory walks agreeing on an order.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ArchiveError;

const MANIFEST_FILE: &str = ".manifest.json";
const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    version: u32,
    /// Paths relative to the working directory, in enumeration order.
    documents: Vec<PathBuf>,
}

impl Manifest {
    /// Builds a manifest from absolute document paths under `extract_path`.
    pub fn build(extract_path: &Path, documents: Vec<PathBuf>) -> Result<Self, ArchiveError> {
        let relative = documents
            .into_iter()
            .map(|doc| {
                doc.strip_prefix(extract_path)
                    .map(Path::to_path_buf)
                    .map_err(|_| ArchiveError::Manifest {
                        path: doc.clone(),
                        reason: "document is outside the working directory".to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            version: MANIFEST_VERSION,
            documents: relative,
        })
    }

    pub fn save(&self, extract_path: &Path) -> Result<(), ArchiveError> {
        let path = extract_path.join(MANIFEST_FILE);
        let json = serde_json::to_string(self).map_err(|e| ArchiveError::Manifest {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        std::fs::write(&path, json).map_err(|e| ArchiveError::Io { path, source: e })
    }

    pub fn load(extract_path: &Path) -> Result<Self, ArchiveError> {
        let path = extract_path.join(MANIFEST_FILE);
        let content = std::fs::read_to_string(&path).map_err(|e| ArchiveError::Io {
            path: path.clone(),
            source: e,
        })?;
        let manifest: Manifest =
            serde_json::from_str(&content).map_err(|e| ArchiveError::Manifest {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        if manifest.version != MANIFEST_VERSION {
            return Err(ArchiveError::Manifest {
                path,
                reason: format!("unsupported manifest version {}", manifest.version),
            });
        }
        Ok(manifest)
    }

    pub fn exists(extract_path: &Path) -> bool {
        extract_path.join(MANIFEST_FILE).exists()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// The `[offset, offset + len)` slice, clamped to the document count.
    pub fn slice(&self, offset: usize, len: usize) -> &[PathBuf] {
        let start = offset.min(self.documents.len());
        let end = offset.saturating_add(len).min(self.documents.len());
        &self.documents[start..end]
    }

    pub fn resolve(&self, extract_path: &Path, relative: &Path) -> PathBuf {
        extract_path.join(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample(extract: &Path) -> Manifest {
        let docs = vec![
            extract.join("a.pdf"),
            extract.join("sub").join("b.pdf"),
            extract.join("sub").join("c.pdf"),
        ];
        Manifest::build(extract, docs).unwrap()
    }

    #[test]
    fn test_build_strips_prefix() {
        let tmp = TempDir::new().unwrap();
        let manifest = sample(tmp.path());
        assert_eq!(manifest.len(), 3);
        assert_eq!(manifest.slice(0, 1), &[PathBuf::from("a.pdf")]);
    }

    #[test]
    fn test_build_rejects_foreign_path() {
        let tmp = TempDir::new().unwrap();
        let err = Manifest::build(tmp.path(), vec![PathBuf::from("/elsewhere/doc.pdf")])
            .unwrap_err();
        assert!(matches!(err, ArchiveError::Manifest { .. }));
    }

    #[test]
    fn test_save_and_load_preserve_order() {
        let tmp = TempDir::new().unwrap();
        let manifest = sample(tmp.path());
        manifest.save(tmp.path()).unwrap();

        assert!(Manifest::exists(tmp.path()));
        let loaded = Manifest::load(tmp.path()).unwrap();
        assert_eq!(loaded.slice(0, 10), manifest.slice(0, 10));
    }

    #[test]
    fn test_load_missing_manifest_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let err = Manifest::load(tmp.path()).unwrap_err();
        assert!(matches!(err, ArchiveError::Io { .. }));
    }

    #[test]
    fn test_slice_clamps_out_of_range() {
        let tmp = TempDir::new().unwrap();
        let manifest = sample(tmp.path());

        assert_eq!(manifest.slice(0, 2).len(), 2);
        assert_eq!(manifest.slice(2, 10).len(), 1);
        assert_eq!(manifest.slice(3, 10).len(), 0);
        assert_eq!(manifest.slice(100, 10).len(), 0);
    }

    #[test]
    fn test_resolve_joins_working_directory() {
        let tmp = TempDir::new().unwrap();
        let manifest = sample(tmp.path());
        let resolved = manifest.resolve(tmp.path(), &PathBuf::from("sub/b.pdf"));
        assert_eq!(resolved, tmp.path().join("sub/b.pdf"));
    }
}
