pub mod filesystem;

use std::path::Path;

use crate::classifier::ClassifiedDocument;
use crate::error::StorageError;

pub use filesystem::FileBlobStore;

/// Where accepted documents end up. The returned locator is an opaque,
/// stable string usable later for retrieval or redirect — a relative path
/// for the filesystem store, possibly a URL for remote implementations.
pub trait BlobStore: Send + Sync {
    fn store(
        &self,
        local_path: &Path,
        document: &ClassifiedDocument,
    ) -> Result<String, StorageError>;
}
