use crate::data::Cache;
use std::fs;
use std::path::PathBuf;

/// Default root folder for cached model responses
pub const DEFAULT_CACHE_DIR: &str = ".verter/cache";

/// FileCache stores cache entries as files.
///
/// Layout: `{folder}/{partition}/{key}.cache`, where `partition` groups all
/// entries produced by one model (a hash of its name).
#[derive(Debug, Clone)]
pub struct FileCache {
    folder: PathBuf,
    partition: String,
}

impl FileCache {
    /// Creates a new FileCache
    ///
    /// # Arguments
    /// * `folder` - Optional root folder. If None, defaults to `.verter/cache`
    /// * `partition` - Subfolder grouping related entries
    pub fn new(folder: Option<PathBuf>, partition: String) -> Self {
        Self {
            folder: folder.unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR)),
            partition,
        }
    }

    /// Keys are expected to be hex hashes, which are already safe file names.
    fn get_cache_path(&self, key: &str) -> PathBuf {
        self.get_cache_dir().join(format!("{}.cache", key))
    }

    fn get_cache_dir(&self) -> PathBuf {
        self.folder.join(&self.partition)
    }
}

impl Cache for FileCache {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.get_cache_path(key)).ok()
    }

    fn set(&self, key: &str, value: &str) {
        let dir = self.get_cache_dir();
        if let Err(e) = fs::create_dir_all(&dir) {
            tracing::warn!(dir = %dir.display(), error = %e, "failed to create cache directory");
            return;
        }

        let path = self.get_cache_path(key);
        if let Err(e) = fs::write(&path, value) {
            tracing::warn!(path = %path.display(), error = %e, "failed to write cache file");
        }
    }
}
