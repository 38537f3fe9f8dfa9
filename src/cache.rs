use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use crate::transform::TransformOutput;
use crate::validate::{CompilerError, ERR_IO};

#[derive(Serialize, Deserialize)]
pub struct CacheEntry {
    pub hash: String,
    pub output: TransformOutput,
}

/// On-disk cache of transform results, one JSON entry per file, valid while
/// the file content and the options fingerprint are unchanged.
pub struct IncrementalCache {
    cache_dir: PathBuf,
}

impl IncrementalCache {
    pub fn new(cache_dir: impl AsRef<Path>) -> Result<Self, CompilerError> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        fs::create_dir_all(&cache_dir).map_err(|e| {
            CompilerError::new(
                ERR_IO,
                &format!("Cannot create cache directory: {}", e),
                &cache_dir.to_string_lossy(),
                0,
                0,
            )
        })?;
        Ok(Self { cache_dir })
    }

    pub fn compute_hash(source: &str, fingerprint: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(fingerprint.as_bytes());
        hasher.update([0u8]);
        hasher.update(source.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn get_cache_path(&self, file_path: &str) -> PathBuf {
        let safe_name = file_path
            .replace("/", "_")
            .replace("\\", "_")
            .replace(":", "_");
        self.cache_dir.join(format!("{}.json", safe_name))
    }

    pub fn get(&self, file_path: &str, source: &str, fingerprint: &str) -> Option<TransformOutput> {
        let cache_path = self.get_cache_path(file_path);
        let data = fs::read_to_string(&cache_path).ok()?;

        let entry: CacheEntry = match serde_json::from_str(&data) {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(file = file_path, error = %e, "corrupt cache entry removed");
                fs::remove_file(cache_path).ok();
                return None;
            }
        };

        if entry.hash == Self::compute_hash(source, fingerprint) {
            tracing::trace!(file = file_path, "cache hit");
            Some(entry.output)
        } else {
            None
        }
    }

    pub fn set(&self, file_path: &str, source: &str, fingerprint: &str, output: &TransformOutput) {
        let cache_path = self.get_cache_path(file_path);
        let entry = CacheEntry {
            hash: Self::compute_hash(source, fingerprint),
            output: output.clone(),
        };

        match serde_json::to_string(&entry) {
            Ok(data) => {
                if let Err(e) = fs::write(&cache_path, data) {
                    tracing::warn!(file = file_path, error = %e, "cache write failed");
                }
            }
            Err(e) => tracing::warn!(file = file_path, error = %e, "cache entry not serializable"),
        }
    }
}
