//! Batch transforms.
//!
//! Walks a source tree, transforms every script file in parallel and reports
//! one result per file. A failing file never aborts the batch.

#[cfg(feature = "napi")]
use napi_derive::napi;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::cache::IncrementalCache;
use crate::config::{Globals, TransformOptions};
use crate::transform::{transform_with_globals, TransformOutput};
use crate::validate::{CompilerError, ERR_IO};

const SOURCE_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResult {
    pub path: String,
    pub output: Option<TransformOutput>,
    pub error: Option<CompilerError>,
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name == "node_modules" || name.starts_with('.')
}

/// Script files under `root`, sorted. `node_modules` and dot-directories are
/// not entered.
pub fn find_source_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| !is_skipped_dir(entry))
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| SOURCE_EXTENSIONS.contains(&ext))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

pub fn transform_directory(
    root: &Path,
    options: &TransformOptions,
) -> Result<Vec<FileResult>, CompilerError> {
    if !root.is_dir() {
        return Err(CompilerError::new(
            ERR_IO,
            "Root is not a directory.",
            &root.to_string_lossy(),
            0,
            0,
        ));
    }
    let globals = Globals::from_options(options)?;
    let cache = match &options.cache_dir {
        Some(dir) => Some(IncrementalCache::new(dir)?),
        None => None,
    };
    let fingerprint = options.fingerprint();

    let files = find_source_files(root);
    tracing::debug!(root = %root.display(), files = files.len(), "batch transform");

    let mut results: Vec<FileResult> = files
        .par_iter()
        .map(|path| {
            transform_file(
                path,
                &globals,
                &options.registration_hook,
                cache.as_ref(),
                &fingerprint,
            )
        })
        .collect();
    results.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(results)
}

fn transform_file(
    path: &Path,
    globals: &Globals,
    hook: &str,
    cache: Option<&IncrementalCache>,
    fingerprint: &str,
) -> FileResult {
    let file_path = path.to_string_lossy().to_string();
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            tracing::warn!(file = %file_path, error = %e, "unreadable file");
            return FileResult {
                error: Some(CompilerError::new(
                    ERR_IO,
                    &format!("Failed to read file: {}", e),
                    &file_path,
                    0,
                    0,
                )),
                path: file_path,
                output: None,
            };
        }
    };

    if let Some(output) = cache.and_then(|c| c.get(&file_path, &source, fingerprint)) {
        return FileResult {
            path: file_path,
            output: Some(output),
            error: None,
        };
    }

    match transform_with_globals(&source, &file_path, globals, hook) {
        Ok(output) => {
            if let Some(cache) = cache {
                cache.set(&file_path, &source, fingerprint, &output);
            }
            FileResult {
                path: file_path,
                output: Some(output),
                error: None,
            }
        }
        Err(err) => {
            tracing::warn!(file = %file_path, error = %err, "transform failed");
            FileResult {
                path: file_path,
                output: None,
                error: Some(err),
            }
        }
    }
}

/// Transforms every script file under `root`. Returns `FileResult[]` as JSON.
#[cfg(feature = "napi")]
#[napi]
pub fn transform_directory_native(root: String, options_json: Option<String>) -> napi::Result<String> {
    let options = TransformOptions::from_json(options_json.as_deref().unwrap_or(""))
        .map_err(|e| napi::Error::from_reason(e.to_string()))?;
    let results = transform_directory(Path::new(&root), &options)
        .map_err(|e| napi::Error::from_reason(e.to_string()))?;
    serde_json::to_string(&results)
        .map_err(|e| napi::Error::from_reason(format!("Serialize error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_skips_vendor_and_hidden_dirs() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/a.js", "");
        write(dir.path(), "src/b.tsx", "");
        write(dir.path(), "src/readme.md", "");
        write(dir.path(), "node_modules/x/index.js", "");
        write(dir.path(), ".cache/c.js", "");

        let files = find_source_files(dir.path());
        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["src/a.js", "src/b.tsx"]);
    }

    #[test]
    fn test_batch_reports_each_file() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "a.js",
            "const s = useAnimatedStyle(() => ({ opacity: o.value }));",
        );
        write(dir.path(), "b.js", "const broken = ;");
        write(dir.path(), "c.js", "const plain = 1;");

        let results = transform_directory(dir.path(), &TransformOptions::default()).unwrap();
        assert_eq!(results.len(), 3);

        assert_eq!(results[0].output.as_ref().unwrap().worklets.len(), 1);
        assert!(results[1].output.is_none());
        assert_eq!(results[1].error.as_ref().unwrap().code, "W-ERR-SYNTAX-001");
        assert_eq!(results[2].output.as_ref().unwrap().code, "const plain = 1;");
    }

    #[test]
    fn test_cache_dir_is_populated() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.js", "const f = () => { 'worklet'; return 1; };");
        let options = TransformOptions {
            cache_dir: Some(cache_dir.path().to_string_lossy().to_string()),
            ..Default::default()
        };

        let first = transform_directory(dir.path(), &options).unwrap();
        let second = transform_directory(dir.path(), &options).unwrap();
        assert_eq!(first[0].output, second[0].output);
        assert_eq!(fs::read_dir(cache_dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = transform_directory(&dir.path().join("nope"), &TransformOptions::default())
            .unwrap_err();
        assert_eq!(err.code, ERR_IO);
    }
}
