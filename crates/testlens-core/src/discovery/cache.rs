//! Content-hash cache for repeated discovery passes.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::warn;

use super::walk::source_files;
use super::{discover, group_by_file, DiscoveryError, TestFile, TestFunction};
use crate::config::DiscoveryConfig;

#[derive(Debug, Clone)]
struct CachedFile {
    hash: String,
    tests: Vec<TestFunction>,
}

/// Caches discovery results per path, keyed by a SHA-256 of the content.
///
/// A file whose content is unchanged returns its previous records; a changed
/// file is re-scanned and its records replaced wholesale.
#[derive(Debug, Default)]
pub struct DiscoveryCache {
    files: HashMap<String, CachedFile>,
    hits: usize,
    misses: usize,
}

impl DiscoveryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute SHA256 hash of content for change detection.
    fn compute_hash(content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Discover tests in one file, reusing the cached result if the content is unchanged.
    pub fn discover(&mut self, file_path: &str, content: &str) -> Vec<TestFunction> {
        let hash = Self::compute_hash(content);

        if let Some(cached) = self.files.get(file_path) {
            if cached.hash == hash {
                self.hits += 1;
                return cached.tests.clone();
            }
        }

        self.misses += 1;
        let tests = discover(file_path, content);
        self.files.insert(
            file_path.to_string(),
            CachedFile {
                hash,
                tests: tests.clone(),
            },
        );
        tests
    }

    /// Re-discover a whole tree. Files that disappeared are evicted.
    pub fn refresh_directory(
        &mut self,
        root: &Path,
        config: &DiscoveryConfig,
    ) -> Result<Vec<TestFile>, DiscoveryError> {
        let files = source_files(root, config)?;
        let mut tests = Vec::new();

        for (relative, path) in &files {
            match fs::read_to_string(path) {
                Ok(content) => tests.extend(self.discover(relative, &content)),
                Err(e) => warn!(path = %relative, error = %e, "failed to read source file"),
            }
        }

        self.files
            .retain(|key, _| files.iter().any(|(relative, _)| relative == key));

        Ok(group_by_file(tests))
    }

    /// Drop a file from the cache.
    pub fn remove(&mut self, file_path: &str) {
        self.files.remove(file_path);
    }

    /// Number of cached files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// `(hits, misses)` since creation.
    pub fn stats(&self) -> (usize, usize) {
        (self.hits, self.misses)
    }
}
