//! Project-wide discovery over a directory tree.

use ignore::WalkBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{discover, group_by_file, DiscoveryError, TestFile};
use crate::config::DiscoveryConfig;

/// Walk `root` and discover tests in every matching source file.
///
/// Hidden files and `.gitignore`d paths are skipped, as are the configured
/// excluded directories. Unreadable files are logged and skipped. Paths in the
/// result are relative to `root`.
pub fn discover_directory(
    root: &Path,
    config: &DiscoveryConfig,
) -> Result<Vec<TestFile>, DiscoveryError> {
    let mut tests = Vec::new();

    for (relative, path) in source_files(root, config)? {
        match fs::read_to_string(&path) {
            Ok(content) => tests.extend(discover(&relative, &content)),
            Err(e) => warn!(path = %relative, error = %e, "failed to read source file"),
        }
    }

    let files = group_by_file(tests);
    debug!(root = %root.display(), files = files.len(), "directory discovery finished");
    Ok(files)
}

/// List `(relative_path, absolute_path)` for every file discovery should scan.
pub(super) fn source_files(
    root: &Path,
    config: &DiscoveryConfig,
) -> Result<Vec<(String, PathBuf)>, DiscoveryError> {
    fs::metadata(root).map_err(|e| DiscoveryError::io(root, e))?;

    let exclude = config.clone();
    let walker = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            !(is_dir && exclude.excludes_dir(&entry.file_name().to_string_lossy()))
        })
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == Some(0) => return Err(e.into()),
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };

        let path = entry.path();
        if !path.is_file() || !config.wants(path) {
            continue;
        }

        let relative = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        files.push((relative, path.to_path_buf()));
    }

    files.sort();
    Ok(files)
}
