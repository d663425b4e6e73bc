//! Default values for testlens configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// Runner Defaults
// ============================================================================

/// Default test runner program.
pub const DEFAULT_RUNNER_PROGRAM: &str = "cargo";

/// Default arguments passed to the runner program.
pub const DEFAULT_RUNNER_ARGS: &[&str] = &["test"];

/// Program used by the Clarinet preset.
pub const CLARINET_PROGRAM: &str = "clarinet";

/// Arguments used by the Clarinet preset.
pub const CLARINET_ARGS: &[&str] = &["test"];

/// Size of a single read from the runner's stdout/stderr pipes.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 8 * 1024;

// ============================================================================
// Discovery Defaults
// ============================================================================

/// File extensions scanned for test declarations.
pub const DEFAULT_EXTENSIONS: &[&str] = &["rs"];

/// Directories never descended into during discovery.
pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &[
    // Version control
    ".git",
    ".hg",
    // Build outputs
    "target",
    "build",
    "dist",
    // Dependencies
    "node_modules",
    "vendor",
    // Clarinet caches
    ".cache",
    ".requirements",
];

// ============================================================================
// Config File Locations
// ============================================================================

/// Project-local config file name.
pub const PROJECT_CONFIG_FILE: &str = "testlens.toml";

/// Directory under the user config dir.
pub const USER_CONFIG_DIR: &str = "testlens";

/// File name under the user config dir.
pub const USER_CONFIG_FILE: &str = "config.toml";
