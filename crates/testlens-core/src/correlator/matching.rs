//! Best-effort name correlation between discovered and reported tests.
//!
//! Statically discovered names and the names a runner prints do not always
//! agree (integration test binaries drop the file's module, doc tests carry
//! paths, etc.), so lookups fall back through three tiers.

use serde::Serialize;

/// Which tier produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    /// Fully qualified names are equal.
    Exact,
    /// Last `::` segments are equal.
    ShortName,
    /// One name contains the other.
    Substring,
}

/// Last `::` segment of a qualified name.
pub fn short_name(name: &str) -> &str {
    name.rsplit("::").next().unwrap_or(name)
}

/// Resolve `qualified` against `keys`, trying exact, then short-name, then
/// substring containment in either direction. Keys are visited in sorted
/// order; the first match wins.
pub fn resolve_key<'a, I>(qualified: &str, keys: I) -> Option<(&'a str, MatchTier)>
where
    I: IntoIterator<Item = &'a str>,
{
    if qualified.is_empty() {
        return None;
    }

    let mut keys: Vec<&'a str> = keys.into_iter().filter(|k| !k.is_empty()).collect();
    keys.sort_unstable();
    keys.dedup();

    if let Some(key) = keys.iter().copied().find(|k| *k == qualified) {
        return Some((key, MatchTier::Exact));
    }

    let short = short_name(qualified);
    if let Some(key) = keys.iter().copied().find(|k| short_name(k) == short) {
        return Some((key, MatchTier::ShortName));
    }

    keys.iter()
        .copied()
        .find(|k| k.contains(qualified) || qualified.contains(*k))
        .map(|key| (key, MatchTier::Substring))
}
