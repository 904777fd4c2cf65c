//! Path utilities

use std::path::Path;

/// Normalize path separators to forward slashes
pub fn normalize_path<P: AsRef<Path>>(path: P) -> String {
    path.as_ref().to_string_lossy().replace('\\', "/")
}

/// Lowercase and forward-slash a path reference for case-insensitive matching
pub fn normalize_asset_path(s: &str) -> String {
    s.to_lowercase().replace('\\', "/")
}

/// Get relative path and normalize separators
pub fn relative_path<P: AsRef<Path>>(path: P, base: P) -> Option<String> {
    path.as_ref()
        .strip_prefix(base.as_ref())
        .ok()
        .map(normalize_path)
}

/// Last `/`-separated segment of a path-like string
pub fn last_segment(s: &str) -> &str {
    s.rsplit(['/', '\\']).next().unwrap_or(s)
}
