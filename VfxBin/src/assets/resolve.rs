//! Locating asset files on disk

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::utils::relative_path;

use super::types::{AssetKind, FoundAsset};

/// Whether `path` is an existing file
#[must_use]
pub fn check_asset_exists(path: &Path) -> bool {
    path.is_file()
}

/// Find the file an asset reference points at under one of `roots`
///
/// Roots are tried in order. Each path component is matched exactly first
/// and case-insensitively second, since references are written with
/// arbitrary casing and either separator.
#[must_use]
pub fn resolve_asset_path(reference: &str, roots: &[PathBuf]) -> Option<PathBuf> {
    let parts: Vec<&str> = reference
        .split(['/', '\\'])
        .filter(|p| !p.is_empty() && *p != ".")
        .collect();
    if parts.is_empty() || parts.contains(&"..") {
        return None;
    }

    roots.iter().find_map(|root| {
        let mut current = root.clone();
        for part in &parts {
            current = find_component(&current, part)?;
        }
        check_asset_exists(&current).then_some(current)
    })
}

fn find_component(dir: &Path, name: &str) -> Option<PathBuf> {
    let exact = dir.join(name);
    if exact.exists() {
        return Some(exact);
    }
    fs::read_dir(dir)
        .ok()?
        .flatten()
        .find(|entry| entry.file_name().to_string_lossy().eq_ignore_ascii_case(name))
        .map(|entry| entry.path())
}

/// Copy an asset into `cache_dir`, keeping its file name
///
/// A file of the same size already in the cache is reused.
pub fn copy_asset(src: &Path, cache_dir: &Path) -> Result<PathBuf> {
    if !check_asset_exists(src) {
        return Err(Error::AssetNotFound { path: src.display().to_string() });
    }
    let file_name = src.file_name().ok_or_else(|| Error::InvalidPath(src.to_path_buf()))?;
    fs::create_dir_all(cache_dir)?;

    let dest = cache_dir.join(file_name);
    let src_len = fs::metadata(src)?.len();
    if fs::metadata(&dest).is_ok_and(|m| m.is_file() && m.len() == src_len) {
        tracing::debug!(path = %dest.display(), "asset already cached");
        return Ok(dest);
    }

    fs::copy(src, &dest)?;
    tracing::debug!(from = %src.display(), to = %dest.display(), "cached asset");
    Ok(dest)
}

/// Every file of a known asset kind below `root`, sorted by relative path
pub fn find_assets_in_root(root: &Path) -> Result<Vec<FoundAsset>> {
    if !root.is_dir() {
        return Err(Error::InvalidPath(root.to_path_buf()));
    }

    let mut found = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(relative) = relative_path(path, root) else {
            continue;
        };
        let Some(kind) = AssetKind::from_path(&relative) else {
            continue;
        };
        found.push(FoundAsset { path: path.to_path_buf(), relative, kind });
    }
    found.sort_by(|a, b| a.relative.cmp(&b.relative));

    tracing::debug!(root = %root.display(), count = found.len(), "found assets");
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("assets").join("Characters").join("Ahri");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("Orb.tex"), b"TEX").unwrap();
        fs::write(dir.join("notes.txt"), b"hi").unwrap();
        temp
    }

    #[test]
    fn test_resolve_is_case_and_separator_insensitive() {
        let temp = fixture();
        let roots = vec![temp.path().join("missing"), temp.path().to_path_buf()];
        let found = resolve_asset_path("ASSETS\\characters\\ahri\\orb.TEX", &roots).unwrap();
        assert!(found.ends_with("assets/Characters/Ahri/Orb.tex"));
        assert!(resolve_asset_path("assets/characters/ahri/gone.tex", &roots).is_none());
        assert!(resolve_asset_path("../etc/passwd", &roots).is_none());
    }

    #[test]
    fn test_copy_asset_into_cache() {
        let temp = fixture();
        let src = temp.path().join("assets/Characters/Ahri/Orb.tex");
        let cache = temp.path().join("cache");
        let copied = copy_asset(&src, &cache).unwrap();
        assert_eq!(fs::read(&copied).unwrap(), b"TEX");
        assert_eq!(copy_asset(&src, &cache).unwrap(), copied);
        assert!(matches!(copy_asset(&cache.join("nope.tex"), &cache), Err(Error::AssetNotFound { .. })));
    }

    #[test]
    fn test_find_assets_in_root() {
        let temp = fixture();
        let found = find_assets_in_root(temp.path()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].relative, "assets/Characters/Ahri/Orb.tex");
        assert_eq!(found[0].kind, AssetKind::Texture);
    }
}
