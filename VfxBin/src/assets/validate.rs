//! Pre-upload checks for referenced assets

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use crate::utils::normalize_asset_path;

use super::resolve::resolve_asset_path;
use super::types::{AssetLimits, AssetReference, UploadFailure, UploadFailureReason};

/// Check every distinct reference and return all failures
///
/// Each path is reported at most once, with the first problem found:
/// unsupported type, then missing, then empty, then too large.
#[must_use]
pub fn validate_for_upload(refs: &[AssetReference], roots: &[PathBuf], limits: &AssetLimits) -> Vec<UploadFailure> {
    let mut seen = HashSet::new();
    let mut failures = Vec::new();

    for reference in refs {
        if !seen.insert(normalize_asset_path(&reference.path)) {
            continue;
        }
        if let Some(reason) = check(reference, roots, limits) {
            tracing::debug!(path = %reference.path, %reason, "asset failed validation");
            failures.push(UploadFailure { path: reference.path.clone(), reason });
        }
    }
    failures
}

fn check(reference: &AssetReference, roots: &[PathBuf], limits: &AssetLimits) -> Option<UploadFailureReason> {
    if reference.kind.is_none() {
        return Some(UploadFailureReason::UnsupportedType);
    }
    let Some(path) = resolve_asset_path(&reference.path, roots) else {
        return Some(UploadFailureReason::Missing);
    };
    let size = match fs::metadata(&path) {
        Ok(meta) => meta.len(),
        Err(_) => return Some(UploadFailureReason::Missing),
    };
    if size == 0 {
        return Some(UploadFailureReason::Empty);
    }
    if size > limits.max_bytes {
        return Some(UploadFailureReason::TooLarge { size, limit: limits.max_bytes });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetKind;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn reference(path: &str) -> AssetReference {
        AssetReference { field: "texture".into(), path: path.into(), kind: AssetKind::from_path(path) }
    }

    #[test]
    fn test_reports_every_failure() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("assets");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("ok.tex"), b"1234").unwrap();
        fs::write(dir.join("empty.tex"), b"").unwrap();
        fs::write(dir.join("big.tex"), vec![0u8; 64]).unwrap();

        let refs = vec![
            reference("assets/ok.tex"),
            reference("assets/missing.tex"),
            reference("assets/empty.tex"),
            reference("assets/big.tex"),
            reference("assets/readme.txt"),
            reference("ASSETS\\MISSING.tex"),
        ];
        let failures = validate_for_upload(&refs, &[temp.path().to_path_buf()], &AssetLimits { max_bytes: 32 });
        let reasons: Vec<(&str, &UploadFailureReason)> = failures.iter().map(|f| (f.path.as_str(), &f.reason)).collect();
        assert_eq!(
            reasons,
            vec![
                ("assets/missing.tex", &UploadFailureReason::Missing),
                ("assets/empty.tex", &UploadFailureReason::Empty),
                ("assets/big.tex", &UploadFailureReason::TooLarge { size: 64, limit: 32 }),
                ("assets/readme.txt", &UploadFailureReason::UnsupportedType),
            ]
        );
    }
}
