//! Deterministic relocated asset paths

use crate::utils::{last_segment, normalize_asset_path};

/// Relocated path for an asset: `ASSETS/<namespace...>/<stem>_<digest>.<ext>`
///
/// `namespace` is typically creator and project. The digest is the first 16
/// hex digits of the MD5 of the raw namespace identifiers and the normalized
/// original path, so the same inputs always give the same path and
/// differently-cased or differently-separated spellings of one original
/// collapse together. Only the directory segments are sanitized; identifiers
/// that sanitize alike still get different digests.
#[must_use]
pub fn generate_canonical_path(namespace: &[&str], original: &str) -> String {
    let normalized = normalize_asset_path(original);
    let digest = md5::compute(digest_input(namespace, &normalized));
    let hex = format!("{digest:x}");

    let namespace: Vec<String> = namespace
        .iter()
        .map(|part| sanitize(part))
        .filter(|part| !part.is_empty())
        .collect();

    let file = last_segment(&normalized);
    let (stem, ext) = match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (file, None),
    };

    let mut out = String::from("ASSETS/");
    for part in &namespace {
        out.push_str(part);
        out.push('/');
    }
    out.push_str(stem);
    out.push('_');
    out.push_str(&hex[..16]);
    if let Some(ext) = ext {
        out.push('.');
        out.push_str(ext);
    }
    out
}

/// Each identifier as `<byte length>:<text>`, then the path after `|`
fn digest_input(namespace: &[&str], normalized: &str) -> String {
    let mut input = String::new();
    for part in namespace {
        input.push_str(&format!("{}:{part}", part.len()));
    }
    input.push('|');
    input.push_str(normalized);
    input
}

fn sanitize(part: &str) -> String {
    part.trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '-' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_canonical_path_is_deterministic() {
        let a = generate_canonical_path(&["Sir Dexal", "Renny"], "ASSETS/Characters/Renekton/Blade.DDS");
        let b = generate_canonical_path(&["Sir Dexal", "Renny"], "assets\\characters\\renekton\\blade.dds");
        assert_eq!(a, b);
        assert!(a.starts_with("ASSETS/Sir-Dexal/Renny/blade_"));
        assert!(a.ends_with(".dds"));
        assert_eq!(a.len(), "ASSETS/Sir-Dexal/Renny/blade_".len() + 16 + ".dds".len());
    }

    #[test]
    fn test_canonical_path_differs_per_namespace() {
        let a = generate_canonical_path(&["a"], "assets/x.tex");
        let b = generate_canonical_path(&["b"], "assets/x.tex");
        assert_ne!(a, b);
        assert_eq!(generate_canonical_path(&[], "assets/noext").len(), "ASSETS/noext_".len() + 16);
    }

    #[test]
    fn test_identifiers_that_sanitize_alike_stay_apart() {
        let spaced = generate_canonical_path(&["Sir Dexal", "proj"], "assets/tex.dds");
        let dashed = generate_canonical_path(&["Sir-Dexal", "proj"], "assets/tex.dds");
        assert!(spaced.starts_with("ASSETS/Sir-Dexal/proj/tex_"));
        assert!(dashed.starts_with("ASSETS/Sir-Dexal/proj/tex_"));
        assert_ne!(spaced, dashed);

        let split = generate_canonical_path(&["a/b", "c"], "assets/tex.dds");
        let joined = generate_canonical_path(&["a", "b/c"], "assets/tex.dds");
        assert_ne!(split, joined);
    }
}
