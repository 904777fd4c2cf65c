//! Finding asset paths in records

use crate::document::SourceDocument;
use crate::error::Result;
use crate::formats::vfx::{EntryKey, Record};

use super::types::{AssetKind, AssetReference};

const ASSET_ROOTS: [&str; 2] = ["assets/", "data/"];

/// Whether a string value looks like a path to an asset file
///
/// Paths under `assets/` or `data/` always count, even with an unknown
/// extension; other strings count when their extension is a known kind.
#[must_use]
pub fn is_asset_path(value: &str) -> bool {
    if value.is_empty() || value.contains(['\n', '"']) {
        return false;
    }
    let normalized = value.replace('\\', "/");
    let rooted = ASSET_ROOTS
        .iter()
        .any(|root| normalized.len() > root.len() && normalized.get(..root.len()).is_some_and(|p| p.eq_ignore_ascii_case(root)));
    rooted || (normalized.contains('/') && AssetKind::from_path(&normalized).is_some())
}

/// Every asset path among the string values of `record`, in field order
#[must_use]
pub fn detect_assets(record: &Record) -> Vec<AssetReference> {
    let mut found = Vec::new();
    record.walk(&mut |field, value| {
        let Some(text) = value.as_str() else { return };
        if is_asset_path(&text) {
            found.push(AssetReference {
                field: field.to_string(),
                kind: AssetKind::from_path(&text),
                path: text,
            });
        }
    });
    found
}

impl SourceDocument {
    /// Asset paths referenced by one entry
    pub fn detect_assets_in_system(&self, key: &EntryKey) -> Result<Vec<AssetReference>> {
        let parsed = self.parse_entry(key)?;
        Ok(detect_assets(&parsed.record.body))
    }
}
