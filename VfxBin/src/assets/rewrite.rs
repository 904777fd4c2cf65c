//! Rewriting asset paths inside records

use std::collections::HashMap;

use crate::document::SourceDocument;
use crate::error::Result;
use crate::formats::vfx::{EntryKey, Record, Value};
use crate::utils::normalize_asset_path;

/// Replace string values found in `mapping` (old path → new path)
///
/// Matching ignores case and separator style. Returns how many values
/// changed.
pub fn update_asset_paths(record: &mut Record, mapping: &HashMap<String, String>) -> usize {
    let normalized: HashMap<String, &String> = mapping
        .iter()
        .map(|(from, to)| (normalize_asset_path(from), to))
        .collect();

    let mut changed = 0;
    record.walk_mut(&mut |_, value| {
        let Some(text) = value.as_str() else { return };
        let Some(replacement) = normalized.get(&normalize_asset_path(&text)) else {
            return;
        };
        if text != **replacement {
            *value = Value::string(replacement);
            changed += 1;
        }
    });
    changed
}

impl SourceDocument {
    /// [`update_asset_paths`] on one entry, written back in place
    pub fn update_asset_paths_in_system(&mut self, key: &EntryKey, mapping: &HashMap<String, String>) -> Result<usize> {
        let key = self.require_entry(key)?.key.clone();
        let changed = self.transact(|doc| doc.rewrite_entry(&key, |record| Ok(update_asset_paths(&mut record.body, mapping))))?;
        if changed > 0 {
            tracing::info!(key = %key, changed, "rewrote asset paths");
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_update_asset_paths_in_system() {
        let text = "\"Fx\" = VfxSystemDefinitionData {\n    texture: string = \"ASSETS/Ahri/Orb.tex\"\n    other: string = \"assets/keep.tex\"\n}\n";
        let mut doc = SourceDocument::new(text);
        let mapping = HashMap::from([("assets\\ahri\\orb.TEX".to_string(), "ASSETS/Me/Orb_0123.tex".to_string())]);

        assert_eq!(doc.update_asset_paths_in_system(&EntryKey::name("Fx"), &mapping).unwrap(), 1);
        assert_eq!(
            doc.text(),
            "\"Fx\" = VfxSystemDefinitionData {\n    texture: string = \"ASSETS/Me/Orb_0123.tex\"\n    other: string = \"assets/keep.tex\"\n}\n"
        );
        assert_eq!(doc.update_asset_paths_in_system(&EntryKey::name("Fx"), &mapping).unwrap(), 0);
    }
}
