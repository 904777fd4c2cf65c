//! `ResourceResolver` rows: human names for effect keys

use std::ops::Range;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::document::{RESOLVER_TYPE, SKIN_DATA_TYPE, SourceDocument};
use crate::error::{Error, Result};
use crate::formats::vfx::lexer::{Lexer, TokenKind};
use crate::formats::vfx::{EntryKey, FieldType, MapValue, Record, SystemRecord, Value};

/// Map field of a `ResourceResolver` record
pub const RESOURCE_MAP_FIELD: &str = "resourceMap";

/// One `human = target` row of the resource map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceResolverEntry {
    pub human: EntryKey,
    pub target: EntryKey,
    /// Bin hash of the target
    pub hash: u32,
}

impl ResourceResolverEntry {
    #[must_use]
    pub fn new(human: EntryKey, target: EntryKey) -> Self {
        let hash = target.hash();
        Self { human, target, hash }
    }

    /// Whether this row maps `key`, as human name or as target
    #[must_use]
    pub fn covers(&self, key: &EntryKey) -> bool {
        self.target.refers_to(key) || self.human == *key
    }
}

fn resource_map_type() -> FieldType {
    FieldType::Map(Box::new(FieldType::Hash("hash".into())), Box::new(FieldType::Hash("link".into())))
}

fn rows_of(record: &Record) -> Vec<ResourceResolverEntry> {
    record
        .value(RESOURCE_MAP_FIELD)
        .and_then(Value::as_map)
        .map(|map| {
            map.entries
                .iter()
                .filter_map(|e| Some(ResourceResolverEntry::new(e.key.as_key()?, e.value.as_key()?)))
                .collect()
        })
        .unwrap_or_default()
}

impl SourceDocument {
    /// Rows of the first `ResourceResolver`; empty when there is none
    pub fn resolver_entries(&self) -> Result<Vec<ResourceResolverEntry>> {
        let Some(resolver) = self.resolver() else {
            return Ok(Vec::new());
        };
        let parsed = self.parse_entry(&resolver.key)?;
        Ok(rows_of(&parsed.record.body))
    }

    /// Make sure a resolver row maps `key`, adding one if needed
    ///
    /// Idempotent. A key naming an entry in this document maps from its
    /// display name (or the full key when that name is taken) to the key.
    /// Any other key maps from itself to its FNV-1a hash. A resolver record
    /// is created after the last entry when the document has none.
    pub fn ensure_resolver_mapping(&mut self, key: &EntryKey) -> Result<ResourceResolverEntry> {
        let rows = self.resolver_entries()?;
        if let Some(row) = rows.iter().find(|r| r.covers(key)) {
            return Ok(row.clone());
        }

        let row = match self.entry(key) {
            Some(entry) => {
                let short = EntryKey::Name(entry.display_name.clone());
                let human_taken = rows.iter().any(|r| r.human == short);
                let human = if matches!(key, EntryKey::Name(_)) && !human_taken && short != entry.key {
                    short
                } else {
                    entry.key.clone()
                };
                ResourceResolverEntry::new(human, entry.key.clone())
            }
            None => ResourceResolverEntry::new(key.clone(), EntryKey::Hash(key.hash())),
        };

        self.transact(|doc| {
            if let Some(resolver) = doc.resolver().map(|e| e.key.clone()) {
                doc.rewrite_entry(&resolver, |record| {
                    append_row(&mut record.body, &row);
                    Ok(())
                })?;
            } else {
                let resolver_key = doc
                    .skin_data()
                    .and_then(|e| e.key.as_name().map(|name| EntryKey::Name(format!("{name}/Resources"))))
                    .unwrap_or_else(|| EntryKey::name("Resources"));
                let mut body = Record::new(RESOLVER_TYPE);
                append_row(&mut body, &row);
                let key = doc.unique_key(&resolver_key);
                doc.insert_records(&[SystemRecord::new(key, body)])?;
            }
            Ok(())
        })?;

        tracing::debug!(human = %row.human, target = %row.target, "added resolver row");
        Ok(row)
    }

    /// Remove every row whose target refers to `key`; returns how many
    pub fn remove_resolver_mappings(&mut self, key: &EntryKey) -> Result<usize> {
        let Some(resolver) = self.resolver().map(|e| e.key.clone()) else {
            return Ok(0);
        };
        self.rewrite_entry(&resolver, |record| {
            let Some(map) = record.body.value_mut(RESOURCE_MAP_FIELD).and_then(Value::as_map_mut) else {
                return Ok(0);
            };
            let before = map.entries.len();
            map.entries
                .retain(|e| !e.value.as_key().is_some_and(|target| target.refers_to(key)));
            Ok(before - map.entries.len())
        })
    }

    /// Remove the rows of `key` unless a literal outside the resolver still
    /// names it, its target, or one of its human names
    pub(crate) fn remove_stale_resolver_mappings(&mut self, key: &EntryKey) -> Result<usize> {
        let rows = self.resolver_entries()?;
        let target = rows
            .iter()
            .find(|r| r.human == *key)
            .map_or_else(|| key.clone(), |r| r.target.clone());
        let mut names = vec![key.hash(), target.hash()];
        names.extend(rows.iter().filter(|r| r.target.refers_to(&target)).map(|r| r.human.hash()));

        let skip: Vec<Range<usize>> = [self.resolver(), self.entry(&target)]
            .into_iter()
            .flatten()
            .map(|e| e.byte_range.clone())
            .collect();
        let src = self.text();
        let referenced = Lexer::new(src)
            .filter(|t| matches!(t.kind, TokenKind::Str | TokenKind::Hex))
            .filter(|t| !skip.iter().any(|r| r.contains(&t.start)))
            .filter_map(|t| EntryKey::from_literal(t.text(src)))
            .any(|k| names.contains(&k.hash()));
        if referenced {
            return Ok(0);
        }
        self.remove_resolver_mappings(&target)
    }

    /// Find the system a human-readable name refers to
    ///
    /// Candidates come from resolver rows, system display names, particle
    /// names and full keys. No match is [`Error::UnresolvedReference`]; more
    /// than one distinct system is [`Error::AmbiguousReference`].
    pub fn resolve_effect_key(&self, human: &str) -> Result<EntryKey> {
        let wanted = human.parse::<EntryKey>().ok();
        let matches_human = |candidate: &EntryKey| match (&wanted, candidate) {
            (Some(w), c) => w.refers_to(c),
            (None, _) => false,
        };

        let mut candidates: IndexSet<EntryKey> = IndexSet::new();
        for row in self.resolver_entries()? {
            if matches_human(&row.human) {
                let target = self.entry(&row.target).map_or(row.target.clone(), |e| e.key.clone());
                candidates.insert(target);
            }
        }
        for system in self.systems() {
            let by_name = system.display_name == human || system.particle_name.as_deref() == Some(human);
            if by_name || matches_human(&system.key) {
                candidates.insert(system.key.clone());
            }
        }

        if candidates.len() > 1 {
            return Err(Error::AmbiguousReference {
                name: human.to_string(),
                candidates: candidates.iter().map(EntryKey::literal).collect(),
            });
        }
        candidates
            .into_iter()
            .next()
            .ok_or_else(|| Error::UnresolvedReference { name: human.to_string() })
    }

    /// Whether a reference (effect key, child identifier) points at `system`
    pub(crate) fn reference_targets(&self, reference: &EntryKey, system: &EntryKey, rows: &[ResourceResolverEntry]) -> bool {
        reference.refers_to(system)
            || rows
                .iter()
                .any(|r| r.human.refers_to(reference) && r.target.refers_to(system))
    }

    /// Whether a reference resolves to some entry of this document
    pub(crate) fn reference_exists(&self, reference: &EntryKey, rows: &[ResourceResolverEntry]) -> bool {
        self.contains_key(reference)
            || rows
                .iter()
                .any(|r| r.human.refers_to(reference) && self.contains_key(&r.target))
    }

    /// Key of the skin data entry, or [`Error::MissingSkinData`]
    pub(crate) fn require_skin_data(&self) -> Result<EntryKey> {
        self.first_of_type(SKIN_DATA_TYPE)
            .map(|e| e.key.clone())
            .ok_or(Error::MissingSkinData)
    }
}

fn append_row(body: &mut Record, row: &ResourceResolverEntry) {
    if body.value(RESOURCE_MAP_FIELD).and_then(Value::as_map).is_none() {
        body.set_field(RESOURCE_MAP_FIELD, resource_map_type(), Value::Map(MapValue::default()));
    }
    if let Some(map) = body.value_mut(RESOURCE_MAP_FIELD).and_then(Value::as_map_mut) {
        map.push(Value::key(&row.human), Value::key(&row.target));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DOC: &str = r#"#PROP_text
entries: map[hash,embed] = {
    "Characters/Ahri/Skins/Skin0/Particles/Orb" = VfxSystemDefinitionData {
        particleName: string = "Ahri_Orb"
    }
    "Characters/Ahri/Skins/Skin0/Resources" = ResourceResolver {
        resourceMap: map[hash,link] = {
            "Orb" = "Characters/Ahri/Skins/Skin0/Particles/Orb"
        }
    }
}
"#;

    #[test]
    fn test_resolver_entries() {
        let doc = SourceDocument::new(DOC);
        let rows = doc.resolver_entries().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].human, EntryKey::name("Orb"));
        assert_eq!(rows[0].hash, EntryKey::name("Characters/Ahri/Skins/Skin0/Particles/Orb").hash());
    }

    #[test]
    fn test_ensure_for_unknown_key_uses_hash_target() {
        let mut doc = SourceDocument::new(DOC);
        let row = doc.ensure_resolver_mapping(&EntryKey::name("Elsewhere/Fx")).unwrap();
        assert_eq!(row.target, EntryKey::Hash(EntryKey::name("Elsewhere/Fx").hash()));
        assert!(doc.text().contains(&format!("\"Elsewhere/Fx\" = 0x{:08x}", row.hash)));
        assert_eq!(doc.resolver_entries().unwrap().len(), 2);
    }

    #[test]
    fn test_resolver_created_when_missing() {
        let text = "entries: map[hash,embed] = {\n    \"Fx\" = VfxSystemDefinitionData {}\n}\n";
        let mut doc = SourceDocument::new(text);
        doc.ensure_resolver_mapping(&EntryKey::name("Fx")).unwrap();
        assert_eq!(
            doc.text(),
            "entries: map[hash,embed] = {\n    \"Fx\" = VfxSystemDefinitionData {}\n    \"Resources\" = ResourceResolver {\n        resourceMap: map[hash,link] = {\n            \"Fx\" = \"Fx\"\n        }\n    }\n}\n"
        );
    }

    #[test]
    fn test_resolve_effect_key() {
        let doc = SourceDocument::new(DOC);
        let orb = EntryKey::name("Characters/Ahri/Skins/Skin0/Particles/Orb");
        assert_eq!(doc.resolve_effect_key("Orb").unwrap(), orb);
        assert_eq!(doc.resolve_effect_key("Ahri_Orb").unwrap(), orb);
        assert!(matches!(doc.resolve_effect_key("Nope"), Err(Error::UnresolvedReference { .. })));
    }

    #[test]
    fn test_resolve_ambiguous() {
        let text = "entries: map[hash,embed] = {\n    \"A/Fx\" = VfxSystemDefinitionData {}\n    \"B/Fx\" = VfxSystemDefinitionData {}\n}\n";
        let doc = SourceDocument::new(text);
        match doc.resolve_effect_key("Fx") {
            Err(Error::AmbiguousReference { candidates, .. }) => {
                assert_eq!(candidates, vec!["\"A/Fx\"", "\"B/Fx\""]);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }
}
