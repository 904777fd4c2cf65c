//! Adding, importing and removing systems

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::document::SourceDocument;
use crate::error::{Error, Result};
use crate::formats::vfx::{EntryKey, Record, SystemRecord, Value};

/// Key a record was inserted under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertOutcome {
    pub original: EntryKey,
    pub assigned: EntryKey,
}

impl InsertOutcome {
    #[must_use]
    pub fn was_renamed(&self) -> bool {
        self.original != self.assigned
    }
}

/// Point references to `old` inside a record at `new`
///
/// String-typed values keep their string form; hash values take the new
/// key's own form.
pub(crate) fn retarget_references(body: &mut Record, old: &EntryKey, new: &EntryKey) -> usize {
    let mut count = 0;
    body.walk_mut(&mut |_, value| {
        let Some(current) = value.as_key() else { return };
        if !current.refers_to(old) {
            return;
        }
        *value = match (&*value, new) {
            (Value::String(_), EntryKey::Hash(hash)) => Value::string(&format!("0x{hash:08x}")),
            _ => Value::key(new),
        };
        count += 1;
    });
    count
}

impl SourceDocument {
    /// First free key for `desired`
    ///
    /// Names get `_1`, `_2`, ... appended; a colliding hash becomes the name
    /// `<hex>_1`, `<hex>_2`, ...
    #[must_use]
    pub fn unique_key(&self, desired: &EntryKey) -> EntryKey {
        self.unique_key_excluding(desired, &HashSet::new())
    }

    pub(crate) fn unique_key_excluding(&self, desired: &EntryKey, reserved: &HashSet<EntryKey>) -> EntryKey {
        let taken = |key: &EntryKey| self.contains_key(key) || reserved.iter().any(|r| r.refers_to(key));
        if !taken(desired) {
            return desired.clone();
        }

        let base = match desired {
            EntryKey::Name(name) => name.clone(),
            EntryKey::Hash(hash) => format!("{hash:08x}"),
        };
        let mut n = 1usize;
        loop {
            let candidate = EntryKey::Name(format!("{base}_{n}"));
            if !taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Insert one system, renaming it if its key is taken
    ///
    /// Returns the key it was stored under.
    pub fn insert_system(&mut self, record: &SystemRecord) -> Result<EntryKey> {
        let outcomes = self.insert_preserving_names(std::slice::from_ref(record))?;
        outcomes
            .into_iter()
            .next()
            .map(|o| o.assigned)
            .ok_or_else(|| Error::InvalidEdit { message: "nothing was inserted".to_string() })
    }

    /// Insert systems keeping their keys where free
    ///
    /// Colliding keys are renamed one by one and references to a record's
    /// own key inside it follow the rename. All records land in a single
    /// edit after the last VFX system; nothing is written if any fails.
    pub fn insert_preserving_names(&mut self, records: &[SystemRecord]) -> Result<Vec<InsertOutcome>> {
        let outcomes = self.transact(|doc| {
            let mut reserved = HashSet::new();
            let mut prepared = Vec::with_capacity(records.len());
            let mut outcomes = Vec::with_capacity(records.len());

            for record in records {
                let assigned = doc.unique_key_excluding(&record.key, &reserved);
                reserved.insert(assigned.clone());

                let mut copy = record.clone();
                if assigned != record.key {
                    let retargeted = retarget_references(&mut copy.body, &record.key, &assigned);
                    tracing::debug!(from = %record.key, to = %assigned, retargeted, "key taken, renamed on insert");
                }
                copy.set_key(assigned.clone());
                prepared.push(copy);
                outcomes.push(InsertOutcome { original: record.key.clone(), assigned });
            }

            doc.insert_records(&prepared)?;
            if let Some(missing) = outcomes.iter().find(|o| doc.index().get(&o.assigned).is_none()) {
                return Err(Error::InvalidEdit {
                    message: format!("{} was not indexed after insert", missing.assigned),
                });
            }
            Ok(outcomes)
        })?;

        tracing::info!(
            inserted = outcomes.len(),
            renamed = outcomes.iter().filter(|o| o.was_renamed()).count(),
            "inserted systems"
        );
        Ok(outcomes)
    }

    /// Copy systems from another document
    ///
    /// An empty `keys` slice imports every VFX system of `source`.
    pub fn import_systems(&mut self, source: &SourceDocument, keys: &[EntryKey]) -> Result<Vec<InsertOutcome>> {
        let selected: Vec<EntryKey> = if keys.is_empty() {
            source.systems().map(|e| e.key.clone()).collect()
        } else {
            keys.iter()
                .map(|k| source.require_system(k).map(|e| e.key.clone()))
                .collect::<Result<_>>()?
        };

        let mut records = Vec::with_capacity(selected.len());
        for key in &selected {
            let parsed = source.parse_entry(key)?;
            for diagnostic in &parsed.diagnostics {
                tracing::warn!(key = %key, line = diagnostic.line, reason = %diagnostic.reason, "importing unparsed field text");
            }
            records.push(parsed.record);
        }
        self.insert_preserving_names(&records)
    }

    /// Delete a VFX system and the resolver rows pointing at it
    ///
    /// Returns the number of resolver rows removed.
    pub fn remove_system(&mut self, key: &EntryKey) -> Result<usize> {
        let key = self.require_system(key)?.key.clone();
        let rows = self.transact(|doc| {
            doc.remove_entry_text(&key)?;
            doc.remove_resolver_mappings(&key)
        })?;
        tracing::info!(key = %key, resolver_rows = rows, "removed system");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::vfx::FieldType;

    fn fx(key: &str) -> SystemRecord {
        let body = Record::new("VfxSystemDefinitionData")
            .with_field("particleName", FieldType::String, Value::string("Fx"))
            .with_field("particlePath", FieldType::String, Value::string(key));
        SystemRecord::new(EntryKey::name(key), body)
    }

    #[test]
    fn test_unique_key_for_hash() {
        let doc = SourceDocument::new("\"A\" = VfxSystemDefinitionData {}\n0x0000abcd = VfxSystemDefinitionData {}\n");
        assert_eq!(doc.unique_key(&EntryKey::name("B")), EntryKey::name("B"));
        assert_eq!(doc.unique_key(&EntryKey::name("A")), EntryKey::name("A_1"));
        assert_eq!(doc.unique_key(&EntryKey::Hash(0xabcd)), EntryKey::name("0000abcd_1"));
    }

    #[test]
    fn test_renamed_insert_retargets_particle_path() {
        let mut doc = SourceDocument::new("entries: map[hash,embed] = {\n    \"Fx\" = VfxSystemDefinitionData {}\n}\n");
        let key = doc.insert_system(&fx("Fx")).unwrap();
        assert_eq!(key, EntryKey::name("Fx_1"));
        assert!(doc.text().contains("particlePath: string = \"Fx_1\""));
    }

    #[test]
    fn test_batch_insert_disambiguates_within_batch() {
        let mut doc = SourceDocument::new("entries: map[hash,embed] = {}\n");
        let outcomes = doc.insert_preserving_names(&[fx("Fx"), fx("Fx")]).unwrap();
        let keys: Vec<_> = outcomes.iter().map(|o| o.assigned.clone()).collect();
        assert_eq!(keys, vec![EntryKey::name("Fx"), EntryKey::name("Fx_1")]);
        assert_eq!(doc.systems().count(), 2);
    }

    #[test]
    fn test_remove_system_drops_resolver_row() {
        let text = "entries: map[hash,embed] = {\n    \"Fx\" = VfxSystemDefinitionData {}\n    \"Res\" = ResourceResolver {\n        resourceMap: map[hash,link] = {\n            \"Fx\" = \"Fx\"\n        }\n    }\n}\n";
        let mut doc = SourceDocument::new(text);
        assert_eq!(doc.remove_system(&EntryKey::name("Fx")).unwrap(), 1);
        assert_eq!(doc.systems().count(), 0);
        assert!(doc.resolver_entries().unwrap().is_empty());
    }
}
