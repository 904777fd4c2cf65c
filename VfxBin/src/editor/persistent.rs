//! Persistent effects: effects bound to a gameplay condition
//!
//! An owner record (normally the skin data entry) lists them under
//! `persistentEffectConditions`:
//!
//! ```text
//! persistentEffectConditions: list2[pointer] = {
//!     PersistentEffectConditionData {
//!         ownerCondition: pointer = IsAnimationPlayingDynamicMaterialBoolDriver {
//!             mAnimationName: hash = "Idle1"
//!         }
//!         persistentVfxs: list2[embed] = {
//!             PersistentVfxData {
//!                 effectKey: hash = "Characters/Ahri/Skins/Skin0/Particles/Orb"
//!             }
//!         }
//!     }
//! }
//! ```
//!
//! Record conditions compare by their tokens, so layout and comments do not
//! matter. Any other condition is stored as a string and compares by its
//! text with runs of whitespace collapsed; `#` is plain text there.

use serde::{Deserialize, Serialize};

use crate::document::SourceDocument;
use crate::error::{Error, Result};
use crate::formats::vfx::lexer::tokenize;
use crate::formats::vfx::reader::parse_value_text;
use crate::formats::vfx::{EntryKey, FieldType, ListValue, Record, Value, write_value};

const CONDITIONS_FIELD: &str = "persistentEffectConditions";
const CONDITION_TYPE: &str = "PersistentEffectConditionData";
const OWNER_CONDITION_FIELD: &str = "ownerCondition";
const VFXS_FIELD: &str = "persistentVfxs";
const VFX_TYPE: &str = "PersistentVfxData";

/// A condition and the effect it plays
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistentEffectEntry {
    /// String content, or the record expression on one line
    pub condition: String,
    /// Effect of the first `PersistentVfxData`, if any
    pub effect_key: Option<EntryKey>,
}

/// Result of [`SourceDocument::insert_or_update_persistent_effect`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Unchanged,
}

/// Comparable form of a condition
#[derive(Debug, PartialEq, Eq)]
enum ConditionKey {
    Record(String),
    Text(String),
}

impl ConditionKey {
    fn of(value: &Value) -> Self {
        match value {
            Value::Record(_) => {
                let text = write_value(value, "");
                Self::Record(
                    tokenize(&text, 0, text.len())
                        .iter()
                        .map(|t| t.text(&text))
                        .collect::<Vec<_>>()
                        .join(" "),
                )
            }
            _ => Self::Text(collapse_whitespace(&condition_text(value))),
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn condition_text(value: &Value) -> String {
    match value.as_str() {
        Some(text) => text,
        None => collapse_whitespace(&write_value(value, "")),
    }
}

/// A condition is a record expression only when it parses as one and ends
/// at its closing brace
fn condition_field(condition: &str) -> (FieldType, Value) {
    let condition = condition.trim();
    let pointer = FieldType::Record("pointer".into());
    if condition.ends_with('}') {
        if let Some(value @ Value::Record(_)) = parse_value_text(condition, &pointer) {
            return (pointer, value);
        }
    }
    (FieldType::String, Value::string(condition))
}

fn vfx_record(effect_key: &EntryKey) -> Value {
    Value::Record(Record::new(VFX_TYPE).with_field("effectKey", FieldType::Hash("hash".into()), Value::key(effect_key)))
}

fn entry_of(record: &Record) -> Option<PersistentEffectEntry> {
    let condition = condition_text(record.value(OWNER_CONDITION_FIELD)?);
    let effect_key = record
        .value(VFXS_FIELD)
        .and_then(Value::as_list)
        .and_then(|list| list.items.iter().find_map(|item| item.value.as_record()))
        .and_then(|vfx| vfx.value("effectKey"))
        .and_then(Value::as_key);
    Some(PersistentEffectEntry { condition, effect_key })
}

/// Point the condition's first effect at `effect_key`; returns the effect it replaced
fn update_effect(record: &mut Record, effect_key: &EntryKey) -> (UpsertOutcome, Option<EntryKey>) {
    let vfxs = FieldType::List("list2".into(), Box::new(FieldType::Record("embed".into())));
    if record.value(VFXS_FIELD).and_then(Value::as_list).is_none() {
        record.set_field(VFXS_FIELD, vfxs, Value::List(ListValue::default()));
    }
    let Some(list) = record.value_mut(VFXS_FIELD).and_then(Value::as_list_mut) else {
        return (UpsertOutcome::Unchanged, None);
    };

    match list.items.iter_mut().find_map(|item| item.value.as_record_mut()) {
        Some(vfx) => {
            let current = vfx.value("effectKey").and_then(Value::as_key);
            if current.as_ref().is_some_and(|k| k.refers_to(effect_key)) {
                return (UpsertOutcome::Unchanged, None);
            }
            vfx.set_field("effectKey", FieldType::Hash("hash".into()), Value::key(effect_key));
            (UpsertOutcome::Updated, current)
        }
        None => {
            list.push(vfx_record(effect_key));
            (UpsertOutcome::Updated, None)
        }
    }
}

fn upsert(body: &mut Record, condition: &str, effect_key: &EntryKey) -> (UpsertOutcome, Option<EntryKey>) {
    let (condition_type, condition_value) = condition_field(condition);
    let wanted = ConditionKey::of(&condition_value);
    if body.value(CONDITIONS_FIELD).and_then(Value::as_list).is_none() {
        body.set_field(
            CONDITIONS_FIELD,
            FieldType::List("list2".into(), Box::new(FieldType::Record("pointer".into()))),
            Value::List(ListValue::default()),
        );
    }
    let Some(list) = body.value_mut(CONDITIONS_FIELD).and_then(Value::as_list_mut) else {
        return (UpsertOutcome::Unchanged, None);
    };

    let existing = list.items.iter_mut().filter_map(|item| item.value.as_record_mut()).find(|record| {
        record
            .value(OWNER_CONDITION_FIELD)
            .is_some_and(|v| ConditionKey::of(v) == wanted)
    });
    if let Some(record) = existing {
        return update_effect(record, effect_key);
    }

    let mut vfxs = ListValue::default();
    vfxs.push(vfx_record(effect_key));
    list.push(Value::Record(
        Record::new(CONDITION_TYPE)
            .with_field(OWNER_CONDITION_FIELD, condition_type, condition_value)
            .with_field(
                VFXS_FIELD,
                FieldType::List("list2".into(), Box::new(FieldType::Record("embed".into()))),
                Value::List(vfxs),
            ),
    ));
    (UpsertOutcome::Inserted, None)
}

impl SourceDocument {
    /// Condition → effect pairs of an owner record, in document order
    pub fn extract_existing_conditions(&self, owner: &EntryKey) -> Result<Vec<PersistentEffectEntry>> {
        let parsed = self.parse_entry(owner)?;
        Ok(parsed
            .record
            .body
            .value(CONDITIONS_FIELD)
            .and_then(Value::as_list)
            .map(|list| {
                list.items
                    .iter()
                    .filter_map(|item| item.value.as_record())
                    .filter_map(entry_of)
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Bind `effect_key` to `condition` on `owner`, replacing the effect of
    /// an existing entry with the same condition
    ///
    /// A resolver row for `effect_key` is ensured as part of the same edit.
    /// Rows of a replaced effect go once nothing outside the resolver names it.
    pub fn insert_or_update_persistent_effect(&mut self, owner: &EntryKey, condition: &str, effect_key: &EntryKey) -> Result<UpsertOutcome> {
        let owner = self.require_entry(owner)?.key.clone();
        if condition.trim().is_empty() {
            return Err(Error::InvalidEdit { message: "persistent effect condition is empty".to_string() });
        }

        let mut record = self.parse_entry(&owner)?.record;
        let (outcome, replaced) = upsert(&mut record.body, condition, effect_key);
        self.transact(|doc| {
            if outcome != UpsertOutcome::Unchanged {
                doc.write_back(&mut record)?;
            }
            doc.ensure_resolver_mapping(effect_key)?;
            if let Some(old) = &replaced {
                doc.remove_stale_resolver_mappings(old)?;
            }
            Ok(())
        })?;

        tracing::info!(owner = %owner, condition, effect = %effect_key, ?outcome, "upserted persistent effect");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DOC: &str = r#"entries: map[hash,embed] = {
    "Skins/Skin0" = SkinCharacterDataProperties {
        persistentEffectConditions: list2[pointer] = {
            PersistentEffectConditionData {
                ownerCondition: pointer = IsAnimationPlayingDynamicMaterialBoolDriver {
                    mAnimationName: hash = "Idle1"
                }
                persistentVfxs: list2[embed] = {
                    PersistentVfxData {
                        effectKey: hash = "Particles/Orb"
                    }
                }
            }
        }
    }
    "Particles/Orb" = VfxSystemDefinitionData {}
}
"#;

    #[test]
    fn test_extract_existing_conditions() {
        let doc = SourceDocument::new(DOC);
        let entries = doc.extract_existing_conditions(&EntryKey::name("Skins/Skin0")).unwrap();
        assert_eq!(
            entries,
            vec![PersistentEffectEntry {
                condition: "IsAnimationPlayingDynamicMaterialBoolDriver { mAnimationName: hash = \"Idle1\" }".to_string(),
                effect_key: Some(EntryKey::name("Particles/Orb")),
            }]
        );
    }

    #[test]
    fn test_upsert_by_condition_keeps_one_entry() {
        let mut doc = SourceDocument::new(DOC);
        let skin = EntryKey::name("Skins/Skin0");
        let low = EntryKey::name("fx_low");
        let critical = EntryKey::name("fx_critical");

        assert_eq!(doc.insert_or_update_persistent_effect(&skin, "HP<50%", &low).unwrap(), UpsertOutcome::Inserted);
        assert_eq!(doc.insert_or_update_persistent_effect(&skin, "HP<50%", &critical).unwrap(), UpsertOutcome::Updated);
        assert_eq!(doc.insert_or_update_persistent_effect(&skin, " HP<50% ", &critical).unwrap(), UpsertOutcome::Unchanged);

        let entries = doc.extract_existing_conditions(&skin).unwrap();
        let hp: Vec<_> = entries.iter().filter(|e| e.condition == "HP<50%").collect();
        assert_eq!(hp.len(), 1);
        assert_eq!(hp[0].effect_key, Some(critical.clone()));
        assert!(doc.text().contains("ownerCondition: string = \"HP<50%\""));

        let rows = doc.resolver_entries().unwrap();
        assert!(rows.iter().any(|r| r.covers(&critical)));
    }

    #[test]
    fn test_record_condition_matches_across_layout() {
        let mut doc = SourceDocument::new(DOC);
        let skin = EntryKey::name("Skins/Skin0");
        let outcome = doc
            .insert_or_update_persistent_effect(
                &skin,
                "IsAnimationPlayingDynamicMaterialBoolDriver { mAnimationName: hash = \"Idle1\" }",
                &EntryKey::name("Particles/Orb"),
            )
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Unchanged);
        assert_eq!(doc.extract_existing_conditions(&skin).unwrap().len(), 1);
    }

    #[test]
    fn test_hash_sign_is_part_of_string_condition() {
        let mut doc = SourceDocument::new(DOC);
        let skin = EntryKey::name("Skins/Skin0");
        let first = EntryKey::name("Fx/A");
        let second = EntryKey::name("Fx/B");

        assert_eq!(doc.insert_or_update_persistent_effect(&skin, "Stack#1", &first).unwrap(), UpsertOutcome::Inserted);
        assert_eq!(doc.insert_or_update_persistent_effect(&skin, "Stack#2", &second).unwrap(), UpsertOutcome::Inserted);
        assert_eq!(doc.insert_or_update_persistent_effect(&skin, "#x", &second).unwrap(), UpsertOutcome::Inserted);

        let entries = doc.extract_existing_conditions(&skin).unwrap();
        let stacks: Vec<_> = entries.iter().filter(|e| e.condition.starts_with("Stack#")).collect();
        assert_eq!(
            stacks,
            vec![
                &PersistentEffectEntry { condition: "Stack#1".to_string(), effect_key: Some(first) },
                &PersistentEffectEntry { condition: "Stack#2".to_string(), effect_key: Some(second) },
            ]
        );
        assert!(entries.iter().any(|e| e.condition == "#x"));
    }

    #[test]
    fn test_replaced_effect_loses_its_resolver_row() {
        let mut doc = SourceDocument::new(DOC);
        let skin = EntryKey::name("Skins/Skin0");
        let low = EntryKey::name("fx_low");
        let critical = EntryKey::name("fx_critical");

        doc.insert_or_update_persistent_effect(&skin, "HP<50%", &low).unwrap();
        doc.insert_or_update_persistent_effect(&skin, "HP<50%", &critical).unwrap();

        let rows = doc.resolver_entries().unwrap();
        assert!(!rows.iter().any(|r| r.covers(&low)));
        assert!(rows.iter().any(|r| r.covers(&critical)));
    }

    #[test]
    fn test_replaced_effect_still_in_use_keeps_its_row() {
        let mut doc = SourceDocument::new(DOC);
        let skin = EntryKey::name("Skins/Skin0");
        let low = EntryKey::name("fx_low");

        doc.insert_or_update_persistent_effect(&skin, "HP<50%", &low).unwrap();
        doc.insert_or_update_persistent_effect(&skin, "HP<25%", &low).unwrap();
        doc.insert_or_update_persistent_effect(&skin, "HP<50%", &EntryKey::name("fx_critical")).unwrap();

        assert!(doc.resolver_entries().unwrap().iter().any(|r| r.covers(&low)));
    }
}
