//! Splitting systems so every emitter lives in a wrapper system of its own
//!
//! Each emitter of `complexEmitterDefinitionData` moves, text unchanged, into
//! a new system keyed `REC_<short name>_<emitter name>`. In its place the host
//! gets a trigger emitter `Trigger_<n>_<emitter name>` that spawns the
//! wrapper, so the effect still plays as before while every emitter can be
//! toggled on its own (replay tools list systems, not emitters).

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::document::SourceDocument;
use crate::error::Result;
use crate::formats::vfx::{EMITTER_LIST_FIELDS, EntryKey, FieldType, ListValue, Record, SystemRecord, VFX_SYSTEM_TYPE, Value};
use crate::utils::last_segment;

use super::child_particles::{emitter_list_mut, trigger_emitter};

/// Prefix of wrapper system keys
pub const WRAPPER_PREFIX: &str = "REC_";

const SHORT_NAME_LEN: usize = 25;

/// `Ahri_Base_` / `Ahri_Skin12_` in front of particle names
static SKIN_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]+_(Base_|Skin\d+_)").expect("skin prefix pattern is valid"));

/// One moved emitter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitEmitter {
    /// System the emitter came from
    pub system: EntryKey,
    /// `emitterName`, or `Emitter_<n>` when it has none
    pub emitter: String,
    /// Key of the new wrapper system
    pub wrapper: EntryKey,
    /// Name of the trigger emitter left in the host
    pub trigger: String,
}

/// Particle name without path or champion/skin prefix, at most 25 characters
///
/// Falls back to `particlePath`, then to the key's hash digits.
fn short_name(record: &SystemRecord) -> String {
    let name = record
        .particle_name()
        .filter(|n| !n.is_empty())
        .or_else(|| record.body.value("particlePath").and_then(Value::as_str).filter(|n| !n.is_empty()));
    let Some(name) = name else {
        return format!("{:08x}", record.key.hash());
    };
    SKIN_PREFIX_RE
        .replace(last_segment(&name), "")
        .chars()
        .take(SHORT_NAME_LEN)
        .collect()
}

fn wrapper_system(key: &EntryKey, emitter: Value) -> SystemRecord {
    let name = key.as_name().map_or_else(|| key.display_name(), str::to_string);
    let mut emitters = ListValue::default();
    emitters.push(emitter);
    let body = Record::new(VFX_SYSTEM_TYPE)
        .with_field(
            EMITTER_LIST_FIELDS[0],
            FieldType::List("list".into(), Box::new(FieldType::Record("pointer".into()))),
            Value::List(emitters),
        )
        .with_field("particleName", FieldType::String, Value::string(&name))
        .with_field("particlePath", FieldType::String, Value::string(&name));
    SystemRecord::new(key.clone(), body)
}

impl SourceDocument {
    /// Split every VFX system; see the module docs
    pub fn split_emitters(&mut self) -> Result<Vec<SplitEmitter>> {
        let keys: Vec<EntryKey> = self.systems().map(|e| e.key.clone()).collect();
        let split = self.transact(|doc| {
            let mut split = Vec::new();
            for key in &keys {
                split.extend(doc.split_one(key)?);
            }
            Ok(split)
        })?;
        tracing::info!(systems = keys.len(), emitters = split.len(), "split emitters into wrapper systems");
        Ok(split)
    }

    /// Split one system; a system without complex emitters is left alone
    pub fn split_system_emitters(&mut self, key: &EntryKey) -> Result<Vec<SplitEmitter>> {
        let key = self.require_system(key)?.key.clone();
        let split = self.transact(|doc| doc.split_one(&key))?;
        tracing::info!(system = %key, emitters = split.len(), "split emitters into wrapper systems");
        Ok(split)
    }

    fn split_one(&mut self, key: &EntryKey) -> Result<Vec<SplitEmitter>> {
        let mut host = self.parse_entry(key)?.record;
        let short = short_name(&host);
        let moved: Vec<Value> = match host.body.value(EMITTER_LIST_FIELDS[0]).and_then(Value::as_list) {
            Some(list) if !list.items.is_empty() => list.items.iter().map(|item| item.value.clone()).collect(),
            _ => return Ok(Vec::new()),
        };

        let mut reserved = HashSet::new();
        let mut split = Vec::with_capacity(moved.len());
        let mut wrappers = Vec::with_capacity(moved.len());
        let mut triggers = Vec::with_capacity(moved.len());
        for (i, emitter) in moved.into_iter().enumerate() {
            let emitter_name = emitter
                .as_record()
                .and_then(|r| r.value("emitterName"))
                .and_then(Value::as_str)
                .unwrap_or_else(|| format!("Emitter_{}", i + 1));
            let desired = EntryKey::Name(format!("{WRAPPER_PREFIX}{short}_{emitter_name}"));
            let wrapper = self.unique_key_excluding(&desired, &reserved);
            reserved.insert(wrapper.clone());

            let trigger = format!("Trigger_{}_{emitter_name}", i + 1);
            triggers.push(Value::Record(trigger_emitter(&trigger, &wrapper)));
            wrappers.push(wrapper_system(&wrapper, emitter));
            split.push(SplitEmitter { system: key.clone(), emitter: emitter_name, wrapper, trigger });
        }

        if let Some(list) = emitter_list_mut(&mut host.body) {
            list.items.clear();
            for trigger in triggers {
                list.push(trigger);
            }
        }
        self.write_back(&mut host)?;
        self.insert_records(&wrappers)?;

        for moved in &split {
            tracing::debug!(system = %key, emitter = %moved.emitter, wrapper = %moved.wrapper, "moved emitter");
        }
        Ok(split)
    }
}
