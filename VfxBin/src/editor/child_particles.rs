//! Child-particle bindings: emitters that spawn another system

use serde::{Deserialize, Serialize};

use crate::document::SourceDocument;
use crate::error::{Error, Result};
use crate::formats::vfx::{
    CHILD_EFFECT_FIELDS, ChildParticleBinding, EMITTER_LIST_FIELDS, EntryKey, FieldType, ListValue, Provenance, Record,
    TOOL_CHILD_PREFIX, Value,
};

/// A system that can be spawned as a child particle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableSystem {
    pub key: EntryKey,
    pub display_name: String,
    pub particle_name: String,
}

fn record_type(name: &str) -> FieldType {
    FieldType::Record(name.to_string())
}

fn value_float(value: f64) -> Value {
    Value::Record(Record::new("ValueFloat").with_field("constantValue", FieldType::Number("f32".into()), Value::number(value)))
}

/// Single-particle emitter whose only job is to spawn `effect_key`
pub(crate) fn trigger_emitter(emitter_name: &str, effect_key: &EntryKey) -> Record {
    let mut children = ListValue::default();
    children.push(Value::Record(
        Record::new("VfxChildIdentifier").with_field(CHILD_EFFECT_FIELDS[0], FieldType::Hash("link".into()), Value::key(effect_key)),
    ));
    let child_set = Record::new("VfxChildParticleSetDefinitionData").with_field(
        "childrenIdentifiers",
        FieldType::List("list".into(), Box::new(record_type("embed"))),
        Value::List(children),
    );

    Record::new("VfxEmitterDefinitionData")
        .with_field("isSingleParticle", FieldType::Bool("flag".into()), Value::bool(true))
        .with_field("childParticleSetDefinition", record_type("pointer"), Value::Record(child_set))
        .with_field("bindWeight", record_type("embed"), value_float(1.0))
        .with_field("particleIsLocalOrientation", FieldType::Bool("flag".into()), Value::bool(true))
        .with_field("rate", record_type("embed"), value_float(1.0))
        .with_field("emitterName", FieldType::String, Value::string(emitter_name))
}

/// Make sure `body` has a `complexEmitterDefinitionData` list
pub(crate) fn emitter_list_mut(body: &mut Record) -> Option<&mut ListValue> {
    let list_field = EMITTER_LIST_FIELDS[0];
    if body.value(list_field).and_then(Value::as_list).is_none() {
        body.set_field(
            list_field,
            FieldType::List("list".into(), Box::new(record_type("pointer"))),
            Value::List(ListValue::default()),
        );
    }
    body.value_mut(list_field).and_then(Value::as_list_mut)
}

impl SourceDocument {
    /// Systems with a `particleName`, in document order
    #[must_use]
    pub fn find_available_vfx_systems(&self) -> Vec<AvailableSystem> {
        self.systems()
            .filter_map(|entry| {
                Some(AvailableSystem {
                    key: entry.key.clone(),
                    display_name: entry.display_name.clone(),
                    particle_name: entry.particle_name.clone()?,
                })
            })
            .collect()
    }

    /// Every child binding of a system's emitters
    pub fn extract_child_particle_data(&self, system: &EntryKey) -> Result<Vec<ChildParticleBinding>> {
        let key = self.require_system(system)?.key.clone();
        let parsed = self.parse_entry(&key)?;
        Ok(parsed
            .record
            .emitters
            .into_iter()
            .flat_map(|emitter| emitter.child_particles)
            .collect())
    }

    /// Add an emitter to `system` that spawns the system `particle_ref` names
    ///
    /// The emitter is called `VfxBin_Child_<attach_point>` and is appended to
    /// `complexEmitterDefinitionData`. `particle_ref` is resolved like
    /// [`Self::resolve_effect_key`] and must name another system that has a
    /// `particleName`.
    pub fn add_child_particle_effect(&mut self, system: &EntryKey, attach_point: &str, particle_ref: &str) -> Result<ChildParticleBinding> {
        let host = self.require_system(system)?.key.clone();
        if attach_point.trim().is_empty() || attach_point.contains(['"', '\n']) {
            return Err(Error::InvalidEdit { message: format!("invalid attach point '{attach_point}'") });
        }

        let source = self.resolve_effect_key(particle_ref)?;
        let source_entry = self.require_system(&source)?;
        if source_entry.particle_name.is_none() {
            return Err(Error::IneligibleParticleSource { key: source.literal() });
        }
        if source.refers_to(&host) {
            return Err(Error::InvalidEdit { message: format!("{host} cannot spawn itself") });
        }

        let emitter_name = format!("{TOOL_CHILD_PREFIX}{attach_point}");
        let parsed = self.parse_entry(&host)?;
        if parsed.record.emitters.iter().any(|e| e.name.as_deref() == Some(emitter_name.as_str())) {
            return Err(Error::DuplicateEmitter { system: host.literal(), emitter: emitter_name });
        }

        let mut record = parsed.record;
        if let Some(list) = emitter_list_mut(&mut record.body) {
            list.push(Value::Record(trigger_emitter(&emitter_name, &source)));
        }
        self.transact(|doc| doc.write_back(&mut record))?;

        tracing::info!(system = %host, emitter = %emitter_name, child = %source, "added child particle emitter");
        Ok(ChildParticleBinding {
            emitter_name: Some(emitter_name),
            effect_key: source,
            provenance: Provenance::ToolAuthored,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DOC: &str = r#"entries: map[hash,embed] = {
    "Fx/Host" = VfxSystemDefinitionData {
        particleName: string = "Host"
        complexEmitterDefinitionData: list[pointer] = {
            VfxEmitterDefinitionData {
                emitterName: string = "Glow"
            }
        }
    }
    "Fx/Spark" = VfxSystemDefinitionData {
        particleName: string = "Spark"
    }
    "Fx/Bare" = VfxSystemDefinitionData {}
}
"#;

    #[test]
    fn test_find_available_vfx_systems() {
        let doc = SourceDocument::new(DOC);
        let names: Vec<String> = doc.find_available_vfx_systems().into_iter().map(|s| s.particle_name).collect();
        assert_eq!(names, vec!["Host", "Spark"]);
    }

    #[test]
    fn test_add_child_particle_effect() {
        let mut doc = SourceDocument::new(DOC);
        let host = EntryKey::name("Fx/Host");
        let binding = doc.add_child_particle_effect(&host, "Hand", "Spark").unwrap();
        assert_eq!(binding.effect_key, EntryKey::name("Fx/Spark"));

        assert!(doc.text().contains(
            "            VfxEmitterDefinitionData {\n                isSingleParticle: flag = true\n"
        ));
        assert!(doc.text().contains("                        VfxChildIdentifier {\n                            effect: link = \"Fx/Spark\"\n"));
        assert!(doc.text().contains("                bindWeight: embed = ValueFloat {\n                    constantValue: f32 = 1\n                }\n"));
        assert!(doc.text().contains("                emitterName: string = \"VfxBin_Child_Hand\"\n            }\n        }\n    }\n"));

        let children = doc.extract_child_particle_data(&host).unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].provenance, Provenance::ToolAuthored);
        assert_eq!(children[0].effect_key, EntryKey::name("Fx/Spark"));
    }

    #[test]
    fn test_add_child_particle_rejections() {
        let mut doc = SourceDocument::new(DOC);
        let host = EntryKey::name("Fx/Host");

        let err = doc.add_child_particle_effect(&host, "Hand", "Fx/Bare").unwrap_err();
        assert!(matches!(err, Error::IneligibleParticleSource { .. }));

        doc.add_child_particle_effect(&host, "Hand", "Spark").unwrap();
        let before = doc.text().to_string();
        let err = doc.add_child_particle_effect(&host, "Hand", "Spark").unwrap_err();
        assert!(matches!(err, Error::DuplicateEmitter { .. }));
        assert_eq!(doc.text(), before);
    }
}
