//! Idle particles: effects a skin plays on a bone while idle
//!
//! They live in the `idleParticlesEffects` list of the document's
//! `SkinCharacterDataProperties` entry:
//!
//! ```text
//! idleParticlesEffects: list[embed] = {
//!     SkinCharacterDataProperties_CharacterIdleEffect {
//!         effectKey: hash = "Characters/Ahri/Skins/Skin0/Particles/Orb"
//!         boneName: string = "C_BUFFBONE_GLB_CENTER_LOC"
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::document::SourceDocument;
use crate::error::{Error, Result};
use crate::formats::vfx::{EntryKey, FieldType, ListValue, Record, Value};

const IDLE_FIELD: &str = "idleParticlesEffects";
const IDLE_EFFECT_TYPE: &str = "SkinCharacterDataProperties_CharacterIdleEffect";

/// Bones an idle effect may attach to
pub const IDLE_BONES: &[&str] = &[
    "C_BUFFBONE_GLB_CENTER_LOC",
    "C_BUFFBONE_GLB_CHEST_LOC",
    "C_BUFFBONE_GLB_GROUND_LOC",
    "C_BUFFBONE_GLB_HEAD_LOC",
    "C_BUFFBONE_GLB_LAYOUT_LOC",
    "C_BUFFBONE_GLB_OVERHEAD_LOC",
    "C_BUFFBONE_GLB_WEAPON_1",
    "C_BUFFBONE_GLB_WEAPON_2",
    "BUFFBONE_GLB_GROUND_LOC",
    "BUFFBONE_CSTM_WEAPON_1",
    "BUFFBONE_CSTM_WEAPON_2",
    "Root",
    "Pelvis",
    "Spine",
    "Spine1",
    "Spine2",
    "Chest",
    "Neck",
    "Head",
    "L_Clavicle",
    "R_Clavicle",
    "L_Shoulder",
    "R_Shoulder",
    "L_Elbow",
    "R_Elbow",
    "L_Hand",
    "R_Hand",
    "L_Hip",
    "R_Hip",
    "L_Knee",
    "R_Knee",
    "L_Foot",
    "R_Foot",
    "Weapon",
];

fn canonical_bone(bone: &str) -> Option<&'static str> {
    IDLE_BONES.iter().copied().find(|b| b.eq_ignore_ascii_case(bone.trim()))
}

/// Whether `bone` is on [`IDLE_BONES`] (case-insensitive)
#[must_use]
pub fn is_valid_idle_bone(bone: &str) -> bool {
    canonical_bone(bone).is_some()
}

/// One idle effect of the skin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdleParticleBinding {
    pub effect_key: EntryKey,
    pub bone: String,
}

fn bindings_of(body: &Record) -> Vec<IdleParticleBinding> {
    body.value(IDLE_FIELD)
        .and_then(Value::as_list)
        .map(|list| list.items.iter().filter_map(|item| binding_of(&item.value)).collect())
        .unwrap_or_default()
}

fn binding_of(value: &Value) -> Option<IdleParticleBinding> {
    let record = value.as_record()?;
    Some(IdleParticleBinding {
        effect_key: record.value("effectKey").and_then(Value::as_key)?,
        bone: record.value("boneName").and_then(Value::as_str).unwrap_or_default(),
    })
}

impl SourceDocument {
    /// Idle effects of the skin data entry; empty when there is none
    pub fn idle_particle_bindings(&self) -> Result<Vec<IdleParticleBinding>> {
        let Some(skin) = self.skin_data() else {
            return Ok(Vec::new());
        };
        Ok(bindings_of(&self.parse_entry(&skin.key)?.record.body))
    }

    /// Play the system `particle_ref` names on `bone` while idle
    ///
    /// The bone is checked against [`IDLE_BONES`] before anything else; an
    /// unknown bone fails with [`Error::InvalidBone`] and the text is left
    /// as it was. Adding a binding that already exists changes nothing.
    pub fn add_idle_particle_effect(&mut self, bone: &str, particle_ref: &str) -> Result<IdleParticleBinding> {
        let bone = canonical_bone(bone).ok_or_else(|| Error::InvalidBone { bone: bone.to_string() })?;
        let skin = self.require_skin_data()?;
        let target = self.resolve_effect_key(particle_ref)?;

        let binding = IdleParticleBinding { effect_key: target.clone(), bone: bone.to_string() };
        let existing = self.idle_particle_bindings()?;
        if existing.iter().any(|b| b.effect_key.refers_to(&target) && b.bone == bone) {
            return Ok(binding);
        }

        self.transact(|doc| {
            doc.rewrite_entry(&skin, |record| {
                if record.body.value(IDLE_FIELD).and_then(Value::as_list).is_none() {
                    record.body.set_field(
                        IDLE_FIELD,
                        FieldType::List("list".into(), Box::new(FieldType::Record("embed".into()))),
                        Value::List(ListValue::default()),
                    );
                }
                if let Some(list) = record.body.value_mut(IDLE_FIELD).and_then(Value::as_list_mut) {
                    list.push(Value::Record(
                        Record::new(IDLE_EFFECT_TYPE)
                            .with_field("effectKey", FieldType::Hash("hash".into()), Value::key(&target))
                            .with_field("boneName", FieldType::String, Value::string(bone)),
                    ));
                }
                Ok(())
            })?;
            doc.ensure_resolver_mapping(&target)?;
            Ok(())
        })?;

        tracing::info!(bone, effect = %target, "added idle particle");
        Ok(binding)
    }

    /// Whether any idle effect plays `system`
    pub fn has_idle_particle_effect(&self, system: &EntryKey) -> Result<bool> {
        Ok(!self.get_all_idle_particle_bones(system)?.is_empty())
    }

    /// Bones on which `system` plays as an idle effect
    pub fn get_all_idle_particle_bones(&self, system: &EntryKey) -> Result<Vec<String>> {
        let rows = self.resolver_entries()?;
        Ok(self
            .idle_particle_bindings()?
            .into_iter()
            .filter(|b| self.reference_targets(&b.effect_key, system, &rows))
            .map(|b| b.bone)
            .collect())
    }

    /// Remove every idle effect playing `system`; returns how many
    pub fn remove_all_idle_particles_for_system(&mut self, system: &EntryKey) -> Result<usize> {
        let Some(skin) = self.skin_data().map(|e| e.key.clone()) else {
            return Ok(0);
        };
        let rows = self.resolver_entries()?;
        let mut record = self.parse_entry(&skin)?.record;

        let Some(list) = record.body.value_mut(IDLE_FIELD).and_then(Value::as_list_mut) else {
            return Ok(0);
        };
        let before = list.items.len();
        list.items.retain(|item| {
            !binding_of(&item.value).is_some_and(|b| self.reference_targets(&b.effect_key, system, &rows))
        });
        let removed = before - list.items.len();

        if removed > 0 {
            self.transact(|doc| doc.write_back(&mut record))?;
            tracing::info!(system = %system, removed, "removed idle particles");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DOC: &str = r#"entries: map[hash,embed] = {
    "Skins/Skin0" = SkinCharacterDataProperties {
        skinClassification: u32 = 1
    }
    "Particles/Orb" = VfxSystemDefinitionData {
        particleName: string = "Orb"
    }
}
"#;

    #[test]
    fn test_bone_allow_list() {
        assert!(is_valid_idle_bone("C_BUFFBONE_GLB_CENTER_LOC"));
        assert!(is_valid_idle_bone("l_hand"));
        assert!(!is_valid_idle_bone("NotARealBone"));
    }

    #[test]
    fn test_invalid_bone_leaves_text_unchanged() {
        let mut doc = SourceDocument::new(DOC);
        let err = doc.add_idle_particle_effect("NotARealBone", "Orb").unwrap_err();
        assert!(matches!(err, Error::InvalidBone { ref bone } if bone == "NotARealBone"));
        assert_eq!(doc.text(), DOC);
    }

    #[test]
    fn test_add_query_and_remove() {
        let mut doc = SourceDocument::new(DOC);
        let orb = EntryKey::name("Particles/Orb");
        doc.add_idle_particle_effect("c_buffbone_glb_center_loc", "Orb").unwrap();
        doc.add_idle_particle_effect("Head", "Orb").unwrap();
        doc.add_idle_particle_effect("Head", "Orb").unwrap();

        assert!(doc.text().contains(
            "        idleParticlesEffects: list[embed] = {\n            SkinCharacterDataProperties_CharacterIdleEffect {\n                effectKey: hash = \"Particles/Orb\"\n                boneName: string = \"C_BUFFBONE_GLB_CENTER_LOC\"\n            }\n"
        ));
        assert!(doc.has_idle_particle_effect(&orb).unwrap());
        assert_eq!(doc.get_all_idle_particle_bones(&orb).unwrap(), vec!["C_BUFFBONE_GLB_CENTER_LOC", "Head"]);
        assert_eq!(doc.resolver_entries().unwrap().len(), 1);

        assert_eq!(doc.remove_all_idle_particles_for_system(&orb).unwrap(), 2);
        assert!(!doc.has_idle_particle_effect(&orb).unwrap());
    }

    #[test]
    fn test_missing_skin_data() {
        let mut doc = SourceDocument::new("\"Particles/Orb\" = VfxSystemDefinitionData {}\n");
        assert!(matches!(doc.add_idle_particle_effect("Head", "Particles/Orb"), Err(Error::MissingSkinData)));
    }
}
