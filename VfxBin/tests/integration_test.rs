use std::fs;

use pretty_assertions::assert_eq;
use tempfile::tempdir;
use vfxbin::index::index_files;
use vfxbin::prelude::*;

const SKIN: &str = r#"#PROP_text
type: string = "PROP"
version: u32 = 3
linked: list[string] = {
    "DATA/Characters/Ahri/Ahri.bin"
}
entries: map[hash,embed] = {
    "Characters/Ahri/Skins/Skin0" = SkinCharacterDataProperties {
        skinClassification: u32 = 1
        idleParticlesEffects: list[embed] = {
            SkinCharacterDataProperties_CharacterIdleEffect {
                effectKey: hash = "Ahri_Orb"
                boneName: string = "C_BUFFBONE_GLB_CENTER_LOC"
            }
        }
    }
    "Characters/Ahri/Skins/Skin0/Particles/Ahri_Base_Orb" = VfxSystemDefinitionData {
        complexEmitterDefinitionData: list[pointer] = {
            VfxEmitterDefinitionData {
                rate: embed = ValueFloat {
                    constantValue: f32 = 1
                }
                emitterName: string = "Orb_Core"
                texture: string = "ASSETS/Characters/Ahri/Skins/Base/Particles/Ahri_Base_Orb.tex"
            }
            VfxEmitterDefinitionData {
                emitterName: string = "Orb_Trail"
                childParticleSetDefinition: pointer = VfxChildParticleSetDefinitionData {
                    childrenIdentifiers: list[embed] = {
                        VfxChildIdentifier {
                            effectKey: hash = 0x1a2b3c4d
                        }
                    }
                }
            }
        }
        particleName: string = "Ahri_Base_Orb"
        particlePath: string = "Characters/Ahri/Skins/Skin0/Particles/Ahri_Base_Orb"
        transform: mtx44 = {
            1, 0, 0, 0
            0, 1, 0, 0
            0, 0, 1, 0
            0, 50, 0, 1
        }
    }
    0x1a2b3c4d = VfxSystemDefinitionData {
        particleName: string = "Ahri_Base_Spark" # inline {comment}
        simpleEmitterDefinitionData: list[pointer] = {
            VfxEmitterDefinitionData {
                emitterName: string = "Spark{0}"
            }
        }
    }
    "Characters/Ahri/Skins/Skin0/Resources" = ResourceResolver {
        resourceMap: map[hash,link] = {
            "Ahri_Orb" = "Characters/Ahri/Skins/Skin0/Particles/Ahri_Base_Orb"
        }
    }
}
"#;

const ORB: &str = "Characters/Ahri/Skins/Skin0/Particles/Ahri_Base_Orb";
const SPARK: u32 = 0x1a2b3c4d;

fn fx(key: &str) -> SystemRecord {
    let body = Record::new("VfxSystemDefinitionData").with_field("particleName", FieldType::String, Value::string("Fx"));
    SystemRecord::new(EntryKey::name(key), body)
}

#[test]
fn test_index_spans_and_emitters() {
    let systems = index(SKIN);
    assert_eq!(systems.len(), 2);

    let orb = &systems[&EntryKey::name(ORB)];
    assert_eq!((orb.start_line, orb.end_line), (17, 45));
    assert_eq!(orb.display_name, "Ahri_Base_Orb");
    assert_eq!(orb.emitter_names, vec!["Orb_Core", "Orb_Trail"]);

    let spark = &systems[&EntryKey::Hash(SPARK)];
    assert_eq!((spark.start_line, spark.end_line), (46, 53));
    assert_eq!(spark.particle_name.as_deref(), Some("Ahri_Base_Spark"));
    assert_eq!(spark.emitter_names, vec!["Spark{0}"]);

    let all = scan_entries(SKIN);
    assert_eq!(all.len(), 4);
    assert!(all.diagnostics().is_empty());
    assert_eq!(&SKIN[spark.byte_range.clone()][..10], "0x1a2b3c4d");
    assert!(SKIN[spark.byte_range.clone()].ends_with('}'));
}

#[test]
fn test_two_single_line_systems() {
    let text = "\"Base/Effect\" = VfxSystemDefinitionData { emitterName: string = \"A\" }\n0x1A2B3C4D = VfxSystemDefinitionData { emitterName: string = \"B\" }\n";
    let systems = index(text);
    let keys: Vec<&EntryKey> = systems.keys().collect();
    assert_eq!(keys, vec![&EntryKey::name("Base/Effect"), &EntryKey::Hash(SPARK)]);

    let base = &systems[0];
    assert_eq!((base.start_line, base.end_line), (1, 1));
    assert_eq!(base.emitter_names, vec!["A"]);
    assert_eq!(base.display_name, "Effect");

    let hashed = &systems[1];
    assert_eq!((hashed.start_line, hashed.end_line), (2, 2));
    assert_eq!(hashed.emitter_names, vec!["B"]);
}

#[test]
fn test_every_entry_round_trips_byte_identical() {
    let doc = SourceDocument::new(SKIN);
    for entry in doc.index().entries().values() {
        let parsed = doc.parse_entry(&entry.key).unwrap();
        assert!(parsed.is_clean(), "{} has diagnostics", entry.key);
        let indent = doc.line_indent(entry.byte_range.start);
        assert_eq!(write_system(&parsed.record, &indent), &SKIN[entry.byte_range.clone()]);
    }
}

#[test]
fn test_parsed_emitters_and_children() {
    let doc = SourceDocument::new(SKIN);
    let orb = doc.parse_entry(&EntryKey::name(ORB)).unwrap().record;
    let names: Vec<_> = orb.emitters.iter().map(|e| e.name.clone()).collect();
    assert_eq!(names, vec![Some("Orb_Core".to_string()), Some("Orb_Trail".to_string())]);
    assert_eq!(orb.emitters[1].child_particles.len(), 1);
    assert_eq!(orb.emitters[1].child_particles[0].effect_key, EntryKey::Hash(SPARK));
    assert_eq!(orb.emitters[1].child_particles[0].provenance, Provenance::UserAuthored);

    let children = doc.extract_child_particle_data(&EntryKey::name(ORB)).unwrap();
    assert_eq!(children.len(), 1);
}

#[test]
fn test_matrix_read_and_replace() {
    let mut doc = SourceDocument::new(SKIN);
    let orb = EntryKey::name(ORB);
    assert_eq!(doc.system_matrix(&orb).unwrap(), Some(Matrix4x4::translation(0.0, 50.0, 0.0)));

    let added = doc.upsert_matrix(&orb, &Matrix4x4::translation(10.0, 0.0, 0.0)).unwrap();
    assert!(!added);
    assert_eq!(doc.system_matrix(&orb).unwrap(), Some(Matrix4x4::translation(10.0, 0.0, 0.0)));
    assert_eq!(doc.system_matrix(&EntryKey::Hash(SPARK)).unwrap(), None);
}

#[test]
fn test_braces_inside_strings_and_comments() {
    let text = "\"A\" = VfxSystemDefinitionData {\n    particleName: string = \"}}{\" # }\n    emitterName: string = \"x{\"\n}\n\"B\" = VfxSystemDefinitionData {}\n";
    let systems = index(text);
    assert_eq!(systems.len(), 2);
    let a = &systems[&EntryKey::name("A")];
    assert_eq!((a.start_line, a.end_line), (1, 4));
    assert_eq!(a.particle_name.as_deref(), Some("}}{"));
}

#[test]
fn test_malformed_field_is_kept_and_reported() {
    let text = "\"A\" = VfxSystemDefinitionData {\n    particleName: string = \"A\"\n    broken: vec3 = { 1, 2 }\n    emitterName: string = \"E\"\n}\n";
    let doc = SourceDocument::new(text);
    let parsed = doc.parse_entry(&EntryKey::name("A")).unwrap();
    assert_eq!(parsed.record.particle_name().as_deref(), Some("A"));
    assert!(!parsed.is_clean());
    assert_eq!(write_system(&parsed.record, ""), text.trim_end());
}

#[test]
fn test_resolver_mapping_is_idempotent() {
    let mut doc = SourceDocument::new(SKIN);
    let spark = EntryKey::Hash(SPARK);
    assert_eq!(doc.resolver_entries().unwrap().len(), 1);

    doc.ensure_resolver_mapping(&spark).unwrap();
    let after_first = doc.text().to_string();
    doc.ensure_resolver_mapping(&spark).unwrap();

    assert_eq!(doc.text(), after_first);
    assert_eq!(doc.resolver_entries().unwrap().len(), 2);

    // already covered as a target
    doc.ensure_resolver_mapping(&EntryKey::name(ORB)).unwrap();
    assert_eq!(doc.resolver_entries().unwrap().len(), 2);
}

#[test]
fn test_resolve_effect_key_through_resolver() {
    let doc = SourceDocument::new(SKIN);
    assert_eq!(doc.resolve_effect_key("Ahri_Orb").unwrap(), EntryKey::name(ORB));
    assert_eq!(doc.resolve_effect_key("Ahri_Base_Spark").unwrap(), EntryKey::Hash(SPARK));
    assert!(matches!(doc.resolve_effect_key("Nope"), Err(Error::UnresolvedReference { .. })));
}

#[test]
fn test_repeated_insert_gets_suffixes() {
    let mut doc = SourceDocument::new("entries: map[hash,embed] = {}\n");
    let keys: Vec<EntryKey> = (0..3).map(|_| doc.insert_system(&fx("Fx")).unwrap()).collect();
    assert_eq!(keys, vec![EntryKey::name("Fx"), EntryKey::name("Fx_1"), EntryKey::name("Fx_2")]);

    let indexed: Vec<EntryKey> = doc.systems().map(|e| e.key.clone()).collect();
    assert_eq!(indexed, keys);
    assert_eq!(*doc.index(), scan_entries(doc.text()));
}

#[test]
fn test_invalid_bone_leaves_document_untouched() {
    let mut doc = SourceDocument::new(SKIN);
    let err = doc.add_idle_particle_effect("NotABone", "Ahri_Orb").unwrap_err();
    assert!(matches!(err, Error::InvalidBone { .. }));
    assert_eq!(doc.text(), SKIN);
}

#[test]
fn test_idle_binding_through_resolver_name() {
    let mut doc = SourceDocument::new(SKIN);
    let orb = EntryKey::name(ORB);
    doc.add_idle_particle_effect("head", "Ahri_Orb").unwrap();

    assert_eq!(doc.get_all_idle_particle_bones(&orb).unwrap(), vec!["C_BUFFBONE_GLB_CENTER_LOC", "Head"]);
    assert_eq!(doc.remove_all_idle_particles_for_system(&orb).unwrap(), 2);
    assert!(doc.idle_particle_bindings().unwrap().is_empty());
}

#[test]
fn test_persistent_condition_upsert() {
    let mut doc = SourceDocument::new(SKIN);
    let skin = EntryKey::name("Characters/Ahri/Skins/Skin0");
    let spark = EntryKey::Hash(SPARK);

    assert_eq!(
        doc.insert_or_update_persistent_effect(&skin, "HP<50%", &EntryKey::name(ORB)).unwrap(),
        UpsertOutcome::Inserted
    );
    assert_eq!(doc.insert_or_update_persistent_effect(&skin, "HP<50%", &spark).unwrap(), UpsertOutcome::Updated);

    let conditions = doc.extract_existing_conditions(&skin).unwrap();
    assert_eq!(
        conditions,
        vec![PersistentEffectEntry { condition: "HP<50%".to_string(), effect_key: Some(spark) }]
    );
    assert_eq!(*doc.index(), scan_entries(doc.text()));
}

#[test]
fn test_rename_propagates_and_reindexes() {
    let mut doc = SourceDocument::new(SKIN);
    let new = EntryKey::name("Characters/Ahri/Skins/Skin0/Particles/Ahri_Base_Sphere");
    let report = doc.rename_system(&EntryKey::name(ORB), &new).unwrap();

    assert_eq!(report.headers, 1);
    assert_eq!(report.resolver_rows, 1);
    assert_eq!(report.references, 1);
    assert!(!doc.text().contains(&format!("\"{ORB}\"")));
    assert!(doc.entry(&EntryKey::name(ORB)).is_none());
    assert_eq!(doc.resolve_effect_key("Ahri_Orb").unwrap(), new);
    assert_eq!(doc.resolver_entries().unwrap().len(), 1);
    assert_eq!(*doc.index(), scan_entries(doc.text()));
}

#[test]
fn test_rename_updates_persistent_binding() {
    let mut doc = SourceDocument::new(SKIN);
    let skin = EntryKey::name("Characters/Ahri/Skins/Skin0");
    doc.insert_or_update_persistent_effect(&skin, "HP<50%", &EntryKey::name(ORB)).unwrap();

    let new = EntryKey::name("Characters/Ahri/Skins/Skin0/Particles/Ahri_Base_Sphere");
    let report = doc.rename_system(&EntryKey::name(ORB), &new).unwrap();
    assert_eq!(report.skin_bindings, 1);

    let conditions = doc.extract_existing_conditions(&skin).unwrap();
    assert_eq!(conditions[0].effect_key, Some(new));
    assert_eq!(scan_entries(doc.text()).get(&EntryKey::name(ORB)), None);
    assert!(!doc.text().contains(&format!("\"{ORB}\"")));
}

#[test]
fn test_clean_unused_keeps_referenced_systems() {
    let mut doc = SourceDocument::new(SKIN);
    doc.insert_system(&fx("Characters/Ahri/Skins/Skin0/Particles/Unused")).unwrap();
    assert_eq!(doc.systems().count(), 3);

    let report = doc.remove_unreferenced_systems().unwrap();
    assert_eq!(report.count(), 1);
    let left: Vec<EntryKey> = doc.systems().map(|e| e.key.clone()).collect();
    assert_eq!(left, vec![EntryKey::name(ORB), EntryKey::Hash(SPARK)]);
}

#[test]
fn test_import_between_files_on_disk() {
    let temp = tempdir().unwrap();
    let source_path = temp.path().join("source.py");
    let target_path = temp.path().join("target.py");
    fs::write(&source_path, SKIN).unwrap();
    fs::write(&target_path, "entries: map[hash,embed] = {\n    \"Characters/Ahri/Skins/Skin0/Particles/Ahri_Base_Orb\" = VfxSystemDefinitionData {}\n}\n").unwrap();

    let source = SourceDocument::new(fs::read_to_string(&source_path).unwrap());
    let mut target = SourceDocument::new(fs::read_to_string(&target_path).unwrap());
    let outcomes = target.import_systems(&source, &[EntryKey::name(ORB), EntryKey::Hash(SPARK)]).unwrap();
    assert!(outcomes[0].was_renamed());
    assert!(!outcomes[1].was_renamed());
    fs::write(&target_path, target.text()).unwrap();

    let batch = index_files(&[source_path, target_path], |_, _, _| {});
    assert!(batch.failures.is_empty());
    assert_eq!(batch.files[1].index.systems().count(), 3);
}

#[test]
fn test_asset_detection_and_validation() {
    let temp = tempdir().unwrap();
    let dir = temp.path().join("assets/characters/ahri/skins/base/particles");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("ahri_base_orb.tex"), b"TEX").unwrap();

    let doc = SourceDocument::new(SKIN);
    let refs = doc.detect_assets_in_system(&EntryKey::name(ORB)).unwrap();
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].kind, Some(AssetKind::Texture));

    let roots = vec![temp.path().to_path_buf()];
    assert!(resolve_asset_path(&refs[0].path, &roots).is_some());
    assert!(validate_for_upload(&refs, &roots, &AssetLimits::default()).is_empty());

    let relocated = generate_canonical_path(&["Me", "Ahri"], &refs[0].path);
    assert!(relocated.starts_with("ASSETS/Me/Ahri/Ahri_Base_Orb_") || relocated.starts_with("ASSETS/Me/Ahri/ahri_base_orb_"));
    assert_eq!(relocated, generate_canonical_path(&["Me", "Ahri"], &refs[0].path));
}
