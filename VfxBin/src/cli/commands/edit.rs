//! CLI commands that edit a document

use std::path::Path;
use std::time::Instant;

use console::style;

use crate::cli::progress::{DISK, GEAR, LINK, LOOKING_GLASS, print_done, print_step, simple_spinner};
use crate::document::SourceDocument;
use crate::editor::{CleanReport, IDLE_BONES, combine_linked, separate_vfx};
use crate::formats::vfx::{EntryKey, Matrix4x4};

use super::{read_document, write_document};

fn save(doc: &SourceDocument, input: &Path, output: Option<&Path>, step: usize, total: usize) -> anyhow::Result<()> {
    print_step(step, total, DISK, "Writing document...");
    let path = write_document(doc, input, output)?;
    println!("  wrote {}", path.display());
    Ok(())
}

fn print_clean_report(report: &CleanReport) {
    for finding in &report.removed {
        println!("  {} {:?} {}: {}", style("removed").green(), finding.kind, finding.location, finding.detail);
    }
    for finding in &report.kept {
        println!("  {} {:?} {}: {}", style("kept").yellow(), finding.kind, finding.location, finding.detail);
    }
}

pub fn rename(file: &Path, old: &EntryKey, new: &EntryKey, output: Option<&Path>, dry_run: bool) -> anyhow::Result<()> {
    let start = Instant::now();
    print_step(1, 2, LOOKING_GLASS, "Indexing document...");
    let mut doc = read_document(file)?;

    let report = doc.rename_system(old, new)?;
    println!(
        "  {} -> {}: {} headers, {} resolver rows, {} skin bindings, {} other references",
        report.old_key, report.new_key, report.headers, report.resolver_rows, report.skin_bindings, report.references
    );

    if dry_run {
        println!("  dry run, nothing written");
    } else {
        save(&doc, file, output, 2, 2)?;
    }
    print_done(start.elapsed());
    Ok(())
}

pub fn clean(file: &Path, key: Option<&EntryKey>, output: Option<&Path>, dry_run: bool) -> anyhow::Result<()> {
    let start = Instant::now();
    print_step(1, 2, GEAR, "Cleaning systems...");
    let mut doc = read_document(file)?;

    let keys: Vec<EntryKey> = match key {
        Some(key) => vec![key.clone()],
        None => doc.systems().map(|e| e.key.clone()).collect(),
    };
    let mut report = CleanReport::default();
    for key in &keys {
        let cleaned = doc.clean_system(key)?;
        report.removed.extend(cleaned.removed);
        report.kept.extend(cleaned.kept);
    }
    print_clean_report(&report);
    println!("  {} removed, {} kept across {} systems", report.count(), report.kept.len(), keys.len());

    if dry_run || report.count() == 0 {
        println!("  nothing written");
    } else {
        save(&doc, file, output, 2, 2)?;
    }
    print_done(start.elapsed());
    Ok(())
}

pub fn clean_unused(file: &Path, output: Option<&Path>, dry_run: bool) -> anyhow::Result<()> {
    let start = Instant::now();
    print_step(1, 2, GEAR, "Finding unreferenced systems...");
    let mut doc = read_document(file)?;

    let report = doc.remove_unreferenced_systems()?;
    print_clean_report(&report);

    if dry_run || report.count() == 0 {
        println!("  nothing written");
    } else {
        save(&doc, file, output, 2, 2)?;
    }
    print_done(start.elapsed());
    Ok(())
}

pub fn import(source: &Path, target: &Path, keys: &[EntryKey], output: Option<&Path>) -> anyhow::Result<()> {
    let start = Instant::now();
    print_step(1, 2, LOOKING_GLASS, "Reading documents...");
    let source_doc = read_document(source)?;
    let mut doc = read_document(target)?;

    if keys.is_empty() && source_doc.systems().next().is_none() {
        anyhow::bail!("{} has no VFX systems to import", source.display());
    }

    let outcomes = doc.import_systems(&source_doc, keys)?;
    for outcome in &outcomes {
        if outcome.was_renamed() {
            println!("  {} as {}", outcome.original, style(&outcome.assigned).yellow());
        } else {
            println!("  {}", outcome.assigned);
        }
    }

    save(&doc, target, output, 2, 2)?;
    print_done(start.elapsed());
    Ok(())
}

pub fn resolve(file: &Path, name: &str) -> anyhow::Result<()> {
    let doc = read_document(file)?;
    let key = doc.resolve_effect_key(name)?;
    let status = if doc.contains_key(&key) { "defined" } else { "not defined in this file" };
    println!("{name} -> {key} ({status})");
    Ok(())
}

pub fn child(file: &Path, system: &EntryKey, attach: &str, particle: &str, output: Option<&Path>) -> anyhow::Result<()> {
    let mut doc = read_document(file)?;
    print_step(1, 2, GEAR, &format!("Adding child emitter to {system}..."));
    let binding = doc.add_child_particle_effect(system, attach, particle)?;
    println!(
        "  {} spawns {}",
        binding.emitter_name.as_deref().unwrap_or_default(),
        binding.effect_key
    );
    save(&doc, file, output, 2, 2)
}

pub fn persistent(
    file: &Path,
    condition: &str,
    effect: &EntryKey,
    owner: Option<&EntryKey>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let mut doc = read_document(file)?;
    let owner = match owner {
        Some(owner) => owner.clone(),
        None => doc
            .skin_data()
            .map(|e| e.key.clone())
            .ok_or_else(|| anyhow::anyhow!("{} has no skin data entry; pass --owner", file.display()))?,
    };

    print_step(1, 2, GEAR, &format!("Updating persistent effects of {owner}..."));
    let outcome = doc.insert_or_update_persistent_effect(&owner, condition, effect)?;
    println!("  {outcome:?}");
    save(&doc, file, output, 2, 2)
}

pub fn transform(
    file: &Path,
    system: &EntryKey,
    translate: Option<&[f64]>,
    matrix: Option<&[f64]>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let matrix = match (translate, matrix) {
        (Some([x, y, z]), _) => Matrix4x4::translation(*x, *y, *z),
        (_, Some(values)) => Matrix4x4::from_slice(values)?,
        _ => anyhow::bail!("pass --translate x,y,z or --matrix with 16 values"),
    };

    let mut doc = read_document(file)?;
    print_step(1, 2, GEAR, &format!("Setting transform of {system}..."));
    let added = doc.upsert_matrix(system, &matrix)?;
    println!("  {}", if added { "added transform" } else { "updated transform" });
    save(&doc, file, output, 2, 2)
}

pub fn idle_list(file: &Path) -> anyhow::Result<()> {
    let doc = read_document(file)?;
    let bindings = doc.idle_particle_bindings()?;
    if bindings.is_empty() {
        println!("no idle particles");
    }
    for binding in &bindings {
        println!("{:<24} {}", binding.bone, binding.effect_key);
    }
    Ok(())
}

pub fn idle_add(file: &Path, bone: &str, particle: &str, output: Option<&Path>) -> anyhow::Result<()> {
    let mut doc = read_document(file)?;
    print_step(1, 2, GEAR, &format!("Binding {particle} to {bone}..."));
    let binding = doc.add_idle_particle_effect(bone, particle)?;
    println!("  {} on {}", binding.effect_key, binding.bone);
    save(&doc, file, output, 2, 2)
}

pub fn idle_remove(file: &Path, system: &EntryKey, output: Option<&Path>) -> anyhow::Result<()> {
    let pb = simple_spinner("Removing idle bindings...");
    let mut doc = read_document(file)?;
    let removed = doc.remove_all_idle_particles_for_system(system)?;
    pb.finish_and_clear();

    println!("removed {removed} idle bindings of {system}");
    if removed > 0 {
        write_document(&doc, file, output)?;
    }
    Ok(())
}

pub fn idle_bones() {
    for bone in IDLE_BONES {
        println!("{bone}");
    }
}

pub fn split(file: &Path, key: Option<&EntryKey>, output: Option<&Path>, dry_run: bool) -> anyhow::Result<()> {
    let start = Instant::now();
    print_step(1, 2, GEAR, "Splitting emitters...");
    let mut doc = read_document(file)?;

    let split = match key {
        Some(key) => doc.split_system_emitters(key)?,
        None => doc.split_emitters()?,
    };
    for moved in &split {
        println!("  {} {} -> {}", moved.system, moved.emitter, style(&moved.wrapper).green());
    }
    println!("  {} emitters moved", split.len());

    if dry_run || split.is_empty() {
        println!("  nothing written");
    } else {
        save(&doc, file, output, 2, 2)?;
    }
    print_done(start.elapsed());
    Ok(())
}

pub fn separate(file: &Path) -> anyhow::Result<()> {
    let start = Instant::now();
    print_step(1, 1, LINK, "Separating VFX systems...");
    match separate_vfx(file)? {
        Some(report) => {
            println!("  {} systems -> {}", report.systems.len(), report.vfx_file.display());
            println!("  linked as {}", style(&report.link).cyan());
            for path in &report.changed_files {
                println!("  updated {}", path.display());
            }
        }
        None => println!("  no VFX systems found, nothing written"),
    }
    print_done(start.elapsed());
    Ok(())
}

pub fn combine(file: &Path) -> anyhow::Result<()> {
    let start = Instant::now();
    print_step(1, 1, LINK, "Combining linked files...");
    let report = combine_linked(file)?;
    for path in &report.merged_files {
        println!("  merged and removed {}", path.display());
    }
    println!("  {} entries merged, {} links removed", report.merged_entries.len(), report.removed_links.len());
    print_done(start.elapsed());
    Ok(())
}
