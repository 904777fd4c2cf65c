//! CLI commands for indexing and inspecting entries

use std::path::{Path, PathBuf};
use std::time::Instant;

use console::style;
use serde_json::json;

use crate::cli::progress::{LINK, LOOKING_GLASS, print_done, print_step, simple_bar};
use crate::index::{IndexEntry, find_bin_texts, index_files};
use crate::formats::vfx::EntryKey;

use super::read_document;

/// Expand directories into the `.py` dumps below them
fn collect_inputs(files: &[PathBuf]) -> Vec<PathBuf> {
    let mut inputs = Vec::new();
    for path in files {
        if path.is_dir() {
            inputs.extend(find_bin_texts(path));
        } else {
            inputs.push(path.clone());
        }
    }
    inputs
}

fn print_entry(entry: &IndexEntry, all: bool) {
    let lines = format!("{:>6}-{:<6}", entry.start_line, entry.end_line);
    let type_col = if all { format!("  {}", style(&entry.type_name).dim()) } else { String::new() };
    println!("  {} {}{}", style(lines).dim(), entry.key, type_col);
    if let Some(particle) = &entry.particle_name {
        println!("      particle: {particle}");
    }
    if !entry.emitter_names.is_empty() {
        println!("      emitters: {}", entry.emitter_names.join(", "));
    }
}

pub fn index(files: &[PathBuf], all: bool, json: bool, quiet: bool) -> anyhow::Result<()> {
    let start = Instant::now();
    let inputs = collect_inputs(files);
    if inputs.is_empty() {
        anyhow::bail!("no ritobin text files found");
    }

    let show_progress = !quiet && !json && inputs.len() > 1;
    let pb = show_progress.then(|| simple_bar(inputs.len() as u64, "Indexing"));
    let result = index_files(&inputs, |current, _, _| {
        if let Some(pb) = &pb {
            pb.set_position(current as u64);
        }
    });
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    if json {
        let files: Vec<_> = result
            .files
            .iter()
            .map(|file| {
                let entries: Vec<&IndexEntry> = file
                    .index
                    .entries()
                    .values()
                    .filter(|e| all || e.is_vfx_system())
                    .collect();
                json!({
                    "path": file.path,
                    "entries": entries,
                    "diagnostics": file.index.diagnostics(),
                })
            })
            .collect();
        let failures: Vec<_> = result
            .failures
            .iter()
            .map(|(path, reason)| json!({ "path": path, "reason": reason }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&json!({ "files": files, "failures": failures }))?);
        return Ok(());
    }

    for file in &result.files {
        println!("{}{}", LINK, style(file.path.display()).bold());
        for entry in file.index.entries().values().filter(|e| all || e.is_vfx_system()) {
            print_entry(entry, all);
        }
        for diagnostic in file.index.diagnostics() {
            println!("  {} line {}: {}", style("skipped").yellow(), diagnostic.line, diagnostic.reason);
        }
    }
    for (path, reason) in &result.failures {
        eprintln!("{} {}: {reason}", style("failed").red(), path.display());
    }

    println!();
    println!(
        "{} systems in {} files",
        result.system_count(),
        result.files.len()
    );
    if !quiet {
        print_done(start.elapsed());
    }
    Ok(())
}

pub fn show(file: &Path, key: &EntryKey, json: bool) -> anyhow::Result<()> {
    let doc = read_document(file)?;
    let parsed = doc.parse_entry(key)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&parsed)?);
        return Ok(());
    }

    let record = &parsed.record;
    print_step(1, 1, LOOKING_GLASS, &format!("{} ({})", record.key, record.type_name()));
    println!("  lines {}-{}", record.lines.start, record.lines.end);
    if let Some(particle) = record.particle_name() {
        println!("  particle: {particle}");
    }
    for emitter in &record.emitters {
        println!(
            "  [{}] {} {}",
            emitter.position,
            emitter.name.as_deref().unwrap_or("<unnamed>"),
            style(&emitter.type_name).dim()
        );
        for child in &emitter.child_particles {
            println!("      -> {} ({:?})", child.effect_key, child.provenance);
        }
    }
    for diagnostic in &parsed.diagnostics {
        println!("  {} line {}: {}", style("unparsed").yellow(), diagnostic.line, diagnostic.reason);
    }
    Ok(())
}
