//! CLI commands for asset references

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use console::style;

use crate::assets::{
    AssetLimits, AssetReference, copy_asset, find_assets_in_root, generate_canonical_path,
    resolve_asset_path, validate_for_upload,
};
use crate::cli::progress::{DISK, GEAR, LOOKING_GLASS, print_done, print_step, simple_spinner};
use crate::config::EngineConfig;
use crate::formats::vfx::EntryKey;

use super::{read_document, write_document};

/// Command-line roots first, then configured ones
fn search_roots(extra: &[PathBuf], config: &EngineConfig) -> Vec<PathBuf> {
    let mut roots = extra.to_vec();
    for root in &config.assets.search_roots {
        if !roots.contains(root) {
            roots.push(root.clone());
        }
    }
    roots
}

pub fn list(file: &Path, system: &EntryKey, json: bool) -> anyhow::Result<()> {
    let doc = read_document(file)?;
    let refs = doc.detect_assets_in_system(system)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&refs)?);
        return Ok(());
    }
    for reference in &refs {
        let kind = reference.kind.map_or_else(|| "unknown".to_string(), |k| k.to_string());
        println!("{:<14} {}  {}", kind, reference.path, style(&reference.field).dim());
    }
    println!("{} asset references", refs.len());
    Ok(())
}

pub fn validate(
    file: &Path,
    system: Option<&EntryKey>,
    roots: &[PathBuf],
    max_bytes: Option<u64>,
    config: &EngineConfig,
) -> anyhow::Result<()> {
    let start = Instant::now();
    let doc = read_document(file)?;
    let roots = search_roots(roots, config);
    if roots.is_empty() {
        anyhow::bail!("no search roots; pass --root or set assets.search_roots in the config");
    }
    let limits = max_bytes.map_or_else(|| config.assets.limits(), |max_bytes| AssetLimits { max_bytes });

    print_step(1, 2, LOOKING_GLASS, "Collecting asset references...");
    let keys: Vec<EntryKey> = match system {
        Some(key) => vec![key.clone()],
        None => doc.systems().map(|e| e.key.clone()).collect(),
    };
    let mut refs: Vec<AssetReference> = Vec::new();
    for key in &keys {
        refs.extend(doc.detect_assets_in_system(key)?);
    }

    print_step(2, 2, GEAR, &format!("Checking {} references...", refs.len()));
    let failures = validate_for_upload(&refs, &roots, &limits);
    for failure in &failures {
        println!("  {} {failure}", style("✗").red());
    }

    if failures.is_empty() {
        println!("  all assets ok");
        print_done(start.elapsed());
        Ok(())
    } else {
        anyhow::bail!("{} assets failed validation", failures.len())
    }
}

pub fn find(root: &Path, quiet: bool) -> anyhow::Result<()> {
    let pb = (!quiet).then(|| simple_spinner(&format!("Scanning {}...", root.display())));
    let found = find_assets_in_root(root)?;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    for asset in &found {
        println!("{:<14} {}", asset.kind.to_string(), asset.relative);
    }
    println!("{} assets", found.len());
    Ok(())
}

pub fn relocate(
    file: &Path,
    system: &EntryKey,
    namespace: &[String],
    roots: &[PathBuf],
    copy: bool,
    output: Option<&Path>,
    config: &EngineConfig,
) -> anyhow::Result<()> {
    let start = Instant::now();
    let mut doc = read_document(file)?;
    let namespace: Vec<&str> = namespace.iter().map(String::as_str).collect();
    let roots = search_roots(roots, config);

    print_step(1, 3, LOOKING_GLASS, "Collecting asset references...");
    let refs = doc.detect_assets_in_system(system)?;
    let mut mapping: HashMap<String, String> = HashMap::new();
    for reference in refs.iter().filter(|r| r.kind.is_some()) {
        let canonical = generate_canonical_path(&namespace, &reference.path);
        println!("  {} -> {}", reference.path, canonical);
        mapping.insert(reference.path.clone(), canonical);
    }

    if copy {
        let cache = config
            .assets
            .cache_dir()
            .ok_or_else(|| anyhow::anyhow!("no cache directory; set assets.cache_dir in the config"))?;
        print_step(2, 3, DISK, &format!("Caching assets in {}...", cache.display()));
        for path in mapping.keys() {
            match resolve_asset_path(path, &roots) {
                Some(found) => {
                    copy_asset(&found, &cache)?;
                }
                None => println!("  {} {path} not found", style("skipped").yellow()),
            }
        }
    }

    print_step(3, 3, GEAR, "Rewriting paths...");
    let changed = doc.update_asset_paths_in_system(system, &mapping)?;
    println!("  {changed} values rewritten");
    if changed > 0 {
        let path = write_document(&doc, file, output)?;
        println!("  wrote {}", path.display());
    }
    print_done(start.elapsed());
    Ok(())
}
