//! Command execution implementations

use super::Commands;
use super::definitions::{AssetCommands, IdleCommands};
use super::{assets, edit, index};
use crate::config::EngineConfig;

impl Commands {
    /// Execute the selected command.
    ///
    /// # Errors
    /// Returns an error if the underlying command fails.
    pub fn execute(&self, config: &EngineConfig) -> anyhow::Result<()> {
        match self {
            Commands::Index { files, all, json, quiet } => index::index(files, *all, *json, *quiet),
            Commands::Show { file, key, json } => index::show(file, key, *json),
            Commands::Rename { file, old, new, output, dry_run } => {
                edit::rename(file, old, new, output.as_deref(), *dry_run)
            }
            Commands::Clean { file, key, output, dry_run } => {
                edit::clean(file, key.as_ref(), output.as_deref(), *dry_run)
            }
            Commands::CleanUnused { file, output, dry_run } => {
                edit::clean_unused(file, output.as_deref(), *dry_run)
            }
            Commands::Import { source, target, keys, output } => {
                edit::import(source, target, keys, output.as_deref())
            }
            Commands::Resolve { file, name } => edit::resolve(file, name),
            Commands::Child { file, system, attach, particle, output } => {
                edit::child(file, system, attach, particle, output.as_deref())
            }
            Commands::Persistent { file, condition, effect, owner, output } => {
                edit::persistent(file, condition, effect, owner.as_ref(), output.as_deref())
            }
            Commands::Transform { file, system, translate, matrix, output } => edit::transform(
                file,
                system,
                translate.as_deref(),
                matrix.as_deref(),
                output.as_deref(),
            ),
            Commands::Split { file, key, output, dry_run } => {
                edit::split(file, key.as_ref(), output.as_deref(), *dry_run)
            }
            Commands::Separate { file } => edit::separate(file),
            Commands::Combine { file } => edit::combine(file),
            Commands::Idle { command } => command.execute(),
            Commands::Assets { command } => command.execute(config),
        }
    }
}

impl IdleCommands {
    /// Execute the selected idle particle command.
    ///
    /// # Errors
    /// Returns an error if the underlying edit fails.
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            IdleCommands::List { file } => edit::idle_list(file),
            IdleCommands::Add { file, bone, particle, output } => {
                edit::idle_add(file, bone, particle, output.as_deref())
            }
            IdleCommands::Remove { file, system, output } => {
                edit::idle_remove(file, system, output.as_deref())
            }
            IdleCommands::Bones => {
                edit::idle_bones();
                Ok(())
            }
        }
    }
}

impl AssetCommands {
    /// Execute the selected asset command.
    ///
    /// # Errors
    /// Returns an error if the document cannot be read or an asset operation fails.
    pub fn execute(&self, config: &EngineConfig) -> anyhow::Result<()> {
        match self {
            AssetCommands::List { file, system, json } => assets::list(file, system, *json),
            AssetCommands::Validate { file, system, roots, max_bytes } => {
                assets::validate(file, system.as_ref(), roots, *max_bytes, config)
            }
            AssetCommands::Find { root, quiet } => assets::find(root, *quiet),
            AssetCommands::Relocate { file, system, namespace, roots, copy, output } => {
                assets::relocate(file, system, namespace, roots, *copy, output.as_deref(), config)
            }
        }
    }
}
