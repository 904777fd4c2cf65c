//! Subcommand enum definitions for CLI

use clap::Subcommand;
use std::path::PathBuf;

use crate::formats::vfx::EntryKey;

/// Idle particle commands
#[derive(Subcommand)]
pub enum IdleCommands {
    /// List idle effects and their bones
    List { file: PathBuf },

    /// Bind an effect to a bone
    Add {
        file: PathBuf,

        /// Bone name (see `vfxbin idle bones`)
        bone: String,

        /// Effect to play (resolver name or key)
        particle: String,

        /// Write here instead of over the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Remove every idle binding of a system
    Remove {
        file: PathBuf,
        system: EntryKey,

        /// Write here instead of over the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the accepted bone names
    Bones,
}

/// Asset reference commands
#[derive(Subcommand)]
pub enum AssetCommands {
    /// List asset paths referenced by a system
    List {
        file: PathBuf,
        system: EntryKey,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Check referenced assets exist and fit the upload limit
    Validate {
        file: PathBuf,

        /// Only check this system (default: all systems)
        system: Option<EntryKey>,

        /// Search root (repeatable; adds to the configured roots)
        #[arg(short, long = "root")]
        roots: Vec<PathBuf>,

        /// Size limit in bytes (default from config)
        #[arg(long)]
        max_bytes: Option<u64>,
    },

    /// List asset files under a directory
    Find {
        root: PathBuf,

        /// Suppress progress spinner
        #[arg(short, long)]
        quiet: bool,
    },

    /// Move a system's assets under canonical namespaced paths
    Relocate {
        file: PathBuf,
        system: EntryKey,

        /// Namespace segments, e.g. `-n MyMod -n Ahri`
        #[arg(short, long = "namespace", required = true)]
        namespace: Vec<String>,

        /// Search root (repeatable; adds to the configured roots)
        #[arg(short, long = "root")]
        roots: Vec<PathBuf>,

        /// Copy resolved files into the cache dir under their new names
        #[arg(long)]
        copy: bool,

        /// Write here instead of over the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
