use clap::Subcommand;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::document::SourceDocument;
use crate::formats::vfx::EntryKey;

pub mod assets;
pub mod definitions;
pub mod edit;
pub mod execute;
pub mod index;

use definitions::{AssetCommands, IdleCommands};

#[derive(Subcommand)]
pub enum Commands {
    /// List the VFX systems of one or more files
    Index {
        /// Ritobin text files or directories to scan for `.py` dumps
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Include every entry type, not only VFX systems
        #[arg(short, long)]
        all: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Suppress progress bar
        #[arg(short, long)]
        quiet: bool,
    },

    /// Parse one entry and print its emitters and child bindings
    Show {
        file: PathBuf,

        /// Entry key: a path, "quoted path" or 0x hash
        key: EntryKey,

        /// Print the parsed record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rename a VFX system and every reference to it
    Rename {
        file: PathBuf,
        old: EntryKey,
        new: EntryKey,

        /// Write here instead of over the input
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Report without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Remove malformed fields and orphaned child emitters
    Clean {
        file: PathBuf,

        /// Only clean this system (default: all systems)
        key: Option<EntryKey>,

        /// Write here instead of over the input
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Report without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Remove VFX systems that nothing references
    CleanUnused {
        file: PathBuf,

        /// Write here instead of over the input
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Report without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Copy systems from another file, renaming on collision
    Import {
        /// File to copy from
        source: PathBuf,

        /// File to copy into
        target: PathBuf,

        /// Keys to import (default: every VFX system in the source)
        #[arg(short, long = "key")]
        keys: Vec<EntryKey>,

        /// Write here instead of over the target
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Resolve a human-readable effect name through the ResourceResolver
    Resolve { file: PathBuf, name: String },

    /// Spawn another system from a new child emitter
    Child {
        file: PathBuf,

        /// System that gets the emitter
        system: EntryKey,

        /// Attach point, used in the emitter name
        attach: String,

        /// Effect to spawn (resolver name or key)
        particle: String,

        /// Write here instead of over the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Play an effect while an owner condition holds
    Persistent {
        file: PathBuf,

        /// Condition expression, e.g. `IsAnimationPlaying { animationName: hash = "Idle1" }`
        condition: String,

        /// Effect key to play
        effect: EntryKey,

        /// Owner entry (default: the skin data entry)
        #[arg(long)]
        owner: Option<EntryKey>,

        /// Write here instead of over the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Set a system's transform matrix
    Transform {
        file: PathBuf,
        system: EntryKey,

        /// Translation as x,y,z
        #[arg(long, value_delimiter = ',', num_args = 3, conflicts_with = "matrix")]
        translate: Option<Vec<f64>>,

        /// All 16 values, row-major, comma separated
        #[arg(long, value_delimiter = ',', num_args = 16)]
        matrix: Option<Vec<f64>>,

        /// Write here instead of over the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Move every emitter into a wrapper system of its own
    Split {
        file: PathBuf,

        /// Only split this system (default: all systems)
        key: Option<EntryKey>,

        /// Write here instead of over the input
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Report without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Move the skin's VFX systems into a linked `data/<name>_vfx.py`
    Separate { file: PathBuf },

    /// Merge linked files back into the main file and delete them
    Combine { file: PathBuf },

    /// Idle particle commands
    Idle {
        #[command(subcommand)]
        command: IdleCommands,
    },

    /// Asset reference commands
    Assets {
        #[command(subcommand)]
        command: AssetCommands,
    },
}

/// Read a ritobin text file
pub(crate) fn read_document(path: &Path) -> anyhow::Result<SourceDocument> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(SourceDocument::new(text))
}

/// Write a document to `output`, or back over `input`
pub(crate) fn write_document(doc: &SourceDocument, input: &Path, output: Option<&Path>) -> anyhow::Result<PathBuf> {
    let path = output.unwrap_or(input).to_path_buf();
    fs::write(&path, doc.text()).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}
