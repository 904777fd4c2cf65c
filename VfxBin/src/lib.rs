//! # VfxBin
//!
//! A pure-Rust engine for indexing, parsing and editing League of Legends
//! VFX definitions in ritobin text (`.py` bin dumps).
//!
//! ## What It Does
//!
//! - **Indexing** - one linear scan finds every top-level entry, its line span and emitter names
//! - **Parsing** - selected entries parse into a lossless syntax tree
//! - **Editing** - insert, rename, clean, child/idle/persistent bindings, transforms
//! - **Assets** - detect, resolve, validate and relocate referenced files
//!
//! Untouched text always survives an edit byte-for-byte.
//!
//! ## Quick Start
//!
//! ### Indexing a File
//!
//! ```
//! use vfxbin::index::index;
//!
//! let text = r#""Characters/Ahri/Skins/Skin0/Particles/Orb" = VfxSystemDefinitionData {
//!     particleName: string = "Ahri_Orb"
//! }"#;
//! let systems = index(text);
//! let orb = systems.values().next().unwrap();
//! assert_eq!(orb.display_name, "Orb");
//! assert_eq!(orb.particle_name.as_deref(), Some("Ahri_Orb"));
//! ```
//!
//! ### Editing a Document
//!
//! ```
//! use vfxbin::prelude::*;
//!
//! let text = "entries: map[hash,embed] = {\n    \"Fx/Orb\" = VfxSystemDefinitionData {}\n}\n";
//! let mut doc = SourceDocument::new(text);
//! doc.rename_system(&EntryKey::name("Fx/Orb"), &EntryKey::name("Fx/Sphere"))?;
//! assert!(doc.text().contains("\"Fx/Sphere\" = VfxSystemDefinitionData {}"));
//! # Ok::<(), vfxbin::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `vfxbin` command-line binary

pub mod assets;
pub mod config;
pub mod document;
pub mod editor;
pub mod error;
pub mod formats;
pub mod index;
pub mod utils;

// Re-exports for convenience
pub use document::SourceDocument;
pub use error::{Error, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{Error, Result};

    pub use crate::document::{ParseAllResult, SourceDocument, TextEdit};
    pub use crate::index::{EntryIndex, IndexEntry, index, scan_entries};

    pub use crate::formats::vfx::{
        ChildParticleBinding, EmitterRecord, EntryKey, FieldType, Matrix4x4, ParsedRecord, Provenance,
        Record, SystemRecord, Value, format_matrix, parse_matrix, parse_record, write_system,
    };

    pub use crate::editor::{
        CleanReport, CombineReport, IdleParticleBinding, InsertOutcome, PersistentEffectEntry, RenameReport,
        ResourceResolverEntry, SeparateReport, SplitEmitter, UpsertOutcome, combine_linked, separate_vfx,
    };

    pub use crate::assets::{
        AssetKind, AssetLimits, AssetReference, UploadFailure, detect_assets, generate_canonical_path,
        resolve_asset_path, validate_for_upload,
    };

    pub use crate::config::EngineConfig;
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;
