//! Error types for `VfxBin`

use std::path::PathBuf;

use thiserror::Error;

/// The error type for `VfxBin` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ==================== Parse Errors ====================
    /// Brace nesting inside a record does not balance.
    #[error("unbalanced braces at byte {offset} (line {line}): {reason}")]
    UnbalancedBraces {
        /// Byte offset where the imbalance was detected.
        offset: usize,
        /// 1-based line of `offset`.
        line: usize,
        /// What went wrong (unclosed, stray closing brace, unterminated string).
        reason: String,
    },

    /// The record header (`<key> = <Type> {`) could not be read.
    #[error("invalid record header at byte {offset}: {reason}")]
    InvalidHeader {
        /// Byte offset of the header.
        offset: usize,
        /// Description of what is invalid.
        reason: String,
    },

    /// A key literal is neither a quoted name nor a `0x` hash.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// A matrix literal does not contain exactly 16 numbers.
    #[error("invalid matrix: {message}")]
    InvalidMatrix {
        /// Description of what is invalid.
        message: String,
    },

    // ==================== Lookup Errors ====================
    /// No top-level entry exists with this key.
    #[error("entry not found: {key}")]
    EntryNotFound {
        /// The key as written.
        key: String,
    },

    /// The entry exists but is not a `VfxSystemDefinitionData`.
    #[error("{key} is a {type_name}, not a VFX system")]
    NotAVfxSystem {
        /// The key as written.
        key: String,
        /// The actual record type.
        type_name: String,
    },

    /// The document has no `SkinCharacterDataProperties` entry.
    #[error("document has no SkinCharacterDataProperties entry")]
    MissingSkinData,

    /// A human-readable name matches no system.
    #[error("no system matches '{name}'")]
    UnresolvedReference {
        /// The name that was looked up.
        name: String,
    },

    /// A human-readable name matches more than one system.
    #[error("ambiguous reference '{name}': matches {}", candidates.join(", "))]
    AmbiguousReference {
        /// The name that was looked up.
        name: String,
        /// Every key it could refer to.
        candidates: Vec<String>,
    },

    // ==================== Mutation Errors ====================
    /// The requested key is already used by another entry.
    #[error("key already exists: {key}")]
    KeyCollision {
        /// The colliding key as written.
        key: String,
    },

    /// The bone is not on the idle-particle allow-list.
    #[error("invalid bone name: {bone}")]
    InvalidBone {
        /// The rejected bone name.
        bone: String,
    },

    /// The system cannot be used as a child-particle source.
    #[error("{key} has no particleName and cannot be used as a particle source")]
    IneligibleParticleSource {
        /// The key as written.
        key: String,
    },

    /// An emitter with this name already exists in the system.
    #[error("emitter '{emitter}' already exists in {system}")]
    DuplicateEmitter {
        /// The system key as written.
        system: String,
        /// The emitter name.
        emitter: String,
    },

    /// A text edit batch is out of bounds or overlapping.
    #[error("invalid edit: {message}")]
    InvalidEdit {
        /// Description of what is invalid.
        message: String,
    },

    // ==================== Asset Errors ====================
    /// An asset file could not be found under any search root.
    #[error("asset not found: {path}")]
    AssetNotFound {
        /// The referenced path.
        path: String,
    },

    /// Invalid file path.
    #[error("invalid path: {0}")]
    InvalidPath(PathBuf),

    /// Directory traversal error.
    #[error("directory walk error: {0}")]
    WalkDirError(String),

    // ==================== Config Errors ====================
    /// The configuration file is not valid TOML for [`crate::config::EngineConfig`].
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    /// The configuration could not be serialized.
    #[error("config serialization error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        Error::WalkDirError(err.to_string())
    }
}

/// A specialized Result type for `VfxBin` operations.
pub type Result<T> = std::result::Result<T, Error>;
