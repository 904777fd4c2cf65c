//! Asset reference types

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default upload size limit (25 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 25 * 1024 * 1024;

/// File type of an asset, from its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    /// `.tex`, `.dds`, `.png`
    Texture,
    /// `.skn`
    SkinnedMesh,
    /// `.scb`, `.sco`
    StaticMesh,
    /// `.skl`
    Skeleton,
    /// `.anm`
    Animation,
    /// `.bnk`, `.wpk`
    Audio,
    /// `.bin`
    Bin,
}

impl AssetKind {
    /// Classify a path by its extension (case-insensitive)
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let name = crate::utils::last_segment(path);
        let (_, ext) = name.rsplit_once('.')?;
        Self::from_extension(ext)
    }

    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        let kind = match ext.to_ascii_lowercase().as_str() {
            "tex" | "dds" | "png" => Self::Texture,
            "skn" => Self::SkinnedMesh,
            "scb" | "sco" => Self::StaticMesh,
            "skl" => Self::Skeleton,
            "anm" => Self::Animation,
            "bnk" | "wpk" => Self::Audio,
            "bin" => Self::Bin,
            _ => return None,
        };
        Some(kind)
    }

    /// Get a human-readable name for this kind
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Texture => "texture",
            Self::SkinnedMesh => "skinned mesh",
            Self::StaticMesh => "static mesh",
            Self::Skeleton => "skeleton",
            Self::Animation => "animation",
            Self::Audio => "audio",
            Self::Bin => "bin",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A path-like string found inside a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetReference {
    /// Dotted field path inside the record (`complexEmitterDefinitionData[0].texture`)
    pub field: String,
    /// The path as written
    pub path: String,
    /// `None` when the extension is not a known asset type
    pub kind: Option<AssetKind>,
}

/// An asset file found on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoundAsset {
    pub path: PathBuf,
    /// Forward-slash path relative to the searched root
    pub relative: String,
    pub kind: AssetKind,
}

/// Limits checked by [`validate_for_upload`](super::validate_for_upload)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetLimits {
    pub max_bytes: u64,
}

impl Default for AssetLimits {
    fn default() -> Self {
        Self { max_bytes: DEFAULT_MAX_UPLOAD_BYTES }
    }
}

/// Why an asset cannot be uploaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadFailureReason {
    Missing,
    UnsupportedType,
    Empty,
    TooLarge { size: u64, limit: u64 },
}

impl fmt::Display for UploadFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("not found under any search root"),
            Self::UnsupportedType => f.write_str("unsupported file type"),
            Self::Empty => f.write_str("file is empty"),
            Self::TooLarge { size, limit } => write!(f, "{size} bytes exceeds the {limit} byte limit"),
        }
    }
}

/// One asset that failed upload validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadFailure {
    pub path: String,
    pub reason: UploadFailureReason,
}

impl fmt::Display for UploadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}
