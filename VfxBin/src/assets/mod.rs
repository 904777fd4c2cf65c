//! Asset references - finding, locating and relocating files a record points at
//!
//! This module provides:
//! - Detection of path-like strings in records, classified by extension
//! - Resolution of references against search roots (case-insensitive)
//! - Caching, canonical relocation paths and path rewriting
//! - Pre-upload validation that reports every failing asset at once

pub mod canonical;
pub mod detect;
pub mod resolve;
pub mod rewrite;
pub mod types;
pub mod validate;

pub use canonical::generate_canonical_path;
pub use detect::{detect_assets, is_asset_path};
pub use resolve::{check_asset_exists, copy_asset, find_assets_in_root, resolve_asset_path};
pub use rewrite::update_asset_paths;
pub use types::{
    AssetKind, AssetLimits, AssetReference, DEFAULT_MAX_UPLOAD_BYTES, FoundAsset, UploadFailure,
    UploadFailureReason,
};
pub use validate::validate_for_upload;
