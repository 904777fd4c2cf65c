//! Utility functions

pub mod hash;
pub mod path;

pub use hash::{fnv1a_lower, parse_hash_literal};
pub use path::{last_segment, normalize_asset_path, normalize_path, relative_path};
