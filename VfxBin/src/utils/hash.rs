//! Hashing utilities

/// FNV-1a over the lowercased bytes of `s` (used for bin entry and link hashes)
pub fn fnv1a_lower(s: &str) -> u32 {
    let mut hash: u32 = 0x811c9dc5;
    for byte in s.bytes() {
        hash ^= byte.to_ascii_lowercase() as u32;
        hash = hash.wrapping_mul(0x01000193);
    }
    hash
}

/// Parse a `0x`-prefixed hex literal into a 32-bit hash
pub fn parse_hash_literal(s: &str) -> Option<u32> {
    let hex = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))?;
    if hex.is_empty() || hex.len() > 8 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}
