use crate::db;

/// Stable token for the broadcast room of an unordered user pair. Symmetric
/// and deterministic; the digest keeps distinct pairs from colliding.
pub fn room_id(a: &str, b: &str) -> String {
    let (pair_lo, pair_hi) = db::pair_key(a, b);
    blake3::hash(format!("{pair_lo}${pair_hi}").as_bytes())
        .to_hex()
        .to_string()
}
