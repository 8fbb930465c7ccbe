// Seeded tie-break hashing.
//
// FNV-1a over the (seed, player, slot) tuple, finished with a murmur3 mix so
// nearby inputs spread across the whole 32-bit range. Stable across runs,
// platforms and releases.

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;
const FIELD_SEPARATOR: u8 = 0x1f;

fn fnv1a(mut hash: u32, bytes: &[u8]) -> u32 {
    for &b in bytes {
        hash ^= u32::from(b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn fmix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

/// 32-bit hash of `(seed, player_id, slot)`.
pub fn tiebreak_hash(seed: &str, player_id: &str, slot: u32) -> u32 {
    let mut h = fnv1a(FNV_OFFSET, seed.as_bytes());
    h = fnv1a(h, &[FIELD_SEPARATOR]);
    h = fnv1a(h, player_id.as_bytes());
    h = fnv1a(h, &[FIELD_SEPARATOR]);
    h = fnv1a(h, &slot.to_le_bytes());
    fmix32(h)
}

/// The tie-break hash mapped onto `[0, 1]`.
pub fn unit_jitter(seed: &str, player_id: &str, slot: u32) -> f64 {
    f64::from(tiebreak_hash(seed, player_id, slot)) / f64::from(u32::MAX)
}
