//! Hashing and bucket index derivation
//!
//! Every key is hashed once with a seeded 64-bit hash. The low end of the digest feeds the fingerprint and the high 32 bits feed the primary bucket index. The secondary index is derived from the primary one and the fingerprint alone, which is what lets the eviction chain relocate a fingerprint without knowing the key it came from.

use std::sync::OnceLock;

use xxhash_rust::xxh3::xxh3_64_with_seed;

/// Seed shared by key hashing and the alternate-index table
pub const HASH_SEED: u64 = 1337;

pub type BucketIndex = usize;
pub type Fingerprint = u8;

/// `MASKS[p] == 2^p - 1` for every usable `bucket_pow`
const MASKS: [u64; 65] = build_masks();

const fn build_masks() -> [u64; 65] {
    let mut masks = [0u64; 65];
    let mut p = 0;
    while p < 64 {
        masks[p] = (1u64 << p) - 1;
        p += 1;
    }
    masks[64] = u64::MAX;
    masks
}

static ALT_HASH: OnceLock<[u64; 256]> = OnceLock::new();

/// Hash of every single-byte fingerprint, built on first use and read-only afterwards
fn alt_hash_table() -> &'static [u64; 256] {
    ALT_HASH.get_or_init(|| {
        let mut table = [0u64; 256];
        for (byte, slot) in table.iter_mut().enumerate() {
            *slot = hash_key(&[byte as u8]);
        }
        table
    })
}

/// Seeded 64-bit hash of an arbitrary key
#[inline]
pub fn hash_key(input: &[u8]) -> u64 {
    xxh3_64_with_seed(input, HASH_SEED)
}

/// Mask that keeps the low `bucket_pow` bits of an index
#[inline]
pub(crate) fn mask(bucket_pow: u32) -> u64 {
    MASKS[bucket_pow as usize]
}

/// Compute a 1 byte fingerprint from a hash digest
///
/// The result is always in `1..=255`; 0 is reserved for empty slots.
#[inline]
pub fn fingerprint(hash_value: u64) -> Fingerprint {
    (hash_value % 255 + 1) as Fingerprint
}

/// The other candidate bucket for `fingerprint` when it sits in `index`
///
/// Applying this twice with the same fingerprint and `bucket_pow` returns the starting index.
#[inline]
pub fn alt_index(fingerprint: Fingerprint, index: BucketIndex, bucket_pow: u32) -> BucketIndex {
    let mask = mask(bucket_pow);
    let hash = alt_hash_table()[fingerprint as usize] & mask;
    ((index as u64 & mask) ^ hash) as BucketIndex
}

/// Both candidate buckets and the fingerprint for a key
pub fn indices_and_fingerprint(
    input: &[u8],
    bucket_pow: u32,
) -> (BucketIndex, BucketIndex, Fingerprint) {
    let hash = hash_key(input);
    let fp = fingerprint(hash);
    // High half of the digest for the index, low end already spent on the fingerprint
    let i1 = ((hash >> 32) & mask(bucket_pow)) as BucketIndex;
    let i2 = alt_index(fp, i1, bucket_pow);
    (i1, i2, fp)
}

/// Smallest power of two that is `>= n`; 0 maps to 1
#[inline]
pub fn next_pow2(n: u64) -> u64 {
    n.max(1).next_power_of_two()
}

/// Encode an integer as an 8 byte big-endian key
pub fn u64_key(n: u64) -> [u8; 8] {
    n.to_be_bytes()
}

/// Decode a key produced by [`u64_key`]; any other length yields `None`
pub fn key_to_u64(key: &[u8]) -> Option<u64> {
    key.try_into().ok().map(u64::from_be_bytes)
}

/* -------------------- Unit Tests -------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn basic_hash_test() {
        let a = hash_key("cat".as_bytes());
        let b = hash_key("dog".as_bytes());
        assert_ne!(a, b);
        assert_eq!(a, hash_key(b"cat"));
    }

    #[test]
    fn fingerprint_is_never_zero() {
        // Multiples of 255 are the only digests that would land on 0 without the +1
        for hash in [0u64, 255, 510, u64::MAX, u64::MAX - 254] {
            assert_ne!(fingerprint(hash), 0);
        }
        assert_eq!(fingerprint(254), 255);
        assert_eq!(fingerprint(255), 1);
    }

    #[test]
    fn masks_table() {
        assert_eq!(mask(0), 0);
        assert_eq!(mask(1), 1);
        assert_eq!(mask(10), 1023);
        assert_eq!(mask(63), u64::MAX >> 1);
        assert_eq!(mask(64), u64::MAX);
    }

    #[test]
    fn indices_in_range() {
        for pow in [0u32, 1, 3, 12] {
            for i in 0u32..500 {
                let (i1, i2, fp) = indices_and_fingerprint(&i.to_le_bytes(), pow);
                assert!(i1 < 1 << pow);
                assert!(i2 < 1 << pow);
                assert_ne!(fp, 0);
            }
        }
    }

    #[test]
    fn single_bucket_indices_collapse() {
        let (i1, i2, _) = indices_and_fingerprint(b"anything", 0);
        assert_eq!((i1, i2), (0, 0));
    }

    #[test]
    fn next_pow2_rounding() {
        assert_eq!(next_pow2(0), 1);
        assert_eq!(next_pow2(1), 1);
        assert_eq!(next_pow2(2), 2);
        assert_eq!(next_pow2(3), 4);
        assert_eq!(next_pow2(1000), 1024);
        assert_eq!(next_pow2(1 << 40), 1 << 40);
    }

    #[test]
    fn integer_keys() {
        assert_eq!(u64_key(1), [0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(key_to_u64(&u64_key(0xdead_beef)), Some(0xdead_beef));
        assert_eq!(key_to_u64(&[1, 2, 3]), None);
    }

    proptest! {
        #[test]
        fn alt_index_is_an_involution(fp in 1u8..=255, index in any::<u32>(), pow in 0u32..=32) {
            let index = index as usize & mask(pow) as usize;
            let alt = alt_index(fp, index, pow);
            prop_assert!(alt <= mask(pow) as usize);
            prop_assert_eq!(alt_index(fp, alt, pow), index);
        }
    }
}
