//! # Growable Cuckoo Filter
//!
//! A Cuckoo Filter is an efficient data structure for determining "set membership" (i.e. 'have I seen this thing before?'). It is similar to a Bloom Filter, but unlike a Bloom Filter, Cuckoo Filters support item deletion.
//!
//! This crate stores one byte fingerprints in buckets of four, doubles its bucket table when an insert cannot find room, and persists the table as a flat byte image that can be written to and read back from a file.
//!
//! Growth does not rehash: after the table doubles, items inserted before it may no longer be found (see [`CuckooFilter::expand`]). Size the filter for its expected load so that growth stays rare.
//!
//! ```no_run
//! use elastic_cuckoo::CuckooFilter;
//!
//! let mut cf = CuckooFilter::open_or_create(1_000_000, "seen.cf");
//! if cf.insert_unique(b"alice") {
//!     cf.save()?;
//! }
//! assert!(cf.lookup(b"alice"));
//! # Ok::<(), elastic_cuckoo::Error>(())
//! ```

mod bucket;
mod codec;
mod error;
mod filter;
mod hash;
mod rng;

pub use bucket::BUCKET_SIZE;
pub use error::{Error, Result};
pub use filter::CuckooFilter;
pub use filter::{MAX_EVICTIONS, MAX_EXPANSION_ROUNDS};
pub use hash::{
    alt_index, fingerprint, hash_key, indices_and_fingerprint, key_to_u64, next_pow2, u64_key,
    BucketIndex, Fingerprint, HASH_SEED,
};

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn filter_is_send_and_sync() {
        assert_send_sync::<CuckooFilter>();
        assert_send_sync::<Error>();
    }

    #[test]
    fn integer_keys_work_as_items() {
        let mut cf = CuckooFilter::new(64);
        assert!(cf.insert(&u64_key(7)));
        assert!(cf.lookup(&u64_key(7)));
        assert_eq!(key_to_u64(&u64_key(7)), Some(7));
    }
}
