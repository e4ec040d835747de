//! # Cuckoo Filter
//!
//! This implementation is based on the paper _Cuckoo Filter: Practically Better Than Bloom_, by Fan et. al.
//!
//! We use a (2, 4) CF (2 possible buckets for each item, and 4 fingerprints in each bucket) with one byte per fingerprint. The bucket count is always a power of two so indices can be reduced with a mask instead of a modulo.
//!
//! Unlike a fixed-size CF, this one grows: when an eviction chain runs out of kicks the bucket table is doubled and the chain carries on in the larger table.

use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

use crate::bucket::{Bucket, BUCKET_SIZE};
use crate::hash::{self, BucketIndex, Fingerprint};
use crate::rng::Lcg;

type Input = [u8];

/// Kicks per eviction round before the table is expanded
pub const MAX_EVICTIONS: usize = 500;
/// Eviction rounds per insert; every round after the first starts with an expansion
pub const MAX_EXPANSION_ROUNDS: usize = 3;

/// A growable Cuckoo Filter backed by an optional file
///
/// ### Notes
///
/// - `count` tracks the number of occupied slots and is only used for reporting
/// - Mutation needs `&mut self`; share across threads behind a `Mutex`
#[derive(Debug)]
pub struct CuckooFilter {
    buckets: Vec<Bucket>,
    count: usize,
    bucket_pow: u32,
    path: PathBuf,
    gen: Lcg,
}

impl CuckooFilter {
    /// Create an empty in-memory filter sized for `capacity` items
    ///
    /// The bucket count is the next power of two that holds `capacity` fingerprints, with a minimum of one bucket.
    pub fn new(capacity: usize) -> CuckooFilter {
        let number_of_buckets = hash::next_pow2(capacity.div_ceil(BUCKET_SIZE) as u64) as usize;
        CuckooFilter {
            buckets: vec![Bucket::default(); number_of_buckets],
            count: 0,
            bucket_pow: number_of_buckets.trailing_zeros(),
            path: PathBuf::new(),
            gen: Lcg::default(),
        }
    }

    /// Load the filter stored at `path`, or start an empty one there
    ///
    /// Any load failure (missing file, unreadable file, malformed contents) falls back to a fresh filter of `capacity` items bound to `path`.
    pub fn open_or_create(capacity: usize, path: impl AsRef<Path>) -> CuckooFilter {
        let path = path.as_ref();
        match CuckooFilter::load(path) {
            Ok(cf) => cf,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "starting a fresh cuckoo filter");
                let mut cf = CuckooFilter::new(capacity);
                cf.path = path.to_path_buf();
                cf
            }
        }
    }

    /// Rebuild a filter from a decoded bucket table, recomputing derived state
    ///
    /// `buckets.len()` must already be a non-zero power of two.
    pub(crate) fn from_buckets(buckets: Vec<Bucket>, path: PathBuf) -> CuckooFilter {
        debug_assert!(buckets.len().is_power_of_two());
        let count = buckets.iter().map(Bucket::occupied).sum();
        CuckooFilter {
            bucket_pow: buckets.len().trailing_zeros(),
            buckets,
            count,
            path,
            gen: Lcg::default(),
        }
    }

    pub(crate) fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    /// Swap in another filter's table, keeping our path and generator
    pub(crate) fn replace_table(&mut self, other: CuckooFilter) {
        self.buckets = other.buckets;
        self.count = other.count;
        self.bucket_pow = other.bucket_pow;
    }

    /// Number of fingerprints currently stored
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Base-2 logarithm of the bucket count
    pub fn bucket_pow(&self) -> u32 {
        self.bucket_pow
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Total number of fingerprint slots
    pub fn capacity(&self) -> usize {
        self.buckets.len() * BUCKET_SIZE
    }

    /// Share of slots in use, between 0 and 1
    pub fn load_factor(&self) -> f64 {
        self.count as f64 / self.capacity() as f64
    }

    /// Approximately how many bytes is this CF using?
    ///
    /// Counts the allocated bucket storage, including spare vector capacity, plus the filter itself.
    pub fn estimate_size(&self) -> usize {
        self.buckets.capacity() * std::mem::size_of::<Bucket>() + std::mem::size_of::<Self>()
    }

    /// Where [`save`](CuckooFilter::save) writes to
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = path.into();
    }

    /// Check if item is in filter
    pub fn lookup(&self, item: &Input) -> bool {
        let (candidate_1, candidate_2, fingerprint) =
            hash::indices_and_fingerprint(item, self.bucket_pow);
        self.buckets[candidate_1].find(fingerprint).is_some()
            || self.buckets[candidate_2].find(fingerprint).is_some()
    }

    /// Add item to filter
    ///
    /// Returns false only when the eviction chain ran dry in every expansion round. Fingerprints moved by that failed chain stay where they were moved to.
    ///
    /// An insert that has to [`expand`](CuckooFilter::expand) the table can make items inserted before it unreachable; see there.
    pub fn insert(&mut self, item: &Input) -> bool {
        let (candidate_1, candidate_2, fingerprint) =
            hash::indices_and_fingerprint(item, self.bucket_pow);

        if self.try_insert_at_bucket(candidate_1, fingerprint)
            || self.try_insert_at_bucket(candidate_2, fingerprint)
        {
            return true;
        }

        // Both buckets are full, begin eviction from either one
        let start = if self.gen.intn(2) == 0 {
            candidate_1
        } else {
            candidate_2
        };
        self.reinsert(fingerprint, start)
    }

    /// Add item to filter unless it is already present
    pub fn insert_unique(&mut self, item: &Input) -> bool {
        if self.lookup(item) {
            return false;
        }
        self.insert(item)
    }

    /// Delete an item from the filter
    pub fn delete(&mut self, item: &Input) -> bool {
        let (candidate_1, candidate_2, fingerprint) =
            hash::indices_and_fingerprint(item, self.bucket_pow);
        self.try_delete_at_bucket(candidate_1, fingerprint)
            || self.try_delete_at_bucket(candidate_2, fingerprint)
    }

    /// Double the number of buckets
    ///
    /// Existing buckets keep their positions in the low half; the new high half starts empty.
    ///
    /// ### Caveat
    ///
    /// Stored fingerprints are not rehashed, since that would need the original keys. Index derivation now uses one more bit of each key's hash, so a key inserted before the expansion whose hash has that bit set is looked up in the high half and is no longer found (roughly half of them). Its fingerprint still occupies a slot and is still counted and encoded. Size the filter so expansion stays rare.
    pub fn expand(&mut self) {
        let old_len = self.buckets.len();
        self.buckets.resize(old_len * 2, Bucket::default());
        self.bucket_pow += 1;
        debug!(
            from = old_len,
            to = self.buckets.len(),
            count = self.count,
            "expanded cuckoo filter"
        );
    }

    /// Empty every bucket, keeping the current size and path
    pub fn reset(&mut self) {
        for bucket in self.buckets.iter_mut() {
            bucket.reset();
        }
        self.count = 0;
    }

    /// Internal method to try inserting a fingerprint into a bucket.
    ///
    /// True means success, false means the bucket was full
    fn try_insert_at_bucket(
        &mut self,
        bucket_index: BucketIndex,
        fingerprint: Fingerprint,
    ) -> bool {
        if self.buckets[bucket_index].insert(fingerprint) {
            self.count += 1;
            return true;
        }
        false
    }

    fn try_delete_at_bucket(
        &mut self,
        bucket_index: BucketIndex,
        fingerprint: Fingerprint,
    ) -> bool {
        if self.buckets[bucket_index].delete(fingerprint) {
            self.count -= 1;
            return true;
        }
        false
    }

    /// Kick fingerprints between their candidate buckets until one lands in a free slot
    ///
    /// The in-flight fingerprint and bucket carry over across expansions. Indices from the smaller table stay in range after doubling.
    fn reinsert(&mut self, mut fingerprint: Fingerprint, mut bucket_index: BucketIndex) -> bool {
        for round in 0..MAX_EXPANSION_ROUNDS {
            if round > 0 {
                self.expand();
            }
            for _ in 0..MAX_EVICTIONS {
                let slot = self.gen.intn(BUCKET_SIZE);
                fingerprint = self.buckets[bucket_index].swap(slot, fingerprint);

                // Look in the alternate location for the evicted fingerprint
                bucket_index = hash::alt_index(fingerprint, bucket_index, self.bucket_pow);
                if self.try_insert_at_bucket(bucket_index, fingerprint) {
                    return true;
                }
            }
            trace!(round, buckets = self.buckets.len(), "eviction round exhausted");
        }
        warn!(
            buckets = self.buckets.len(),
            count = self.count,
            "cuckoo filter insert failed after {} rounds",
            MAX_EXPANSION_ROUNDS
        );
        false
    }
}

/* -------------------- Unit Tests -------------------- */
