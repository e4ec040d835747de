//! Flat binary encoding of the bucket table and file persistence
//!
//! The format is headerless: bucket-major, slot-minor, one byte per slot, 0 for an empty slot. The bucket count is implied by the length, so a decoder has to insist on a power of two itself.
//!
//! Fingerprints in the image come from seeded xxh3 ([`HASH_SEED`](crate::HASH_SEED)). Images written by a filter that fingerprints keys with any other hash still decode, but lookups against them are meaningless.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::bucket::{Bucket, BUCKET_SIZE};
use crate::error::{Error, Result};
use crate::filter::CuckooFilter;

impl CuckooFilter {
    /// Serialize every bucket's slots contiguously, `bucket_count * 4` bytes in total
    pub fn encode(&self) -> Vec<u8> {
        self.buckets().iter().flat_map(|bucket| bucket.slots).collect()
    }

    /// Rebuild a filter from [`encode`](CuckooFilter::encode)d bytes
    ///
    /// The count is recomputed from the non-zero slots. The result has no path.
    pub fn decode(bytes: &[u8]) -> Result<CuckooFilter> {
        decode_with_path(bytes, PathBuf::new())
    }

    /// Read and decode the filter stored at `path`, binding it to that path
    pub fn load(path: impl AsRef<Path>) -> Result<CuckooFilter> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        debug!(path = %path.display(), len = bytes.len(), "loaded cuckoo filter");
        decode_with_path(&bytes, path.to_path_buf())
    }

    /// Re-read the table from this filter's path, replacing the in-memory one
    ///
    /// The filter is left untouched on error.
    pub fn reload(&mut self) -> Result<()> {
        let loaded = CuckooFilter::load(self.path())?;
        self.replace_table(loaded);
        Ok(())
    }

    /// Write the encoded table to this filter's path
    pub fn save(&self) -> Result<()> {
        self.save_to(self.path())
    }

    /// Write the encoded table to `path`, replacing the contents of any existing file
    ///
    /// The bytes go to a temporary file next to the target which is then renamed over it, so readers never observe a partial table. A symlink at `path` is followed and the target keeps its permissions.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let (target, permissions) = match std::fs::canonicalize(path) {
            Ok(target) => {
                let permissions = std::fs::metadata(&target)?.permissions();
                (target, Some(permissions))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => (path.to_path_buf(), None),
            Err(err) => return Err(err.into()),
        };
        let dir = match target.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let bytes = self.encode();
        let mut tmp = tempfile::Builder::new()
            .prefix(".cuckoo_")
            .tempfile_in(dir)?;
        tmp.write_all(&bytes)?;
        if let Some(permissions) = permissions {
            tmp.as_file().set_permissions(permissions)?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&target)?;
        debug!(path = %path.display(), len = bytes.len(), "saved cuckoo filter");
        Ok(())
    }
}

fn decode_with_path(bytes: &[u8], path: PathBuf) -> Result<CuckooFilter> {
    if bytes.len() % BUCKET_SIZE != 0 {
        return Err(Error::Format { len: bytes.len() });
    }
    let number_of_buckets = bytes.len() / BUCKET_SIZE;
    if !number_of_buckets.is_power_of_two() {
        return Err(Error::NotPowerOfTwo {
            buckets: number_of_buckets,
        });
    }
    let buckets = bytes
        .chunks_exact(BUCKET_SIZE)
        .map(|chunk| {
            let mut slots = [0u8; BUCKET_SIZE];
            slots.copy_from_slice(chunk);
            Bucket::from_slots(slots)
        })
        .collect();
    Ok(CuckooFilter::from_buckets(buckets, path))
}

/* -------------------- Unit Tests -------------------- */
