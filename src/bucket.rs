//! Fixed-size fingerprint buckets

use crate::hash::Fingerprint;

/// Each bucket holds 4 fingerprints
pub const BUCKET_SIZE: usize = 4;

/// A bucket of fingerprint slots, 0 marks an empty slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Bucket {
    pub(crate) slots: [Fingerprint; BUCKET_SIZE],
}

impl Bucket {
    pub(crate) fn from_slots(slots: [Fingerprint; BUCKET_SIZE]) -> Bucket {
        Bucket { slots }
    }

    /// Place the fingerprint in the first free slot. False means the bucket was full
    pub(crate) fn insert(&mut self, fingerprint: Fingerprint) -> bool {
        for slot in self.slots.iter_mut() {
            if *slot == 0 {
                *slot = fingerprint;
                return true;
            }
        }
        false
    }

    /// Slot position of the first match
    pub(crate) fn find(&self, fingerprint: Fingerprint) -> Option<usize> {
        self.slots.iter().position(|&slot| slot == fingerprint)
    }

    /// Clear the first slot holding the fingerprint
    pub(crate) fn delete(&mut self, fingerprint: Fingerprint) -> bool {
        match self.find(fingerprint) {
            Some(slot) => {
                self.slots[slot] = 0;
                true
            }
            None => false,
        }
    }

    /// Swap an existing fingerprint for a new one (the cuckoo mechanism)
    pub(crate) fn swap(&mut self, slot: usize, fingerprint: Fingerprint) -> Fingerprint {
        std::mem::replace(&mut self.slots[slot], fingerprint)
    }

    pub(crate) fn reset(&mut self) {
        self.slots = [0; BUCKET_SIZE];
    }

    pub(crate) fn occupied(&self) -> usize {
        self.slots.iter().filter(|&&slot| slot != 0).count()
    }
}

/* -------------------- Unit Tests -------------------- */
