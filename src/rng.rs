//! Lock-free linear congruential generator
//!
//! Only used to pick eviction slots and to break ties between the two candidate buckets, so statistical quality matters far less than never losing a state transition when several threads draw at once.

use std::sync::atomic::{AtomicU64, Ordering};

const MULTIPLIER: u64 = 2862933555777941757;
const INCREMENT: u64 = 3037000493;

/// Linear congruential generator with an atomically advanced state
#[derive(Debug, Default)]
pub(crate) struct Lcg {
    state: AtomicU64,
}

#[inline]
fn step(state: u64) -> u64 {
    MULTIPLIER.wrapping_mul(state).wrapping_add(INCREMENT)
}

impl Lcg {
    #[cfg(test)]
    pub(crate) fn with_state(state: u64) -> Lcg {
        Lcg {
            state: AtomicU64::new(state),
        }
    }

    /// Uniform-ish draw in `[0, n)`. `n` must be non-zero
    ///
    /// The low bits of a power-of-two modulus LCG cycle with a tiny period, so the draw comes from the high half of the state.
    pub(crate) fn intn(&self, n: usize) -> usize {
        debug_assert!(n > 0);
        let mut current = self.state.load(Ordering::Relaxed);
        loop {
            let next = step(current);
            // Only publish if nobody advanced the state in between
            match self.state.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return ((next >> 32) % n as u64) as usize,
                Err(observed) => current = observed,
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> u64 {
        self.state.load(Ordering::Acquire)
    }
}

/* -------------------- Unit Tests -------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn draws_stay_in_range() {
        let lcg = Lcg::default();
        for n in [1usize, 2, 4, 7, 1000] {
            for _ in 0..1000 {
                assert!(lcg.intn(n) < n);
            }
        }
    }

    #[test]
    fn sequence_is_deterministic() {
        let a = Lcg::with_state(99);
        let b = Lcg::with_state(99);
        let xs: Vec<usize> = (0..32).map(|_| a.intn(1 << 20)).collect();
        let ys: Vec<usize> = (0..32).map(|_| b.intn(1 << 20)).collect();
        assert_eq!(xs, ys);
        assert_eq!(a.state(), b.state());
    }

    #[test]
    fn both_halves_of_a_coin_flip_show_up() {
        let lcg = Lcg::default();
        let heads = (0..1000).filter(|_| lcg.intn(2) == 0).count();
        assert!(heads > 100 && heads < 900, "heads = {heads}");
    }

    // Every draw from every thread must advance the shared state exactly once
    #[test]
    fn concurrent_draws_lose_no_updates() {
        const THREADS: usize = 8;
        const DRAWS: usize = 5_000;
        let lcg = Arc::new(Lcg::default());
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let lcg = Arc::clone(&lcg);
                thread::spawn(move || {
                    for _ in 0..DRAWS {
                        assert!(lcg.intn(4) < 4);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let mut expected = 0u64;
        for _ in 0..THREADS * DRAWS {
            expected = step(expected);
        }
        assert_eq!(lcg.state(), expected);
    }
}
