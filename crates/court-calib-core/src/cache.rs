//! Memoized matrix inverses.
//!
//! Entries are keyed by the exact bit pattern of the matrix, a caller-chosen
//! modifier (e.g. the active camera prior) and the cache epoch. `invalidate`
//! bumps the epoch, so nothing computed for a previous calibration can be
//! returned afterwards even if the same key is looked up again.

use std::collections::HashMap;

use crate::matrix::{invert, Mat3};

const DEFAULT_CAPACITY: usize = 64;

/// Structural fingerprint of a matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MatrixKey([u64; 9]);

impl MatrixKey {
    pub fn of(m: &Mat3) -> Self {
        let mut bits = [0u64; 9];
        for (slot, v) in bits.iter_mut().zip(m.iter()) {
            // -0.0 and 0.0 describe the same transform
            *slot = if *v == 0.0 { 0 } else { v.to_bits() };
        }
        Self(bits)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    epoch: u64,
    matrix: MatrixKey,
    modifier: u64,
}

/// Hit/miss counters, reset on `invalidate`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Clone, Debug)]
pub struct InverseCache {
    epoch: u64,
    capacity: usize,
    entries: HashMap<CacheKey, Option<Mat3>>,
    stats: CacheStats,
}

impl Default for InverseCache {
    fn default() -> Self {
        Self::new()
    }
}

impl InverseCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// `capacity` is clamped to at least one entry.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            epoch: 0,
            capacity,
            entries: HashMap::with_capacity(capacity),
            stats: CacheStats::default(),
        }
    }

    /// Return the cached inverse of `m`, computing it on a miss.
    ///
    /// Singular matrices are memoized as `None` as well.
    pub fn get_or_invert(&mut self, m: &Mat3, modifier: u64) -> Option<Mat3> {
        let key = CacheKey {
            epoch: self.epoch,
            matrix: MatrixKey::of(m),
            modifier,
        };
        if let Some(hit) = self.entries.get(&key) {
            self.stats.hits += 1;
            return *hit;
        }

        self.stats.misses += 1;
        if self.entries.len() >= self.capacity {
            log::debug!("inverse cache full ({} entries), clearing", self.entries.len());
            self.entries.clear();
        }
        let inv = invert(m);
        self.entries.insert(key, inv);
        inv
    }

    /// Drop every entry and start a new epoch.
    ///
    /// Must be called whenever the active homography is replaced.
    pub fn invalidate(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        self.entries.clear();
        self.stats = CacheStats::default();
        log::debug!("inverse cache invalidated (epoch {})", self.epoch);
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
