use tracing::{debug, trace, warn};
use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::bloom_filters::base::{check_power_of_two, Filter, FilterCore};
use crate::config::{FilterKind, FilterParams};
use crate::error::FilterError;
use crate::Addr;

/// Counting filter with `k` positions per address.
///
/// Each insert bumps the counter at every position, so with counters wider
/// than one bit inserting the same address again raises its count without
/// changing membership.
pub struct MultiHashBloomFilter {
    /// number of entries in the filter
    m: u64,
    /// number of hash functions
    k: u64,
    offset_bits: u32,
    /// a counter hit its maximum since the last clear
    saturation_reported: bool,

    storage: FilterCore,
}

impl MultiHashBloomFilter {
    /// m -- number of entries
    /// k -- number of hash functions
    pub fn new(m: usize, k: usize) -> Result<Self, FilterError> {
        Self::build(m, k, 0, 1)
    }

    pub fn from_params(params: &FilterParams) -> Result<Self, FilterError> {
        params.validate()?;
        Self::build(
            params.size_bits,
            params.num_hashes,
            params.offset_bits,
            params.counter_bits,
        )
    }

    fn build(
        m: usize,
        k: usize,
        offset_bits: u32,
        counter_bits: usize,
    ) -> Result<Self, FilterError> {
        check_power_of_two(m)?;
        if k == 0 {
            return Err(FilterError::InvalidHashCount);
        }
        if offset_bits >= u64::BITS {
            return Err(FilterError::InvalidOffset { bits: offset_bits });
        }
        let storage = FilterCore::new(m, counter_bits)?;
        debug!(
            kind = %FilterKind::MultiHash,
            m,
            k,
            offset_bits,
            counter_bits,
            "created filter"
        );
        Ok(Self {
            m: m as u64,
            k: k as u64,
            offset_bits,
            saturation_reported: false,
            storage,
        })
    }

    // h(i) = h1 + i * h2 over the little-endian bytes of the block address
    fn positions(&self, addr: Addr) -> impl Iterator<Item = usize> + '_ {
        let value = (addr >> self.offset_bits).to_le_bytes();
        let hash1 = xxh3_64_with_seed(&value, 0) % self.m;
        let hash2 = xxh3_64_with_seed(&value, 64) % self.m;
        (0..self.k)
            .map(move |i| (hash1.wrapping_add(i.wrapping_mul(hash2)) % self.m) as usize)
    }

    /// Undo one `insert(addr)`. Only meaningful for addresses that were
    /// inserted; saturated counters are never lowered, so with one-bit
    /// counters this is a no-op.
    pub fn remove(&mut self, addr: Addr) {
        let positions: Vec<usize> = self.positions(addr).collect();
        for idx in positions {
            self.storage.decrement(idx);
        }
    }

    pub fn hash_count(&self) -> usize {
        self.k as usize
    }

    /// Sum of every counter in the filter.
    pub fn total_count(&self) -> usize {
        self.storage.total_count()
    }

    /// Entries whose counter has saturated.
    pub fn saturated(&self) -> usize {
        self.storage.saturated()
    }

    /// Saturating add of `other` into `self`.
    pub fn merge(&mut self, other: &MultiHashBloomFilter) -> Result<(), FilterError> {
        if self.k != other.k || self.offset_bits != other.offset_bits {
            return Err(FilterError::GeometryMismatch {
                left: format!("k={} offset={}", self.k, self.offset_bits),
                right: format!("k={} offset={}", other.k, other.offset_bits),
            });
        }
        self.storage.merge(&other.storage)?;
        trace!(occupied = self.storage.occupied(), "merged multi-hash filter");
        Ok(())
    }
}

impl Filter for MultiHashBloomFilter {
    fn insert(&mut self, addr: Addr) {
        let positions: Vec<usize> = self.positions(addr).collect();
        for idx in positions {
            self.storage.increment(idx);
        }
        // one-bit counters saturate on every insert; only wider ones are worth reporting
        if !self.saturation_reported
            && self.storage.counter_bits() > 1
            && self.storage.saturated() > 0
        {
            self.saturation_reported = true;
            warn!(
                saturated = self.storage.saturated(),
                max = self.storage.max_count(),
                "filter counter saturated, counts are now lower bounds"
            );
        }
    }

    fn is_member(&self, addr: Addr) -> bool {
        self.positions(addr).all(|idx| self.storage.is_set(idx))
    }

    /// Smallest counter among the positions of `addr`.
    fn approximate_count(&self, addr: Addr) -> usize {
        self.positions(addr)
            .map(|idx| self.storage.get(idx) as usize)
            .min()
            .unwrap_or(0)
    }

    fn clear(&mut self) {
        self.storage.clear();
        self.saturation_reported = false;
        trace!("cleared multi-hash filter");
    }

    fn size_bits(&self) -> usize {
        self.storage.len()
    }

    fn occupied(&self) -> usize {
        self.storage.occupied()
    }
}
