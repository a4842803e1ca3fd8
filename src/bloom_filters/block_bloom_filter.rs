use tracing::{debug, trace, warn};

use crate::bloom_filters::base::{check_power_of_two, Filter, FilterCore};
use crate::bloom_filters::signature::fold_address;
use crate::config::{FilterKind, FilterParams};
use crate::error::FilterError;
use crate::Addr;

/// Single-hash filter: the low bits of the block address select one entry.
pub struct BlockBloomFilter {
    core: FilterCore,
    /// size - 1, size being a power of two
    mask: usize,
    offset_bits: u32,
    /// a counter hit its maximum since the last clear
    saturation_reported: bool,
}

impl BlockBloomFilter {
    pub fn new(size_bits: usize) -> Result<Self, FilterError> {
        Self::build(size_bits, 0, 1)
    }

    pub fn from_params(params: &FilterParams) -> Result<Self, FilterError> {
        params.validate()?;
        Self::build(params.size_bits, params.offset_bits, params.counter_bits)
    }

    fn build(
        size_bits: usize,
        offset_bits: u32,
        counter_bits: usize,
    ) -> Result<Self, FilterError> {
        check_power_of_two(size_bits)?;
        if offset_bits >= u64::BITS {
            return Err(FilterError::InvalidOffset { bits: offset_bits });
        }
        let core = FilterCore::new(size_bits, counter_bits)?;
        debug!(
            kind = %FilterKind::Block,
            size_bits,
            offset_bits,
            counter_bits,
            "created filter"
        );
        Ok(Self {
            core,
            mask: size_bits - 1,
            offset_bits,
            saturation_reported: false,
        })
    }

    fn index(&self, addr: Addr) -> usize {
        fold_address(addr, self.offset_bits) as usize & self.mask
    }

    /// Sum of every counter in the filter.
    pub fn total_count(&self) -> usize {
        self.core.total_count()
    }
}

impl Filter for BlockBloomFilter {
    fn insert(&mut self, addr: Addr) {
        let idx = self.index(addr);
        self.core.increment(idx);
        // one-bit counters saturate on every insert; only wider ones are worth reporting
        if !self.saturation_reported
            && self.core.counter_bits() > 1
            && self.core.saturated() > 0
        {
            self.saturation_reported = true;
            warn!(
                saturated = self.core.saturated(),
                max = self.core.max_count(),
                "filter counter saturated, counts are now lower bounds"
            );
        }
    }

    fn is_member(&self, addr: Addr) -> bool {
        self.core.is_set(self.index(addr))
    }

    fn approximate_count(&self, addr: Addr) -> usize {
        self.core.get(self.index(addr)) as usize
    }

    fn clear(&mut self) {
        self.core.clear();
        self.saturation_reported = false;
        trace!("cleared block filter");
    }

    fn size_bits(&self) -> usize {
        self.core.len()
    }

    fn occupied(&self) -> usize {
        self.core.occupied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_check() {
        let mut bf = BlockBloomFilter::new(64).unwrap();
        bf.insert(1);
        bf.insert(10);
        bf.insert(30);

        assert!(bf.is_member(1), "stored value is not found!");
        assert!(bf.is_member(10), "stored value is not found!");
        assert!(bf.is_member(30), "stored value is not found!");
        assert!(!bf.is_member(45), "not stored value is found!");
    }

    #[test]
    fn aliases_share_an_entry() {
        let mut bf = BlockBloomFilter::new(16).unwrap();
        bf.insert(3);
        assert!(bf.is_member(3 + 16), "addresses 16 apart share an entry");
        assert_eq!(bf.approximate_count(3 + 16), 1);
    }

    #[test]
    fn counts_repeated_inserts_with_wide_counters() {
        let params = FilterParams::default()
            .with_kind(FilterKind::Block)
            .with_size_bits(16)
            .with_counter_bits(4);
        let mut bf = BlockBloomFilter::from_params(&params).unwrap();
        bf.insert(5);
        bf.insert(5);
        bf.insert(5 + 16);
        assert_eq!(bf.approximate_count(5), 3);
        assert_eq!(bf.total_count(), 3);
        assert_eq!(bf.occupied(), 1);
    }

    #[test]
    fn reports_saturation_once_per_clear() {
        let params = FilterParams::default()
            .with_kind(FilterKind::Block)
            .with_size_bits(16)
            .with_counter_bits(2);
        let mut bf = BlockBloomFilter::from_params(&params).unwrap();
        bf.insert(7);
        bf.insert(7);
        assert!(!bf.saturation_reported);
        bf.insert(7);
        assert!(bf.saturation_reported, "counter reached 3 of 3");
        assert_eq!(bf.approximate_count(7), 3);

        bf.clear();
        assert!(!bf.saturation_reported);
    }

    #[test]
    fn one_bit_counters_do_not_report_saturation() {
        let mut bf = BlockBloomFilter::new(16).unwrap();
        bf.insert(7);
        assert!(!bf.saturation_reported);
    }

    #[test]
    fn clear_resets() {
        let mut bf = BlockBloomFilter::new(8).unwrap();
        for addr in 0..8 {
            bf.insert(addr);
        }
        assert!(bf.is_saturated());
        bf.clear();
        assert!(bf.is_empty());
        assert!((0..8).all(|addr| !bf.is_member(addr)));
    }

    #[test]
    fn rejects_bad_size() {
        assert!(matches!(
            BlockBloomFilter::new(12),
            Err(FilterError::NotPowerOfTwo { size: 12 })
        ));
    }
}
