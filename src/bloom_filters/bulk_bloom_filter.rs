//! Sectored filter from "Bulk Disambiguation of Speculative Threads in
//! Multiprocessors" (Ceze et al.).
//!
//! The storage is split into two equal sectors, `c0` and `c1`. Each address
//! sets exactly one bit in each sector; both indices are disjoint slices of
//! the address signature (see [`signature`](super::signature)).

use tracing::{debug, trace};

use crate::bloom_filters::base::{check_power_of_two, Filter, FilterCore};
use crate::bloom_filters::signature::{signature, slice, SIGNATURE_BITS};
use crate::config::{FilterKind, FilterParams};
use crate::error::FilterError;
use crate::Addr;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkBloomFilter {
    core: FilterCore,
    /// bits per sector
    sector_bits: usize,
    /// log2(sector_bits), the width of each index slice
    index_bits: u32,
    offset_bits: u32,
    /// set bits in c0 and c1
    sector_occupancy: [usize; 2],
}

impl BulkBloomFilter {
    /// `size_bits` -- total bits, split evenly between the two sectors
    pub fn new(size_bits: usize) -> Result<Self, FilterError> {
        if size_bits == 0 {
            return Err(FilterError::ZeroSize);
        }
        if size_bits % 2 != 0 {
            return Err(FilterError::NotPowerOfTwo { size: size_bits });
        }
        Self::with_sector_bits(size_bits / 2)
    }

    /// `sector_bits` -- bits per sector, a power of two
    pub fn with_sector_bits(sector_bits: usize) -> Result<Self, FilterError> {
        Self::build(sector_bits, 0)
    }

    pub fn from_params(params: &FilterParams) -> Result<Self, FilterError> {
        params.validate()?;
        Self::build(params.size_bits / 2, params.offset_bits)
    }

    fn build(sector_bits: usize, offset_bits: u32) -> Result<Self, FilterError> {
        check_power_of_two(sector_bits)?;
        if offset_bits >= u64::BITS {
            return Err(FilterError::InvalidOffset { bits: offset_bits });
        }
        let index_bits = sector_bits.trailing_zeros();
        if 2 * index_bits > SIGNATURE_BITS {
            return Err(FilterError::SectorsTooWide {
                sector_bits,
                available: SIGNATURE_BITS,
            });
        }

        let core = FilterCore::new(2 * sector_bits, 1)?;
        debug!(
            kind = %FilterKind::Bulk,
            sector_bits,
            offset_bits,
            "created sectored filter"
        );
        Ok(Self {
            core,
            sector_bits,
            index_bits,
            offset_bits,
            sector_occupancy: [0, 0],
        })
    }

    /// Positions of `addr` in c0 and c1, each in `[0, sector_bits)`.
    fn indices(&self, addr: Addr) -> (usize, usize) {
        let sig = signature(addr, self.offset_bits);
        let c0 = slice(sig, 0, self.index_bits);
        let c1 = slice(sig, self.index_bits, self.index_bits);
        (c0, c1)
    }

    pub fn sector_bits(&self) -> usize {
        self.sector_bits
    }

    pub fn offset_bits(&self) -> u32 {
        self.offset_bits
    }

    /// Set bits in (c0, c1).
    pub fn sector_occupancy(&self) -> (usize, usize) {
        (self.sector_occupancy[0], self.sector_occupancy[1])
    }

    /// Probability that an address never inserted is reported as a member,
    /// given the current sector occupancy.
    pub fn false_positive_rate(&self) -> f64 {
        let sector = self.sector_bits as f64;
        let c0 = self.sector_occupancy[0] as f64 / sector;
        let c1 = self.sector_occupancy[1] as f64 / sector;
        c0 * c1
    }

    /// OR `other` into `self`.
    pub fn merge(&mut self, other: &BulkBloomFilter) -> Result<(), FilterError> {
        if self.offset_bits != other.offset_bits {
            return Err(FilterError::GeometryMismatch {
                left: format!("offset {}", self.offset_bits),
                right: format!("offset {}", other.offset_bits),
            });
        }
        self.core.merge(&other.core)?;
        self.sector_occupancy = [self.count_sector(0), self.count_sector(1)];
        trace!(occupancy = ?self.sector_occupancy, "merged sectored filter");
        Ok(())
    }

    fn count_sector(&self, sector: usize) -> usize {
        let start = sector * self.sector_bits;
        (start..start + self.sector_bits)
            .filter(|&i| self.core.is_set(i))
            .count()
    }
}

impl Filter for BulkBloomFilter {
    fn insert(&mut self, addr: Addr) {
        let (c0, c1) = self.indices(addr);
        if self.core.increment(c0) == 0 {
            self.sector_occupancy[0] += 1;
        }
        if self.core.increment(self.sector_bits + c1) == 0 {
            self.sector_occupancy[1] += 1;
        }
    }

    fn is_member(&self, addr: Addr) -> bool {
        let (c0, c1) = self.indices(addr);
        self.core.is_set(c0) && self.core.is_set(self.sector_bits + c1)
    }

    /// Number of (c0, c1) index pairs the filter currently accepts. Every
    /// inserted address owns one such pair, so this never under-counts the
    /// distinct signatures inserted since the last clear.
    fn approximate_count(&self, _addr: Addr) -> usize {
        self.sector_occupancy[0].saturating_mul(self.sector_occupancy[1])
    }

    fn clear(&mut self) {
        self.core.clear();
        self.sector_occupancy = [0, 0];
        trace!("cleared sectored filter");
    }

    fn size_bits(&self) -> usize {
        self.core.len()
    }

    fn occupied(&self) -> usize {
        self.core.occupied()
    }
}
