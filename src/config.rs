//! Filter parameters and validation
//!
//! # Example
//!
//! ```
//! use addr_filters::{build_filter, Filter, FilterKind, FilterParams};
//!
//! let params = FilterParams::default()
//!     .with_kind(FilterKind::Bulk)
//!     .with_size_bits(2048);
//! let mut filter = build_filter(&params).expect("valid params");
//! filter.insert(0x1000);
//! assert!(filter.is_member(0x1000));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bloom_filters::{BlockBloomFilter, BulkBloomFilter, Filter, MultiHashBloomFilter};
use crate::error::FilterError;

/// Which filter variant to build.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// Two-sector filter, one bit per sector per address
    #[default]
    Bulk,
    /// One entry per address, indexed by the block address
    Block,
    /// `num_hashes` entries per address
    MultiHash,
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilterKind::Bulk => "bulk",
            FilterKind::Block => "block",
            FilterKind::MultiHash => "multi_hash",
        };
        f.write_str(name)
    }
}

/// Construction parameters for an address filter.
///
/// Only `size_bits` matters for the bulk filter; the other fields tune the
/// single- and multi-hash variants. Missing fields take their defaults when
/// deserialized.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    pub kind: FilterKind,
    /// Total entries in the filter (both sectors for the bulk filter)
    pub size_bits: usize,
    /// Low address bits ignored when hashing (log2 of the block size)
    pub offset_bits: u32,
    /// Positions per address for the multi-hash filter
    pub num_hashes: usize,
    /// Width of each saturating counter
    pub counter_bits: usize,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            kind: FilterKind::Bulk,
            size_bits: 1024,
            offset_bits: 0,
            num_hashes: 4,
            counter_bits: 1,
        }
    }
}

impl FilterParams {
    pub fn validate(&self) -> Result<(), FilterError> {
        if self.size_bits == 0 {
            return Err(FilterError::ZeroSize);
        }
        if !self.size_bits.is_power_of_two() {
            return Err(FilterError::NotPowerOfTwo {
                size: self.size_bits,
            });
        }
        if self.offset_bits >= u64::BITS {
            return Err(FilterError::InvalidOffset {
                bits: self.offset_bits,
            });
        }
        if !(1..=8).contains(&self.counter_bits) {
            return Err(FilterError::InvalidCounterBits {
                bits: self.counter_bits,
            });
        }

        match self.kind {
            FilterKind::Bulk => {
                // two sectors of at least one bit each
                if self.size_bits < 2 {
                    return Err(FilterError::ZeroSize);
                }
                if self.counter_bits != 1 {
                    return Err(FilterError::InvalidCounterBits {
                        bits: self.counter_bits,
                    });
                }
            }
            FilterKind::MultiHash => {
                if self.num_hashes == 0 {
                    return Err(FilterError::InvalidHashCount);
                }
            }
            FilterKind::Block => {}
        }

        Ok(())
    }

    pub fn with_kind(mut self, kind: FilterKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_size_bits(mut self, size_bits: usize) -> Self {
        self.size_bits = size_bits;
        self
    }

    pub fn with_offset_bits(mut self, offset_bits: u32) -> Self {
        self.offset_bits = offset_bits;
        self
    }

    pub fn with_num_hashes(mut self, num_hashes: usize) -> Self {
        self.num_hashes = num_hashes;
        self
    }

    pub fn with_counter_bits(mut self, counter_bits: usize) -> Self {
        self.counter_bits = counter_bits;
        self
    }
}

/// Build the filter variant named by `params.kind`.
pub fn build_filter(params: &FilterParams) -> Result<Box<dyn Filter>, FilterError> {
    let filter: Box<dyn Filter> = match params.kind {
        FilterKind::Bulk => Box::new(BulkBloomFilter::from_params(params)?),
        FilterKind::Block => Box::new(BlockBloomFilter::from_params(params)?),
        FilterKind::MultiHash => Box::new(MultiHashBloomFilter::from_params(params)?),
    };
    Ok(filter)
}
