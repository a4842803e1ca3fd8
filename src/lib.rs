//! Approximate address-set filters.
//!
//! A filter records which addresses an actor has touched and answers
//! membership queries with possible false positives but no false negatives.
//!
//! - [`BulkBloomFilter`]: two-sector signature filter with an occupancy-based
//!   count estimate
//! - [`BlockBloomFilter`]: single-hash filter over block addresses
//! - [`MultiHashBloomFilter`]: counting filter with `k` hashed positions
//!
//! All variants implement [`Filter`]; [`build_filter`] picks one from
//! [`FilterParams`]. Filters are plain values with no internal locking.

pub mod bloom_filters;
pub mod config;
pub mod error;

/// A memory address.
pub type Addr = u64;

pub use bloom_filters::{
    BlockBloomFilter, BulkBloomFilter, Filter, FilterCore, MultiHashBloomFilter,
};
pub use config::{build_filter, FilterKind, FilterParams};
pub use error::FilterError;
