//! Error types for filter construction

use thiserror::Error;

/// Errors raised while building or combining filters.
///
/// Every variant is a configuration problem: once a filter exists, its
/// insert/query/clear operations cannot fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("Filter size cannot be 0")]
    ZeroSize,

    #[error("Filter size must be a power of two, got {size}")]
    NotPowerOfTwo { size: usize },

    #[error("Sectors need more bits than available: {sector_bits} per sector, {available} total")]
    SectorsTooWide { sector_bits: usize, available: u32 },

    #[error("Filter too large: {entries} entries x {counter_bits} bits overflows usize")]
    TooLarge { entries: usize, counter_bits: usize },

    #[error("Invalid counter width: {bits} (must be between 1 and 8)")]
    InvalidCounterBits { bits: usize },

    #[error("Number of hash functions must be at least 1")]
    InvalidHashCount,

    #[error("Invalid block offset: {bits} bits (must be below 64)")]
    InvalidOffset { bits: u32 },

    #[error("Filter geometry mismatch: {left} vs {right}")]
    GeometryMismatch { left: String, right: String },
}
