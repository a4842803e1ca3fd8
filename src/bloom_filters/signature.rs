//! Address to signature transform used by the sectored filter.
//!
//! An address is reduced to its block address, XOR-folded down to
//! [`SIGNATURE_BITS`] bits and then put through a fixed bit permutation.
//! Sector indices are disjoint bit slices of the result.

use crate::Addr;

/// Width of a signature in bits.
pub const SIGNATURE_BITS: u32 = u32::BITS;

const STRIDE: usize = 13;
const ROTATION: usize = 5;

/// Output bit `i` of a signature is input bit `PERMUTATION[i]`.
///
/// `STRIDE` is odd, hence coprime with 32, so this is a bijection.
pub const PERMUTATION: [u8; SIGNATURE_BITS as usize] = build_permutation();

const fn build_permutation() -> [u8; SIGNATURE_BITS as usize] {
    let mut table = [0u8; SIGNATURE_BITS as usize];
    let mut i = 0;
    while i < table.len() {
        table[i] = ((STRIDE * i + ROTATION) % SIGNATURE_BITS as usize) as u8;
        i += 1;
    }
    table
}

/// Drop the block-offset bits and XOR-fold the rest into 32 bits.
pub fn fold_address(addr: Addr, offset_bits: u32) -> u32 {
    let block = addr >> offset_bits;
    (block ^ (block >> SIGNATURE_BITS)) as u32
}

/// Rearrange the bits of `value` according to [`PERMUTATION`].
pub fn permute(value: u32) -> u32 {
    PERMUTATION
        .iter()
        .enumerate()
        .fold(0, |acc, (dst, &src)| acc | (((value >> src) & 1) << dst))
}

/// Inverse of [`permute`].
pub fn unpermute(signature: u32) -> u32 {
    PERMUTATION
        .iter()
        .enumerate()
        .fold(0, |acc, (src, &dst)| acc | (((signature >> src) & 1) << dst))
}

pub fn signature(addr: Addr, offset_bits: u32) -> u32 {
    permute(fold_address(addr, offset_bits))
}

/// Extract `width` bits of `signature` starting at bit `lsb`.
pub fn slice(signature: u32, lsb: u32, width: u32) -> usize {
    if width == 0 {
        return 0;
    }
    let mask = if width >= SIGNATURE_BITS {
        u32::MAX
    } else {
        (1u32 << width) - 1
    };
    ((signature >> lsb) & mask) as usize
}
