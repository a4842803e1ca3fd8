use bit_vec::BitVec;

use crate::error::FilterError;
use crate::Addr;

/// Operations shared by every address filter.
///
/// A filter never reports a false negative: after `insert(a)` and until the
/// next `clear()`, `is_member(a)` is true.
pub trait Filter {
    /// Record `addr` as present.
    fn insert(&mut self, addr: Addr);

    /// True if every position derived from `addr` is set.
    fn is_member(&self, addr: Addr) -> bool;

    /// Over-estimate of how many distinct addresses account for the bits
    /// associated with `addr`. Zero on an empty filter.
    ///
    /// Counting variants return the smallest counter among the positions of
    /// `addr`. The sectored filter ignores `addr` and returns the number of
    /// (c0, c1) index pairs it accepts, the product of its two sector
    /// occupancies, which grows roughly quadratically with distinct inserts.
    fn approximate_count(&self, addr: Addr) -> usize;

    /// Reset to the empty state.
    fn clear(&mut self);

    /// Number of addressable entries.
    fn size_bits(&self) -> usize;

    /// Number of entries currently set.
    fn occupied(&self) -> usize;

    fn occupancy(&self) -> f64 {
        self.occupied() as f64 / self.size_bits() as f64
    }

    fn is_saturated(&self) -> bool {
        self.occupied() == self.size_bits()
    }

    fn is_empty(&self) -> bool {
        self.occupied() == 0
    }
}

/// Storage for `entries` saturating counters of `counter_bits` bits each,
/// packed into a single bit vector.
///
/// With one-bit counters this is a plain bit array. Occupancy and saturation
/// are tracked as counters change so reading them never scans the storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterCore {
    storage: BitVec,
    entries: usize,
    counter_bits: usize,
    /// entries with a non-zero counter
    occupied: usize,
    /// entries pinned at `max_count`
    saturated: usize,
    /// sum of all counters
    total: usize,
}

impl FilterCore {
    pub fn new(entries: usize, counter_bits: usize) -> Result<Self, FilterError> {
        if entries == 0 {
            return Err(FilterError::ZeroSize);
        }
        if !(1..=8).contains(&counter_bits) {
            return Err(FilterError::InvalidCounterBits { bits: counter_bits });
        }
        let bits = entries
            .checked_mul(counter_bits)
            .ok_or(FilterError::TooLarge {
                entries,
                counter_bits,
            })?;
        Ok(Self {
            storage: BitVec::from_elem(bits, false),
            entries,
            counter_bits,
            occupied: 0,
            saturated: 0,
            total: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    pub fn counter_bits(&self) -> usize {
        self.counter_bits
    }

    pub fn max_count(&self) -> u8 {
        (((1u16) << self.counter_bits) - 1) as u8
    }

    pub fn get(&self, idx: usize) -> u8 {
        let base = idx * self.counter_bits;
        (0..self.counter_bits).fold(0u8, |acc, bit| {
            if self.storage.get(base + bit) == Some(true) {
                acc | (1 << bit)
            } else {
                acc
            }
        })
    }

    pub fn is_set(&self, idx: usize) -> bool {
        self.get(idx) > 0
    }

    fn put(&mut self, idx: usize, value: u8) {
        let base = idx * self.counter_bits;
        for bit in 0..self.counter_bits {
            self.storage.set(base + bit, (value >> bit) & 1 == 1);
        }
    }

    /// Bump the counter at `idx`, saturating at `max_count`.
    /// Returns the previous value.
    pub fn increment(&mut self, idx: usize) -> u8 {
        let old = self.get(idx);
        let max = self.max_count();
        if old == max {
            return old;
        }
        let new = old + 1;
        self.put(idx, new);
        self.total += 1;
        if old == 0 {
            self.occupied += 1;
        }
        if new == max {
            self.saturated += 1;
        }
        old
    }

    /// Lower the counter at `idx`. Zero and saturated counters are left alone,
    /// since a saturated counter no longer knows how many inserts it absorbed.
    /// Returns the previous value.
    pub fn decrement(&mut self, idx: usize) -> u8 {
        let old = self.get(idx);
        if old == 0 || old == self.max_count() {
            return old;
        }
        self.put(idx, old - 1);
        self.total -= 1;
        if old == 1 {
            self.occupied -= 1;
        }
        old
    }

    /// Entries with a non-zero counter.
    pub fn occupied(&self) -> usize {
        self.occupied
    }

    /// Entries whose counter has reached `max_count`.
    pub fn saturated(&self) -> usize {
        self.saturated
    }

    /// Sum of every counter.
    pub fn total_count(&self) -> usize {
        self.total
    }

    pub fn clear(&mut self) {
        self.storage.clear();
        self.occupied = 0;
        self.saturated = 0;
        self.total = 0;
    }

    /// Saturating add of `other` into `self`, entry by entry.
    pub fn merge(&mut self, other: &FilterCore) -> Result<(), FilterError> {
        if self.entries != other.entries || self.counter_bits != other.counter_bits {
            return Err(FilterError::GeometryMismatch {
                left: self.geometry(),
                right: other.geometry(),
            });
        }
        let max = self.max_count();
        for idx in 0..self.entries {
            let theirs = other.get(idx);
            if theirs == 0 {
                continue;
            }
            let old = self.get(idx);
            let new = old.saturating_add(theirs).min(max);
            if new == old {
                continue;
            }
            self.put(idx, new);
            self.total += (new - old) as usize;
            if old == 0 {
                self.occupied += 1;
            }
            if new == max {
                self.saturated += 1;
            }
        }
        Ok(())
    }

    fn geometry(&self) -> String {
        format!("{} entries x {} bits", self.entries, self.counter_bits)
    }
}

/// Reject sizes that cannot be indexed by a bit slice.
pub(crate) fn check_power_of_two(size: usize) -> Result<(), FilterError> {
    if size == 0 {
        return Err(FilterError::ZeroSize);
    }
    if !size.is_power_of_two() {
        return Err(FilterError::NotPowerOfTwo { size });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_core_is_empty() {
        let core = FilterCore::new(16, 1).unwrap();
        assert_eq!(core.len(), 16);
        assert_eq!(core.occupied(), 0);
        assert_eq!(core.total_count(), 0);
        assert!((0..16).all(|i| !core.is_set(i)));
    }

    #[test]
    fn rejects_bad_geometry() {
        assert_eq!(FilterCore::new(0, 1), Err(FilterError::ZeroSize));
        assert_eq!(
            FilterCore::new(8, 0),
            Err(FilterError::InvalidCounterBits { bits: 0 })
        );
        assert_eq!(
            FilterCore::new(8, 9),
            Err(FilterError::InvalidCounterBits { bits: 9 })
        );
    }

    #[test]
    fn rejects_storage_that_overflows() {
        assert_eq!(
            FilterCore::new(1 << 61, 8),
            Err(FilterError::TooLarge {
                entries: 1 << 61,
                counter_bits: 8
            })
        );
    }

    #[test]
    fn single_bit_entries_saturate_on_first_set() {
        let mut core = FilterCore::new(8, 1).unwrap();
        assert_eq!(core.increment(3), 0);
        assert_eq!(core.increment(3), 1);
        assert_eq!(core.get(3), 1);
        assert_eq!(core.occupied(), 1);
        assert_eq!(core.saturated(), 1);
        assert_eq!(core.total_count(), 1);
    }

    #[test]
    fn counters_do_not_bleed_into_neighbours() {
        let mut core = FilterCore::new(4, 3).unwrap();
        for _ in 0..5 {
            core.increment(1);
        }
        assert_eq!(core.get(0), 0);
        assert_eq!(core.get(1), 5);
        assert_eq!(core.get(2), 0);
    }

    #[test]
    fn counters_saturate_and_stick() {
        let mut core = FilterCore::new(4, 2).unwrap();
        for _ in 0..10 {
            core.increment(0);
        }
        assert_eq!(core.get(0), 3);
        assert_eq!(core.saturated(), 1);
        assert_eq!(core.total_count(), 3);

        assert_eq!(core.decrement(0), 3);
        assert_eq!(core.get(0), 3, "saturated counter must not be lowered");
    }

    #[test]
    fn decrement_tracks_occupancy() {
        let mut core = FilterCore::new(4, 4).unwrap();
        core.increment(2);
        core.increment(2);
        core.decrement(2);
        assert_eq!(core.get(2), 1);
        assert_eq!(core.occupied(), 1);
        core.decrement(2);
        assert_eq!(core.occupied(), 0);
        assert_eq!(core.decrement(2), 0);
        assert_eq!(core.total_count(), 0);
    }

    #[test]
    fn clear_resets_storage_and_bookkeeping() {
        let mut core = FilterCore::new(8, 2).unwrap();
        for i in 0..8 {
            core.increment(i);
        }
        core.clear();
        assert_eq!(core.occupied(), 0);
        assert_eq!(core.saturated(), 0);
        assert_eq!(core.total_count(), 0);
        assert!((0..8).all(|i| core.get(i) == 0));
    }

    #[test]
    fn merge_adds_counters() {
        let mut a = FilterCore::new(4, 2).unwrap();
        let mut b = FilterCore::new(4, 2).unwrap();
        a.increment(0);
        a.increment(0);
        b.increment(0);
        b.increment(0);
        b.increment(3);

        a.merge(&b).unwrap();
        assert_eq!(a.get(0), 3);
        assert_eq!(a.get(3), 1);
        assert_eq!(a.occupied(), 2);
        assert_eq!(a.saturated(), 1);
        assert_eq!(a.total_count(), 4);
    }

    #[test]
    fn merge_rejects_mismatched_geometry() {
        let mut a = FilterCore::new(4, 1).unwrap();
        let b = FilterCore::new(8, 1).unwrap();
        assert!(matches!(
            a.merge(&b),
            Err(FilterError::GeometryMismatch { .. })
        ));
    }

    #[test]
    fn power_of_two_check() {
        assert!(check_power_of_two(1).is_ok());
        assert!(check_power_of_two(1024).is_ok());
        assert_eq!(check_power_of_two(0), Err(FilterError::ZeroSize));
        assert_eq!(
            check_power_of_two(3),
            Err(FilterError::NotPowerOfTwo { size: 3 })
        );
    }
}
