//! Bit-sliced index container
//!
//! A [`BitSliceIndex`] maps sparse 64-bit column ids to signed 64-bit values.
//! Instead of storing values row by row, it keeps one bitmap per value bit
//! (the *bit planes*) plus an *existence bitmap* marking which columns hold a
//! value at all. Membership of column `c` in plane `j` means bit `j` of `c`'s
//! value is set; with 64 planes, plane 63 is the two's-complement sign.
//!
//! The layout makes range predicates, equality probes, sums and min/max
//! computable with bitmap operations alone, without materializing values,
//! and it stays compact for high-cardinality columns.
//!
//! Reads (queries, aggregation) take `&self` and may run concurrently.
//! Writers (`set_value`, `add`, `increment`, `clear_values`, `retain`,
//! deserialization) take `&mut self`; the index performs no internal locking.
//!
//! # Example
//!
//! ```rust
//! use bitsliced::{BitSliceIndex, Operation};
//!
//! let mut index = BitSliceIndex::default();
//! index.set_value(1, 5);
//! index.set_value(2, -3);
//! index.set_value(3, 0);
//!
//! assert_eq!(index.get_value(2), Some(-3));
//! assert_eq!(index.cardinality(), 3);
//!
//! let negative = index
//!     .compare_value(0, Operation::Lt, 0, 0, None)
//!     .unwrap();
//! assert_eq!(negative.iter().collect::<Vec<_>>(), vec![2]);
//! ```

mod aggregate;
mod arith;
mod compare;
mod serialize;

pub use compare::Operation;

use rayon::prelude::*;

use crate::bitmap::Bitmap;

/// Bit-sliced representation of a `column id → signed value` mapping
///
/// Constructed either with declared range hints ([`BitSliceIndex::new`]) that
/// pre-size the plane stack, or auto-sizing ([`BitSliceIndex::default`])
/// where the first writes grow the stack on demand.
pub struct BitSliceIndex {
    /// Bit planes, least significant first
    planes: Vec<Bitmap>,
    /// Existence bitmap: columns that have been assigned a value
    existence: Bitmap,
    /// Declared maximum value (sizing hint only)
    max_value: i64,
    /// Declared minimum value (sizing hint only)
    min_value: i64,
    /// When set, bitmaps produced by operations are marked for run compression
    run_optimized: bool,
}

/// Number of bits needed to represent `value` as an unsigned 64-bit pattern.
///
/// Negative values occupy all 64 bits in two's complement.
pub(crate) fn bit_len(value: i64) -> usize {
    64 - (value as u64).leading_zeros() as usize
}

/// Bit `j` of `value`, viewed as an unsigned 64-bit pattern.
///
/// Plane indexes past 63 always read as clear; carries widening the plane
/// stack beyond 64 bits have no counterpart in an `i64` operand.
#[inline]
pub(crate) fn value_bit(value: i64, j: usize) -> bool {
    j < 64 && (value as u64 >> j) & 1 == 1
}

impl BitSliceIndex {
    /// Create an index pre-sized for values in `min_value..=max_value`
    ///
    /// The plane stack is sized to `bitlen(max(|min|, |max|))`. The hints are
    /// the caller's contract: queries are only correct for stored values
    /// within the declared range. Passing `(0, 0)` yields an auto-sizing
    /// index, equivalent to [`BitSliceIndex::default`].
    pub fn new(max_value: i64, min_value: i64) -> Self {
        let bits = bit_len(max_value).max(bit_len(min_value));
        Self {
            planes: (0..bits).map(|_| Bitmap::new()).collect(),
            existence: Bitmap::new(),
            max_value,
            min_value,
            run_optimized: false,
        }
    }

    /// Assign `value` to `column_id`, overwriting any previous value
    ///
    /// On an auto-sizing index the plane stack grows to fit `value` first.
    /// On a pre-sized index, bits of `value` at or above [`bit_count`] are
    /// silently dropped; staying within the declared range is the caller's
    /// responsibility.
    ///
    /// [`bit_count`]: BitSliceIndex::bit_count
    pub fn set_value(&mut self, column_id: u64, value: i64) {
        // Auto-size only when both range hints are zero.
        if self.max_value == 0 && self.min_value == 0 {
            let min_bits = bit_len(value);
            while self.planes.len() < min_bits {
                self.planes.push(Bitmap::new());
            }
        }

        for (j, plane) in self.planes.iter_mut().enumerate() {
            if value_bit(value, j) {
                plane.insert(column_id);
            } else {
                // Mandatory: overwrites must clear stale bits.
                plane.remove(column_id);
            }
        }
        self.existence.insert(column_id);
    }

    /// Read the value stored for `column_id`, or `None` if the column has
    /// never been assigned one
    pub fn get_value(&self, column_id: u64) -> Option<i64> {
        if !self.existence.contains(column_id) {
            return None;
        }
        let mut value = 0u64;
        for (j, plane) in self.planes.iter().enumerate().take(64) {
            if plane.contains(column_id) {
                value |= 1 << j;
            }
        }
        Some(value as i64)
    }

    /// True when `column_id` has been assigned a value
    pub fn value_exists(&self, column_id: u64) -> bool {
        self.existence.contains(column_id)
    }

    /// Number of columns holding a value
    pub fn cardinality(&self) -> u64 {
        self.existence.len()
    }

    /// Number of bit planes currently allocated
    pub fn bit_count(&self) -> usize {
        self.planes.len()
    }

    /// Declared maximum value hint
    pub fn max_value(&self) -> i64 {
        self.max_value
    }

    /// Declared minimum value hint
    pub fn min_value(&self) -> i64 {
        self.min_value
    }

    /// Borrow the existence bitmap
    ///
    /// Useful as a driver set for queries, or to snapshot which columns are
    /// populated.
    pub fn existence_bitmap(&self) -> &Bitmap {
        &self.existence
    }

    /// Apply run-length compression to the existence bitmap and every plane,
    /// and mark the index so bitmaps produced by later operations are
    /// compressed the same way
    pub fn run_optimize(&mut self) {
        self.existence.run_optimize();
        for plane in &mut self.planes {
            plane.run_optimize();
        }
        self.run_optimized = true;
    }

    /// True once [`run_optimize`](BitSliceIndex::run_optimize) has been called
    pub fn has_run_compression(&self) -> bool {
        self.run_optimized
    }

    /// Estimated size of the existence bitmap plus all planes, in bytes
    pub fn size_in_bytes(&self) -> usize {
        let mut size = self.existence.size_in_bytes();
        for plane in &self.planes {
            size += plane.size_in_bytes();
        }
        size
    }

    /// Rebuild an index from a decoded bitmap sequence: element 0 is the
    /// existence bitmap, the rest are bit planes in least-to-most significant
    /// order
    pub fn from_bitmaps(mut bitmaps: Vec<Bitmap>) -> Self {
        let mut index = Self::default();
        if bitmaps.is_empty() {
            return index;
        }
        index.existence = bitmaps.remove(0);
        index.planes = bitmaps;
        index
    }

    // ========================================================================
    // Set operations
    // ========================================================================

    /// Drop the columns in `found_set`: remove them from the existence bitmap
    /// and from every plane
    pub fn clear_values(&mut self, found_set: &Bitmap) {
        self.existence.and_not_inplace(found_set);
        for plane in &mut self.planes {
            plane.and_not_inplace(found_set);
        }
    }

    /// Keep only the columns in `keep`; returns how many columns were dropped
    pub fn retain(&mut self, keep: &Bitmap) -> u64 {
        let before = self.existence.len();
        self.existence.and_inplace(keep);
        let dropped = before - self.existence.len();
        if dropped == 0 {
            return 0;
        }
        for plane in &mut self.planes {
            plane.and_inplace(keep);
        }
        dropped
    }

    /// Build a new index containing only the columns in `found_set`
    ///
    /// The declared range hints carry over; the existence bitmap and every
    /// plane are deep-cloned and intersected with `found_set`. Plane copies
    /// run in parallel.
    pub fn retain_set(&self, found_set: &Bitmap) -> Self {
        let planes: Vec<Bitmap> = self
            .planes
            .par_iter()
            .map(|plane| plane & found_set)
            .collect();
        let mut existence = self.existence.clone();
        existence.and_inplace(found_set);
        Self {
            planes,
            existence,
            max_value: self.max_value,
            min_value: self.min_value,
            run_optimized: self.run_optimized,
        }
    }

    /// Plane-wise OR of `others` into this index
    ///
    /// Intended for bulk-load concatenation: column ids across the sources
    /// should not overlap unless the overlapping values are identical. The
    /// plane stack widens to the widest source; merging runs one rayon task
    /// per plane, and the existence bitmaps are ORed last.
    pub fn par_or(&mut self, others: &[&BitSliceIndex]) {
        let bits = others
            .iter()
            .map(|other| other.planes.len())
            .fold(self.planes.len(), usize::max);

        while self.planes.len() < bits {
            let mut plane = Bitmap::new();
            if self.run_optimized {
                plane.run_optimize();
            }
            self.planes.push(plane);
        }

        self.planes
            .par_iter_mut()
            .enumerate()
            .for_each(|(j, plane)| {
                for other in others {
                    // Sources narrower than j simply contribute nothing.
                    if let Some(src) = other.planes.get(j) {
                        plane.or_inplace(src);
                    }
                }
            });

        for other in others {
            self.existence.or_inplace(&other.existence);
        }
    }

    /// Freshly allocated result bitmap, run-compressed when this index is
    fn result_bitmap(&self) -> Bitmap {
        let mut bitmap = Bitmap::new();
        if self.run_optimized {
            bitmap.run_optimize();
        }
        bitmap
    }
}

impl Default for BitSliceIndex {
    /// Auto-sizing index: no planes until the first write
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl Clone for BitSliceIndex {
    /// Deep copy; equivalent to retaining the full existence set
    fn clone(&self) -> Self {
        self.retain_set(&self.existence)
    }
}

impl PartialEq for BitSliceIndex {
    /// Semantic equality: existence bitmaps match and every plane matches,
    /// treating a missing plane as an empty one. Range hints and the
    /// run-compression flag are advisory and not compared.
    fn eq(&self, other: &Self) -> bool {
        if self.existence != other.existence {
            return false;
        }
        let empty = Bitmap::new();
        let width = self.planes.len().max(other.planes.len());
        for j in 0..width {
            let a = self.planes.get(j).unwrap_or(&empty);
            let b = other.planes.get(j).unwrap_or(&empty);
            if a != b {
                return false;
            }
        }
        true
    }
}

impl Eq for BitSliceIndex {}

impl std::fmt::Debug for BitSliceIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitSliceIndex")
            .field("cardinality", &self.existence.len())
            .field("bit_count", &self.planes.len())
            .field("max_value", &self.max_value)
            .field("min_value", &self.min_value)
            .finish()
    }
}
