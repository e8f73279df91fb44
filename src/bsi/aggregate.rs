//! Aggregation over a driver set
//!
//! `sum` never touches individual columns: each plane contributes its
//! intersection cardinality with the driver, shifted by the plane position.
//! `min_max` walks planes per column with the same sign-aware comparison the
//! predicate engine uses, carrying the best candidate through the batch.
//! The transpose operations invert the `column → value` mapping.

use rayon::prelude::*;
use tracing::debug;

use crate::bitmap::Bitmap;
use crate::bsi::{value_bit, BitSliceIndex, Operation};
use crate::error::{Error, Result};
use crate::executor;

impl BitSliceIndex {
    /// Sum of the values of the columns in `found_set`, plus the driver
    /// cardinality (handy for averaging)
    ///
    /// Plane contributions are computed in parallel and combined with
    /// wrapping arithmetic; overflow past `i64` is not detected.
    pub fn sum(&self, found_set: &Bitmap) -> (i64, u64) {
        let count = found_set.len();
        let sum = self
            .planes
            .par_iter()
            .enumerate()
            .map(|(j, plane)| {
                if j < 64 {
                    (found_set.and_cardinality(plane) << j) as i64
                } else {
                    0
                }
            })
            .reduce(|| 0, i64::wrapping_add);
        (sum, count)
    }

    /// Minimum ([`Operation::Min`]) or maximum ([`Operation::Max`]) value
    /// among the columns in `found_set`
    ///
    /// An empty driver yields the seed sentinel: `i64::MAX` for `Min`,
    /// `i64::MIN` for `Max`. Other operations return
    /// [`Error::UnsupportedOperation`].
    pub fn min_max(&self, parallelism: usize, op: Operation, found_set: &Bitmap) -> Result<i64> {
        if !matches!(op, Operation::Min | Operation::Max) {
            return Err(Error::UnsupportedOperation(op));
        }
        debug!(?op, cardinality = found_set.len(), "min_max");

        let workers = executor::worker_count(parallelism);
        let batches = executor::shard(found_set, workers);
        let candidates: Vec<i64> = batches
            .par_iter()
            .map(|batch| self.min_max_batch(op, batch))
            .collect();

        let mut best = if op == Operation::Max {
            i64::MIN
        } else {
            i64::MAX
        };
        for candidate in candidates {
            if (op == Operation::Max && candidate > best)
                || (op == Operation::Min && candidate <= best)
            {
                best = candidate;
            }
        }
        Ok(best)
    }

    /// Values of the columns in the existence set, as a bitmap of unsigned
    /// column ids
    ///
    /// Shorthand for [`intersect_and_transpose`] over all populated columns.
    ///
    /// [`intersect_and_transpose`]: BitSliceIndex::intersect_and_transpose
    pub fn transpose(&self) -> Bitmap {
        self.intersect_and_transpose(0, &self.existence)
    }

    /// Values of the columns in `found_set`, as a bitmap of unsigned column
    /// ids; duplicates collapse
    ///
    /// Useful for vectoring one set of integers through another: the result
    /// can drive a query against a second index keyed by these values.
    pub fn intersect_and_transpose(&self, parallelism: usize, found_set: &Bitmap) -> Bitmap {
        executor::parallel_query(parallelism, found_set, |batch| {
            let mut results = self.result_bitmap();
            for &column_id in batch {
                if let Some(value) = self.get_value(column_id) {
                    results.insert(value as u64);
                }
            }
            results
        })
    }

    /// Transpose with occurrence counts: the result index is keyed by the
    /// values found in `found_set` that are members of `filter_set`, and maps
    /// each to the number of columns producing it
    pub fn transpose_with_counts(
        &self,
        parallelism: usize,
        found_set: &Bitmap,
        filter_set: &Bitmap,
    ) -> BitSliceIndex {
        executor::parallel_query_index(parallelism, found_set, true, |batch| {
            let mut results = BitSliceIndex::default();
            if self.run_optimized {
                results.run_optimize();
            }
            for &column_id in batch {
                if let Some(value) = self.get_value(column_id) {
                    if !filter_set.contains(value as u64) {
                        continue;
                    }
                    let count = results.get_value(value as u64).unwrap_or(0);
                    results.set_value(value as u64, count + 1);
                }
            }
            results
        })
    }

    /// Scan one batch for its extreme value.
    ///
    /// The current best is the comparand; planes are walked high to low with
    /// the sign handled first, and the candidate value is accumulated along
    /// the way so an adoption is always the column's full value.
    fn min_max_batch(&self, op: Operation, batch: &[u64]) -> i64 {
        let bit_count = self.planes.len();
        let mut value: i64 = if op == Operation::Max {
            i64::MIN
        } else {
            i64::MAX
        };

        for &column_id in batch {
            let mut eq = true;
            let (mut lt, mut gt) = (false, false);
            let mut candidate = 0u64;
            let value_is_negative = bit_count == 64 && value < 0;

            let mut j = bit_count as isize - 1;
            let mut is_negative = false;
            if bit_count == 64 {
                is_negative = self.planes[63].contains(column_id);
                if is_negative {
                    candidate |= 1 << 63;
                }
                j -= 1;
            }
            let comp_value = if is_negative != value_is_negative {
                value.wrapping_neg()
            } else {
                value
            };

            while j >= 0 {
                let bit = j as usize;
                let stored = self.planes[bit].contains(column_id);
                if stored && bit < 64 {
                    candidate |= 1 << bit;
                }

                if eq {
                    if value_bit(comp_value, bit) {
                        if !stored {
                            eq = false;
                            if op == Operation::Max && value_is_negative && !is_negative {
                                gt = true;
                            }
                            if op == Operation::Min
                                && (!value_is_negative || value_is_negative == is_negative)
                            {
                                lt = true;
                            }
                        }
                    } else if stored {
                        eq = false;
                        if op == Operation::Min && is_negative && !value_is_negative {
                            lt = true;
                        }
                        if op == Operation::Max
                            && (value_is_negative || value_is_negative == is_negative)
                        {
                            gt = true;
                        }
                    }
                }

                j -= 1;
            }

            if lt || gt {
                value = candidate as i64;
            }
        }
        value
    }
}
