//! Predicate evaluation over the bit planes
//!
//! Comparisons never reconstruct full values. Each column is walked from the
//! most significant magnitude plane down to plane 0, probing one plane
//! membership per bit; a comparison side is decided at the first bit where
//! the stored value and its operand diverge, and the walk ends once every
//! side of the predicate is decided.
//!
//! Sign handling: with a 64-plane stack, plane 63 is consumed first to
//! classify the column as negative, and it does not take part in the
//! magnitude walk. When the column and the operand disagree in sign, the
//! operand is two's-complement negated so that the remaining planes compare
//! as magnitudes; the direction flags below then fold the sign cases back in.

use std::collections::HashSet;

use tracing::debug;

use crate::bitmap::Bitmap;
use crate::bsi::{value_bit, BitSliceIndex};
use crate::error::{Error, Result};
use crate::executor;

/// Query operation selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Less than
    Lt,
    /// Less than or equal
    Le,
    /// Equal
    Eq,
    /// Greater than or equal
    Ge,
    /// Greater than
    Gt,
    /// Closed range: `start <= value <= end`
    Range,
    /// Find the minimum value
    Min,
    /// Find the maximum value
    Max,
}

impl BitSliceIndex {
    /// Find the columns whose value satisfies `op` against `start`
    /// (and `end`, for [`Operation::Range`])
    ///
    /// `found_set` restricts the query to a driver set of column ids; `None`
    /// means all populated columns. `parallelism` is the worker count, with
    /// 0 meaning all available cores. Stored values outside the declared
    /// range make the result unreliable; see [`BitSliceIndex::new`].
    ///
    /// Only the comparison operations are accepted here; passing
    /// [`Operation::Min`] or [`Operation::Max`] returns
    /// [`Error::UnsupportedOperation`].
    pub fn compare_value(
        &self,
        parallelism: usize,
        op: Operation,
        start: i64,
        end: i64,
        found_set: Option<&Bitmap>,
    ) -> Result<Bitmap> {
        match op {
            Operation::Lt
            | Operation::Le
            | Operation::Eq
            | Operation::Ge
            | Operation::Gt
            | Operation::Range => {}
            other => return Err(Error::UnsupportedOperation(other)),
        }
        debug!(?op, start, end, "compare_value");

        let driver = found_set.unwrap_or(&self.existence);
        Ok(executor::parallel_query(parallelism, driver, |batch| {
            self.compare_batch(op, start, end, batch)
        }))
    }

    /// Find the columns whose value is one of `values`
    ///
    /// Values are probed per column via reconstruction, so this suits small
    /// to medium target lists rather than range-shaped predicates.
    pub fn batch_equal(&self, parallelism: usize, values: &[i64]) -> Bitmap {
        let targets: HashSet<i64> = values.iter().copied().collect();
        debug!(targets = targets.len(), "batch_equal");

        executor::parallel_query(parallelism, &self.existence, |batch| {
            let mut results = self.result_bitmap();
            for &column_id in batch {
                if let Some(value) = self.get_value(column_id) {
                    if targets.contains(&value) {
                        results.insert(column_id);
                    }
                }
            }
            results
        })
    }

    /// Evaluate one batch of column ids against the predicate.
    fn compare_batch(&self, op: Operation, start: i64, end: i64, batch: &[u64]) -> Bitmap {
        let mut results = self.result_bitmap();
        let bit_count = self.planes.len();
        let start_is_negative = bit_count == 64 && start < 0;
        let end_is_negative = bit_count == 64 && end < 0;
        let range = op == Operation::Range;

        for &column_id in batch {
            // eq tracks "still equal to the operand"; the direction flags
            // latch on the first divergent bit and stay put.
            let (mut eq1, mut eq2) = (true, true);
            let (mut lt1, mut lt2, mut gt1) = (false, false, false);

            let mut j = bit_count as isize - 1;
            let mut is_negative = false;
            if bit_count == 64 {
                is_negative = self.planes[63].contains(column_id);
                j -= 1;
            }
            let comp_start = if is_negative != start_is_negative {
                start.wrapping_neg()
            } else {
                start
            };
            let comp_end = if is_negative != end_is_negative {
                end.wrapping_neg()
            } else {
                end
            };

            while j >= 0 {
                let bit = j as usize;
                let stored = self.planes[bit].contains(column_id);

                if eq1 {
                    if value_bit(comp_start, bit) {
                        // operand bit set, stored bit clear: first divergence
                        if !stored {
                            if matches!(op, Operation::Gt | Operation::Ge | Operation::Range)
                                && start_is_negative
                                && !is_negative
                            {
                                gt1 = true;
                            }
                            if matches!(op, Operation::Lt | Operation::Le)
                                && (!start_is_negative || start_is_negative == is_negative)
                            {
                                lt1 = true;
                            }
                            eq1 = false;
                        }
                    } else if stored {
                        // operand bit clear, stored bit set
                        if matches!(op, Operation::Lt | Operation::Le)
                            && is_negative
                            && !start_is_negative
                        {
                            lt1 = true;
                        }
                        if matches!(op, Operation::Gt | Operation::Ge | Operation::Range)
                            && (start_is_negative || start_is_negative == is_negative)
                        {
                            gt1 = true;
                        }
                        eq1 = false;
                    }
                }

                if range && eq2 {
                    if value_bit(comp_end, bit) {
                        if !stored {
                            if !end_is_negative || end_is_negative == is_negative {
                                lt2 = true;
                            }
                            eq2 = false;
                        }
                    } else if stored {
                        if is_negative && !end_is_negative {
                            lt2 = true;
                        }
                        eq2 = false;
                    }
                }

                // Each side's flags latch on its first divergence; once both
                // sides are settled the remaining bits cannot matter.
                if !eq1 && (!range || !eq2) {
                    break;
                }
                j -= 1;
            }

            let emit = match op {
                Operation::Lt => lt1,
                Operation::Le => {
                    lt1 || (eq1 && (!start_is_negative || (start_is_negative && is_negative)))
                }
                Operation::Eq => eq1,
                Operation::Ge => {
                    gt1 || (eq1 && (start_is_negative || (!start_is_negative && !is_negative)))
                }
                Operation::Gt => gt1,
                // start side is GE's emission, end side is LE's with the end
                // flags, so a range is exactly GE(start) ∩ LE(end)
                Operation::Range => {
                    (gt1 || (eq1 && (start_is_negative || (!start_is_negative && !is_negative))))
                        && (lt2
                            || (eq2 && (!end_is_negative || (end_is_negative && is_negative))))
                }
                // Rejected before the fan-out in compare_value.
                Operation::Min | Operation::Max => unreachable!("validated in compare_value"),
            };
            if emit {
                results.insert(column_id);
            }
        }
        results
    }
}
