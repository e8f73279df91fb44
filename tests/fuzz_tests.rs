//! Property-based tests for the bit-sliced index
//!
//! Uses proptest to drive randomized write sequences and check the algebraic
//! laws the index promises: last-write-wins reads, predicate partitioning,
//! range composition, aggregation against a naive model, and lossless
//! round trips through both wire forms.

use std::collections::BTreeMap;

use proptest::prelude::*;

use bitsliced::{BitSliceIndex, Bitmap, Operation};

// =============================================================================
// Test data strategies
// =============================================================================

/// Column ids drawn from a smallish range so overwrites actually happen
fn column_id() -> impl Strategy<Value = u64> {
    prop_oneof![
        0u64..64,
        0u64..4096,
        // a few ids from the far end of the space
        (u64::MAX - 1024)..u64::MAX,
    ]
}

/// Values spanning sign boundaries and magnitudes
fn value() -> impl Strategy<Value = i64> {
    prop_oneof![
        Just(0i64),
        -16i64..16,
        any::<i32>().prop_map(|v| v as i64),
        any::<i64>(),
        Just(i64::MIN),
        Just(i64::MAX),
    ]
}

/// A write workload whose end state doubles as a naive model
fn workload() -> impl Strategy<Value = Vec<(u64, i64)>> {
    prop::collection::vec((column_id(), value()), 1..60)
}

fn build(writes: &[(u64, i64)]) -> (BitSliceIndex, BTreeMap<u64, i64>) {
    let mut index = BitSliceIndex::new(i64::MAX, i64::MIN);
    let mut model = BTreeMap::new();
    for (column, value) in writes {
        index.set_value(*column, *value);
        model.insert(*column, *value);
    }
    (index, model)
}

fn ids(bitmap: &Bitmap) -> Vec<u64> {
    bitmap.iter().collect()
}

// =============================================================================
// Read-your-writes
// =============================================================================

proptest! {
    /// The latest write to a column is what reads back
    #[test]
    fn last_write_wins(writes in workload()) {
        let (index, model) = build(&writes);
        prop_assert_eq!(index.cardinality(), model.len() as u64);
        for (column, value) in &model {
            prop_assert_eq!(index.get_value(*column), Some(*value));
        }
    }

    /// Columns never written read as absent
    #[test]
    fn untouched_columns_are_absent(writes in workload(), probe in 4096u64..(u64::MAX - 1024)) {
        let (index, model) = build(&writes);
        if !model.contains_key(&probe) {
            prop_assert_eq!(index.get_value(probe), None);
            prop_assert!(!index.value_exists(probe));
        }
    }
}

// =============================================================================
// Predicate laws
// =============================================================================

proptest! {
    /// LT / EQ / GT partition the existence set for any pivot
    #[test]
    fn comparison_partitions_existence(writes in workload(), pivot in value()) {
        let (index, _) = build(&writes);
        let lt = index.compare_value(0, Operation::Lt, pivot, 0, None).unwrap();
        let eq = index.compare_value(0, Operation::Eq, pivot, 0, None).unwrap();
        let gt = index.compare_value(0, Operation::Gt, pivot, 0, None).unwrap();

        prop_assert_eq!(lt.and_cardinality(&eq), 0);
        prop_assert_eq!(lt.and_cardinality(&gt), 0);
        prop_assert_eq!(eq.and_cardinality(&gt), 0);

        let mut union = &lt | &eq;
        union.or_inplace(&gt);
        prop_assert_eq!(&union, index.existence_bitmap());
    }

    /// Every comparison matches naive filtering of the model
    #[test]
    fn comparisons_match_model(writes in workload(), pivot in value()) {
        let (index, model) = build(&writes);
        let cases: [(Operation, Box<dyn Fn(i64) -> bool>); 5] = [
            (Operation::Lt, Box::new(move |v| v < pivot)),
            (Operation::Le, Box::new(move |v| v <= pivot)),
            (Operation::Eq, Box::new(move |v| v == pivot)),
            (Operation::Ge, Box::new(move |v| v >= pivot)),
            (Operation::Gt, Box::new(move |v| v > pivot)),
        ];
        for (op, keep) in cases {
            let hits = index.compare_value(0, op, pivot, 0, None).unwrap();
            let expected: Vec<u64> = model
                .iter()
                .filter(|(_, v)| keep(**v))
                .map(|(c, _)| *c)
                .collect();
            prop_assert_eq!(ids(&hits), expected, "op {:?} pivot {}", op, pivot);
        }
    }

    /// RANGE equals the intersection of GE(start) and LE(end)
    #[test]
    fn range_composes_from_ge_and_le(writes in workload(), a in value(), b in value()) {
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        let (index, _) = build(&writes);

        let range = index.compare_value(0, Operation::Range, start, end, None).unwrap();
        let ge = index.compare_value(0, Operation::Ge, start, 0, None).unwrap();
        let le = index.compare_value(0, Operation::Le, end, 0, None).unwrap();
        prop_assert_eq!(range, &ge & &le);
    }

    /// batch_equal matches naive membership filtering
    #[test]
    fn batch_equal_matches_model(writes in workload(), targets in prop::collection::vec(value(), 0..8)) {
        let (index, model) = build(&writes);
        let hits = index.batch_equal(0, &targets);
        let expected: Vec<u64> = model
            .iter()
            .filter(|(_, v)| targets.contains(*v))
            .map(|(c, _)| *c)
            .collect();
        prop_assert_eq!(ids(&hits), expected);
    }
}

// =============================================================================
// Aggregation laws
// =============================================================================

proptest! {
    /// Sum over the existence set equals the wrapping sum of the model
    #[test]
    fn sum_matches_model(writes in workload()) {
        let (index, model) = build(&writes);
        let (sum, count) = index.sum(index.existence_bitmap());
        let expected = model.values().fold(0i64, |acc, v| acc.wrapping_add(*v));
        prop_assert_eq!(sum, expected);
        prop_assert_eq!(count, model.len() as u64);
    }

    /// min_max agrees with the model extremes
    #[test]
    fn min_max_matches_model(writes in workload()) {
        let (index, model) = build(&writes);
        let existence = index.existence_bitmap().clone();
        let min = index.min_max(0, Operation::Min, &existence).unwrap();
        let max = index.min_max(0, Operation::Max, &existence).unwrap();
        prop_assert_eq!(min, *model.values().min().unwrap());
        prop_assert_eq!(max, *model.values().max().unwrap());
    }

    /// Transpose emits exactly the distinct stored values (as unsigned ids)
    #[test]
    fn transpose_matches_model(writes in workload()) {
        let (index, model) = build(&writes);
        let transposed = index.transpose();
        let mut expected: Vec<u64> = model.values().map(|v| *v as u64).collect();
        expected.sort_unstable();
        expected.dedup();
        prop_assert_eq!(ids(&transposed), expected);
    }
}

// =============================================================================
// Mutation laws
// =============================================================================

proptest! {
    /// Incrementing a found set adds one to members, creates absentees at 1
    #[test]
    fn increment_law(writes in workload(), extra in prop::collection::btree_set(column_id(), 0..16)) {
        let (mut index, model) = build(&writes);
        let targets: Bitmap = extra.iter().copied().collect();
        index.increment(&targets);

        for column in &extra {
            let previous = model.get(column).copied().unwrap_or(0);
            prop_assert_eq!(index.get_value(*column), Some(previous.wrapping_add(1)));
        }
        for (column, value) in &model {
            if !extra.contains(column) {
                prop_assert_eq!(index.get_value(*column), Some(*value));
            }
        }
    }

    /// Retain keeps the intersection and reports the dropped count
    #[test]
    fn retain_law(writes in workload(), keep in prop::collection::btree_set(column_id(), 0..64)) {
        let (mut index, model) = build(&writes);
        let keep_bitmap: Bitmap = keep.iter().copied().collect();
        let expected_kept = model.keys().filter(|c| keep.contains(*c)).count() as u64;

        let dropped = index.retain(&keep_bitmap);
        prop_assert_eq!(dropped, model.len() as u64 - expected_kept);
        prop_assert_eq!(index.cardinality(), expected_kept);
        for (column, value) in &model {
            if keep.contains(column) {
                prop_assert_eq!(index.get_value(*column), Some(*value));
            } else {
                prop_assert_eq!(index.get_value(*column), None);
            }
        }
    }

    /// Merging an index into itself changes nothing
    #[test]
    fn par_or_idempotent(writes in workload()) {
        let (mut index, _) = build(&writes);
        let snapshot = index.clone();
        let copy = index.clone();
        index.par_or(&[&copy]);
        prop_assert_eq!(index, snapshot);
    }

    /// Column-wise add against a model of sums
    #[test]
    fn add_matches_model(left in workload(), right in workload()) {
        // mask magnitudes down so sums stay well inside 64 bits
        let clamp = |writes: Vec<(u64, i64)>| -> Vec<(u64, i64)> {
            writes.into_iter().map(|(c, v)| (c, v & 0x3fff_ffff)).collect()
        };
        let (mut a, model_a) = build(&clamp(left));
        let (b, model_b) = build(&clamp(right));

        a.add(&b);
        let mut expected = model_a.clone();
        for (column, value) in &model_b {
            *expected.entry(*column).or_insert(0) += *value;
        }
        for (column, value) in &expected {
            prop_assert_eq!(a.get_value(*column), Some(*value));
        }
        prop_assert_eq!(a.cardinality(), expected.len() as u64);
    }
}

// =============================================================================
// Serialization round trips
// =============================================================================

proptest! {
    /// Byte-array form round trips to an equal index
    #[test]
    fn marshal_round_trip(writes in workload()) {
        let (index, _) = build(&writes);
        let data = index.marshal_binary().unwrap();
        let mut restored = BitSliceIndex::default();
        restored.unmarshal_binary(&data).unwrap();
        prop_assert_eq!(&restored, &index);
    }

    /// Stream form round trips to an equal index
    #[test]
    fn stream_round_trip(writes in workload()) {
        let (index, _) = build(&writes);
        let mut stream = Vec::new();
        let written = index.write_to(&mut stream).unwrap();
        prop_assert_eq!(written as usize, stream.len());

        let mut restored = BitSliceIndex::default();
        let consumed = restored.read_from(&stream[..]).unwrap();
        prop_assert_eq!(consumed, written);
        prop_assert_eq!(&restored, &index);
    }
}
