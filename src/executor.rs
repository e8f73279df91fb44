//! Parallel query execution
//!
//! Queries over the index are embarrassingly parallel: the driver bitmap is
//! split into batches of column ids, a worker evaluates each batch against
//! the (read-only) bit planes, and partial results are reduced by bitmap OR
//! or index addition. Work runs on rayon's thread pool with a fork-join
//! barrier per top-level operation.
//!
//! `parallelism == 0` resolves to the number of available hardware threads.

use rayon::prelude::*;
use tracing::debug;

use crate::bitmap::Bitmap;
use crate::bsi::BitSliceIndex;

/// Resolve a caller-supplied parallelism knob to a concrete worker count.
pub(crate) fn worker_count(parallelism: usize) -> usize {
    if parallelism == 0 {
        num_cpus::get()
    } else {
        parallelism
    }
}

/// Split the driver bitmap into `workers` batches of column ids.
///
/// Batches are `⌊cardinality / workers⌋` ids each; the final batch absorbs
/// the remainder. Batches are contiguous runs of the ascending id order.
pub(crate) fn shard(found_set: &Bitmap, workers: usize) -> Vec<Vec<u64>> {
    let ids: Vec<u64> = found_set.iter().collect();
    let batch_size = ids.len() / workers;

    let mut batches = Vec::with_capacity(workers);
    let mut rest = &ids[..];
    for _ in 0..workers.saturating_sub(1) {
        let (batch, tail) = rest.split_at(batch_size);
        batches.push(batch.to_vec());
        rest = tail;
    }
    batches.push(rest.to_vec());
    batches
}

/// Fan a batch worker out over the driver bitmap and OR the partial bitmaps.
pub(crate) fn parallel_query<F>(parallelism: usize, found_set: &Bitmap, each_batch: F) -> Bitmap
where
    F: Fn(&[u64]) -> Bitmap + Sync,
{
    let workers = worker_count(parallelism);
    let batches = shard(found_set, workers);
    debug!(
        workers,
        cardinality = found_set.len(),
        "dispatching bitmap-result query"
    );

    batches
        .par_iter()
        .map(|batch| each_batch(batch))
        .reduce(Bitmap::new, |mut acc, partial| {
            acc.or_inplace(&partial);
            acc
        })
}

/// Fan a batch worker out over the driver bitmap and merge the partial
/// indexes, by column-wise addition when `sum_results` is set, otherwise by
/// plane-wise OR.
pub(crate) fn parallel_query_index<F>(
    parallelism: usize,
    found_set: &Bitmap,
    sum_results: bool,
    each_batch: F,
) -> BitSliceIndex
where
    F: Fn(&[u64]) -> BitSliceIndex + Sync,
{
    let workers = worker_count(parallelism);
    let batches = shard(found_set, workers);
    debug!(
        workers,
        cardinality = found_set.len(),
        sum_results,
        "dispatching index-result query"
    );

    let partials: Vec<BitSliceIndex> = batches.par_iter().map(|batch| each_batch(batch)).collect();

    let mut results = BitSliceIndex::default();
    if sum_results {
        for partial in &partials {
            results.add(partial);
        }
    } else {
        let refs: Vec<&BitSliceIndex> = partials.iter().collect();
        results.par_or(&refs);
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_count_zero_means_all_cores() {
        assert_eq!(worker_count(0), num_cpus::get());
        assert_eq!(worker_count(3), 3);
    }

    #[test]
    fn test_shard_covers_all_ids_exactly_once() {
        let found: Bitmap = (0u64..103).collect();
        let batches = shard(&found, 4);
        assert_eq!(batches.len(), 4);
        // first three batches get 103 / 4 = 25 ids, the last one 28
        assert_eq!(batches[0].len(), 25);
        assert_eq!(batches[3].len(), 28);

        let mut all: Vec<u64> = batches.into_iter().flatten().collect();
        all.sort_unstable();
        assert_eq!(all, (0u64..103).collect::<Vec<_>>());
    }

    #[test]
    fn test_shard_small_driver() {
        let found: Bitmap = [5u64, 9].into_iter().collect();
        let batches = shard(&found, 8);
        assert_eq!(batches.len(), 8);
        let total: usize = batches.iter().map(Vec::len).sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn test_parallel_query_reduces_by_or() {
        let found: Bitmap = (0u64..1000).collect();
        // keep even ids only
        let evens = parallel_query(4, &found, |batch| {
            batch.iter().copied().filter(|id| id % 2 == 0).collect()
        });
        assert_eq!(evens.len(), 500);
        assert!(evens.contains(42));
        assert!(!evens.contains(43));
    }
}
