//! bitsliced - Bit-sliced index over roaring bitmaps
//!
//! A bit-sliced index (BSI) stores a `column id → signed 64-bit value`
//! mapping as one roaring bitmap per value bit plus an existence bitmap.
//! Compared with one bitmap per distinct value, the bit-sliced layout keeps
//! high-cardinality columns compact and lets range predicates, sums and
//! min/max run as bitmap operations over at most 64 planes:
//!
//! - Predicates: `<`, `<=`, `=`, `>=`, `>` and closed ranges, plus batched
//!   equality against a value list
//! - Aggregation: sum, min/max, transpose (value extraction), transpose with
//!   occurrence counts
//! - Arithmetic: column-wise addition of another index, increments
//! - Set surgery: clear, retain, filtered deep copies, plane-wise merge
//! - Serialization: byte-array and streaming wire forms
//!
//! Queries fan out over rayon workers; the index itself performs no locking,
//! so concurrent mutation must be serialized by the caller.
//!
//! # Example
//!
//! ```rust
//! use bitsliced::{BitSliceIndex, Operation};
//!
//! let mut index = BitSliceIndex::default();
//! for (column, value) in [(1u64, 50i64), (2, -20), (3, 75)] {
//!     index.set_value(column, value);
//! }
//!
//! // columns with value in -20..=60
//! let hits = index
//!     .compare_value(0, Operation::Range, -20, 60, None)
//!     .unwrap();
//! assert_eq!(hits.iter().collect::<Vec<_>>(), vec![1, 2]);
//!
//! let (sum, count) = index.sum(index.existence_bitmap());
//! assert_eq!((sum, count), (105, 3));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bitmap;
pub mod bsi;
pub mod error;
mod executor;

// Re-export main types
pub use bitmap::Bitmap;
pub use bsi::{BitSliceIndex, Operation};
pub use error::{Error, Result};
