//! Bitmap wrapper for the index
//!
//! The index stores column ids in 64-bit roaring bitmaps. This module wraps
//! [`roaring::RoaringTreemap`] behind a small surface so the rest of the crate
//! (and downstream callers) only depend on the operations the index actually
//! needs: membership, set algebra, cardinality, iteration, run compression,
//! and (de)serialization.
//!
//! # Example
//!
//! ```rust
//! use bitsliced::Bitmap;
//!
//! let mut bitmap = Bitmap::new();
//! bitmap.insert(10);
//! bitmap.insert(1_000_000_000_000);
//!
//! assert!(bitmap.contains(10));
//! assert!(!bitmap.contains(50));
//! assert_eq!(bitmap.len(), 2);
//! ```

use std::fmt;
use std::io::{Read, Write};
use std::ops::{BitAnd, BitOr, BitXor, Sub};

use roaring::RoaringTreemap;

/// Compressed bitmap of 64-bit column ids
///
/// A thin wrapper over a roaring treemap. Cloning is a deep copy; equality is
/// set equality. Read operations take `&self` and are safe to call from many
/// threads at once.
#[derive(Clone, Default, PartialEq)]
pub struct Bitmap {
    inner: RoaringTreemap,
}

impl Bitmap {
    /// Create an empty bitmap
    pub fn new() -> Self {
        Self {
            inner: RoaringTreemap::new(),
        }
    }

    /// Test whether `column_id` is a member
    #[inline]
    pub fn contains(&self, column_id: u64) -> bool {
        self.inner.contains(column_id)
    }

    /// Add `column_id` to the set. Returns true if it was not already present.
    #[inline]
    pub fn insert(&mut self, column_id: u64) -> bool {
        self.inner.insert(column_id)
    }

    /// Remove `column_id` from the set. Returns true if it was present.
    #[inline]
    pub fn remove(&mut self, column_id: u64) -> bool {
        self.inner.remove(column_id)
    }

    /// Number of members
    pub fn len(&self) -> u64 {
        self.inner.len()
    }

    /// True when no bits are set
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// In-place intersection
    pub fn and_inplace(&mut self, other: &Bitmap) {
        self.inner &= &other.inner;
    }

    /// In-place union
    pub fn or_inplace(&mut self, other: &Bitmap) {
        self.inner |= &other.inner;
    }

    /// In-place symmetric difference
    pub fn xor_inplace(&mut self, other: &Bitmap) {
        self.inner ^= &other.inner;
    }

    /// In-place difference (remove every member of `other`)
    pub fn and_not_inplace(&mut self, other: &Bitmap) {
        self.inner -= &other.inner;
    }

    /// Cardinality of the intersection with `other`
    pub fn and_cardinality(&self, other: &Bitmap) -> u64 {
        (&self.inner & &other.inner).len()
    }

    /// Ask the underlying containers to use run-length encoding where it wins
    pub fn run_optimize(&mut self) {
        self.inner.optimize();
    }

    /// Estimated serialized size in bytes
    pub fn size_in_bytes(&self) -> usize {
        self.inner.serialized_size()
    }

    /// Iterate members in ascending order
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.inner.iter()
    }

    /// Serialize to a standalone byte buffer
    pub fn to_bytes(&self) -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.inner.serialized_size());
        self.inner.serialize_into(&mut buf)?;
        Ok(buf)
    }

    /// Deserialize from a buffer produced by [`Bitmap::to_bytes`]
    pub fn from_bytes(bytes: &[u8]) -> std::io::Result<Self> {
        Ok(Self {
            inner: RoaringTreemap::deserialize_from(bytes)?,
        })
    }

    /// Write the serialized bitmap to a stream, returning the bytes written
    ///
    /// The format is self-delimiting: bitmaps written back to back can be
    /// read back one at a time with [`Bitmap::read_into`].
    pub fn write_into<W: Write>(&self, writer: W) -> std::io::Result<u64> {
        let size = self.inner.serialized_size() as u64;
        self.inner.serialize_into(writer)?;
        Ok(size)
    }

    /// Read one framed bitmap from a stream
    pub fn read_into<R: Read>(reader: R) -> std::io::Result<Self> {
        Ok(Self {
            inner: RoaringTreemap::deserialize_from(reader)?,
        })
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("cardinality", &self.inner.len())
            .finish()
    }
}

impl Eq for Bitmap {}

impl FromIterator<u64> for Bitmap {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        Self {
            inner: RoaringTreemap::from_iter(iter),
        }
    }
}

impl BitAnd for &Bitmap {
    type Output = Bitmap;

    fn bitand(self, rhs: Self) -> Bitmap {
        Bitmap {
            inner: &self.inner & &rhs.inner,
        }
    }
}

impl BitOr for &Bitmap {
    type Output = Bitmap;

    fn bitor(self, rhs: Self) -> Bitmap {
        Bitmap {
            inner: &self.inner | &rhs.inner,
        }
    }
}

impl BitXor for &Bitmap {
    type Output = Bitmap;

    fn bitxor(self, rhs: Self) -> Bitmap {
        Bitmap {
            inner: &self.inner ^ &rhs.inner,
        }
    }
}

impl Sub for &Bitmap {
    type Output = Bitmap;

    fn sub(self, rhs: Self) -> Bitmap {
        Bitmap {
            inner: &self.inner - &rhs.inner,
        }
    }
}
