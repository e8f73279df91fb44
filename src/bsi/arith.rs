//! Column-wise arithmetic on the bit planes
//!
//! Addition works digit by digit: XOR writes the sum bit for a plane, AND
//! captures the carry set, and the carry ripples into the next plane. The
//! plane stack widens as carries overflow the current width, so sums past
//! the declared range keep all their bits; whether that widened value is
//! still meaningful to read back as an `i64` is the caller's concern.

use crate::bitmap::Bitmap;
use crate::bsi::BitSliceIndex;

impl BitSliceIndex {
    /// Column-wise in-place sum of `other` into this index
    ///
    /// Columns present in only one side keep their value; columns present in
    /// both hold the sum afterwards.
    pub fn add(&mut self, other: &BitSliceIndex) {
        self.existence.or_inplace(&other.existence);
        for (j, plane) in other.planes.iter().enumerate() {
            self.add_digit(plane, j);
        }
    }

    /// Add one to the value of every column in `found_set`
    ///
    /// Columns not yet in the index enter it with value 1.
    pub fn increment(&mut self, found_set: &Bitmap) {
        self.add_digit(found_set, 0);
        self.existence.or_inplace(found_set);
    }

    /// Add one to every value in the index
    pub fn increment_all(&mut self) {
        let all = self.existence.clone();
        self.increment(&all);
    }

    /// Ripple-carry addition of a digit set into plane `index`
    ///
    /// Columns in `digit` get a one added at bit `index`. Carries propagate
    /// upward iteratively; the loop terminates because each carry set is the
    /// intersection of the previous one with a plane, and the stack grows to
    /// absorb the final carry.
    fn add_digit(&mut self, digit: &Bitmap, index: usize) {
        let mut digit = digit.clone();
        let mut j = index;
        loop {
            if j >= self.planes.len() {
                self.planes.push(Bitmap::new());
            }
            let carry = &self.planes[j] & &digit;
            self.planes[j].xor_inplace(&digit);
            if carry.is_empty() {
                break;
            }
            digit = carry;
            j += 1;
        }
    }
}
