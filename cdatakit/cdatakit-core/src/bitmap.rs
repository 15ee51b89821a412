//! Validity bitmap addressing.
//!
//! Bit `i` lives at bit `i % 8` of byte `i / 8` (least significant bit first).
//! A set bit marks the row as valid, a cleared bit marks it null.

use crate::error::{NodeError, index_out_of_range};

/// Number of bytes needed to hold `bits` bits.
pub const fn bytes_for(bits: usize) -> usize {
    bits.div_ceil(8)
}

/// # Panics
/// Panics if `i / 8` is out of bounds for `bits`.
#[inline]
pub fn get_bit(bits: &[u8], i: usize) -> bool {
    bits[i / 8] & (1 << (i % 8)) != 0
}

/// # Panics
/// Panics if `i / 8` is out of bounds for `bits`.
#[inline]
pub fn set_bit(bits: &mut [u8], i: usize) {
    bits[i / 8] |= 1 << (i % 8);
}

/// # Panics
/// Panics if `i / 8` is out of bounds for `bits`.
#[inline]
pub fn unset_bit(bits: &mut [u8], i: usize) {
    bits[i / 8] &= !(1 << (i % 8));
}

/// Bounds-checked lookup of logical `row` in a bitmap that starts at `offset`.
pub(crate) fn validity_bit(
    bits: &[u8],
    offset: usize,
    len: usize,
    row: usize,
) -> Result<bool, NodeError> {
    if row >= len {
        return Err(index_out_of_range("row", row, len));
    }
    let bit = offset.saturating_add(row);
    if bit / 8 >= bits.len() {
        return Err(index_out_of_range(
            "validity bit",
            bit,
            bits.len().saturating_mul(8),
        ));
    }
    Ok(get_bit(bits, bit))
}

/// Mutable view over the validity bitmap of one array node.
///
/// Rows are logical: row `j` maps to bit `offset + j`. Writes through this
/// view do not touch the array's `null_count`; use
/// [`ArrayMut::set_valid`](crate::ArrayMut::set_valid) for incremental
/// maintenance or [`ArrayMut::recompute_null_count`](crate::ArrayMut::recompute_null_count)
/// afterwards.
#[derive(Debug)]
pub struct ValidityBitmap<'a> {
    bits: &'a mut [u8],
    offset: usize,
    len: usize,
}

impl<'a> ValidityBitmap<'a> {
    pub fn new(bits: &'a mut [u8], offset: usize, len: usize) -> Result<Self, NodeError> {
        let needed = offset
            .checked_add(len)
            .map(bytes_for)
            .ok_or(NodeError::LengthOverflow { what: "offset + length" })?;
        if needed > bits.len() {
            return Err(index_out_of_range("validity byte", needed - 1, bits.len()));
        }
        Ok(Self { bits, offset, len })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_valid(&self, row: usize) -> Result<bool, NodeError> {
        validity_bit(self.bits, self.offset, self.len, row)
    }

    /// Set or clear the bit for `row`, returning its previous state.
    pub fn set_valid(&mut self, row: usize, valid: bool) -> Result<bool, NodeError> {
        let previous = self.is_valid(row)?;
        let bit = self.offset + row;
        if valid {
            set_bit(self.bits, bit);
        } else {
            unset_bit(self.bits, bit);
        }
        Ok(previous)
    }

    /// Mark every row valid.
    pub fn set_all_valid(&mut self) {
        for bit in self.offset..self.offset + self.len {
            set_bit(self.bits, bit);
        }
    }

    pub fn null_count(&self) -> usize {
        (self.offset..self.offset + self.len)
            .filter(|&bit| !get_bit(self.bits, bit))
            .count()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.bits
    }
}
