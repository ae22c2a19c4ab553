//! Binary node codec.
//!
//! Converts between decoded node values and their fixed-size byte blocks:
//! - [`MetaBlock`] - Tree shape record at file offset 0
//! - [`NodeHeader`] - parent/next/prev/count prefix shared by both node kinds
//! - [`InternalNode`] - Separator keys and child offsets
//! - [`LeafNode`] - Sorted key/value records
//!
//! All integers are little-endian. Blocks are not self-describing: the
//! caller decides whether an offset holds an internal node or a leaf from
//! its position in the tree.

mod header;
mod internal;
mod leaf;
mod meta;

pub use header::NodeHeader;
pub use internal::{IndexEntry, InternalNode};
pub use leaf::{LeafNode, Record};
pub use meta::MetaBlock;

use crate::common::{Offset, Result};

/// A node kind that can be encoded into and decoded from a block.
pub trait NodeBlock: Sized {
    /// On-disk size of one block of this kind.
    fn block_size(order: usize) -> usize;

    /// Decode a block read from `offset`.
    ///
    /// # Errors
    /// Returns `Error::CorruptNode` if the live count exceeds `order`.
    fn decode(buf: &[u8], order: usize, offset: Offset) -> Result<Self>;

    /// Encode into a zeroed buffer of `Self::block_size(order)` bytes.
    fn encode_into(&self, buf: &mut [u8], order: usize);

    /// Encode into a freshly allocated block.
    fn encode(&self, order: usize) -> Vec<u8> {
        let mut buf = vec![0u8; Self::block_size(order)];
        self.encode_into(&mut buf, order);
        buf
    }
}

#[inline]
pub(crate) fn read_u64(buf: &[u8], at: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(bytes)
}

#[inline]
pub(crate) fn write_u64(buf: &mut [u8], at: usize, value: u64) {
    buf[at..at + 8].copy_from_slice(&value.to_le_bytes());
}

#[inline]
pub(crate) fn read_i32(buf: &[u8], at: usize) -> i32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[at..at + 4]);
    i32::from_le_bytes(bytes)
}

#[inline]
pub(crate) fn write_i32(buf: &mut [u8], at: usize, value: i32) {
    buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
}
