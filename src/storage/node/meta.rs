//! Meta block - the single source of truth for tree shape.

use std::fmt;

use crate::common::config::{KEY_SIZE, MAX_ORDER, META_SIZE, MIN_ORDER, VALUE_SIZE};
use crate::common::Offset;

use super::{read_u64, write_u64, NodeBlock};

/// Tree-wide metadata stored at file offset 0.
///
/// # Layout (72 bytes)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       8     order
/// 8       8     value_size
/// 16      8     key_size
/// 24      8     internal_node_num
/// 32      8     leaf_node_num
/// 40      8     height (internal levels, leaves excluded)
/// 48      8     slot (next free byte offset)
/// 56      8     root_offset
/// 64      8     leaf_offset (first leaf in key order)
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MetaBlock {
    pub order: usize,
    pub value_size: usize,
    pub key_size: usize,
    pub internal_node_num: usize,
    pub leaf_node_num: usize,
    pub height: usize,
    pub slot: Offset,
    pub root_offset: Offset,
    pub leaf_offset: Offset,
}

impl MetaBlock {
    /// Size of the meta block in bytes.
    pub const SIZE: usize = META_SIZE;

    /// Meta block for a file with nothing allocated yet.
    ///
    /// The slot cursor starts right after the meta block; counts, height
    /// and root/leaf offsets are filled in by the tree initializer.
    pub fn new(order: usize) -> Self {
        Self {
            order,
            value_size: VALUE_SIZE,
            key_size: KEY_SIZE,
            slot: Offset(META_SIZE as u64),
            ..Self::default()
        }
    }

    /// Hand out `size` bytes at the slot cursor and advance it.
    ///
    /// Offsets are never reused: nothing ever moves the cursor backwards.
    pub fn allocate(&mut self, size: usize) -> Offset {
        let offset = self.slot;
        self.slot = self.slot.advance(size);
        offset
    }

    /// Hand out one block sized for node kind `N` in this tree.
    pub fn allocate_node<N: NodeBlock>(&mut self) -> Offset {
        self.allocate(N::block_size(self.order))
    }

    /// Decode a meta block.
    ///
    /// # Panics
    /// Panics if `data.len() < MetaBlock::SIZE`.
    pub fn from_bytes(data: &[u8]) -> Self {
        assert!(data.len() >= Self::SIZE, "buffer too small for MetaBlock");

        Self {
            order: read_u64(data, 0) as usize,
            value_size: read_u64(data, 8) as usize,
            key_size: read_u64(data, 16) as usize,
            internal_node_num: read_u64(data, 24) as usize,
            leaf_node_num: read_u64(data, 32) as usize,
            height: read_u64(data, 40) as usize,
            slot: Offset(read_u64(data, 48)),
            root_offset: Offset(read_u64(data, 56)),
            leaf_offset: Offset(read_u64(data, 64)),
        }
    }

    /// Encode into the 72-byte on-disk form.
    pub fn to_bytes(&self) -> [u8; META_SIZE] {
        let mut data = [0u8; META_SIZE];
        write_u64(&mut data, 0, self.order as u64);
        write_u64(&mut data, 8, self.value_size as u64);
        write_u64(&mut data, 16, self.key_size as u64);
        write_u64(&mut data, 24, self.internal_node_num as u64);
        write_u64(&mut data, 32, self.leaf_node_num as u64);
        write_u64(&mut data, 40, self.height as u64);
        write_u64(&mut data, 48, self.slot.0);
        write_u64(&mut data, 56, self.root_offset.0);
        write_u64(&mut data, 64, self.leaf_offset.0);
        data
    }

    /// Check that this block describes a tree that fits in `file_len` bytes.
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self, file_len: u64) -> std::result::Result<(), String> {
        if !(MIN_ORDER..=MAX_ORDER).contains(&self.order) {
            return Err(format!("order {} out of range", self.order));
        }
        if self.key_size != KEY_SIZE {
            return Err(format!("key size {} (expected {})", self.key_size, KEY_SIZE));
        }
        if self.value_size != VALUE_SIZE {
            return Err(format!(
                "value size {} (expected {})",
                self.value_size, VALUE_SIZE
            ));
        }
        if self.height == 0 || self.internal_node_num == 0 || self.leaf_node_num == 0 {
            return Err(format!(
                "empty shape: height {}, {} internal, {} leaves",
                self.height, self.internal_node_num, self.leaf_node_num
            ));
        }

        let first_block = Offset(META_SIZE as u64);
        if self.slot < first_block {
            return Err(format!("slot {} inside the meta block", self.slot));
        }
        for (name, offset) in [("root", self.root_offset), ("leaf", self.leaf_offset)] {
            if offset < first_block || offset >= self.slot {
                return Err(format!("{} offset {} outside allocated space", name, offset));
            }
        }
        if file_len < self.slot.0 {
            return Err(format!(
                "file is {} bytes but slot cursor is at {}",
                file_len, self.slot.0
            ));
        }
        Ok(())
    }
}

impl fmt::Display for MetaBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Meta {{ order: {}, height: {}, internal: {}, leaves: {}, root: {}, first_leaf: {}, slot: {} }}",
            self.order,
            self.height,
            self.internal_node_num,
            self.leaf_node_num,
            self.root_offset,
            self.leaf_offset,
            self.slot
        )
    }
}
