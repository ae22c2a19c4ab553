//! Layout constants and tree configuration for bptdb.
//!
//! The constants describe the bit-exact on-disk format. Every block size is
//! derived from them plus the tree order, so changing any of them produces
//! files that older builds cannot read.

use crate::common::{Error, Result};

/// Size of a key buffer in bytes (15 usable bytes + NUL terminator).
pub const KEY_SIZE: usize = 16;

/// Size of a stored value in bytes (`i32`).
pub const VALUE_SIZE: usize = 4;

/// Size of an on-disk offset field in bytes.
pub const OFFSET_SIZE: usize = 8;

/// Size of the meta block at file offset 0.
///
/// Nine 8-byte fields: order, value size, key size, internal node count,
/// leaf node count, height, slot cursor, root offset, first leaf offset.
pub const META_SIZE: usize = 9 * 8;

/// Size of the header shared by internal and leaf blocks.
///
/// Four 8-byte fields: parent, next, prev, live count.
pub const NODE_HEADER_SIZE: usize = 4 * 8;

/// Size of one internal entry: key + child offset.
pub const ENTRY_SIZE: usize = KEY_SIZE + OFFSET_SIZE;

/// Size of one leaf record: key + value, packed to 4-byte alignment.
pub const RECORD_SIZE: usize = KEY_SIZE + VALUE_SIZE;

/// Default tree order (max children per internal node, max records per leaf).
pub const DEFAULT_ORDER: usize = 4;

/// Smallest order for which split and merge arithmetic stays valid.
pub const MIN_ORDER: usize = 3;

/// Largest accepted order.
pub const MAX_ORDER: usize = 4096;

/// Size in bytes of an internal block for the given order.
///
/// # Memory Layout
/// ```text
/// ┌──────────────────────┬──────────┬──────────┬─────┬──────────────┐
/// │ header (32 bytes)    │ entry 0  │ entry 1  │ ... │ entry order-1│
/// │ parent|next|prev|n   │ 24 bytes │ 24 bytes │     │ 24 bytes     │
/// └──────────────────────┴──────────┴──────────┴─────┴──────────────┘
/// ```
#[inline]
pub const fn internal_block_size(order: usize) -> usize {
    NODE_HEADER_SIZE + ENTRY_SIZE * order
}

/// Size in bytes of a leaf block for the given order.
///
/// Records are 20 bytes each; the block is padded up to a multiple of 8 so
/// it keeps the 8-byte alignment of its header fields.
///
/// ```text
/// ┌──────────────────────┬──────────┬─────┬───────────────┬─────────┐
/// │ header (32 bytes)    │ record 0 │ ... │ record order-1│ pad 0/4 │
/// │ parent|next|prev|n   │ 20 bytes │     │ 20 bytes      │         │
/// └──────────────────────┴──────────┴─────┴───────────────┴─────────┘
/// ```
#[inline]
pub const fn leaf_block_size(order: usize) -> usize {
    let raw = NODE_HEADER_SIZE + RECORD_SIZE * order;
    (raw + 7) & !7
}

/// What to do when an existing file's meta block fails validation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryPolicy {
    /// Log a warning and initialize a fresh empty tree over the file.
    #[default]
    Reinitialize,
    /// Return `Error::CorruptMeta` to the caller and leave the file alone.
    FailFast,
}

/// Options used when opening a tree.
///
/// # Example
/// ```
/// use bptdb::{RecoveryPolicy, TreeConfig};
///
/// let config = TreeConfig::default()
///     .with_order(20)
///     .with_recovery(RecoveryPolicy::FailFast);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeConfig {
    /// Order used when a fresh tree is initialized. An existing file keeps
    /// the order recorded in its meta block.
    pub order: usize,
    /// Policy for a meta block that fails validation.
    pub recovery: RecoveryPolicy,
    /// Call `sync_data` at the end of every mutating operation.
    pub sync_writes: bool,
}

impl TreeConfig {
    /// Set the order for freshly initialized trees.
    pub fn with_order(mut self, order: usize) -> Self {
        self.order = order;
        self
    }

    /// Set the corrupt-meta recovery policy.
    pub fn with_recovery(mut self, recovery: RecoveryPolicy) -> Self {
        self.recovery = recovery;
        self
    }

    /// Enable or disable a data sync after each mutation.
    pub fn with_sync_writes(mut self, sync_writes: bool) -> Self {
        self.sync_writes = sync_writes;
        self
    }

    /// Check that the configuration describes a buildable tree.
    ///
    /// # Errors
    /// Returns `Error::InvalidOrder` if `order` is outside
    /// `MIN_ORDER..=MAX_ORDER`.
    pub fn validate(&self) -> Result<()> {
        if (MIN_ORDER..=MAX_ORDER).contains(&self.order) {
            Ok(())
        } else {
            Err(Error::InvalidOrder(self.order))
        }
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            order: DEFAULT_ORDER,
            recovery: RecoveryPolicy::Reinitialize,
            sync_writes: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_sizes() {
        assert_eq!(META_SIZE, 72);
        assert_eq!(NODE_HEADER_SIZE, 32);
        assert_eq!(ENTRY_SIZE, 24);
        assert_eq!(RECORD_SIZE, 20);
        assert_eq!(internal_block_size(4), 128);
        assert_eq!(internal_block_size(20), 512);
    }

    #[test]
    fn test_leaf_block_size_keeps_eight_byte_alignment() {
        assert_eq!(leaf_block_size(4), 112);
        assert_eq!(leaf_block_size(20), 432);
        // 32 + 20 * 3 = 92, padded to 96
        assert_eq!(leaf_block_size(3), 96);
        assert_eq!(leaf_block_size(5), 136);
        for order in MIN_ORDER..64 {
            assert_eq!(leaf_block_size(order) % 8, 0);
            assert!(leaf_block_size(order) >= NODE_HEADER_SIZE + RECORD_SIZE * order);
        }
    }

    #[test]
    fn test_default_config() {
        let config = TreeConfig::default();
        assert_eq!(config.order, DEFAULT_ORDER);
        assert_eq!(config.recovery, RecoveryPolicy::Reinitialize);
        assert!(!config.sync_writes);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_order_bounds() {
        assert!(TreeConfig::default().with_order(MIN_ORDER).validate().is_ok());
        assert!(TreeConfig::default().with_order(MAX_ORDER).validate().is_ok());

        match TreeConfig::default().with_order(2).validate() {
            Err(Error::InvalidOrder(2)) => {}
            other => panic!("Expected InvalidOrder, got {:?}", other),
        }
        assert!(TreeConfig::default()
            .with_order(MAX_ORDER + 1)
            .validate()
            .is_err());
    }
}
