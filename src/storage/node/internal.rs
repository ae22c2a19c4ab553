//! Internal (routing) node.

use crate::common::config::{internal_block_size, ENTRY_SIZE, KEY_SIZE, NODE_HEADER_SIZE};
use crate::common::{Error, Offset, Result};
use crate::index::Key;

use super::{read_u64, write_u64, NodeBlock, NodeHeader};

/// One routing entry: a separator key and the child it follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub key: Key,
    pub child: Offset,
}

/// An internal node holding up to `order` entries.
///
/// Entry `i`'s key separates `entries[i].child` from `entries[i + 1].child`:
/// every key below it routes to child `i` or earlier. The last entry's
/// child is the right-most subtree and its key is unused (kept as
/// [`Key::EMPTY`]).
///
/// # Entry Layout (24 bytes, repeated `order` times after the header)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       16    key (zero padded)
/// 16      8     child offset
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalNode {
    pub parent: Offset,
    pub next: Offset,
    pub prev: Offset,
    pub entries: Vec<IndexEntry>,
}

impl InternalNode {
    /// Create an internal node with no entries.
    pub fn new(parent: Offset) -> Self {
        Self {
            parent,
            next: Offset::NONE,
            prev: Offset::NONE,
            entries: Vec::new(),
        }
    }

    /// Number of live entries (children).
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the child responsible for `key`.
    ///
    /// The first entry whose separator is strictly greater than `key` wins;
    /// the last entry is the fallback and its key is never consulted.
    ///
    /// # Panics
    /// Panics if the node has no entries.
    pub fn route(&self, key: &Key) -> usize {
        assert!(!self.entries.is_empty(), "routing through an empty internal node");
        let separators = &self.entries[..self.entries.len() - 1];
        separators.partition_point(|entry| entry.key <= *key)
    }

    /// Position of `child` among the entries.
    pub fn position_of(&self, child: Offset) -> Option<usize> {
        self.entries.iter().position(|entry| entry.child == child)
    }

    /// Replace the child at `index` with `left` and `right`, separated by
    /// `separator`.
    ///
    /// `left` keeps the old child's slot; the old separator (or the unused
    /// last key) moves to the new entry for `right`.
    pub fn split_child(&mut self, index: usize, separator: Key, right: Offset) {
        let old_key = self.entries[index].key;
        self.entries[index].key = separator;
        self.entries.insert(
            index + 1,
            IndexEntry {
                key: old_key,
                child: right,
            },
        );
    }

    /// Drop the child at `index` after it was merged into `index - 1`.
    ///
    /// The separator between the two disappears; the surviving entry takes
    /// over the separator that followed the removed child.
    ///
    /// # Panics
    /// Panics if `index` is 0 or out of bounds.
    pub fn remove_child(&mut self, index: usize) -> IndexEntry {
        assert!(
            index > 0 && index < self.entries.len(),
            "remove_child({}) on a node with {} entries",
            index,
            self.entries.len()
        );
        let removed = self.entries.remove(index);
        self.entries[index - 1].key = removed.key;
        removed
    }

    /// Make sure the unused last key is stored as empty.
    pub fn clear_last_key(&mut self) {
        if let Some(last) = self.entries.last_mut() {
            last.key = Key::EMPTY;
        }
    }

    /// Header for this node's current state.
    pub fn header(&self) -> NodeHeader {
        NodeHeader {
            parent: self.parent,
            next: self.next,
            prev: self.prev,
            count: self.entries.len() as u64,
        }
    }
}

impl NodeBlock for InternalNode {
    fn block_size(order: usize) -> usize {
        internal_block_size(order)
    }

    fn decode(buf: &[u8], order: usize, offset: Offset) -> Result<Self> {
        if buf.len() < internal_block_size(order) {
            return Err(Error::CorruptNode {
                offset,
                reason: format!("short block: {} bytes", buf.len()),
            });
        }

        let header = NodeHeader::from_bytes(buf);
        let count = header.count as usize;
        if count > order {
            return Err(Error::CorruptNode {
                offset,
                reason: format!("n = {} exceeds order {}", count, order),
            });
        }

        let entries = (0..count)
            .map(|i| {
                let at = NODE_HEADER_SIZE + i * ENTRY_SIZE;
                IndexEntry {
                    key: Key::from_raw(&buf[at..at + KEY_SIZE]),
                    child: Offset(read_u64(buf, at + KEY_SIZE)),
                }
            })
            .collect();

        Ok(Self {
            parent: header.parent,
            next: header.next,
            prev: header.prev,
            entries,
        })
    }

    fn encode_into(&self, buf: &mut [u8], order: usize) {
        assert!(
            self.entries.len() <= order,
            "internal node with {} entries exceeds order {}",
            self.entries.len(),
            order
        );
        self.header().write_to(buf);

        for (i, entry) in self.entries.iter().enumerate() {
            let at = NODE_HEADER_SIZE + i * ENTRY_SIZE;
            buf[at..at + KEY_SIZE].copy_from_slice(entry.key.raw());
            write_u64(buf, at + KEY_SIZE, entry.child.0);
        }
    }
}
