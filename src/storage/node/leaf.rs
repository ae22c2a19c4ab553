//! Leaf node.

use crate::common::config::{leaf_block_size, KEY_SIZE, NODE_HEADER_SIZE, RECORD_SIZE};
use crate::common::{Error, Offset, Result};
use crate::index::{Key, Value};

use super::{read_i32, write_i32, NodeBlock, NodeHeader};

/// One key/value record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record {
    pub key: Key,
    pub value: Value,
}

/// A leaf holding up to `order` records sorted by key.
///
/// Leaves form a doubly linked list in key order through `next`/`prev`.
///
/// # Record Layout (20 bytes, packed `order` times after the header)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       16    key (zero padded)
/// 16      4     value (i32, little-endian)
/// ```
///
/// The block is zero padded to a multiple of 8 bytes after the last slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafNode {
    pub parent: Offset,
    pub next: Offset,
    pub prev: Offset,
    pub records: Vec<Record>,
}

impl LeafNode {
    /// Create an empty leaf.
    pub fn new(parent: Offset) -> Self {
        Self {
            parent,
            next: Offset::NONE,
            prev: Offset::NONE,
            records: Vec::new(),
        }
    }

    /// Number of live records.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Binary search for `key`: `Ok(index)` on a hit, `Err(insert_at)` on a miss.
    pub fn find(&self, key: &Key) -> std::result::Result<usize, usize> {
        self.records.binary_search_by(|record| record.key.cmp(key))
    }

    /// Index of the first record whose key is not less than `key`.
    pub fn lower_bound(&self, key: &Key) -> usize {
        self.records.partition_point(|record| record.key < *key)
    }

    /// Insert a record in sorted position. The key must not be present.
    pub fn insert(&mut self, key: Key, value: Value) {
        match self.find(&key) {
            Ok(_) => panic!("insert of duplicate key {} into leaf", key),
            Err(at) => self.records.insert(at, Record { key, value }),
        }
    }

    /// First key in the leaf.
    pub fn first_key(&self) -> Option<Key> {
        self.records.first().map(|record| record.key)
    }

    /// Header for this leaf's current state.
    pub fn header(&self) -> NodeHeader {
        NodeHeader {
            parent: self.parent,
            next: self.next,
            prev: self.prev,
            count: self.records.len() as u64,
        }
    }
}

impl NodeBlock for LeafNode {
    fn block_size(order: usize) -> usize {
        leaf_block_size(order)
    }

    fn decode(buf: &[u8], order: usize, offset: Offset) -> Result<Self> {
        if buf.len() < leaf_block_size(order) {
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

        let records = (0..count)
            .map(|i| {
                let at = NODE_HEADER_SIZE + i * RECORD_SIZE;
                Record {
                    key: Key::from_raw(&buf[at..at + KEY_SIZE]),
                    value: read_i32(buf, at + KEY_SIZE),
                }
            })
            .collect();

        Ok(Self {
            parent: header.parent,
            next: header.next,
            prev: header.prev,
            records,
        })
    }

    fn encode_into(&self, buf: &mut [u8], order: usize) {
        assert!(
            self.records.len() <= order,
            "leaf with {} records exceeds order {}",
            self.records.len(),
            order
        );
        self.header().write_to(buf);

        for (i, record) in self.records.iter().enumerate() {
            let at = NODE_HEADER_SIZE + i * RECORD_SIZE;
            buf[at..at + KEY_SIZE].copy_from_slice(record.key.raw());
            write_i32(buf, at + KEY_SIZE, record.value);
        }
    }
}
