//! Root-to-leaf descent, point lookup and paged range scans.

use tracing::trace;

use crate::common::{Error, Offset, Result};
use crate::index::{Key, Value};
use crate::storage::node::{InternalNode, LeafNode};

use super::BPlusTree;

/// One internal node visited on the way down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct PathStep {
    /// Offset of the internal node.
    pub node: Offset,
    /// Entry followed out of this node.
    pub index: usize,
    /// Live entries in the node when it was read.
    pub len: usize,
}

impl PathStep {
    /// True if the followed child has a sibling to its right under this node.
    #[inline]
    pub fn has_right(&self) -> bool {
        self.index + 1 < self.len
    }
}

/// The internal nodes from the root down to a leaf's parent, plus the leaf.
///
/// `steps[d]` is the internal node at depth `d`; a node at depth `d` has
/// its ancestors in `steps[..d]`. The leaf sits at depth `steps.len()`.
#[derive(Debug, Clone)]
pub(super) struct LeafPath {
    pub steps: Vec<PathStep>,
    pub leaf: Offset,
}

/// One page of a range scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeScan {
    /// Values in ascending key order.
    pub values: Vec<Value>,
    /// Key to pass as `left` to fetch the next page, if any remain.
    pub next: Option<Key>,
}

impl BPlusTree {
    /// Descend from the root to the leaf responsible for `key`.
    pub(super) fn find_path(&self, key: &Key) -> Result<LeafPath> {
        let mut steps = Vec::with_capacity(self.meta.height);
        let mut current = self.meta.root_offset;

        for _ in 0..self.meta.height {
            let node: InternalNode = self.read_node(current)?;
            if node.is_empty() {
                return Err(Error::CorruptNode {
                    offset: current,
                    reason: "internal node has no entries".to_string(),
                });
            }

            let index = node.route(key);
            steps.push(PathStep {
                node: current,
                index,
                len: node.len(),
            });
            current = node.entries[index].child;
        }

        trace!(%key, leaf = %current, depth = steps.len(), "descended");
        Ok(LeafPath {
            steps,
            leaf: current,
        })
    }

    /// Look up the value stored under `key`.
    ///
    /// # Errors
    /// - `Error::NotFound` if the key is absent
    pub fn search(&self, key: &Key) -> Result<Value> {
        let _session = self.store.session()?;

        let path = self.find_path(key)?;
        let leaf: LeafNode = self.read_node(path.leaf)?;
        match leaf.find(key) {
            Ok(at) => Ok(leaf.records[at].value),
            Err(_) => Err(Error::NotFound),
        }
    }

    /// Collect up to `max` values whose keys fall in `[left, right]`.
    ///
    /// When the page fills up while qualifying records remain, `next` holds
    /// the key of the first record not returned. Calling again with that key
    /// as `left` resumes exactly where this page stopped.
    ///
    /// # Errors
    /// - `Error::InvalidRange` if `left > right`
    ///
    /// # Example
    /// ```no_run
    /// use bptdb::{BPlusTree, Key};
    ///
    /// let tree = BPlusTree::open("index.db", false)?;
    /// let right = Key::new("t99")?;
    /// let mut left = Key::new("t00")?;
    /// loop {
    ///     let page = tree.search_range(&left, &right, 10)?;
    ///     println!("{:?}", page.values);
    ///     match page.next {
    ///         Some(next) => left = next,
    ///         None => break,
    ///     }
    /// }
    /// # Ok::<(), bptdb::Error>(())
    /// ```
    pub fn search_range(&self, left: &Key, right: &Key, max: usize) -> Result<RangeScan> {
        if left > right {
            return Err(Error::InvalidRange);
        }
        let _session = self.store.session()?;

        let path = self.find_path(left)?;
        let mut leaf: LeafNode = self.read_node(path.leaf)?;
        let mut at = leaf.lower_bound(left);
        let mut scan = RangeScan::default();

        loop {
            for record in &leaf.records[at..] {
                if record.key > *right {
                    return Ok(scan);
                }
                if scan.values.len() == max {
                    scan.next = Some(record.key);
                    return Ok(scan);
                }
                scan.values.push(record.value);
            }

            if leaf.next.is_none() {
                return Ok(scan);
            }
            let next = leaf.next;
            leaf = self.read_node(next)?;
            at = 0;
            trace!(leaf = %next, collected = scan.values.len(), "range scan next leaf");
        }
    }
}
