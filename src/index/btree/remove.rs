//! Deletion with borrow/merge rebalancing.
//!
//! After a record is removed, an underfull node is repaired bottom-up:
//!
//! 1. **Borrow** one entry from the previous sibling, else the next one.
//!    Siblings are found through the `prev`/`next` links, so a lender may
//!    sit under a different parent. The separator that changes is the one in
//!    the lowest common ancestor of the two nodes.
//! 2. **Merge** with a sibling under the same parent when neither can lend.
//!    The right-most child folds into its left neighbour; any other child
//!    absorbs its right neighbour. The parent loses one entry and the
//!    repair continues one level up.
//! 3. **Collapse** the root when it is left with a single internal child.
//!
//! ```text
//! borrow from left              merge (right-most child)
//!   [.. 02 | 05]                  P: [.. s, ·] [E, ·]     P: [.. E, ·]
//!   [00 01 02]  [05]                  [a b]  ◀──▶ [c]   →    [a b c]
//! → [00 01]  [02 05]
//! ```
//!
//! Nodes are minimum `order / 2` (leaves) or `ceil(order / 2)` (internal);
//! the sole leaf and the root are exempt.

use tracing::debug;

use crate::common::{Error, Offset, Result};
use crate::index::Key;
use crate::storage::node::{IndexEntry, InternalNode, LeafNode};

use super::search::PathStep;
use super::BPlusTree;

/// Separator slot at the lowest common ancestor of the node at `depth` and
/// its previous sibling.
///
/// # Panics
/// Panics if the node is the left-most at its level.
fn left_separator(steps: &[PathStep], depth: usize) -> (Offset, usize) {
    match steps[..depth].iter().rev().find(|step| step.index > 0) {
        Some(step) => (step.node, step.index - 1),
        None => panic!("node at depth {} has a left sibling but no common ancestor", depth),
    }
}

/// Separator slot at the lowest common ancestor of the node at `depth` and
/// its next sibling.
///
/// # Panics
/// Panics if the node is the right-most at its level.
fn right_separator(steps: &[PathStep], depth: usize) -> (Offset, usize) {
    match steps[..depth].iter().rev().find(|step| step.has_right()) {
        Some(step) => (step.node, step.index),
        None => panic!("node at depth {} has a right sibling but no common ancestor", depth),
    }
}

/// The two same-parent nodes taking part in a merge.
struct MergePair<N> {
    left_offset: Offset,
    left: N,
    right_offset: Offset,
    right: N,
    /// Position of `right` in the parent.
    right_index: usize,
}

/// Pick the merge partner for `node` under `parent`.
///
/// `prev`/`next` are the already-read neighbours through the sibling links;
/// the same-parent one must be among them.
fn merge_pair<N: SiblingLinks>(
    parent: PathStep,
    offset: Offset,
    node: N,
    prev: Option<N>,
    next: Option<N>,
) -> MergePair<N> {
    assert!(parent.len > 1, "underfull node {} is an only child", offset);

    if parent.has_right() {
        let right_offset = node.next();
        match next {
            Some(right) => MergePair {
                left_offset: offset,
                left: node,
                right_offset,
                right,
                right_index: parent.index + 1,
            },
            None => panic!("node {} has no next sibling", offset),
        }
    } else {
        let left_offset = node.prev();
        match prev {
            Some(left) => MergePair {
                left_offset,
                left,
                right_offset: offset,
                right: node,
                right_index: parent.index,
            },
            None => panic!("node {} has no previous sibling", offset),
        }
    }
}

impl BPlusTree {
    /// Remove the record stored under `key`.
    ///
    /// # Errors
    /// - `Error::NotFound` if the key is absent; nothing is written
    pub fn remove(&mut self, key: &Key) -> Result<()> {
        let _session = self.store.session()?;
        let before = self.meta;

        let path = self.find_path(key)?;
        let mut leaf: LeafNode = self.read_node(path.leaf)?;
        let at = leaf.find(key).map_err(|_| Error::NotFound)?;
        leaf.records.remove(at);

        if leaf.len() >= self.leaf_min() {
            self.write_node(path.leaf, &leaf)?;
        } else {
            self.rebalance_leaf(&path.steps, path.leaf, leaf)?;
        }

        if self.meta != before {
            self.write_meta()?;
        }
        self.finish_mutation()
    }

    fn leaf_min(&self) -> usize {
        if self.meta.leaf_node_num == 1 {
            0
        } else {
            self.order() / 2
        }
    }

    fn internal_min(&self) -> usize {
        self.order().div_ceil(2)
    }

    /// Repair an underfull leaf at depth `steps.len()`.
    fn rebalance_leaf(
        &mut self,
        steps: &[PathStep],
        offset: Offset,
        mut leaf: LeafNode,
    ) -> Result<()> {
        let depth = steps.len();
        let half = self.order() / 2;

        let mut prev: Option<LeafNode> = None;
        if leaf.prev.is_some() {
            let mut lender: LeafNode = self.read_node(leaf.prev)?;
            if lender.len() > half {
                let record = lender.records.remove(lender.len() - 1);
                leaf.records.insert(0, record);
                self.write_node(leaf.prev, &lender)?;
                self.write_node(offset, &leaf)?;
                self.replace_separator(left_separator(steps, depth), record.key)?;
                debug!(
                    leaf = %offset,
                    lender = %leaf.prev,
                    key = %record.key,
                    "borrowed from left leaf"
                );
                return Ok(());
            }
            prev = Some(lender);
        }

        let mut next: Option<LeafNode> = None;
        if leaf.next.is_some() {
            let mut lender: LeafNode = self.read_node(leaf.next)?;
            if lender.len() > half {
                let record = lender.records.remove(0);
                leaf.records.push(record);
                let new_first = lender.records[0].key;
                self.write_node(leaf.next, &lender)?;
                self.write_node(offset, &leaf)?;
                self.replace_separator(right_separator(steps, depth), new_first)?;
                debug!(
                    leaf = %offset,
                    lender = %leaf.next,
                    key = %record.key,
                    "borrowed from right leaf"
                );
                return Ok(());
            }
            next = Some(lender);
        }

        let MergePair {
            left_offset,
            mut left,
            right_offset,
            right,
            right_index,
        } = merge_pair(steps[depth - 1], offset, leaf, prev, next);

        left.records.extend(right.records);
        left.next = right.next;
        if right.next.is_some() {
            self.update_header(right.next, |header| header.prev = left_offset)?;
        }
        self.write_node(left_offset, &left)?;
        self.meta.leaf_node_num -= 1;
        debug!(
            into = %left_offset,
            removed = %right_offset,
            len = left.len(),
            "merged leaves"
        );

        self.remove_from_parent(steps, depth - 1, right_index, right_offset)
    }

    /// Overwrite one separator key in an ancestor.
    fn replace_separator(&self, (offset, index): (Offset, usize), key: Key) -> Result<()> {
        let mut ancestor: InternalNode = self.read_node(offset)?;
        ancestor.entries[index].key = key;
        self.write_node(offset, &ancestor)
    }

    /// Drop entry `index` (whose child `removed` was merged away) from the
    /// internal node at `steps[level]`, repairing upward as needed.
    fn remove_from_parent(
        &mut self,
        steps: &[PathStep],
        mut level: usize,
        mut index: usize,
        mut removed: Offset,
    ) -> Result<()> {
        let min = self.internal_min();
        let mut offset = steps[level].node;
        let mut node: InternalNode = self.read_node(offset)?;

        loop {
            assert_eq!(
                node.entries[index].child, removed,
                "descent path out of date at {}",
                offset
            );
            node.remove_child(index);

            if level == 0 {
                if node.len() == 1 && self.meta.internal_node_num > 1 {
                    return self.collapse_root(offset, &node);
                }
                return self.write_node(offset, &node);
            }
            if node.len() >= min {
                return self.write_node(offset, &node);
            }

            // Underfull internal node at depth `level`
            let mut prev: Option<InternalNode> = None;
            if node.prev.is_some() {
                let lender: InternalNode = self.read_node(node.prev)?;
                if lender.len() > min {
                    return self.borrow_internal_left(steps, level, offset, node, lender);
                }
                prev = Some(lender);
            }

            let mut next: Option<InternalNode> = None;
            if node.next.is_some() {
                let lender: InternalNode = self.read_node(node.next)?;
                if lender.len() > min {
                    return self.borrow_internal_right(steps, level, offset, node, lender);
                }
                next = Some(lender);
            }

            let parent_step = steps[level - 1];
            let parent: InternalNode = self.read_node(parent_step.node)?;
            let MergePair {
                left_offset,
                mut left,
                right_offset,
                right,
                right_index,
            } = merge_pair(parent_step, offset, node, prev, next);

            let separator = parent.entries[right_index - 1].key;
            if let Some(last) = left.entries.last_mut() {
                last.key = separator;
            }
            let moved: Vec<Offset> = right.entries.iter().map(|entry| entry.child).collect();
            left.entries.extend(right.entries);

            left.next = right.next;
            if right.next.is_some() {
                self.update_header(right.next, |header| header.prev = left_offset)?;
            }
            self.write_node(left_offset, &left)?;
            for child in moved {
                self.set_parent(child, left_offset)?;
            }
            self.meta.internal_node_num -= 1;
            debug!(
                into = %left_offset,
                removed = %right_offset,
                len = left.len(),
                "merged internal nodes"
            );

            // Continue with the parent, which now loses `right`
            level -= 1;
            index = right_index;
            removed = right_offset;
            offset = parent_step.node;
            node = parent;
        }
    }

    /// Move the previous sibling's last child to the front of `node`.
    fn borrow_internal_left(
        &mut self,
        steps: &[PathStep],
        depth: usize,
        offset: Offset,
        mut node: InternalNode,
        mut lender: InternalNode,
    ) -> Result<()> {
        let lender_offset = node.prev;
        let (ancestor_offset, slot) = left_separator(steps, depth);
        let mut ancestor: InternalNode = self.read_node(ancestor_offset)?;

        let moved = lender.entries.remove(lender.len() - 1);
        let lifted = lender.entries[lender.len() - 1].key;
        lender.clear_last_key();

        node.entries.insert(
            0,
            IndexEntry {
                key: ancestor.entries[slot].key,
                child: moved.child,
            },
        );
        ancestor.entries[slot].key = lifted;

        self.write_node(lender_offset, &lender)?;
        self.write_node(offset, &node)?;
        self.write_node(ancestor_offset, &ancestor)?;
        self.set_parent(moved.child, offset)?;

        debug!(
            node = %offset,
            lender = %lender_offset,
            separator = %lifted,
            "borrowed from left internal node"
        );
        Ok(())
    }

    /// Move the next sibling's first child to the back of `node`.
    fn borrow_internal_right(
        &mut self,
        steps: &[PathStep],
        depth: usize,
        offset: Offset,
        mut node: InternalNode,
        mut lender: InternalNode,
    ) -> Result<()> {
        let lender_offset = node.next;
        let (ancestor_offset, slot) = right_separator(steps, depth);
        let mut ancestor: InternalNode = self.read_node(ancestor_offset)?;

        let moved = lender.entries.remove(0);
        if let Some(last) = node.entries.last_mut() {
            last.key = ancestor.entries[slot].key;
        }
        node.entries.push(IndexEntry {
            key: Key::EMPTY,
            child: moved.child,
        });
        ancestor.entries[slot].key = moved.key;

        self.write_node(lender_offset, &lender)?;
        self.write_node(offset, &node)?;
        self.write_node(ancestor_offset, &ancestor)?;
        self.set_parent(moved.child, offset)?;

        debug!(
            node = %offset,
            lender = %lender_offset,
            separator = %moved.key,
            "borrowed from right internal node"
        );
        Ok(())
    }

    /// Replace a root left with one child by that child.
    fn collapse_root(&mut self, old_root: Offset, root: &InternalNode) -> Result<()> {
        let child = root.entries[0].child;
        self.set_parent(child, Offset::NONE)?;

        self.meta.root_offset = child;
        self.meta.height -= 1;
        self.meta.internal_node_num -= 1;

        debug!(
            old_root = %old_root,
            new_root = %child,
            height = self.meta.height,
            "collapsed root"
        );
        Ok(())
    }
}

/// Access to a node's sibling links, shared by leaves and internal nodes.
trait SiblingLinks {
    fn prev(&self) -> Offset;
    fn next(&self) -> Offset;
}

impl SiblingLinks for LeafNode {
    fn prev(&self) -> Offset {
        self.prev
    }

    fn next(&self) -> Offset {
        self.next
    }
}

impl SiblingLinks for InternalNode {
    fn prev(&self) -> Offset {
        self.prev
    }

    fn next(&self) -> Offset {
        self.next
    }
}
