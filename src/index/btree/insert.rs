//! Insertion with bottom-up splits.
//!
//! ```text
//! leaf full:           [t1 t2 t3 t4]  + t5
//! split:               [t1 t2 t3] ◀──▶ [t4 t5]
//! parent gains:        (t4, new leaf) right after the old leaf's entry
//! parent full?         split it too, promote its middle key, repeat
//! root split?          new root [(sep, old root), (EMPTY, sibling)], height + 1
//! ```

use tracing::debug;

use crate::common::{Error, Offset, Result};
use crate::index::{Key, Value};
use crate::storage::node::{IndexEntry, InternalNode, LeafNode};

use super::search::PathStep;
use super::BPlusTree;

impl BPlusTree {
    /// Insert a new record.
    ///
    /// # Errors
    /// - `Error::Duplicate` if `key` is already present; nothing is written
    pub fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        let _session = self.store.session()?;
        let before = self.meta;

        let path = self.find_path(&key)?;
        let mut leaf: LeafNode = self.read_node(path.leaf)?;
        if leaf.find(&key).is_ok() {
            return Err(Error::Duplicate);
        }

        if leaf.len() < self.order() {
            leaf.insert(key, value);
            self.write_node(path.leaf, &leaf)?;
        } else {
            let (separator, sibling) = self.split_leaf(path.leaf, leaf, key, value)?;
            let mut steps = path.steps;
            self.insert_into_parent(&mut steps, separator, path.leaf, sibling)?;
        }

        if self.meta != before {
            self.write_meta()?;
        }
        self.finish_mutation()
    }

    /// Split a full leaf and place the new record in the correct half.
    ///
    /// Returns the separator for the parent (the new leaf's first key) and
    /// the new leaf's offset. Both halves are written before returning.
    fn split_leaf(
        &mut self,
        offset: Offset,
        mut leaf: LeafNode,
        key: Key,
        value: Value,
    ) -> Result<(Key, Offset)> {
        let sibling_offset = self.allocate_node::<LeafNode>();

        // Either way the left half ends up with ceil((n + 1) / 2) records
        let mut point = leaf.len() / 2;
        let place_right = key > leaf.records[point].key;
        if place_right {
            point += 1;
        }

        let mut sibling = LeafNode::new(leaf.parent);
        sibling.records = leaf.records.split_off(point);
        sibling.prev = offset;
        sibling.next = leaf.next;
        if leaf.next.is_some() {
            self.update_header(leaf.next, |header| header.prev = sibling_offset)?;
        }
        leaf.next = sibling_offset;

        if place_right {
            sibling.insert(key, value);
        } else {
            leaf.insert(key, value);
        }
        let separator = sibling.records[0].key;

        self.write_node(offset, &leaf)?;
        self.write_node(sibling_offset, &sibling)?;
        self.meta.leaf_node_num += 1;

        debug!(
            leaf = %offset,
            sibling = %sibling_offset,
            %separator,
            left = leaf.len(),
            right = sibling.len(),
            "split leaf"
        );
        Ok((separator, sibling_offset))
    }

    /// Hook `right` into the tree next to `left`, splitting ancestors as
    /// they overflow.
    ///
    /// `steps` is the descent path to `left`'s parent; it is consumed from
    /// the bottom as the split moves up.
    fn insert_into_parent(
        &mut self,
        steps: &mut Vec<PathStep>,
        mut separator: Key,
        mut left: Offset,
        mut right: Offset,
    ) -> Result<()> {
        let order = self.order();

        while let Some(step) = steps.pop() {
            let mut node: InternalNode = self.read_node(step.node)?;
            assert_eq!(
                node.entries[step.index].child, left,
                "descent path out of date at {}",
                step.node
            );
            node.split_child(step.index, separator, right);

            if node.len() <= order {
                return self.write_node(step.node, &node);
            }

            // order + 1 entries: keep ceil((order + 1) / 2) on the left
            let keep = (order + 2) / 2;
            let sibling_offset = self.allocate_node::<InternalNode>();
            let mut sibling = InternalNode::new(node.parent);
            sibling.entries = node.entries.split_off(keep);
            let promoted = node.entries[keep - 1].key;
            node.clear_last_key();

            sibling.prev = step.node;
            sibling.next = node.next;
            if node.next.is_some() {
                self.update_header(node.next, |header| header.prev = sibling_offset)?;
            }
            node.next = sibling_offset;

            self.write_node(step.node, &node)?;
            self.write_node(sibling_offset, &sibling)?;
            for entry in &sibling.entries {
                self.set_parent(entry.child, sibling_offset)?;
            }
            self.meta.internal_node_num += 1;

            debug!(
                node = %step.node,
                sibling = %sibling_offset,
                %promoted,
                "split internal node"
            );
            separator = promoted;
            left = step.node;
            right = sibling_offset;
        }

        self.grow_root(separator, left, right)
    }

    /// The old root split: put a new root above both halves.
    fn grow_root(&mut self, separator: Key, left: Offset, right: Offset) -> Result<()> {
        let root_offset = self.allocate_node::<InternalNode>();

        let mut root = InternalNode::new(Offset::NONE);
        root.entries.push(IndexEntry {
            key: separator,
            child: left,
        });
        root.entries.push(IndexEntry {
            key: Key::EMPTY,
            child: right,
        });

        self.write_node(root_offset, &root)?;
        self.set_parent(left, root_offset)?;
        self.set_parent(right, root_offset)?;

        self.meta.root_offset = root_offset;
        self.meta.height += 1;
        self.meta.internal_node_num += 1;

        debug!(root = %root_offset, height = self.meta.height, "grew new root");
        Ok(())
    }
}
