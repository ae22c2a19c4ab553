//! Structural audit of the whole tree.

use crate::common::{Error, Offset, Result};
use crate::index::Key;
use crate::storage::node::{InternalNode, LeafNode};

use super::BPlusTree;

/// Node and record counts gathered by [`BPlusTree::verify`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Internal levels.
    pub height: usize,
    pub internal_nodes: usize,
    pub leaves: usize,
    pub records: usize,
}

/// A node to visit on the next level down.
#[derive(Debug, Clone, Copy)]
struct Pending {
    offset: Offset,
    parent: Offset,
    /// Inclusive lower bound for keys in the subtree.
    lower: Option<Key>,
    /// Exclusive upper bound for keys in the subtree.
    upper: Option<Key>,
}

fn violation(message: String) -> Error {
    Error::InvariantViolation(message)
}

fn in_bounds(key: &Key, lower: Option<Key>, upper: Option<Key>) -> bool {
    let above = match lower {
        Some(lower) => *key >= lower,
        None => true,
    };
    let below = match upper {
        Some(upper) => *key < upper,
        None => true,
    };
    above && below
}

/// The `prev`/`next` links of one level must chain the nodes in order.
fn check_links(level: &str, order: &[(Offset, Offset, Offset)]) -> Result<()> {
    for (i, &(offset, prev, next)) in order.iter().enumerate() {
        let expected_prev = if i == 0 { Offset::NONE } else { order[i - 1].0 };
        let expected_next = order.get(i + 1).map_or(Offset::NONE, |entry| entry.0);
        if prev != expected_prev || next != expected_next {
            return Err(violation(format!(
                "{} {}: links prev {} next {}, expected prev {} next {}",
                level, offset, prev, next, expected_prev, expected_next
            )));
        }
    }
    Ok(())
}

impl BPlusTree {
    /// Walk every node and check the tree's structural invariants.
    ///
    /// Checked, level by level from the root:
    /// - live counts within `[min, order]` (root and sole leaf exempt)
    /// - separators strictly ascending, unused last key empty
    /// - every leaf key inside the range its ancestors route to it
    /// - leaf records strictly ascending
    /// - parent back-links and same-level `prev`/`next` chains
    /// - all leaves at depth `height`, first leaf equal to the meta block's
    /// - node counts equal to the meta block's
    ///
    /// # Errors
    /// - `Error::InvariantViolation` describing the first broken invariant
    /// - `Error::Io` / `Error::CorruptNode` if a block cannot be read
    pub fn verify(&self) -> Result<TreeStats> {
        let _session = self.store.session()?;
        let order = self.order();
        let internal_min = order.div_ceil(2);

        let mut stats = TreeStats {
            height: self.meta.height,
            ..TreeStats::default()
        };
        let mut level = vec![Pending {
            offset: self.meta.root_offset,
            parent: Offset::NONE,
            lower: None,
            upper: None,
        }];

        for depth in 0..self.meta.height {
            let mut below = Vec::new();
            let mut links = Vec::with_capacity(level.len());

            for pending in &level {
                let node: InternalNode = self.read_node(pending.offset)?;
                let is_root = depth == 0;
                let min = if is_root { 1 } else { internal_min };
                if node.len() < min || node.len() > order {
                    return Err(violation(format!(
                        "internal {} holds {} entries (allowed {}..={})",
                        pending.offset,
                        node.len(),
                        min,
                        order
                    )));
                }
                if node.parent != pending.parent {
                    return Err(violation(format!(
                        "internal {} names parent {}, expected {}",
                        pending.offset, node.parent, pending.parent
                    )));
                }

                let separators = &node.entries[..node.len() - 1];
                if separators.windows(2).any(|pair| pair[0].key >= pair[1].key) {
                    return Err(violation(format!(
                        "internal {} separators out of order",
                        pending.offset
                    )));
                }
                if separators.iter().any(|entry| entry.key.is_empty()) {
                    return Err(violation(format!(
                        "internal {} has an empty separator",
                        pending.offset
                    )));
                }
                if node.entries[node.len() - 1].key != Key::EMPTY {
                    return Err(violation(format!(
                        "internal {} stores a key in its last entry",
                        pending.offset
                    )));
                }

                for (i, entry) in node.entries.iter().enumerate() {
                    below.push(Pending {
                        offset: entry.child,
                        parent: pending.offset,
                        lower: if i == 0 {
                            pending.lower
                        } else {
                            Some(node.entries[i - 1].key)
                        },
                        upper: if i + 1 == node.len() {
                            pending.upper
                        } else {
                            Some(entry.key)
                        },
                    });
                }
                links.push((pending.offset, node.prev, node.next));
                stats.internal_nodes += 1;
            }

            check_links("internal", &links)?;
            level = below;
        }

        let leaf_min = if level.len() == 1 { 0 } else { order / 2 };
        let mut links = Vec::with_capacity(level.len());
        for pending in &level {
            let leaf: LeafNode = self.read_node(pending.offset)?;
            if leaf.len() < leaf_min {
                return Err(violation(format!(
                    "leaf {} holds {} records (minimum {})",
                    pending.offset,
                    leaf.len(),
                    leaf_min
                )));
            }
            if leaf.parent != pending.parent {
                return Err(violation(format!(
                    "leaf {} names parent {}, expected {}",
                    pending.offset, leaf.parent, pending.parent
                )));
            }
            if leaf.records.windows(2).any(|pair| pair[0].key >= pair[1].key) {
                return Err(violation(format!(
                    "leaf {} records out of order",
                    pending.offset
                )));
            }
            if let Some(record) = leaf
                .records
                .iter()
                .find(|record| !in_bounds(&record.key, pending.lower, pending.upper))
            {
                return Err(violation(format!(
                    "leaf {} holds {} outside its routed range",
                    pending.offset, record.key
                )));
            }

            links.push((pending.offset, leaf.prev, leaf.next));
            stats.leaves += 1;
            stats.records += leaf.len();
        }
        check_links("leaf", &links)?;

        if level.first().map(|pending| pending.offset) != Some(self.meta.leaf_offset) {
            return Err(violation(format!(
                "meta first leaf {} is not the left-most leaf",
                self.meta.leaf_offset
            )));
        }
        if stats.internal_nodes != self.meta.internal_node_num
            || stats.leaves != self.meta.leaf_node_num
        {
            return Err(violation(format!(
                "found {} internal / {} leaves, meta records {} / {}",
                stats.internal_nodes,
                stats.leaves,
                self.meta.internal_node_num,
                self.meta.leaf_node_num
            )));
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn key(s: &str) -> Key {
        Key::new(s).unwrap()
    }

    #[test]
    fn test_verify_empty_tree() {
        let dir = tempdir().unwrap();
        let tree = BPlusTree::open(dir.path().join("test.db"), true).unwrap();

        let stats = tree.verify().unwrap();
        assert_eq!(
            stats,
            TreeStats {
                height: 1,
                internal_nodes: 1,
                leaves: 1,
                records: 0
            }
        );
    }

    #[test]
    fn test_verify_counts() {
        let dir = tempdir().unwrap();
        let mut tree = BPlusTree::open(dir.path().join("test.db"), true).unwrap();
        for i in 0..15 {
            tree.insert(key(&format!("t{:02}", i)), i).unwrap();
        }

        let stats = tree.verify().unwrap();
        assert_eq!(stats.height, 2);
        assert_eq!(stats.internal_nodes, 3);
        assert_eq!(stats.leaves, 5);
        assert_eq!(stats.records, 15);
    }

    #[test]
    fn test_verify_detects_unsorted_leaf() {
        let dir = tempdir().unwrap();
        let mut tree = BPlusTree::open(dir.path().join("test.db"), true).unwrap();
        tree.insert(key("t1"), 1).unwrap();
        tree.insert(key("t2"), 2).unwrap();

        let offset = tree.meta.leaf_offset;
        let mut leaf: LeafNode = tree.read_node(offset).unwrap();
        leaf.records.swap(0, 1);
        tree.write_node(offset, &leaf).unwrap();

        assert!(matches!(tree.verify(), Err(Error::InvariantViolation(_))));
    }

    #[test]
    fn test_verify_detects_broken_link() {
        let dir = tempdir().unwrap();
        let mut tree = BPlusTree::open(dir.path().join("test.db"), true).unwrap();
        for i in 1..=5 {
            tree.insert(key(&format!("t{}", i)), i).unwrap();
        }

        let first: LeafNode = tree.read_node(tree.meta.leaf_offset).unwrap();
        tree.update_header(first.next, |header| header.prev = Offset::NONE)
            .unwrap();

        match tree.verify() {
            Err(Error::InvariantViolation(message)) => assert!(message.contains("links")),
            other => panic!("Expected InvariantViolation, got {:?}", other),
        }
    }
}
