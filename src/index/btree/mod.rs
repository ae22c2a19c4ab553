//! Disk-resident B+ tree.
//!
//! [`BPlusTree`] keeps only the decoded meta block in memory. Every node
//! lives in the index file and is read, changed and written back by offset;
//! parent and sibling links are plain [`Offset`] fields, so re-parenting a
//! subtree is a 32-byte header write.
//!
//! # Tree Shape
//! ```text
//!                    ┌────────────────────────┐
//!   level 0 (root)   │ [t09, ·] [EMPTY, ·]    │   height = 2
//!                    └────┬──────────────┬────┘
//!                ┌────────┘              └──────┐
//!   level 1   ┌──▼──────────────────┐ ◀──▶ ┌────▼───────────────┐
//!             │ [t03,·][t06,·][E,·] │      │ [t12,·][E,·]       │
//!             └──┬──────┬──────┬────┘      └──┬──────┬──────────┘
//!   leaves    ┌──▼─┐◀▶┌─▼──┐◀▶┌─▼──┐◀──────▶┌──▼─┐◀▶┌─▼──┐
//!             │t00…│  │t03…│  │t06…│        │t09…│  │t12…│
//!             └────┘  └────┘  └────┘        └────┘  └────┘
//! ```
//!
//! Height counts internal levels only. Even an empty tree has one internal
//! root routing to one (empty) leaf.
//!
//! The engines live in submodules:
//! - [`search`] - root-to-leaf descent, point lookup, paged range scan
//! - [`insert`] - insertion with leaf/internal splits and root growth
//! - [`remove`] - deletion with borrow/merge cascades and root collapse
//! - [`verify`] - full structural audit

mod insert;
mod remove;
mod search;
mod verify;

pub use search::RangeScan;
pub use verify::TreeStats;

use std::path::Path;

use tracing::{info, warn};

use crate::common::{Error, Offset, RecoveryPolicy, Result, TreeConfig};
use crate::index::{Key, Value};
use crate::storage::node::{
    IndexEntry, InternalNode, LeafNode, MetaBlock, NodeBlock, NodeHeader,
};
use crate::storage::BlockStore;

/// Read-only copy of the tree's meta block.
pub type MetaSnapshot = MetaBlock;

/// A B+ tree index stored in a single file.
///
/// # Usage
/// ```no_run
/// use bptdb::{BPlusTree, Key};
///
/// let mut tree = BPlusTree::open("index.db", true)?;
/// tree.insert(Key::new("t1")?, 1)?;
/// assert_eq!(tree.search(&Key::new("t1")?)?, 1);
///
/// let scan = tree.search_range(&Key::new("t0")?, &Key::new("t9")?, 100)?;
/// assert_eq!(scan.values, vec![1]);
/// # Ok::<(), bptdb::Error>(())
/// ```
///
/// # Thread Safety
/// Mutating operations take `&mut self`. Nothing guards the file against a
/// second `BPlusTree` (or process) opened on the same path.
pub struct BPlusTree {
    store: BlockStore,
    meta: MetaBlock,
    config: TreeConfig,
}

impl BPlusTree {
    /// Open the index at `path` with the default configuration.
    ///
    /// The file is created if missing. With `force_empty` any existing
    /// contents are discarded.
    ///
    /// # Errors
    /// - `Error::Io` if the file cannot be opened, read or written
    pub fn open<P: AsRef<Path>>(path: P, force_empty: bool) -> Result<Self> {
        Self::open_with(path, force_empty, TreeConfig::default())
    }

    /// Open the index at `path` with an explicit configuration.
    ///
    /// A file whose meta block fails validation is either reinitialized or
    /// rejected, depending on `config.recovery`.
    ///
    /// # Errors
    /// - `Error::InvalidOrder` if `config.order` is out of range
    /// - `Error::CorruptMeta` under `RecoveryPolicy::FailFast`
    /// - `Error::Io` on any file failure
    pub fn open_with<P: AsRef<Path>>(
        path: P,
        force_empty: bool,
        config: TreeConfig,
    ) -> Result<Self> {
        config.validate()?;

        let mut tree = Self {
            store: BlockStore::new(path),
            meta: MetaBlock::new(config.order),
            config,
        };
        tree.load(force_empty)?;
        Ok(tree)
    }

    fn load(&mut self, force_empty: bool) -> Result<()> {
        let _session = self.store.session()?;

        if force_empty {
            return self.init_from_empty();
        }

        let file_len = self.store.file_len()?;
        let problem = match self.store.read_meta()? {
            Some(meta) => match meta.validate(file_len) {
                Ok(()) => {
                    self.meta = meta;
                    info!(path = %self.store.path().display(), %meta, "opened index");
                    return Ok(());
                }
                Err(reason) => reason,
            },
            None if file_len == 0 => return self.init_from_empty(),
            None => format!("file is {} bytes, shorter than the meta block", file_len),
        };

        match self.config.recovery {
            RecoveryPolicy::Reinitialize => {
                warn!(
                    path = %self.store.path().display(),
                    %problem,
                    "meta block failed validation, reinitializing"
                );
                self.init_from_empty()
            }
            RecoveryPolicy::FailFast => Err(Error::CorruptMeta(problem)),
        }
    }

    /// Wipe the file and lay down an empty tree: one root, one empty leaf.
    fn init_from_empty(&mut self) -> Result<()> {
        self.store.truncate()?;

        let mut meta = MetaBlock::new(self.config.order);
        let root_offset = meta.allocate_node::<InternalNode>();
        let leaf_offset = meta.allocate_node::<LeafNode>();

        let mut root = InternalNode::new(Offset::NONE);
        root.entries.push(IndexEntry {
            key: Key::EMPTY,
            child: leaf_offset,
        });
        let leaf = LeafNode::new(root_offset);

        meta.height = 1;
        meta.internal_node_num = 1;
        meta.leaf_node_num = 1;
        meta.root_offset = root_offset;
        meta.leaf_offset = leaf_offset;
        self.meta = meta;

        self.write_meta()?;
        self.write_node(root_offset, &root)?;
        self.write_node(leaf_offset, &leaf)?;
        self.finish_mutation()?;

        info!(
            path = %self.store.path().display(),
            order = meta.order,
            "initialized empty index"
        );
        Ok(())
    }

    /// Replace the value stored under `key`. The tree shape never changes.
    ///
    /// # Errors
    /// - `Error::NotFound` if the key is absent
    pub fn update(&mut self, key: &Key, value: Value) -> Result<()> {
        let _session = self.store.session()?;

        let path = self.find_path(key)?;
        let mut leaf: LeafNode = self.read_node(path.leaf)?;
        let at = leaf.find(key).map_err(|_| Error::NotFound)?;
        leaf.records[at].value = value;

        self.write_node(path.leaf, &leaf)?;
        self.finish_mutation()
    }

    /// Copy of the current meta block.
    pub fn get_meta(&self) -> MetaSnapshot {
        self.meta
    }

    /// Path of the index file.
    pub fn path(&self) -> &Path {
        self.store.path()
    }

    /// Configuration the tree was opened with.
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    // ========================================================================
    // Block helpers shared by the engines
    // ========================================================================

    #[inline]
    fn order(&self) -> usize {
        self.meta.order
    }

    fn read_node<N: NodeBlock>(&self, offset: Offset) -> Result<N> {
        self.store.read_node(offset, self.order())
    }

    fn write_node<N: NodeBlock>(&self, offset: Offset, node: &N) -> Result<()> {
        self.store.write_node(offset, node, self.order())
    }

    /// Read-modify-write the header of the node at `offset`.
    fn update_header(&self, offset: Offset, f: impl FnOnce(&mut NodeHeader)) -> Result<()> {
        let mut header = self.store.read_header(offset)?;
        f(&mut header);
        self.store.write_header(offset, &header)
    }

    fn set_parent(&self, child: Offset, parent: Offset) -> Result<()> {
        self.update_header(child, |header| header.parent = parent)
    }

    fn write_meta(&self) -> Result<()> {
        self.store.write_meta(&self.meta)
    }

    /// Hand out a fresh block for node kind `N` from the slot cursor.
    fn allocate_node<N: NodeBlock>(&mut self) -> Offset {
        self.meta.allocate_node::<N>()
    }

    /// Common tail of every mutating operation.
    fn finish_mutation(&self) -> Result<()> {
        if self.config.sync_writes {
            self.store.sync()?;
        }
        Ok(())
    }
}
