//! bptdb - a disk-resident B+ tree index in a single flat file.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                              bptdb                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                 Index Layer (index/)                     │   │
//! │  │   BPlusTree: search | search_range | insert | update     │   │
//! │  │              remove | verify | get_meta                  │   │
//! │  │        engines: search.rs insert.rs remove.rs            │   │
//! │  │   Key + comparator (length first, then bytewise)         │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Binary Node Codec (storage/node/)              │   │
//! │  │      MetaBlock | NodeHeader | InternalNode | LeafNode    │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │             Block Store (storage/)                       │   │
//! │  │   offset-addressed reads/writes, session-scoped handle   │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (Offset, Error, config)
//! - [`storage`] - File I/O and block formats
//! - [`index`] - Keys and the B+ tree
//!
//! # Quick Start
//! ```no_run
//! use bptdb::{BPlusTree, Key, TreeConfig};
//!
//! let config = TreeConfig::default().with_order(20);
//! let mut tree = BPlusTree::open_with("numbers.db", true, config)?;
//!
//! for i in 0..1000 {
//!     tree.insert(Key::new(&i.to_string())?, i)?;
//! }
//! assert_eq!(tree.search(&Key::new("42")?)?, 42);
//! # Ok::<(), bptdb::Error>(())
//! ```

pub mod common;
pub mod index;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::{Error, Offset, RecoveryPolicy, Result, TreeConfig};
pub use index::{BPlusTree, Key, MetaSnapshot, RangeScan, TreeStats, Value};
