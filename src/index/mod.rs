//! Index layer - keys and the B+ tree.
//!
//! - [`Key`] / [`compare`] - Fixed-capacity keys and their total order
//! - [`BPlusTree`] - The disk-resident tree and its engines

pub mod btree;
mod key;

pub use btree::{BPlusTree, MetaSnapshot, RangeScan, TreeStats};
pub use key::{compare, Key, Value};
