//! Storage layer - file I/O and block formats.
//!
//! This module handles persistent storage:
//! - [`BlockStore`] - Offset-addressed file I/O with scoped handles
//! - [`node`] - Binary codec for the meta block and node blocks

mod block_store;
pub mod node;

pub use block_store::{BlockStore, Session};
