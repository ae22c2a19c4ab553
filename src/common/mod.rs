//! Common types and utilities shared across bptdb.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Layout constants and `TreeConfig`
//! - Error types
//! - The `Offset` block identifier

pub mod config;
pub mod error;
mod offset;

pub use config::{RecoveryPolicy, TreeConfig};
pub use error::{Error, Result};
pub use offset::Offset;
