//! Record key and the key comparator.
//!
//! Keys are short strings stored in a fixed 16-byte, zero-padded buffer.
//! Ordering is **length first**, then bytewise: `"9" < "10" < "t1" < "100"`.
//! This is not plain lexicographic order, and every structural algorithm
//! relies on it through [`compare`] (or the equivalent `Ord` impl).

use std::cmp::Ordering;
use std::fmt;

use crate::common::config::KEY_SIZE;
use crate::common::{Error, Result};

/// Payload stored with every key.
pub type Value = i32;

/// A fixed-capacity key.
///
/// Bytes after the first NUL are always zero, so derived equality and
/// hashing agree with [`compare`].
///
/// # Example
/// ```
/// use bptdb::Key;
///
/// let short = Key::new("9").unwrap();
/// let long = Key::new("10").unwrap();
/// assert!(short < long); // length decides before content
/// assert!(Key::new("").is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Key([u8; KEY_SIZE]);

impl Key {
    /// The empty key. Marks unused separator slots; never a record key.
    pub const EMPTY: Key = Key([0u8; KEY_SIZE]);

    /// Longest accepted key in bytes (the last byte is the terminator).
    pub const MAX_LEN: usize = KEY_SIZE - 1;

    /// Build a key from a string.
    ///
    /// # Errors
    /// Returns `Error::InvalidKey` if the string is empty, longer than
    /// [`Key::MAX_LEN`] bytes, or contains a NUL byte.
    pub fn new(s: &str) -> Result<Self> {
        Self::from_bytes(s.as_bytes())
    }

    /// Build a key from raw bytes. Same rules as [`Key::new`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::InvalidKey("key is empty".to_string()));
        }
        if bytes.len() > Self::MAX_LEN {
            return Err(Error::InvalidKey(format!(
                "key is {} bytes, max is {}",
                bytes.len(),
                Self::MAX_LEN
            )));
        }
        if bytes.contains(&0) {
            return Err(Error::InvalidKey("key contains a NUL byte".to_string()));
        }

        let mut buf = [0u8; KEY_SIZE];
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(Key(buf))
    }

    /// Rebuild a key from a stored buffer.
    ///
    /// Anything after the first NUL is dropped. A buffer with no NUL at all
    /// is taken as a full 16-byte key.
    pub(crate) fn from_raw(raw: &[u8]) -> Self {
        let mut buf = [0u8; KEY_SIZE];
        let len = raw
            .iter()
            .take(KEY_SIZE)
            .position(|&b| b == 0)
            .unwrap_or(KEY_SIZE.min(raw.len()));
        buf[..len].copy_from_slice(&raw[..len]);
        Key(buf)
    }

    /// The stored buffer, zero padded.
    #[inline]
    pub fn raw(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Number of meaningful bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.iter().position(|&b| b == 0).unwrap_or(KEY_SIZE)
    }

    /// True for [`Key::EMPTY`].
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0[0] == 0
    }

    /// The meaningful bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..self.len()]
    }
}

/// Total order over keys: shorter keys first, equal lengths bytewise.
#[inline]
pub fn compare(a: &Key, b: &Key) -> Ordering {
    a.len()
        .cmp(&b.len())
        .then_with(|| a.as_bytes().cmp(b.as_bytes()))
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(self, other)
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl TryFrom<&str> for Key {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Key::new(s)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.as_bytes()))
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({:?})", String::from_utf8_lossy(self.as_bytes()))
    }
}
