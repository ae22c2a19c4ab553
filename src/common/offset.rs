//! Block offset type.

use std::fmt;

/// Absolute byte offset of a block in the index file.
///
/// Every node is identified by its offset. Offset 0 always holds the meta
/// block, so it doubles as the "no node" sentinel in parent and sibling
/// links.
///
/// # Example
/// ```
/// use bptdb::Offset;
///
/// let offset = Offset::new(72);
/// assert!(offset.is_some());
/// assert!(Offset::NONE.is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Offset(pub u64);

impl Offset {
    /// Sentinel for "no node".
    pub const NONE: Offset = Offset(0);

    /// Create a new Offset.
    #[inline]
    pub fn new(offset: u64) -> Self {
        Offset(offset)
    }

    /// True if this offset refers to a node.
    #[inline]
    pub fn is_some(&self) -> bool {
        *self != Self::NONE
    }

    /// True if this is the sentinel.
    #[inline]
    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }

    /// Offset `len` bytes further on.
    #[inline]
    pub fn advance(self, len: usize) -> Self {
        Offset(self.0 + len as u64)
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "Offset(NONE)")
        } else {
            write!(f, "Offset({})", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_sentinel() {
        assert!(Offset::NONE.is_none());
        assert!(!Offset::NONE.is_some());
        assert_eq!(Offset::default(), Offset::NONE);
        assert!(Offset::new(72).is_some());
    }

    #[test]
    fn test_offset_advance() {
        assert_eq!(Offset::new(72).advance(128), Offset::new(200));
    }

    #[test]
    fn test_offset_display() {
        assert_eq!(format!("{}", Offset::new(72)), "Offset(72)");
        assert_eq!(format!("{}", Offset::NONE), "Offset(NONE)");
    }
}
