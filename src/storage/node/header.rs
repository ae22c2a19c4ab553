//! Header shared by internal and leaf blocks.

use crate::common::config::NODE_HEADER_SIZE;
use crate::common::Offset;

use super::{read_u64, write_u64};

/// The first 32 bytes of every node block.
///
/// # Layout (32 bytes)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       8     parent (offset of the parent internal node, 0 = none)
/// 8       8     next   (next sibling at the same level, 0 = none)
/// 16      8     prev   (previous sibling at the same level, 0 = none)
/// 24      8     n      (live entry count)
/// ```
///
/// Because the prefix is identical for both node kinds, re-parenting and
/// sibling relinking rewrite only these bytes without knowing which kind of
/// node lives at the offset.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NodeHeader {
    pub parent: Offset,
    pub next: Offset,
    pub prev: Offset,
    pub count: u64,
}

impl NodeHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = NODE_HEADER_SIZE;

    pub const OFFSET_PARENT: usize = 0;
    pub const OFFSET_NEXT: usize = 8;
    pub const OFFSET_PREV: usize = 16;
    pub const OFFSET_COUNT: usize = 24;

    /// Read a header from the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < NodeHeader::SIZE`.
    pub fn from_bytes(data: &[u8]) -> Self {
        assert!(data.len() >= Self::SIZE, "buffer too small for NodeHeader");

        Self {
            parent: Offset(read_u64(data, Self::OFFSET_PARENT)),
            next: Offset(read_u64(data, Self::OFFSET_NEXT)),
            prev: Offset(read_u64(data, Self::OFFSET_PREV)),
            count: read_u64(data, Self::OFFSET_COUNT),
        }
    }

    /// Write this header to the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < NodeHeader::SIZE`.
    pub fn write_to(&self, data: &mut [u8]) {
        assert!(data.len() >= Self::SIZE, "buffer too small for NodeHeader");

        write_u64(data, Self::OFFSET_PARENT, self.parent.0);
        write_u64(data, Self::OFFSET_NEXT, self.next.0);
        write_u64(data, Self::OFFSET_PREV, self.prev.0);
        write_u64(data, Self::OFFSET_COUNT, self.count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_byte_layout() {
        let header = NodeHeader {
            parent: Offset(0x0102),
            next: Offset(0x0304),
            prev: Offset(0x0506),
            count: 7,
        };

        let mut buffer = [0u8; NodeHeader::SIZE];
        header.write_to(&mut buffer);

        assert_eq!(buffer[0], 0x02); // parent LSB
        assert_eq!(buffer[1], 0x01);
        assert_eq!(buffer[8], 0x04); // next LSB
        assert_eq!(buffer[16], 0x06); // prev LSB
        assert_eq!(buffer[24], 7); // count LSB
        assert_eq!(NodeHeader::from_bytes(&buffer), header);
    }

    #[test]
    #[should_panic(expected = "buffer too small")]
    fn test_header_short_buffer_panics() {
        NodeHeader::from_bytes(&[0u8; 16]);
    }
}
