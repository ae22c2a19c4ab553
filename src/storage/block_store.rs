//! Block Store - low-level file I/O for the index file.
//!
//! The [`BlockStore`] handles all direct file operations:
//! - Reading and writing node blocks at absolute offsets
//! - Reading and writing the meta block at offset 0
//! - Rewriting just the 32-byte header of a node
//! - Scoping the open file handle with [`Session`] guards

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::common::{Error, Offset, Result};
use crate::storage::node::{MetaBlock, NodeBlock, NodeHeader};

/// Manages I/O for a single index file.
///
/// # File Layout
/// ```text
/// ┌────────────┬───────────┬───────────┬───────────┬─────┐
/// │ Meta block │ root      │ leaf      │ internal  │ ... │
/// │ (72 bytes) │ (ibs)     │ (lbs)     │ (ibs)     │     │
/// └────────────┴───────────┴───────────┴───────────┴─────┘
/// Offset: 0     72          72+ibs      72+ibs+lbs
/// ```
///
/// Blocks are handed out by the meta block's slot cursor and are never
/// reused. Internal blocks are `ibs = 32 + 24 * order` bytes, leaf blocks
/// `lbs = 32 + 20 * order` rounded up to a multiple of 8.
///
/// # Handle Lifetime
/// The file is opened by the first live [`Session`] and closed when the
/// last one drops. Every read and write opens its own nested session, so a
/// public tree operation that holds an outer session shares one descriptor
/// across all of its I/O, while a lone call still opens and closes the file.
///
/// # Thread Safety
/// The handle sits behind a `Mutex`, which keeps each individual seek+read
/// or seek+write pair atomic. It does not make multi-block tree mutations
/// atomic; the tree assumes a single driver.
pub struct BlockStore {
    path: PathBuf,
    handle: Arc<Mutex<FileHandle>>,
}

/// Open descriptor plus the number of live sessions using it.
#[derive(Debug, Default)]
struct FileHandle {
    file: Option<File>,
    depth: usize,
}

/// RAII guard keeping the index file open.
///
/// # Example
/// ```ignore
/// let session = store.session()?;
/// store.read_block(offset, &mut buf)?;   // reuses the open file
/// store.write_block(offset, &buf)?;
/// // session drops here, file closed
/// ```
#[must_use = "the file closes again as soon as the session is dropped"]
pub struct Session {
    handle: Arc<Mutex<FileHandle>>,
}

impl Drop for Session {
    fn drop(&mut self) {
        let mut handle = self.handle.lock();
        handle.depth -= 1;
        if handle.depth == 0 {
            handle.file = None;
            trace!("closed index file");
        }
    }
}

impl BlockStore {
    /// Create a store for `path`. Nothing is opened until the first session.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            handle: Arc::new(Mutex::new(FileHandle::default())),
        }
    }

    /// Path of the backing file.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a session, opening (or creating) the file if none is live.
    ///
    /// # Errors
    /// Returns `Error::Io` if the file cannot be opened or created.
    pub fn session(&self) -> Result<Session> {
        let mut handle = self.handle.lock();
        if handle.file.is_none() {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&self.path)?;
            trace!(path = %self.path.display(), "opened index file");
            handle.file = Some(file);
        }
        handle.depth += 1;

        Ok(Session {
            handle: Arc::clone(&self.handle),
        })
    }

    /// True while at least one session is live.
    #[cfg(test)]
    pub(crate) fn is_open(&self) -> bool {
        self.handle.lock().file.is_some()
    }

    /// Number of live sessions.
    #[cfg(test)]
    pub(crate) fn depth(&self) -> usize {
        self.handle.lock().depth
    }

    /// Run `f` against the open file inside a nested session.
    fn with_file<T>(&self, f: impl FnOnce(&mut File) -> io::Result<T>) -> Result<T> {
        let _session = self.session()?;
        let mut handle = self.handle.lock();
        let file = handle
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "index file is closed"))?;
        Ok(f(file)?)
    }

    // ========================================================================
    // Raw blocks
    // ========================================================================

    /// Read `buf.len()` bytes starting at `offset`.
    ///
    /// # Errors
    /// Returns `Error::Io` (`UnexpectedEof`) if the file ends early.
    pub fn read_block(&self, offset: Offset, buf: &mut [u8]) -> Result<()> {
        trace!(%offset, len = buf.len(), "read block");
        self.with_file(|file| {
            file.seek(SeekFrom::Start(offset.0))?;
            file.read_exact(buf)
        })
    }

    /// Write `data` starting at `offset`, extending the file if needed.
    pub fn write_block(&self, offset: Offset, data: &[u8]) -> Result<()> {
        trace!(%offset, len = data.len(), "write block");
        self.with_file(|file| {
            file.seek(SeekFrom::Start(offset.0))?;
            file.write_all(data)
        })
    }

    // ========================================================================
    // Typed access
    // ========================================================================

    /// Read and decode a node block.
    ///
    /// # Errors
    /// - `Error::Io` if the block cannot be read
    /// - `Error::CorruptNode` if the block decodes to an impossible shape
    pub fn read_node<N: NodeBlock>(&self, offset: Offset, order: usize) -> Result<N> {
        let mut buf = vec![0u8; N::block_size(order)];
        self.read_block(offset, &mut buf)?;
        N::decode(&buf, order, offset)
    }

    /// Encode and write a whole node block. Unused slots are zero filled.
    pub fn write_node<N: NodeBlock>(&self, offset: Offset, node: &N, order: usize) -> Result<()> {
        self.write_block(offset, &node.encode(order))
    }

    /// Read only the header of the node at `offset`.
    pub fn read_header(&self, offset: Offset) -> Result<NodeHeader> {
        let mut buf = [0u8; NodeHeader::SIZE];
        self.read_block(offset, &mut buf)?;
        Ok(NodeHeader::from_bytes(&buf))
    }

    /// Rewrite only the header of the node at `offset`.
    pub fn write_header(&self, offset: Offset, header: &NodeHeader) -> Result<()> {
        let mut buf = [0u8; NodeHeader::SIZE];
        header.write_to(&mut buf);
        self.write_block(offset, &buf)
    }

    /// Read the meta block.
    ///
    /// Returns `Ok(None)` if the file is too short to hold one.
    pub fn read_meta(&self) -> Result<Option<MetaBlock>> {
        let mut buf = [0u8; MetaBlock::SIZE];
        match self.read_block(Offset::NONE, &mut buf) {
            Ok(()) => Ok(Some(MetaBlock::from_bytes(&buf))),
            Err(Error::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Write the meta block at offset 0.
    pub fn write_meta(&self, meta: &MetaBlock) -> Result<()> {
        self.write_block(Offset::NONE, &meta.to_bytes())
    }

    // ========================================================================
    // Whole file
    // ========================================================================

    /// Current length of the file in bytes.
    pub fn file_len(&self) -> Result<u64> {
        self.with_file(|file| Ok(file.metadata()?.len()))
    }

    /// Drop every byte of the file.
    pub fn truncate(&self) -> Result<()> {
        self.with_file(|file| file.set_len(0))
    }

    /// Flush written data to the device.
    pub fn sync(&self) -> Result<()> {
        self.with_file(|file| file.sync_data())
    }
}
