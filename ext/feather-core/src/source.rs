//! Random-access byte sources for the reader

use crate::{FeatherError, Result};
use bytes::Bytes;

/// A source that can hand out arbitrary byte ranges
///
/// The reader only ever asks for the trailer, the footer and the blocks of
/// the projected columns, so implementations over files or remote objects
/// never transfer bytes of unrequested columns.
pub trait ChunkReader: Send + Sync {
    /// Total length of the source in bytes
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read `length` bytes starting at `start`
    fn get_bytes(&self, start: u64, length: usize) -> Result<Bytes>;
}

impl ChunkReader for Bytes {
    fn len(&self) -> u64 {
        Bytes::len(self) as u64
    }

    fn get_bytes(&self, start: u64, length: usize) -> Result<Bytes> {
        let start = usize::try_from(start)
            .map_err(|_| FeatherError::invalid_argument("read offset exceeds address space"))?;
        let end = start.checked_add(length).filter(|end| *end <= Bytes::len(self));
        match end {
            Some(end) => Ok(self.slice(start..end)),
            None => Err(FeatherError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!(
                    "range {}+{} exceeds source length {}",
                    start,
                    length,
                    Bytes::len(self)
                ),
            ))),
        }
    }
}

impl<T: ChunkReader + ?Sized> ChunkReader for &T {
    fn len(&self) -> u64 {
        (**self).len()
    }

    fn get_bytes(&self, start: u64, length: usize) -> Result<Bytes> {
        (**self).get_bytes(start, length)
    }
}

impl<T: ChunkReader + ?Sized> ChunkReader for std::sync::Arc<T> {
    fn len(&self) -> u64 {
        (**self).len()
    }

    fn get_bytes(&self, start: u64, length: usize) -> Result<Bytes> {
        (**self).get_bytes(start, length)
    }
}
