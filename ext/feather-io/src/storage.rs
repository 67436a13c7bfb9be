//! Byte stream providers: where feather files live
//!
//! A [`StreamProvider`] turns a location string into an open handle. The
//! codec only ever sees a [`ReadHandle`] (a random-access
//! [`ChunkReader`]) or a [`WriteHandle`] (a `Write`).
//!
//! Write handles are scoped: [`WriteHandle::finish`] flushes and publishes
//! the output, and a handle dropped without finishing discards whatever was
//! written so no partial file is left behind.

use crate::chunk_reader::CloneableChunkReader;
use bytes::Bytes;
use feather_core::{ChunkReader, FeatherError, Result};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// Backend configuration such as remote-storage credentials
pub type StorageOptions = IndexMap<String, String>;

/// Opens byte streams for locations
pub trait StreamProvider: Send + Sync {
    fn open_read(&self, location: &str, options: &StorageOptions) -> Result<ReadHandle>;

    fn open_write(&self, location: &str, options: &StorageOptions) -> Result<WriteHandle>;
}

/// An open, random-access readable location
#[derive(Debug, Clone)]
pub struct ReadHandle {
    location: String,
    source: CloneableChunkReader,
}

impl ReadHandle {
    pub fn new<S: Into<String>>(location: S, source: CloneableChunkReader) -> Self {
        Self {
            location: location.into(),
            source,
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn into_inner(self) -> CloneableChunkReader {
        self.source
    }
}

impl ChunkReader for ReadHandle {
    fn len(&self) -> u64 {
        self.source.len()
    }

    fn get_bytes(&self, start: u64, length: usize) -> Result<Bytes> {
        self.source.get_bytes(start, length)
    }
}

/// Destination of a [`WriteHandle`]
pub trait WriteSink: Write + Send {
    /// Make everything written so far visible at the location
    fn commit(&mut self) -> Result<()>;

    /// Throw away partial output
    fn abort(&mut self) -> Result<()>;
}

/// An open writable location
pub struct WriteHandle {
    location: String,
    sink: Box<dyn WriteSink>,
    finished: bool,
}

impl WriteHandle {
    pub fn new<S: Into<String>>(location: S, sink: Box<dyn WriteSink>) -> Self {
        Self {
            location: location.into(),
            sink,
            finished: false,
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Flush and publish the output
    pub fn finish(mut self) -> Result<()> {
        self.sink.flush()?;
        self.sink.commit()?;
        self.finished = true;
        log::debug!("closed write handle for '{}'", self.location);
        Ok(())
    }
}

impl Write for WriteHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sink.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

impl Drop for WriteHandle {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.sink.abort() {
                log::warn!(
                    "failed to discard partial output at '{}': {}",
                    self.location,
                    e
                );
            }
        }
    }
}

/// Plain local paths
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileProvider;

impl LocalFileProvider {
    pub fn new() -> Self {
        Self
    }

    fn check_options(location: &str, options: &StorageOptions) -> Result<()> {
        if options.is_empty() {
            return Ok(());
        }
        Err(FeatherError::invalid_argument(format!(
            "storage options {:?} are only valid for remote locations, not '{}'",
            options.keys().collect::<Vec<_>>(),
            location
        )))
    }
}

impl StreamProvider for LocalFileProvider {
    fn open_read(&self, location: &str, options: &StorageOptions) -> Result<ReadHandle> {
        Self::check_options(location, options)?;
        Ok(ReadHandle::new(
            location,
            CloneableChunkReader::from_path(location)?,
        ))
    }

    fn open_write(&self, location: &str, options: &StorageOptions) -> Result<WriteHandle> {
        Self::check_options(location, options)?;
        let path = PathBuf::from(location);
        // the temp file shares the target's directory so persisting is a rename
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let temp = NamedTempFile::new_in(&dir)?;
        Ok(WriteHandle::new(
            location,
            Box::new(FileSink {
                path,
                writer: Some(BufWriter::new(temp)),
            }),
        ))
    }
}

/// Writes into a temporary sibling of `path`; the target is only replaced on commit
struct FileSink {
    path: PathBuf,
    writer: Option<BufWriter<NamedTempFile>>,
}

impl FileSink {
    fn writer(&mut self) -> io::Result<&mut BufWriter<NamedTempFile>> {
        self.writer
            .as_mut()
            .ok_or_else(|| io::Error::other("write handle already closed"))
    }
}

impl Write for FileSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer()?.flush()
    }
}

impl WriteSink for FileSink {
    fn commit(&mut self) -> Result<()> {
        let writer = self
            .writer
            .take()
            .ok_or_else(|| FeatherError::internal("write handle already closed"))?;
        let temp = writer.into_inner().map_err(|e| e.into_error())?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn abort(&mut self) -> Result<()> {
        match self.writer.take() {
            Some(writer) => {
                let (temp, _) = writer.into_parts();
                temp.close()?;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

/// Named in-memory files; clones share the same store
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    files: Arc<Mutex<HashMap<String, Bytes>>>,
    read_opens: Arc<AtomicUsize>,
    write_opens: Arc<AtomicUsize>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<S: Into<String>>(&self, location: S, bytes: Bytes) -> Result<()> {
        self.lock()?.insert(location.into(), bytes);
        Ok(())
    }

    pub fn get(&self, location: &str) -> Result<Option<Bytes>> {
        Ok(self.lock()?.get(location).cloned())
    }

    pub fn contains(&self, location: &str) -> Result<bool> {
        Ok(self.lock()?.contains_key(location))
    }

    /// How many read handles have been opened
    pub fn read_opens(&self) -> usize {
        self.read_opens.load(Ordering::SeqCst)
    }

    /// How many write handles have been opened
    pub fn write_opens(&self) -> usize {
        self.write_opens.load(Ordering::SeqCst)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Bytes>>> {
        self.files
            .lock()
            .map_err(|_| FeatherError::internal("memory store lock poisoned"))
    }
}

impl StreamProvider for MemoryProvider {
    fn open_read(&self, location: &str, _options: &StorageOptions) -> Result<ReadHandle> {
        self.read_opens.fetch_add(1, Ordering::SeqCst);
        let bytes = self.get(location)?.ok_or_else(|| {
            FeatherError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no in-memory file named '{}'", location),
            ))
        })?;
        Ok(ReadHandle::new(location, CloneableChunkReader::Bytes(bytes)))
    }

    fn open_write(&self, location: &str, _options: &StorageOptions) -> Result<WriteHandle> {
        self.write_opens.fetch_add(1, Ordering::SeqCst);
        Ok(WriteHandle::new(
            location,
            Box::new(MemorySink {
                location: location.to_string(),
                buffer: Vec::new(),
                files: Arc::clone(&self.files),
            }),
        ))
    }
}

struct MemorySink {
    location: String,
    buffer: Vec<u8>,
    files: Arc<Mutex<HashMap<String, Bytes>>>,
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl WriteSink for MemorySink {
    fn commit(&mut self) -> Result<()> {
        let bytes = Bytes::from(std::mem::take(&mut self.buffer));
        self.files
            .lock()
            .map_err(|_| FeatherError::internal("memory store lock poisoned"))?
            .insert(self.location.clone(), bytes);
        Ok(())
    }

    fn abort(&mut self) -> Result<()> {
        self.buffer.clear();
        Ok(())
    }
}
