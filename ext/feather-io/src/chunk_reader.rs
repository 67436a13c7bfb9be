//! Random-access byte sources over files, streams and memory
//!
//! Every variant can be cloned and shared between decode workers. Files are
//! reopened per range so workers never contend on a cursor; streams share one
//! cursor behind a mutex.

use bytes::Bytes;
use feather_core::{ChunkReader, FeatherError, Result};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Anything that can be read and repositioned
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// A ChunkReader that can be cloned for parallel reading
#[derive(Clone)]
pub enum CloneableChunkReader {
    /// File-based reader that reopens the file for each range
    File(FileChunkReader),
    /// Seekable stream shared behind a lock
    Stream(StreamChunkReader),
    /// In-memory bytes
    Bytes(Bytes),
}

impl CloneableChunkReader {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(CloneableChunkReader::File(FileChunkReader::new(path)?))
    }

    pub fn from_stream<R: ReadSeek + 'static>(stream: R) -> Result<Self> {
        Ok(CloneableChunkReader::Stream(StreamChunkReader::new(stream)?))
    }

    /// Copy a forward-only stream into a temporary file so ranges can be served
    pub fn spool<R: Read>(mut reader: R) -> Result<Self> {
        let mut temp_file = tempfile::tempfile()?;
        let copied = io::copy(&mut reader, &mut temp_file)?;
        temp_file.seek(SeekFrom::Start(0))?;
        log::debug!("spooled {} bytes of an unseekable stream to a temp file", copied);
        Self::from_stream(temp_file)
    }
}

impl std::fmt::Debug for CloneableChunkReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloneableChunkReader::File(r) => write!(f, "File({})", r.path.display()),
            CloneableChunkReader::Stream(r) => write!(f, "Stream({} bytes)", r.len),
            CloneableChunkReader::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
        }
    }
}

/// File-based chunk reader that reopens files for each read
#[derive(Clone, Debug)]
pub struct FileChunkReader {
    path: PathBuf,
    file_len: u64,
}

impl FileChunkReader {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file_len = File::open(&path)?.metadata()?.len();
        Ok(FileChunkReader { path, file_len })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Stream-based chunk reader; clones share the same stream
#[derive(Clone)]
pub struct StreamChunkReader {
    inner: Arc<Mutex<Box<dyn ReadSeek>>>,
    len: u64,
}

impl StreamChunkReader {
    pub fn new<R: ReadSeek + 'static>(mut stream: R) -> Result<Self> {
        let len = stream.seek(SeekFrom::End(0))?;
        stream.seek(SeekFrom::Start(0))?;
        Ok(StreamChunkReader {
            inner: Arc::new(Mutex::new(Box::new(stream))),
            len,
        })
    }
}

fn check_range(start: u64, length: usize, len: u64) -> Result<()> {
    let end = start.checked_add(length as u64);
    match end {
        Some(end) if end <= len => Ok(()),
        _ => Err(FeatherError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("range {}+{} exceeds source length {}", start, length, len),
        ))),
    }
}

fn read_range<R: Read + Seek + ?Sized>(reader: &mut R, start: u64, length: usize) -> Result<Bytes> {
    reader.seek(SeekFrom::Start(start))?;
    let mut buf = vec![0; length];
    reader.read_exact(&mut buf)?;
    Ok(Bytes::from(buf))
}

impl ChunkReader for FileChunkReader {
    fn len(&self) -> u64 {
        self.file_len
    }

    fn get_bytes(&self, start: u64, length: usize) -> Result<Bytes> {
        check_range(start, length, self.file_len)?;
        let mut file = File::open(&self.path)?;
        read_range(&mut file, start, length)
    }
}

impl ChunkReader for StreamChunkReader {
    fn len(&self) -> u64 {
        self.len
    }

    fn get_bytes(&self, start: u64, length: usize) -> Result<Bytes> {
        check_range(start, length, self.len)?;
        let mut stream = self
            .inner
            .lock()
            .map_err(|_| FeatherError::internal("stream lock poisoned by a failed reader"))?;
        read_range(&mut **stream, start, length)
    }
}

impl ChunkReader for CloneableChunkReader {
    fn len(&self) -> u64 {
        match self {
            CloneableChunkReader::File(f) => f.len(),
            CloneableChunkReader::Stream(s) => s.len(),
            CloneableChunkReader::Bytes(b) => b.len() as u64,
        }
    }

    fn get_bytes(&self, start: u64, length: usize) -> Result<Bytes> {
        match self {
            CloneableChunkReader::File(f) => f.get_bytes(start, length),
            CloneableChunkReader::Stream(s) => s.get_bytes(start, length),
            CloneableChunkReader::Bytes(b) => b.get_bytes(start, length),
        }
    }
}
