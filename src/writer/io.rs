//! Abstract I/O for the FAMOS writer.
//!
//! Writing a FAMOS file needs random access: the raw sample regions are
//! reserved first and filled later by the data callback, and the key group's
//! "closed" flag is patched only once everything else is on disk. This module
//! abstracts that seekable sink so the writer works with files and with
//! in-memory buffers alike.

use crate::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

/// Write and seek operations used by the key writer and the data writer.
pub trait FamosWrite {
    /// Write all bytes at the current position.
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Seek to an absolute position.
    fn seek(&mut self, pos: u64) -> Result<u64>;

    /// Get the current position.
    fn position(&self) -> u64;

    /// Flush any buffered data.
    fn flush(&mut self) -> Result<()>;

    /// Overwrite bytes at `offset` and return to the previous position.
    fn patch(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        let current = self.position();
        self.seek(offset)?;
        self.write_all(bytes)?;
        self.seek(current)?;
        Ok(())
    }
}

/// How [`FileWriter::create`] treats an existing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SaveMode {
    /// Fail if the file already exists.
    CreateNew,
    /// Create the file or truncate an existing one.
    #[default]
    Overwrite,
}

/// A writer that writes to an in-memory buffer.
///
/// Useful for building a FAMOS image in memory, e.g. for tests or before
/// handing it to a network transport.
#[derive(Debug, Default)]
pub struct VecWriter {
    buffer: Vec<u8>,
    position: u64,
}

impl VecWriter {
    /// Create a new VecWriter with an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new VecWriter with the given initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            position: 0,
        }
    }

    /// Consume the writer and return the underlying buffer.
    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl FamosWrite for VecWriter {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let pos = usize::try_from(self.position)
            .map_err(|_| Error::InvalidArgument("position exceeds address space".into()))?;
        let end = pos + bytes.len();

        if end > self.buffer.len() {
            self.buffer.resize(end, 0);
        }

        self.buffer[pos..end].copy_from_slice(bytes);
        self.position = end as u64;
        Ok(())
    }

    fn seek(&mut self, pos: u64) -> Result<u64> {
        self.position = pos;
        Ok(self.position)
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Adapter implementing [`FamosWrite`] for any `Write + Seek` stream.
pub struct StreamWriter<W: Write + Seek> {
    inner: W,
    position: u64,
}

impl<W: Write + Seek> StreamWriter<W> {
    /// Wrap `inner`; writing starts at its current position.
    pub fn new(mut inner: W) -> Result<Self> {
        let position = inner.stream_position()?;
        Ok(Self { inner, position })
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write + Seek> FamosWrite for StreamWriter<W> {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        self.position += bytes.len() as u64;
        Ok(())
    }

    fn seek(&mut self, pos: u64) -> Result<u64> {
        self.inner.seek(SeekFrom::Start(pos))?;
        self.position = pos;
        Ok(self.position)
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

/// Buffered file sink.
pub type FileWriter = StreamWriter<BufWriter<File>>;

impl StreamWriter<BufWriter<File>> {
    /// Open `path` for writing with a `BufWriter` of `capacity` bytes.
    pub fn create(path: impl AsRef<Path>, mode: SaveMode, capacity: usize) -> Result<Self> {
        let mut options = OpenOptions::new();
        options.write(true);
        match mode {
            SaveMode::CreateNew => options.create_new(true),
            SaveMode::Overwrite => options.create(true).truncate(true),
        };
        let file = options.open(path)?;
        Self::new(BufWriter::with_capacity(capacity, file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_restores_position() {
        let mut w = VecWriter::new();
        w.write_all(b"|CK,1,3,1,0;").unwrap();
        w.patch(10, b"1").unwrap();
        assert_eq!(w.position(), 12);
        w.write_all(b"\r\n").unwrap();
        assert_eq!(w.as_slice(), b"|CK,1,3,1,1;\r\n");
    }

    #[test]
    fn create_new_refuses_existing_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = FileWriter::create(file.path(), SaveMode::CreateNew, 1024);
        assert!(matches!(err, Err(Error::Io(_))));
        assert!(FileWriter::create(file.path(), SaveMode::Overwrite, 1024).is_ok());
    }
}
