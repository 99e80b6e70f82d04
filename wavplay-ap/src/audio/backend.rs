//! Byte-stream backends
//!
//! One backend per source kind, both exposing the same open/read/seek/close
//! contract. `Backend` dispatches over them with a plain `match`.
//!
//! `read`/`seek` are only valid between a successful `open` and `close`;
//! outside that window they fail with `BackendError::NotOpen`. Dropping a
//! `Backend` closes it, so every exit path (including `?` early returns)
//! releases the file handle exactly once.

use crate::audio::SourceDescriptor;
use crate::error::BackendError;
use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::PathBuf;
use tracing::trace;

/// Cursor over a WAV image in program memory
#[derive(Debug)]
pub struct EmbeddedBackend {
    data: &'static [u8],
    pos: usize,
    open: bool,
}

impl EmbeddedBackend {
    pub fn new(data: &'static [u8]) -> Self {
        Self {
            data,
            pos: 0,
            open: false,
        }
    }

    /// Reset the cursor to the start of the region
    pub fn open(&mut self) -> Result<(), BackendError> {
        if self.data.is_empty() {
            return Err(BackendError::Unavailable(
                "embedded region is empty".to_string(),
            ));
        }
        self.pos = 0;
        self.open = true;
        Ok(())
    }

    /// Copy forward from the cursor
    ///
    /// Reads are bounded by the end of the region; at the end they return 0.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, BackendError> {
        if !self.open {
            return Err(BackendError::NotOpen);
        }
        let remaining = self.data.get(self.pos..).unwrap_or(&[]);
        let n = buf.len().min(remaining.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }

    /// Reposition the cursor to `base + offset`
    pub fn seek(&mut self, offset: u64) -> Result<(), BackendError> {
        if !self.open {
            return Err(BackendError::NotOpen);
        }
        self.pos = usize::try_from(offset).unwrap_or(usize::MAX);
        Ok(())
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Current cursor offset from the start of the region
    pub fn position(&self) -> usize {
        self.pos
    }
}

/// Open file on a mounted filesystem
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    file: Option<File>,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    /// Open for binary read; a second open on an open handle is a no-op
    pub fn open(&mut self) -> Result<(), BackendError> {
        if self.file.is_some() {
            return Ok(());
        }
        let file = File::open(&self.path).map_err(|e| {
            BackendError::Unavailable(format!("{}: {}", self.path.display(), e))
        })?;
        self.file = Some(file);
        Ok(())
    }

    /// Blocking read of up to `buf.len()` bytes
    ///
    /// Near end-of-file the count may be short; 0 means end-of-file.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, BackendError> {
        let file = self.file.as_mut().ok_or(BackendError::NotOpen)?;
        loop {
            match file.read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub fn seek(&mut self, offset: u64) -> Result<(), BackendError> {
        let file = self.file.as_mut().ok_or(BackendError::NotOpen)?;
        file.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Close the descriptor; safe to repeat
    pub fn close(&mut self) {
        self.file = None;
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }
}

/// Byte source for one clip, selected by source kind
#[derive(Debug)]
pub enum Backend {
    Embedded(EmbeddedBackend),
    File(FileBackend),
}

impl Backend {
    /// Build an unopened backend for `source`
    pub fn from_source(source: &SourceDescriptor) -> Self {
        match source {
            SourceDescriptor::Embedded(data) => Backend::Embedded(EmbeddedBackend::new(data)),
            SourceDescriptor::FilePath(path) => Backend::File(FileBackend::new(path.clone())),
        }
    }

    pub fn open(&mut self) -> Result<(), BackendError> {
        match self {
            Backend::Embedded(b) => b.open(),
            Backend::File(b) => b.open(),
        }
    }

    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, BackendError> {
        match self {
            Backend::Embedded(b) => b.read(buf),
            Backend::File(b) => b.read(buf),
        }
    }

    pub fn seek(&mut self, offset: u64) -> Result<(), BackendError> {
        match self {
            Backend::Embedded(b) => b.seek(offset),
            Backend::File(b) => b.seek(offset),
        }
    }

    pub fn close(&mut self) {
        match self {
            Backend::Embedded(b) => b.close(),
            Backend::File(b) => b.close(),
        }
    }

    pub fn is_open(&self) -> bool {
        match self {
            Backend::Embedded(b) => b.is_open(),
            Backend::File(b) => b.is_open(),
        }
    }

    /// Fill `buf` completely unless the stream ends first
    ///
    /// Returns the number of bytes read; less than `buf.len()` only at
    /// end-of-stream.
    pub fn read_full(&mut self, buf: &mut [u8]) -> Result<usize, BackendError> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(filled)
    }
}

impl Drop for Backend {
    fn drop(&mut self) {
        if self.is_open() {
            trace!("Closing backend on drop");
            self.close();
        }
    }
}
