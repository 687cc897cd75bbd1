//! Bounded, offset-addressed access to ELF input.
//!
//! `ByteSource` is what the raw decoder seeks around in. Files are
//! memory-mapped read-only; in-memory inputs are held as `Bytes`. Every read
//! is charged against `IOLimits` so hostile headers that declare enormous
//! tables cannot make the decoder copy unbounded amounts of data.

pub mod error;

use crate::io::error::{IoError, Result};
use bytes::Bytes;
use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use tracing::{debug, trace, warn};

/// Defines the resource limits for reading one input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IOLimits {
    /// The absolute maximum input size that will be accepted.
    pub max_file_size: u64,
    /// The maximum total number of bytes the decoder may read across all operations.
    pub max_read_bytes: u64,
}

impl Default for IOLimits {
    fn default() -> Self {
        Self {
            max_file_size: 1024 * 1024 * 1024, // 1GB
            max_read_bytes: 1024 * 1024 * 1024,
        }
    }
}

enum Backing {
    // memmap cannot map empty files.
    Empty,
    Mapped(Mmap),
    Owned(Bytes),
}

/// A bounded random-access view over ELF input bytes.
pub struct ByteSource {
    label: String,
    backing: Backing,
    limits: IOLimits,
    bytes_read: u64,
}

impl ByteSource {
    /// Opens and memory-maps a file.
    ///
    /// Fails if the file cannot be opened or exceeds `limits.max_file_size`.
    pub fn open<P: AsRef<Path>>(path: P, limits: IOLimits) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let file_size = file.metadata()?.len();

        debug!(
            path = %path.display(),
            size = file_size,
            limits.max_file_size = limits.max_file_size,
            "Opening ELF input"
        );

        check_size(file_size, &limits)?;

        let backing = if file_size == 0 {
            Backing::Empty
        } else {
            // Safety: read-only map of a regular file; the map is dropped before
            // parsing returns and nothing borrowed from it outlives the parse.
            Backing::Mapped(unsafe { Mmap::map(&file)? })
        };

        Ok(Self {
            label: path.display().to_string(),
            backing,
            limits,
            bytes_read: 0,
        })
    }

    /// Wraps an in-memory buffer.
    pub fn from_bytes(data: impl Into<Bytes>, limits: IOLimits) -> Result<Self> {
        let data = data.into();
        check_size(data.len() as u64, &limits)?;
        Ok(Self {
            label: "<memory>".to_string(),
            backing: Backing::Owned(data),
            limits,
            bytes_read: 0,
        })
    }

    /// Human-readable origin of the bytes, used in logs and diagnostics.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Total size of the input in bytes.
    pub fn size(&self) -> u64 {
        self.contents().len() as u64
    }

    /// Total number of bytes handed out so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn limits(&self) -> &IOLimits {
        &self.limits
    }

    /// Reads up to `len` bytes at `offset`.
    ///
    /// The result is shorter than `len` when the input ends first and empty when
    /// `offset` is at or past the end. Callers that need a whole record compare
    /// the returned length with what they asked for.
    ///
    /// # Errors
    ///
    /// Returns `IoError::ReadLimitExceeded` if the request would push the total
    /// past `limits.max_read_bytes`.
    pub fn read_at(&mut self, offset: u64, len: u64) -> Result<Bytes> {
        if self.bytes_read.saturating_add(len) > self.limits.max_read_bytes {
            warn!(
                source = %self.label,
                current_read = self.bytes_read,
                requested = len,
                limit = self.limits.max_read_bytes,
                "Read limit exceeded"
            );
            return Err(IoError::ReadLimitExceeded {
                limit: self.limits.max_read_bytes,
                current: self.bytes_read,
            });
        }

        let size = self.size();
        if offset >= size {
            return Ok(Bytes::new());
        }
        let start = offset as usize;
        let end = offset.saturating_add(len).min(size) as usize;

        let out = match &self.backing {
            Backing::Empty => Bytes::new(),
            Backing::Mapped(map) => Bytes::copy_from_slice(&map[start..end]),
            Backing::Owned(bytes) => bytes.slice(start..end),
        };
        self.bytes_read += out.len() as u64;

        trace!(
            source = %self.label,
            offset = offset,
            len = out.len(),
            total_read = self.bytes_read,
            "Performed read"
        );

        Ok(out)
    }

    fn contents(&self) -> &[u8] {
        match &self.backing {
            Backing::Empty => &[],
            Backing::Mapped(map) => &map[..],
            Backing::Owned(bytes) => &bytes[..],
        }
    }
}

fn check_size(size: u64, limits: &IOLimits) -> Result<()> {
    if size > limits.max_file_size {
        warn!(size = size, limit = limits.max_file_size, "Input is too large");
        return Err(IoError::FileTooLarge {
            limit: limits.max_file_size,
            found: size,
        });
    }
    Ok(())
}
