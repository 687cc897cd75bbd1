//! Utility functions for ELF decoding

use crate::error::{MiniElfError, ParseStage, Result};
use crate::formats::elf::types::ElfData;
use crate::io::ByteSource;
use bytes::Bytes;
use std::borrow::Cow;

/// Fixed-width reads honoring the file's data encoding.
///
/// Each read returns `None` when the field does not fit in the slice.
pub trait EndianRead {
    fn read_u16(&self, offset: usize, data: ElfData) -> Option<u16>;
    fn read_u32(&self, offset: usize, data: ElfData) -> Option<u32>;
    fn read_u64(&self, offset: usize, data: ElfData) -> Option<u64>;
}

impl EndianRead for [u8] {
    fn read_u16(&self, offset: usize, data: ElfData) -> Option<u16> {
        let bytes: [u8; 2] = self.get(offset..offset.checked_add(2)?)?.try_into().ok()?;
        Some(match data {
            ElfData::Little => u16::from_le_bytes(bytes),
            ElfData::Big => u16::from_be_bytes(bytes),
        })
    }

    fn read_u32(&self, offset: usize, data: ElfData) -> Option<u32> {
        let bytes: [u8; 4] = self.get(offset..offset.checked_add(4)?)?.try_into().ok()?;
        Some(match data {
            ElfData::Little => u32::from_le_bytes(bytes),
            ElfData::Big => u32::from_be_bytes(bytes),
        })
    }

    fn read_u64(&self, offset: usize, data: ElfData) -> Option<u64> {
        let bytes: [u8; 8] = self.get(offset..offset.checked_add(8)?)?.try_into().ok()?;
        Some(match data {
            ElfData::Little => u64::from_le_bytes(bytes),
            ElfData::Big => u64::from_be_bytes(bytes),
        })
    }
}

/// Resolve a NUL-terminated string from a string-table blob.
///
/// Out-of-range offsets and unterminated strings resolve to "" so a single
/// bad name never aborts the parse. Invalid UTF-8 is replaced lossily.
pub fn resolve_string(blob: &[u8], offset: usize) -> Cow<'_, str> {
    let Some(tail) = blob.get(offset..) else {
        return Cow::Borrowed("");
    };
    match memchr::memchr(0, tail) {
        Some(end) => String::from_utf8_lossy(&tail[..end]),
        None => Cow::Borrowed(""),
    }
}

/// Read exactly `len` bytes at `offset` for a given stage.
///
/// Requests that run past the end of the input fail with `TruncatedRead`
/// before any bytes are copied.
pub fn read_exact_at(
    source: &mut ByteSource,
    offset: u64,
    len: u64,
    stage: ParseStage,
) -> Result<Bytes> {
    let available = source.size().saturating_sub(offset);
    if len > available {
        return Err(MiniElfError::truncated(stage, offset, len, available));
    }
    let bytes = source.read_at(offset, len)?;
    if bytes.len() as u64 != len {
        return Err(MiniElfError::truncated(stage, offset, len, bytes.len() as u64));
    }
    Ok(bytes)
}

/// `count * stride` as a byte length, treating overflow as unsatisfiable.
pub fn table_len(count: u64, stride: u64) -> u64 {
    count.checked_mul(stride).unwrap_or(u64::MAX)
}
