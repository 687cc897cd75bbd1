//! ELF64 raw decoder
//!
//! Reads the fixed-layout records of an ELF64 file (file header, section
//! headers, program headers, symbol entries) at the offsets the file
//! declares, and resolves names from string-table blobs. No interpretation
//! happens here beyond byte-for-byte decoding; see `crate::model` for that.

pub mod headers;
pub mod sections;
pub mod segments;
pub mod symbols;
pub mod types;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

use crate::error::Result;
use crate::io::ByteSource;
use headers::parse_header;
use sections::{parse_section_headers, read_section_names};
use std::borrow::Cow;
pub use types::*;
use utils::resolve_string;

/// The structures every later stage depends on: the file header, the
/// section header table and the section-name string table.
#[derive(Debug, Clone)]
pub struct RawElf {
    pub header: ElfHeader,
    pub section_headers: Vec<SectionHeader>,
    pub section_names: Vec<u8>,
}

impl RawElf {
    /// Decode header, section headers and section names, in that order.
    pub fn decode(source: &mut ByteSource) -> Result<Self> {
        let header = parse_header(source)?;
        let section_headers = parse_section_headers(source, &header)?;
        let section_names = read_section_names(source, &header, &section_headers)?;

        Ok(Self {
            header,
            section_headers,
            section_names,
        })
    }

    pub fn endian(&self) -> ElfData {
        self.header.ident.data
    }

    /// Index of the section-name string table.
    pub fn shstrndx(&self) -> usize {
        self.header.e_shstrndx as usize
    }

    pub fn section_name(&self, header: &SectionHeader) -> Cow<'_, str> {
        resolve_string(&self.section_names, header.sh_name as usize)
    }
}
