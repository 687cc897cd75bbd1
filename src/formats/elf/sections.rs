//! Section header table decoding

use crate::error::{ParseStage, Result};
use crate::formats::elf::types::*;
use crate::formats::elf::utils::{read_exact_at, table_len, EndianRead};
use crate::io::ByteSource;
use tracing::{debug, warn};

/// Read every section header declared by the file header.
///
/// The whole table must be present; a short table is a `TruncatedRead` in
/// the section-headers stage.
pub fn parse_section_headers(
    source: &mut ByteSource,
    header: &ElfHeader,
) -> Result<Vec<SectionHeader>> {
    let stride = entry_stride(header.e_shentsize, SHDR_SIZE);
    let count = header.e_shnum as usize;
    let table = read_exact_at(
        source,
        header.e_shoff,
        table_len(count as u64, stride as u64),
        ParseStage::SectionHeaders,
    )?;

    let endian = header.ident.data;
    let headers: Vec<SectionHeader> = table
        .chunks_exact(stride)
        .filter_map(|entry| decode_section_header(entry, endian))
        .collect();

    debug!(count = headers.len(), offset = header.e_shoff, "Decoded section headers");
    Ok(headers)
}

/// Read the section-name string table (`e_shstrndx`).
///
/// An out-of-range index or a `SHT_NOBITS` table yields an empty blob, which
/// makes every section name resolve to "".
pub fn read_section_names(
    source: &mut ByteSource,
    header: &ElfHeader,
    headers: &[SectionHeader],
) -> Result<Vec<u8>> {
    let Some(strtab) = headers.get(header.e_shstrndx as usize) else {
        warn!(
            e_shstrndx = header.e_shstrndx,
            sections = headers.len(),
            "Section name table index out of range"
        );
        return Ok(Vec::new());
    };
    if strtab.sh_type == SHT_NOBITS {
        warn!(e_shstrndx = header.e_shstrndx, "Section name table has no file data");
        return Ok(Vec::new());
    }

    let bytes = read_exact_at(
        source,
        strtab.sh_offset,
        strtab.sh_size,
        ParseStage::SectionStringTable,
    )?;
    Ok(bytes.to_vec())
}

/// Decode one 64-byte section header record.
pub fn decode_section_header(data: &[u8], endian: ElfData) -> Option<SectionHeader> {
    Some(SectionHeader {
        sh_name: data.read_u32(0, endian)?,
        sh_type: data.read_u32(4, endian)?,
        sh_flags: data.read_u64(8, endian)?,
        sh_addr: data.read_u64(16, endian)?,
        sh_offset: data.read_u64(24, endian)?,
        sh_size: data.read_u64(32, endian)?,
        sh_link: data.read_u32(40, endian)?,
        sh_info: data.read_u32(44, endian)?,
        sh_addralign: data.read_u64(48, endian)?,
        sh_entsize: data.read_u64(56, endian)?,
    })
}

/// Declared table entry size, never smaller than the ELF64 record.
pub(crate) fn entry_stride(declared: u16, record: usize) -> usize {
    let declared = declared as usize;
    if declared < record {
        if declared != 0 {
            warn!(declared, record, "Entry size smaller than ELF64 record, using record size");
        }
        record
    } else {
        declared
    }
}
