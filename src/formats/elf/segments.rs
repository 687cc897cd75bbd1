//! Program header table decoding

use crate::error::{ParseStage, Result};
use crate::formats::elf::sections::entry_stride;
use crate::formats::elf::types::*;
use crate::formats::elf::utils::{read_exact_at, table_len, EndianRead};
use crate::io::ByteSource;
use tracing::debug;

/// Read the program header table, if the file declares one.
///
/// Relocatable objects carry no program headers; that yields an empty list,
/// not an error.
pub fn parse_program_headers(
    source: &mut ByteSource,
    header: &ElfHeader,
) -> Result<Vec<ProgramHeader>> {
    if !header.has_program_headers() {
        debug!("No program header table");
        return Ok(Vec::new());
    }

    let stride = entry_stride(header.e_phentsize, PHDR_SIZE);
    let table = read_exact_at(
        source,
        header.e_phoff,
        table_len(header.e_phnum as u64, stride as u64),
        ParseStage::ProgramHeaders,
    )?;

    let endian = header.ident.data;
    let headers: Vec<ProgramHeader> = table
        .chunks_exact(stride)
        .filter_map(|entry| decode_program_header(entry, endian))
        .collect();

    debug!(count = headers.len(), offset = header.e_phoff, "Decoded program headers");
    Ok(headers)
}

/// Decode one 56-byte program header record.
pub fn decode_program_header(data: &[u8], endian: ElfData) -> Option<ProgramHeader> {
    Some(ProgramHeader {
        p_type: data.read_u32(0, endian)?,
        p_flags: data.read_u32(4, endian)?,
        p_offset: data.read_u64(8, endian)?,
        p_vaddr: data.read_u64(16, endian)?,
        p_paddr: data.read_u64(24, endian)?,
        p_filesz: data.read_u64(32, endian)?,
        p_memsz: data.read_u64(40, endian)?,
        p_align: data.read_u64(48, endian)?,
    })
}
