//! ELF64 file header decoding

use crate::error::{MiniElfError, ParseStage, Result};
use crate::formats::elf::types::*;
use crate::formats::elf::utils::EndianRead;
use crate::io::ByteSource;
use tracing::{debug, warn};

/// Read and validate the file header at offset 0.
///
/// Checks run in a fixed order: magic, class, full header length, then the
/// presence of a section header table.
pub fn parse_header(source: &mut ByteSource) -> Result<ElfHeader> {
    let bytes = source.read_at(0, EHDR_SIZE as u64)?;
    let header = decode_header(&bytes)?;

    if header.e_shoff == 0 || header.e_shnum == 0 {
        return Err(MiniElfError::NoSectionHeaders);
    }

    debug!(
        e_type = header.e_type,
        e_machine = header.e_machine,
        e_shoff = header.e_shoff,
        e_shnum = header.e_shnum,
        e_phnum = header.e_phnum,
        "Decoded ELF header"
    );
    Ok(header)
}

/// Decode the identification and header fields from a header-sized prefix.
pub fn decode_header(data: &[u8]) -> Result<ElfHeader> {
    if data.len() < ELF_MAGIC.len() || &data[..4] != ELF_MAGIC {
        return Err(MiniElfError::NotElf);
    }

    let class = match data.get(4) {
        Some(&c) => c,
        None => return Err(truncated_header(data.len())),
    };
    if class != ELFCLASS64 {
        return Err(MiniElfError::UnsupportedClass(class));
    }

    if data.len() < EHDR_SIZE {
        return Err(truncated_header(data.len()));
    }

    let endian = ElfData::from_u8(data[5]).unwrap_or_else(|| {
        warn!(ei_data = data[5], "Unknown ELF data encoding, assuming little endian");
        ElfData::Little
    });

    let ident = ElfIdent {
        class,
        data: endian,
        version: data[6],
        osabi: data[7],
        abiversion: data[8],
    };

    let field_err = || truncated_header(data.len());

    Ok(ElfHeader {
        ident,
        e_type: data.read_u16(16, endian).ok_or_else(field_err)?,
        e_machine: data.read_u16(18, endian).ok_or_else(field_err)?,
        e_version: data.read_u32(20, endian).ok_or_else(field_err)?,
        e_entry: data.read_u64(24, endian).ok_or_else(field_err)?,
        e_phoff: data.read_u64(32, endian).ok_or_else(field_err)?,
        e_shoff: data.read_u64(40, endian).ok_or_else(field_err)?,
        e_flags: data.read_u32(48, endian).ok_or_else(field_err)?,
        e_ehsize: data.read_u16(52, endian).ok_or_else(field_err)?,
        e_phentsize: data.read_u16(54, endian).ok_or_else(field_err)?,
        e_phnum: data.read_u16(56, endian).ok_or_else(field_err)?,
        e_shentsize: data.read_u16(58, endian).ok_or_else(field_err)?,
        e_shnum: data.read_u16(60, endian).ok_or_else(field_err)?,
        e_shstrndx: data.read_u16(62, endian).ok_or_else(field_err)?,
    })
}

fn truncated_header(available: usize) -> MiniElfError {
    MiniElfError::truncated(ParseStage::Header, 0, EHDR_SIZE as u64, available as u64)
}
