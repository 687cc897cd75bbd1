//! Symbol table record decoding

use crate::error::{ParseStage, Result};
use crate::formats::elf::types::*;
use crate::formats::elf::utils::{read_exact_at, EndianRead};
use crate::io::ByteSource;
use tracing::{debug, warn};

/// Bulk-read the fixed records of a `SHT_SYMTAB`/`SHT_DYNSYM` section.
///
/// The entry count is `sh_size / sh_entsize`. A zero entry size falls back
/// to the ELF64 record size; a declared size smaller than a record means the
/// table is unusable and yields no entries.
pub fn parse_symbol_entries(
    source: &mut ByteSource,
    symtab: &SectionHeader,
    endian: ElfData,
) -> Result<Vec<SymbolEntry>> {
    let stride = match symtab.sh_entsize {
        0 => SYM_SIZE as u64,
        n if n < SYM_SIZE as u64 => {
            warn!(sh_entsize = n, "Symbol entry size too small, ignoring table");
            return Ok(Vec::new());
        }
        n => n,
    };
    let count = symtab.sh_size / stride;
    let table = read_exact_at(
        source,
        symtab.sh_offset,
        count * stride,
        ParseStage::SymbolTable,
    )?;

    let entries: Vec<SymbolEntry> = table
        .chunks_exact(stride as usize)
        .filter_map(|entry| decode_symbol(entry, endian))
        .collect();

    debug!(count = entries.len(), offset = symtab.sh_offset, "Decoded symbol entries");
    Ok(entries)
}

/// Read the string table paired with a symbol table.
pub fn read_string_table(source: &mut ByteSource, strtab: &SectionHeader) -> Result<Vec<u8>> {
    if strtab.sh_type == SHT_NOBITS {
        return Ok(Vec::new());
    }
    let bytes = read_exact_at(source, strtab.sh_offset, strtab.sh_size, ParseStage::SymbolTable)?;
    Ok(bytes.to_vec())
}

/// Decode one 24-byte ELF64 symbol record.
pub fn decode_symbol(data: &[u8], endian: ElfData) -> Option<SymbolEntry> {
    Some(SymbolEntry {
        st_name: data.read_u32(0, endian)?,
        st_info: *data.get(4)?,
        st_other: *data.get(5)?,
        st_shndx: data.read_u16(6, endian)?,
        st_value: data.read_u64(8, endian)?,
        st_size: data.read_u64(16, endian)?,
    })
}
