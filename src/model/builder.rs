//! Turns raw decoded records into `Section`/`Symbol` collections.

use crate::error::Result;
use crate::formats::elf::symbols::{parse_symbol_entries, read_string_table};
use crate::formats::elf::types::*;
use crate::formats::elf::utils::resolve_string;
use crate::formats::elf::RawElf;
use crate::io::ByteSource;
use crate::model::types::*;
use tracing::{debug, warn};

/// Parsed, immutable model of an ELF64 file.
#[derive(Debug, Clone, Default)]
pub struct ElfModel {
    /// In section header table order
    pub sections: Vec<Section>,
    /// In symbol table order, minus skipped records
    pub symbols: Vec<Symbol>,
    pub symbol_source: Option<SymbolSource>,
    /// Records dropped because their name offset fell outside the string table
    pub skipped_symbols: usize,
}

/// The symbol table / string table pair chosen for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolTableLocation {
    pub symtab: usize,
    pub strtab: usize,
    pub source: SymbolSource,
}

/// Build the full model: sections first, then symbols.
pub fn build_model(source: &mut ByteSource, raw: &RawElf) -> Result<ElfModel> {
    let sections = build_sections(raw);

    let Some(location) = locate_symbol_table(&raw.section_headers, raw.shstrndx()) else {
        debug!("No symbol table found");
        return Ok(ElfModel {
            sections,
            ..ElfModel::default()
        });
    };

    let (symbols, skipped_symbols) = build_symbols(source, raw, location)?;
    Ok(ElfModel {
        sections,
        symbols,
        symbol_source: Some(location.source),
        skipped_symbols,
    })
}

/// One `Section` per section header, in file order.
pub fn build_sections(raw: &RawElf) -> Vec<Section> {
    raw.section_headers
        .iter()
        .enumerate()
        .map(|(index, sh)| Section {
            index,
            name: raw.section_name(sh).into_owned(),
            address: sh.sh_addr,
            size: sh.sh_size,
            kind: sh.sh_type,
            flags: sh.sh_flags,
        })
        .collect()
}

/// Pick the symbol table and its string table.
///
/// `SHT_SYMTAB` is preferred over `SHT_DYNSYM`; the first section of a type
/// is used. The string table is the one named by the symbol table's
/// `sh_link` when that is a string table other than the section-name table.
/// Failing that, the first such string table is used as a last resort. A
/// symbol table with no usable string table falls through to the next type.
pub fn locate_symbol_table(
    headers: &[SectionHeader],
    shstrndx: usize,
) -> Option<SymbolTableLocation> {
    [(SHT_SYMTAB, SymbolSource::Static), (SHT_DYNSYM, SymbolSource::Dynamic)]
        .into_iter()
        .find_map(|(sh_type, source)| {
            let symtab = headers.iter().position(|sh| sh.sh_type == sh_type)?;
            let strtab = find_string_table(headers, symtab, shstrndx);
            if strtab.is_none() {
                warn!(symtab, ?source, "Symbol table has no usable string table");
            }
            Some(SymbolTableLocation {
                symtab,
                strtab: strtab?,
                source,
            })
        })
}

fn find_string_table(headers: &[SectionHeader], symtab: usize, shstrndx: usize) -> Option<usize> {
    let usable = |idx: usize| {
        idx != shstrndx && headers.get(idx).is_some_and(|sh| sh.sh_type == SHT_STRTAB)
    };

    let link = headers[symtab].sh_link as usize;
    if usable(link) {
        return Some(link);
    }
    let fallback = (0..headers.len()).find(|&idx| usable(idx));
    if let Some(idx) = fallback {
        debug!(symtab, link, strtab = idx, "Symbol table link unusable, using first string table");
    }
    fallback
}

/// Read the chosen table and resolve each record.
///
/// Returns the symbols and the number of records skipped for an
/// out-of-range name offset.
pub fn build_symbols(
    source: &mut ByteSource,
    raw: &RawElf,
    location: SymbolTableLocation,
) -> Result<(Vec<Symbol>, usize)> {
    let symtab = &raw.section_headers[location.symtab];
    let strtab = &raw.section_headers[location.strtab];

    let entries = parse_symbol_entries(source, symtab, raw.endian())?;
    let strings = read_string_table(source, strtab)?;

    let mut skipped = 0usize;
    let mut symbols = Vec::with_capacity(entries.len());
    for entry in &entries {
        if entry.st_name as usize >= strings.len() {
            skipped += 1;
            continue;
        }
        symbols.push(Symbol {
            name: resolve_string(&strings, entry.st_name as usize).into_owned(),
            address: entry.st_value,
            size: entry.st_size,
            kind: SymbolKind::from_info(entry.st_info),
            binding: SymbolBinding::from_info(entry.st_info),
            visibility: SymbolVisibility::from_other(entry.st_other),
            section_index: entry.st_shndx,
        });
    }

    if skipped > 0 {
        warn!(skipped, total = entries.len(), "Skipped symbols with out-of-range names");
    }
    debug!(
        source = %location.source,
        symtab = location.symtab,
        strtab = location.strtab,
        count = symbols.len(),
        "Resolved symbol table"
    );
    Ok((symbols, skipped))
}
