//! Compare parse results with the `object` crate's reader.

use crate::common::{sample_object, system_binary};
use minielf::{ElfFile, SymbolSource};
use object::{Object, ObjectSection, ObjectSymbol};

fn assert_matches_reader(elf: &ElfFile, data: &[u8]) {
    let reader = object::File::parse(data).expect("object reader");

    for section in reader.sections() {
        let Ok(name) = section.name() else { continue };
        if name.is_empty() {
            continue;
        }
        let ours = elf
            .sections()
            .iter()
            .find(|s| s.name == name)
            .unwrap_or_else(|| panic!("section {name} missing"));
        assert_eq!(ours.address, section.address(), "{name}");
        assert_eq!(ours.size, section.size(), "{name}");
    }

    let symbols: Vec<_> = match elf.symbol_source() {
        Some(SymbolSource::Static) => reader.symbols().collect(),
        Some(SymbolSource::Dynamic) => reader.dynamic_symbols().collect(),
        None => Vec::new(),
    };
    for symbol in symbols {
        let Ok(name) = symbol.name() else { continue };
        if name.is_empty() {
            continue;
        }
        let found = elf.symbols().iter().any(|s| {
            s.name == name && s.address == symbol.address() && s.size == symbol.size()
        });
        assert!(found, "symbol {name} missing");
    }
}

#[test]
fn relocatable_object_matches_reader() {
    let data = sample_object();
    let elf = ElfFile::from_bytes(data.clone());
    assert!(elf.is_valid());
    assert_matches_reader(&elf, &data);
}

#[test]
fn system_binary_matches_reader() {
    let Some(path) = system_binary() else {
        eprintln!("Skipping system binary test; none found");
        return;
    };
    let data = std::fs::read(&path).unwrap();
    if !data.starts_with(b"\x7fELF") || data.get(4) != Some(&2) {
        eprintln!("Skipping {}; not ELF64", path.display());
        return;
    }

    let elf = ElfFile::open(&path);
    assert!(elf.is_valid(), "{}", elf.diagnostics());
    assert!(!elf.sections().is_empty());
    assert!(!elf.program_headers().is_empty());
    assert_matches_reader(&elf, &data);

    // Every section is found by its own address when it has a size.
    for section in elf.sections().iter().filter(|s| s.is_allocated() && s.size > 0) {
        let found = elf.section_by_address(section.address).unwrap();
        assert!(found.address <= section.address && section.address < found.address + found.size);
    }
}
