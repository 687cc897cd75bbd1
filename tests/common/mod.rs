//! Common test utilities and fixtures.
//!
//! Fixtures are real ELF64 relocatable objects produced with the `object`
//! crate's writer, so they carry the section and symbol layout a compiler
//! toolchain would emit.

pub mod test_utils;

use object::write::{Object, StandardSection, Symbol, SymbolSection};
use object::{Architecture, BinaryFormat, Endianness, SymbolFlags, SymbolKind, SymbolScope};
use std::path::PathBuf;

/// Builder for an ELF64 relocatable object.
pub struct TestObject {
    obj: Object<'static>,
}

impl TestObject {
    /// x86-64, little endian.
    pub fn new() -> Self {
        Self {
            obj: Object::new(BinaryFormat::Elf, Architecture::X86_64, Endianness::Little),
        }
    }

    /// PowerPC64, big endian.
    pub fn big_endian() -> Self {
        Self {
            obj: Object::new(BinaryFormat::Elf, Architecture::PowerPc64, Endianness::Big),
        }
    }

    /// Append `size` bytes of code to `.text` under a global function symbol.
    /// Returns the symbol address.
    pub fn function(&mut self, name: &str, size: u64) -> u64 {
        self.add(StandardSection::Text, SymbolKind::Text, name, size, 0xc3)
    }

    /// Append `size` bytes to `.data` under a global object symbol.
    pub fn data(&mut self, name: &str, size: u64) -> u64 {
        self.add(StandardSection::Data, SymbolKind::Data, name, size, 0)
    }

    pub fn file_symbol(&mut self, name: &str) {
        self.obj.add_file_symbol(name.as_bytes().to_vec());
    }

    fn add(
        &mut self,
        section: StandardSection,
        kind: SymbolKind,
        name: &str,
        size: u64,
        fill: u8,
    ) -> u64 {
        let section = self.obj.section_id(section);
        let value = self.obj.append_section_data(section, &vec![fill; size as usize], 16);
        self.obj.add_symbol(Symbol {
            name: name.as_bytes().to_vec(),
            value,
            size,
            kind,
            scope: SymbolScope::Linkage,
            weak: false,
            section: SymbolSection::Section(section),
            flags: SymbolFlags::None,
        });
        value
    }

    pub fn build(self) -> Vec<u8> {
        self.obj.write().expect("object writer")
    }
}

/// An object with three adjacent functions and one data object.
pub fn sample_object() -> Vec<u8> {
    let mut obj = TestObject::new();
    obj.file_symbol("sample.c");
    obj.function("_start", 0x30);
    obj.function("main", 0x40);
    obj.function("_ZN3foo3barEv", 0x20);
    obj.data("counter", 8);
    obj.build()
}

/// A system executable to parse, if one is available.
pub fn system_binary() -> Option<PathBuf> {
    ["/bin/ls", "/usr/bin/ls", "/bin/sh", "/usr/bin/env"]
        .into_iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}
