//! Semantic types produced by the model builder.

use crate::demangle;
use crate::formats::elf::types::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Symbol type, decoded from the low 4 bits of `st_info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    /// No type specified (e.g. absolute symbols)
    None,
    /// Data object
    Object,
    /// Function or other executable code
    Function,
    /// Section symbol
    Section,
    /// Source file name
    File,
    /// Uninitialized common block
    Common,
    /// Thread-local data object
    Tls,
    /// Reserved or processor/OS-specific type
    Unknown(u8),
}

impl SymbolKind {
    pub fn from_info(info: u8) -> Self {
        match info & 0x0f {
            STT_NOTYPE => SymbolKind::None,
            STT_OBJECT => SymbolKind::Object,
            STT_FUNC => SymbolKind::Function,
            STT_SECTION => SymbolKind::Section,
            STT_FILE => SymbolKind::File,
            STT_COMMON => SymbolKind::Common,
            STT_TLS => SymbolKind::Tls,
            other => SymbolKind::Unknown(other),
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolKind::None => write!(f, "NOTYPE"),
            SymbolKind::Object => write!(f, "OBJECT"),
            SymbolKind::Function => write!(f, "FUNC"),
            SymbolKind::Section => write!(f, "SECTION"),
            SymbolKind::File => write!(f, "FILE"),
            SymbolKind::Common => write!(f, "COMMON"),
            SymbolKind::Tls => write!(f, "TLS"),
            SymbolKind::Unknown(v) => write!(f, "UNKNOWN({v})"),
        }
    }
}

/// Symbol binding, from the high 4 bits of `st_info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolBinding {
    Local,
    Global,
    Weak,
    Other(u8),
}

impl SymbolBinding {
    pub fn from_info(info: u8) -> Self {
        match info >> 4 {
            STB_LOCAL => SymbolBinding::Local,
            STB_GLOBAL => SymbolBinding::Global,
            STB_WEAK => SymbolBinding::Weak,
            other => SymbolBinding::Other(other),
        }
    }
}

/// Symbol visibility, from the low 2 bits of `st_other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolVisibility {
    Default,
    Internal,
    Hidden,
    Protected,
}

impl SymbolVisibility {
    pub fn from_other(other: u8) -> Self {
        match other & 0x3 {
            STV_INTERNAL => SymbolVisibility::Internal,
            STV_HIDDEN => SymbolVisibility::Hidden,
            STV_PROTECTED => SymbolVisibility::Protected,
            _ => SymbolVisibility::Default,
        }
    }
}

/// Which table the symbol collection was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolSource {
    /// `.symtab` / `.strtab`
    Static,
    /// `.dynsym` / `.dynstr`
    Dynamic,
}

impl fmt::Display for SymbolSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolSource::Static => write!(f, "static"),
            SymbolSource::Dynamic => write!(f, "dynamic"),
        }
    }
}

/// A section with its resolved name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Position in the section header table
    pub index: usize,
    pub name: String,
    pub address: u64,
    pub size: u64,
    /// Raw `sh_type`
    pub kind: u32,
    /// Raw `sh_flags`
    pub flags: u64,
}

impl Section {
    pub fn flags(&self) -> SectionFlags {
        SectionFlags::from_bits_retain(self.flags)
    }

    pub fn is_executable(&self) -> bool {
        self.flags().contains(SectionFlags::EXECINSTR)
    }

    pub fn is_allocated(&self) -> bool {
        self.flags().contains(SectionFlags::ALLOC)
    }

    pub fn is_writable(&self) -> bool {
        self.flags().contains(SectionFlags::WRITE)
    }
}

/// A symbol with its resolved name and decoded type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub address: u64,
    pub size: u64,
    pub kind: SymbolKind,
    pub binding: SymbolBinding,
    pub visibility: SymbolVisibility,
    /// Raw `st_shndx`
    pub section_index: u16,
}

impl Symbol {
    /// Code entry point; what callers filter on to find call targets.
    pub fn is_function(&self) -> bool {
        self.kind == SymbolKind::Function
    }

    pub fn is_undefined(&self) -> bool {
        self.section_index == SHN_UNDEF
    }

    /// Demangled Rust or Itanium C++ name, if the name is mangled.
    pub fn demangled_name(&self) -> Option<String> {
        demangle::demangle_one(&self.name)
    }
}

/// Read-only projection of the file header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Raw `e_type`
    pub file_type: u16,
    /// Raw `e_machine`
    pub machine: u16,
    pub version: u32,
    pub entry: u64,
    pub flags: u32,
}

impl Metadata {
    pub fn object_type(&self) -> ElfType {
        ElfType::from(self.file_type)
    }

    pub fn machine_kind(&self) -> ElfMachine {
        ElfMachine::from(self.machine)
    }
}

impl From<&ElfHeader> for Metadata {
    fn from(header: &ElfHeader) -> Self {
        Self {
            file_type: header.e_type,
            machine: header.e_machine,
            version: header.e_version,
            entry: header.e_entry,
            flags: header.e_flags,
        }
    }
}
