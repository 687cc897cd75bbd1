//! MiniELF: an ELF64 parser with fast address and name lookups.
//!
//! ```no_run
//! use minielf::ElfFile;
//!
//! let elf = ElfFile::open("/bin/ls");
//! if elf.is_valid() {
//!     if let Some(sym) = elf.nearest_symbol(0x1090) {
//!         println!("{} @ {:#x}", sym.name, sym.address);
//!     }
//! } else {
//!     eprintln!("{}", elf.diagnostics());
//! }
//! ```

/// Parse options
pub mod config;
/// Rust and C++ symbol demangling
pub mod demangle;
/// Accessor facade and parse state
pub mod elf_file;
/// Error types
pub mod error;
/// Raw record decoding
pub mod formats;
/// Address and name lookup index
pub mod index;
/// Bounded byte sources
pub mod io;
/// Tracing setup and logging macros
pub mod logging;
/// Semantic model built from raw records
pub mod model;

pub use config::ParseOptions;
pub use elf_file::{Diagnostics, ElfFile, ParseState};
pub use error::{MiniElfError, ParseStage, Result};
pub use io::IOLimits;
pub use model::{
    Metadata, Section, Symbol, SymbolBinding, SymbolKind, SymbolSource, SymbolVisibility,
};
