//! Model builder: semantic sections and symbols derived from raw records.

pub mod builder;
pub mod types;

pub use builder::{build_model, locate_symbol_table, ElfModel, SymbolTableLocation};
pub use types::*;
