//! Accessor facade over a parsed ELF64 file.
//!
//! Construction runs the whole pipeline synchronously and never fails: the
//! outcome is recorded as a [`ParseState`]. A failed file keeps no partial
//! data and answers every query with `None` or an empty collection.

use crate::config::ParseOptions;
use crate::error::{MiniElfError, ParseStage, Result};
use crate::formats::elf::segments::parse_program_headers;
use crate::formats::elf::{ElfHeader, ProgramHeader, RawElf, SectionHeader};
use crate::index::LookupIndex;
use crate::io::ByteSource;
use crate::model::{build_model, ElfModel, Metadata, Section, Symbol, SymbolSource};
use bytes::Bytes;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Outcome of construction. Never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ParseState {
    Valid,
    Failed { stage: ParseStage, message: String },
}

/// Everything the pipeline produces for a well-formed file.
#[derive(Debug, Default)]
struct Parsed {
    header: Option<ElfHeader>,
    section_headers: Vec<SectionHeader>,
    program_headers: Vec<ProgramHeader>,
    model: ElfModel,
}

/// A parsed ELF64 file and its query surface.
///
/// Read-only after construction; safe to share between threads. The lookup
/// index is built on first query (or during construction with
/// [`ParseOptions::eager`]) exactly once.
#[derive(Debug)]
pub struct ElfFile {
    label: String,
    file_size: u64,
    options: ParseOptions,
    state: ParseState,
    parsed: Parsed,
    index: OnceCell<LookupIndex>,
}

impl ElfFile {
    /// Parse the file at `path` with default options.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self::open_with_options(path, ParseOptions::default())
    }

    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ParseOptions) -> Self {
        let path = path.as_ref();
        match ByteSource::open(path, options.limits.clone()) {
            Ok(mut source) => Self::from_source(&mut source, options),
            Err(err) => Self::failed(path.display().to_string(), 0, options, err.into()),
        }
    }

    /// Parse an in-memory image with default options.
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::from_bytes_with_options(data, ParseOptions::default())
    }

    pub fn from_bytes_with_options(data: impl Into<Bytes>, options: ParseOptions) -> Self {
        let data = data.into();
        let size = data.len() as u64;
        match ByteSource::from_bytes(data, options.limits.clone()) {
            Ok(mut source) => Self::from_source(&mut source, options),
            Err(err) => Self::failed("<memory>".to_string(), size, options, err.into()),
        }
    }

    /// Run the pipeline over an already opened source.
    pub fn from_source(source: &mut ByteSource, options: ParseOptions) -> Self {
        let span = crate::span_trace!("parse_elf", source = %source.label(), size = source.size());
        let _guard = span.enter();

        let label = source.label().to_string();
        let file_size = source.size();
        match parse(source, &options) {
            Ok(parsed) => {
                debug!(
                    sections = parsed.model.sections.len(),
                    symbols = parsed.model.symbols.len(),
                    program_headers = parsed.program_headers.len(),
                    bytes_read = source.bytes_read(),
                    "Parsed ELF file"
                );
                let file = Self {
                    label,
                    file_size,
                    options,
                    state: ParseState::Valid,
                    parsed,
                    index: OnceCell::new(),
                };
                if file.options.eager_index {
                    file.lookup();
                }
                file
            }
            Err(err) => Self::failed(label, file_size, options, err),
        }
    }

    fn failed(label: String, file_size: u64, options: ParseOptions, err: MiniElfError) -> Self {
        let err = crate::log_error!(err, label.as_str());
        Self {
            label,
            file_size,
            options,
            state: ParseState::Failed {
                stage: err.stage(),
                message: err.to_string(),
            },
            parsed: Parsed::default(),
            index: OnceCell::new(),
        }
    }

    /// Index over the model, built on first use.
    fn lookup(&self) -> &LookupIndex {
        self.index.get_or_init(|| LookupIndex::build(&self.parsed.model))
    }

    /// Whether the pipeline completed. Always true for models built with
    /// [`ParseOptions::force_valid_for_testing`].
    pub fn is_valid(&self) -> bool {
        self.options.forces_valid() || self.state == ParseState::Valid
    }

    pub fn state(&self) -> &ParseState {
        &self.state
    }

    pub fn last_error(&self) -> Option<&str> {
        match &self.state {
            ParseState::Valid => None,
            ParseState::Failed { message, .. } => Some(message),
        }
    }

    pub fn failure_stage(&self) -> Option<ParseStage> {
        match &self.state {
            ParseState::Valid => None,
            ParseState::Failed { stage, .. } => Some(*stage),
        }
    }

    /// Where the bytes came from: a path or `<memory>`.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Sections in file order.
    pub fn sections(&self) -> &[Section] {
        &self.parsed.model.sections
    }

    /// Symbols in symbol table order.
    pub fn symbols(&self) -> &[Symbol] {
        &self.parsed.model.symbols
    }

    /// Function symbols, in symbol table order.
    pub fn functions(&self) -> impl Iterator<Item = &Symbol> + '_ {
        self.symbols().iter().filter(|s| s.is_function())
    }

    /// The symbol whose `[address, address + size)` covers `addr`.
    pub fn symbol_by_address(&self, addr: u64) -> Option<&Symbol> {
        self.lookup().symbols_by_address.containing(self.symbols(), addr)
    }

    /// The symbol with the greatest address not above `addr`.
    pub fn nearest_symbol(&self, addr: u64) -> Option<&Symbol> {
        self.lookup().symbols_by_address.nearest_at_or_below(self.symbols(), addr)
    }

    pub fn symbol_by_name(&self, name: &str) -> Option<&Symbol> {
        self.lookup().symbols_by_name.get(self.symbols(), name)
    }

    /// Symbols whose address lies in `[start, end)`, ascending by address.
    pub fn symbols_in_range(&self, start: u64, end: u64) -> impl Iterator<Item = &Symbol> + '_ {
        self.lookup().symbols_by_address.in_range(self.symbols(), start, end)
    }

    /// The function covering `addr`, else the nearest function below it.
    pub fn function_containing(&self, addr: u64) -> Option<&Symbol> {
        let functions = &self.lookup().functions_by_address;
        functions
            .containing(self.symbols(), addr)
            .or_else(|| functions.nearest_at_or_below(self.symbols(), addr))
    }

    pub fn section_by_address(&self, addr: u64) -> Option<&Section> {
        self.lookup().sections_by_address.containing(self.sections(), addr)
    }

    pub fn section_by_name(&self, name: &str) -> Option<&Section> {
        self.lookup().sections_by_name.get(self.sections(), name)
    }

    pub fn metadata(&self) -> Option<Metadata> {
        self.parsed.header.as_ref().map(Metadata::from)
    }

    pub fn header(&self) -> Option<&ElfHeader> {
        self.parsed.header.as_ref()
    }

    pub fn section_headers(&self) -> &[SectionHeader] {
        &self.parsed.section_headers
    }

    pub fn program_headers(&self) -> &[ProgramHeader] {
        &self.parsed.program_headers
    }

    /// Size of the input in bytes; 0 if it could not be opened.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn symbol_source(&self) -> Option<SymbolSource> {
        self.parsed.model.symbol_source
    }

    /// Symbol records dropped because their name offset was out of range.
    pub fn skipped_symbols(&self) -> usize {
        self.parsed.model.skipped_symbols
    }

    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            source: self.label.clone(),
            file_size: self.file_size,
            valid: self.is_valid(),
            last_error: self.last_error().map(str::to_string),
            failure_stage: self.failure_stage(),
            section_count: self.sections().len(),
            symbol_count: self.symbols().len(),
            program_header_count: self.program_headers().len(),
            symbol_source: self.symbol_source(),
            skipped_symbols: self.skipped_symbols(),
        }
    }
}

fn parse(source: &mut ByteSource, options: &ParseOptions) -> Result<Parsed> {
    let raw = RawElf::decode(source)?;
    let model = build_model(source, &raw)?;
    let program_headers = if options.parse_program_headers {
        parse_program_headers(source, &raw.header)?
    } else {
        Vec::new()
    };

    Ok(Parsed {
        header: Some(raw.header),
        section_headers: raw.section_headers,
        program_headers,
        model,
    })
}

/// Summary of a parse, for logs and tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub source: String,
    pub file_size: u64,
    pub valid: bool,
    pub last_error: Option<String>,
    pub failure_stage: Option<ParseStage>,
    pub section_count: usize,
    pub symbol_count: usize,
    pub program_header_count: usize,
    pub symbol_source: Option<SymbolSource>,
    pub skipped_symbols: usize,
}

impl Diagnostics {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ELF file: {} ({} bytes)", self.source, self.file_size)?;
        writeln!(f, "  valid:           {}", if self.valid { "yes" } else { "no" })?;
        writeln!(f, "  last error:      {}", self.last_error.as_deref().unwrap_or("none"))?;
        match self.failure_stage {
            Some(stage) => writeln!(f, "  failure stage:   {stage}")?,
            None => writeln!(f, "  failure stage:   none")?,
        }
        writeln!(f, "  sections:        {}", self.section_count)?;
        match self.symbol_source {
            Some(source) => writeln!(f, "  symbols:         {} ({source})", self.symbol_count)?,
            None => writeln!(f, "  symbols:         {}", self.symbol_count)?,
        }
        writeln!(f, "  skipped symbols: {}", self.skipped_symbols)?;
        write!(f, "  program headers: {}", self.program_header_count)
    }
}
