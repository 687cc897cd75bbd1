//! Error types for ELF parsing.
//!
//! Every variant here is terminal for a whole-file parse: the facade records
//! it as the failure of the model and never raises it again. Per-record
//! anomalies (bad name offsets, missing symbol tables) are recovered where
//! they occur and never surface as a `MiniElfError`.

use crate::io::error::IoError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Pipeline stage a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParseStage {
    Header,
    SectionHeaders,
    SectionStringTable,
    SymbolTable,
    ProgramHeaders,
}

impl ParseStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseStage::Header => "header",
            ParseStage::SectionHeaders => "section-headers",
            ParseStage::SectionStringTable => "section-string-table",
            ParseStage::SymbolTable => "symbol-table",
            ParseStage::ProgramHeaders => "program-headers",
        }
    }
}

impl fmt::Display for ParseStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for parsing an ELF64 file.
#[derive(Debug, Error)]
pub enum MiniElfError {
    /// The input could not be opened or read
    #[error("input unavailable: {0}")]
    IoUnavailable(#[from] IoError),

    /// Magic bytes mismatch
    #[error("not an ELF file")]
    NotElf,

    /// Class byte is not ELFCLASS64
    #[error("unsupported ELF class {0} (only ELF64 is supported)")]
    UnsupportedClass(u8),

    /// Section header offset or count is zero
    #[error("file declares no section headers")]
    NoSectionHeaders,

    /// Fewer bytes available than a structure requires
    #[error("truncated {stage}: needed {needed} bytes at offset {offset:#x}, got {available}")]
    TruncatedRead {
        stage: ParseStage,
        offset: u64,
        needed: u64,
        available: u64,
    },
}

impl MiniElfError {
    /// Stage the failure belongs to, for diagnostics.
    pub fn stage(&self) -> ParseStage {
        match self {
            MiniElfError::IoUnavailable(_)
            | MiniElfError::NotElf
            | MiniElfError::UnsupportedClass(_) => ParseStage::Header,
            MiniElfError::NoSectionHeaders => ParseStage::SectionHeaders,
            MiniElfError::TruncatedRead { stage, .. } => *stage,
        }
    }

    pub(crate) fn truncated(stage: ParseStage, offset: u64, needed: u64, available: u64) -> Self {
        MiniElfError::TruncatedRead {
            stage,
            offset,
            needed,
            available,
        }
    }
}

/// Result type alias for parsing operations
pub type Result<T> = std::result::Result<T, MiniElfError>;
