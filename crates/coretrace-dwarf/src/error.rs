//! Error types for DWARF parsing and evaluation.

use thiserror::Error;

/// Error type for the DWARF engine.
#[derive(Error, Debug)]
pub enum Error {
    /// A bounded read ran past its limit.
    #[error("out of bounds: need {need} bytes at offset {offset:#x} (limit {limit:#x}) while reading {context}")]
    OutOfBounds {
        offset: u64,
        limit: u64,
        need: u64,
        context: &'static str,
    },

    /// Structurally invalid data.
    #[error("malformed {context}: {reason}")]
    Malformed {
        context: &'static str,
        reason: &'static str,
    },

    /// 64-bit DWARF (initial length 0xffffffff) is not supported.
    #[error("64-bit DWARF is not supported (initial length 0xffffffff at offset {0:#x})")]
    SixtyFourBitDwarf(u64),

    /// Version outside the supported 2..=4 range.
    #[error("unsupported {context} version {version}")]
    UnsupportedVersion { context: &'static str, version: u16 },

    /// A DIE used an abbreviation code its unit's table does not define.
    #[error("unknown abbreviation code {code} for entry at offset {offset:#x}")]
    UnknownAbbreviation { code: u64, offset: u64 },

    /// An attribute form this parser does not recognise.
    #[error("unknown attribute form {0:#x}")]
    UnknownForm(u64),

    /// A reference attribute pointed at an offset that holds no entry.
    #[error("reference to unknown entry at offset {0:#x}")]
    BadReference(u64),

    /// An `.eh_frame` pointer encoding this parser cannot decode.
    #[error("unknown pointer encoding {0:#x}")]
    UnknownEncoding(u8),

    /// DWARF expression evaluation failed.
    #[error("expression error: {0}")]
    Expression(&'static str),

    /// The underlying reader failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Creates a new Malformed error.
    pub fn malformed(context: &'static str, reason: &'static str) -> Self {
        Self::Malformed { context, reason }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
