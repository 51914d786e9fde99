//! # coretrace-dwarf
//!
//! The debug-information engine behind coretrace's stack introspection:
//! a from-scratch reader for DWARF versions 2 through 4 (32-bit offsets)
//! and for the call frame information of `.debug_frame` and `.eh_frame`.
//!
//! The pieces, leaves first:
//!
//! - [`reader`] - bounded cursors over byte sources, with the DWARF
//!   primitive encodings (LEB128, initial lengths, C strings)
//! - [`abbrev`] - per-unit abbreviation tables
//! - [`unit`] / [`die`] - compilation units and their entry trees
//! - [`line`] - the line-number state machine and its matrix
//! - [`aranges`] - the aranges and pubnames accelerator tables
//! - [`frame`] - CIE/FDE decoding and the call-frame instruction
//!   interpreter that produces register-rule rows
//! - [`expr`] - the DWARF expression stack machine
//! - [`info`] - the per-object registry tying the sections together
//!
//! The engine consumes object files and raw bytes through the [`object`]
//! and [`reader`] contracts; it never parses ELF itself and produces no
//! output formats of its own.

pub mod abbrev;
pub mod aranges;
pub mod consts;
pub mod die;
pub mod error;
pub mod expr;
pub mod frame;
pub mod info;
pub mod line;
pub mod object;
pub mod reader;
pub mod unit;

pub use consts::{DwAt, DwForm, DwTag};
pub use die::{Entry, Value};
pub use error::{Error, Result};
pub use expr::{evaluate, ExprContext, ExprResult};
pub use frame::{CallFrame, CfaRule, Cfi, Cie, Fde, FrameKind, RegisterRule};
pub use info::Info;
pub use line::LineInfo;
pub use object::{ObjectFile, Section, Segment, Symbol, SymbolKind};
pub use reader::{Block, Cursor, OffsetReader, Reader, SliceReader};
pub use unit::Unit;
