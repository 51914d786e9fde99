//! The object-file contract the engine consumes.
//!
//! The engine never parses ELF itself; it asks an [`ObjectFile`]
//! implementation for named sections, loadable segments and symbols. This
//! trait is the seam between the debug-information engine and whatever
//! object reader the embedding chooses.

use std::sync::Arc;

use crate::reader::Reader;

/// One loadable segment of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Virtual address the segment is linked at.
    pub vaddr: u64,
    /// Bytes present in the file.
    pub filesz: u64,
    /// Bytes occupied in memory.
    pub memsz: u64,
}

impl Segment {
    /// Returns true if `addr` (already adjusted for load bias) falls inside
    /// this segment's memory image.
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.vaddr && addr < self.vaddr + self.memsz
    }
}

/// A named section: its linked address and a reader over its bytes.
#[derive(Clone)]
pub struct Section {
    pub address: u64,
    pub io: Arc<dyn Reader>,
}

/// A symbol-table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    pub value: u64,
    pub size: u64,
}

/// Which symbol-table entries an address lookup should consider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Function,
    Object,
    Any,
}

/// A parsed object file.
pub trait ObjectFile: Send + Sync {
    /// Pointer width of the object, in bytes (4 or 8).
    fn address_size(&self) -> u8;

    /// The loadable segments, in file order.
    fn load_segments(&self) -> Vec<Segment>;

    /// Looks up a section by name (e.g. `".debug_info"`).
    fn section(&self, name: &str) -> Option<Section>;

    /// Looks up a symbol by name.
    fn symbol_by_name(&self, name: &str) -> Option<Symbol>;

    /// Finds the symbol covering `addr`, together with its name.
    fn symbol_for_address(&self, addr: u64, kind: SymbolKind) -> Option<(Symbol, String)>;

    /// The entry point, if the object has one.
    fn entry_point(&self) -> Option<u64>;

    /// The requested program interpreter, if any.
    fn interpreter(&self) -> Option<String>;
}
