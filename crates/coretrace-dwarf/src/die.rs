//! Debug information entries and attribute values.
//!
//! A [`Die`] is one node of a unit's tree; its values are interpreted
//! through the forms of its abbreviation. Entries are addressed by
//! (unit, section offset) and handed out as [`Entry`] handles, which keep
//! the owning unit alive; references between entries are resolved by offset
//! lookup, never by ownership.

use std::sync::Arc;

use crate::consts::{DwAt, DwForm, DwTag};
use crate::info::Info;
use crate::reader::Block;
use crate::unit::Unit;
use crate::{Error, Result};

/// A decoded attribute value.
///
/// The variant records how the value was encoded, which matters for
/// interpretation: `high_pc` as `Udata` is a size, as `Addr` an address;
/// references are either unit-local or absolute within the info section.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A target address.
    Addr(u64),
    /// An unsigned constant.
    Udata(u64),
    /// A signed constant.
    Sdata(i64),
    /// A boolean flag.
    Flag(bool),
    /// A byte range within the info section (blocks and `exprloc`).
    Block(Block),
    /// An inline string.
    Str(String),
    /// An offset into the string section.
    StrRef(u64),
    /// A reference to an entry of the same unit (stored absolute).
    UnitRef(u64),
    /// A reference to an entry anywhere in the info section.
    InfoRef(u64),
    /// An offset into some other section.
    SecOffset(u64),
}

/// One entry of a unit's tree. Identity is (unit, offset).
#[derive(Debug)]
pub(crate) struct Die {
    pub(crate) offset: u64,
    pub(crate) abbrev: u64,
    pub(crate) values: Vec<Value>,
    pub(crate) children: Vec<u64>,
}

/// A handle to a debug information entry.
///
/// Cheap to clone; keeps the owning unit alive.
#[derive(Clone)]
pub struct Entry {
    unit: Arc<Unit>,
    offset: u64,
}

impl Entry {
    pub(crate) fn new(unit: Arc<Unit>, offset: u64) -> Self {
        Self { unit, offset }
    }

    /// Section offset of this entry.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// The unit this entry belongs to.
    pub fn unit(&self) -> &Arc<Unit> {
        &self.unit
    }

    fn die(&self) -> &Die {
        // Entries are only minted for offsets present in the unit's index.
        &self.unit.dies[&self.offset]
    }

    pub fn tag(&self) -> DwTag {
        match self.unit.abbrevs.get(self.die().abbrev) {
            Some(a) => a.tag,
            None => DwTag::Unknown(0),
        }
    }

    pub fn has_children(&self) -> bool {
        !self.die().children.is_empty()
    }

    /// The entry's children, in declaration order.
    pub fn children(&self) -> Vec<Entry> {
        self.die()
            .children
            .iter()
            .map(|&off| Entry::new(self.unit.clone(), off))
            .collect()
    }

    /// Looks up an attribute, returning its form and decoded value.
    pub fn attr(&self, name: DwAt) -> Option<(DwForm, &Value)> {
        let die = self.die();
        let abbrev = self.unit.abbrevs.get(die.abbrev)?;
        let idx = abbrev.attr_index(name)?;
        Some((abbrev.specs[idx].form, &die.values[idx]))
    }

    /// The `DW_AT_name` string, resolving string-section references.
    pub fn name(&self, info: &Info) -> Option<String> {
        self.string_attr(info, DwAt::Name)
    }

    /// A string-valued attribute, inline or via the string section.
    pub fn string_attr(&self, info: &Info, name: DwAt) -> Option<String> {
        match self.attr(name)?.1 {
            Value::Str(s) => Some(s.clone()),
            Value::StrRef(off) => info.string_at(*off),
            _ => None,
        }
    }

    /// An attribute as an unsigned integer, if it has an integral value.
    pub fn unsigned_attr(&self, name: DwAt) -> Option<u64> {
        match self.attr(name)?.1 {
            Value::Udata(v) | Value::Addr(v) | Value::SecOffset(v) => Some(*v),
            Value::Sdata(v) => Some(*v as u64),
            _ => None,
        }
    }

    /// An attribute as a signed integer.
    pub fn signed_attr(&self, name: DwAt) -> Option<i64> {
        match self.attr(name)?.1 {
            Value::Sdata(v) => Some(*v),
            Value::Udata(v) => Some(*v as i64),
            _ => None,
        }
    }

    /// An attribute's block, for locations and other `exprloc` values.
    pub fn block_attr(&self, name: DwAt) -> Option<Block> {
        match self.attr(name)?.1 {
            Value::Block(b) => Some(*b),
            _ => None,
        }
    }

    pub fn low_pc(&self) -> Option<u64> {
        match self.attr(DwAt::LowPc)?.1 {
            Value::Addr(a) => Some(*a),
            _ => None,
        }
    }

    /// The end of the entry's pc range.
    ///
    /// `high_pc` encoded with a data form is an offset from `low_pc`; with
    /// the address form it is absolute.
    pub fn high_pc(&self) -> Option<u64> {
        match self.attr(DwAt::HighPc)? {
            (_, Value::Addr(a)) => Some(*a),
            (_, Value::Udata(size)) => Some(self.low_pc()?.wrapping_add(*size)),
            _ => None,
        }
    }

    /// Whether this entry's code range covers `pc`.
    ///
    /// A `DW_AT_ranges` list takes precedence over the `low_pc`/`high_pc`
    /// pair when both are present.
    pub fn contains_pc(&self, info: &Info, pc: u64) -> bool {
        if let Some(ranges_off) = self.ranges_offset() {
            let base = Unit::root(&self.unit).low_pc().unwrap_or(0);
            return match info.range_list_contains(&self.unit, ranges_off, base, pc) {
                Ok(hit) => hit,
                Err(err) => {
                    log::warn!(
                        "bad range list at {:#x} for entry {:#x}: {}",
                        ranges_off,
                        self.offset,
                        err
                    );
                    false
                }
            };
        }
        match (self.low_pc(), self.high_pc()) {
            (Some(low), Some(high)) => pc >= low && pc < high,
            _ => false,
        }
    }

    fn ranges_offset(&self) -> Option<u64> {
        match self.attr(DwAt::Ranges)?.1 {
            Value::SecOffset(off) | Value::Udata(off) => Some(*off),
            _ => None,
        }
    }

    /// Resolves a reference attribute to the entry it denotes.
    ///
    /// Unit-local references are looked up in the owning unit; absolute
    /// references are routed through `info` to whichever unit contains the
    /// offset. A reference to an offset holding no entry is an error.
    pub fn referenced_entry(&self, info: &Info, name: DwAt) -> Result<Option<Entry>> {
        let value = match self.attr(name) {
            Some((_, v)) => v.clone(),
            None => return Ok(None),
        };
        match value {
            Value::UnitRef(off) => match Unit::entry(&self.unit, off) {
                Some(entry) => Ok(Some(entry)),
                None => Err(Error::BadReference(off)),
            },
            Value::InfoRef(off) => info.die_at(off).map(Some),
            _ => Ok(None),
        }
    }
}

/// Finds the deepest function entry covering `pc` under `entry`.
///
/// Only `subprogram` and `inlined_subroutine` entries match; a deeper
/// (inlined) match wins over its enclosing function, and ties go to
/// declaration order.
pub(crate) fn find_function_in(entry: &Entry, info: &Info, pc: u64) -> Option<Entry> {
    for child in entry.children() {
        if let Some(found) = find_function_in(&child, info, pc) {
            return Some(found);
        }
    }
    let is_function = matches!(entry.tag(), DwTag::Subprogram | DwTag::InlinedSubroutine);
    if is_function && entry.contains_pc(info, pc) {
        return Some(entry.clone());
    }
    None
}
