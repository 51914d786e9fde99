//! Compilation units: header parsing and DIE tree decoding.

use std::collections::BTreeMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::abbrev::AbbrevTable;
use crate::consts::{DwAt, DwForm};
use crate::die::{Die, Entry, Value};
use crate::info::Info;
use crate::line::LineInfo;
use crate::reader::{Block, Cursor, Reader};
use crate::{Error, Result};

/// One compilation unit's debug information.
///
/// The unit owns its abbreviation table and a flat index from section
/// offset to entry; the tree structure is expressed through child offset
/// lists. Construction decodes every entry eagerly; the line matrix is
/// built on first use.
pub struct Unit {
    /// Section offset of the unit header.
    pub offset: u64,
    /// Value of the unit's initial-length field.
    pub length: u64,
    /// DWARF version, 2..=4.
    pub version: u16,
    /// Address size of the producing target, in bytes.
    pub address_size: u8,
    pub(crate) abbrevs: AbbrevTable,
    pub(crate) dies: BTreeMap<u64, Die>,
    pub(crate) root_offset: u64,
    pub(crate) line: OnceCell<Option<Arc<LineInfo>>>,
}

impl Unit {
    /// First offset past this unit.
    pub fn end_offset(&self) -> u64 {
        self.offset + 4 + self.length
    }

    /// Whether `offset` falls within this unit's bytes.
    pub fn contains_offset(&self, offset: u64) -> bool {
        offset >= self.offset && offset < self.end_offset()
    }

    /// The root entry.
    pub fn root(unit: &Arc<Unit>) -> Entry {
        Entry::new(unit.clone(), unit.root_offset)
    }

    /// The entry at `offset`, if the unit has one there.
    pub fn entry(unit: &Arc<Unit>, offset: u64) -> Option<Entry> {
        unit.dies
            .get(&offset)
            .map(|die| Entry::new(unit.clone(), die.offset))
    }

    /// The unit's source name, from the root entry.
    pub fn name(unit: &Arc<Unit>, info: &Info) -> Option<String> {
        Unit::root(unit).name(info)
    }

    /// The root entry's `DW_AT_stmt_list` offset into the line section.
    pub fn stmt_list(unit: &Arc<Unit>) -> Option<u64> {
        Unit::root(unit).unsigned_attr(DwAt::StmtList)
    }

    /// Parses the unit at `offset` of the info section.
    pub fn parse(io: &dyn Reader, abbrev_io: &dyn Reader, offset: u64) -> Result<Unit> {
        let mut cur = Cursor::new(io, offset, io.size());
        let length = cur.initial_length()?;
        let end = offset + 4 + length;
        cur.truncate(end)?;

        let version = cur.u16()?;
        if !(2..=4).contains(&version) {
            return Err(Error::UnsupportedVersion {
                context: "compilation unit",
                version,
            });
        }
        let abbrev_offset = cur.u32()? as u64;
        let address_size = cur.u8()?;
        if address_size != 4 && address_size != 8 {
            return Err(Error::malformed("compilation unit", "bad address size"));
        }

        let mut acur = Cursor::new(abbrev_io, abbrev_offset, abbrev_io.size());
        let abbrevs = AbbrevTable::parse(&mut acur)?;

        let mut dies = BTreeMap::new();
        let root_offset = {
            let mut parser = EntryParser {
                cur,
                abbrevs: &abbrevs,
                dies: &mut dies,
                unit_offset: offset,
                address_size,
            };
            parser
                .read_entry()?
                .ok_or(Error::malformed("compilation unit", "missing root entry"))?
        };

        Ok(Unit {
            offset,
            length,
            version,
            address_size,
            abbrevs,
            dies,
            root_offset,
            line: OnceCell::new(),
        })
    }
}

impl std::fmt::Debug for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unit")
            .field("offset", &self.offset)
            .field("version", &self.version)
            .field("address_size", &self.address_size)
            .field("entries", &self.dies.len())
            .finish()
    }
}

struct EntryParser<'a> {
    cur: Cursor<'a>,
    abbrevs: &'a AbbrevTable,
    dies: &'a mut BTreeMap<u64, Die>,
    unit_offset: u64,
    address_size: u8,
}

impl<'a> EntryParser<'a> {
    /// Reads one entry and, recursively, its children.
    ///
    /// Returns `None` for the zero code that terminates a sibling list.
    fn read_entry(&mut self) -> Result<Option<u64>> {
        let offset = self.cur.offset();
        let code = self.cur.uleb128()?;
        if code == 0 {
            return Ok(None);
        }

        let abbrevs: &'a AbbrevTable = self.abbrevs;
        let abbrev = abbrevs
            .get(code)
            .ok_or(Error::UnknownAbbreviation { code, offset })?;

        let mut values = Vec::with_capacity(abbrev.specs.len());
        for spec in &abbrev.specs {
            values.push(self.read_value(spec.form)?);
        }

        // The entry enters the index before its children are decoded, so
        // forward sibling references within the unit resolve mid-walk.
        self.dies.insert(
            offset,
            Die {
                offset,
                abbrev: code,
                values,
                children: Vec::new(),
            },
        );

        if abbrev.has_children {
            let mut children = Vec::new();
            while let Some(child) = self.read_entry()? {
                children.push(child);
            }
            if let Some(die) = self.dies.get_mut(&offset) {
                die.children = children;
            }
        }

        Ok(Some(offset))
    }

    fn read_value(&mut self, form: DwForm) -> Result<Value> {
        let cur = &mut self.cur;
        match form {
            DwForm::Addr => Ok(Value::Addr(cur.uint(self.address_size as usize)?)),

            DwForm::Data1 => Ok(Value::Udata(cur.u8()? as u64)),
            DwForm::Data2 => Ok(Value::Udata(cur.u16()? as u64)),
            DwForm::Data4 => Ok(Value::Udata(cur.u32()? as u64)),
            DwForm::Data8 => Ok(Value::Udata(cur.u64()?)),
            DwForm::Udata => Ok(Value::Udata(cur.uleb128()?)),
            DwForm::Sdata => Ok(Value::Sdata(cur.sleb128()?)),

            DwForm::Flag => Ok(Value::Flag(cur.u8()? != 0)),
            DwForm::FlagPresent => Ok(Value::Flag(true)),

            DwForm::String => Ok(Value::Str(cur.cstr()?)),
            DwForm::Strp => Ok(Value::StrRef(cur.u32()? as u64)),

            DwForm::Block1 => self.read_block(|c| Ok(c.u8()? as u64)),
            DwForm::Block2 => self.read_block(|c| Ok(c.u16()? as u64)),
            DwForm::Block4 => self.read_block(|c| Ok(c.u32()? as u64)),
            DwForm::Block | DwForm::Exprloc => self.read_block(|c| c.uleb128()),

            DwForm::Ref1 => self.unit_ref(|c| Ok(c.u8()? as u64)),
            DwForm::Ref2 => self.unit_ref(|c| Ok(c.u16()? as u64)),
            DwForm::Ref4 => self.unit_ref(|c| Ok(c.u32()? as u64)),
            DwForm::Ref8 => self.unit_ref(|c| c.u64()),
            DwForm::RefUdata => self.unit_ref(|c| c.uleb128()),
            DwForm::RefAddr => Ok(Value::InfoRef(cur.u32()? as u64)),

            DwForm::SecOffset => Ok(Value::SecOffset(cur.u32()? as u64)),
            DwForm::RefSig8 => Ok(Value::Udata(cur.u64()?)),

            DwForm::Indirect => {
                let actual = DwForm::from(cur.uleb128()?);
                if matches!(actual, DwForm::Indirect) {
                    return Err(Error::malformed("attribute value", "indirect form loop"));
                }
                self.read_value(actual)
            }

            DwForm::Unknown(v) => Err(Error::UnknownForm(v as u64)),
        }
    }

    /// Reads a length-prefixed block, storing the byte range rather than a
    /// copy of the bytes.
    fn read_block(
        &mut self,
        length: impl FnOnce(&mut Cursor<'a>) -> Result<u64>,
    ) -> Result<Value> {
        let len = length(&mut self.cur)?;
        let block = Block {
            offset: self.cur.offset(),
            length: len,
        };
        self.cur.skip(len)?;
        Ok(Value::Block(block))
    }

    /// Reads a unit-relative reference and rebases it to a section offset.
    fn unit_ref(&mut self, value: impl FnOnce(&mut Cursor<'a>) -> Result<u64>) -> Result<Value> {
        let v = value(&mut self.cur)?;
        Ok(Value::UnitRef(self.unit_offset.wrapping_add(v)))
    }
}
