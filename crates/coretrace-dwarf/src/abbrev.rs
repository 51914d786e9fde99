//! Abbreviation tables (`.debug_abbrev`).
//!
//! Every DIE begins with an abbreviation code; the unit's abbreviation table
//! maps that code to the DIE's tag, whether it has children, and the ordered
//! list of (attribute, form) pairs its values are decoded with.

use std::collections::HashMap;

use crate::consts::{DwAt, DwForm, DwTag};
use crate::reader::Cursor;
use crate::{Error, Result};

/// One (attribute name, form) pair of an abbreviation.
#[derive(Debug, Clone, Copy)]
pub struct AttributeSpec {
    pub name: DwAt,
    pub form: DwForm,
}

/// An abbreviation: the decoding template shared by many DIEs.
#[derive(Debug, Clone)]
pub struct Abbreviation {
    pub tag: DwTag,
    pub has_children: bool,
    pub specs: Vec<AttributeSpec>,
    index: HashMap<DwAt, usize>,
}

impl Abbreviation {
    /// Position of `name` within the ordered value list, if present.
    pub fn attr_index(&self, name: DwAt) -> Option<usize> {
        self.index.get(&name).copied()
    }
}

/// The abbreviation table of one compilation unit, keyed by code.
#[derive(Debug, Default)]
pub struct AbbrevTable {
    entries: HashMap<u64, Abbreviation>,
}

impl AbbrevTable {
    /// Parses abbreviations until the closing code of zero.
    pub fn parse(cur: &mut Cursor) -> Result<Self> {
        let mut table = AbbrevTable::default();

        loop {
            let code = cur.uleb128()?;
            if code == 0 {
                break;
            }

            let tag = DwTag::from(cur.uleb128()?);
            let has_children = cur.u8()? != 0;

            let mut specs = Vec::new();
            let mut index = HashMap::new();
            loop {
                let name = cur.uleb128()?;
                let form = cur.uleb128()?;
                if name == 0 && form == 0 {
                    break;
                }
                index.insert(DwAt::from(name), specs.len());
                specs.push(AttributeSpec {
                    name: DwAt::from(name),
                    form: DwForm::from(form),
                });
            }

            let previous = table.entries.insert(
                code,
                Abbreviation {
                    tag,
                    has_children,
                    specs,
                    index,
                },
            );
            if previous.is_some() {
                return Err(Error::malformed(
                    "abbreviation table",
                    "duplicate abbreviation code",
                ));
            }
        }

        Ok(table)
    }

    pub fn get(&self, code: u64) -> Option<&Abbreviation> {
        self.entries.get(&code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::SliceReader;

    #[test]
    fn parse_empty_table() {
        let io = SliceReader::new(vec![0x00]);
        let table = AbbrevTable::parse(&mut Cursor::whole(&io)).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn parse_simple_abbrev() {
        // code=1, DW_TAG_compile_unit, has children,
        // (DW_AT_name, DW_FORM_string), end of attributes, end of table
        let io = SliceReader::new(vec![
            0x01, 0x11, 0x01, 0x03, 0x08, 0x00, 0x00, 0x00,
        ]);
        let table = AbbrevTable::parse(&mut Cursor::whole(&io)).unwrap();
        assert_eq!(table.len(), 1);

        let abbrev = table.get(1).unwrap();
        assert!(matches!(abbrev.tag, DwTag::CompileUnit));
        assert!(abbrev.has_children);
        assert_eq!(abbrev.specs.len(), 1);
        assert!(matches!(abbrev.specs[0].name, DwAt::Name));
        assert!(matches!(abbrev.specs[0].form, DwForm::String));
        assert_eq!(abbrev.attr_index(DwAt::Name), Some(0));
        assert_eq!(abbrev.attr_index(DwAt::LowPc), None);
    }

    #[test]
    fn duplicate_code_is_rejected() {
        let io = SliceReader::new(vec![
            0x01, 0x11, 0x00, 0x00, 0x00, // code 1
            0x01, 0x2e, 0x00, 0x00, 0x00, // code 1 again
            0x00,
        ]);
        assert!(AbbrevTable::parse(&mut Cursor::whole(&io)).is_err());
    }
}
