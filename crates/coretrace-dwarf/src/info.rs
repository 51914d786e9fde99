//! The debug-information registry for one object.
//!
//! An [`Info`] owns the readers for every debug section an object carries,
//! both frame sections, and the lazily-populated caches over them: units
//! keyed by their start offset, the aranges and pubnames accelerator
//! tables, and per-unit line matrices. A unit that fails to parse is
//! skipped with a warning; the rest of the object stays usable.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::OnceCell;

use crate::aranges::{parse_aranges, parse_pubnames, ArangeSet, PubnameUnit};
use crate::consts::DwAt;
use crate::die::{find_function_in, Entry};
use crate::frame::{Cfi, FrameKind};
use crate::line::LineInfo;
use crate::object::ObjectFile;
use crate::reader::{Cursor, Reader, SliceReader};
use crate::unit::Unit;
use crate::{Error, Result};

/// All the interesting bits of one object's DWARF data.
pub struct Info {
    address_size: u8,
    io: Arc<dyn Reader>,
    abbrev: Arc<dyn Reader>,
    strings: Option<Arc<dyn Reader>>,
    line: Option<Arc<dyn Reader>>,
    ranges: Option<Arc<dyn Reader>>,
    aranges_io: Option<Arc<dyn Reader>>,
    pubnames_io: Option<Arc<dyn Reader>>,
    /// `.debug_frame` unwind tables, when present.
    pub debug_frame: Option<Cfi>,
    /// `.eh_frame` unwind tables, when present.
    pub eh_frame: Option<Cfi>,
    units: RwLock<BTreeMap<u64, Arc<Unit>>>,
    unit_offsets: OnceCell<Vec<u64>>,
    aranges: OnceCell<Vec<ArangeSet>>,
    pubnames: OnceCell<Vec<PubnameUnit>>,
    alt: OnceCell<Arc<Info>>,
}

impl Info {
    /// Collects the debug sections of `object`.
    ///
    /// Absent sections leave the corresponding queries empty; an object
    /// with only an `.eh_frame` still supports unwinding.
    pub fn new(object: &dyn ObjectFile) -> Info {
        let reader = |name: &str| object.section(name).map(|s| s.io);
        let address_size = object.address_size();

        let debug_frame = object.section(".debug_frame").map(|s| {
            Cfi::parse(FrameKind::DebugFrame, s.address, s.io, address_size)
        });
        let eh_frame = object
            .section(".eh_frame")
            .map(|s| Cfi::parse(FrameKind::EhFrame, s.address, s.io, address_size));

        Info {
            address_size,
            io: reader(".debug_info").unwrap_or_else(SliceReader::empty),
            abbrev: reader(".debug_abbrev").unwrap_or_else(SliceReader::empty),
            strings: reader(".debug_str"),
            line: reader(".debug_line"),
            ranges: reader(".debug_ranges"),
            aranges_io: reader(".debug_aranges"),
            pubnames_io: reader(".debug_pubnames"),
            debug_frame,
            eh_frame,
            units: RwLock::new(BTreeMap::new()),
            unit_offsets: OnceCell::new(),
            aranges: OnceCell::new(),
            pubnames: OnceCell::new(),
            alt: OnceCell::new(),
        }
    }

    /// Pointer width of the described object, in bytes.
    pub fn address_size(&self) -> u8 {
        self.address_size
    }

    /// The info-section reader, for attribute blocks.
    pub fn reader(&self) -> &Arc<dyn Reader> {
        &self.io
    }

    /// Start offsets of every unit, discovered by walking the headers.
    fn unit_offsets(&self) -> &[u64] {
        self.unit_offsets.get_or_init(|| {
            let mut offsets = Vec::new();
            let io = self.io.as_ref();
            let mut cur = Cursor::whole(io);
            while cur.remaining() >= 4 {
                let start = cur.offset();
                match cur.initial_length() {
                    Ok(0) => {
                        log::warn!("zero-length unit at {start:#x}, stopping scan");
                        break;
                    }
                    Ok(len) => {
                        if cur.skip(len).is_err() {
                            log::warn!("truncated unit at {start:#x}");
                            break;
                        }
                        offsets.push(start);
                    }
                    Err(err) => {
                        log::warn!("info section scan stopped at {start:#x}: {err}");
                        break;
                    }
                }
            }
            offsets
        })
    }

    /// The unit starting at `offset`, parsed at most once.
    pub fn get_unit(&self, offset: u64) -> Result<Arc<Unit>> {
        {
            let map = self.units.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(unit) = map.get(&offset) {
                return Ok(unit.clone());
            }
        }
        let unit = Arc::new(Unit::parse(
            self.io.as_ref(),
            self.abbrev.as_ref(),
            offset,
        )?);
        let mut map = self.units.write().unwrap_or_else(PoisonError::into_inner);
        Ok(map.entry(offset).or_insert(unit).clone())
    }

    /// Every unit of the info section; malformed units are skipped.
    pub fn get_units(&self) -> Vec<Arc<Unit>> {
        let offsets: Vec<u64> = self.unit_offsets().to_vec();
        offsets
            .into_iter()
            .filter_map(|off| match self.get_unit(off) {
                Ok(unit) => Some(unit),
                Err(err) => {
                    log::warn!("skipping unit at {off:#x}: {err}");
                    None
                }
            })
            .collect()
    }

    /// The entry at an absolute info-section offset.
    ///
    /// Units are keyed by their start offset; a binary search finds the
    /// candidate, a range check confirms it.
    pub fn die_at(&self, offset: u64) -> Result<Entry> {
        let offsets = self.unit_offsets();
        let idx = offsets.partition_point(|&o| o <= offset);
        if idx == 0 {
            return Err(Error::BadReference(offset));
        }
        let unit = self.get_unit(offsets[idx - 1])?;
        if !unit.contains_offset(offset) {
            return Err(Error::BadReference(offset));
        }
        Unit::entry(&unit, offset).ok_or(Error::BadReference(offset))
    }

    /// A string from the string section.
    pub fn string_at(&self, offset: u64) -> Option<String> {
        self.strings.as_ref()?.read_string(offset).ok()
    }

    /// The unit's line matrix, built on first use.
    pub fn line_info(&self, unit: &Arc<Unit>) -> Option<Arc<LineInfo>> {
        unit.line
            .get_or_init(|| {
                let io = self.line.as_ref()?;
                let stmt = Unit::stmt_list(unit)?;
                let comp_dir = Unit::root(unit)
                    .string_attr(self, DwAt::CompDir)
                    .unwrap_or_default();
                let mut cur = Cursor::new(io.as_ref(), stmt, io.size());
                match LineInfo::parse(&mut cur, &comp_dir, unit.address_size) {
                    Ok(li) => Some(Arc::new(li)),
                    Err(err) => {
                        log::warn!(
                            "skipping line program of unit at {:#x}: {err}",
                            unit.offset
                        );
                        None
                    }
                }
            })
            .clone()
    }

    /// The units that may cover `pc`: aranges-directed when the section is
    /// present, otherwise every unit.
    pub fn units_for_addr(&self, pc: u64) -> Vec<Arc<Unit>> {
        if self.has_ranges() {
            self.ranges()
                .iter()
                .filter(|set| set.contains(pc))
                .filter_map(|set| match self.get_unit(set.debug_info_offset) {
                    Ok(unit) => Some(unit),
                    Err(err) => {
                        log::warn!(
                            "skipping unit at {:#x}: {err}",
                            set.debug_info_offset
                        );
                        None
                    }
                })
                .collect()
        } else {
            self.get_units()
        }
    }

    /// Source positions for `pc`, one per unit whose line matrix covers it.
    pub fn source_from_addr(&self, pc: u64) -> Vec<(String, u32)> {
        let mut out = Vec::new();
        for unit in self.units_for_addr(pc) {
            if let Some(li) = self.line_info(&unit) {
                if let Some((file, line)) = li.source_from_addr(pc) {
                    out.push((file, line));
                }
            }
        }
        out
    }

    /// The deepest function entry covering `pc`, preferring inlined scopes.
    pub fn function_at(&self, pc: u64) -> Option<Entry> {
        for unit in self.units_for_addr(pc) {
            if let Some(found) = find_function_in(&Unit::root(&unit), self, pc) {
                return Some(found);
            }
        }
        None
    }

    /// The `.debug_aranges` sets, parsed on first use.
    pub fn ranges(&self) -> &[ArangeSet] {
        self.aranges.get_or_init(|| match &self.aranges_io {
            Some(io) => parse_aranges(io.as_ref()).unwrap_or_else(|err| {
                log::warn!("discarding .debug_aranges: {err}");
                Vec::new()
            }),
            None => Vec::new(),
        })
    }

    pub fn has_ranges(&self) -> bool {
        !self.ranges().is_empty()
    }

    /// The `.debug_pubnames` units, parsed on first use.
    pub fn pubnames(&self) -> &[PubnameUnit] {
        self.pubnames.get_or_init(|| match &self.pubnames_io {
            Some(io) => parse_pubnames(io.as_ref()).unwrap_or_else(|err| {
                log::warn!("discarding .debug_pubnames: {err}");
                Vec::new()
            }),
            None => Vec::new(),
        })
    }

    /// Whether a `DW_AT_ranges` list at `offset` covers `pc`.
    ///
    /// `base` is the unit's base address, updated by base-address-selection
    /// entries within the list.
    pub(crate) fn range_list_contains(
        &self,
        unit: &Unit,
        offset: u64,
        mut base: u64,
        pc: u64,
    ) -> Result<bool> {
        let io = self
            .ranges
            .as_ref()
            .ok_or(Error::malformed(".debug_ranges", "section missing"))?;
        let addr_size = unit.address_size as usize;
        let base_selector = if addr_size == 4 {
            0xffff_ffff
        } else {
            u64::MAX
        };
        let mut cur = Cursor::new(io.as_ref(), offset, io.size());
        loop {
            let begin = cur.uint(addr_size)?;
            let end = cur.uint(addr_size)?;
            if begin == 0 && end == 0 {
                return Ok(false);
            }
            if begin == base_selector {
                base = end;
                continue;
            }
            if pc >= base.wrapping_add(begin) && pc < base.wrapping_add(end) {
                return Ok(true);
            }
        }
    }

    /// Records the alternate (`gnu_debugaltlink`) debug file.
    ///
    /// Locating the file is the caller's concern; the first call wins and
    /// later calls report failure.
    pub fn set_alt_info(&self, alt: Arc<Info>) -> bool {
        self.alt.set(alt).is_ok()
    }

    pub fn alt_info(&self) -> Option<&Arc<Info>> {
        self.alt.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::DwAt;
    use crate::object::{Section, Segment, Symbol, SymbolKind};

    struct TestObject {
        sections: Vec<(&'static str, Vec<u8>)>,
    }

    impl ObjectFile for TestObject {
        fn address_size(&self) -> u8 {
            8
        }

        fn load_segments(&self) -> Vec<Segment> {
            Vec::new()
        }

        fn section(&self, name: &str) -> Option<Section> {
            self.sections
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, bytes)| Section {
                    address: 0,
                    io: Arc::new(SliceReader::new(bytes.clone())),
                })
        }

        fn symbol_by_name(&self, _name: &str) -> Option<Symbol> {
            None
        }

        fn symbol_for_address(&self, _addr: u64, _kind: SymbolKind) -> Option<(Symbol, String)> {
            None
        }

        fn entry_point(&self) -> Option<u64> {
            None
        }

        fn interpreter(&self) -> Option<String> {
            None
        }
    }

    /// Abbreviations: 1 = compile unit with children; 2 = subprogram with a
    /// DW_AT_type reference in ref_addr form; 3 = named base type.
    fn abbrev_bytes() -> Vec<u8> {
        vec![
            0x01, 0x11, 0x01, 0x00, 0x00, // CU, children, no attrs
            0x02, 0x2e, 0x00, 0x49, 0x10, 0x00, 0x00, // subprogram: type/ref_addr
            0x03, 0x24, 0x00, 0x03, 0x08, 0x00, 0x00, // base type: name/string
            0x00,
        ]
    }

    fn unit_header(length: u32) -> Vec<u8> {
        let mut v = length.to_le_bytes().to_vec();
        v.extend_from_slice(&2u16.to_le_bytes()); // version
        v.extend_from_slice(&0u32.to_le_bytes()); // abbrev offset
        v.push(8); // address size
        v
    }

    /// Unit A holds a subprogram whose type refers, by absolute offset,
    /// into unit B, which holds the base type "int".
    fn two_unit_info() -> Info {
        // Unit A: root (code 1) + subprogram (code 2, ref_addr to be
        // patched) + terminator. Header is 11 bytes, so the child entry
        // sits at offset 12 and the unit ends at offset 18.
        let mut a_dies = vec![0x01, 0x02];
        a_dies.extend_from_slice(&30u32.to_le_bytes()); // DW_AT_type -> B's child
        a_dies.push(0x00);

        // Unit B begins at 18; its child entry is at 18 + 11 + 1 = 30.
        let mut b_dies = vec![0x01, 0x03];
        b_dies.extend_from_slice(b"int\0");
        b_dies.push(0x00);

        let mut info_bytes = unit_header((7 + a_dies.len()) as u32);
        info_bytes.extend_from_slice(&a_dies);
        assert_eq!(info_bytes.len(), 18);
        info_bytes.extend_from_slice(&unit_header((7 + b_dies.len()) as u32));
        info_bytes.extend_from_slice(&b_dies);

        Info::new(&TestObject {
            sections: vec![
                (".debug_info", info_bytes),
                (".debug_abbrev", abbrev_bytes()),
            ],
        })
    }

    #[test]
    fn cross_unit_reference_resolves_by_offset() {
        let info = two_unit_info();
        let units = info.get_units();
        assert_eq!(units.len(), 2);

        let a_root = Unit::root(&units[0]);
        let children = a_root.children();
        assert_eq!(children.len(), 1);

        let referenced = children[0]
            .referenced_entry(&info, DwAt::Type)
            .unwrap()
            .unwrap();
        assert_eq!(referenced.offset(), 30);
        assert_eq!(referenced.unit().offset, 18);
        assert_eq!(referenced.name(&info).as_deref(), Some("int"));
    }

    #[test]
    fn units_are_memoised_by_offset() {
        let info = two_unit_info();
        let first = info.get_unit(0).unwrap();
        let again = info.get_unit(0).unwrap();
        assert!(Arc::ptr_eq(&first, &again));
    }

    #[test]
    fn value_counts_match_abbreviation_forms() {
        let info = two_unit_info();
        for unit in info.get_units() {
            let root = Unit::root(&unit);
            let mut stack = vec![root];
            while let Some(entry) = stack.pop() {
                let die = &unit.dies[&entry.offset()];
                let abbrev = unit.abbrevs.get(die.abbrev).unwrap();
                assert_eq!(die.values.len(), abbrev.specs.len());
                stack.extend(entry.children());
            }
        }
    }

    #[test]
    fn bad_reference_is_an_error() {
        let info = two_unit_info();
        assert!(matches!(info.die_at(17), Err(Error::BadReference(17))));
        assert!(matches!(info.die_at(4000), Err(Error::BadReference(_))));
    }

    #[test]
    fn malformed_unit_is_isolated() {
        // Unit A as usual, then a unit whose root uses an abbreviation
        // code the table does not define.
        let mut info_bytes = unit_header(7 + 2);
        info_bytes.extend_from_slice(&[0x01, 0x00]); // root, terminator
        let mut bad = unit_header(7 + 1);
        bad.push(0x7f); // unknown abbreviation code
        info_bytes.extend_from_slice(&bad);

        let info = Info::new(&TestObject {
            sections: vec![
                (".debug_info", info_bytes),
                (".debug_abbrev", abbrev_bytes()),
            ],
        });

        let units = info.get_units();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].offset, 0);
    }
}
