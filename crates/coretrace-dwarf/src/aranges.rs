//! Accelerator tables: `.debug_aranges` and `.debug_pubnames`.
//!
//! Both are optional indexes produced alongside the info section: aranges
//! map address ranges back to the unit that covers them, pubnames map
//! global names to entry offsets. When present they let address and name
//! lookups skip units that cannot match.

use crate::reader::{Cursor, Reader};
use crate::{Error, Result};

/// One contiguous address range of an aranges set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arange {
    pub start: u64,
    pub length: u64,
}

impl Arange {
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr < self.start.saturating_add(self.length)
    }
}

/// The ranges contributed by one compilation unit.
#[derive(Debug, Clone)]
pub struct ArangeSet {
    pub version: u16,
    /// Offset of the described unit within the info section.
    pub debug_info_offset: u64,
    pub ranges: Vec<Arange>,
}

impl ArangeSet {
    fn parse(cur: &mut Cursor, section_start: u64) -> Result<ArangeSet> {
        let start = cur.offset();
        let length = cur.initial_length()?;
        let end = start + 4 + length;

        let version = cur.u16()?;
        if version != 2 {
            return Err(Error::UnsupportedVersion {
                context: "aranges set",
                version,
            });
        }
        let debug_info_offset = cur.u32()? as u64;
        let addr_size = cur.u8()? as u64;
        let seg_size = cur.u8()?;
        if seg_size != 0 {
            return Err(Error::malformed("aranges set", "segmented addressing"));
        }
        if addr_size != 4 && addr_size != 8 {
            return Err(Error::malformed("aranges set", "bad address size"));
        }

        // Tuples are aligned to twice the address size, measured from the
        // start of the section.
        let tuple = 2 * addr_size;
        let misaligned = (cur.offset() - section_start) % tuple;
        if misaligned != 0 {
            cur.skip(tuple - misaligned)?;
        }

        let mut ranges = Vec::new();
        while cur.offset() < end {
            let start = cur.uint(addr_size as usize)?;
            let len = cur.uint(addr_size as usize)?;
            if start == 0 && len == 0 {
                break;
            }
            ranges.push(Arange { start, length: len });
        }
        cur.seek(end)?;

        Ok(ArangeSet {
            version,
            debug_info_offset,
            ranges,
        })
    }

    pub fn contains(&self, addr: u64) -> bool {
        self.ranges.iter().any(|r| r.contains(addr))
    }
}

/// Parses every set in a `.debug_aranges` section.
pub(crate) fn parse_aranges(io: &dyn Reader) -> Result<Vec<ArangeSet>> {
    let mut sets = Vec::new();
    let mut cur = Cursor::whole(io);
    while cur.remaining() >= 4 {
        sets.push(ArangeSet::parse(&mut cur, 0)?);
    }
    Ok(sets)
}

/// One name of a pubnames unit.
#[derive(Debug, Clone)]
pub struct Pubname {
    /// Offset of the named entry, relative to its unit header.
    pub offset: u64,
    pub name: String,
}

/// The global names contributed by one compilation unit.
#[derive(Debug, Clone)]
pub struct PubnameUnit {
    pub version: u16,
    /// Offset of the described unit within the info section.
    pub debug_info_offset: u64,
    /// Length of the described unit.
    pub debug_info_length: u64,
    pub names: Vec<Pubname>,
}

impl PubnameUnit {
    fn parse(cur: &mut Cursor) -> Result<PubnameUnit> {
        let start = cur.offset();
        let length = cur.initial_length()?;
        let end = start + 4 + length;

        let version = cur.u16()?;
        if version != 2 {
            return Err(Error::UnsupportedVersion {
                context: "pubnames unit",
                version,
            });
        }
        let debug_info_offset = cur.u32()? as u64;
        let debug_info_length = cur.u32()? as u64;

        let mut names = Vec::new();
        while cur.offset() < end {
            let offset = cur.u32()? as u64;
            if offset == 0 {
                break;
            }
            names.push(Pubname {
                offset,
                name: cur.cstr()?,
            });
        }
        cur.seek(end)?;

        Ok(PubnameUnit {
            version,
            debug_info_offset,
            debug_info_length,
            names,
        })
    }
}

/// Parses every unit in a `.debug_pubnames` section.
pub(crate) fn parse_pubnames(io: &dyn Reader) -> Result<Vec<PubnameUnit>> {
    let mut units = Vec::new();
    let mut cur = Cursor::whole(io);
    while cur.remaining() >= 4 {
        units.push(PubnameUnit::parse(&mut cur)?);
    }
    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::SliceReader;

    #[test]
    fn aranges_with_alignment_padding() {
        // Header is 12 bytes; with 8-byte addresses the first tuple starts
        // at offset 16.
        let mut bytes = Vec::new();
        let body: &mut Vec<u8> = &mut Vec::new();
        body.extend_from_slice(&2u16.to_le_bytes()); // version
        body.extend_from_slice(&0x40u32.to_le_bytes()); // debug_info_offset
        body.push(8); // address size
        body.push(0); // segment size
        body.extend_from_slice(&[0u8; 4]); // padding to offset 16
        body.extend_from_slice(&0x1000u64.to_le_bytes());
        body.extend_from_slice(&0x200u64.to_le_bytes());
        body.extend_from_slice(&0u64.to_le_bytes());
        body.extend_from_slice(&0u64.to_le_bytes());
        bytes.extend_from_slice(&(body.len() as u32).to_le_bytes());
        bytes.extend_from_slice(body);

        let io = SliceReader::new(bytes);
        let sets = parse_aranges(&io).unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].debug_info_offset, 0x40);
        assert_eq!(sets[0].ranges.len(), 1);
        assert!(sets[0].contains(0x11ff));
        assert!(!sets[0].contains(0x1200));
    }

    #[test]
    fn pubnames_unit() {
        let mut body = Vec::new();
        body.extend_from_slice(&2u16.to_le_bytes());
        body.extend_from_slice(&0u32.to_le_bytes()); // info offset
        body.extend_from_slice(&0x80u32.to_le_bytes()); // info length
        body.extend_from_slice(&0x2au32.to_le_bytes());
        body.extend_from_slice(b"main\0");
        body.extend_from_slice(&0u32.to_le_bytes());

        let mut bytes = (body.len() as u32).to_le_bytes().to_vec();
        bytes.extend_from_slice(&body);

        let io = SliceReader::new(bytes);
        let units = parse_pubnames(&io).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].names.len(), 1);
        assert_eq!(units[0].names[0].name, "main");
        assert_eq!(units[0].names[0].offset, 0x2a);
    }
}
