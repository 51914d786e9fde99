//! The line-number program (`.debug_line`).
//!
//! A unit's statement list is a bytecode program; running it yields the
//! matrix mapping machine addresses to source positions. Rows are appended
//! in nondecreasing address order within a sequence, and every sequence is
//! closed by an end-sequence row whose address is one past the sequence.

use crate::consts::{DwLne, DwLns};
use crate::reader::Cursor;
use crate::{Error, Result};

/// One file of the program's file table, with its directory resolved.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub name: String,
    pub directory: String,
    pub mtime: u64,
    pub size: u64,
}

impl FileEntry {
    /// The file's path, joined against its directory.
    pub fn path(&self) -> String {
        if self.directory.is_empty() || self.name.starts_with('/') {
            self.name.clone()
        } else {
            format!("{}/{}", self.directory, self.name)
        }
    }
}

/// One row of the line matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRow {
    pub address: u64,
    /// Index into the file table, 1-based.
    pub file: u64,
    pub line: u32,
    pub column: u32,
    pub is_stmt: bool,
    pub basic_block: bool,
    pub end_sequence: bool,
    pub prologue_end: bool,
    pub epilogue_begin: bool,
    pub isa: u64,
}

/// A unit's decoded line-number information.
#[derive(Debug)]
pub struct LineInfo {
    pub directories: Vec<String>,
    pub files: Vec<FileEntry>,
    matrix: Vec<LineRow>,
}

/// The line-number state machine registers.
struct LineState {
    row: LineRow,
}

impl LineState {
    fn new(default_is_stmt: bool) -> Self {
        Self {
            row: LineRow {
                address: 0,
                file: 1,
                line: 1,
                column: 0,
                is_stmt: default_is_stmt,
                basic_block: false,
                end_sequence: false,
                prologue_end: false,
                epilogue_begin: false,
                isa: 0,
            },
        }
    }

    fn append(&mut self, matrix: &mut Vec<LineRow>) {
        matrix.push(self.row);
        self.row.basic_block = false;
        self.row.prologue_end = false;
        self.row.epilogue_begin = false;
    }
}

impl LineInfo {
    /// Runs the program at the cursor, which must be positioned at a
    /// line-number program header.
    ///
    /// `comp_dir` resolves file entries with directory index zero;
    /// `address_size` is the owning unit's.
    pub(crate) fn parse(cur: &mut Cursor, comp_dir: &str, address_size: u8) -> Result<LineInfo> {
        let start = cur.offset();
        let unit_length = cur.initial_length()?;
        let end = start + 4 + unit_length;
        cur.truncate(end)?;

        let version = cur.u16()?;
        if !(2..=4).contains(&version) {
            return Err(Error::UnsupportedVersion {
                context: "line-number program",
                version,
            });
        }

        let header_length = cur.u32()? as u64;
        let program_start = cur.offset() + header_length;

        let min_instruction_length = cur.u8()? as u64;
        if version >= 4 {
            // maximum_operations_per_instruction: op-index is assumed zero
            // throughout (non-VLIW targets), but the field must be consumed.
            let _max_ops = cur.u8()?;
        }
        let default_is_stmt = cur.u8()? != 0;
        let line_base = cur.i8()? as i64;
        let line_range = cur.u8()?;
        if line_range == 0 {
            return Err(Error::malformed("line-number program", "line range of zero"));
        }
        let opcode_base = cur.u8()?;
        let mut standard_opcode_lengths = Vec::with_capacity(opcode_base.saturating_sub(1) as usize);
        for _ in 1..opcode_base {
            standard_opcode_lengths.push(cur.u8()?);
        }

        // Include directories: empty string terminates the list.
        let mut directories = Vec::new();
        loop {
            let dir = cur.cstr()?;
            if dir.is_empty() {
                break;
            }
            directories.push(dir);
        }

        // File names: empty name terminates the list.
        let mut files = Vec::new();
        loop {
            let name = cur.cstr()?;
            if name.is_empty() {
                break;
            }
            let dir_index = cur.uleb128()?;
            let mtime = cur.uleb128()?;
            let size = cur.uleb128()?;
            let directory = if dir_index == 0 {
                comp_dir.to_string()
            } else {
                directories
                    .get(dir_index as usize - 1)
                    .cloned()
                    .unwrap_or_default()
            };
            files.push(FileEntry {
                name,
                directory,
                mtime,
                size,
            });
        }

        cur.seek(program_start)?;

        let mut matrix = Vec::new();
        let mut state = LineState::new(default_is_stmt);

        while !cur.is_empty() {
            let opcode = cur.u8()?;

            if opcode >= opcode_base {
                // Special opcode: advance both address and line, emit a row.
                let adjusted = (opcode - opcode_base) as u64;
                state.row.address = state
                    .row
                    .address
                    .wrapping_add((adjusted / line_range as u64) * min_instruction_length);
                let line_advance = line_base + (adjusted % line_range as u64) as i64;
                state.row.line = (state.row.line as i64 + line_advance).max(0) as u32;
                state.append(&mut matrix);
            } else if opcode == 0 {
                // Extended opcode: length-prefixed.
                let len = cur.uleb128()?;
                let operand_end = cur
                    .offset()
                    .checked_add(len)
                    .ok_or(Error::malformed("line-number program", "operand length overflow"))?;
                if len == 0 {
                    continue;
                }
                let ext = cur.u8()?;
                match ext {
                    e if e == DwLne::EndSequence as u8 => {
                        state.row.end_sequence = true;
                        state.append(&mut matrix);
                        state = LineState::new(default_is_stmt);
                    }
                    e if e == DwLne::SetAddress as u8 => {
                        state.row.address = cur.uint(address_size as usize)?;
                    }
                    e if e == DwLne::DefineFile as u8 => {
                        let name = cur.cstr()?;
                        let dir_index = cur.uleb128()?;
                        let mtime = cur.uleb128()?;
                        let size = cur.uleb128()?;
                        let directory = if dir_index == 0 {
                            comp_dir.to_string()
                        } else {
                            directories
                                .get(dir_index as usize - 1)
                                .cloned()
                                .unwrap_or_default()
                        };
                        files.push(FileEntry {
                            name,
                            directory,
                            mtime,
                            size,
                        });
                    }
                    _ => {
                        // Unknown extension (set_discriminator and friends):
                        // the length prefix says how much to skip.
                    }
                }
                cur.seek(operand_end)?;
            } else {
                match opcode {
                    o if o == DwLns::Copy as u8 => state.append(&mut matrix),
                    o if o == DwLns::AdvancePc as u8 => {
                        let advance = cur.uleb128()?.wrapping_mul(min_instruction_length);
                        state.row.address = state.row.address.wrapping_add(advance);
                    }
                    o if o == DwLns::AdvanceLine as u8 => {
                        let adv = cur.sleb128()?;
                        state.row.line = (state.row.line as i64 + adv).max(0) as u32;
                    }
                    o if o == DwLns::SetFile as u8 => state.row.file = cur.uleb128()?,
                    o if o == DwLns::SetColumn as u8 => {
                        state.row.column = cur.uleb128()? as u32;
                    }
                    o if o == DwLns::NegateStmt as u8 => state.row.is_stmt = !state.row.is_stmt,
                    o if o == DwLns::SetBasicBlock as u8 => state.row.basic_block = true,
                    o if o == DwLns::ConstAddPc as u8 => {
                        let adjusted = (255 - opcode_base) as u64;
                        state.row.address = state
                            .row
                            .address
                            .wrapping_add((adjusted / line_range as u64) * min_instruction_length);
                    }
                    o if o == DwLns::FixedAdvancePc as u8 => {
                        state.row.address = state.row.address.wrapping_add(cur.u16()? as u64);
                    }
                    o if o == DwLns::SetPrologueEnd as u8 => state.row.prologue_end = true,
                    o if o == DwLns::SetEpilogueBegin as u8 => state.row.epilogue_begin = true,
                    o if o == DwLns::SetIsa as u8 => state.row.isa = cur.uleb128()?,
                    _ => {
                        // A standard opcode this consumer does not know: the
                        // header's operand counts say how many to discard.
                        let operands = standard_opcode_lengths
                            .get(opcode as usize - 1)
                            .copied()
                            .unwrap_or(0);
                        for _ in 0..operands {
                            cur.uleb128()?;
                        }
                    }
                }
            }
        }

        // Sequences appear in program order but need not be sorted between
        // each other; a stable sort keeps each end-sequence marker ahead of
        // an unrelated row at the same address.
        matrix.sort_by_key(|row| row.address);

        Ok(LineInfo {
            directories,
            files,
            matrix,
        })
    }

    /// The matrix rows, sorted by address.
    pub fn rows(&self) -> &[LineRow] {
        &self.matrix
    }

    /// The greatest row at or below `pc` within an open sequence.
    pub fn row_for_addr(&self, pc: u64) -> Option<&LineRow> {
        let idx = self.matrix.partition_point(|row| row.address <= pc);
        if idx == 0 {
            return None;
        }
        let row = &self.matrix[idx - 1];
        if row.end_sequence {
            // pc falls in the gap after a closed sequence.
            return None;
        }
        Some(row)
    }

    /// The resolved source path and line for `pc`.
    pub fn source_from_addr(&self, pc: u64) -> Option<(String, u32)> {
        let row = self.row_for_addr(pc)?;
        let file = self.file(row.file)?;
        Some((file.path(), row.line))
    }

    /// The file table entry for a 1-based file index.
    pub fn file(&self, index: u64) -> Option<&FileEntry> {
        if index == 0 {
            return None;
        }
        self.files.get(index as usize - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::SliceReader;

    /// Assembles a version-2 line program with one directory and one file.
    fn program(opcodes: &[u8]) -> Vec<u8> {
        let mut header = vec![
            0x02, 0x00, // version
        ];
        let mut post_len = Vec::new();
        post_len.push(0x01); // minimum_instruction_length
        post_len.push(0x01); // default_is_stmt
        post_len.push(0xfb); // line_base = -5
        post_len.push(0x0e); // line_range = 14
        post_len.push(0x0d); // opcode_base = 13
        post_len.extend_from_slice(&[0, 1, 1, 1, 1, 0, 0, 0, 1, 0, 0, 1]);
        post_len.extend_from_slice(b"src\0\0"); // directories
        post_len.extend_from_slice(b"foo.c\0\x01\x00\x00"); // file: dir 1
        post_len.push(0); // end of file table

        header.extend_from_slice(&(post_len.len() as u32).to_le_bytes());
        header.extend_from_slice(&post_len);
        header.extend_from_slice(opcodes);

        let mut out = (header.len() as u32).to_le_bytes().to_vec();
        out.extend_from_slice(&header);
        out
    }

    fn set_address(addr: u64) -> Vec<u8> {
        let mut v = vec![0x00, 0x09, DwLne::SetAddress as u8];
        v.extend_from_slice(&addr.to_le_bytes());
        v
    }

    const END_SEQUENCE: &[u8] = &[0x00, 0x01, 0x01];

    #[test]
    fn one_row_program() {
        let mut ops = set_address(0x1000);
        ops.push(DwLns::Copy as u8);
        ops.extend_from_slice(END_SEQUENCE);
        let bytes = program(&ops);
        let io = SliceReader::new(bytes);
        let li = LineInfo::parse(&mut Cursor::whole(&io), "/build", 8).unwrap();

        assert_eq!(li.rows().len(), 2);
        assert!(li.rows()[1].end_sequence);
        let (file, line) = li.source_from_addr(0x1000).unwrap();
        assert_eq!(file, "src/foo.c");
        assert_eq!(line, 1);
        // The row extends to the next row of its sequence.
        assert_eq!(li.source_from_addr(0x1020).map(|s| s.1), None);
    }

    #[test]
    fn special_opcodes_advance_address_and_line() {
        let mut ops = set_address(0x1000);
        // adjusted value 20: address advance 20/14 = 1, line advance -5 + 6 = 1
        ops.push(0x0d + 20);
        ops.push(0x0d + 20);
        ops.extend_from_slice(END_SEQUENCE);
        let bytes = program(&ops);
        let io = SliceReader::new(bytes);
        let li = LineInfo::parse(&mut Cursor::whole(&io), "", 8).unwrap();

        let rows = li.rows();
        assert_eq!(rows[0].address, 0x1001);
        assert_eq!(rows[0].line, 2);
        assert_eq!(rows[1].address, 0x1002);
        assert_eq!(rows[1].line, 3);

        // Addresses are nondecreasing within the sequence.
        assert!(rows.windows(2).all(|w| w[0].address <= w[1].address));
    }

    #[test]
    fn gap_after_end_sequence_has_no_source() {
        let mut ops = set_address(0x1000);
        ops.push(DwLns::Copy as u8);
        ops.push(DwLns::AdvancePc as u8);
        ops.push(0x10);
        ops.extend_from_slice(END_SEQUENCE);
        let bytes = program(&ops);
        let io = SliceReader::new(bytes);
        let li = LineInfo::parse(&mut Cursor::whole(&io), "", 8).unwrap();

        assert!(li.source_from_addr(0x100f).is_some());
        // 0x1010 is the end-sequence address: past the sequence.
        assert!(li.source_from_addr(0x1010).is_none());
    }

    #[test]
    fn set_isa_updates_state() {
        let mut ops = set_address(0x1000);
        ops.push(DwLns::SetIsa as u8);
        ops.push(0x02);
        ops.push(DwLns::Copy as u8);
        ops.extend_from_slice(END_SEQUENCE);
        let bytes = program(&ops);
        let io = SliceReader::new(bytes);
        let li = LineInfo::parse(&mut Cursor::whole(&io), "", 8).unwrap();
        assert_eq!(li.rows()[0].isa, 2);
    }
}
