//! Call frame information: `.debug_frame` and `.eh_frame`.
//!
//! Both sections hold the same two record kinds behind different
//! discriminator conventions: a CIE carries what many functions share
//! (alignment factors, the return-address column, initial instructions);
//! an FDE covers one function's pc range and appends its own instructions.
//! Executing a CIE's initial instructions and then an FDE's instructions
//! up to a target pc yields the register-rule row used to unwind a frame
//! at that pc.

#![allow(non_upper_case_globals)]

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::reader::{Block, Cursor, Reader};
use crate::{Error, Result};

/// Which frame section a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    DebugFrame,
    EhFrame,
}

/// A common information entry, addressed by its section offset.
#[derive(Debug)]
pub struct Cie {
    pub offset: u64,
    pub version: u8,
    pub augmentation: String,
    pub code_alignment: u64,
    pub data_alignment: i64,
    pub return_address_register: u16,
    /// Pointer encoding for FDE addresses (the `R` augmentation).
    pub address_encoding: u8,
    /// LSDA pointer encoding (the `L` augmentation).
    pub lsda_encoding: Option<u8>,
    /// Personality routine address (the `P` augmentation).
    pub personality: Option<u64>,
    /// Set by the `S` augmentation: frames unwound through this CIE are
    /// signal frames, whose resumed pc is exact.
    pub is_signal_handler: bool,
    pub(crate) instructions: Block,
    pub(crate) address_size: u8,
}

/// A frame description entry: one function's unwind coverage.
#[derive(Debug, Clone)]
pub struct Fde {
    pub offset: u64,
    pub cie_offset: u64,
    pub initial_location: u64,
    pub address_range: u64,
    /// Raw augmentation bytes, when the CIE carries `z`.
    pub augmentation: Option<Block>,
    pub(crate) instructions: Block,
}

impl Fde {
    /// Whether this FDE's pc range covers `pc`.
    pub fn contains(&self, pc: u64) -> bool {
        pc >= self.initial_location
            && pc < self.initial_location.saturating_add(self.address_range)
    }
}

/// One decoded call-frame instruction.
///
/// Alignment factors are applied during decoding: offsets are in bytes and
/// location deltas in target address units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CfiInstruction {
    AdvanceLoc { delta: u64 },
    SetLoc { address: u64 },
    Offset { register: u16, offset: i64 },
    ValOffset { register: u16, offset: i64 },
    Restore { register: u16 },
    Undefined { register: u16 },
    SameValue { register: u16 },
    Register { register: u16, source: u16 },
    RememberState,
    RestoreState,
    DefCfa { register: u16, offset: i64 },
    DefCfaRegister { register: u16 },
    DefCfaOffset { offset: i64 },
    DefCfaExpression { expression: Block },
    Expression { register: u16, expression: Block },
    ValExpression { register: u16, expression: Block },
    /// GNU argument-size note; carries no register rule.
    ArgsSize { size: u64 },
    Nop,
}

/// How one register of the previous frame is recovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterRule {
    /// Not recoverable.
    Undefined,
    /// Unchanged from the current frame.
    SameValue,
    /// Stored at CFA + offset.
    Offset(i64),
    /// The value *is* CFA + offset, no memory access.
    ValOffset(i64),
    /// Stored in another register of the current frame.
    Register(u16),
    /// Stored at the address an expression computes.
    Expression(Block),
    /// The value an expression computes.
    ValExpression(Block),
    /// Recovered by an architecture-defined convention.
    Arch,
}

/// How the canonical frame address is computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CfaRule {
    Undefined,
    RegisterOffset { register: u16, offset: i64 },
    Expression(Block),
}

/// The register-rule row in effect at one pc.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    /// Rules, sparse by register number; absent registers are undefined.
    pub registers: BTreeMap<u16, RegisterRule>,
    pub cfa: CfaRule,
}

impl CallFrame {
    pub fn new() -> Self {
        Self {
            registers: BTreeMap::new(),
            cfa: CfaRule::Undefined,
        }
    }

    /// The rule for `register`; unmentioned registers are undefined.
    pub fn rule(&self, register: u16) -> &RegisterRule {
        self.registers
            .get(&register)
            .unwrap_or(&RegisterRule::Undefined)
    }
}

impl Default for CallFrame {
    fn default() -> Self {
        Self::new()
    }
}

/// A parsed frame section.
pub struct Cfi {
    pub kind: FrameKind,
    /// Virtual address the section is linked at, the base for pc-relative
    /// pointer encodings.
    pub section_addr: u64,
    pub(crate) io: Arc<dyn Reader>,
    cies: BTreeMap<u64, Arc<Cie>>,
    fdes: Vec<Fde>,
}

impl Cfi {
    /// Decodes every record in the section.
    ///
    /// A record that fails to decode is skipped with a warning; a header
    /// that cannot be read ends the scan, keeping what was decoded.
    pub fn parse(kind: FrameKind, section_addr: u64, io: Arc<dyn Reader>, address_size: u8) -> Cfi {
        let mut cies: BTreeMap<u64, Arc<Cie>> = BTreeMap::new();
        let mut fdes: Vec<Fde> = Vec::new();

        {
            let data = io.as_ref();
            let mut cur = Cursor::whole(data);
            while cur.remaining() >= 4 {
                let entry_start = cur.offset();
                let length = match cur.initial_length() {
                    Ok(0) => break, // section terminator
                    Ok(len) => len,
                    Err(err) => {
                        log::warn!("frame section scan stopped at {entry_start:#x}: {err}");
                        break;
                    }
                };
                let entry_end = cur.offset() + length;
                if entry_end > data.size() {
                    log::warn!("truncated frame entry at {entry_start:#x}");
                    break;
                }

                let id_pos = cur.offset();
                let id = match cur.u32() {
                    Ok(v) => v,
                    Err(err) => {
                        log::warn!("frame section scan stopped at {entry_start:#x}: {err}");
                        break;
                    }
                };

                let is_cie = match kind {
                    FrameKind::DebugFrame => id == 0xffff_ffff,
                    FrameKind::EhFrame => id == 0,
                };

                let mut entry = Cursor::new(data, cur.offset(), entry_end);
                let outcome = if is_cie {
                    Cie::parse(&mut entry, entry_start, section_addr, address_size).map(|cie| {
                        cies.insert(entry_start, Arc::new(cie));
                    })
                } else {
                    let cie_offset = match kind {
                        FrameKind::DebugFrame => Some(id as u64),
                        FrameKind::EhFrame => id_pos.checked_sub(id as u64),
                    };
                    cie_offset
                        .and_then(|off| cies.get(&off).map(|cie| (off, cie.clone())))
                        .ok_or(Error::malformed("FDE", "dangling CIE reference"))
                        .and_then(|(off, cie)| {
                            Fde::parse(&mut entry, &cie, entry_start, off, section_addr)
                                .map(|fde| fdes.push(fde))
                        })
                };
                if let Err(err) = outcome {
                    log::warn!("skipping frame entry at {entry_start:#x}: {err}");
                }

                if cur.seek(entry_end).is_err() {
                    break;
                }
            }
        }

        fdes.sort_by_key(|fde| fde.initial_location);

        Cfi {
            kind,
            section_addr,
            io,
            cies,
            fdes,
        }
    }

    /// The FDE whose range covers `pc`, by binary search.
    pub fn find_fde(&self, pc: u64) -> Option<&Fde> {
        let idx = self.fdes.partition_point(|fde| fde.initial_location <= pc);
        if idx == 0 {
            return None;
        }
        let fde = &self.fdes[idx - 1];
        fde.contains(pc).then_some(fde)
    }

    /// The CIE an FDE refers to.
    pub fn cie_for(&self, fde: &Fde) -> Option<&Arc<Cie>> {
        self.cies.get(&fde.cie_offset)
    }

    /// Convenience: looks up the CIE and executes both instruction streams.
    pub fn row_for(&self, fde: &Fde, pc: u64) -> Result<CallFrame> {
        let cie = self
            .cie_for(fde)
            .ok_or(Error::malformed("FDE", "dangling CIE reference"))?;
        cie.exec_insns(self, fde, pc)
    }

    pub fn fdes(&self) -> &[Fde] {
        &self.fdes
    }

    /// The section's reader, for evaluating rule expressions.
    pub fn reader(&self) -> &Arc<dyn Reader> {
        &self.io
    }
}

impl Cie {
    fn parse(
        cur: &mut Cursor,
        offset: u64,
        section_addr: u64,
        default_address_size: u8,
    ) -> Result<Cie> {
        let version = cur.u8()?;
        if !matches!(version, 1 | 3 | 4) {
            return Err(Error::UnsupportedVersion {
                context: "CIE",
                version: version as u16,
            });
        }

        let augmentation = cur.cstr()?;
        if !augmentation.chars().all(|c| "zPLRS".contains(c))
            || (!augmentation.is_empty() && !augmentation.starts_with('z'))
        {
            return Err(Error::malformed("CIE", "unsupported augmentation"));
        }

        let mut address_size = default_address_size;
        if version >= 4 {
            address_size = cur.u8()?;
            if address_size != 4 && address_size != 8 {
                return Err(Error::malformed("CIE", "bad address size"));
            }
            let segment_size = cur.u8()?;
            if segment_size != 0 {
                return Err(Error::malformed("CIE", "segmented addressing"));
            }
        }

        let code_alignment = cur.uleb128()?;
        let data_alignment = cur.sleb128()?;
        let return_address_register = if version == 1 {
            cur.u8()? as u16
        } else {
            register_number(cur.uleb128()?)?
        };

        let mut cie = Cie {
            offset,
            version,
            augmentation,
            code_alignment,
            data_alignment,
            return_address_register,
            address_encoding: DW_EH_PE_absptr,
            lsda_encoding: None,
            personality: None,
            is_signal_handler: false,
            instructions: Block {
                offset: 0,
                length: 0,
            },
            address_size,
        };

        if cie.augmentation.starts_with('z') {
            let aug_len = cur.uleb128()?;
            let aug_end = cur
                .offset()
                .checked_add(aug_len)
                .ok_or(Error::malformed("CIE", "augmentation length overflow"))?;
            for ch in cie.augmentation.clone().chars().skip(1) {
                match ch {
                    'L' => cie.lsda_encoding = Some(cur.u8()?),
                    'P' => {
                        let encoding = cur.u8()?;
                        cie.personality =
                            Some(decode_pointer(cur, encoding, section_addr, address_size)?);
                    }
                    'R' => cie.address_encoding = cur.u8()?,
                    'S' => cie.is_signal_handler = true,
                    _ => {}
                }
            }
            cur.seek(aug_end)?;
        }

        cie.instructions = Block {
            offset: cur.offset(),
            length: cur.remaining(),
        };
        Ok(cie)
    }

    /// Executes the CIE's initial instructions and then the FDE's, stopping
    /// once the location would pass `pc`, and returns the resulting row.
    pub fn exec_insns(&self, cfi: &Cfi, fde: &Fde, pc: u64) -> Result<CallFrame> {
        let mut row = CallFrame::new();
        self.run(cfi, self.instructions, fde.initial_location, u64::MAX, &mut row, None)?;
        let initial = row.clone();
        self.run(cfi, fde.instructions, fde.initial_location, pc, &mut row, Some(&initial))?;
        Ok(row)
    }

    fn run(
        &self,
        cfi: &Cfi,
        block: Block,
        start: u64,
        target: u64,
        row: &mut CallFrame,
        initial: Option<&CallFrame>,
    ) -> Result<()> {
        let mut cur = Cursor::block(cfi.io.as_ref(), block);
        let mut loc = start;
        let mut saved: Vec<CallFrame> = Vec::new();

        while !cur.is_empty() {
            match decode_instruction(&mut cur, self)? {
                CfiInstruction::AdvanceLoc { delta } => {
                    let next = loc.saturating_add(delta);
                    if next > target {
                        return Ok(());
                    }
                    loc = next;
                }
                CfiInstruction::SetLoc { address } => {
                    if address > target {
                        return Ok(());
                    }
                    loc = address;
                }
                CfiInstruction::Offset { register, offset } => {
                    row.registers.insert(register, RegisterRule::Offset(offset));
                }
                CfiInstruction::ValOffset { register, offset } => {
                    row.registers
                        .insert(register, RegisterRule::ValOffset(offset));
                }
                CfiInstruction::Restore { register } => {
                    let init = initial.ok_or(Error::malformed(
                        "call frame instruction",
                        "restore in initial instructions",
                    ))?;
                    match init.registers.get(&register) {
                        Some(rule) => {
                            row.registers.insert(register, rule.clone());
                        }
                        None => {
                            row.registers.remove(&register);
                        }
                    }
                }
                CfiInstruction::Undefined { register } => {
                    row.registers.insert(register, RegisterRule::Undefined);
                }
                CfiInstruction::SameValue { register } => {
                    row.registers.insert(register, RegisterRule::SameValue);
                }
                CfiInstruction::Register { register, source } => {
                    row.registers
                        .insert(register, RegisterRule::Register(source));
                }
                CfiInstruction::RememberState => saved.push(row.clone()),
                CfiInstruction::RestoreState => {
                    *row = saved.pop().ok_or(Error::malformed(
                        "call frame instruction",
                        "restore_state without remember_state",
                    ))?;
                }
                CfiInstruction::DefCfa { register, offset } => {
                    row.cfa = CfaRule::RegisterOffset { register, offset };
                }
                CfiInstruction::DefCfaRegister { register } => match row.cfa {
                    CfaRule::RegisterOffset { offset, .. } => {
                        row.cfa = CfaRule::RegisterOffset { register, offset };
                    }
                    _ => {
                        return Err(Error::malformed(
                            "call frame instruction",
                            "def_cfa_register without a register CFA rule",
                        ))
                    }
                },
                CfiInstruction::DefCfaOffset { offset } => match row.cfa {
                    CfaRule::RegisterOffset { register, .. } => {
                        row.cfa = CfaRule::RegisterOffset { register, offset };
                    }
                    _ => {
                        return Err(Error::malformed(
                            "call frame instruction",
                            "def_cfa_offset without a register CFA rule",
                        ))
                    }
                },
                CfiInstruction::DefCfaExpression { expression } => {
                    row.cfa = CfaRule::Expression(expression);
                }
                CfiInstruction::Expression {
                    register,
                    expression,
                } => {
                    row.registers
                        .insert(register, RegisterRule::Expression(expression));
                }
                CfiInstruction::ValExpression {
                    register,
                    expression,
                } => {
                    row.registers
                        .insert(register, RegisterRule::ValExpression(expression));
                }
                CfiInstruction::ArgsSize { .. } | CfiInstruction::Nop => {}
            }
        }
        Ok(())
    }
}

impl Fde {
    fn parse(
        cur: &mut Cursor,
        cie: &Cie,
        offset: u64,
        cie_offset: u64,
        section_addr: u64,
    ) -> Result<Fde> {
        let initial_location = decode_pointer(cur, cie.address_encoding, section_addr, cie.address_size)?;
        // The range shares the initial location's representation but is
        // always a plain unsigned size.
        let address_range = decode_value(cur, cie.address_encoding & 0x0f, cie.address_size)?;

        let augmentation = if cie.augmentation.starts_with('z') {
            let len = cur.uleb128()?;
            let block = Block {
                offset: cur.offset(),
                length: len,
            };
            cur.skip(len)?;
            Some(block)
        } else {
            None
        };

        Ok(Fde {
            offset,
            cie_offset,
            initial_location,
            address_range,
            augmentation,
            instructions: Block {
                offset: cur.offset(),
                length: cur.remaining(),
            },
        })
    }
}

fn register_number(value: u64) -> Result<u16> {
    u16::try_from(value)
        .map_err(|_| Error::malformed("call frame instruction", "register number too large"))
}

/// Decodes one call-frame instruction, applying the CIE's alignment
/// factors so offsets come out in bytes and deltas in address units.
fn decode_instruction(cur: &mut Cursor, cie: &Cie) -> Result<CfiInstruction> {
    let opcode = cur.u8()?;
    let low6 = opcode & 0x3f;

    match opcode >> 6 {
        0x1 => {
            return Ok(CfiInstruction::AdvanceLoc {
                delta: (low6 as u64).saturating_mul(cie.code_alignment),
            })
        }
        0x2 => {
            let factored = cur.uleb128()?;
            return Ok(CfiInstruction::Offset {
                register: low6 as u16,
                offset: (factored as i64).wrapping_mul(cie.data_alignment),
            });
        }
        0x3 => {
            return Ok(CfiInstruction::Restore {
                register: low6 as u16,
            })
        }
        _ => {}
    }

    match opcode {
        DW_CFA_nop => Ok(CfiInstruction::Nop),
        DW_CFA_set_loc => Ok(CfiInstruction::SetLoc {
            address: decode_pointer(cur, cie.address_encoding, 0, cie.address_size)?,
        }),
        DW_CFA_advance_loc1 => Ok(CfiInstruction::AdvanceLoc {
            delta: (cur.u8()? as u64).saturating_mul(cie.code_alignment),
        }),
        DW_CFA_advance_loc2 => Ok(CfiInstruction::AdvanceLoc {
            delta: (cur.u16()? as u64).saturating_mul(cie.code_alignment),
        }),
        DW_CFA_advance_loc4 => Ok(CfiInstruction::AdvanceLoc {
            delta: (cur.u32()? as u64).saturating_mul(cie.code_alignment),
        }),
        DW_CFA_offset_extended => {
            let register = register_number(cur.uleb128()?)?;
            let factored = cur.uleb128()?;
            Ok(CfiInstruction::Offset {
                register,
                offset: (factored as i64).wrapping_mul(cie.data_alignment),
            })
        }
        DW_CFA_offset_extended_sf => {
            let register = register_number(cur.uleb128()?)?;
            let factored = cur.sleb128()?;
            Ok(CfiInstruction::Offset {
                register,
                offset: factored.wrapping_mul(cie.data_alignment),
            })
        }
        DW_CFA_restore_extended => Ok(CfiInstruction::Restore {
            register: register_number(cur.uleb128()?)?,
        }),
        DW_CFA_undefined => Ok(CfiInstruction::Undefined {
            register: register_number(cur.uleb128()?)?,
        }),
        DW_CFA_same_value => Ok(CfiInstruction::SameValue {
            register: register_number(cur.uleb128()?)?,
        }),
        DW_CFA_register => Ok(CfiInstruction::Register {
            register: register_number(cur.uleb128()?)?,
            source: register_number(cur.uleb128()?)?,
        }),
        DW_CFA_remember_state => Ok(CfiInstruction::RememberState),
        DW_CFA_restore_state => Ok(CfiInstruction::RestoreState),
        DW_CFA_def_cfa => {
            let register = register_number(cur.uleb128()?)?;
            let offset = cur.uleb128()? as i64;
            Ok(CfiInstruction::DefCfa { register, offset })
        }
        DW_CFA_def_cfa_sf => {
            let register = register_number(cur.uleb128()?)?;
            let factored = cur.sleb128()?;
            Ok(CfiInstruction::DefCfa {
                register,
                offset: factored.wrapping_mul(cie.data_alignment),
            })
        }
        DW_CFA_def_cfa_register => Ok(CfiInstruction::DefCfaRegister {
            register: register_number(cur.uleb128()?)?,
        }),
        DW_CFA_def_cfa_offset => Ok(CfiInstruction::DefCfaOffset {
            offset: cur.uleb128()? as i64,
        }),
        DW_CFA_def_cfa_offset_sf => Ok(CfiInstruction::DefCfaOffset {
            offset: cur.sleb128()?.wrapping_mul(cie.data_alignment),
        }),
        DW_CFA_def_cfa_expression => Ok(CfiInstruction::DefCfaExpression {
            expression: read_expression(cur)?,
        }),
        DW_CFA_expression => {
            let register = register_number(cur.uleb128()?)?;
            Ok(CfiInstruction::Expression {
                register,
                expression: read_expression(cur)?,
            })
        }
        DW_CFA_val_expression => {
            let register = register_number(cur.uleb128()?)?;
            Ok(CfiInstruction::ValExpression {
                register,
                expression: read_expression(cur)?,
            })
        }
        DW_CFA_val_offset => {
            let register = register_number(cur.uleb128()?)?;
            let factored = cur.uleb128()?;
            Ok(CfiInstruction::ValOffset {
                register,
                offset: (factored as i64).wrapping_mul(cie.data_alignment),
            })
        }
        DW_CFA_val_offset_sf => {
            let register = register_number(cur.uleb128()?)?;
            let factored = cur.sleb128()?;
            Ok(CfiInstruction::ValOffset {
                register,
                offset: factored.wrapping_mul(cie.data_alignment),
            })
        }
        DW_CFA_GNU_args_size => Ok(CfiInstruction::ArgsSize {
            size: cur.uleb128()?,
        }),
        _ => Err(Error::malformed(
            "call frame instruction",
            "unknown opcode",
        )),
    }
}

fn read_expression(cur: &mut Cursor) -> Result<Block> {
    let len = cur.uleb128()?;
    let block = Block {
        offset: cur.offset(),
        length: len,
    };
    cur.skip(len)?;
    Ok(block)
}

/// Decodes a pointer-encoded value and applies its base.
///
/// The low nibble selects the representation, the high nibble the base;
/// bases this engine cannot honour (text-, function-relative, aligned) and
/// indirect pointers are decoding failures, not guesses.
fn decode_pointer(
    cur: &mut Cursor,
    encoding: u8,
    section_addr: u64,
    address_size: u8,
) -> Result<u64> {
    if encoding == DW_EH_PE_omit {
        return Ok(0);
    }
    if encoding & 0x80 != 0 {
        return Err(Error::UnknownEncoding(encoding));
    }
    let field = cur.offset();
    let value = decode_value(cur, encoding & 0x0f, address_size)?;
    match encoding & 0x70 {
        DW_EH_PE_absptr => Ok(value),
        DW_EH_PE_pcrel => Ok((section_addr + field).wrapping_add(value)),
        DW_EH_PE_datarel => Ok(section_addr.wrapping_add(value)),
        _ => Err(Error::UnknownEncoding(encoding)),
    }
}

/// Decodes just the representation half of a pointer encoding.
fn decode_value(cur: &mut Cursor, format: u8, address_size: u8) -> Result<u64> {
    match format & 0x0f {
        DW_EH_PE_absptr => cur.uint(address_size as usize),
        DW_EH_PE_uleb128 => cur.uleb128(),
        DW_EH_PE_udata2 => Ok(cur.u16()? as u64),
        DW_EH_PE_udata4 => Ok(cur.u32()? as u64),
        DW_EH_PE_udata8 => cur.u64(),
        DW_EH_PE_sleb128 => Ok(cur.sleb128()? as u64),
        DW_EH_PE_sdata2 => Ok(cur.sint(2)? as u64),
        DW_EH_PE_sdata4 => Ok(cur.sint(4)? as u64),
        DW_EH_PE_sdata8 => Ok(cur.sint(8)? as u64),
        other => Err(Error::UnknownEncoding(other)),
    }
}

const DW_CFA_nop: u8 = 0x00;
const DW_CFA_set_loc: u8 = 0x01;
const DW_CFA_advance_loc1: u8 = 0x02;
const DW_CFA_advance_loc2: u8 = 0x03;
const DW_CFA_advance_loc4: u8 = 0x04;
const DW_CFA_offset_extended: u8 = 0x05;
const DW_CFA_restore_extended: u8 = 0x06;
const DW_CFA_undefined: u8 = 0x07;
const DW_CFA_same_value: u8 = 0x08;
const DW_CFA_register: u8 = 0x09;
const DW_CFA_remember_state: u8 = 0x0a;
const DW_CFA_restore_state: u8 = 0x0b;
const DW_CFA_def_cfa: u8 = 0x0c;
const DW_CFA_def_cfa_register: u8 = 0x0d;
const DW_CFA_def_cfa_offset: u8 = 0x0e;
const DW_CFA_def_cfa_expression: u8 = 0x0f;
const DW_CFA_expression: u8 = 0x10;
const DW_CFA_offset_extended_sf: u8 = 0x11;
const DW_CFA_def_cfa_sf: u8 = 0x12;
const DW_CFA_def_cfa_offset_sf: u8 = 0x13;
const DW_CFA_val_offset: u8 = 0x14;
const DW_CFA_val_offset_sf: u8 = 0x15;
const DW_CFA_val_expression: u8 = 0x16;
const DW_CFA_GNU_args_size: u8 = 0x2e;

const DW_EH_PE_absptr: u8 = 0x00;
const DW_EH_PE_uleb128: u8 = 0x01;
const DW_EH_PE_udata2: u8 = 0x02;
const DW_EH_PE_udata4: u8 = 0x03;
const DW_EH_PE_udata8: u8 = 0x04;
const DW_EH_PE_sleb128: u8 = 0x09;
const DW_EH_PE_sdata2: u8 = 0x0a;
const DW_EH_PE_sdata4: u8 = 0x0b;
const DW_EH_PE_sdata8: u8 = 0x0c;
const DW_EH_PE_pcrel: u8 = 0x10;
const DW_EH_PE_datarel: u8 = 0x30;
const DW_EH_PE_omit: u8 = 0xff;
