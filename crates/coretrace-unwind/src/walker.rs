//! The stack walker.
//!
//! Starting from one thread's registers, the walker repeatedly: records a
//! frame, finds the loaded object and debug info covering the pc, asks the
//! CFI for the register-rule row at that pc, and applies the row against
//! target memory to reconstruct the caller's registers. The walk ends at a
//! frame whose return-address rule is undefined, when the next pc is zero,
//! when the CFA stops advancing, or at the frame cap; an unwind error ends
//! the walk with the frames produced so far.

use std::sync::Arc;

use coretrace_dwarf::expr::{evaluate, ExprContext, ExprResult};
use coretrace_dwarf::frame::{CfaRule, Cie, RegisterRule};
use coretrace_dwarf::{Entry, Error as DwarfError, Reader};

use crate::arch::{
    Arch, I386_GREG_COUNT, I386_GREG_EIP, I386_GREG_MAP, I386_SIGCONTEXT_OFFSET,
    I386_UCONTEXT_GREGS_OFFSET, I386_UCONTEXT_PTR_OFFSET,
};
use crate::error::UnwindError;
use crate::regs::RegisterFile;
use crate::target::{LoadedObject, Target, ThreadSource, ThreadStack};

/// Frames to produce per thread before giving up.
const MAX_FRAMES: usize = 1024;

/// One reconstructed stack frame.
#[derive(Clone)]
pub struct Frame {
    /// Instruction pointer in the target's address space.
    pub ip: u64,
    /// Canonical frame address, when CFI produced one.
    pub cfa: Option<u64>,
    /// The machine registers as this frame sees them.
    pub regs: RegisterFile,
    /// Load relocation of the covering object.
    pub reloc: u64,
    /// The covering object, when one was found.
    pub object: Option<Arc<LoadedObject>>,
    /// The function (or inlined scope) entry covering the pc.
    pub function: Option<Entry>,
    /// The CIE this frame was unwound through.
    pub cie: Option<Arc<Cie>>,
    /// Whether that CIE was flagged as a signal handler.
    pub signal_frame: bool,
    /// Whether `ip` is exact rather than a return address. True for the
    /// innermost frame and for frames resumed from a signal handler;
    /// otherwise source lookups should use `ip - 1`.
    pub pc_exact: bool,
}

impl Frame {
    /// The pc relative to the covering object's link address.
    pub fn object_pc(&self) -> u64 {
        self.ip.wrapping_sub(self.reloc)
    }

    /// The object-relative pc to use for source-line lookups.
    pub fn source_pc(&self) -> u64 {
        if self.pc_exact {
            self.object_pc()
        } else {
            self.object_pc().wrapping_sub(1)
        }
    }
}

/// Walks thread stacks over a [`Target`].
pub struct StackWalker {
    pub arch: Arch,
    /// Upper bound on frames per thread.
    pub max_frames: usize,
}

impl StackWalker {
    pub fn new(arch: Arch) -> Self {
        Self {
            arch,
            max_frames: MAX_FRAMES,
        }
    }

    /// Produces the frame sequence for one thread.
    ///
    /// Never fails: an unwind error stops the walk with a warning and the
    /// partial frame list is returned.
    pub fn unwind(&self, target: &dyn Target, initial: RegisterFile) -> Vec<Frame> {
        let mut frames = Vec::new();
        let mut regs = initial;
        let mut pc_exact = true;
        let mut prev_cfa: Option<u64> = None;

        while frames.len() < self.max_frames {
            let Some(ip) = regs.get(self.arch.pc_register()) else {
                log::warn!("stack walk stopped: no instruction pointer");
                break;
            };

            let mut frame = Frame {
                ip,
                cfa: None,
                regs: regs.clone(),
                reloc: 0,
                object: None,
                function: None,
                cie: None,
                signal_frame: false,
                pc_exact,
            };
            if let Some((reloc, object)) = target.find_object(ip) {
                frame.reloc = reloc;
                frame.function = object
                    .dwarf
                    .as_ref()
                    .and_then(|info| info.function_at(ip.wrapping_sub(reloc)));
                frame.object = Some(object);
            }

            match self.step(target, &mut frame) {
                Ok(Some(next)) => {
                    let cfa = frame.cfa;
                    let from_signal = frame.signal_frame;
                    frames.push(frame);
                    match next.get(self.arch.pc_register()) {
                        Some(0) | None => break,
                        Some(_) => {}
                    }
                    if prev_cfa.is_some() && prev_cfa == cfa {
                        log::warn!("stack walk stopped at {ip:#x}: frame address did not advance");
                        break;
                    }
                    prev_cfa = cfa;
                    regs = next;
                    pc_exact = from_signal;
                }
                Ok(None) => {
                    // Return address undefined: the outermost frame.
                    frames.push(frame);
                    break;
                }
                Err(err) => {
                    if frames.is_empty() {
                        // A crash calling a bad address leaves the real pc
                        // on top of the stack; pop it and retry.
                        if let Some(next) = self.pop_return_address(target, &regs) {
                            log::warn!(
                                "no unwind information for initial pc {ip:#x}, popping a return address"
                            );
                            frames.push(frame);
                            regs = next;
                            pc_exact = false;
                            continue;
                        }
                    } else if self.arch == Arch::X86 {
                        if let Some(next) = self.signal_trampoline(target, &frame) {
                            frame.signal_frame = true;
                            frames.push(frame);
                            regs = next;
                            pc_exact = true;
                            prev_cfa = None;
                            continue;
                        }
                    }
                    log::warn!("stack walk stopped at {ip:#x}: {err}");
                    frames.push(frame);
                    break;
                }
            }
        }

        frames
    }

    /// Unwinds one frame: looks up the FDE, evaluates the row at the pc,
    /// and applies it. `Ok(None)` means the return address is undefined
    /// and the walk is complete.
    fn step(
        &self,
        target: &dyn Target,
        frame: &mut Frame,
    ) -> Result<Option<RegisterFile>, UnwindError> {
        let object = frame.object.clone().ok_or(UnwindError::NoObject(frame.ip))?;
        let info = object
            .dwarf
            .as_ref()
            .ok_or(UnwindError::NoUnwindInfo(frame.ip))?;
        let pc = frame.object_pc();

        // The runtime unwinds by .eh_frame; .debug_frame is the fallback.
        let (cfi, fde) = [info.eh_frame.as_ref(), info.debug_frame.as_ref()]
            .into_iter()
            .flatten()
            .find_map(|cfi| cfi.find_fde(pc).map(|fde| (cfi, fde)))
            .ok_or(UnwindError::NoFde(pc))?;
        let cie = cfi
            .cie_for(fde)
            .cloned()
            .ok_or(DwarfError::malformed("FDE", "dangling CIE reference"))?;

        let row = cie.exec_insns(cfi, fde, pc)?;
        frame.signal_frame = cie.is_signal_handler;
        frame.cie = Some(cie.clone());

        let ptr = self.arch.pointer_size();
        let memory = target.memory();

        let cfa = match &row.cfa {
            CfaRule::RegisterOffset { register, offset } => frame
                .regs
                .get(*register)
                .ok_or(UnwindError::RegisterUnavailable(*register))?
                .wrapping_add_signed(*offset),
            CfaRule::Expression(block) => {
                let ctx = FrameContext {
                    regs: &frame.regs,
                    memory,
                    cfa: None,
                    frame_base: None,
                };
                resolve(
                    evaluate(cfi.reader().as_ref(), *block, ptr, &ctx)?,
                    &frame.regs,
                )?
            }
            CfaRule::Undefined => return Err(UnwindError::NoCfaRule(pc)),
        };
        frame.cfa = Some(cfa);

        let ctx = FrameContext {
            regs: &frame.regs,
            memory,
            cfa: Some(cfa),
            frame_base: None,
        };
        let mut prev = RegisterFile::new();
        for (&reg, rule) in &row.registers {
            match rule {
                RegisterRule::Undefined | RegisterRule::Arch => {}
                RegisterRule::SameValue => {
                    if let Some(v) = frame.regs.get(reg) {
                        prev.set(reg, v);
                    }
                }
                RegisterRule::Offset(off) => {
                    let addr = cfa.wrapping_add_signed(*off);
                    prev.set(reg, read_target(memory, addr, ptr)?);
                }
                RegisterRule::ValOffset(off) => {
                    prev.set(reg, cfa.wrapping_add_signed(*off));
                }
                RegisterRule::Register(src) => {
                    if let Some(v) = frame.regs.get(*src) {
                        prev.set(reg, v);
                    }
                }
                RegisterRule::Expression(block) => {
                    let addr = resolve(
                        evaluate(cfi.reader().as_ref(), *block, ptr, &ctx)?,
                        &frame.regs,
                    )?;
                    prev.set(reg, read_target(memory, addr, ptr)?);
                }
                RegisterRule::ValExpression(block) => {
                    let value = resolve(
                        evaluate(cfi.reader().as_ref(), *block, ptr, &ctx)?,
                        &frame.regs,
                    )?;
                    prev.set(reg, value);
                }
            }
        }

        // By convention the caller's stack pointer is the CFA itself.
        let sp = self.arch.sp_register();
        if prev.get(sp).is_none() {
            prev.set(sp, cfa);
        }

        // The previous pc comes from the return-address column.
        let ra = cie.return_address_register;
        if matches!(row.rule(ra), RegisterRule::Undefined) {
            return Ok(None);
        }
        let Some(ret) = prev.get(ra) else {
            return Ok(None);
        };
        prev.set(self.arch.pc_register(), ret);
        Ok(Some(prev))
    }

    /// First-frame fallback: treat the stack top as a pushed return
    /// address.
    fn pop_return_address(
        &self,
        target: &dyn Target,
        regs: &RegisterFile,
    ) -> Option<RegisterFile> {
        let sp = regs.get(self.arch.sp_register())?;
        let ptr = self.arch.pointer_size();
        let pc = read_target(target.memory(), sp, ptr).ok()?;
        let mut next = regs.clone();
        next.set(self.arch.pc_register(), pc);
        next.set(self.arch.sp_register(), sp + ptr as u64);
        Some(next)
    }

    /// i386 signal-trampoline recovery.
    ///
    /// When the pc sits exactly on `__restore` or `__restore_rt`, the
    /// kernel's signal frame is above the stack pointer; the previous
    /// registers are copied straight out of its gregset.
    fn signal_trampoline(&self, target: &dyn Target, frame: &Frame) -> Option<RegisterFile> {
        let object = frame.object.as_ref()?;
        let pc = frame.object_pc();
        let sp = frame.regs.get(self.arch.sp_register())?;

        let gregs_addr = if object
            .object
            .symbol_by_name("__restore")
            .is_some_and(|sym| sym.value == pc)
        {
            sp + I386_SIGCONTEXT_OFFSET
        } else if object
            .object
            .symbol_by_name("__restore_rt")
            .is_some_and(|sym| sym.value == pc)
        {
            let ucontext = read_target(target.memory(), sp + I386_UCONTEXT_PTR_OFFSET, 4).ok()?;
            ucontext + I386_UCONTEXT_GREGS_OFFSET
        } else {
            return None;
        };

        let mut gregs = [0u32; I386_GREG_COUNT];
        for (i, slot) in gregs.iter_mut().enumerate() {
            *slot = read_target(target.memory(), gregs_addr + 4 * i as u64, 4).ok()? as u32;
        }

        let mut next = RegisterFile::new();
        for (dwarf, greg) in I386_GREG_MAP {
            next.set(dwarf, gregs[greg] as u64);
        }
        log::warn!(
            "recovered signal frame at {:#x}, resuming at {:#x}",
            frame.ip,
            gregs[I386_GREG_EIP]
        );
        Some(next)
    }
}

/// Walks every thread a [`ThreadSource`] yields.
pub fn unwind_threads(
    walker: &StackWalker,
    target: &dyn Target,
    threads: &dyn ThreadSource,
) -> Result<Vec<ThreadStack>, UnwindError> {
    let mut stacks = Vec::new();
    threads.for_each_thread(&mut |info, regs| {
        stacks.push(ThreadStack {
            info,
            frames: walker.unwind(target, regs),
        });
    })?;
    Ok(stacks)
}

/// Reads a `size`-byte little-endian value from target memory.
pub(crate) fn read_target(
    memory: &dyn Reader,
    addr: u64,
    size: u8,
) -> Result<u64, UnwindError> {
    let mut buf = [0u8; 8];
    memory.read_exact_at(addr, &mut buf[..size as usize])?;
    Ok(u64::from_le_bytes(buf))
}

/// Collapses an expression result to a number, reading through register
/// results.
fn resolve(result: ExprResult, regs: &RegisterFile) -> Result<u64, UnwindError> {
    match result {
        ExprResult::Value(v) | ExprResult::Address(v) => Ok(v),
        ExprResult::Register(reg) => regs
            .get(reg)
            .ok_or(UnwindError::RegisterUnavailable(reg)),
    }
}

/// A frame's registers and memory, as the expression machine sees them.
pub(crate) struct FrameContext<'a> {
    pub(crate) regs: &'a RegisterFile,
    pub(crate) memory: &'a dyn Reader,
    pub(crate) cfa: Option<u64>,
    pub(crate) frame_base: Option<u64>,
}

impl ExprContext for FrameContext<'_> {
    fn register(&self, reg: u16) -> coretrace_dwarf::Result<u64> {
        self.regs
            .get(reg)
            .ok_or(DwarfError::Expression("register value unavailable"))
    }

    fn read_memory(&self, addr: u64, size: u8) -> coretrace_dwarf::Result<u64> {
        let mut buf = [0u8; 8];
        let size = size.min(8) as usize;
        self.memory.read_exact_at(addr, &mut buf[..size])?;
        Ok(u64::from_le_bytes(buf))
    }

    fn frame_base(&self) -> coretrace_dwarf::Result<u64> {
        self.frame_base
            .ok_or(DwarfError::Expression("no frame base in this context"))
    }

    fn cfa(&self) -> coretrace_dwarf::Result<u64> {
        self.cfa
            .ok_or(DwarfError::Expression("no CFA in this context"))
    }
}
