//! # coretrace-unwind
//!
//! Stack walking over the DWARF call-frame information parsed by
//! [`coretrace_dwarf`]. Given a target's memory, its loaded objects and a
//! thread's registers, [`StackWalker`] produces the thread's frames:
//! instruction pointer, canonical frame address, reconstructed registers
//! and the covering function entry.
//!
//! The walker consumes a [`Target`] (address space plus object lookup) and
//! a [`ThreadSource`] (thread enumeration); both are traits so live
//! processes, core files and test fixtures all drive the same engine. The
//! x86 specifics live in [`arch`]: DWARF column numbering and the i386
//! signal-trampoline recovery tables.

pub mod arch;
pub mod args;
pub mod cache;
pub mod error;
pub mod regs;
pub mod target;
pub mod walker;

pub use arch::Arch;
pub use args::{frame_arguments, ArgLocation, FrameArg};
pub use cache::DebugCache;
pub use error::UnwindError;
pub use regs::{RegisterFile, MAX_REGISTERS};
pub use target::{LoadedObject, Target, ThreadInfo, ThreadKind, ThreadSource, ThreadStack};
pub use walker::{unwind_threads, Frame, StackWalker};
