//! The target-process contracts the walker consumes.
//!
//! A target is anything that can hand out bytes of its address space and
//! say which loaded object covers an address: a live process via `/proc`,
//! a core file, or a test fixture. Thread enumeration is a callback
//! interface so a thread-db style library can drive it.

use std::sync::Arc;

use coretrace_dwarf::{Info, ObjectFile, Reader};

use crate::error::UnwindError;
use crate::regs::RegisterFile;
use crate::walker::Frame;

/// One object mapped into the target, with its parsed debug info.
pub struct LoadedObject {
    /// Display name, usually the image path.
    pub name: String,
    pub object: Arc<dyn ObjectFile>,
    pub dwarf: Option<Arc<Info>>,
}

impl LoadedObject {
    /// Whether an absolute address falls inside this object loaded at
    /// `reloc`.
    pub fn contains(&self, reloc: u64, addr: u64) -> bool {
        let objaddr = addr.wrapping_sub(reloc);
        self.object
            .load_segments()
            .iter()
            .any(|seg| seg.contains(objaddr))
    }
}

/// A process (or core) being walked.
pub trait Target {
    /// The target's address space.
    fn memory(&self) -> &dyn Reader;

    /// The object covering `addr`, with its load relocation.
    fn find_object(&self, addr: u64) -> Option<(u64, Arc<LoadedObject>)>;
}

/// What kind of thread an enumerator reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadKind {
    Any,
    User,
    System,
}

/// Identity of one thread of the target.
#[derive(Debug, Clone, Copy)]
pub struct ThreadInfo {
    pub tid: u64,
    pub lwp: u64,
    pub kind: ThreadKind,
}

/// Yields every thread of the target with its register file.
pub trait ThreadSource {
    fn for_each_thread(
        &self,
        f: &mut dyn FnMut(ThreadInfo, RegisterFile),
    ) -> Result<(), UnwindError>;
}

/// One thread's backtrace.
pub struct ThreadStack {
    pub info: ThreadInfo,
    pub frames: Vec<Frame>,
}
