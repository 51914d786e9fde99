//! Error types for stack walking.

use thiserror::Error;

/// Why a thread's walk could not continue.
///
/// These end one thread's walk; the frames already produced remain valid.
#[derive(Error, Debug)]
pub enum UnwindError {
    /// No loaded object's segments cover the pc.
    #[error("pc {0:#x} is not covered by any loaded object")]
    NoObject(u64),

    /// The covering object carries no frame sections at all.
    #[error("object covering pc {0:#x} has no frame information")]
    NoUnwindInfo(u64),

    /// Neither frame section has an FDE for the pc.
    #[error("no frame descriptor covers pc {0:#x}")]
    NoFde(u64),

    /// The row in effect at the pc never defined a CFA.
    #[error("call frame at pc {0:#x} has no CFA rule")]
    NoCfaRule(u64),

    /// A rule needed a register the current frame does not know.
    #[error("register {0} has no known value")]
    RegisterUnavailable(u16),

    /// Thread enumeration failed.
    #[error("thread enumeration failed: {0}")]
    Threads(String),

    /// The DWARF engine failed underneath.
    #[error(transparent)]
    Dwarf(#[from] coretrace_dwarf::Error),
}
