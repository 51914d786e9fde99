//! Architecture descriptions: DWARF register numbering and the kernel
//! ABI constants behind signal-trampoline recovery.

/// The architectures the walker knows how to unwind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X86,
    X86_64,
}

impl Arch {
    /// Pointer width in bytes.
    pub fn pointer_size(self) -> u8 {
        match self {
            Arch::X86 => 4,
            Arch::X86_64 => 8,
        }
    }

    /// The DWARF column holding the instruction pointer.
    pub fn pc_register(self) -> u16 {
        match self {
            Arch::X86 => 8,   // eip
            Arch::X86_64 => 16, // rip
        }
    }

    /// The DWARF column holding the stack pointer.
    pub fn sp_register(self) -> u16 {
        match self {
            Arch::X86 => 4,  // esp
            Arch::X86_64 => 7, // rsp
        }
    }
}

// i386 signal trampoline recovery. The offsets and the slot table are the
// kernel's signal-frame ABI: `__restore` runs with a sigcontext at SP+4,
// `__restore_rt` with a ucontext pointer at SP+8 whose gregs sit 20 bytes
// in. The table pairs DWARF column numbers with gregset slots.

/// Number of 32-bit slots in an i386 gregset.
pub(crate) const I386_GREG_COUNT: usize = 19;

/// gregset slot holding EIP.
pub(crate) const I386_GREG_EIP: usize = 14;

/// `__restore`: sigcontext lives right above the return slot.
pub(crate) const I386_SIGCONTEXT_OFFSET: u64 = 4;

/// `__restore_rt`: the ucontext pointer sits at SP+8 ...
pub(crate) const I386_UCONTEXT_PTR_OFFSET: u64 = 8;

/// ... and the gregs 20 bytes into the ucontext.
pub(crate) const I386_UCONTEXT_GREGS_OFFSET: u64 = 20;

/// (DWARF column, gregset slot) pairs for the recovered registers.
pub(crate) const I386_GREG_MAP: [(u16, usize); 14] = [
    (1, 11),  // eax
    (2, 10),  // ecx
    (3, 8),   // ebx
    (4, 7),   // esp
    (5, 6),   // ebp
    (6, 5),   // esi
    (7, 4),   // edi
    (8, 14),  // eip
    (9, 16),  // eflags
    (10, 15), // cs
    (11, 18), // ss
    (12, 3),  // ds
    (13, 2),  // es
    (14, 1),  // fs
];
