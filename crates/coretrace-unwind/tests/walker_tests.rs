//! Walker tests over a synthetic target: hand-assembled debug sections,
//! a fake address space, and mock loaded objects.

use std::sync::Arc;

use coretrace_dwarf::object::{ObjectFile, Section, Segment, Symbol, SymbolKind};
use coretrace_dwarf::reader::{Reader, SliceReader};
use coretrace_dwarf::{Info, Result as DwarfResult};
use coretrace_unwind::{
    frame_arguments, Arch, ArgLocation, LoadedObject, RegisterFile, StackWalker, Target,
};

// ---------------------------------------------------------------------------
// Mock target machinery
// ---------------------------------------------------------------------------

struct TestObject {
    address_size: u8,
    segments: Vec<Segment>,
    sections: Vec<(&'static str, Vec<u8>)>,
    symbols: Vec<(&'static str, Symbol)>,
}

impl ObjectFile for TestObject {
    fn address_size(&self) -> u8 {
        self.address_size
    }

    fn load_segments(&self) -> Vec<Segment> {
        self.segments.clone()
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

    fn symbol_by_name(&self, name: &str) -> Option<Symbol> {
        self.symbols
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, sym)| *sym)
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

/// A sparse address space: one writable region.
struct TestMemory {
    base: u64,
    bytes: Vec<u8>,
}

impl TestMemory {
    fn new(base: u64, len: usize) -> Self {
        Self {
            base,
            bytes: vec![0; len],
        }
    }

    fn write_u32(&mut self, addr: u64, value: u32) {
        let off = (addr - self.base) as usize;
        self.bytes[off..off + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn write_u64(&mut self, addr: u64, value: u64) {
        let off = (addr - self.base) as usize;
        self.bytes[off..off + 8].copy_from_slice(&value.to_le_bytes());
    }
}

impl Reader for TestMemory {
    fn size(&self) -> u64 {
        u64::MAX
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> DwarfResult<usize> {
        if offset < self.base || offset >= self.base + self.bytes.len() as u64 {
            return Ok(0);
        }
        let start = (offset - self.base) as usize;
        let n = buf.len().min(self.bytes.len() - start);
        buf[..n].copy_from_slice(&self.bytes[start..start + n]);
        Ok(n)
    }
}

struct TestTarget {
    memory: TestMemory,
    objects: Vec<(u64, Arc<LoadedObject>)>,
}

impl Target for TestTarget {
    fn memory(&self) -> &dyn Reader {
        &self.memory
    }

    fn find_object(&self, addr: u64) -> Option<(u64, Arc<LoadedObject>)> {
        self.objects
            .iter()
            .find(|(reloc, obj)| obj.contains(*reloc, addr))
            .map(|(reloc, obj)| (*reloc, obj.clone()))
    }
}

fn loaded(object: TestObject) -> Arc<LoadedObject> {
    let object: Arc<dyn ObjectFile> = Arc::new(object);
    let dwarf = Arc::new(Info::new(object.as_ref()));
    Arc::new(LoadedObject {
        name: "app".to_string(),
        object,
        dwarf: Some(dwarf),
    })
}

// ---------------------------------------------------------------------------
// Section builders
// ---------------------------------------------------------------------------

/// `.debug_frame` CIE: version 1, no augmentation.
fn cie_bytes(data_alignment: u8, return_register: u8, insns: &[u8]) -> Vec<u8> {
    let mut body = vec![0x01, 0x00, 0x01, data_alignment, return_register];
    body.extend_from_slice(insns);
    let mut out = ((4 + body.len()) as u32).to_le_bytes().to_vec();
    out.extend_from_slice(&0xffff_ffffu32.to_le_bytes());
    out.extend_from_slice(&body);
    out
}

fn fde_bytes(address_size: u8, iloc: u64, range: u64, insns: &[u8]) -> Vec<u8> {
    let ptr = address_size as usize;
    let mut body = 0u32.to_le_bytes().to_vec(); // CIE at section offset 0
    body.extend_from_slice(&iloc.to_le_bytes()[..ptr]);
    body.extend_from_slice(&range.to_le_bytes()[..ptr]);
    body.extend_from_slice(insns);
    let mut out = (body.len() as u32).to_le_bytes().to_vec();
    out.extend_from_slice(&body);
    out
}

/// Two functions with frame-pointer-free CFI: CFA = rsp + 8, return
/// address saved at CFA - 8.
fn debug_frame_64() -> Vec<u8> {
    let mut bytes = cie_bytes(0x78, 16, &[]); // data alignment -8, RA column 16
    let insns: &[u8] = &[0x0c, 0x07, 0x08, 0x90, 0x01]; // def_cfa r7,8; offset r16,1
    bytes.extend_from_slice(&fde_bytes(8, 0x1000, 0x20, insns));
    bytes.extend_from_slice(&fde_bytes(8, 0x2000, 0x20, insns));
    bytes
}

/// Abbreviations for the 64-bit fixture:
/// 1 - compile unit (children, no attributes)
/// 2 - subprogram (children): name, low_pc, high_pc/data4, frame_base/exprloc
/// 3 - formal parameter: name, location/exprloc
/// 4 - subprogram (no children): name, low_pc, high_pc/data4
fn abbrev_64() -> Vec<u8> {
    vec![
        0x01, 0x11, 0x01, 0x00, 0x00, //
        0x02, 0x2e, 0x01, 0x03, 0x08, 0x11, 0x01, 0x12, 0x06, 0x40, 0x18, 0x00, 0x00, //
        0x03, 0x05, 0x00, 0x03, 0x08, 0x02, 0x18, 0x00, 0x00, //
        0x04, 0x2e, 0x00, 0x03, 0x08, 0x11, 0x01, 0x12, 0x06, 0x00, 0x00, //
        0x00,
    ]
}

/// "foo" at [0x2000, 0x2020) with parameter `x` at fbreg -8 (frame base =
/// CFA), and "main" at [0x1000, 0x1020).
fn debug_info_64() -> Vec<u8> {
    let mut dies = vec![0x01];
    dies.push(0x02);
    dies.extend_from_slice(b"foo\0");
    dies.extend_from_slice(&0x2000u64.to_le_bytes());
    dies.extend_from_slice(&0x20u32.to_le_bytes());
    dies.extend_from_slice(&[0x01, 0x9c]); // frame base: call_frame_cfa
    dies.push(0x03);
    dies.extend_from_slice(b"x\0");
    dies.extend_from_slice(&[0x02, 0x91, 0x78]); // location: fbreg -8
    dies.push(0x00); // end of foo
    dies.push(0x04);
    dies.extend_from_slice(b"main\0");
    dies.extend_from_slice(&0x1000u64.to_le_bytes());
    dies.extend_from_slice(&0x20u32.to_le_bytes());
    dies.push(0x00); // end of unit

    let mut bytes = ((7 + dies.len()) as u32).to_le_bytes().to_vec();
    bytes.extend_from_slice(&2u16.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.push(8);
    bytes.extend_from_slice(&dies);
    bytes
}

fn target_64() -> TestTarget {
    let object = TestObject {
        address_size: 8,
        segments: vec![Segment {
            vaddr: 0x1000,
            filesz: 0x2000,
            memsz: 0x2000,
        }],
        sections: vec![
            (".debug_frame", debug_frame_64()),
            (".debug_info", debug_info_64()),
            (".debug_abbrev", abbrev_64()),
        ],
        symbols: Vec::new(),
    };

    // Stack: the return address into main, then a zero return address.
    let mut memory = TestMemory::new(0x7f00, 0x200);
    memory.write_u64(0x8000, 0x1010);
    memory.write_u64(0x8008, 0);

    TestTarget {
        memory,
        objects: vec![(0, loaded(object))],
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn walks_two_frames_and_stops_at_zero_pc() {
    let target = target_64();
    let walker = StackWalker::new(Arch::X86_64);

    let mut regs = RegisterFile::new();
    regs.set(7, 0x8000); // rsp
    regs.set(16, 0x2010); // rip inside foo

    let frames = walker.unwind(&target, regs);
    assert_eq!(frames.len(), 2);

    let info = target.objects[0].1.dwarf.as_ref().unwrap();
    assert_eq!(frames[0].ip, 0x2010);
    assert_eq!(frames[0].cfa, Some(0x8008));
    assert!(frames[0].pc_exact);
    assert_eq!(
        frames[0].function.as_ref().and_then(|f| f.name(info)).as_deref(),
        Some("foo")
    );

    assert_eq!(frames[1].ip, 0x1010);
    assert_eq!(frames[1].cfa, Some(0x8010));
    assert!(!frames[1].pc_exact);
    assert_eq!(frames[1].source_pc(), 0x100f);
    assert_eq!(frames[1].regs.get(7), Some(0x8008));
    assert_eq!(
        frames[1].function.as_ref().and_then(|f| f.name(info)).as_deref(),
        Some("main")
    );
}

#[test]
fn resolves_arguments_through_the_frame_base() {
    let target = target_64();
    let walker = StackWalker::new(Arch::X86_64);

    let mut regs = RegisterFile::new();
    regs.set(7, 0x8000);
    regs.set(16, 0x2010);

    let frames = walker.unwind(&target, regs);
    let args = frame_arguments(&target, &frames[0]);
    assert_eq!(args.len(), 1);
    assert_eq!(args[0].name.as_deref(), Some("x"));
    // frame base = CFA = 0x8008; fbreg -8 puts x at 0x8000.
    assert_eq!(args[0].location, Some(ArgLocation::Address(0x8000)));
}

#[test]
fn undefined_return_address_ends_the_walk() {
    // The CIE marks the return-address column undefined, as the outermost
    // frame of a thread does.
    let mut frame_bytes = cie_bytes(0x78, 16, &[0x0c, 0x07, 0x08, 0x07, 0x10]);
    frame_bytes.extend_from_slice(&fde_bytes(8, 0x1000, 0x20, &[]));

    let object = TestObject {
        address_size: 8,
        segments: vec![Segment {
            vaddr: 0x1000,
            filesz: 0x1000,
            memsz: 0x1000,
        }],
        sections: vec![(".debug_frame", frame_bytes)],
        symbols: Vec::new(),
    };
    let target = TestTarget {
        memory: TestMemory::new(0x8000, 0x100),
        objects: vec![(0, loaded(object))],
    };

    let mut regs = RegisterFile::new();
    regs.set(7, 0x8000);
    regs.set(16, 0x1008);

    let frames = StackWalker::new(Arch::X86_64).unwind(&target, regs);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].cfa, Some(0x8008));
}

#[test]
fn first_frame_pops_a_return_address() {
    let mut target = target_64();
    // A crashed call to address zero: the real pc is on the stack top.
    target.memory.write_u64(0x7ff8, 0x2010);

    let mut regs = RegisterFile::new();
    regs.set(7, 0x7ff8);
    regs.set(16, 0);

    let frames = StackWalker::new(Arch::X86_64).unwind(&target, regs);
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0].ip, 0);
    assert_eq!(frames[0].cfa, None);
    assert_eq!(frames[1].ip, 0x2010);
    assert_eq!(frames[1].regs.get(7), Some(0x8000));
    assert_eq!(frames[2].ip, 0x1010);
}

#[test]
fn i386_signal_trampoline_recovers_the_ucontext() {
    // 32-bit CFI: CFA = esp + 8, return address at CFA - 4.
    let mut frame_bytes = cie_bytes(0x7c, 8, &[]);
    let insns: &[u8] = &[0x0c, 0x04, 0x08, 0x88, 0x01];
    frame_bytes.extend_from_slice(&fde_bytes(4, 0x2000, 0x20, insns));

    let object = TestObject {
        address_size: 4,
        segments: vec![Segment {
            vaddr: 0x1000,
            filesz: 0x3000,
            memsz: 0x3000,
        }],
        sections: vec![(".debug_frame", frame_bytes)],
        symbols: vec![(
            "__restore_rt",
            Symbol {
                value: 0x3000,
                size: 0,
            },
        )],
    };

    let mut memory = TestMemory::new(0x8000, 0x3000);
    // Frame 0 at 0x2010: CFA = 0x8008, return address at 0x8004 is the
    // trampoline.
    memory.write_u32(0x8004, 0x3000);
    // __restore_rt: ucontext pointer at SP+8 = 0x8010.
    memory.write_u32(0x8010, 0x9000);
    // gregs at 0x9000 + 20; the interrupted frame had eax 0xaa,
    // esp 0xa000, eip 0x2008.
    let gregs = 0x9014u64;
    memory.write_u32(gregs + 4 * 11, 0xaa); // eax
    memory.write_u32(gregs + 4 * 7, 0xa000); // esp
    memory.write_u32(gregs + 4 * 14, 0x2008); // eip
    memory.write_u32(gregs + 4 * 16, 0x246); // eflags
    // The interrupted frame's own return address is zero: end of walk.
    memory.write_u32(0xa004, 0);

    let target = TestTarget {
        memory,
        objects: vec![(0, loaded(object))],
    };

    let mut regs = RegisterFile::new();
    regs.set(4, 0x8000); // esp
    regs.set(8, 0x2010); // eip

    let frames = StackWalker::new(Arch::X86).unwind(&target, regs);
    assert_eq!(frames.len(), 3);

    assert_eq!(frames[0].ip, 0x2010);
    assert_eq!(frames[0].cfa, Some(0x8008));

    // The trampoline frame itself.
    assert_eq!(frames[1].ip, 0x3000);
    assert!(frames[1].signal_frame);

    // The interrupted frame, recovered from the ucontext: its pc is
    // exact, and its registers come from the gregset.
    assert_eq!(frames[2].ip, 0x2008);
    assert!(frames[2].pc_exact);
    assert_eq!(frames[2].regs.get(1), Some(0xaa)); // eax
    assert_eq!(frames[2].regs.get(9), Some(0x246)); // eflags
    assert_eq!(frames[2].cfa, Some(0xa008));
}

#[test]
fn frame_cap_bounds_the_walk() {
    // CFI whose "caller" is the same frame over and over: CFA advances
    // each time (rsp + 8), and the saved return address always points
    // back into the function.
    let mut target = target_64();
    let mut walker = StackWalker::new(Arch::X86_64);
    walker.max_frames = 4;

    // Fill the stack with return addresses into foo.
    for slot in 0..32 {
        target.memory.write_u64(0x7f00 + 8 * slot, 0x2010);
    }

    let mut regs = RegisterFile::new();
    regs.set(7, 0x7f00);
    regs.set(16, 0x2010);

    let frames = walker.unwind(&target, regs);
    assert_eq!(frames.len(), 4);
}
