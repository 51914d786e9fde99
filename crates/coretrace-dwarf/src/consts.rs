//! DWARF constants: tags, attribute names, forms, and line-program opcodes.
//!
//! Only the subsets meaningful to DWARF versions 2 through 4 are named;
//! everything else round-trips through an `Unknown` variant so a malformed
//! or newer producer cannot make decoding panic.

/// DIE tags (`DW_TAG_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DwTag {
    ArrayType,
    ClassType,
    EnumerationType,
    FormalParameter,
    LexicalBlock,
    Member,
    PointerType,
    ReferenceType,
    CompileUnit,
    StructureType,
    SubroutineType,
    Typedef,
    UnionType,
    UnspecifiedParameters,
    InlinedSubroutine,
    BaseType,
    ConstType,
    Subprogram,
    Variable,
    VolatileType,
    Namespace,
    Unknown(u16),
}

impl From<u64> for DwTag {
    fn from(value: u64) -> Self {
        match value {
            0x01 => DwTag::ArrayType,
            0x02 => DwTag::ClassType,
            0x04 => DwTag::EnumerationType,
            0x05 => DwTag::FormalParameter,
            0x0b => DwTag::LexicalBlock,
            0x0d => DwTag::Member,
            0x0f => DwTag::PointerType,
            0x10 => DwTag::ReferenceType,
            0x11 => DwTag::CompileUnit,
            0x13 => DwTag::StructureType,
            0x15 => DwTag::SubroutineType,
            0x16 => DwTag::Typedef,
            0x17 => DwTag::UnionType,
            0x18 => DwTag::UnspecifiedParameters,
            0x1d => DwTag::InlinedSubroutine,
            0x24 => DwTag::BaseType,
            0x26 => DwTag::ConstType,
            0x2e => DwTag::Subprogram,
            0x34 => DwTag::Variable,
            0x35 => DwTag::VolatileType,
            0x39 => DwTag::Namespace,
            v => DwTag::Unknown(v as u16),
        }
    }
}

/// Attribute names (`DW_AT_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DwAt {
    Sibling,
    Location,
    Name,
    ByteSize,
    StmtList,
    LowPc,
    HighPc,
    Language,
    CompDir,
    ConstValue,
    Inline,
    Producer,
    AbstractOrigin,
    DeclFile,
    DeclLine,
    Encoding,
    External,
    FrameBase,
    Specification,
    Type,
    Ranges,
    Unknown(u16),
}

impl From<u64> for DwAt {
    fn from(value: u64) -> Self {
        match value {
            0x01 => DwAt::Sibling,
            0x02 => DwAt::Location,
            0x03 => DwAt::Name,
            0x0b => DwAt::ByteSize,
            0x10 => DwAt::StmtList,
            0x11 => DwAt::LowPc,
            0x12 => DwAt::HighPc,
            0x13 => DwAt::Language,
            0x1b => DwAt::CompDir,
            0x1c => DwAt::ConstValue,
            0x20 => DwAt::Inline,
            0x25 => DwAt::Producer,
            0x31 => DwAt::AbstractOrigin,
            0x3a => DwAt::DeclFile,
            0x3b => DwAt::DeclLine,
            0x3e => DwAt::Encoding,
            0x3f => DwAt::External,
            0x40 => DwAt::FrameBase,
            0x47 => DwAt::Specification,
            0x49 => DwAt::Type,
            0x55 => DwAt::Ranges,
            v => DwAt::Unknown(v as u16),
        }
    }
}

/// Attribute forms (`DW_FORM_*`), DWARF 2 through 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DwForm {
    Addr,
    Block2,
    Block4,
    Data2,
    Data4,
    Data8,
    String,
    Block,
    Block1,
    Data1,
    Flag,
    Sdata,
    Strp,
    Udata,
    RefAddr,
    Ref1,
    Ref2,
    Ref4,
    Ref8,
    RefUdata,
    Indirect,
    SecOffset,
    Exprloc,
    FlagPresent,
    RefSig8,
    Unknown(u16),
}

impl From<u64> for DwForm {
    fn from(value: u64) -> Self {
        match value {
            0x01 => DwForm::Addr,
            0x03 => DwForm::Block2,
            0x04 => DwForm::Block4,
            0x05 => DwForm::Data2,
            0x06 => DwForm::Data4,
            0x07 => DwForm::Data8,
            0x08 => DwForm::String,
            0x09 => DwForm::Block,
            0x0a => DwForm::Block1,
            0x0b => DwForm::Data1,
            0x0c => DwForm::Flag,
            0x0d => DwForm::Sdata,
            0x0e => DwForm::Strp,
            0x0f => DwForm::Udata,
            0x10 => DwForm::RefAddr,
            0x11 => DwForm::Ref1,
            0x12 => DwForm::Ref2,
            0x13 => DwForm::Ref4,
            0x14 => DwForm::Ref8,
            0x15 => DwForm::RefUdata,
            0x16 => DwForm::Indirect,
            0x17 => DwForm::SecOffset,
            0x18 => DwForm::Exprloc,
            0x19 => DwForm::FlagPresent,
            0x20 => DwForm::RefSig8,
            v => DwForm::Unknown(v as u16),
        }
    }
}

/// Standard line-number opcodes (`DW_LNS_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DwLns {
    Copy = 0x01,
    AdvancePc = 0x02,
    AdvanceLine = 0x03,
    SetFile = 0x04,
    SetColumn = 0x05,
    NegateStmt = 0x06,
    SetBasicBlock = 0x07,
    ConstAddPc = 0x08,
    FixedAdvancePc = 0x09,
    SetPrologueEnd = 0x0a,
    SetEpilogueBegin = 0x0b,
    SetIsa = 0x0c,
}

/// Extended line-number opcodes (`DW_LNE_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DwLne {
    EndSequence = 0x01,
    SetAddress = 0x02,
    DefineFile = 0x03,
    SetDiscriminator = 0x04,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_conversion() {
        assert!(matches!(DwTag::from(0x11), DwTag::CompileUnit));
        assert!(matches!(DwTag::from(0x2e), DwTag::Subprogram));
        assert!(matches!(DwTag::from(0x1d), DwTag::InlinedSubroutine));
        assert!(matches!(DwTag::from(0xfff), DwTag::Unknown(0xfff)));
    }

    #[test]
    fn form_conversion() {
        assert!(matches!(DwForm::from(0x01), DwForm::Addr));
        assert!(matches!(DwForm::from(0x18), DwForm::Exprloc));
        assert!(matches!(DwForm::from(0x7f), DwForm::Unknown(0x7f)));
    }
}
