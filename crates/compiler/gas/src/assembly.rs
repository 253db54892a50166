//! Assembly items as emitted by the code generator.

use std::fmt;

use num_bigint::BigUint;

use crate::instruction::Instruction;

/// One item of the lowered assembly stream: an operation, a push of some
/// flavor, a jump target tag, or embedded data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblyItem {
    Operation(Instruction),
    /// Push of a literal value.
    Push(BigUint),
    /// Push of a tag's eventual code offset.
    PushTag(usize),
    /// Push of a data reference.
    PushData(u64),
    /// Push of a subassembly's offset.
    PushSub(u64),
    /// Push of a subassembly's size.
    PushSubSize(u64),
    /// Push of the assembled program size.
    PushProgramSize,
    /// Push of a library address patched in at link time.
    PushLibraryAddress,
    /// Jump target.
    Tag(usize),
    /// Embedded raw data, never executed.
    Data(Vec<u8>),
}

impl AssemblyItem {
    pub fn push(value: u64) -> Self {
        Self::Push(BigUint::from(value))
    }

    pub const fn is_push(&self) -> bool {
        matches!(
            self,
            Self::Push(_)
                | Self::PushTag(_)
                | Self::PushData(_)
                | Self::PushSub(_)
                | Self::PushSubSize(_)
                | Self::PushProgramSize
                | Self::PushLibraryAddress
        )
    }
}

impl From<Instruction> for AssemblyItem {
    fn from(instruction: Instruction) -> Self {
        Self::Operation(instruction)
    }
}

impl fmt::Display for AssemblyItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Operation(instruction) => write!(f, "{instruction}"),
            Self::Push(value) => write!(f, "PUSH {value}"),
            Self::PushTag(tag) => write!(f, "PUSH [tag{tag}]"),
            Self::PushData(id) => write!(f, "PUSH [data{id}]"),
            Self::PushSub(id) => write!(f, "PUSH [sub{id}]"),
            Self::PushSubSize(id) => write!(f, "PUSH #[sub{id}]"),
            Self::PushProgramSize => write!(f, "PUSHSIZE"),
            Self::PushLibraryAddress => write!(f, "PUSHLIB"),
            Self::Tag(tag) => write!(f, "tag{tag}:"),
            Self::Data(data) => write!(f, "data({} bytes)", data.len()),
        }
    }
}
