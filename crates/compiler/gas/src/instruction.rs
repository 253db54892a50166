//! The virtual machine instruction set, with the static information the
//! meter and the symbolic state need: stack arity and gas price tier.

use std::fmt;

/// Gas price tier of an instruction; the schedule maps tiers to base
/// costs. `Special` instructions derive their cost from operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GasPriceTier {
    Zero,
    Base,
    VeryLow,
    Low,
    Mid,
    High,
    Ext,
    Special,
    Invalid,
}

impl GasPriceTier {
    /// Index into the schedule's tier step table; `None` for `Invalid`.
    pub const fn step_index(self) -> Option<usize> {
        match self {
            Self::Zero => Some(0),
            Self::Base => Some(1),
            Self::VeryLow => Some(2),
            Self::Low => Some(3),
            Self::Mid => Some(4),
            Self::High => Some(5),
            Self::Ext => Some(6),
            Self::Special => Some(7),
            Self::Invalid => None,
        }
    }
}

/// Stack effect and price tier of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionInfo {
    /// Items popped from the stack.
    pub args: usize,
    /// Items pushed onto the stack.
    pub ret: usize,
    pub tier: GasPriceTier,
}

const fn info(args: usize, ret: usize, tier: GasPriceTier) -> InstructionInfo {
    InstructionInfo { args, ret, tier }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    Stop,
    Add,
    Mul,
    Sub,
    Div,
    Sdiv,
    Mod,
    Smod,
    Addmod,
    Mulmod,
    Exp,
    Signextend,
    Lt,
    Gt,
    Slt,
    Sgt,
    Eq,
    Iszero,
    And,
    Or,
    Xor,
    Not,
    Byte,
    Sha3,
    Address,
    Balance,
    Origin,
    Caller,
    Callvalue,
    Calldataload,
    Calldatasize,
    Calldatacopy,
    Codesize,
    Codecopy,
    Gasprice,
    Extcodesize,
    Extcodecopy,
    Blockhash,
    Coinbase,
    Timestamp,
    Number,
    Difficulty,
    Gaslimit,
    Pop,
    Mload,
    Mstore,
    Mstore8,
    Sload,
    Sstore,
    Jump,
    Jumpi,
    Pc,
    Msize,
    Gas,
    Jumpdest,
    /// `PUSH1` through `PUSH32`.
    Push(u8),
    /// `DUP1` through `DUP16`.
    Dup(u8),
    /// `SWAP1` through `SWAP16`.
    Swap(u8),
    /// `LOG0` through `LOG4`.
    Log(u8),
    Create,
    Call,
    Callcode,
    Return,
    Delegatecall,
    Suicide,
}

impl Instruction {
    pub const fn info(self) -> InstructionInfo {
        use GasPriceTier::*;
        match self {
            Self::Stop => info(0, 0, Zero),
            Self::Add | Self::Sub => info(2, 1, VeryLow),
            Self::Mul | Self::Div | Self::Sdiv | Self::Mod | Self::Smod | Self::Signextend => {
                info(2, 1, Low)
            }
            Self::Addmod | Self::Mulmod => info(3, 1, Mid),
            Self::Exp => info(2, 1, Special),
            Self::Lt | Self::Gt | Self::Slt | Self::Sgt | Self::Eq => info(2, 1, VeryLow),
            Self::Iszero | Self::Not => info(1, 1, VeryLow),
            Self::And | Self::Or | Self::Xor | Self::Byte => info(2, 1, VeryLow),
            Self::Sha3 => info(2, 1, Special),
            Self::Address
            | Self::Origin
            | Self::Caller
            | Self::Callvalue
            | Self::Calldatasize
            | Self::Codesize
            | Self::Gasprice
            | Self::Coinbase
            | Self::Timestamp
            | Self::Number
            | Self::Difficulty
            | Self::Gaslimit => info(0, 1, Base),
            Self::Balance | Self::Extcodesize | Self::Blockhash => info(1, 1, Ext),
            Self::Calldataload => info(1, 1, VeryLow),
            Self::Calldatacopy | Self::Codecopy => info(3, 0, VeryLow),
            Self::Extcodecopy => info(4, 0, Ext),
            Self::Pop => info(1, 0, Base),
            Self::Mload => info(1, 1, VeryLow),
            Self::Mstore | Self::Mstore8 => info(2, 0, VeryLow),
            Self::Sload => info(1, 1, Special),
            Self::Sstore => info(2, 0, Special),
            Self::Jump => info(1, 0, Mid),
            Self::Jumpi => info(2, 0, High),
            Self::Pc | Self::Msize | Self::Gas => info(0, 1, Base),
            Self::Jumpdest => info(0, 0, Special),
            Self::Push(_) => info(0, 1, VeryLow),
            Self::Dup(n) => info(n as usize, (n as usize) + 1, VeryLow),
            Self::Swap(n) => info((n as usize) + 1, (n as usize) + 1, VeryLow),
            Self::Log(n) => info((n as usize) + 2, 0, Special),
            Self::Create => info(3, 1, Special),
            Self::Call | Self::Callcode => info(7, 1, Special),
            Self::Return => info(2, 0, Zero),
            Self::Delegatecall => info(6, 1, Special),
            Self::Suicide => info(1, 0, Zero),
        }
    }

    /// Whether evaluating the instruction twice on equal operands yields
    /// equal results within one execution, so its result may join an
    /// expression equivalence class.
    pub const fn is_deterministic(self) -> bool {
        !matches!(
            self,
            Self::Gas
                | Self::Msize
                | Self::Pc
                | Self::Mload
                | Self::Create
                | Self::Call
                | Self::Callcode
                | Self::Delegatecall
        )
    }

    pub fn name(self) -> String {
        match self {
            Self::Push(n) => format!("PUSH{n}"),
            Self::Dup(n) => format!("DUP{n}"),
            Self::Swap(n) => format!("SWAP{n}"),
            Self::Log(n) => format!("LOG{n}"),
            other => format!("{other:?}").to_uppercase(),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
