//! Worst-case gas estimation per assembly item.

use std::fmt;
use std::ops::{Add, AddAssign};

use num_bigint::BigUint;
use num_traits::Zero;

use crate::assembly::AssemblyItem;
use crate::expression_classes::ClassId;
use crate::instruction::{GasPriceTier, Instruction};
use crate::known_state::KnownState;
use crate::schedule::GasSchedule;

/// A gas amount: a 256-bit value or infinity. Addition saturates to
/// infinity when the accumulator leaves the 256-bit domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasConsumption {
    pub value: BigUint,
    pub is_infinite: bool,
}

impl GasConsumption {
    pub fn new(value: impl Into<BigUint>) -> Self {
        Self {
            value: value.into(),
            is_infinite: false,
        }
    }

    pub fn zero() -> Self {
        Self::new(BigUint::zero())
    }

    pub fn infinite() -> Self {
        Self {
            value: BigUint::zero(),
            is_infinite: true,
        }
    }

    fn max_value() -> BigUint {
        (BigUint::from(1u8) << 256) - 1u8
    }
}

impl AddAssign for GasConsumption {
    fn add_assign(&mut self, other: Self) {
        if self.is_infinite {
            return;
        }
        if other.is_infinite {
            *self = Self::infinite();
            return;
        }
        let sum = &self.value + &other.value;
        if sum > Self::max_value() {
            *self = Self::infinite();
        } else {
            self.value = sum;
        }
    }
}

impl Add for GasConsumption {
    type Output = Self;

    fn add(mut self, other: Self) -> Self {
        self += other;
        self
    }
}

impl fmt::Display for GasConsumption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinite {
            write!(f, "inf")
        } else {
            write!(f, "{}", self.value)
        }
    }
}

/// Estimates the worst-case gas per item, advancing a symbolic state as it
/// goes.
pub struct GasMeter {
    state: KnownState,
    schedule: GasSchedule,
    /// Largest byte offset known to have been touched by a memory
    /// operation; expansion below it is free. Non-decreasing.
    largest_memory_access: BigUint,
}

impl GasMeter {
    pub fn new(state: KnownState, schedule: GasSchedule) -> Self {
        Self {
            state,
            schedule,
            largest_memory_access: BigUint::zero(),
        }
    }

    pub fn state(&self) -> &KnownState {
        &self.state
    }

    pub fn into_state(self) -> KnownState {
        self.state
    }

    pub fn largest_memory_access(&self) -> &BigUint {
        &self.largest_memory_access
    }

    /// Worst-case gas of executing `item` in the current symbolic state.
    /// The state is advanced past the item afterwards.
    pub fn estimate_max(&mut self, item: &AssemblyItem) -> GasConsumption {
        let gas = self.estimate(item);
        self.state.feed_item(item);
        gas
    }

    fn estimate(&mut self, item: &AssemblyItem) -> GasConsumption {
        match item {
            _ if item.is_push() => self.run_gas(Instruction::Push(1)),
            AssemblyItem::Tag(_) => self.run_gas(Instruction::Jumpdest),
            AssemblyItem::Operation(instruction) => self.estimate_operation(*instruction),
            // Embedded data is never executed; its cost is unknowable.
            _ => GasConsumption::infinite(),
        }
    }

    fn estimate_operation(&mut self, instruction: Instruction) -> GasConsumption {
        let mut gas = self.run_gas(instruction);
        match instruction {
            Instruction::Sstore => {
                let slot = self.state.relative_stack_element(0);
                let value = self.state.relative_stack_element(-1);
                let previous_non_zero = self
                    .state
                    .storage_content()
                    .get(&slot)
                    .is_some_and(|&previous| self.state.classes().known_non_zero(previous));
                if self.state.classes().known_zero(value) || previous_non_zero {
                    gas += GasConsumption::new(self.schedule.sstore_reset_gas);
                } else {
                    gas += GasConsumption::new(self.schedule.sstore_set_gas);
                }
            }
            Instruction::Sload => {
                gas += GasConsumption::new(self.schedule.sload_gas);
            }
            Instruction::Return => {
                gas += self.memory_gas_window(0, -1);
            }
            Instruction::Mload | Instruction::Mstore => {
                let end = self.memory_end_offset(0, 32);
                gas += self.memory_gas_at(end);
            }
            Instruction::Mstore8 => {
                let end = self.memory_end_offset(0, 1);
                gas += self.memory_gas_at(end);
            }
            Instruction::Sha3 => {
                gas = GasConsumption::new(self.schedule.sha3_gas);
                let length = self.state.relative_stack_element(-1);
                gas += self.word_gas(self.schedule.sha3_word_gas, length);
                gas += self.memory_gas_window(0, -1);
            }
            Instruction::Calldatacopy | Instruction::Codecopy => {
                gas += self.memory_gas_window(0, -2);
                let length = self.state.relative_stack_element(-2);
                gas += self.word_gas(self.schedule.copy_gas, length);
            }
            Instruction::Extcodecopy => {
                gas += self.memory_gas_window(-1, -3);
                let length = self.state.relative_stack_element(-3);
                gas += self.word_gas(self.schedule.copy_gas, length);
            }
            Instruction::Log(topics) => {
                gas = GasConsumption::new(
                    self.schedule.log_gas + self.schedule.log_topic_gas * u64::from(topics),
                );
                gas += self.memory_gas_window(0, -1);
                let length = self.state.relative_stack_element(-1);
                match self.state.classes().known_constant(length) {
                    Some(value) => {
                        gas += GasConsumption::new(
                            BigUint::from(self.schedule.log_data_gas) * value,
                        );
                    }
                    None => gas = GasConsumption::infinite(),
                }
            }
            Instruction::Call | Instruction::Callcode | Instruction::Delegatecall => {
                gas = GasConsumption::new(self.schedule.call_gas);
                let forwarded = self.state.relative_stack_element(0);
                match self.state.classes().known_constant(forwarded) {
                    Some(value) => gas += GasConsumption::new(value.clone()),
                    None => gas = GasConsumption::infinite(),
                }
                if instruction == Instruction::Call {
                    // Whether the target account exists is rarely known.
                    gas += GasConsumption::new(self.schedule.call_new_account_gas);
                }
                let value_size = if instruction == Instruction::Delegatecall {
                    0
                } else {
                    1
                };
                let value = self.state.relative_stack_element(-1 - value_size);
                if !self.state.classes().known_zero(value) {
                    gas += GasConsumption::new(self.schedule.call_value_transfer_gas);
                }
                gas += self.memory_gas_window(-2 - value_size, -3 - value_size);
                gas += self.memory_gas_window(-4 - value_size, -5 - value_size);
            }
            Instruction::Create => {
                gas = GasConsumption::new(self.schedule.create_gas);
                gas += self.memory_gas_window(-1, -2);
            }
            Instruction::Exp => {
                gas = GasConsumption::new(self.schedule.exp_gas);
                let exponent = self.state.relative_stack_element(-1);
                let bytes = match self.state.classes().known_constant(exponent) {
                    Some(value) => value.bits().div_ceil(8),
                    // Worst case: a full-width exponent.
                    None => 32,
                };
                gas += GasConsumption::new(self.schedule.exp_byte_gas * bytes);
            }
            _ => {}
        }
        gas
    }

    fn run_gas(&self, instruction: Instruction) -> GasConsumption {
        if instruction == Instruction::Jumpdest {
            return GasConsumption::new(self.schedule.jumpdest_gas);
        }
        match self.schedule.tier_cost(instruction.info().tier) {
            Some(cost) => GasConsumption::new(cost),
            None => GasConsumption::infinite(),
        }
    }

    /// Class of `stack[offset] + constant`, the end offset of a fixed-width
    /// memory access.
    fn memory_end_offset(&mut self, offset: i32, width: u64) -> ClassId {
        let address = self.state.relative_stack_element(offset);
        let width = self.state.classes_mut().constant(BigUint::from(width));
        self.state
            .classes_mut()
            .find(Instruction::Add, &[address, width])
    }

    /// Incremental expansion cost up to the byte offset held by `end`, or
    /// infinity when it is unknown.
    fn memory_gas_at(&mut self, end: ClassId) -> GasConsumption {
        let Some(value) = self.state.classes().known_constant(end).cloned() else {
            return GasConsumption::infinite();
        };
        if value < self.largest_memory_access {
            return GasConsumption::zero();
        }
        let previous = std::mem::replace(&mut self.largest_memory_access, value.clone());
        let linear = BigUint::from(self.schedule.memory_gas);
        let quad_div = BigUint::from(self.schedule.quad_coeff_div);
        let memory_cost = |position: BigUint| -> BigUint {
            let words = (position + 31u8) / 32u8;
            &linear * &words + &words * &words / &quad_div
        };
        GasConsumption::new(memory_cost(value) - memory_cost(previous))
    }

    /// Expansion cost of the `[offset, offset + size)` window described by
    /// two stack positions. A known-zero size touches nothing.
    fn memory_gas_window(&mut self, offset_pos: i32, size_pos: i32) -> GasConsumption {
        let size = self.state.relative_stack_element(size_pos);
        if self.state.classes().known_zero(size) {
            return GasConsumption::zero();
        }
        let offset = self.state.relative_stack_element(offset_pos);
        let end = self
            .state
            .classes_mut()
            .find(Instruction::Add, &[offset, size]);
        self.memory_gas_at(end)
    }

    /// `multiplier * ceil(size / 32)`, or infinity when the size is not
    /// statically known.
    fn word_gas(&mut self, multiplier: u64, size: ClassId) -> GasConsumption {
        let Some(value) = self.state.classes().known_constant(size) else {
            return GasConsumption::infinite();
        };
        let words = (value.clone() + 31u8) / 32u8;
        GasConsumption::new(BigUint::from(multiplier) * words)
    }
}
