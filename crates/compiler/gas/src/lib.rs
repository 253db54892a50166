//! # Covenant Gas Analysis
//!
//! Streams over emitted assembly items in execution order, maintaining a
//! symbolic machine state (an expression-equivalence-class table, a
//! symbolic stack and a known-storage map), and reports a per-instruction
//! worst-case gas consumption, possibly infinite.
//!
//! The analysis is deliberately conservative: whenever a quantity the cost
//! depends on is not statically known (a memory offset, a copy length, the
//! gas forwarded to a call), the estimate saturates to infinity rather than
//! guessing.

pub mod assembly;
pub mod expression_classes;
pub mod gas_meter;
pub mod instruction;
pub mod known_state;
pub mod schedule;

pub use assembly::AssemblyItem;
pub use expression_classes::{ClassId, ExpressionClasses};
pub use gas_meter::{GasConsumption, GasMeter};
pub use instruction::{GasPriceTier, Instruction};
pub use known_state::KnownState;
pub use schedule::GasSchedule;
