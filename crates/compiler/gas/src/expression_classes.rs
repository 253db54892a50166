//! Expression equivalence classes.
//!
//! A value-numbering table: each (instruction, ordered operand class list)
//! gets a unique class id, constants get their own classes, and unknown
//! values get fresh classes that never compare equal to anything else.
//! Constant operands of the arithmetic instructions fold, so e.g.
//! `ADD(0x40, 32)` is the constant class `0x60`; the memory watermark
//! logic depends on that.

use index_vec::IndexVec;
use num_bigint::BigUint;
use num_traits::Zero;
use rustc_hash::FxHashMap;

use crate::instruction::Instruction;

index_vec::define_index_type! {
    /// Id of an expression equivalence class.
    pub struct ClassId = usize;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Expression {
    Constant(BigUint),
    Operation(Instruction, Vec<ClassId>),
    /// A value nothing is known about; each carries a distinct token.
    Unknown(usize),
}

#[derive(Debug, Default)]
pub struct ExpressionClasses {
    expressions: IndexVec<ClassId, Expression>,
    lookup: FxHashMap<Expression, ClassId>,
    next_unknown: usize,
}

impl ExpressionClasses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Class of a constant value.
    pub fn constant(&mut self, value: BigUint) -> ClassId {
        self.intern(Expression::Constant(value))
    }

    /// A fresh class nothing is known about.
    pub fn new_unknown(&mut self) -> ClassId {
        let token = self.next_unknown;
        self.next_unknown += 1;
        self.intern(Expression::Unknown(token))
    }

    /// Canonicalizes `instruction` applied to `operands`. Folds to a
    /// constant class when all operands are known constants and the
    /// instruction admits folding.
    pub fn find(&mut self, instruction: Instruction, operands: &[ClassId]) -> ClassId {
        if let Some(folded) = self.fold(instruction, operands) {
            return self.constant(folded);
        }
        self.intern(Expression::Operation(instruction, operands.to_vec()))
    }

    pub fn known_constant(&self, id: ClassId) -> Option<&BigUint> {
        match &self.expressions[id] {
            Expression::Constant(value) => Some(value),
            _ => None,
        }
    }

    pub fn known_zero(&self, id: ClassId) -> bool {
        self.known_constant(id).is_some_and(Zero::is_zero)
    }

    pub fn known_non_zero(&self, id: ClassId) -> bool {
        self.known_constant(id).is_some_and(|value| !value.is_zero())
    }

    fn intern(&mut self, expression: Expression) -> ClassId {
        if let Some(&id) = self.lookup.get(&expression) {
            return id;
        }
        let id = self.expressions.push(expression.clone());
        self.lookup.insert(expression, id);
        id
    }

    /// Constant folding over the word-sized modular arithmetic of the
    /// machine.
    fn fold(&self, instruction: Instruction, operands: &[ClassId]) -> Option<BigUint> {
        let modulus = BigUint::from(1u8) << 256;
        let constant = |id: &ClassId| self.known_constant(*id).cloned();
        let values: Option<Vec<BigUint>> = operands.iter().map(constant).collect();
        let values = values?;
        match (instruction, values.as_slice()) {
            (Instruction::Add, [a, b]) => Some((a + b) % modulus),
            (Instruction::Mul, [a, b]) => Some((a * b) % modulus),
            (Instruction::Sub, [a, b]) => {
                // Wrapping subtraction.
                Some(((&modulus + a) - b) % modulus)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_are_canonical() {
        let mut classes = ExpressionClasses::new();
        let a = classes.constant(BigUint::from(42u8));
        let b = classes.constant(BigUint::from(42u8));
        let c = classes.constant(BigUint::from(43u8));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(classes.known_non_zero(a));
        let zero = classes.constant(BigUint::zero());
        assert!(classes.known_zero(zero));
    }

    #[test]
    fn unknowns_never_merge() {
        let mut classes = ExpressionClasses::new();
        let a = classes.new_unknown();
        let b = classes.new_unknown();
        assert_ne!(a, b);
        assert!(classes.known_constant(a).is_none());
        assert!(!classes.known_zero(a));
        assert!(!classes.known_non_zero(a));
    }

    #[test]
    fn operations_canonicalize_by_operands() {
        let mut classes = ExpressionClasses::new();
        let x = classes.new_unknown();
        let y = classes.constant(BigUint::from(32u8));
        let first = classes.find(Instruction::Sha3, &[x, y]);
        let second = classes.find(Instruction::Sha3, &[x, y]);
        let swapped = classes.find(Instruction::Sha3, &[y, x]);
        assert_eq!(first, second);
        assert_ne!(first, swapped);
    }

    #[test]
    fn constant_addition_folds() {
        let mut classes = ExpressionClasses::new();
        let a = classes.constant(BigUint::from(0x40u8));
        let b = classes.constant(BigUint::from(32u8));
        let sum = classes.find(Instruction::Add, &[a, b]);
        assert_eq!(classes.known_constant(sum), Some(&BigUint::from(0x60u8)));

        // Wrap-around subtraction stays in the 256-bit domain.
        let zero = classes.constant(BigUint::zero());
        let one = classes.constant(BigUint::from(1u8));
        let wrapped = classes.find(Instruction::Sub, &[zero, one]);
        assert_eq!(
            classes.known_constant(wrapped),
            Some(&((BigUint::from(1u8) << 256) - 1u8))
        );
    }
}
