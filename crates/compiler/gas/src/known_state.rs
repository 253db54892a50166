//! Symbolic machine state.
//!
//! Tracks the stack as a height-indexed map of expression classes (slots
//! below the tracked range materialize fresh unknowns on access), and
//! storage as a partial map from slot class to value class. Tags are
//! control-flow joins and reset all knowledge; the call family invalidates
//! storage knowledge, since foreign code may write to it.

use rustc_hash::FxHashMap;

use crate::assembly::AssemblyItem;
use crate::expression_classes::{ClassId, ExpressionClasses};
use crate::instruction::Instruction;

#[derive(Debug, Default)]
pub struct KnownState {
    classes: ExpressionClasses,
    stack_height: i32,
    stack: FxHashMap<i32, ClassId>,
    storage: FxHashMap<ClassId, ClassId>,
}

impl KnownState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classes(&self) -> &ExpressionClasses {
        &self.classes
    }

    pub fn classes_mut(&mut self) -> &mut ExpressionClasses {
        &mut self.classes
    }

    pub const fn stack_height(&self) -> i32 {
        self.stack_height
    }

    pub fn storage_content(&self) -> &FxHashMap<ClassId, ClassId> {
        &self.storage
    }

    /// Class of the stack element `offset` positions from the top (0 is
    /// the top, -1 the next). Untracked slots get a fresh unknown class.
    pub fn relative_stack_element(&mut self, offset: i32) -> ClassId {
        let height = self.stack_height + offset;
        if let Some(&id) = self.stack.get(&height) {
            return id;
        }
        let id = self.classes.new_unknown();
        self.stack.insert(height, id);
        id
    }

    /// Advances the symbolic state by one assembly item.
    pub fn feed_item(&mut self, item: &AssemblyItem) {
        match item {
            AssemblyItem::Push(value) => {
                let id = self.classes.constant(value.clone());
                self.push_class(id);
            }
            AssemblyItem::PushTag(_)
            | AssemblyItem::PushData(_)
            | AssemblyItem::PushSub(_)
            | AssemblyItem::PushSubSize(_)
            | AssemblyItem::PushProgramSize
            | AssemblyItem::PushLibraryAddress => {
                let id = self.classes.new_unknown();
                self.push_class(id);
            }
            AssemblyItem::Tag(_) => self.reset(),
            AssemblyItem::Data(_) => {}
            AssemblyItem::Operation(instruction) => self.feed_operation(*instruction),
        }
    }

    fn feed_operation(&mut self, instruction: Instruction) {
        match instruction {
            Instruction::Dup(n) => {
                let source = self.relative_stack_element(1 - i32::from(n));
                self.push_class(source);
            }
            Instruction::Swap(n) => {
                let top = self.relative_stack_element(0);
                let other = self.relative_stack_element(-i32::from(n));
                self.stack.insert(self.stack_height, other);
                self.stack.insert(self.stack_height - i32::from(n), top);
            }
            Instruction::Sstore => {
                let slot = self.relative_stack_element(0);
                let value = self.relative_stack_element(-1);
                self.pop();
                self.pop();
                self.storage.insert(slot, value);
            }
            Instruction::Sload => {
                let slot = self.relative_stack_element(0);
                self.pop();
                let value = match self.storage.get(&slot) {
                    Some(&value) => value,
                    None => self.classes.find(Instruction::Sload, &[slot]),
                };
                self.push_class(value);
            }
            Instruction::Call
            | Instruction::Callcode
            | Instruction::Delegatecall
            | Instruction::Create => {
                let info = instruction.info();
                for _ in 0..info.args {
                    self.pop();
                }
                // Foreign code may write our storage.
                self.storage.clear();
                let result = self.classes.new_unknown();
                self.push_class(result);
            }
            other => {
                let info = other.info();
                let mut operands = Vec::with_capacity(info.args);
                for offset in 0..info.args {
                    operands.push(self.relative_stack_element(-(offset as i32)));
                }
                for _ in 0..info.args {
                    self.pop();
                }
                if info.ret == 1 {
                    let result = if other.is_deterministic() {
                        self.classes.find(other, &operands)
                    } else {
                        self.classes.new_unknown()
                    };
                    self.push_class(result);
                }
            }
        }
    }

    /// Drops all stack and storage knowledge; used at control-flow joins.
    pub fn reset(&mut self) {
        self.stack.clear();
        self.storage.clear();
        self.stack_height = 0;
    }

    fn push_class(&mut self, id: ClassId) {
        self.stack_height += 1;
        self.stack.insert(self.stack_height, id);
    }

    fn pop(&mut self) {
        self.stack.remove(&self.stack_height);
        self.stack_height -= 1;
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigUint;

    use super::*;

    #[test]
    fn pushes_track_constants() {
        let mut state = KnownState::new();
        state.feed_item(&AssemblyItem::push(0x40));
        state.feed_item(&AssemblyItem::push(0));
        let top = state.relative_stack_element(0);
        let next = state.relative_stack_element(-1);
        assert!(state.classes().known_zero(top));
        assert_eq!(
            state.classes().known_constant(next),
            Some(&BigUint::from(0x40u8))
        );
    }

    #[test]
    fn dup_and_swap_are_exact() {
        let mut state = KnownState::new();
        state.feed_item(&AssemblyItem::push(1));
        state.feed_item(&AssemblyItem::push(2));
        state.feed_item(&Instruction::Dup(2).into());
        // Stack: 1 2 1.
        let top = state.relative_stack_element(0);
        assert_eq!(
            state.classes().known_constant(top),
            Some(&BigUint::from(1u8))
        );

        state.feed_item(&Instruction::Swap(1).into());
        // Stack: 1 1 2.
        let top = state.relative_stack_element(0);
        assert_eq!(
            state.classes().known_constant(top),
            Some(&BigUint::from(2u8))
        );
    }

    #[test]
    fn storage_round_trips_through_sstore_and_sload() {
        let mut state = KnownState::new();
        // SSTORE(5, 7)
        state.feed_item(&AssemblyItem::push(7));
        state.feed_item(&AssemblyItem::push(5));
        state.feed_item(&Instruction::Sstore.into());
        assert_eq!(state.stack_height(), 0);

        // SLOAD(5) sees the stored class.
        state.feed_item(&AssemblyItem::push(5));
        state.feed_item(&Instruction::Sload.into());
        let top = state.relative_stack_element(0);
        assert_eq!(
            state.classes().known_constant(top),
            Some(&BigUint::from(7u8))
        );
    }

    #[test]
    fn calls_invalidate_storage_knowledge() {
        let mut state = KnownState::new();
        state.feed_item(&AssemblyItem::push(7));
        state.feed_item(&AssemblyItem::push(5));
        state.feed_item(&Instruction::Sstore.into());
        assert!(!state.storage_content().is_empty());

        for _ in 0..7 {
            state.feed_item(&AssemblyItem::push(0));
        }
        state.feed_item(&Instruction::Call.into());
        assert!(state.storage_content().is_empty());
    }

    #[test]
    fn tags_reset_all_knowledge() {
        let mut state = KnownState::new();
        state.feed_item(&AssemblyItem::push(1));
        state.feed_item(&AssemblyItem::Tag(3));
        assert_eq!(state.stack_height(), 0);
        let top = state.relative_stack_element(0);
        assert!(state.classes().known_constant(top).is_none());
    }

    #[test]
    fn arithmetic_on_known_operands_folds() {
        let mut state = KnownState::new();
        state.feed_item(&AssemblyItem::push(30));
        state.feed_item(&AssemblyItem::push(12));
        state.feed_item(&Instruction::Add.into());
        let top = state.relative_stack_element(0);
        assert_eq!(
            state.classes().known_constant(top),
            Some(&BigUint::from(42u8))
        );
    }
}
