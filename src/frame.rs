//! Frame and operand stack.
//!
//! Spec §4.8: local variables are 32-bit slots indexed like the JVM
//! specifies (category-2 values span two consecutive slots), and the
//! operand stack is a push-down stack of typed 32-bit slots with the same
//! category-2 convention, high word pushed before low word. This replaces
//! the teacher's `runtime.rs` `Frame`, which stored locals in a
//! `HashMap<usize, Value>` and the stack as `Vec<Value>` of boxed 64-bit
//! values — convenient for the teacher's interpreter-plus-JIT design, but
//! not the slot-accurate model this spec requires.
use crate::registry::ClassHandle;

/// The type tag carried alongside each slot on the operand stack. Needed to
/// interpret a category-2 value's high/low halves, and to know how a
/// generic `dup`/`pop`/`swap` instruction should treat a given slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SlotKind {
    Int,
    Float,
    Reference,
    /// High word of a long/double.
    Cat2Hi,
    /// Low word of a long/double.
    Cat2Lo,
}

#[derive(Debug, Copy, Clone)]
pub struct Slot {
    pub value: i32,
    pub kind: SlotKind,
}

impl Slot {
    #[must_use]
    pub fn int(v: i32) -> Self {
        Self { value: v, kind: SlotKind::Int }
    }

    #[must_use]
    pub fn float(v: f32) -> Self {
        Self { value: v.to_bits() as i32, kind: SlotKind::Float }
    }

    #[must_use]
    pub fn reference(handle: Option<usize>) -> Self {
        Self { value: handle.map_or(-1, |h| h as i32), kind: SlotKind::Reference }
    }
}

/// Push-down stack of 32-bit typed slots.
#[derive(Debug, Default, Clone)]
pub struct OperandStack {
    slots: Vec<Slot>,
}

impl OperandStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, slot: Slot) {
        self.slots.push(slot);
    }

    pub fn push_int(&mut self, v: i32) {
        self.push(Slot::int(v));
    }

    pub fn push_float(&mut self, v: f32) {
        self.push(Slot::float(v));
    }

    pub fn push_reference(&mut self, handle: Option<usize>) {
        self.push(Slot::reference(handle));
    }

    /// Pushes a category-2 (long/double) value as two slots, high word
    /// first, per the frame model's explicit HI/LO ordering.
    pub fn push_long(&mut self, v: i64) {
        let bits = v as u64;
        self.push(Slot { value: (bits >> 32) as i32, kind: SlotKind::Cat2Hi });
        self.push(Slot { value: bits as i32, kind: SlotKind::Cat2Lo });
    }

    pub fn push_double(&mut self, v: f64) {
        self.push_long(v.to_bits() as i64);
    }

    pub fn pop(&mut self) -> Option<Slot> {
        self.slots.pop()
    }

    pub fn pop_int(&mut self) -> Option<i32> {
        self.pop().map(|s| s.value)
    }

    pub fn pop_float(&mut self) -> Option<f32> {
        self.pop().map(|s| f32::from_bits(s.value as u32))
    }

    pub fn pop_reference(&mut self) -> Option<Option<usize>> {
        self.pop().map(|s| if s.value < 0 { None } else { Some(s.value as usize) })
    }

    /// Pops a category-2 value: low word first off the stack, then high.
    pub fn pop_long(&mut self) -> Option<i64> {
        let lo = self.pop()?.value as u32;
        let hi = self.pop()?.value as u32;
        Some((u64::from(hi) << 32 | u64::from(lo)) as i64)
    }

    pub fn pop_double(&mut self) -> Option<f64> {
        self.pop_long().map(|bits| f64::from_bits(bits as u64))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Raw slot access, used by `dup*`/`swap` which operate on slots
    /// without caring about their logical type.
    pub fn peek_raw(&self, depth_from_top: usize) -> Option<Slot> {
        let len = self.slots.len();
        if depth_from_top >= len {
            return None;
        }
        Some(self.slots[len - 1 - depth_from_top])
    }

    pub fn push_raw(&mut self, slot: Slot) {
        self.slots.push(slot);
    }

    pub fn insert_raw(&mut self, index_from_top: usize, slot: Slot) {
        let len = self.slots.len();
        self.slots.insert(len - index_from_top, slot);
    }
}

/// Result of running a method to completion: how many 32-bit slots its
/// return instruction left on top of the frame's operand stack (0, 1, or
/// 2), to be popped and pushed onto the caller in the same order.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReturnSlots {
    None,
    One,
    Two,
}

/// One method activation record.
pub struct Frame {
    pub class: ClassHandle,
    pub method_index: usize,
    pub code: Vec<u8>,
    pub pc: usize,
    pub local_variables: Vec<i32>,
    pub operands: OperandStack,
}

impl Frame {
    #[must_use]
    pub fn new(class: ClassHandle, method_index: usize, code: Vec<u8>, max_locals: u16) -> Self {
        Self {
            class,
            method_index,
            code,
            pc: 0,
            local_variables: vec![0; max_locals as usize],
            operands: OperandStack::new(),
        }
    }

    #[must_use]
    pub fn fetch(&mut self) -> Option<u8> {
        let byte = *self.code.get(self.pc)?;
        self.pc += 1;
        Some(byte)
    }

    #[must_use]
    pub fn fetch_u16(&mut self) -> Option<u16> {
        let hi = self.fetch()?;
        let lo = self.fetch()?;
        Some(u16::from(hi) << 8 | u16::from(lo))
    }

    #[must_use]
    pub fn fetch_i16(&mut self) -> Option<i16> {
        self.fetch_u16().map(|v| v as i16)
    }

    #[must_use]
    pub fn fetch_i32(&mut self) -> Option<i32> {
        let hi = self.fetch_u16()?;
        let lo = self.fetch_u16()?;
        Some((i32::from(hi) << 16) | i32::from(lo))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_round_trips_through_hi_lo_slots() {
        let mut stack = OperandStack::new();
        stack.push_long(-42);
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.pop_long(), Some(-42));
        assert!(stack.is_empty());
    }

    #[test]
    fn double_round_trips() {
        let mut stack = OperandStack::new();
        stack.push_double(3.5);
        assert_eq!(stack.pop_double(), Some(3.5));
    }

    #[test]
    fn int_and_reference_are_single_slots() {
        let mut stack = OperandStack::new();
        stack.push_int(7);
        stack.push_reference(Some(3));
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.pop_reference(), Some(Some(3)));
        assert_eq!(stack.pop_int(), Some(7));
    }

    #[test]
    fn null_reference_round_trips() {
        let mut stack = OperandStack::new();
        stack.push_reference(None);
        assert_eq!(stack.pop_reference(), Some(None));
    }
}
