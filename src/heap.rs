//! Object/reference heap.
//!
//! Grounded in `original_source/src/jvm.c: newString/newClassInstance/
//! newArray/newObjectArray/deleteReference`. The reference keeps references
//! in a singly linked list freed one node at a time; this port uses a flat
//! `Vec` arena and frees everything at once on VM teardown, since nothing
//! is ever individually collected (garbage collection is an explicit
//! non-goal).
use crate::registry::ClassHandle;

/// Stable index into `ReferenceTable`'s backing vector.
pub type ReferenceHandle = usize;

/// Primitive element type of a `newarray`-allocated array.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PrimType {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl PrimType {
    /// `newarray`'s `atype` operand encodes the element type as shown in
    /// the JVM Specification table (4 = boolean .. 11 = long).
    #[must_use]
    pub fn from_atype(atype: u8) -> Option<Self> {
        match atype {
            4 => Some(Self::Boolean),
            5 => Some(Self::Char),
            6 => Some(Self::Float),
            7 => Some(Self::Double),
            8 => Some(Self::Byte),
            9 => Some(Self::Short),
            10 => Some(Self::Int),
            11 => Some(Self::Long),
            _ => None,
        }
    }

    #[must_use]
    pub fn element_size(self) -> usize {
        match self {
            Self::Boolean | Self::Byte => 1,
            Self::Char | Self::Short => 2,
            Self::Int | Self::Float => 4,
            Self::Long | Self::Double => 8,
        }
    }
}

/// A heap-allocated object.
pub enum Reference {
    String {
        bytes: Vec<u8>,
    },
    Array {
        element_type: PrimType,
        length: u32,
        data: Vec<u8>,
    },
    ClassInstance {
        class: ClassHandle,
        fields: Vec<i32>,
    },
    ObjectArray {
        class_name: Vec<u8>,
        length: u32,
        elements: Vec<Option<ReferenceHandle>>,
    },
}

/// Insertion-ordered arena of all live references, drained on VM teardown.
#[derive(Default)]
pub struct ReferenceTable {
    references: Vec<Reference>,
}

impl ReferenceTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, r: Reference) -> ReferenceHandle {
        self.references.push(r);
        self.references.len() - 1
    }

    /// Allocates a string object. An empty byte slice still yields a valid
    /// (zero-length) string reference.
    pub fn new_string(&mut self, bytes: Vec<u8>) -> ReferenceHandle {
        self.insert(Reference::String { bytes })
    }

    /// Allocates a primitive array. Returns `None` for `length == 0`: the
    /// reference implementation allocates no backing storage in that case
    /// and callers must treat the missing handle as a valid, empty array
    /// rather than `null`.
    pub fn new_array(&mut self, element_type: PrimType, length: u32) -> Option<ReferenceHandle> {
        if length == 0 {
            return None;
        }
        let data = vec![0u8; element_type.element_size() * length as usize];
        Some(self.insert(Reference::Array { element_type, length, data }))
    }

    /// Allocates a class instance with `instance_field_count` dense 32-bit
    /// slots (category-2 fields occupy two slots, same as everywhere else).
    pub fn new_class_instance(&mut self, class: ClassHandle, slot_count: usize) -> ReferenceHandle {
        self.insert(Reference::ClassInstance { class, fields: vec![0; slot_count] })
    }

    /// Allocates an array of object references. Returns `None` if
    /// `class_name` is empty or `length == 0`, mirroring
    /// `newObjectArray`'s `utf8_len <= 0` / zero-length guard.
    pub fn new_object_array(&mut self, class_name: Vec<u8>, length: u32) -> Option<ReferenceHandle> {
        if class_name.is_empty() || length == 0 {
            return None;
        }
        let elements = vec![None; length as usize];
        Some(self.insert(Reference::ObjectArray { class_name, length, elements }))
    }

    #[must_use]
    pub fn get(&self, handle: ReferenceHandle) -> &Reference {
        &self.references[handle]
    }

    pub fn get_mut(&mut self, handle: ReferenceHandle) -> &mut Reference {
        &mut self.references[handle]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.references.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    /// Releases every live reference. Object arrays recursively reference
    /// other table entries by handle, not by owned value, so there is
    /// nothing further to walk: dropping the backing `Vec` releases
    /// everything in one pass, the Rust analogue of `deleteReference`'s
    /// recursive teardown.
    pub fn clear(&mut self) {
        self.references.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_length_array_allocates_no_reference() {
        let mut table = ReferenceTable::new();
        assert_eq!(table.new_array(PrimType::Int, 0), None);
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn nonzero_length_array_allocates() {
        let mut table = ReferenceTable::new();
        let handle = table.new_array(PrimType::Int, 4).unwrap();
        match table.get(handle) {
            Reference::Array { length, data, .. } => {
                assert_eq!(*length, 4);
                assert_eq!(data.len(), 16);
            }
            _ => panic!("expected array"),
        }
    }

    #[test]
    fn object_array_rejects_zero_length() {
        let mut table = ReferenceTable::new();
        assert_eq!(table.new_object_array(b"java/lang/Object".to_vec(), 0), None);
    }

    #[test]
    fn empty_string_is_a_valid_reference() {
        let mut table = ReferenceTable::new();
        let handle = table.new_string(Vec::new());
        match table.get(handle) {
            Reference::String { bytes } => assert!(bytes.is_empty()),
            _ => panic!("expected string"),
        }
    }
}
