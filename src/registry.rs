//! Loaded-classes registry.
//!
//! Grounded in `original_source/src/jvm.c: addClassToLoadedClasses` /
//! `isClassLoaded`, which walk a singly linked list of resident classes;
//! here that's a growing `Vec` of owning entries, looked up linearly since
//! the number of classes resident in a single run is small.
use crate::classfile::ClassFile;

/// Stable index into `ClassRegistry`'s backing vector.
pub type ClassHandle = usize;

/// One resident class: its parsed class file plus its static field slots.
///
/// Static field slots are laid out in declaration order; a `Long`/`Double`
/// field occupies two consecutive slots (high word then low word), matching
/// the operand stack's category-2 convention.
pub struct LoadedClass {
    pub class_file: ClassFile,
    pub static_fields: Vec<i32>,
    pub initialized: bool,
}

impl LoadedClass {
    fn new(class_file: ClassFile) -> Self {
        let slot_count = static_slot_count(&class_file);
        Self { class_file, static_fields: vec![0; slot_count], initialized: false }
    }
}

fn static_slot_count(class_file: &ClassFile) -> usize {
    use crate::classfile::AccessFlags;
    class_file
        .fields
        .iter()
        .filter(|f| AccessFlags::from_bits_truncate(f.access_flags).contains(AccessFlags::STATIC))
        .map(|f| {
            let descriptor = class_file.utf8_at(f.descriptor_index).unwrap_or(b"I");
            match descriptor.first() {
                Some(b'J' | b'D') => 2,
                _ => 1,
            }
        })
        .sum()
}

/// Number of dense 32-bit slots a `ClassInstance`'s `fields` vector needs,
/// counting a `long`/`double` instance field as two slots — the same
/// convention `static_slot_count` and `instance_field_slot` use.
#[must_use]
pub fn instance_slot_count(class_file: &ClassFile) -> usize {
    use crate::classfile::AccessFlags;
    class_file
        .fields
        .iter()
        .filter(|f| !AccessFlags::from_bits_truncate(f.access_flags).contains(AccessFlags::STATIC))
        .map(|f| {
            let descriptor = class_file.utf8_at(f.descriptor_index).unwrap_or(b"I");
            match descriptor.first() {
                Some(b'J' | b'D') => 2,
                _ => 1,
            }
        })
        .sum()
}

/// Returns the slot offset of a static field within its class's storage, in
/// declaration order among static fields only.
#[must_use]
pub fn static_field_slot(class_file: &ClassFile, field_index: usize) -> usize {
    use crate::classfile::AccessFlags;
    let mut slot = 0usize;
    for f in &class_file.fields[..field_index] {
        if AccessFlags::from_bits_truncate(f.access_flags).contains(AccessFlags::STATIC) {
            let descriptor = class_file.utf8_at(f.descriptor_index).unwrap_or(b"I");
            slot += match descriptor.first() {
                Some(b'J' | b'D') => 2,
                _ => 1,
            };
        }
    }
    slot
}

/// Returns the slot offset of an instance field within an object's dense
/// instance-field storage, in declaration order among instance fields only.
#[must_use]
pub fn instance_field_slot(class_file: &ClassFile, field_index: usize) -> usize {
    use crate::classfile::AccessFlags;
    let mut slot = 0usize;
    for f in &class_file.fields[..field_index] {
        if !AccessFlags::from_bits_truncate(f.access_flags).contains(AccessFlags::STATIC) {
            let descriptor = class_file.utf8_at(f.descriptor_index).unwrap_or(b"I");
            slot += match descriptor.first() {
                Some(b'J' | b'D') => 2,
                _ => 1,
            };
        }
    }
    slot
}

/// Insertion-ordered collection of resident classes.
#[derive(Default)]
pub struct ClassRegistry {
    classes: Vec<LoadedClass>,
}

impl ClassRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly loaded class file and returns its stable handle.
    pub fn add(&mut self, class_file: ClassFile) -> ClassHandle {
        self.classes.push(LoadedClass::new(class_file));
        self.classes.len() - 1
    }

    /// Finds a class already resident under the given internal name.
    #[must_use]
    pub fn find(&self, name: &[u8]) -> Option<ClassHandle> {
        self.classes
            .iter()
            .position(|c| c.class_file.this_class_name().ok() == Some(name))
    }

    #[must_use]
    pub fn get(&self, handle: ClassHandle) -> &LoadedClass {
        &self.classes[handle]
    }

    pub fn get_mut(&mut self, handle: ClassHandle) -> &mut LoadedClass {
        &mut self.classes[handle]
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::ClassFileParser;

    fn minimal_class(name: &str, super_name: &str) -> ClassFile {
        let mut b = Vec::new();
        b.extend_from_slice(&0xCAFEBABEu32.to_be_bytes());
        b.extend_from_slice(&0u16.to_be_bytes());
        b.extend_from_slice(&61u16.to_be_bytes());
        b.extend_from_slice(&5u16.to_be_bytes());
        b.push(1);
        b.extend_from_slice(&(super_name.len() as u16).to_be_bytes());
        b.extend_from_slice(super_name.as_bytes());
        b.push(7);
        b.extend_from_slice(&1u16.to_be_bytes());
        b.push(1);
        b.extend_from_slice(&(name.len() as u16).to_be_bytes());
        b.extend_from_slice(name.as_bytes());
        b.push(7);
        b.extend_from_slice(&3u16.to_be_bytes());
        b.extend_from_slice(&0x21u16.to_be_bytes());
        b.extend_from_slice(&4u16.to_be_bytes());
        b.extend_from_slice(&2u16.to_be_bytes());
        b.extend_from_slice(&0u16.to_be_bytes());
        b.extend_from_slice(&0u16.to_be_bytes());
        b.extend_from_slice(&0u16.to_be_bytes());
        b.extend_from_slice(&0u16.to_be_bytes());
        ClassFileParser::parse(&b).unwrap()
    }

    #[test]
    fn registers_and_finds_by_name() {
        let mut registry = ClassRegistry::new();
        let handle = registry.add(minimal_class("Foo", "java/lang/Object"));
        assert_eq!(registry.find(b"Foo"), Some(handle));
        assert_eq!(registry.find(b"Bar"), None);
    }

    #[test]
    fn idempotent_lookup_after_single_registration() {
        let mut registry = ClassRegistry::new();
        registry.add(minimal_class("Foo", "java/lang/Object"));
        assert_eq!(registry.len(), 1);
    }
}
