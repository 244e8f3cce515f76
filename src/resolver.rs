//! Class, method and field resolution.
//!
//! Grounded in `original_source/src/jvm.c: resolveClass/resolveMethod/
//! resolveField`: resolving a class transitively resolves (and, for
//! classes newly loaded here, initializes) its superclass and interfaces
//! before the class itself is considered loaded, and resolving a method or
//! field descriptor resolves every embedded `L...;` class reference it
//! contains.
use crate::classfile::{Attribute, ClassFileParser, CpInfo};
use crate::error::{JvmResult, JvmStatus};
use crate::registry::ClassHandle;
use crate::vm::Vm;
use log::{debug, warn};

/// Resolves (loading if necessary) the class named `name`, recursively
/// resolving its superclass and interfaces first, then registers it and
/// runs its `<clinit>` if present.
///
/// `java/lang/String` short-circuits to success without loading a file when
/// `Vm::simulate_stdlib` is set, since this VM only simulates a handful of
/// `java/lang/String`/`java/lang/System` behaviors rather than loading the
/// real standard library class files.
pub fn resolve_class(vm: &mut Vm, name: &[u8]) -> JvmResult<Option<ClassHandle>> {
    if vm.simulate_stdlib && name == b"java/lang/String" {
        return Ok(None);
    }

    if let Some(stripped) = name.strip_prefix(b"[") {
        return resolve_array_element(vm, stripped);
    }

    if let Some(handle) = vm.registry.find(name) {
        return Ok(Some(handle));
    }

    debug!("resolving class {}", String::from_utf8_lossy(name));

    let path = vm.class_path_for(name);
    let bytes = crate::classfile::read_class_file(&path).map_err(|_| {
        warn!("failed to open class file for {}", String::from_utf8_lossy(name));
        JvmStatus::ClassResolutionFailed(String::from_utf8_lossy(name).into_owned())
    })?;
    let class_file = ClassFileParser::parse(&bytes)
        .map_err(|_| JvmStatus::ClassResolutionFailed(String::from_utf8_lossy(name).into_owned()))?;

    if let Some(super_name) = class_file
        .super_class_name()
        .map_err(|_| JvmStatus::ClassResolutionFailed(String::from_utf8_lossy(name).into_owned()))?
    {
        resolve_class(vm, super_name)?;
    }

    for i in 0..class_file.interfaces.len() {
        let iface_name = class_file
            .interface_name(i)
            .map_err(|_| JvmStatus::ClassResolutionFailed(String::from_utf8_lossy(name).into_owned()))?
            .to_vec();
        resolve_class(vm, &iface_name)?;
    }

    let handle = vm.registry.add(class_file);

    run_static_initializer(vm, handle)?;

    Ok(Some(handle))
}

fn resolve_array_element(vm: &mut Vm, element: &[u8]) -> JvmResult<Option<ClassHandle>> {
    if let Some(stripped) = element.strip_prefix(b"[") {
        return resolve_array_element(vm, stripped);
    }
    if let Some(class_name) = element.strip_prefix(b"L").and_then(|s| s.strip_suffix(b";")) {
        return resolve_class(vm, class_name);
    }
    // primitive element type: no class to load.
    Ok(None)
}

fn run_static_initializer(vm: &mut Vm, handle: ClassHandle) -> JvmResult<()> {
    if vm.registry.get(handle).initialized {
        return Ok(());
    }
    vm.registry.get_mut(handle).initialized = true;

    let class_file = &vm.registry.get(handle).class_file;
    let clinit = class_file
        .find_method(b"<clinit>", b"()V")
        .map(|m| method_index(class_file, m));

    if let Some(method_index) = clinit {
        crate::interpreter::run_method(vm, handle, method_index, Vec::new())?;
    }

    Ok(())
}

fn method_index(class_file: &crate::classfile::ClassFile, method: &crate::classfile::MethodInfo) -> usize {
    class_file
        .methods
        .iter()
        .position(|m| std::ptr::eq(m, method))
        .expect("method must belong to its own class file")
}

/// Resolves a `Methodref`/`InterfaceMethodRef` constant pool entry to the
/// declaring class handle, method index, and raw name/descriptor bytes.
pub fn resolve_method(
    vm: &mut Vm,
    class: ClassHandle,
    constant_pool_index: u16,
) -> JvmResult<(ClassHandle, usize)> {
    let (class_index, name_and_type_index) = {
        let cf = &vm.registry.get(class).class_file;
        match cf.constant_pool.get(constant_pool_index as usize) {
            Some(CpInfo::MethodRef { class_index, name_and_type_index }) => {
                (*class_index, *name_and_type_index)
            }
            Some(CpInfo::InterfaceMethodRef { class_index, name_and_type_index }) => {
                (*class_index, *name_and_type_index)
            }
            _ => return Err(JvmStatus::InvalidConstantPoolIndex(constant_pool_index)),
        }
    };

    let (owner_name, name, descriptor) =
        name_and_type_of(vm, class, class_index, name_and_type_index)?;

    resolve_descriptor_classes(vm, &descriptor)?;

    let owner = resolve_class(vm, &owner_name)?
        .ok_or_else(|| JvmStatus::MethodNotFound(String::from_utf8_lossy(&name).into_owned()))?;

    let cf = &vm.registry.get(owner).class_file;
    let method = cf
        .find_method(&name, &descriptor)
        .ok_or_else(|| JvmStatus::MethodNotFound(String::from_utf8_lossy(&name).into_owned()))?;
    let index = method_index(cf, method);

    Ok((owner, index))
}

/// Resolves a `Fieldref` constant pool entry to the declaring class handle
/// and the field's index within that class's `fields` vector.
pub fn resolve_field(
    vm: &mut Vm,
    class: ClassHandle,
    constant_pool_index: u16,
) -> JvmResult<(ClassHandle, usize)> {
    let (class_index, name_and_type_index) = {
        let cf = &vm.registry.get(class).class_file;
        match cf.constant_pool.get(constant_pool_index as usize) {
            Some(CpInfo::FieldRef { class_index, name_and_type_index }) => {
                (*class_index, *name_and_type_index)
            }
            _ => return Err(JvmStatus::InvalidConstantPoolIndex(constant_pool_index)),
        }
    };

    let (owner_name, name, descriptor) =
        name_and_type_of(vm, class, class_index, name_and_type_index)?;

    resolve_descriptor_classes(vm, &descriptor)?;

    let owner = resolve_class(vm, &owner_name)?
        .ok_or_else(|| JvmStatus::FieldNotFound(String::from_utf8_lossy(&name).into_owned()))?;

    let cf = &vm.registry.get(owner).class_file;
    let (index, _) = cf
        .find_field(&name)
        .ok_or_else(|| JvmStatus::FieldNotFound(String::from_utf8_lossy(&name).into_owned()))?;

    Ok((owner, index))
}

fn name_and_type_of(
    vm: &Vm,
    class: ClassHandle,
    class_index: u16,
    name_and_type_index: u16,
) -> JvmResult<(Vec<u8>, Vec<u8>, Vec<u8>)> {
    let cf = &vm.registry.get(class).class_file;
    let owner_class_name_index = match cf.constant_pool.get(class_index as usize) {
        Some(CpInfo::Class { name_index }) => *name_index,
        _ => return Err(JvmStatus::InvalidConstantPoolIndex(class_index)),
    };
    let owner_name = cf.utf8_at(owner_class_name_index)?.to_vec();

    let (name_index, descriptor_index) = match cf.constant_pool.get(name_and_type_index as usize) {
        Some(CpInfo::NameAndType { name_index, descriptor_index }) => {
            (*name_index, *descriptor_index)
        }
        _ => return Err(JvmStatus::InvalidConstantPoolIndex(name_and_type_index)),
    };
    let name = cf.utf8_at(name_index)?.to_vec();
    let descriptor = cf.utf8_at(descriptor_index)?.to_vec();

    Ok((owner_name, name, descriptor))
}

/// Walks a field or method descriptor, resolving every embedded `L...;`
/// class reference it names.
fn resolve_descriptor_classes(vm: &mut Vm, descriptor: &[u8]) -> JvmResult<()> {
    let mut i = 0;
    while i < descriptor.len() {
        match descriptor[i] {
            b'L' => {
                let start = i + 1;
                let mut end = start;
                while end < descriptor.len() && descriptor[end] != b';' {
                    end += 1;
                }
                let class_name = descriptor[start..end].to_vec();
                resolve_class(vm, &class_name)?;
                i = end + 1;
            }
            _ => i += 1,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::Vm;

    #[test]
    fn resolving_java_lang_string_short_circuits() {
        let mut vm = Vm::new(std::path::PathBuf::from("."));
        let result = resolve_class(&mut vm, b"java/lang/String");
        assert_eq!(result, Ok(None));
        assert_eq!(vm.registry.len(), 0);
    }

    #[test]
    fn missing_class_file_fails_resolution() {
        let mut vm = Vm::new(std::path::PathBuf::from("/nonexistent/path"));
        let result = resolve_class(&mut vm, b"TotallyMissing");
        assert!(matches!(result, Err(JvmStatus::ClassResolutionFailed(_))));
    }
}
