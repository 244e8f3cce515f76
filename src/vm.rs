//! Top-level VM: owns the class registry, the reference heap, the frame
//! stack, and the class-path configuration.
//!
//! Grounded in `original_source/src/jvm.c: initJVM/deinitJVM/executeJVM`.
//! Teardown order mirrors the reference: frames first, then classes (and
//! their static-field storage), then the reference table.
use crate::classfile::ClassFileParser;
use crate::error::{JvmResult, JvmStatus};
use crate::frame::Frame;
use crate::heap::ReferenceTable;
use crate::registry::{ClassHandle, ClassRegistry};
use log::info;
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct Vm {
    pub registry: ClassRegistry,
    pub heap: ReferenceTable,
    pub frames: Vec<Frame>,
    pub class_path: PathBuf,
    pub simulate_stdlib: bool,
    pub stdout: Box<dyn Write>,
}

impl Vm {
    #[must_use]
    pub fn new(class_path: PathBuf) -> Self {
        Self {
            registry: ClassRegistry::new(),
            heap: ReferenceTable::new(),
            frames: Vec::new(),
            class_path,
            simulate_stdlib: true,
            stdout: Box::new(std::io::stdout()),
        }
    }

    /// Builds the filesystem path for a class's internal name, per §6's
    /// filesystem contract.
    #[must_use]
    pub fn class_path_for(&self, internal_name: &[u8]) -> PathBuf {
        self.class_path
            .join(String::from_utf8_lossy(internal_name).into_owned())
            .with_extension("class")
    }

    /// Loads and registers the class named by the path given on the
    /// command line (with or without a trailing `.class`), without running
    /// its static initializer. Used by the `-c` / entry-class-loading path,
    /// which is allowed to inspect a class before (or without) executing
    /// it.
    pub fn load_entry_class(&mut self, path: &Path) -> JvmResult<ClassHandle> {
        let bytes = crate::classfile::read_class_file(path)?;
        let class_file = ClassFileParser::parse(&bytes)?;
        Ok(self.registry.add(class_file))
    }

    /// Runs `main([Ljava/lang/String;)V` on the given class, resolving its
    /// superclass/interfaces (and running their static initializers) first.
    /// Mirrors `executeJVM`.
    pub fn execute_main(&mut self, entry_class_name: &[u8]) -> JvmResult<()> {
        let handle = crate::resolver::resolve_class(self, entry_class_name)?
            .ok_or(JvmStatus::MainMethodNotFound)?;

        let cf = &self.registry.get(handle).class_file;
        let main = cf
            .find_method(b"main", b"([Ljava/lang/String;)V")
            .filter(|m| m.is_static())
            .ok_or(JvmStatus::MainMethodNotFound)?;
        let method_index = cf
            .methods
            .iter()
            .position(|m| std::ptr::eq(m, main))
            .expect("main method belongs to its own class");

        info!("invoking main on {}", String::from_utf8_lossy(entry_class_name));
        // `String[] args` at local slot 0; this VM never populates it from
        // the command line, so it is modeled as a null reference.
        crate::interpreter::run_method(self, handle, method_index, vec![-1])?;
        Ok(())
    }

    /// Releases every resource the VM owns: frames, classes (with their
    /// static-field storage), then the reference table. Mirrors
    /// `deinitJVM`'s drain-each-list-in-order teardown; in Rust this mostly
    /// happens for free via `Drop`, but is exposed explicitly so callers
    /// (and tests) can observe the empty state afterward.
    pub fn shutdown(&mut self) {
        self.frames.clear();
        self.registry = ClassRegistry::new();
        self.heap.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_releases_everything() {
        let mut vm = Vm::new(PathBuf::from("."));
        vm.heap.new_string(b"leftover".to_vec());
        vm.shutdown();
        assert!(vm.heap.is_empty());
        assert!(vm.registry.is_empty());
        assert!(vm.frames.is_empty());
    }
}
