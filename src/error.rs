//! VM-wide status/error taxonomy.
use thiserror::Error;

/// Every fallible operation in this crate returns one of these. Mirrors the
/// `JVM_STATUS_*` / `*_INDEX` taxonomy of the reference implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JvmStatus {
    #[error("unexpected end of file while reading class file")]
    UnexpectedEof,

    #[error("bad magic number, not a class file")]
    BadMagic,

    #[error("invalid name index")]
    InvalidNameIndex,

    #[error("attribute length mismatch")]
    AttributeLengthMismatch,

    #[error("invalid {0} index")]
    AttributeInvalidIndex(&'static str),

    #[error("use of reserved field access flags")]
    UseOfReservedFieldAccessFlags,

    #[error("use of reserved method access flags")]
    UseOfReservedMethodAccessFlags,

    #[error("invalid field descriptor index")]
    InvalidFieldDescriptorIndex,

    #[error("invalid method descriptor index")]
    InvalidMethodDescriptorIndex,

    #[error("unsupported constant pool tag {0}")]
    UnsupportedConstantTag(u8),

    #[error("invalid constant pool index {0}")]
    InvalidConstantPoolIndex(u16),

    #[error("class resolution failed for '{0}'")]
    ClassResolutionFailed(String),

    #[error("main method not found")]
    MainMethodNotFound,

    #[error("unknown instruction 0x{0:02x}")]
    UnknownInstruction(u8),

    #[error("no class loaded")]
    NoClassLoaded,

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("field not found: {0}")]
    FieldNotFound(String),

    #[error("operand stack underflow")]
    StackUnderflow,

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for JvmStatus {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

pub type JvmResult<T> = Result<T, JvmStatus>;
