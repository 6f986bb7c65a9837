//! Error types.
//!
//! Mirrors the error-handling shape used throughout this crate: plain enums
//! with a hand-written `Display` impl, no `anyhow`/`thiserror`. Recoverable
//! conditions (a filter runtime type mismatch, a missing field, a search
//! timeout) are absorbed by the caller and never become an `Err`; only
//! structural failures (malformed filter syntax, corrupt bytecode, an
//! internal invariant violation) are surfaced as `InfidexError`.

use std::fmt;

/// A filter expression failed to parse.
///
/// Carries enough context for a caller to render a useful diagnostic without
/// re-parsing: the offending message, the original source text, an
/// approximate character offset, and (when one can be suggested) a fix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterParseError {
    pub message: String,
    pub original_expression: String,
    pub char_position: usize,
    pub suggestion: Option<String>,
}

impl fmt::Display for FilterParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "filter parse error at byte {}: {} (in `{}`)",
            self.char_position, self.message, self.original_expression
        )?;
        if let Some(s) = &self.suggestion {
            write!(f, " — did you mean: {s}")?;
        }
        Ok(())
    }
}

impl std::error::Error for FilterParseError {}

/// A type mismatch (or similar) encountered while executing compiled filter
/// bytecode against a document. Per the VM's error policy this is never
/// surfaced to a caller: the condition just evaluates to `false` and the
/// surrounding search continues. It exists as a type so the VM's internal
/// control flow stays expressed as `Result` rather than ad hoc booleans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterRuntimeError {
    TypeMismatch { op: &'static str, field: String },
    UnboundConstant(u32),
    UnknownField(String),
}

impl fmt::Display for FilterRuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterRuntimeError::TypeMismatch { op, field } => {
                write!(f, "type mismatch evaluating {op} on field `{field}`")
            }
            FilterRuntimeError::UnboundConstant(idx) => {
                write!(f, "constant pool index {idx} out of range")
            }
            FilterRuntimeError::UnknownField(name) => write!(f, "unknown field `{name}`"),
        }
    }
}

impl std::error::Error for FilterRuntimeError {}

/// Bytecode (de)serialization failed. Unlike `FilterRuntimeError`, this is
/// always a hard failure: the bytecode is rejected and no search state is
/// mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerializationError {
    BadMagic { expected: &'static str, found: String },
    Truncated { expected_at_least: usize, found: usize },
    ConstantIndexOutOfRange { index: u32, pool_len: u32 },
    FieldIndexOutOfRange { index: u32, field_count: u32 },
    TrailingBytes(usize),
    MissingHalt,
    UnknownOpcode(u8),
}

impl fmt::Display for SerializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializationError::BadMagic { expected, found } => {
                write!(f, "bad magic: expected `{expected}`, found `{found}`")
            }
            SerializationError::Truncated {
                expected_at_least,
                found,
            } => write!(
                f,
                "truncated bytecode stream: expected at least {expected_at_least} bytes, found {found}"
            ),
            SerializationError::ConstantIndexOutOfRange { index, pool_len } => write!(
                f,
                "constant pool reference {index} out of range (pool has {pool_len} entries)"
            ),
            SerializationError::FieldIndexOutOfRange { index, field_count } => write!(
                f,
                "field table reference {index} out of range (table has {field_count} entries)"
            ),
            SerializationError::TrailingBytes(n) => write!(f, "{n} unexpected trailing bytes"),
            SerializationError::MissingHalt => write!(f, "instruction stream does not end in HALT"),
            SerializationError::UnknownOpcode(b) => write!(f, "unknown opcode byte {b:#04x}"),
        }
    }
}

impl std::error::Error for SerializationError {}

/// A violated internal invariant: corrupt posting list, unreachable filter
/// AST node, an index built by something other than the one-pass builder.
/// Always fatal, always surfaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantError {
    PostingListNotSorted { term: String },
    UnknownAstNode(&'static str),
    DenseIdGap { expected: u32, found: u32 },
    EmptyConstantPool,
    Other(String),
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantError::PostingListNotSorted { term } => {
                write!(f, "posting list for term `{term}` is not sorted by internal id")
            }
            InvariantError::UnknownAstNode(kind) => write!(f, "unknown filter AST node: {kind}"),
            InvariantError::DenseIdGap { expected, found } => {
                write!(f, "internal id gap: expected {expected}, found {found}")
            }
            InvariantError::EmptyConstantPool => write!(f, "constant pool is unexpectedly empty"),
            InvariantError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for InvariantError {}

/// Top-level error surfaced across the crate's public API.
#[derive(Debug)]
pub enum InfidexError {
    FilterParse(FilterParseError),
    Serialization(SerializationError),
    Invariant(InvariantError),
}

impl fmt::Display for InfidexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfidexError::FilterParse(e) => write!(f, "{e}"),
            InfidexError::Serialization(e) => write!(f, "{e}"),
            InfidexError::Invariant(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for InfidexError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InfidexError::FilterParse(e) => Some(e),
            InfidexError::Serialization(e) => Some(e),
            InfidexError::Invariant(e) => Some(e),
        }
    }
}

impl From<FilterParseError> for InfidexError {
    fn from(e: FilterParseError) -> Self {
        InfidexError::FilterParse(e)
    }
}

impl From<SerializationError> for InfidexError {
    fn from(e: SerializationError) -> Self {
        InfidexError::Serialization(e)
    }
}

impl From<InvariantError> for InfidexError {
    fn from(e: InvariantError) -> Self {
        InfidexError::Invariant(e)
    }
}

pub type Result<T> = std::result::Result<T, InfidexError>;
