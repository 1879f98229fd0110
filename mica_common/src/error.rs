//! Error handling utilities for the Mica workbench

use thiserror::Error;

/// Structural errors raised while building or mutating IR.
///
/// These are raised at construction time and are not recoverable
/// without editing the offending structure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IrError {
    #[error("malformed instruction: {reason}")]
    MalformedInstruction { reason: String },

    #[error("malformed CFG: {reason}")]
    MalformedCfg { reason: String },

    #[error("duplicate label @{label}")]
    DuplicateLabel { label: String },

    #[error("phi in @{block} is inconsistent with predecessor @{pred}")]
    MissingPredecessorInPhi { block: String, pred: String },
}

/// Errors raised while parsing textual IL.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("line {line}: {reason}")]
    Syntax { line: usize, reason: String },

    #[error("line {line}: {source}")]
    Structural { line: usize, source: IrError },
}

/// Fatal errors raised during interpretation.
///
/// All of these terminate the run; the embedder decides what to do
/// with the report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("phi in @{block} has no binding for the incoming edge")]
    UnboundPhi { block: String },

    #[error("read of undefined register %{register} at @{block}:{index}")]
    UndefinedRegister {
        register: String,
        block: String,
        index: usize,
    },

    #[error("division by zero at @{block}:{index}")]
    DivByZero { block: String, index: usize },

    #[error("negative shift amount at @{block}:{index}")]
    NegativeShift { block: String, index: usize },

    #[error("I/O failure at @{block}:{index}: {reason}")]
    Io {
        reason: String,
        block: String,
        index: usize,
    },

    #[error("control transfer to unknown label @{label}")]
    InvalidLabel { label: String },

    #[error("cancelled at @{block}:{index}")]
    Cancelled { block: String, index: usize },
}

impl RuntimeError {
    /// Whether this error reports cooperative cancellation rather than
    /// a fault in the interpreted program.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, RuntimeError::Cancelled { .. })
    }
}

/// Errors raised by the pass manager: registration, argument binding,
/// and pipeline control.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PassError {
    #[error("pass id {id:?} is already registered")]
    DuplicateId { id: String },

    #[error("unknown pass {id:?}")]
    UnknownPass { id: String },

    #[error("bad arguments for {id}: {reason}")]
    BadArguments { id: String, reason: String },

    #[error("bad argument {name}={value:?}: {reason}")]
    BadArgument {
        name: String,
        value: String,
        reason: String,
    },

    #[error("require cycle detected while running {id}")]
    RequireCycle { id: String },

    #[error("pipeline cancelled before step {index}")]
    Cancelled { index: usize },
}

/// The unified error type for workbench operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MicaError {
    #[error(transparent)]
    Ir(#[from] IrError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Pass(#[from] PassError),
}

/// Result type alias for workbench operations.
pub type MicaResult<T> = Result<T, MicaError>;

impl IrError {
    pub fn malformed_instruction(reason: impl Into<String>) -> Self {
        Self::MalformedInstruction {
            reason: reason.into(),
        }
    }

    pub fn malformed_cfg(reason: impl Into<String>) -> Self {
        Self::MalformedCfg {
            reason: reason.into(),
        }
    }
}
