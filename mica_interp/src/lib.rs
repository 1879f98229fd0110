//! Tree-walking interpreter for the Mica IL
//!
//! Executes a CFG against an input stream, producing an output stream
//! and optionally a trace. Execution is deterministic: identical
//! (CFG, input) pairs yield bit-identical output and trace. The
//! interpreter treats its CFG as read-only and owns nothing beyond
//! the register environment it builds.

pub mod machine;
pub mod stream;

pub use machine::{Halt, Interpreter, Options};
pub use stream::{
    InputError, InputSource, LineOutput, OutputSink, TokenInput, TraceSink, VecInput, VecOutput,
    VecTrace, WriteTrace,
};
