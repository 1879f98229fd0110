//! IL data model for the Mica workbench
//!
//! Programs are control-flow graphs of labeled basic blocks over
//! arbitrary-precision integer registers. This crate owns the data
//! model and its invariants: instructions and their builders, blocks
//! with terminator discipline, the CFG with derived edge indices, and
//! the metadata side-channel passes use to communicate.

pub mod block;
pub mod cfg;
pub mod instr;
pub mod meta;
pub mod ops;
pub mod value;

pub use block::BasicBlock;
pub use cfg::Cfg;
pub use instr::{Instruction, Operand};
pub use meta::{MetadataStore, Scope};
pub use ops::{BinOp, OpError};
pub use value::Value;
