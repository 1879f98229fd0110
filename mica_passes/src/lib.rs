//! Pass manager for the Mica workbench
//!
//! Passes are named, parameterized analyses and transformations over a
//! CFG and its metadata. The manager owns a registry of pass kinds,
//! memoizes instances by their fully-resolved argument tuples, tracks
//! per-instance validity, and applies each pass's preservation promise
//! to invalidate everyone else. Pipelines run invocation lists in
//! order; `require` lets one pass depend on another, running it on
//! demand.

pub mod invoke;
pub mod manager;
pub mod pass;
pub mod passes;

pub use invoke::{parse_invocation, parse_pipeline, Invocation, PassQuery};
pub use manager::{PassCtx, PassManager, Registration};
pub use pass::{InstanceKey, ParamSpec, Pass, Preserved, ResolvedArgs};
