//! The pass abstraction
//!
//! A pass kind declares its parameters as data; an instance is a kind
//! resolved with a concrete argument tuple. Instances are identified
//! by `(id, args)` and memoized by the manager.

use mica_common::{MicaResult, PassError};
use std::fmt;

/// A formal parameter of a pass: name, default (all argument values
/// are strings), and whether it binds positionally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub default: &'static str,
    pub positional: bool,
}

/// Identity of a pass instance: the id plus the fully-resolved
/// argument tuple, in formal order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceKey {
    pub id: String,
    pub args: Vec<String>,
}

impl InstanceKey {
    pub fn new(id: impl Into<String>, args: Vec<String>) -> InstanceKey {
        InstanceKey {
            id: id.into(),
            args,
        }
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            return f.write_str(&self.id);
        }
        write!(f, "{}({})", self.id, self.args.join(", "))
    }
}

/// What a pass promises after running: either every known instance
/// still holds, or only the listed ones do. Transformations must list
/// explicitly; the manager infers nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preserved {
    All,
    Only(Vec<InstanceKey>),
}

impl Preserved {
    /// The empty promise: everything else becomes invalid.
    pub fn nothing() -> Preserved {
        Preserved::Only(Vec::new())
    }
}

/// Arguments after defaults are substituted, in formal order.
#[derive(Debug, Clone)]
pub struct ResolvedArgs {
    pairs: Vec<(&'static str, String)>,
}

impl ResolvedArgs {
    pub fn new(pairs: Vec<(&'static str, String)>) -> ResolvedArgs {
        ResolvedArgs { pairs }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(formal, _)| *formal == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn values(&self) -> Vec<String> {
        self.pairs.iter().map(|(_, value)| value.clone()).collect()
    }

    /// Parse a non-negative integer argument, reporting a value error
    /// with the argument name on failure.
    pub fn usize_arg(&self, name: &str) -> Result<usize, PassError> {
        let value = self.get(name).unwrap_or_default();
        value.parse().map_err(|_| PassError::BadArgument {
            name: name.to_string(),
            value: value.to_string(),
            reason: "expected a non-negative integer".to_string(),
        })
    }
}

/// An analysis or transformation over a CFG and its metadata.
pub trait Pass {
    fn id(&self) -> &'static str;

    /// Do the work. Analyses record results in metadata and return
    /// `Preserved::All`; transformations mutate the CFG and list what
    /// they kept intact.
    fn run(&mut self, ctx: &mut crate::manager::PassCtx<'_>) -> MicaResult<Preserved>;
}
