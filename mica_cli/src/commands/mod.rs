//! CLI command implementations

pub mod check;
pub mod opt;
pub mod passes;
pub mod run;

use anyhow::{Context, Result};
use mica_ir::{Cfg, MetadataStore};
use std::path::Path;

/// Read and parse an IL source file.
pub fn load_program(file: &Path) -> Result<(Cfg, MetadataStore)> {
    let source = std::fs::read_to_string(file)
        .with_context(|| format!("cannot read {}", file.display()))?;
    let parsed = mica_parser::parse(&source)
        .with_context(|| format!("cannot parse {}", file.display()))?;
    Ok(parsed)
}
