//! `mica check`: parse and validate

use anyhow::{Context, Result};
use std::path::PathBuf;

pub fn execute(file: PathBuf) -> Result<()> {
    let (cfg, meta) = super::load_program(&file)?;
    cfg.validate()
        .with_context(|| format!("{} is structurally invalid", file.display()))?;

    let instrs: usize = cfg.blocks().map(|block| block.len()).sum();
    let metadata = meta.iter().count();
    log::info!(
        "{}: ok ({} blocks, {} instructions, {} metadata entries)",
        file.display(),
        cfg.len(),
        instrs,
        metadata
    );
    Ok(())
}
