//! `mica opt`: run a pass pipeline and print the result

use anyhow::{Context, Result};
use mica_common::CancelToken;
use mica_passes::{parse_pipeline, PassManager};
use std::path::PathBuf;

pub fn execute(file: PathBuf, pipeline: String, output: Option<PathBuf>) -> Result<()> {
    let (mut cfg, mut meta) = super::load_program(&file)?;
    cfg.validate()
        .with_context(|| format!("{} is structurally invalid", file.display()))?;

    let steps = parse_pipeline(&pipeline).context("cannot parse pipeline")?;
    let mut manager = PassManager::with_default_passes();
    let keys = manager
        .run_pipeline(&steps, &mut cfg, &mut meta, &CancelToken::new())
        .context("pipeline failed")?;
    for key in &keys {
        log::debug!("ran {key}");
    }
    cfg.validate().context("pipeline left the CFG invalid")?;

    let text = mica_parser::print(&cfg, &meta);
    match output {
        Some(path) => std::fs::write(&path, text)
            .with_context(|| format!("cannot write {}", path.display()))?,
        None => print!("{text}"),
    }
    Ok(())
}
