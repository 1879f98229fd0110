//! Program statistics analysis
//!
//! Counts blocks, instructions, and phis into CFG-scope metadata under
//! `stats.blocks`, `stats.instrs`, and `stats.phis`. Pure analysis:
//! preserves everything.

use crate::manager::{PassCtx, Registration};
use crate::pass::{Pass, Preserved};
use mica_common::MicaResult;
use mica_ir::{MetadataStore, Scope};

pub const BLOCKS_KEY: &str = "stats.blocks";
pub const INSTRS_KEY: &str = "stats.instrs";
pub const PHIS_KEY: &str = "stats.phis";

pub fn registration() -> Registration {
    Registration {
        id: "stats",
        summary: "count blocks, instructions, and phis into CFG metadata",
        params: &[],
        build: |_| Ok(Box::new(Stats)),
    }
}

struct Stats;

impl Pass for Stats {
    fn id(&self) -> &'static str {
        "stats"
    }

    fn run(&mut self, ctx: &mut PassCtx<'_>) -> MicaResult<Preserved> {
        let blocks = ctx.cfg.len();
        let mut instrs = 0usize;
        let mut phis = 0usize;
        for block in ctx.cfg.blocks() {
            instrs += block.len();
            phis += block.phi_count();
        }
        ctx.meta
            .set(Scope::Cfg, BLOCKS_KEY, vec![blocks.to_string()]);
        ctx.meta
            .set(Scope::Cfg, INSTRS_KEY, vec![instrs.to_string()]);
        ctx.meta.set(Scope::Cfg, PHIS_KEY, vec![phis.to_string()]);
        ctx.debug(|| format!("{blocks} blocks, {instrs} instructions, {phis} phis"));
        Ok(Preserved::All)
    }
}

/// Typed getters over the analysis' metadata. Callers ensure validity
/// first via `PassManager::require("stats")`.
pub fn block_count(meta: &MetadataStore) -> Option<usize> {
    meta.get_first(&Scope::Cfg, BLOCKS_KEY)?.parse().ok()
}

pub fn instr_count(meta: &MetadataStore) -> Option<usize> {
    meta.get_first(&Scope::Cfg, INSTRS_KEY)?.parse().ok()
}

pub fn phi_count(meta: &MetadataStore) -> Option<usize> {
    meta.get_first(&Scope::Cfg, PHIS_KEY)?.parse().ok()
}
