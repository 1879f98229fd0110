//! CFG simplification
//!
//! Two cleanups: blocks unreachable from the entry are deleted (with
//! their phi rows in surviving successors), and straight-line pairs —
//! a goto into a block with no other predecessors — are merged.
//! Metadata follows the surgery: dropped blocks lose their entries,
//! merged instructions carry theirs to the new positions.

use crate::manager::{PassCtx, Registration};
use crate::pass::{Pass, Preserved};
use mica_common::MicaResult;
use mica_ir::Instruction;
use std::collections::HashSet;

pub fn registration() -> Registration {
    Registration {
        id: "simplify",
        summary: "drop unreachable blocks and merge straight-line block pairs",
        params: &[],
        build: |_| Ok(Box::new(Simplify)),
    }
}

struct Simplify;

impl Pass for Simplify {
    fn id(&self) -> &'static str {
        "simplify"
    }

    fn run(&mut self, ctx: &mut PassCtx<'_>) -> MicaResult<Preserved> {
        let dropped = drop_unreachable(ctx)?;
        let merged = merge_straight_lines(ctx)?;
        ctx.debug(|| format!("dropped {dropped} unreachable blocks, merged {merged} pairs"));
        Ok(Preserved::nothing())
    }
}

fn drop_unreachable(ctx: &mut PassCtx<'_>) -> MicaResult<usize> {
    let reachable: HashSet<String> = ctx.cfg.reverse_postorder().into_iter().collect();
    let dead: Vec<String> = ctx
        .cfg
        .labels()
        .filter(|label| !reachable.contains(*label))
        .map(str::to_string)
        .collect();
    if dead.is_empty() {
        return Ok(0);
    }

    // Surviving successors lose their phi rows for dead predecessors,
    // then every dead terminator is neutralized so the dead region has
    // no internal edges left and each block can be removed.
    for label in &dead {
        let succs: Vec<String> = ctx.cfg.successors(label).to_vec();
        for succ in succs {
            if reachable.contains(&succ) {
                ctx.cfg.get_mut(&succ)?.phi_remove_pred(label);
            }
        }
    }
    for label in &dead {
        ctx.cfg.get_mut(label)?.set_terminator(Instruction::Exit)?;
    }
    ctx.cfg.refresh_edges();
    for label in &dead {
        ctx.cfg.remove_block(label)?;
        ctx.meta.drop_block(label);
    }
    Ok(dead.len())
}

fn merge_straight_lines(ctx: &mut PassCtx<'_>) -> MicaResult<usize> {
    let mut merged = 0usize;
    loop {
        let mut candidate: Option<(String, String)> = None;
        for label in ctx.cfg.labels() {
            let succs = ctx.cfg.successors(label);
            let [succ] = succs else {
                continue;
            };
            if succ == label || succ == ctx.cfg.entry() {
                continue;
            }
            if ctx.cfg.predecessors(succ) != [label.to_string()] {
                continue;
            }
            if !matches!(
                ctx.cfg.get(label)?.terminator(),
                Some(Instruction::Goto { .. })
            ) {
                continue;
            }
            candidate = Some((label.to_string(), succ.clone()));
            break;
        }
        let Some((u, v)) = candidate else {
            return Ok(merged);
        };
        // u's goto disappears; v's instructions land right where it
        // stood.
        let offset = ctx.cfg.get(&u)?.len() - 1;
        ctx.cfg.merge_blocks(&u, &v)?;
        ctx.meta.shift_down(&u, offset);
        ctx.meta.rebase_block(&v, &u, offset);
        merged += 1;
    }
}
