//! Dead code elimination
//!
//! Removes instructions whose destinations are never read anywhere in
//! the CFG, iterating to a fixpoint. Only side-effect-free
//! instructions go: reads consume input, writes and breakpoints are
//! observable, and binary operations that could trap stay unless the
//! trap is impossible (constant, safe right-hand side).

use crate::manager::{PassCtx, Registration};
use crate::pass::{Pass, Preserved};
use mica_common::MicaResult;
use mica_ir::{BinOp, Instruction, Operand, Value};
use num_traits::Zero;
use std::collections::HashSet;

pub fn registration() -> Registration {
    Registration {
        id: "dce",
        summary: "remove pure instructions whose results are never used",
        params: &[],
        build: |_| Ok(Box::new(DeadCode)),
    }
}

struct DeadCode;

impl Pass for DeadCode {
    fn id(&self) -> &'static str {
        "dce"
    }

    fn run(&mut self, ctx: &mut PassCtx<'_>) -> MicaResult<Preserved> {
        let mut removed = 0usize;
        loop {
            let swept = sweep(ctx)?;
            removed += swept;
            if swept == 0 {
                break;
            }
        }
        ctx.debug(|| format!("removed {removed} dead instructions"));
        Ok(Preserved::nothing())
    }
}

fn sweep(ctx: &mut PassCtx<'_>) -> MicaResult<usize> {
    let mut used: HashSet<String> = HashSet::new();
    for block in ctx.cfg.blocks() {
        for instr in block.instructions() {
            for operand in instr.uses() {
                if let Operand::Register(name) = operand {
                    used.insert(name);
                }
            }
        }
    }

    let labels: Vec<String> = ctx.cfg.labels().map(str::to_string).collect();
    let mut removed = 0usize;
    for label in labels {
        let block = ctx.cfg.get_mut(&label)?;
        // Back to front so earlier indices stay stable.
        for pos in (0..block.len()).rev() {
            let instr = &block.instructions()[pos];
            let dead = match instr.def() {
                Some(dst) => !used.contains(dst) && removable(instr),
                None => false,
            };
            if dead {
                block.remove(pos)?;
                ctx.meta.shift_down(&label, pos);
                removed += 1;
            }
        }
    }
    Ok(removed)
}

/// Whether deleting `instr` can change observable behavior beyond its
/// (unused) destination.
fn removable(instr: &Instruction) -> bool {
    match instr {
        Instruction::Move { .. } | Instruction::Phi { .. } => true,
        Instruction::Binary { op, rhs, .. } => match op {
            BinOp::Div | BinOp::Rem => {
                matches!(rhs, Operand::Const(value) if !value.is_zero())
            }
            BinOp::Shl | BinOp::Shr => {
                matches!(rhs, Operand::Const(value) if value >= &Value::from(0u8))
            }
            _ => true,
        },
        _ => false,
    }
}
