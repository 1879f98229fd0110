//! Constant folding
//!
//! Folds binary operations whose operands are both constants into
//! moves, and degrades branches with identical arms into gotos.
//! Operations that would trap (division by zero, negative shift) are
//! left in place so the runtime error survives. Folding never changes
//! instruction counts or positions, so `stats` results are preserved.

use crate::manager::{PassCtx, Registration};
use crate::pass::{ParamSpec, Pass, Preserved};
use mica_common::{MicaResult, PassError};
use mica_ir::{Instruction, Operand};

pub fn registration() -> Registration {
    Registration {
        id: "cfold",
        summary: "fold constant binary operations and branches with identical arms",
        params: &[ParamSpec {
            name: "iters",
            default: "1",
            positional: true,
        }],
        build: |args| {
            let iters = args.usize_arg("iters")?;
            if iters == 0 {
                return Err(PassError::BadArgument {
                    name: "iters".to_string(),
                    value: "0".to_string(),
                    reason: "at least one sweep is required".to_string(),
                });
            }
            Ok(Box::new(ConstFold { iters }))
        },
    }
}

struct ConstFold {
    iters: usize,
}

impl Pass for ConstFold {
    fn id(&self) -> &'static str {
        "cfold"
    }

    fn run(&mut self, ctx: &mut PassCtx<'_>) -> MicaResult<Preserved> {
        let mut folded = 0usize;
        for _ in 0..self.iters {
            let changed = sweep(ctx)?;
            folded += changed;
            if changed == 0 {
                break;
            }
        }
        ctx.debug(|| format!("folded {folded} instructions"));
        Ok(Preserved::Only(ctx.instances_of("stats")))
    }
}

fn sweep(ctx: &mut PassCtx<'_>) -> MicaResult<usize> {
    let labels: Vec<String> = ctx.cfg.labels().map(str::to_string).collect();
    let mut changed = 0usize;
    let mut edges_dirty = false;

    for label in labels {
        let block = ctx.cfg.get_mut(&label)?;
        for pos in 0..block.len() {
            let folded = match &block.instructions()[pos] {
                Instruction::Binary {
                    dst,
                    op,
                    lhs: Operand::Const(lhs),
                    rhs: Operand::Const(rhs),
                } => match op.apply(lhs, rhs) {
                    Ok(value) => Some(Instruction::Move {
                        dst: dst.clone(),
                        src: Operand::Const(value),
                    }),
                    // Trapping fold: leave it for the interpreter.
                    Err(_) => None,
                },
                _ => None,
            };
            if let Some(instr) = folded {
                // Replacement at the same position keeps any
                // instruction-scoped metadata attached.
                block.replace(pos, instr)?;
                changed += 1;
            }
        }
        if let Some(Instruction::Branch {
            if_true, if_false, ..
        }) = block.terminator()
        {
            if if_true == if_false {
                let target = if_true.clone();
                block.set_terminator(Instruction::Goto { target })?;
                changed += 1;
                edges_dirty = true;
            }
        }
    }
    if edges_dirty {
        ctx.cfg.refresh_edges();
    }
    Ok(changed)
}
