//! Instruction model
//!
//! Tagged variants for every IL instruction, with builders that
//! enforce the operand-kind constraints at construction. Structural
//! equality is the derived one; no source positions are stored.

use crate::ops::BinOp;
use crate::value::{is_valid_name, Value};
use mica_common::IrError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An instruction operand.
///
/// Labels only appear inside terminators and phi rows; value positions
/// accept constants and registers. Names are stored without their
/// surface sigils (`%`, `@`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    Const(Value),
    Register(String),
    Label(String),
}

impl Operand {
    pub fn register(name: impl Into<String>) -> Operand {
        Operand::Register(name.into())
    }

    pub fn constant(value: impl Into<Value>) -> Operand {
        Operand::Const(value.into())
    }

    pub fn as_register(&self) -> Option<&str> {
        match self {
            Operand::Register(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_const(&self) -> Option<&Value> {
        match self {
            Operand::Const(value) => Some(value),
            _ => None,
        }
    }

    /// Whether this operand denotes a runtime value (constant or
    /// register, not a label).
    pub fn is_value(&self) -> bool {
        !matches!(self, Operand::Label(_))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Const(value) => write!(f, "{value}"),
            Operand::Register(name) => write!(f, "%{name}"),
            Operand::Label(name) => write!(f, "@{name}"),
        }
    }
}

/// An IL instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// `dst ← src`
    Move { dst: String, src: Operand },
    /// `dst ← φ[(value, label), …]`, one row per predecessor.
    Phi {
        dst: String,
        entries: Vec<(Operand, String)>,
    },
    /// `dst ← lhs ⊕ rhs`
    Binary {
        dst: String,
        op: BinOp,
        lhs: Operand,
        rhs: Operand,
    },
    /// Unconditional transfer.
    Goto { target: String },
    /// Two-way transfer: zero takes `if_false`, anything else `if_true`.
    Branch {
        cond: String,
        if_true: String,
        if_false: String,
    },
    /// Halt with success.
    Exit,
    /// Consume the next input integer into `dst`.
    Read { dst: String },
    /// Emit a value to the output stream.
    Write { src: Operand },
    /// Named breakpoint; a no-op for program state.
    Brkpt { name: String },
}

fn check_register(name: &str) -> Result<(), IrError> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(IrError::malformed_instruction(format!(
            "invalid register name {name:?}"
        )))
    }
}

fn check_label(name: &str) -> Result<(), IrError> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(IrError::malformed_instruction(format!(
            "invalid label name {name:?}"
        )))
    }
}

fn check_value_operand(operand: &Operand) -> Result<(), IrError> {
    match operand {
        Operand::Const(_) => Ok(()),
        Operand::Register(name) => check_register(name),
        Operand::Label(label) => Err(IrError::malformed_instruction(format!(
            "label @{label} used where a value operand is required"
        ))),
    }
}

impl Instruction {
    pub fn mov(dst: impl Into<String>, src: Operand) -> Result<Instruction, IrError> {
        let dst = dst.into();
        check_register(&dst)?;
        check_value_operand(&src)?;
        Ok(Instruction::Move { dst, src })
    }

    /// Build a phi. Requires at least one row and pairwise-distinct
    /// labels; whether the labels match the block's predecessors is a
    /// CFG-level invariant checked by `Cfg::validate`.
    pub fn phi(
        dst: impl Into<String>,
        entries: Vec<(Operand, String)>,
    ) -> Result<Instruction, IrError> {
        let dst = dst.into();
        check_register(&dst)?;
        if entries.is_empty() {
            return Err(IrError::malformed_instruction(format!(
                "phi for %{dst} has no rows"
            )));
        }
        for (value, label) in &entries {
            check_value_operand(value)?;
            check_label(label)?;
        }
        for (i, (_, label)) in entries.iter().enumerate() {
            if entries[..i].iter().any(|(_, other)| other == label) {
                return Err(IrError::malformed_instruction(format!(
                    "phi for %{dst} lists @{label} twice"
                )));
            }
        }
        Ok(Instruction::Phi { dst, entries })
    }

    pub fn binary(
        dst: impl Into<String>,
        op: BinOp,
        lhs: Operand,
        rhs: Operand,
    ) -> Result<Instruction, IrError> {
        let dst = dst.into();
        check_register(&dst)?;
        check_value_operand(&lhs)?;
        check_value_operand(&rhs)?;
        Ok(Instruction::Binary { dst, op, lhs, rhs })
    }

    pub fn goto(target: impl Into<String>) -> Result<Instruction, IrError> {
        let target = target.into();
        check_label(&target)?;
        Ok(Instruction::Goto { target })
    }

    /// Build a branch. Identical true/false targets are permitted; the
    /// interpreter degenerates to an unconditional transfer.
    pub fn branch(
        cond: impl Into<String>,
        if_true: impl Into<String>,
        if_false: impl Into<String>,
    ) -> Result<Instruction, IrError> {
        let cond = cond.into();
        let if_true = if_true.into();
        let if_false = if_false.into();
        check_register(&cond)?;
        check_label(&if_true)?;
        check_label(&if_false)?;
        Ok(Instruction::Branch {
            cond,
            if_true,
            if_false,
        })
    }

    pub fn exit() -> Instruction {
        Instruction::Exit
    }

    pub fn read(dst: impl Into<String>) -> Result<Instruction, IrError> {
        let dst = dst.into();
        check_register(&dst)?;
        Ok(Instruction::Read { dst })
    }

    pub fn write(src: Operand) -> Result<Instruction, IrError> {
        check_value_operand(&src)?;
        Ok(Instruction::Write { src })
    }

    pub fn brkpt(name: impl Into<String>) -> Result<Instruction, IrError> {
        let name = name.into();
        check_label(&name)?;
        Ok(Instruction::Brkpt { name })
    }

    /// The register this instruction defines, if any.
    pub fn def(&self) -> Option<&str> {
        match self {
            Instruction::Move { dst, .. }
            | Instruction::Phi { dst, .. }
            | Instruction::Binary { dst, .. }
            | Instruction::Read { dst } => Some(dst),
            _ => None,
        }
    }

    /// Value operands this instruction reads, in syntactic order.
    /// Branch conditions are reported as register operands.
    pub fn uses(&self) -> Vec<Operand> {
        match self {
            Instruction::Move { src, .. } => vec![src.clone()],
            Instruction::Phi { entries, .. } => {
                entries.iter().map(|(value, _)| value.clone()).collect()
            }
            Instruction::Binary { lhs, rhs, .. } => vec![lhs.clone(), rhs.clone()],
            Instruction::Branch { cond, .. } => vec![Operand::Register(cond.clone())],
            Instruction::Write { src } => vec![src.clone()],
            Instruction::Goto { .. }
            | Instruction::Exit
            | Instruction::Read { .. }
            | Instruction::Brkpt { .. } => Vec::new(),
        }
    }

    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Instruction::Goto { .. } | Instruction::Branch { .. } | Instruction::Exit
        )
    }

    pub fn is_phi(&self) -> bool {
        matches!(self, Instruction::Phi { .. })
    }

    /// Successor labels named by this instruction, in syntactic order.
    /// Empty for non-terminators and `Exit`.
    pub fn branch_targets(&self) -> Vec<&str> {
        match self {
            Instruction::Goto { target } => vec![target],
            Instruction::Branch {
                if_true, if_false, ..
            } => vec![if_true, if_false],
            _ => Vec::new(),
        }
    }

    /// Rewrite every use of register `old` to `new`. Definitions are
    /// left alone.
    pub fn replace_uses(&mut self, old: &str, new: &str) {
        let rewrite = |operand: &mut Operand| {
            if let Operand::Register(name) = operand {
                if name == old {
                    *name = new.to_string();
                }
            }
        };
        match self {
            Instruction::Move { src, .. } | Instruction::Write { src } => rewrite(src),
            Instruction::Phi { entries, .. } => {
                for (value, _) in entries {
                    rewrite(value);
                }
            }
            Instruction::Binary { lhs, rhs, .. } => {
                rewrite(lhs);
                rewrite(rhs);
            }
            Instruction::Branch { cond, .. } => {
                if cond == old {
                    *cond = new.to_string();
                }
            }
            Instruction::Goto { .. }
            | Instruction::Exit
            | Instruction::Read { .. }
            | Instruction::Brkpt { .. } => {}
        }
    }

    /// Rewrite every label reference `old` to `new` (terminator
    /// targets and phi rows).
    pub fn retarget(&mut self, old: &str, new: &str) {
        match self {
            Instruction::Goto { target } => {
                if target == old {
                    *target = new.to_string();
                }
            }
            Instruction::Branch {
                if_true, if_false, ..
            } => {
                if if_true == old {
                    *if_true = new.to_string();
                }
                if if_false == old {
                    *if_false = new.to_string();
                }
            }
            Instruction::Phi { entries, .. } => {
                for (_, label) in entries {
                    if label == old {
                        *label = new.to_string();
                    }
                }
            }
            _ => {}
        }
    }

    /// Short mnemonic for trace records and debug output.
    pub fn kind(&self) -> &'static str {
        match self {
            Instruction::Move { .. } => "move",
            Instruction::Phi { .. } => "phi",
            Instruction::Binary { .. } => "binary",
            Instruction::Goto { .. } => "goto",
            Instruction::Branch { .. } => "branch",
            Instruction::Exit => "exit",
            Instruction::Read { .. } => "read",
            Instruction::Write { .. } => "write",
            Instruction::Brkpt { .. } => "brkpt",
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Move { dst, src } => write!(f, "%{dst} = {src}"),
            Instruction::Phi { dst, entries } => {
                write!(f, "%{dst} = phi ")?;
                for (i, (value, label)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "[{value}, @{label}]")?;
                }
                Ok(())
            }
            Instruction::Binary { dst, op, lhs, rhs } => {
                write!(f, "%{dst} = {lhs} {op} {rhs}")
            }
            Instruction::Goto { target } => write!(f, "goto @{target}"),
            Instruction::Branch {
                cond,
                if_true,
                if_false,
            } => write!(f, "branch %{cond} ? @{if_true} : @{if_false}"),
            Instruction::Exit => write!(f, "exit"),
            Instruction::Read { dst } => write!(f, "read %{dst}"),
            Instruction::Write { src } => write!(f, "write {src}"),
            Instruction::Brkpt { name } => write!(f, "brkpt !{name}"),
        }
    }
}
