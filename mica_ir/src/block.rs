//! Basic blocks
//!
//! A block is a label plus an ordered instruction list whose last
//! element, once present, is the block's sole terminator. Phis live at
//! the head of the list. Index-based edits may transiently break the
//! discipline while a pass is mid-surgery; `Cfg::validate` reasserts
//! every invariant afterwards.

use crate::instr::{Instruction, Operand};
use mica_common::IrError;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    label: String,
    instrs: Vec<Instruction>,
}

impl BasicBlock {
    pub fn new(label: impl Into<String>) -> BasicBlock {
        BasicBlock {
            label: label.into(),
            instrs: Vec::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn set_label(&mut self, label: String) {
        self.label = label;
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instrs
    }

    pub fn instructions_mut(&mut self) -> &mut [Instruction] {
        &mut self.instrs
    }

    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    /// The terminator, if the block currently ends in one.
    pub fn terminator(&self) -> Option<&Instruction> {
        self.instrs.last().filter(|instr| instr.is_terminator())
    }

    pub fn is_terminated(&self) -> bool {
        self.terminator().is_some()
    }

    /// Index of the first non-phi instruction (== number of leading
    /// phis).
    pub fn phi_count(&self) -> usize {
        self.instrs.iter().take_while(|instr| instr.is_phi()).count()
    }

    /// Leading phis, paired with their indices.
    pub fn phis(&self) -> impl Iterator<Item = (usize, &Instruction)> {
        self.instrs
            .iter()
            .enumerate()
            .take_while(|(_, instr)| instr.is_phi())
    }

    /// Everything after the leading phis, terminator included.
    pub fn non_phis(&self) -> impl Iterator<Item = (usize, &Instruction)> {
        self.instrs
            .iter()
            .enumerate()
            .skip_while(|(_, instr)| instr.is_phi())
    }

    /// Append a non-terminator instruction. Rejected once the block is
    /// terminated, and phis may not follow non-phi instructions.
    pub fn push(&mut self, instr: Instruction) -> Result<(), IrError> {
        if self.is_terminated() {
            return Err(IrError::malformed_cfg(format!(
                "append to terminated block @{}",
                self.label
            )));
        }
        if instr.is_terminator() {
            return Err(IrError::malformed_cfg(format!(
                "terminator pushed into the body of @{}; use set_terminator",
                self.label
            )));
        }
        if instr.is_phi() && self.instrs.len() > self.phi_count() {
            return Err(IrError::malformed_cfg(format!(
                "phi after non-phi instruction in @{}",
                self.label
            )));
        }
        self.instrs.push(instr);
        Ok(())
    }

    /// Install or replace the terminator.
    pub fn set_terminator(&mut self, instr: Instruction) -> Result<(), IrError> {
        if !instr.is_terminator() {
            return Err(IrError::malformed_cfg(format!(
                "{} is not a terminator",
                instr.kind()
            )));
        }
        if self.is_terminated() {
            let last = self.instrs.len() - 1;
            self.instrs[last] = instr;
        } else {
            self.instrs.push(instr);
        }
        Ok(())
    }

    /// Insert at `pos`. Terminators cannot be inserted mid-block and
    /// nothing can be placed after an existing terminator.
    pub fn insert(&mut self, pos: usize, instr: Instruction) -> Result<(), IrError> {
        if pos > self.instrs.len() {
            return Err(IrError::malformed_cfg(format!(
                "insert position {pos} out of bounds in @{}",
                self.label
            )));
        }
        if instr.is_terminator() {
            return Err(IrError::malformed_cfg(format!(
                "terminator inserted into the body of @{}; use set_terminator",
                self.label
            )));
        }
        if self.is_terminated() && pos == self.instrs.len() {
            return Err(IrError::malformed_cfg(format!(
                "insert past the terminator of @{}",
                self.label
            )));
        }
        self.instrs.insert(pos, instr);
        Ok(())
    }

    /// Replace the instruction at `pos`, returning the old one.
    /// A terminator may only stand at the end of the block.
    pub fn replace(&mut self, pos: usize, instr: Instruction) -> Result<Instruction, IrError> {
        if pos >= self.instrs.len() {
            return Err(IrError::malformed_cfg(format!(
                "replace position {pos} out of bounds in @{}",
                self.label
            )));
        }
        if instr.is_terminator() && pos != self.instrs.len() - 1 {
            return Err(IrError::malformed_cfg(format!(
                "terminator placed mid-block in @{}",
                self.label
            )));
        }
        Ok(std::mem::replace(&mut self.instrs[pos], instr))
    }

    /// Remove and return the instruction at `pos`. Removing the
    /// terminator leaves the block transiently unterminated.
    pub fn remove(&mut self, pos: usize) -> Result<Instruction, IrError> {
        if pos >= self.instrs.len() {
            return Err(IrError::malformed_cfg(format!(
                "remove position {pos} out of bounds in @{}",
                self.label
            )));
        }
        Ok(self.instrs.remove(pos))
    }

    /// Companion to predecessor insertion: extend every phi with a row
    /// `(default, pred)`. The default operand is the caller's choice.
    pub fn phi_append_pred(&mut self, pred: &str, default: Operand) {
        let count = self.phi_count();
        for instr in &mut self.instrs[..count] {
            if let Instruction::Phi { entries, .. } = instr {
                if entries.iter().all(|(_, label)| label != pred) {
                    entries.push((default.clone(), pred.to_string()));
                }
            }
        }
    }

    /// Companion to predecessor removal: drop the matching row from
    /// every phi.
    pub fn phi_remove_pred(&mut self, pred: &str) {
        let count = self.phi_count();
        for instr in &mut self.instrs[..count] {
            if let Instruction::Phi { entries, .. } = instr {
                entries.retain(|(_, label)| label != pred);
            }
        }
    }

    /// Rewrite phi rows naming `old` to name `new` instead.
    pub fn phi_retarget_pred(&mut self, old: &str, new: &str) {
        let count = self.phi_count();
        for instr in &mut self.instrs[..count] {
            instr.retarget(old, new);
        }
    }
}

// The canonical text form (with metadata) lives in mica_parser; this
// one is for logs and debugging only.
impl fmt::Display for BasicBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "@{}:", self.label)?;
        for instr in &self.instrs {
            writeln!(f, "    {instr}")?;
        }
        Ok(())
    }
}
