//! The interpreter proper
//!
//! A program counter is a (block label, index) pair. Entering a block
//! evaluates all of its phis against a snapshot of the environment
//! taken at the transition, then commits them together; listing order
//! is immaterial. A branch takes the false edge exactly when the
//! condition register holds zero.

use crate::stream::{InputSource, OutputSink, TraceSink};
use mica_common::{CancelToken, RuntimeError};
use mica_ir::{Cfg, Instruction, Operand, Value};
use std::collections::HashMap;

/// Execution switches. Both default off.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    /// Emit a trace record per executed instruction.
    pub trace: bool,
    /// Honor `brkpt` instructions by suspending; off makes them no-ops.
    pub breakpoints: bool,
}

/// Why `run` returned without an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Halt {
    /// The program executed `exit`.
    Exited,
    /// A breakpoint suspended execution; call `run` again to resume.
    Breakpoint {
        name: String,
        block: String,
        index: usize,
    },
}

pub struct Interpreter<'a> {
    cfg: &'a Cfg,
    options: Options,
    cancel: CancelToken,
    env: HashMap<String, Value>,
    block: String,
    index: usize,
    prev: Option<String>,
    entered: bool,
    finished: bool,
}

fn record(trace: &mut Option<&mut dyn TraceSink>, block: &str, index: usize, kind: &str) {
    if let Some(sink) = trace {
        sink.record(block, index, kind);
    }
}

impl<'a> Interpreter<'a> {
    pub fn new(cfg: &'a Cfg, options: Options, cancel: CancelToken) -> Interpreter<'a> {
        Interpreter {
            cfg,
            options,
            cancel,
            env: HashMap::new(),
            block: cfg.entry().to_string(),
            index: 0,
            prev: None,
            entered: false,
            finished: false,
        }
    }

    /// Current program counter.
    pub fn pc(&self) -> (&str, usize) {
        (&self.block, self.index)
    }

    /// Read a register of the suspended (or finished) machine.
    pub fn register(&self, name: &str) -> Option<&Value> {
        self.env.get(name)
    }

    /// The whole register environment, for snapshot inspection.
    pub fn env(&self) -> &HashMap<String, Value> {
        &self.env
    }

    /// Execute until exit, breakpoint, or error. Calling again after a
    /// breakpoint resumes; after exit it reports `Exited` again.
    pub fn run(
        &mut self,
        input: &mut dyn InputSource,
        output: &mut dyn OutputSink,
        mut trace: Option<&mut dyn TraceSink>,
    ) -> Result<Halt, RuntimeError> {
        if !self.options.trace {
            trace = None;
        }
        if self.finished {
            return Ok(Halt::Exited);
        }
        if !self.entered {
            self.entered = true;
            self.enter(self.cfg.entry().to_string(), None, &mut trace)?;
        }

        let cfg = self.cfg;
        loop {
            let Some(block) = cfg.block(&self.block) else {
                return Err(RuntimeError::InvalidLabel {
                    label: self.block.clone(),
                });
            };
            let Some(instr) = block.instructions().get(self.index) else {
                // Unterminated blocks cannot survive validation; a pc
                // past the end means the CFG was never validated.
                return Err(RuntimeError::InvalidLabel {
                    label: self.block.clone(),
                });
            };
            record(&mut trace, &self.block, self.index, instr.kind());

            match instr {
                Instruction::Move { dst, src } => {
                    let value = self.eval(src)?;
                    self.env.insert(dst.clone(), value);
                    self.index += 1;
                }
                Instruction::Binary { dst, op, lhs, rhs } => {
                    let lhs = self.eval(lhs)?;
                    let rhs = self.eval(rhs)?;
                    let value = op.apply(&lhs, &rhs).map_err(|e| match e {
                        mica_ir::OpError::DivByZero => RuntimeError::DivByZero {
                            block: self.block.clone(),
                            index: self.index,
                        },
                        mica_ir::OpError::NegativeShift => RuntimeError::NegativeShift {
                            block: self.block.clone(),
                            index: self.index,
                        },
                    })?;
                    self.env.insert(dst.clone(), value);
                    self.index += 1;
                }
                Instruction::Phi { .. } => {
                    // Phis are consumed on block entry; reaching one
                    // here means it does not lead its block.
                    return Err(RuntimeError::UnboundPhi {
                        block: self.block.clone(),
                    });
                }
                Instruction::Read { dst } => {
                    let value = input.next_value().map_err(|e| RuntimeError::Io {
                        reason: e.reason(),
                        block: self.block.clone(),
                        index: self.index,
                    })?;
                    self.env.insert(dst.clone(), value);
                    self.index += 1;
                }
                Instruction::Write { src } => {
                    let value = self.eval(src)?;
                    output.emit(&value).map_err(|reason| RuntimeError::Io {
                        reason,
                        block: self.block.clone(),
                        index: self.index,
                    })?;
                    self.index += 1;
                }
                Instruction::Brkpt { name } => {
                    let at = self.index;
                    self.index += 1;
                    log::debug!("breakpoint !{name} at @{}:{at}", self.block);
                    if self.options.breakpoints {
                        return Ok(Halt::Breakpoint {
                            name: name.clone(),
                            block: self.block.clone(),
                            index: at,
                        });
                    }
                }
                Instruction::Goto { target } => {
                    let target = target.clone();
                    let from = self.block.clone();
                    self.enter(target, Some(from), &mut trace)?;
                }
                Instruction::Branch {
                    cond,
                    if_true,
                    if_false,
                } => {
                    let value = self.eval(&Operand::Register(cond.clone()))?;
                    let target = if value == Value::from(0u8) {
                        if_false.clone()
                    } else {
                        if_true.clone()
                    };
                    let from = self.block.clone();
                    self.enter(target, Some(from), &mut trace)?;
                }
                Instruction::Exit => {
                    self.finished = true;
                    return Ok(Halt::Exited);
                }
            }
        }
    }

    /// Transition into `target`, evaluating its phis in parallel.
    fn enter(
        &mut self,
        target: String,
        from: Option<String>,
        trace: &mut Option<&mut dyn TraceSink>,
    ) -> Result<(), RuntimeError> {
        if self.cancel.is_cancelled() {
            return Err(RuntimeError::Cancelled {
                block: self.block.clone(),
                index: self.index,
            });
        }
        let Some(block) = self.cfg.block(&target) else {
            return Err(RuntimeError::InvalidLabel { label: target });
        };

        // All right-hand sides read the pre-transition environment;
        // destinations commit together afterwards.
        let mut commits: Vec<(String, Value)> = Vec::new();
        for (index, phi) in block.phis() {
            let Instruction::Phi { dst, entries } = phi else {
                continue;
            };
            let Some(from) = &from else {
                return Err(RuntimeError::UnboundPhi { block: target });
            };
            let Some((operand, _)) = entries.iter().find(|(_, label)| label == from) else {
                return Err(RuntimeError::UnboundPhi { block: target });
            };
            record(trace, &target, index, "phi");
            let value = match operand {
                Operand::Const(value) => value.clone(),
                Operand::Register(name) => {
                    self.env
                        .get(name)
                        .cloned()
                        .ok_or_else(|| RuntimeError::UndefinedRegister {
                            register: name.clone(),
                            block: target.clone(),
                            index,
                        })?
                }
                Operand::Label(label) => {
                    return Err(RuntimeError::InvalidLabel {
                        label: label.clone(),
                    });
                }
            };
            commits.push((dst.clone(), value));
        }
        let skip = block.phi_count();
        for (dst, value) in commits {
            self.env.insert(dst, value);
        }

        self.prev = from;
        self.block = target;
        self.index = skip;
        Ok(())
    }

    fn eval(&self, operand: &Operand) -> Result<Value, RuntimeError> {
        match operand {
            Operand::Const(value) => Ok(value.clone()),
            Operand::Register(name) => {
                self.env
                    .get(name)
                    .cloned()
                    .ok_or_else(|| RuntimeError::UndefinedRegister {
                        register: name.clone(),
                        block: self.block.clone(),
                        index: self.index,
                    })
            }
            Operand::Label(label) => Err(RuntimeError::InvalidLabel {
                label: label.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{VecInput, VecOutput, VecTrace};
    use mica_ir::{BinOp, Cfg};
    use pretty_assertions::assert_eq;

    fn run_once(cfg: &Cfg, input: &[i64]) -> Result<Vec<i64>, RuntimeError> {
        let mut interp = Interpreter::new(cfg, Options::default(), CancelToken::new());
        let mut input = VecInput::of(input);
        let mut output = VecOutput::new();
        interp.run(&mut input, &mut output, None)?;
        Ok(output.as_i64s())
    }

    fn echo_cfg() -> Cfg {
        let mut cfg = Cfg::new("entry").unwrap();
        let entry = cfg.block_mut("entry").unwrap();
        entry.push(Instruction::read("x").unwrap()).unwrap();
        entry
            .push(Instruction::write(Operand::register("x")).unwrap())
            .unwrap();
        entry.set_terminator(Instruction::exit()).unwrap();
        cfg.refresh_edges();
        cfg.validate().unwrap();
        cfg
    }

    #[test]
    fn test_echo() {
        assert_eq!(run_once(&echo_cfg(), &[42]), Ok(vec![42]));
    }

    #[test]
    fn test_eof_is_io_error() {
        let err = run_once(&echo_cfg(), &[]).unwrap_err();
        assert!(matches!(err, RuntimeError::Io { .. }));
    }

    #[test]
    fn test_undefined_register() {
        let mut cfg = Cfg::new("entry").unwrap();
        let entry = cfg.block_mut("entry").unwrap();
        entry
            .push(Instruction::write(Operand::register("ghost")).unwrap())
            .unwrap();
        entry.set_terminator(Instruction::exit()).unwrap();
        cfg.refresh_edges();
        let err = run_once(&cfg, &[]).unwrap_err();
        assert_eq!(
            err,
            RuntimeError::UndefinedRegister {
                register: "ghost".to_string(),
                block: "entry".to_string(),
                index: 0,
            }
        );
    }

    #[test]
    fn test_div_by_zero_reports_pc() {
        let mut cfg = Cfg::new("entry").unwrap();
        let entry = cfg.block_mut("entry").unwrap();
        entry
            .push(
                Instruction::binary(
                    "q",
                    BinOp::Div,
                    Operand::constant(1),
                    Operand::constant(0),
                )
                .unwrap(),
            )
            .unwrap();
        entry.set_terminator(Instruction::exit()).unwrap();
        cfg.refresh_edges();
        let err = run_once(&cfg, &[]).unwrap_err();
        assert_eq!(
            err,
            RuntimeError::DivByZero {
                block: "entry".to_string(),
                index: 0,
            }
        );
    }

    #[test]
    fn test_branch_on_any_nonzero_is_true() {
        // read %c; branch %c ? @t : @f
        let mut cfg = Cfg::new("entry").unwrap();
        {
            let entry = cfg.block_mut("entry").unwrap();
            entry.push(Instruction::read("c").unwrap()).unwrap();
            entry
                .set_terminator(Instruction::branch("c", "t", "f").unwrap())
                .unwrap();
        }
        {
            let t = cfg.add_block("t").unwrap();
            t.push(Instruction::write(Operand::constant(1)).unwrap())
                .unwrap();
            t.set_terminator(Instruction::exit()).unwrap();
        }
        {
            let f = cfg.add_block("f").unwrap();
            f.push(Instruction::write(Operand::constant(0)).unwrap())
                .unwrap();
            f.set_terminator(Instruction::exit()).unwrap();
        }
        cfg.refresh_edges();
        cfg.validate().unwrap();

        assert_eq!(run_once(&cfg, &[0]), Ok(vec![0]));
        assert_eq!(run_once(&cfg, &[1]), Ok(vec![1]));
        assert_eq!(run_once(&cfg, &[-7]), Ok(vec![1]));
        assert_eq!(run_once(&cfg, &[1000000]), Ok(vec![1]));
    }

    #[test]
    fn test_breakpoint_suspends_and_resumes() {
        let mut cfg = Cfg::new("entry").unwrap();
        {
            let entry = cfg.block_mut("entry").unwrap();
            entry
                .push(Instruction::mov("x", Operand::constant(5)).unwrap())
                .unwrap();
            entry.push(Instruction::brkpt("here").unwrap()).unwrap();
            entry
                .push(Instruction::write(Operand::register("x")).unwrap())
                .unwrap();
            entry.set_terminator(Instruction::exit()).unwrap();
        }
        cfg.refresh_edges();
        cfg.validate().unwrap();

        let options = Options {
            breakpoints: true,
            ..Options::default()
        };
        let mut interp = Interpreter::new(&cfg, options, CancelToken::new());
        let mut input = VecInput::of(&[]);
        let mut output = VecOutput::new();

        let halt = interp.run(&mut input, &mut output, None).unwrap();
        assert_eq!(
            halt,
            Halt::Breakpoint {
                name: "here".to_string(),
                block: "entry".to_string(),
                index: 1,
            }
        );
        // The embedder can inspect the environment mid-flight.
        assert_eq!(interp.register("x"), Some(&Value::from(5)));
        assert!(output.values.is_empty());

        let halt = interp.run(&mut input, &mut output, None).unwrap();
        assert_eq!(halt, Halt::Exited);
        assert_eq!(output.as_i64s(), vec![5]);
    }

    #[test]
    fn test_breakpoints_disabled_are_noops() {
        let mut cfg = Cfg::new("entry").unwrap();
        {
            let entry = cfg.block_mut("entry").unwrap();
            entry.push(Instruction::brkpt("skip").unwrap()).unwrap();
            entry
                .push(Instruction::write(Operand::constant(9)).unwrap())
                .unwrap();
            entry.set_terminator(Instruction::exit()).unwrap();
        }
        cfg.refresh_edges();
        assert_eq!(run_once(&cfg, &[]), Ok(vec![9]));
    }

    #[test]
    fn test_cancellation_reports_pc() {
        let mut cfg = Cfg::new("entry").unwrap();
        cfg.block_mut("entry")
            .unwrap()
            .set_terminator(Instruction::goto("entry").unwrap())
            .unwrap();
        cfg.refresh_edges();

        let cancel = CancelToken::new();
        cancel.cancel();
        let mut interp = Interpreter::new(&cfg, Options::default(), cancel);
        let mut input = VecInput::of(&[]);
        let mut output = VecOutput::new();
        let err = interp.run(&mut input, &mut output, None).unwrap_err();
        assert!(err.is_cancellation());
    }

    #[test]
    fn test_trace_records_executed_instructions() {
        let cfg = echo_cfg();
        let options = Options {
            trace: true,
            ..Options::default()
        };
        let mut interp = Interpreter::new(&cfg, options, CancelToken::new());
        let mut input = VecInput::of(&[7]);
        let mut output = VecOutput::new();
        let mut trace = VecTrace::new();
        interp
            .run(&mut input, &mut output, Some(&mut trace))
            .unwrap();
        assert_eq!(
            trace.records,
            vec![
                ("entry".to_string(), 0, "read".to_string()),
                ("entry".to_string(), 1, "write".to_string()),
                ("entry".to_string(), 2, "exit".to_string()),
            ]
        );
    }
}
