//! `mica run`: interpret a program against stdin or a file

use anyhow::{Context, Result};
use mica_common::CancelToken;
use mica_interp::{Halt, Interpreter, LineOutput, Options, TokenInput, WriteTrace};
use std::io::{BufReader, Write};
use std::path::PathBuf;

pub fn execute(
    file: PathBuf,
    input: Option<PathBuf>,
    trace: bool,
    breakpoints: bool,
) -> Result<()> {
    let (cfg, _) = super::load_program(&file)?;
    cfg.validate()
        .with_context(|| format!("{} is structurally invalid", file.display()))?;

    let options = Options { trace, breakpoints };
    let mut interp = Interpreter::new(&cfg, options, CancelToken::new());

    let mut source: Box<dyn mica_interp::InputSource> = match input {
        Some(path) => {
            let reader = std::fs::File::open(&path)
                .with_context(|| format!("cannot open {}", path.display()))?;
            Box::new(TokenInput::new(BufReader::new(reader)))
        }
        None => Box::new(TokenInput::new(BufReader::new(std::io::stdin()))),
    };
    let mut output = LineOutput::new(std::io::stdout());
    let mut trace_sink = WriteTrace::new(std::io::stderr());

    loop {
        let trace = if trace {
            Some(&mut trace_sink as &mut dyn mica_interp::TraceSink)
        } else {
            None
        };
        match interp.run(source.as_mut(), &mut output, trace) {
            Ok(Halt::Exited) => return Ok(()),
            Ok(Halt::Breakpoint { name, block, index }) => {
                // Report the snapshot and resume; an interactive
                // debugger would stop here instead.
                let mut stderr = std::io::stderr();
                let _ = writeln!(stderr, "breakpoint !{name} at @{block}:{index}");
                let mut registers: Vec<_> = interp.env().iter().collect();
                registers.sort_by(|(a, _), (b, _)| a.cmp(b));
                for (register, value) in registers {
                    let _ = writeln!(stderr, "    %{register} = {value}");
                }
            }
            Err(err) => {
                log::error!("{err}");
                return Err(err.into());
            }
        }
    }
}
