//! Interpreter I/O streams
//!
//! Inputs are whitespace-separated decimal integers; outputs are one
//! decimal integer per line; traces are `(block, index, kind)` tuples.
//! The in-memory variants back the test suites and embedders that
//! script a run.

use mica_ir::Value;
use std::collections::VecDeque;
use std::io::{BufRead, Write};

/// Failure reading the next input token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// The stream is exhausted.
    Eof,
    /// The next token is not a decimal integer.
    Malformed(String),
    /// The underlying reader failed.
    Io(String),
}

impl InputError {
    pub fn reason(&self) -> String {
        match self {
            InputError::Eof => "end of input".to_string(),
            InputError::Malformed(token) => format!("invalid input token {token:?}"),
            InputError::Io(reason) => reason.clone(),
        }
    }
}

/// Yields the next input integer or signals EOF.
pub trait InputSource {
    fn next_value(&mut self) -> Result<Value, InputError>;
}

/// Accepts output integers.
pub trait OutputSink {
    fn emit(&mut self, value: &Value) -> Result<(), String>;
}

/// Receives one record per executed instruction.
pub trait TraceSink {
    fn record(&mut self, block: &str, index: usize, kind: &str);
}

/// Whitespace-separated decimal tokens over any buffered reader.
///
/// Tokens are consumed incrementally, byte by byte, so interactive
/// programs can interleave reads with writes.
pub struct TokenInput<R> {
    inner: R,
}

impl<R: BufRead> TokenInput<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    fn next_byte(&mut self) -> Result<Option<u8>, InputError> {
        let buf = self
            .inner
            .fill_buf()
            .map_err(|e| InputError::Io(e.to_string()))?;
        match buf.first().copied() {
            Some(byte) => {
                self.inner.consume(1);
                Ok(Some(byte))
            }
            None => Ok(None),
        }
    }
}

impl<R: BufRead> InputSource for TokenInput<R> {
    fn next_value(&mut self) -> Result<Value, InputError> {
        let mut token = Vec::new();
        loop {
            match self.next_byte()? {
                Some(byte) if byte.is_ascii_whitespace() => {
                    if !token.is_empty() {
                        break;
                    }
                }
                Some(byte) => token.push(byte),
                None => break,
            }
        }
        if token.is_empty() {
            return Err(InputError::Eof);
        }
        let text = String::from_utf8_lossy(&token).to_string();
        text.parse::<Value>()
            .map_err(|_| InputError::Malformed(text))
    }
}

/// Scripted input for tests and embedders.
#[derive(Debug, Default)]
pub struct VecInput {
    values: VecDeque<Value>,
}

impl VecInput {
    pub fn new(values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    pub fn of(values: &[i64]) -> Self {
        Self::new(values.iter().map(|&v| Value::from(v)))
    }
}

impl InputSource for VecInput {
    fn next_value(&mut self) -> Result<Value, InputError> {
        self.values.pop_front().ok_or(InputError::Eof)
    }
}

/// One decimal integer per line over any writer.
pub struct LineOutput<W> {
    inner: W,
}

impl<W: Write> LineOutput<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: Write> OutputSink for LineOutput<W> {
    fn emit(&mut self, value: &Value) -> Result<(), String> {
        writeln!(self.inner, "{value}").map_err(|e| e.to_string())?;
        self.inner.flush().map_err(|e| e.to_string())
    }
}

/// Output collected in memory.
#[derive(Debug, Default)]
pub struct VecOutput {
    pub values: Vec<Value>,
}

impl VecOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Machine-integer view for assertions; out-of-range values
    /// saturate to `i64::MAX`.
    pub fn as_i64s(&self) -> Vec<i64> {
        use num_traits::ToPrimitive;
        self.values
            .iter()
            .map(|v| v.to_i64().unwrap_or(i64::MAX))
            .collect()
    }
}

impl OutputSink for VecOutput {
    fn emit(&mut self, value: &Value) -> Result<(), String> {
        self.values.push(value.clone());
        Ok(())
    }
}

/// Trace tuples written as text, one per line.
pub struct WriteTrace<W> {
    inner: W,
}

impl<W: Write> WriteTrace<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: Write> TraceSink for WriteTrace<W> {
    fn record(&mut self, block: &str, index: usize, kind: &str) {
        // Tracing is best-effort observability.
        let _ = writeln!(self.inner, "(@{block}, {index}, {kind})");
    }
}

/// Trace collected in memory.
#[derive(Debug, Default)]
pub struct VecTrace {
    pub records: Vec<(String, usize, String)>,
}

impl VecTrace {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TraceSink for VecTrace {
    fn record(&mut self, block: &str, index: usize, kind: &str) {
        self.records
            .push((block.to_string(), index, kind.to_string()));
    }
}
