//! Debug-message sinks
//!
//! Passes emit structured debug messages through a sink installed on
//! the pass manager. When no sink is installed and `log`'s debug level
//! is off, emission costs nothing beyond a branch.

/// Receiver for structured debug messages.
pub trait DebugSink {
    /// `origin` identifies the emitting component (usually a pass
    /// instance), `message` is the formatted payload.
    fn emit(&mut self, origin: &str, message: &str);
}

/// Sink that buffers messages in memory. Useful in tests and for
/// post-run inspection.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub messages: Vec<(String, String)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DebugSink for MemorySink {
    fn emit(&mut self, origin: &str, message: &str) {
        self.messages.push((origin.to_string(), message.to_string()));
    }
}

/// Sink that forwards to an arbitrary writer, one message per line.
pub struct WriterSink<W: std::io::Write> {
    writer: W,
}

impl<W: std::io::Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: std::io::Write> DebugSink for WriterSink<W> {
    fn emit(&mut self, origin: &str, message: &str) {
        // Debug output is best-effort; a broken sink must not take the
        // run down with it.
        let _ = writeln!(self.writer, "[{origin}] {message}");
    }
}
