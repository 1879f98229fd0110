//! Cooperative cancellation for long-running operations
//!
//! The workbench is single-threaded; cancellation is external and
//! cooperative. The embedder hands a token to the interpreter or the
//! pass manager and may trip it from a signal handler or watchdog
//! thread. The core checks the token at control-transfer boundaries
//! only; timeouts are layered on top by the embedder.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A shared flag polled at explicit suspension points.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the token. Idempotent; safe from any thread.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
