//! Single-fire resume gate

use tokio_util::sync::CancellationToken;

/// Releases every waiter of one pause cycle, once.
///
/// A fresh gate is installed on each pause; releasing is idempotent.
#[derive(Debug, Clone, Default)]
pub struct ResumeGate {
    signal: CancellationToken,
}

impl ResumeGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the gate.
    pub fn release(&self) {
        self.signal.cancel();
    }

    pub fn is_released(&self) -> bool {
        self.signal.is_cancelled()
    }

    /// Completes once the gate is open.
    pub async fn released(&self) {
        self.signal.cancelled().await
    }
}
