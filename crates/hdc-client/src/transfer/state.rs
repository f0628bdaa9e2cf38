//! Transfer lifecycle

use std::fmt;

use hdc_core::{HdcError, Result};

/// Phase of a single file transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    /// Request built, paths not yet checked
    Init,
    /// `FileInit` sent, waiting for the daemon to accept
    Negotiate,
    /// Content chunks flowing
    Streaming,
    /// Byte count and digest being compared
    Verify,
    /// Transfer complete
    Done,
    /// Transfer abandoned
    Failed,
}

impl TransferState {
    /// Whether `next` may follow `self`
    pub fn can_advance_to(self, next: TransferState) -> bool {
        use TransferState::*;
        matches!(
            (self, next),
            (Init, Negotiate)
                | (Negotiate, Streaming)
                | (Streaming, Verify)
                | (Verify, Done)
                | (Init | Negotiate | Streaming | Verify, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TransferState::Done | TransferState::Failed)
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransferState::Init => "init",
            TransferState::Negotiate => "negotiate",
            TransferState::Streaming => "streaming",
            TransferState::Verify => "verify",
            TransferState::Done => "done",
            TransferState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Drives a transfer through its states and records the path taken
#[derive(Debug, Clone)]
pub struct TransferMachine {
    history: Vec<TransferState>,
}

impl Default for TransferMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferMachine {
    pub fn new() -> Self {
        Self {
            history: vec![TransferState::Init],
        }
    }

    pub fn state(&self) -> TransferState {
        self.history
            .last()
            .copied()
            .unwrap_or(TransferState::Init)
    }

    /// Every state visited so far, starting with `Init`
    pub fn history(&self) -> &[TransferState] {
        &self.history
    }

    /// Move to `next`, rejecting edges the lifecycle does not allow
    pub fn advance(&mut self, next: TransferState) -> Result<()> {
        let current = self.state();
        if !current.can_advance_to(next) {
            return Err(HdcError::transfer(format!(
                "illegal transfer state change {} -> {}",
                current, next
            )));
        }
        tracing::trace!("transfer {} -> {}", current, next);
        self.history.push(next);
        Ok(())
    }

    /// Record a failure and hand the error back
    ///
    /// A machine that already finished keeps its terminal state.
    pub fn fail(&mut self, err: HdcError) -> HdcError {
        if !self.state().is_terminal() {
            self.history.push(TransferState::Failed);
        }
        err
    }
}
