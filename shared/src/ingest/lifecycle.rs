//! Ingestion subsystem lifecycle.
//!
//! `Created → Listening → Running → Draining → Stopped`, with a direct jump
//! to `Stopped` allowed before `Running` for startup failures.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

/// State of the ingestion subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionState {
    /// Components are built but the transport is not bound yet.
    Created,
    /// The transport socket is bound.
    Listening,
    /// The consumer task is draining the channel as messages arrive.
    Running,
    /// Shutdown was requested; the transport stopped accepting input and
    /// buffered messages are being drained.
    Draining,
    /// Ingestion has finished.
    Stopped,
}

impl IngestionState {
    /// Returns true if the lifecycle may move from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Listening | Self::Stopped)
                | (Self::Listening, Self::Running | Self::Stopped)
                | (Self::Running, Self::Draining)
                | (Self::Draining, Self::Stopped)
        )
    }

    /// Returns a lowercase name for the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Listening => "listening",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for IngestionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur while advancing the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// The requested transition is not allowed from the current state.
    #[error("Invalid ingestion state transition from {from} to {to}")]
    InvalidTransition {
        /// The current state.
        from: IngestionState,
        /// The requested state.
        to: IngestionState,
    },
}

/// Owner of the ingestion state, observable through watch receivers.
#[derive(Debug)]
pub struct IngestionLifecycle {
    tx: watch::Sender<IngestionState>,
}

impl IngestionLifecycle {
    /// Creates a lifecycle in the `Created` state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(IngestionState::Created);
        Self { tx }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> IngestionState {
        *self.tx.borrow()
    }

    /// Returns a receiver that observes every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<IngestionState> {
        self.tx.subscribe()
    }

    /// Moves to `next`.
    ///
    /// # Errors
    ///
    /// Returns `LifecycleError::InvalidTransition` if `next` is not reachable
    /// from the current state; the state is left unchanged.
    pub fn advance(&self, next: IngestionState) -> Result<(), LifecycleError> {
        let from = self.state();
        if !from.can_transition_to(next) {
            return Err(LifecycleError::InvalidTransition { from, to: next });
        }
        self.tx.send_replace(next);
        tracing::info!(from = %from, to = %next, "Ingestion state changed");
        Ok(())
    }
}

impl Default for IngestionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
