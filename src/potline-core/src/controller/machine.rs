// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Per-call operation state machine.
//!
//! Every controller call walks `Idle -> Connecting -> NamespaceResolving ->
//! Ready -> Succeeded`. A failure in any phase moves to `Errored`, from which
//! the next attempt starts over at `Connecting`. Once attempts are exhausted
//! the call ends in `Failed`.

use std::fmt;

use serde::Serialize;

/// Phase of a single controller call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationPhase {
    #[default]
    Idle,
    Connecting,
    NamespaceResolving,
    Ready,
    Succeeded,
    Errored,
    Failed,
}

/// Events that move an [`OperationMachine`] between phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationEvent {
    /// A new attempt opens the transport.
    Connect,
    /// The transport is up; looking up the namespace index.
    Connected,
    /// The namespace index is known; the session handle is usable.
    Resolved,
    /// The read or write was acknowledged.
    Completed,
    /// The current attempt failed.
    Fault,
    /// No further attempts will be made.
    GiveUp,
}

impl OperationPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    fn next(self, event: OperationEvent) -> Option<OperationPhase> {
        use OperationEvent as E;
        use OperationPhase as P;

        match (self, event) {
            (P::Idle | P::Errored, E::Connect) => Some(P::Connecting),
            (P::Connecting, E::Connected) => Some(P::NamespaceResolving),
            (P::NamespaceResolving, E::Resolved) => Some(P::Ready),
            (P::Ready, E::Completed) => Some(P::Succeeded),
            (P::Connecting | P::NamespaceResolving | P::Ready, E::Fault) => Some(P::Errored),
            // Invalid input is rejected before any attempt is made.
            (P::Idle | P::Errored, E::GiveUp) => Some(P::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for OperationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::NamespaceResolving => "namespace_resolving",
            Self::Ready => "ready",
            Self::Succeeded => "succeeded",
            Self::Errored => "errored",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Tracks the phase of one controller call across its attempts.
#[derive(Debug, Clone, Default)]
pub struct OperationMachine {
    phase: OperationPhase,
    attempts: u32,
    failed_in: Option<OperationPhase>,
}

impl OperationMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> OperationPhase {
        self.phase
    }

    /// Number of attempts started so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Phase in which the most recent attempt failed.
    pub fn failed_in(&self) -> Option<OperationPhase> {
        self.failed_in
    }

    /// Apply an event. Returns false and leaves the phase untouched when the
    /// event is not valid in the current phase.
    pub fn process_event(&mut self, event: OperationEvent) -> bool {
        let Some(next) = self.phase.next(event) else {
            return false;
        };
        match event {
            OperationEvent::Connect => self.attempts += 1,
            OperationEvent::Fault => self.failed_in = Some(self.phase),
            _ => {}
        }
        self.phase = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut machine = OperationMachine::new();
        assert!(machine.process_event(OperationEvent::Connect));
        assert!(machine.process_event(OperationEvent::Connected));
        assert!(machine.process_event(OperationEvent::Resolved));
        assert!(machine.process_event(OperationEvent::Completed));
        assert_eq!(machine.phase(), OperationPhase::Succeeded);
        assert!(machine.phase().is_terminal());
        assert_eq!(machine.attempts(), 1);
        assert_eq!(machine.failed_in(), None);
    }

    #[test]
    fn test_retry_cycle_restarts_at_connecting() {
        let mut machine = OperationMachine::new();
        machine.process_event(OperationEvent::Connect);
        machine.process_event(OperationEvent::Connected);
        assert!(machine.process_event(OperationEvent::Fault));
        assert_eq!(machine.phase(), OperationPhase::Errored);
        assert_eq!(machine.failed_in(), Some(OperationPhase::NamespaceResolving));

        assert!(machine.process_event(OperationEvent::Connect));
        assert_eq!(machine.phase(), OperationPhase::Connecting);
        assert_eq!(machine.attempts(), 2);

        machine.process_event(OperationEvent::Fault);
        assert!(machine.process_event(OperationEvent::GiveUp));
        assert_eq!(machine.phase(), OperationPhase::Failed);
        assert_eq!(machine.failed_in(), Some(OperationPhase::Connecting));
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        let mut machine = OperationMachine::new();
        assert!(!machine.process_event(OperationEvent::Resolved));
        assert!(!machine.process_event(OperationEvent::Completed));
        assert_eq!(machine.phase(), OperationPhase::Idle);

        machine.process_event(OperationEvent::Connect);
        assert!(!machine.process_event(OperationEvent::GiveUp));
        assert_eq!(machine.phase(), OperationPhase::Connecting);
    }

    #[test]
    fn test_rejected_input_fails_from_idle() {
        let mut machine = OperationMachine::new();
        assert!(machine.process_event(OperationEvent::GiveUp));
        assert_eq!(machine.phase(), OperationPhase::Failed);
        assert_eq!(machine.attempts(), 0);
    }
}
