// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use serde::Serialize;

use crate::error::BridgeError;
use crate::lot::unix_millis;

use super::machine::OperationPhase;

/// Outcome of the most recent controller call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionOutcome {
    #[default]
    Unknown,
    Connected,
    Failed,
}

/// Diagnostic snapshot of the line controller.
///
/// Shown on status badges only; the controller never reads it back to make
/// decisions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ControllerStatus {
    pub outcome: ConnectionOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error_kind: Option<&'static str>,
    /// Phase in which the last failed call gave up.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_in: Option<OperationPhase>,
    /// Unix timestamp (ms) of the last call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_attempt_at_ms: Option<u64>,
    pub operations: u64,
    pub failures: u64,
}

impl ControllerStatus {
    pub fn record_success(&mut self) {
        self.outcome = ConnectionOutcome::Connected;
        self.last_attempt_at_ms = Some(unix_millis());
        self.operations += 1;
    }

    /// Record a failed call. The previous error message is replaced, and the
    /// outcome only flips to `Failed` when the remote side was involved.
    pub fn record_failure(&mut self, error: &BridgeError, failed_in: Option<OperationPhase>) {
        if !matches!(error, BridgeError::InvalidAddress(_)) {
            self.outcome = ConnectionOutcome::Failed;
        }
        self.last_error = Some(error.to_string());
        self.last_error_kind = Some(error.kind());
        self.failed_in = failed_in;
        self.last_attempt_at_ms = Some(unix_millis());
        self.operations += 1;
        self.failures += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AddressError;

    #[test]
    fn test_failure_then_success() {
        let mut status = ControllerStatus::default();
        assert_eq!(status.outcome, ConnectionOutcome::Unknown);

        status.record_failure(
            &BridgeError::connection("opc.tcp://plc:4840", "refused"),
            Some(OperationPhase::Connecting),
        );
        assert_eq!(status.outcome, ConnectionOutcome::Failed);
        assert!(status.last_error.as_deref().unwrap().contains("refused"));
        assert_eq!(status.last_error_kind, Some("connection_failure"));
        assert!(status.last_attempt_at_ms.is_some());

        status.record_success();
        assert_eq!(status.outcome, ConnectionOutcome::Connected);
        // Last error is kept for diagnostics.
        assert!(status.last_error.is_some());
        assert_eq!(status.operations, 2);
        assert_eq!(status.failures, 1);
    }

    #[test]
    fn test_invalid_address_keeps_outcome() {
        let mut status = ControllerStatus::default();
        status.record_success();
        status.record_failure(
            &BridgeError::from(AddressError::InvalidLine("3".into())),
            None,
        );
        assert_eq!(status.outcome, ConnectionOutcome::Connected);
        assert_eq!(status.last_error_kind, Some("invalid_address"));
    }

    #[test]
    fn test_serialize_skips_empty() {
        let json = serde_json::to_value(ControllerStatus::default()).unwrap();
        assert_eq!(json["outcome"], "unknown");
        assert!(json.get("last_error").is_none());
    }
}
