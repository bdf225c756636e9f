// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use serde::Serialize;
use thiserror::Error;

/// Raw line/component input outside the closed sets.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum AddressError {
    #[error("invalid line '{0}' (expected 1 or 2)")]
    InvalidLine(String),

    #[error("invalid component '{0}' (expected PC or OS)")]
    InvalidComponent(String),
}

/// Errors produced while talking to the line equipment.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum BridgeError {
    /// The transport could not be established (refused, unreachable, timed out).
    #[error("connection to {endpoint} failed: {reason}")]
    ConnectionFailure { endpoint: String, reason: String },

    /// Connected, but the server does not publish the configured namespace.
    #[error("namespace '{uri}' not found on server (published: {published})")]
    NamespaceNotFound { uri: String, published: String },

    /// Connected, but the read or write itself failed.
    #[error("operation on {node} failed: {reason}")]
    OperationFailure { node: String, reason: String },

    /// A request on an open connection got no answer in time.
    #[error("{operation} timed out after {after_ms} ms")]
    Timeout { operation: String, after_ms: u64 },

    #[error(transparent)]
    InvalidAddress(#[from] AddressError),
}

pub type BridgeResult<T> = Result<T, BridgeError>;

impl BridgeError {
    pub fn connection(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConnectionFailure {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    pub fn operation(node: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::OperationFailure {
            node: node.into(),
            reason: reason.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, after: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after_ms: after.as_millis() as u64,
        }
    }

    pub fn namespace_not_found(uri: impl Into<String>, published: &[String]) -> Self {
        let published = if published.is_empty() {
            "none".to_string()
        } else {
            published.join(", ")
        };
        Self::NamespaceNotFound {
            uri: uri.into(),
            published,
        }
    }

    /// Whether repeating the whole connect/resolve/operate cycle may help.
    ///
    /// A missing namespace is a configuration mismatch and an invalid address
    /// is a caller bug; neither changes between attempts.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailure { .. } | Self::OperationFailure { .. } | Self::Timeout { .. }
        )
    }

    /// Short machine-readable category for status views.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConnectionFailure { .. } => "connection_failure",
            Self::NamespaceNotFound { .. } => "namespace_not_found",
            Self::OperationFailure { .. } => "operation_failure",
            Self::Timeout { .. } => "timeout",
            Self::InvalidAddress(_) => "invalid_address",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(BridgeError::connection("opc.tcp://plc:4840", "refused").is_transient());
        assert!(BridgeError::operation("ns=2;s=x", "bad status").is_transient());
        assert!(BridgeError::timeout("read", std::time::Duration::from_millis(50)).is_transient());
        assert!(!BridgeError::namespace_not_found("urn:x", &[]).is_transient());
        assert!(!BridgeError::from(AddressError::InvalidLine("3".into())).is_transient());
    }

    #[test]
    fn test_messages() {
        let err = BridgeError::connection("opc.tcp://unreachable:4840", "timed out after 5000 ms");
        assert_eq!(
            err.to_string(),
            "connection to opc.tcp://unreachable:4840 failed: timed out after 5000 ms"
        );

        let err = BridgeError::namespace_not_found(
            "urn:potline:lines",
            &["http://opcfoundation.org/UA/".to_string(), "urn:other".to_string()],
        );
        assert!(err.to_string().contains("urn:potline:lines"));
        assert!(err.to_string().contains("urn:other"));

        let err = BridgeError::from(AddressError::InvalidComponent("XX".into()));
        assert_eq!(err.to_string(), "invalid component 'XX' (expected PC or OS)");
        assert_eq!(err.kind(), "invalid_address");
    }
}
