// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Transport DTOs for the JSON line protocol.

use serde::{Deserialize, Serialize};

/// Request sent to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum GatewayRequest {
    /// First request of every session.
    Hello {
        session_id: String,
        /// Keep-alive the gateway may apply to this session
        watchdog_ms: u64,
        security_policy: String,
        security_mode: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        username: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        password: Option<String>,
    },
    /// List of namespace URIs; a URI's position is its namespace index.
    GetNamespaceArray,
    Read {
        ns: u16,
        id: String,
    },
    Write {
        ns: u16,
        id: String,
        value: i64,
    },
    Close,
}

impl GatewayRequest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hello { .. } => "hello",
            Self::GetNamespaceArray => "get_namespace_array",
            Self::Read { .. } => "read",
            Self::Write { .. } => "write",
            Self::Close => "close",
        }
    }
}

/// Request with a sequence number echoed back in the response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayEnvelope {
    pub seq: u64,
    #[serde(flatten)]
    pub request: GatewayRequest,
}

/// Status codes reported by the gateway on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCode {
    BadDecodingError,
    BadSessionNotActivated,
    BadUserAccessDenied,
    BadNamespaceUnknown,
    BadNodeIdUnknown,
    BadNotWritable,
    BadInternalError,
}

/// Response to one [`GatewayEnvelope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayResponse {
    pub seq: u64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespaces: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<StatusCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GatewayResponse {
    pub fn ok(seq: u64) -> Self {
        Self {
            seq,
            success: true,
            namespaces: None,
            value: None,
            code: None,
            error: None,
        }
    }

    pub fn with_namespaces(seq: u64, namespaces: Vec<String>) -> Self {
        Self {
            namespaces: Some(namespaces),
            ..Self::ok(seq)
        }
    }

    pub fn with_value(seq: u64, value: i64) -> Self {
        Self {
            value: Some(value),
            ..Self::ok(seq)
        }
    }

    pub fn failure(seq: u64, code: StatusCode, error: impl Into<String>) -> Self {
        Self {
            seq,
            success: false,
            namespaces: None,
            value: None,
            code: Some(code),
            error: Some(error.into()),
        }
    }

    /// Human-readable failure description.
    pub fn error_text(&self) -> String {
        match (&self.code, &self.error) {
            (Some(code), Some(msg)) => format!("{code:?}: {msg}"),
            (Some(code), None) => format!("{code:?}"),
            (None, Some(msg)) => msg.clone(),
            (None, None) => "gateway error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_envelope_shape() {
        let envelope = GatewayEnvelope {
            seq: 3,
            request: GatewayRequest::Write {
                ns: 2,
                id: "Lijn1_PC_nr_actieve_partij".to_string(),
                value: 42,
            },
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["seq"], 3);
        assert_eq!(json["op"], "write");
        assert_eq!(json["ns"], 2);
        assert_eq!(json["value"], 42);
    }

    #[test]
    fn test_hello_omits_missing_credentials() {
        let request = GatewayRequest::Hello {
            session_id: "abc".to_string(),
            watchdog_ms: 10_000,
            security_policy: "None".to_string(),
            security_mode: "None".to_string(),
            username: None,
            password: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("username"));
        assert_eq!(request.name(), "hello");
    }

    #[test]
    fn test_failure_text() {
        let resp = GatewayResponse::failure(1, StatusCode::BadNotWritable, "last_updated is read-only");
        assert!(!resp.success);
        assert_eq!(resp.error_text(), "BadNotWritable: last_updated is read-only");
        assert_eq!(GatewayResponse::ok(1).error_text(), "gateway error");
    }

    #[test]
    fn test_response_parses_without_optional_fields() {
        let resp: GatewayResponse = serde_json::from_str(r#"{"seq":9,"success":true}"#).unwrap();
        assert_eq!(resp, GatewayResponse::ok(9));
    }
}
