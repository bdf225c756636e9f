// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! JSON-lines transport to the line gateway.

use std::time::Duration;

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time;
use tracing::{debug, trace};
use uuid::Uuid;

use potline_core::{BridgeError, BridgeResult, ResolvedAddress};
use potline_protocol::{
    encode_line, parse_endpoint, read_limited_line, Endpoint, GatewayEnvelope, GatewayRequest,
    GatewayResponse, MAX_LINE_BYTES,
};

use super::{BoxFuture, Connector, FieldBusClient};
use crate::config::ConnectionConfig;

/// Opens [`TcpFieldBusClient`] connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    fn connect<'a>(
        &'a self,
        config: &'a ConnectionConfig,
    ) -> BoxFuture<'a, BridgeResult<Box<dyn FieldBusClient>>> {
        Box::pin(async move {
            let client = TcpFieldBusClient::connect(config).await?;
            Ok(Box::new(client) as Box<dyn FieldBusClient>)
        })
    }
}

/// One TCP connection to the gateway with a single request in flight.
pub struct TcpFieldBusClient {
    endpoint: Endpoint,
    session_id: Uuid,
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    io_timeout: Duration,
    next_seq: u64,
}

impl TcpFieldBusClient {
    /// Connect and perform the `hello` handshake.
    pub async fn connect(config: &ConnectionConfig) -> BridgeResult<Self> {
        let endpoint = parse_endpoint(&config.endpoint)
            .map_err(|e| BridgeError::connection(&config.endpoint, e))?;
        let stream = TcpStream::connect(endpoint.connect_addr())
            .await
            .map_err(|e| BridgeError::connection(endpoint.to_string(), e.to_string()))?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!("set_nodelay on {} failed: {}", endpoint, e);
        }

        let (reader, writer) = stream.into_split();
        let mut client = Self {
            endpoint,
            session_id: Uuid::new_v4(),
            reader: BufReader::new(reader),
            writer,
            io_timeout: config.request_timeout(),
            next_seq: 1,
        };

        let security = &config.security;
        let hello = GatewayRequest::Hello {
            session_id: client.session_id.to_string(),
            watchdog_ms: config.watchdog_interval_ms,
            security_policy: security.policy.as_str().to_string(),
            security_mode: security.mode.as_str().to_string(),
            username: security.username.clone(),
            password: security.password.clone(),
        };
        // A rejected handshake means no usable session at all.
        client.exchange(hello, "session").await.map_err(|e| {
            BridgeError::connection(client.endpoint.to_string(), format!("handshake failed: {e}"))
        })?;
        debug!("session {} opened on {}", client.session_id, client.endpoint);
        Ok(client)
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    async fn exchange(
        &mut self,
        request: GatewayRequest,
        node: &str,
    ) -> BridgeResult<GatewayResponse> {
        let op = request.name();
        let seq = self.next_seq;
        self.next_seq += 1;
        let envelope = GatewayEnvelope { seq, request };
        let payload = encode_line(&envelope)
            .map_err(|e| BridgeError::operation(node, format!("JSON serialize failed: {e}")))?;
        trace!("-> {}", payload.trim_end());

        time::timeout(self.io_timeout, self.writer.write_all(payload.as_bytes()))
            .await
            .map_err(|_| BridgeError::timeout(format!("{op} write"), self.io_timeout))?
            .map_err(|e| BridgeError::operation(node, format!("write failed: {e}")))?;
        time::timeout(self.io_timeout, self.writer.flush())
            .await
            .map_err(|_| BridgeError::timeout(format!("{op} flush"), self.io_timeout))?
            .map_err(|e| BridgeError::operation(node, format!("flush failed: {e}")))?;

        let line = time::timeout(
            self.io_timeout,
            read_limited_line(&mut self.reader, MAX_LINE_BYTES),
        )
        .await
        .map_err(|_| BridgeError::timeout(format!("{op} on {node}"), self.io_timeout))?
        .map_err(|e| BridgeError::operation(node, format!("read failed: {e}")))?;
        let line = line.ok_or_else(|| BridgeError::operation(node, "connection closed by remote"))?;
        trace!("<- {}", line.trim_end());

        let resp: GatewayResponse = serde_json::from_str(line.trim_end())
            .map_err(|e| BridgeError::operation(node, format!("invalid response: {e}")))?;
        if resp.seq != seq {
            return Err(BridgeError::operation(
                node,
                format!("response out of sequence (expected {seq}, got {})", resp.seq),
            ));
        }
        if !resp.success {
            return Err(BridgeError::operation(node, resp.error_text()));
        }
        Ok(resp)
    }
}

impl FieldBusClient for TcpFieldBusClient {
    fn namespace_array(&mut self) -> BoxFuture<'_, BridgeResult<Vec<String>>> {
        Box::pin(async move {
            let resp = self
                .exchange(GatewayRequest::GetNamespaceArray, "namespace array")
                .await?;
            resp.namespaces
                .ok_or_else(|| BridgeError::operation("namespace array", "missing namespaces"))
        })
    }

    fn read_int<'a>(&'a mut self, address: &'a ResolvedAddress) -> BoxFuture<'a, BridgeResult<i64>> {
        Box::pin(async move {
            let node = address.to_string();
            let request = GatewayRequest::Read {
                ns: address.namespace_index,
                id: address.key.as_str().to_string(),
            };
            let resp = self.exchange(request, &node).await?;
            resp.value
                .ok_or_else(|| BridgeError::operation(node, "read returned no value"))
        })
    }

    fn write_int<'a>(
        &'a mut self,
        address: &'a ResolvedAddress,
        value: i64,
    ) -> BoxFuture<'a, BridgeResult<()>> {
        Box::pin(async move {
            let node = address.to_string();
            let request = GatewayRequest::Write {
                ns: address.namespace_index,
                id: address.key.as_str().to_string(),
                value,
            };
            self.exchange(request, &node).await.map(|_| ())
        })
    }

    fn close(&mut self) -> BoxFuture<'_, BridgeResult<()>> {
        Box::pin(async move {
            let result = self.exchange(GatewayRequest::Close, "session").await;
            let shutdown = self.writer.shutdown().await;
            debug!("session {} closed on {}", self.session_id, self.endpoint);
            result?;
            shutdown.map_err(|e| BridgeError::operation("session", format!("shutdown failed: {e}")))
        })
    }
}
