// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Line gateway simulator.
//!
//! Serves the JSON-lines gateway protocol from an in-memory node table
//! holding the four active-lot registers and the read-only `last_updated`
//! timestamp.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use potline_core::{unix_millis, Component, Line, NodeKey};
use potline_protocol::{
    encode_line, parse_envelope, read_limited_line, GatewayEnvelope, GatewayRequest,
    GatewayResponse, StatusCode, MAX_LINE_BYTES,
};

const SERVER_NAMESPACE: &str = "http://opcfoundation.org/UA/";
/// Namespace index the line values are published under.
pub const LINES_NAMESPACE_INDEX: u16 = 2;

#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub namespace_uri: String,
    /// Required identity; anonymous sessions are accepted when unset.
    pub credentials: Option<(String, String)>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            namespace_uri: "urn:potline:lines".to_string(),
            credentials: None,
        }
    }
}

/// Shared node table; clones see the same values.
#[derive(Clone)]
pub struct NodeTable {
    values: Arc<Mutex<HashMap<String, i64>>>,
    sessions: Arc<AtomicUsize>,
}

impl NodeTable {
    fn seeded() -> Self {
        let mut values = HashMap::new();
        for line in Line::ALL {
            for component in Component::ALL {
                values.insert(NodeKey::active_lot(line, component).as_str().to_string(), 0);
            }
        }
        values.insert(NodeKey::last_updated().as_str().to_string(), 0);
        Self {
            values: Arc::new(Mutex::new(values)),
            sessions: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, i64>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &NodeKey) -> Option<i64> {
        self.lock().get(key.as_str()).copied()
    }

    /// Set a value directly, bypassing the write rules.
    pub fn set(&self, key: &NodeKey, value: i64) {
        self.lock().insert(key.as_str().to_string(), value);
    }

    /// Sessions that said hello and have not disconnected.
    pub fn active_sessions(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }

    fn read(&self, id: &str) -> Result<i64, (StatusCode, String)> {
        self.lock()
            .get(id)
            .copied()
            .ok_or_else(|| (StatusCode::BadNodeIdUnknown, format!("unknown node '{id}'")))
    }

    fn write(&self, id: &str, value: i64) -> Result<(), (StatusCode, String)> {
        if id == NodeKey::last_updated().as_str() {
            return Err((StatusCode::BadNotWritable, format!("'{id}' is read-only")));
        }
        let mut values = self.lock();
        let Some(slot) = values.get_mut(id) else {
            return Err((StatusCode::BadNodeIdUnknown, format!("unknown node '{id}'")));
        };
        *slot = value;
        values.insert(
            NodeKey::last_updated().as_str().to_string(),
            unix_millis() as i64,
        );
        Ok(())
    }
}

pub struct GatewaySimulator {
    listener: TcpListener,
    config: Arc<SimulatorConfig>,
    nodes: NodeTable,
}

impl GatewaySimulator {
    pub async fn bind(addr: SocketAddr, config: SimulatorConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            config: Arc::new(config),
            nodes: NodeTable::seeded(),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn nodes(&self) -> NodeTable {
        self.nodes.clone()
    }

    /// Accept connections until the listener fails.
    pub async fn run(self) -> std::io::Result<()> {
        info!(
            "Simulating gateway on {} (namespace {} at ns={})",
            self.listener.local_addr()?,
            self.config.namespace_uri,
            LINES_NAMESPACE_INDEX
        );
        loop {
            let (socket, peer) = self.listener.accept().await?;
            debug!("Client connected: {}", peer);

            let config = Arc::clone(&self.config);
            let nodes = self.nodes.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_client(socket, peer, config, nodes).await {
                    error!("Client {} error: {:?}", peer, e);
                }
            });
        }
    }

    pub fn spawn(self) -> JoinHandle<std::io::Result<()>> {
        tokio::spawn(self.run())
    }
}

struct Session {
    id: Option<String>,
}

async fn handle_client(
    socket: TcpStream,
    peer: SocketAddr,
    config: Arc<SimulatorConfig>,
    nodes: NodeTable,
) -> std::io::Result<()> {
    let mut session = Session { id: None };
    let result = serve_session(socket, peer, &config, &nodes, &mut session).await;
    if let Some(id) = session.id {
        nodes.sessions.fetch_sub(1, Ordering::SeqCst);
        debug!("Session {} from {} ended", id, peer);
    }
    result
}

async fn serve_session(
    socket: TcpStream,
    peer: SocketAddr,
    config: &SimulatorConfig,
    nodes: &NodeTable,
    session: &mut Session,
) -> std::io::Result<()> {
    let (reader, mut writer) = socket.into_split();
    let mut reader = BufReader::new(reader);

    loop {
        let Some(line) = read_limited_line(&mut reader, MAX_LINE_BYTES).await? else {
            debug!("Client {} disconnected", peer);
            return Ok(());
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let (resp, close) = match parse_envelope(trimmed) {
            Ok(envelope) => respond(envelope, config, nodes, session),
            Err(e) => {
                warn!("Invalid JSON from {}: {}", peer, e);
                (
                    GatewayResponse::failure(0, StatusCode::BadDecodingError, e.to_string()),
                    false,
                )
            }
        };
        writer.write_all(encode_line(&resp)?.as_bytes()).await?;
        writer.flush().await?;
        if close {
            return Ok(());
        }
    }
}

fn respond(
    envelope: GatewayEnvelope,
    config: &SimulatorConfig,
    nodes: &NodeTable,
    session: &mut Session,
) -> (GatewayResponse, bool) {
    let seq = envelope.seq;
    if session.id.is_none() && !matches!(envelope.request, GatewayRequest::Hello { .. }) {
        return (
            GatewayResponse::failure(
                seq,
                StatusCode::BadSessionNotActivated,
                format!("'{}' before hello", envelope.request.name()),
            ),
            false,
        );
    }

    match envelope.request {
        GatewayRequest::Hello {
            session_id,
            username,
            password,
            ..
        } => {
            if let Some((user, pass)) = &config.credentials {
                if username.as_ref() != Some(user) || password.as_ref() != Some(pass) {
                    return (
                        GatewayResponse::failure(
                            seq,
                            StatusCode::BadUserAccessDenied,
                            "invalid user name or password",
                        ),
                        true,
                    );
                }
            }
            if session.id.is_none() {
                nodes.sessions.fetch_add(1, Ordering::SeqCst);
            }
            session.id = Some(session_id);
            (GatewayResponse::ok(seq), false)
        }
        GatewayRequest::GetNamespaceArray => {
            let mut namespaces = vec![SERVER_NAMESPACE.to_string(), "urn:potline:sim".to_string()];
            namespaces.push(config.namespace_uri.clone());
            (GatewayResponse::with_namespaces(seq, namespaces), false)
        }
        GatewayRequest::Read { ns, id } => {
            let result = check_namespace(ns).and_then(|()| nodes.read(&id));
            match result {
                Ok(value) => (GatewayResponse::with_value(seq, value), false),
                Err((code, msg)) => (GatewayResponse::failure(seq, code, msg), false),
            }
        }
        GatewayRequest::Write { ns, id, value } => {
            let result = check_namespace(ns).and_then(|()| nodes.write(&id, value));
            match result {
                Ok(()) => {
                    info!("ns={};s={} = {}", ns, id, value);
                    (GatewayResponse::ok(seq), false)
                }
                Err((code, msg)) => (GatewayResponse::failure(seq, code, msg), false),
            }
        }
        GatewayRequest::Close => (GatewayResponse::ok(seq), true),
    }
}

fn check_namespace(ns: u16) -> Result<(), (StatusCode, String)> {
    if ns == LINES_NAMESPACE_INDEX {
        Ok(())
    } else {
        Err((StatusCode::BadNamespaceUnknown, format!("unknown namespace index {ns}")))
    }
}
