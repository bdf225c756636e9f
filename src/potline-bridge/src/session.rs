// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Scoped remote sessions.
//!
//! Every logical operation opens its own connection, resolves the namespace
//! index, runs, and closes the connection again whatever the outcome.

use std::sync::{Mutex, PoisonError};

use tokio::time;
use tracing::{debug, trace};

use potline_core::controller::{OperationEvent, OperationMachine, OperationPhase};
use potline_core::{address_for, BridgeError, BridgeResult, NodeKey, ResolvedAddress};

use crate::config::ConnectionConfig;
use crate::transport::{BoxFuture, Connector, FieldBusClient};

/// Ready-to-use connection handed to the body of [`with_session`].
pub struct SessionHandle {
    client: Box<dyn FieldBusClient>,
    namespace_index: u16,
}

impl SessionHandle {
    pub fn namespace_index(&self) -> u16 {
        self.namespace_index
    }

    /// Qualify `key` with this session's namespace index.
    pub fn resolve(&self, key: &NodeKey) -> ResolvedAddress {
        address_for(key, self.namespace_index)
    }

    pub async fn read_int(&mut self, key: &NodeKey) -> BridgeResult<i64> {
        let address = self.resolve(key);
        self.client.read_int(&address).await
    }

    pub async fn write_int(&mut self, key: &NodeKey, value: i64) -> BridgeResult<()> {
        let address = self.resolve(key);
        self.client.write_int(&address, value).await
    }
}

/// Phase bookkeeping for one controller call, shared by all its attempts.
pub struct PhaseTracker {
    label: String,
    machine: Mutex<OperationMachine>,
}

impl PhaseTracker {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            machine: Mutex::new(OperationMachine::new()),
        }
    }

    pub fn advance(&self, event: OperationEvent) {
        let mut machine = self.machine.lock().unwrap_or_else(PoisonError::into_inner);
        let from = machine.phase();
        if machine.process_event(event) {
            trace!("{}: {} -> {}", self.label, from, machine.phase());
        } else {
            debug!("{}: ignored {:?} in phase {}", self.label, event, from);
        }
    }

    pub fn phase(&self) -> OperationPhase {
        self.machine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .phase()
    }

    pub fn attempts(&self) -> u32 {
        self.machine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .attempts()
    }

    pub fn failed_in(&self) -> Option<OperationPhase> {
        self.machine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .failed_in()
    }
}

/// Open a session, run `op` on it and close it.
///
/// The connection is closed on success and on error; close failures are
/// logged and do not change the result. If `op` panics the client is dropped,
/// which closes the socket.
pub async fn with_session<T, F>(
    connector: &dyn Connector,
    config: &ConnectionConfig,
    tracker: &PhaseTracker,
    op: F,
) -> BridgeResult<T>
where
    F: for<'s> FnOnce(&'s mut SessionHandle) -> BoxFuture<'s, BridgeResult<T>>,
{
    tracker.advance(OperationEvent::Connect);
    let client = match connect(connector, config).await {
        Ok(client) => client,
        Err(err) => {
            tracker.advance(OperationEvent::Fault);
            return Err(err);
        }
    };
    tracker.advance(OperationEvent::Connected);

    let mut session = SessionHandle {
        client,
        namespace_index: 0,
    };
    let result = async {
        session.namespace_index =
            resolve_namespace(session.client.as_mut(), &config.namespace_uri).await?;
        tracker.advance(OperationEvent::Resolved);
        op(&mut session).await
    }
    .await;

    if let Err(err) = session.client.close().await {
        debug!("closing session to {} failed: {}", config.endpoint, err);
    }

    match &result {
        Ok(_) => tracker.advance(OperationEvent::Completed),
        Err(_) => tracker.advance(OperationEvent::Fault),
    }
    result
}

async fn connect(
    connector: &dyn Connector,
    config: &ConnectionConfig,
) -> BridgeResult<Box<dyn FieldBusClient>> {
    let timeout = config.connect_timeout();
    match time::timeout(timeout, connector.connect(config)).await {
        Ok(result) => result,
        Err(_) => Err(BridgeError::connection(
            &config.endpoint,
            format!("timed out after {} ms", timeout.as_millis()),
        )),
    }
}

async fn resolve_namespace(client: &mut dyn FieldBusClient, uri: &str) -> BridgeResult<u16> {
    let namespaces = client.namespace_array().await?;
    let position = namespaces
        .iter()
        .position(|ns| ns == uri)
        .ok_or_else(|| BridgeError::namespace_not_found(uri, &namespaces))?;
    let index = u16::try_from(position)
        .map_err(|_| BridgeError::operation("namespace array", "namespace index out of range"))?;
    trace!("namespace {} resolved to ns={}", uri, index);
    Ok(index)
}
