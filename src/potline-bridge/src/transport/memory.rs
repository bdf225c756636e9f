// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! In-process line gateway for development and testing.
//!
//! Holds the node table in memory and answers immediately. Failures can be
//! injected per connection attempt.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use potline_core::{
    unix_millis, BridgeError, BridgeResult, Component, Line, NodeKey, ResolvedAddress,
};

use super::{BoxFuture, Connector, FieldBusClient};
use crate::config::ConnectionConfig;

const SERVER_NAMESPACE: &str = "http://opcfoundation.org/UA/";

#[derive(Default)]
struct MemoryState {
    namespaces: Vec<String>,
    values: HashMap<(u16, String), i64>,
    writes: Vec<(NodeKey, i64)>,
    unreachable: bool,
    failing_connects: u32,
    failing_writes: u32,
    connects: u32,
    open_sessions: usize,
}

/// Shared in-memory node table; clones see the same state.
#[derive(Clone, Default)]
pub struct MemoryConnector {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryConnector {
    /// Gateway publishing `namespace_uri` at index 1 with the four active-lot
    /// registers and `last_updated` set to 0.
    pub fn new(namespace_uri: &str) -> Self {
        let connector = Self::default();
        {
            let mut state = connector.lock();
            state.namespaces = vec![SERVER_NAMESPACE.to_string(), namespace_uri.to_string()];
            for line in Line::ALL {
                for component in Component::ALL {
                    let key = NodeKey::active_lot(line, component);
                    state.values.insert((1, key.as_str().to_string()), 0);
                }
            }
            state
                .values
                .insert((1, NodeKey::last_updated().as_str().to_string()), 0);
        }
        connector
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Refuse every connection while `unreachable` is set.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.lock().unreachable = unreachable;
    }

    /// Refuse the next `count` connection attempts.
    pub fn fail_next_connects(&self, count: u32) {
        self.lock().failing_connects = count;
    }

    /// Reject the next `count` writes with a bad status.
    pub fn fail_next_writes(&self, count: u32) {
        self.lock().failing_writes = count;
    }

    /// Current value of `key` in the published namespace.
    pub fn value(&self, key: &NodeKey) -> Option<i64> {
        self.lock().values.get(&(1, key.as_str().to_string())).copied()
    }

    /// Acknowledged writes in the order they were applied.
    pub fn writes(&self) -> Vec<(NodeKey, i64)> {
        self.lock().writes.clone()
    }

    /// Connection attempts seen so far, refused ones included.
    pub fn connect_count(&self) -> u32 {
        self.lock().connects
    }

    /// Sessions connected but not yet closed.
    pub fn open_sessions(&self) -> usize {
        self.lock().open_sessions
    }
}

impl Connector for MemoryConnector {
    fn connect<'a>(
        &'a self,
        config: &'a ConnectionConfig,
    ) -> BoxFuture<'a, BridgeResult<Box<dyn FieldBusClient>>> {
        Box::pin(async move {
            let mut state = self.lock();
            state.connects += 1;
            if state.unreachable {
                return Err(BridgeError::connection(&config.endpoint, "connection refused"));
            }
            if state.failing_connects > 0 {
                state.failing_connects -= 1;
                return Err(BridgeError::connection(&config.endpoint, "connection reset"));
            }
            state.open_sessions += 1;
            drop(state);
            Ok(Box::new(MemoryClient {
                connector: self.clone(),
                closed: false,
            }) as Box<dyn FieldBusClient>)
        })
    }
}

struct MemoryClient {
    connector: MemoryConnector,
    closed: bool,
}

impl FieldBusClient for MemoryClient {
    fn namespace_array(&mut self) -> BoxFuture<'_, BridgeResult<Vec<String>>> {
        Box::pin(async move { Ok(self.connector.lock().namespaces.clone()) })
    }

    fn read_int<'a>(&'a mut self, address: &'a ResolvedAddress) -> BoxFuture<'a, BridgeResult<i64>> {
        Box::pin(async move {
            let state = self.connector.lock();
            state
                .values
                .get(&(address.namespace_index, address.key.as_str().to_string()))
                .copied()
                .ok_or_else(|| BridgeError::operation(address.to_string(), "BadNodeIdUnknown"))
        })
    }

    fn write_int<'a>(
        &'a mut self,
        address: &'a ResolvedAddress,
        value: i64,
    ) -> BoxFuture<'a, BridgeResult<()>> {
        Box::pin(async move {
            let mut state = self.connector.lock();
            if address.key == NodeKey::last_updated() {
                return Err(BridgeError::operation(address.to_string(), "BadNotWritable"));
            }
            let slot = (address.namespace_index, address.key.as_str().to_string());
            if !state.values.contains_key(&slot) {
                return Err(BridgeError::operation(address.to_string(), "BadNodeIdUnknown"));
            }
            if state.failing_writes > 0 {
                state.failing_writes -= 1;
                return Err(BridgeError::operation(address.to_string(), "BadInternalError"));
            }
            state.values.insert(slot, value);
            state.values.insert(
                (address.namespace_index, NodeKey::last_updated().as_str().to_string()),
                unix_millis() as i64,
            );
            state.writes.push((address.key.clone(), value));
            Ok(())
        })
    }

    fn close(&mut self) -> BoxFuture<'_, BridgeResult<()>> {
        Box::pin(async move {
            if !self.closed {
                self.closed = true;
                let mut state = self.connector.lock();
                state.open_sessions = state.open_sessions.saturating_sub(1);
            }
            Ok(())
        })
    }
}

impl Drop for MemoryClient {
    fn drop(&mut self) {
        if !self.closed {
            let mut state = self.connector.lock();
            state.open_sessions = state.open_sessions.saturating_sub(1);
        }
    }
}
