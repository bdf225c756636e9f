// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Field-bus transport abstraction.
//!
//! A [`Connector`] opens one connection per logical operation; the returned
//! [`FieldBusClient`] is used by a single session and then closed.

pub mod memory;
pub mod tcp;

use std::future::Future;
use std::pin::Pin;

use potline_core::{BridgeResult, ResolvedAddress};

use crate::config::ConnectionConfig;

pub use memory::MemoryConnector;
pub use tcp::{TcpConnector, TcpFieldBusClient};

/// Boxed future used by the object-safe transport traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// An open connection to the line gateway.
pub trait FieldBusClient: Send {
    /// Namespace URIs published by the server; position is the namespace
    /// index.
    fn namespace_array(&mut self) -> BoxFuture<'_, BridgeResult<Vec<String>>>;

    fn read_int<'a>(&'a mut self, address: &'a ResolvedAddress) -> BoxFuture<'a, BridgeResult<i64>>;

    fn write_int<'a>(
        &'a mut self,
        address: &'a ResolvedAddress,
        value: i64,
    ) -> BoxFuture<'a, BridgeResult<()>>;

    /// Release the connection. Called exactly once per session.
    fn close(&mut self) -> BoxFuture<'_, BridgeResult<()>>;
}

/// Factory for [`FieldBusClient`] connections.
pub trait Connector: Send + Sync {
    fn connect<'a>(
        &'a self,
        config: &'a ConnectionConfig,
    ) -> BoxFuture<'a, BridgeResult<Box<dyn FieldBusClient>>>;
}
