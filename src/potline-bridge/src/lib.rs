// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Potting-line activation bridge.
//!
//! Keeps the active lot of each line in memory and mirrors it to the line
//! equipment through the field-bus gateway.

pub mod completion;
pub mod config;
pub mod controller;
pub mod dispatch;
pub mod registry;
pub mod repository;
pub mod runtime;
pub mod session;
pub mod transport;

pub use completion::{
    completion_sink_from_config, CompletionEvent, CompletionSink, JsonlCompletionLog,
    TracingCompletionSink,
};
pub use config::{
    BridgeConfig, CompletionLogConfig, ConnectionConfig, GeneralConfig, SecurityConfig,
    SecurityMode, SecurityPolicy,
};
pub use controller::{InitReport, LineController};
pub use dispatch::{DispatchOutcome, LineDispatcher, LotDispatch};
pub use registry::{ActiveLotRegistry, RegistryError};
pub use repository::{InMemoryLotRepository, LotRepository, RepositoryError};
pub use runtime::{Bridge, BridgeRuntime, StartError};
pub use session::{with_session, PhaseTracker, SessionHandle};
pub use transport::{BoxFuture, Connector, FieldBusClient, MemoryConnector, TcpConnector};
