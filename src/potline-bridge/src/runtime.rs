// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Long-lived async runtime for hosts without one, and the wiring of
//! controller, dispatcher and registry on top of it.

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::info;

use crate::completion::{completion_sink_from_config, CompletionSink};
use crate::config::BridgeConfig;
use crate::controller::LineController;
use crate::dispatch::LineDispatcher;
use crate::registry::ActiveLotRegistry;
use crate::repository::LotRepository;
use crate::transport::{Connector, TcpConnector};

#[derive(Debug, Error)]
pub enum StartError {
    #[error("failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("failed to open completion log: {0}")]
    CompletionLog(String),
}

/// Multi-threaded tokio runtime owned by the bridge.
pub struct BridgeRuntime {
    runtime: Runtime,
}

impl BridgeRuntime {
    pub fn new() -> std::io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("potline-bridge")
            .enable_all()
            .build()?;
        Ok(Self { runtime })
    }

    pub fn handle(&self) -> &Handle {
        self.runtime.handle()
    }

    /// Run `future` to completion from synchronous code.
    ///
    /// Must not be called from within an async context.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

/// Controller, dispatcher and registry running on their own runtime.
///
/// Dropping the bridge shuts the runtime down; queued writes that have not
/// started yet are discarded.
pub struct Bridge {
    controller: Arc<LineController>,
    dispatcher: Arc<LineDispatcher>,
    registry: Arc<ActiveLotRegistry>,
    runtime: BridgeRuntime,
}

impl Bridge {
    /// Bridge talking to the gateway over TCP.
    pub fn start(
        config: &BridgeConfig,
        repository: Arc<dyn LotRepository>,
    ) -> Result<Self, StartError> {
        let completions =
            completion_sink_from_config(&config.completion_log).map_err(StartError::CompletionLog)?;
        Self::with_parts(config, Arc::new(TcpConnector), repository, completions)
    }

    pub fn with_parts(
        config: &BridgeConfig,
        connector: Arc<dyn Connector>,
        repository: Arc<dyn LotRepository>,
        completions: Arc<dyn CompletionSink>,
    ) -> Result<Self, StartError> {
        let runtime = BridgeRuntime::new()?;
        let controller = Arc::new(LineController::new(
            connector,
            config.connection.clone(),
            &config.retry,
        ));
        let dispatcher = Arc::new(LineDispatcher::spawn(
            runtime.handle(),
            Arc::clone(&controller),
        ));
        let registry = Arc::new(ActiveLotRegistry::new(
            repository,
            dispatcher.clone(),
            completions,
        ));
        info!(
            "Bridge started for {} (namespace {})",
            config.connection.endpoint, config.connection.namespace_uri
        );
        Ok(Self {
            controller,
            dispatcher,
            registry,
            runtime,
        })
    }

    pub fn controller(&self) -> &Arc<LineController> {
        &self.controller
    }

    pub fn dispatcher(&self) -> &Arc<LineDispatcher> {
        &self.dispatcher
    }

    pub fn registry(&self) -> &Arc<ActiveLotRegistry> {
        &self.registry
    }

    pub fn runtime(&self) -> &BridgeRuntime {
        &self.runtime
    }

    /// Reset both lines to lot 0, blocking the caller.
    pub fn initialize_lines(&self) -> bool {
        let controller = Arc::clone(&self.controller);
        self.runtime
            .block_on(async move { controller.initialize_lines().await })
    }
}
