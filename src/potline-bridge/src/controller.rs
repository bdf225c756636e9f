// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Remote line controller.
//!
//! Every call opens a fresh session, resolves the address and performs one
//! read or write under the retry policy. Failures never escape as panics or
//! errors to UI code: the public methods return `bool`/`Option` and record
//! the reason in [`ControllerStatus`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, warn};

use potline_core::controller::{ControllerStatus, OperationEvent, RetryConfig, RetryExecutor};
use potline_core::{key_for, BridgeError, BridgeResult, Component, Line, LotId, NodeKey};

use crate::config::ConnectionConfig;
use crate::session::{with_session, PhaseTracker};
use crate::transport::{Connector, TcpConnector};

/// Per-line outcome of [`LineController::initialize_lines_detailed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InitReport {
    pub line1: bool,
    pub line2: bool,
}

impl InitReport {
    pub fn all_succeeded(&self) -> bool {
        self.line1 && self.line2
    }

    pub fn failed_lines(&self) -> Vec<Line> {
        Line::ALL
            .into_iter()
            .filter(|line| !self.succeeded(*line))
            .collect()
    }

    pub fn succeeded(&self, line: Line) -> bool {
        match line {
            Line::One => self.line1,
            Line::Two => self.line2,
        }
    }
}

pub struct LineController {
    connector: Arc<dyn Connector>,
    config: ConnectionConfig,
    executor: RetryExecutor,
    status: Mutex<ControllerStatus>,
}

impl LineController {
    pub fn new(connector: Arc<dyn Connector>, config: ConnectionConfig, retry: &RetryConfig) -> Self {
        Self::with_executor(connector, config, RetryExecutor::new(retry.policy()))
    }

    pub fn with_executor(
        connector: Arc<dyn Connector>,
        config: ConnectionConfig,
        executor: RetryExecutor,
    ) -> Self {
        Self {
            connector,
            config,
            executor,
            status: Mutex::new(ControllerStatus::default()),
        }
    }

    /// Controller talking to the gateway over TCP.
    pub fn tcp(config: ConnectionConfig, retry: &RetryConfig) -> Self {
        Self::new(Arc::new(TcpConnector), config, retry)
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Write `lot_id` to the PC register of `line`.
    pub async fn set_active_lot(&self, line: Line, lot_id: LotId) -> bool {
        self.set_component_lot(line, Component::default(), lot_id)
            .await
    }

    pub async fn set_component_lot(&self, line: Line, component: Component, lot_id: LotId) -> bool {
        self.try_set_active_lot(line, component, lot_id)
            .await
            .is_ok()
    }

    /// Validate untyped input first; invalid input fails without any attempt.
    pub async fn set_active_lot_raw(&self, line: u8, component: &str, lot_id: LotId) -> bool {
        match NodeKey::parse(line, component) {
            Ok(key) => self.write_node(key, i64::from(lot_id)).await.is_ok(),
            Err(err) => {
                self.reject(err.into());
                false
            }
        }
    }

    /// Like [`set_component_lot`](Self::set_component_lot) but keeps the error.
    pub async fn try_set_active_lot(
        &self,
        line: Line,
        component: Component,
        lot_id: LotId,
    ) -> BridgeResult<()> {
        self.write_node(key_for(line, component), i64::from(lot_id))
            .await
    }

    /// Read the PC register of `line`. `Some(0)` means no active lot.
    pub async fn get_active_lot(&self, line: Line) -> Option<i64> {
        self.get_component_lot(line, Component::default()).await
    }

    pub async fn get_component_lot(&self, line: Line, component: Component) -> Option<i64> {
        self.read_node(key_for(line, component)).await.ok()
    }

    pub async fn get_active_lot_raw(&self, line: u8, component: &str) -> Option<i64> {
        match NodeKey::parse(line, component) {
            Ok(key) => self.read_node(key).await.ok(),
            Err(err) => {
                self.reject(err.into());
                None
            }
        }
    }

    /// Diagnostic timestamp maintained by the equipment.
    pub async fn last_updated(&self) -> Option<i64> {
        self.read_node(NodeKey::last_updated()).await.ok()
    }

    /// Reset both lines to lot 0 concurrently. True only if both succeeded.
    pub async fn initialize_lines(&self) -> bool {
        self.initialize_lines_detailed().await.all_succeeded()
    }

    pub async fn initialize_lines_detailed(&self) -> InitReport {
        let (line1, line2) = tokio::join!(
            self.set_active_lot(Line::One, 0),
            self.set_active_lot(Line::Two, 0)
        );
        if !(line1 && line2) {
            warn!("line initialization incomplete (line 1: {line1}, line 2: {line2})");
        }
        InitReport { line1, line2 }
    }

    pub fn status(&self) -> ControllerStatus {
        self.status_guard().clone()
    }

    async fn write_node(&self, key: NodeKey, value: i64) -> BridgeResult<()> {
        let label = format!("write {key}={value}");
        let tracker = PhaseTracker::new(label.as_str());
        let (connector, config, tracker_ref, key_ref) =
            (self.connector.as_ref(), &self.config, &tracker, &key);

        let result = self
            .executor
            .run(&label, move || {
                let key = key_ref.clone();
                with_session(connector, config, tracker_ref, move |session| {
                    Box::pin(async move { session.write_int(&key, value).await })
                })
            })
            .await;
        self.finish(&label, &tracker, &result);
        result
    }

    async fn read_node(&self, key: NodeKey) -> BridgeResult<i64> {
        let label = format!("read {key}");
        let tracker = PhaseTracker::new(label.as_str());
        let (connector, config, tracker_ref, key_ref) =
            (self.connector.as_ref(), &self.config, &tracker, &key);

        let result = self
            .executor
            .run(&label, move || {
                let key = key_ref.clone();
                with_session(connector, config, tracker_ref, move |session| {
                    Box::pin(async move { session.read_int(&key).await })
                })
            })
            .await;
        self.finish(&label, &tracker, &result);
        result
    }

    fn finish<T>(&self, label: &str, tracker: &PhaseTracker, result: &BridgeResult<T>) {
        let mut status = self.status_guard();
        match result {
            Ok(_) => {
                debug!("{} done after {} attempt(s)", label, tracker.attempts());
                status.record_success();
            }
            Err(err) => {
                tracker.advance(OperationEvent::GiveUp);
                status.record_failure(err, tracker.failed_in());
            }
        }
    }

    fn reject(&self, err: BridgeError) {
        warn!("rejected controller call: {}", err);
        self.status_guard().record_failure(&err, None);
    }

    fn status_guard(&self) -> MutexGuard<'_, ControllerStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    use potline_core::controller::{ConnectionOutcome, LinearBackoff, OperationPhase};

    use crate::transport::MemoryConnector;

    const NAMESPACE: &str = "urn:potline:lines";

    fn controller(connector: &MemoryConnector, attempts: u32, delay_ms: u64) -> LineController {
        let executor = RetryExecutor::new(Arc::new(LinearBackoff::new(
            attempts,
            Duration::from_millis(delay_ms),
            Duration::from_secs(1),
        )));
        LineController::with_executor(
            Arc::new(connector.clone()),
            ConnectionConfig::default(),
            executor,
        )
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let connector = MemoryConnector::new(NAMESPACE);
        let controller = controller(&connector, 3, 10);

        assert!(controller.set_active_lot(Line::One, 42).await);
        assert_eq!(controller.get_active_lot(Line::One).await, Some(42));
        assert_eq!(controller.get_active_lot(Line::Two).await, Some(0));

        let status = controller.status();
        assert_eq!(status.outcome, ConnectionOutcome::Connected);
        assert_eq!(status.operations, 3);
        assert_eq!(status.failures, 0);
        assert_eq!(connector.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_component_registers_are_independent() {
        let connector = MemoryConnector::new(NAMESPACE);
        let controller = controller(&connector, 1, 10);

        assert!(controller.set_component_lot(Line::Two, Component::Os, 17).await);
        assert_eq!(
            controller.get_component_lot(Line::Two, Component::Os).await,
            Some(17)
        );
        assert_eq!(controller.get_active_lot(Line::Two).await, Some(0));
        assert!(controller.last_updated().await.is_some_and(|ts| ts > 0));
    }

    #[tokio::test]
    async fn test_transient_failures_recovered() {
        let connector = MemoryConnector::new(NAMESPACE);
        connector.fail_next_connects(2);
        let controller = controller(&connector, 3, 10);

        let started = Instant::now();
        assert!(controller.set_active_lot(Line::One, 9).await);
        assert!(started.elapsed() >= Duration::from_millis(30));
        assert_eq!(connector.connect_count(), 3);
        assert_eq!(controller.status().outcome, ConnectionOutcome::Connected);
    }

    #[tokio::test]
    async fn test_always_failing_remote() {
        let connector = MemoryConnector::new(NAMESPACE);
        connector.set_unreachable(true);
        let controller = controller(&connector, 3, 10);

        let started = Instant::now();
        assert!(!controller.set_active_lot(Line::One, 9).await);
        assert!(started.elapsed() >= Duration::from_millis(30));
        assert_eq!(connector.connect_count(), 3);

        let status = controller.status();
        assert_eq!(status.outcome, ConnectionOutcome::Failed);
        assert!(!status.last_error.unwrap_or_default().is_empty());
        assert_eq!(status.failed_in, Some(OperationPhase::Connecting));
    }

    #[tokio::test]
    async fn test_write_failure_is_retried() {
        let connector = MemoryConnector::new(NAMESPACE);
        connector.fail_next_writes(1);
        let controller = controller(&connector, 3, 5);

        assert!(controller.set_active_lot(Line::Two, 11).await);
        assert_eq!(connector.connect_count(), 2);
        assert_eq!(connector.writes().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_input_not_attempted() {
        let connector = MemoryConnector::new(NAMESPACE);
        let controller = controller(&connector, 3, 10);

        assert!(!controller.set_active_lot_raw(3, "PC", 5).await);
        assert_eq!(controller.get_active_lot_raw(1, "XX").await, None);
        assert_eq!(connector.connect_count(), 0);

        let status = controller.status();
        assert_eq!(status.last_error_kind, Some("invalid_address"));
        assert_eq!(status.outcome, ConnectionOutcome::Unknown);
        assert_eq!(status.failures, 2);
    }

    #[tokio::test]
    async fn test_raw_input_is_case_insensitive() {
        let connector = MemoryConnector::new(NAMESPACE);
        let controller = controller(&connector, 1, 10);

        assert!(controller.set_active_lot_raw(1, "os", 8).await);
        assert_eq!(controller.get_active_lot_raw(1, "OS").await, Some(8));
    }

    #[tokio::test]
    async fn test_missing_namespace_fails_fast() {
        let connector = MemoryConnector::new("urn:someone-else");
        let controller = controller(&connector, 3, 10);

        assert!(!controller.set_active_lot(Line::One, 1).await);
        assert_eq!(connector.connect_count(), 1);

        let status = controller.status();
        assert_eq!(status.last_error_kind, Some("namespace_not_found"));
        assert!(status.last_error.unwrap_or_default().contains(NAMESPACE));
        assert_eq!(status.failed_in, Some(OperationPhase::NamespaceResolving));
    }

    #[tokio::test]
    async fn test_initialize_lines() {
        let connector = MemoryConnector::new(NAMESPACE);
        let controller = controller(&connector, 1, 10);
        assert!(controller.set_active_lot(Line::One, 5).await);

        let report = controller.initialize_lines_detailed().await;
        assert!(report.all_succeeded());
        assert_eq!(connector.value(&key_for(Line::One, Component::Pc)), Some(0));
        assert_eq!(connector.value(&key_for(Line::Two, Component::Pc)), Some(0));
    }

    #[tokio::test]
    async fn test_initialize_lines_unreachable() {
        let connector = MemoryConnector::new(NAMESPACE);
        connector.set_unreachable(true);
        let controller = controller(&connector, 2, 5);

        let report = controller.initialize_lines_detailed().await;
        assert!(!report.all_succeeded());
        assert_eq!(report.failed_lines(), vec![Line::One, Line::Two]);
        assert!(!controller.initialize_lines().await);
        assert_eq!(controller.status().failures, 4);
    }
}
