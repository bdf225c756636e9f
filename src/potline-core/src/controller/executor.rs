// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Bounded retry loop around a fallible async operation.

use std::future::Future;
use std::sync::Arc;

use tokio::time;
use tracing::{debug, warn};

use crate::error::{BridgeError, BridgeResult};

use super::policies::RetryPolicy;

/// Runs operations under a [`RetryPolicy`].
///
/// The executor never panics on behalf of the operation: every outcome is a
/// `Result`, and after the last attempt the error of that attempt is
/// returned.
#[derive(Clone)]
pub struct RetryExecutor {
    policy: Arc<dyn RetryPolicy>,
}

impl RetryExecutor {
    pub fn new(policy: Arc<dyn RetryPolicy>) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &dyn RetryPolicy {
        self.policy.as_ref()
    }

    /// Invoke `op` until it succeeds, the policy refuses another attempt, or
    /// the attempts are exhausted.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> BridgeResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = BridgeResult<T>>,
    {
        let max = self.policy.max_attempts().max(1);
        let mut attempt = 0u32;

        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!("{} succeeded on attempt {} of {}", label, attempt + 1, max);
                    }
                    return Ok(value);
                }
                Err(err) => {
                    if attempt + 1 >= max || !self.policy.should_retry(attempt, &err) {
                        log_give_up(label, attempt, max, &err);
                        return Err(err);
                    }
                    let delay = self.policy.delay(attempt);
                    warn!(
                        "{} failed (attempt {} of {}, retrying in {:?}): {}",
                        label,
                        attempt + 1,
                        max,
                        delay,
                        err
                    );
                    time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

fn log_give_up(label: &str, attempt: u32, max: u32, err: &BridgeError) {
    if err.is_transient() {
        warn!("{} failed after {} attempt(s) of {}: {}", label, attempt + 1, max, err);
    } else {
        warn!("{} failed, not retrying: {}", label, err);
    }
}
