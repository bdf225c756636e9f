// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Line controller building blocks.
//!
//! Retry policies and the executor that applies them, the per-call
//! operation state machine, the diagnostic status snapshot and the
//! active-lot event listeners.

pub mod events;
pub mod executor;
pub mod machine;
pub mod policies;
pub mod status;

pub use events::{ListenerId, LotEventEmitter, LotListener};
pub use executor::RetryExecutor;
pub use machine::{OperationEvent, OperationMachine, OperationPhase};
pub use policies::{
    BackoffKind, ExponentialBackoff, FixedDelay, LinearBackoff, NoRetry, RetryConfig, RetryPolicy,
};
pub use status::{ConnectionOutcome, ControllerStatus};
