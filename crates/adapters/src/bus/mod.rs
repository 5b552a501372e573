// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process change notification
//!
//! The engine publishes every stored process change. Subscribers register a
//! filter and receive matching processes on their own channel. A waiting
//! subscriber holds a [`Subscription`], which removes the registration when
//! dropped; the publisher never does.

mod process_bus;

pub use process_bus::ProcessBus;

use async_trait::async_trait;
use colony_core::{Process, ProcessId, ProcessState};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Receiver for matching process changes
pub type ProcessReceiver = mpsc::UnboundedReceiver<Process>;

/// Identifies one subscription on a bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Which process changes a subscriber wants
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessFilter {
    pub colony_name: Option<String>,
    pub process_id: Option<ProcessId>,
    pub state: Option<ProcessState>,
    pub executor_type: Option<String>,
}

impl ProcessFilter {
    pub fn process(id: ProcessId) -> Self {
        Self {
            process_id: Some(id),
            ..Self::default()
        }
    }

    pub fn colony(colony_name: impl Into<String>) -> Self {
        Self {
            colony_name: Some(colony_name.into()),
            ..Self::default()
        }
    }

    pub fn with_state(mut self, state: ProcessState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_executor_type(mut self, executor_type: impl Into<String>) -> Self {
        self.executor_type = Some(executor_type.into());
        self
    }

    pub fn matches(&self, process: &Process) -> bool {
        self.colony_name
            .as_ref()
            .is_none_or(|c| &process.colony_name == c)
            && self.process_id.as_ref().is_none_or(|id| &process.id == id)
            && self.state.is_none_or(|s| process.state == s)
            && self
                .executor_type
                .as_ref()
                .is_none_or(|t| &process.spec.conditions.executor_type == t)
    }
}

/// Wait for the next process on `rx`, giving up after `timeout`
async fn next_process(rx: &mut ProcessReceiver, timeout: Duration) -> Option<Process> {
    tokio::time::timeout(timeout, rx.recv()).await.ok().flatten()
}

/// Fan-out of process changes to subscribers
#[async_trait]
pub trait EventBus: Send + Sync + 'static {
    /// Deliver a changed process to every matching subscriber
    fn publish(&self, process: &Process);

    fn subscribe(&self, filter: ProcessFilter) -> (SubscriberId, ProcessReceiver);

    fn unsubscribe(&self, id: SubscriberId);

    /// Wait for the first matching change, unregistering afterwards
    ///
    /// The registration is also removed when the returned future is dropped
    /// before it completes.
    async fn wait_for(&self, filter: ProcessFilter, timeout: Duration) -> Option<Process> {
        let (id, mut rx) = self.subscribe(filter);
        let _registered = Registered { bus: self, id };
        next_process(&mut rx, timeout).await
    }
}

struct Registered<'a, B: EventBus + ?Sized> {
    bus: &'a B,
    id: SubscriberId,
}

impl<B: EventBus + ?Sized> Drop for Registered<'_, B> {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.id);
    }
}

/// A live registration on a shared bus
///
/// Unsubscribes when dropped, including when the future holding it is
/// cancelled.
pub struct Subscription {
    bus: Arc<dyn EventBus>,
    id: SubscriberId,
    rx: ProcessReceiver,
}

impl Subscription {
    pub fn new(bus: Arc<dyn EventBus>, filter: ProcessFilter) -> Self {
        let (id, rx) = bus.subscribe(filter);
        Self { bus, id, rx }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next matching process, or `None` once `timeout` passes
    pub async fn next(&mut self, timeout: Duration) -> Option<Process> {
        next_process(&mut self.rx, timeout).await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.id);
    }
}
