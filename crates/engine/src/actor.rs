// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command actor
//!
//! Every mutating operation on a node runs as a job on one dedicated task,
//! strictly one after another. Callers suspend twice: once until the job is
//! accepted by the queue, then until its reply arrives.

use crate::error::EngineError;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::Instrument;

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

enum Command {
    Run(Job),
    Stop,
}

/// Handle to a node's command loop; clones share the same loop
#[derive(Clone)]
pub struct CommandActor {
    tx: mpsc::Sender<Command>,
    handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl CommandActor {
    /// Start the command loop on the current tokio runtime
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel(1);
        let handle = tokio::spawn(run_loop(rx));
        Self {
            tx,
            handle: Arc::new(Mutex::new(Some(handle))),
        }
    }

    /// Run `job` on the command loop and wait for its result
    pub async fn call<T, F>(&self, op: &'static str, job: F) -> Result<T, EngineError>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, EngineError>> + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let span = tracing::info_span!("command", op);
        let job = async move {
            let start = Instant::now();
            let result = job.await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(_) => tracing::debug!(elapsed_ms, "completed"),
                Err(e) if e.is_expected() => tracing::debug!(elapsed_ms, outcome = %e, "completed"),
                Err(e) => tracing::warn!(elapsed_ms, error = %e, "failed"),
            }
            // The caller may have given up waiting
            let _ = reply_tx.send(result);
        }
        .instrument(span);

        self.tx
            .send(Command::Run(Box::pin(job)))
            .await
            .map_err(|_| EngineError::Stopped)?;
        reply_rx.await.map_err(|_| EngineError::Stopped)?
    }

    /// Stop accepting work, finish queued jobs and wait for the loop to exit
    pub async fn stop(&self) {
        let _ = self.tx.send(Command::Stop).await;
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "command loop terminated abnormally");
            }
        }
    }
}

async fn run_loop(mut rx: mpsc::Receiver<Command>) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Run(job) => job.await,
            Command::Stop => break,
        }
    }

    rx.close();
    while let Some(command) = rx.recv().await {
        if let Command::Run(job) = command {
            job.await;
        }
    }
    tracing::debug!("command loop stopped");
}

#[cfg(test)]
#[path = "actor_tests.rs"]
mod tests;
