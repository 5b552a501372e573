// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Controller: the public operation surface of one server node
//!
//! Every operation runs as one command on the node's command loop. The
//! background loops submit commands the same way, so they never interleave
//! with client operations on the same node.

use crate::actor::CommandActor;
use crate::assign::ResourceHints;
use crate::error::EngineError;
use crate::runtime::{ClusterInfo, RetentionReport, Runtime, RuntimeDeps, SweepReport};
use colony_adapters::{ProcessFilter, Subscription};
use colony_core::{
    Attribute, AttributeId, Clock, Colony, ColonyStatistics, Cron, CronId, Executor, ExecutorId,
    FunctionSpec, Generator, GeneratorArg, GeneratorId, IdGen, Process, ProcessGraph,
    ProcessGraphId, ProcessId, ProcessState, ServerConfig, WorkflowSpec,
};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

pub struct Controller<C: Clock, I: IdGen> {
    runtime: Arc<Runtime<C, I>>,
    actor: CommandActor,
    shutdown_tx: watch::Sender<bool>,
    loops: Mutex<Vec<JoinHandle<()>>>,
}

impl<C: Clock, I: IdGen> Controller<C, I> {
    /// Build a node and start its command loop, without background loops
    pub fn new(deps: RuntimeDeps, config: ServerConfig, clock: C, ids: I) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            runtime: Arc::new(Runtime::new(deps, config, clock, ids)),
            actor: CommandActor::spawn(),
            shutdown_tx,
            loops: Mutex::new(Vec::new()),
        }
    }

    /// Build a node, learn its leadership and start every background loop
    pub async fn start(deps: RuntimeDeps, config: ServerConfig, clock: C, ids: I) -> Self {
        let controller = Self::new(deps, config, clock, ids);
        controller.refresh_leadership().await;
        controller.spawn_loops();
        tracing::info!(
            node = controller.runtime.node().name(),
            leader = controller.is_leader(),
            "controller started"
        );
        controller
    }

    pub fn node_name(&self) -> &str {
        self.runtime.node().name()
    }

    /// Leadership as of the last poll
    pub fn is_leader(&self) -> bool {
        self.runtime.node().is_leader()
    }

    async fn run<T, F, Fut>(&self, op: &'static str, f: F) -> Result<T, EngineError>
    where
        T: Send + 'static,
        F: FnOnce(Arc<Runtime<C, I>>) -> Fut,
        Fut: Future<Output = Result<T, EngineError>> + Send + 'static,
    {
        self.actor.call(op, f(Arc::clone(&self.runtime))).await
    }

    // Colonies and executors

    pub async fn add_colony(&self, colony: Colony) -> Result<Colony, EngineError> {
        self.run("add_colony", |rt| async move { rt.add_colony(colony).await })
            .await
    }

    pub async fn remove_colony(&self, name: &str) -> Result<(), EngineError> {
        let name = name.to_string();
        self.run("remove_colony", |rt| async move { rt.remove_colony(&name).await })
            .await
    }

    pub async fn get_colony(&self, name: &str) -> Result<Colony, EngineError> {
        let name = name.to_string();
        self.run("get_colony", |rt| async move { rt.get_colony(&name).await })
            .await
    }

    pub async fn get_colonies(&self) -> Result<Vec<Colony>, EngineError> {
        self.run("get_colonies", |rt| async move { rt.get_colonies().await })
            .await
    }

    pub async fn add_executor(
        &self,
        name: &str,
        executor_type: &str,
        colony_name: &str,
    ) -> Result<Executor, EngineError> {
        let (name, executor_type, colony_name) = (
            name.to_string(),
            executor_type.to_string(),
            colony_name.to_string(),
        );
        self.run("add_executor", |rt| async move {
            rt.add_executor(&name, &executor_type, &colony_name).await
        })
        .await
    }

    pub async fn approve_executor(&self, id: &ExecutorId) -> Result<Executor, EngineError> {
        let id = id.clone();
        self.run("approve_executor", |rt| async move { rt.approve_executor(&id).await })
            .await
    }

    pub async fn reject_executor(&self, id: &ExecutorId) -> Result<Executor, EngineError> {
        let id = id.clone();
        self.run("reject_executor", |rt| async move { rt.reject_executor(&id).await })
            .await
    }

    pub async fn remove_executor(&self, id: &ExecutorId) -> Result<(), EngineError> {
        let id = id.clone();
        self.run("remove_executor", |rt| async move { rt.remove_executor(&id).await })
            .await
    }

    pub async fn get_executor(&self, id: &ExecutorId) -> Result<Executor, EngineError> {
        let id = id.clone();
        self.run("get_executor", |rt| async move { rt.get_executor(&id).await })
            .await
    }

    pub async fn get_executors(&self, colony_name: &str) -> Result<Vec<Executor>, EngineError> {
        let colony_name = colony_name.to_string();
        self.run("get_executors", |rt| async move { rt.get_executors(&colony_name).await })
            .await
    }

    // Processes

    pub async fn submit_process(&self, spec: FunctionSpec) -> Result<Process, EngineError> {
        self.run("submit_process", |rt| async move { rt.submit_process(spec).await })
            .await
    }

    /// Assign one waiting process to an executor
    ///
    /// With a timeout, waits for work to appear until the deadline instead of
    /// returning `NoWorkAvailable` straight away. Lost claim races are
    /// reported as `NoWorkAvailable`.
    pub async fn assign(
        &self,
        executor_id: &ExecutorId,
        colony_name: &str,
        hints: ResourceHints,
        timeout: Option<Duration>,
    ) -> Result<Process, EngineError> {
        let Some(timeout) = timeout else {
            return self.try_assign(executor_id, colony_name, hints).await;
        };

        let deadline = Instant::now() + timeout;
        let filter = ProcessFilter::colony(colony_name).with_state(ProcessState::Waiting);
        let mut waiting = Subscription::new(self.runtime.bus().clone(), filter);
        loop {
            match self.try_assign(executor_id, colony_name, hints).await {
                Err(EngineError::NoWorkAvailable) => {
                    let left = deadline.saturating_duration_since(Instant::now());
                    if left.is_zero() || waiting.next(left).await.is_none() {
                        return Err(EngineError::NoWorkAvailable);
                    }
                }
                other => return other,
            }
        }
    }

    async fn try_assign(
        &self,
        executor_id: &ExecutorId,
        colony_name: &str,
        hints: ResourceHints,
    ) -> Result<Process, EngineError> {
        let executor_id = executor_id.clone();
        let colony_name = colony_name.to_string();
        let result = self
            .run("assign", |rt| async move {
                rt.assign(&executor_id, &colony_name, hints).await
            })
            .await;
        match result {
            Err(EngineError::Conflict { .. }) => Err(EngineError::NoWorkAvailable),
            other => other,
        }
    }

    pub async fn close_successful(
        &self,
        process_id: &ProcessId,
        executor_id: &ExecutorId,
        output: Vec<serde_json::Value>,
    ) -> Result<Process, EngineError> {
        let (process_id, executor_id) = (process_id.clone(), executor_id.clone());
        self.run("close_successful", |rt| async move {
            rt.close_successful(&process_id, &executor_id, output).await
        })
        .await
    }

    pub async fn close_failed(
        &self,
        process_id: &ProcessId,
        executor_id: &ExecutorId,
        errors: Vec<String>,
    ) -> Result<Process, EngineError> {
        let (process_id, executor_id) = (process_id.clone(), executor_id.clone());
        self.run("close_failed", |rt| async move {
            rt.close_failed(&process_id, &executor_id, errors).await
        })
        .await
    }

    pub async fn unassign_process(
        &self,
        process_id: &ProcessId,
        executor_id: &ExecutorId,
    ) -> Result<Process, EngineError> {
        let (process_id, executor_id) = (process_id.clone(), executor_id.clone());
        self.run("unassign_process", |rt| async move {
            rt.unassign_process(&process_id, &executor_id).await
        })
        .await
    }

    pub async fn get_process(&self, id: &ProcessId) -> Result<Process, EngineError> {
        let id = id.clone();
        self.run("get_process", |rt| async move { rt.get_process(&id).await })
            .await
    }

    pub async fn get_processes(
        &self,
        colony_name: &str,
        state: Option<ProcessState>,
        limit: Option<usize>,
    ) -> Result<Vec<Process>, EngineError> {
        let colony_name = colony_name.to_string();
        self.run("get_processes", |rt| async move {
            rt.get_processes(&colony_name, state, limit).await
        })
        .await
    }

    pub async fn remove_process(&self, id: &ProcessId) -> Result<(), EngineError> {
        let id = id.clone();
        self.run("remove_process", |rt| async move { rt.remove_process(&id).await })
            .await
    }

    /// Wait until the process reaches `state`, or `None` on timeout
    pub async fn wait_for_process(
        &self,
        id: &ProcessId,
        state: ProcessState,
        timeout: Duration,
    ) -> Result<Option<Process>, EngineError> {
        let filter = ProcessFilter::process(id.clone()).with_state(state);
        let mut changes = Subscription::new(self.runtime.bus().clone(), filter);
        match self.get_process(id).await? {
            process if process.state == state => Ok(Some(process)),
            _ => Ok(changes.next(timeout).await),
        }
    }

    pub async fn add_attribute(&self, attribute: Attribute) -> Result<Attribute, EngineError> {
        self.run("add_attribute", |rt| async move { rt.add_attribute(attribute).await })
            .await
    }

    pub async fn get_attribute(&self, id: &AttributeId) -> Result<Attribute, EngineError> {
        let id = id.clone();
        self.run("get_attribute", |rt| async move { rt.get_attribute(&id).await })
            .await
    }

    pub async fn get_attributes(&self, process_id: &ProcessId) -> Result<Vec<Attribute>, EngineError> {
        let process_id = process_id.clone();
        self.run("get_attributes", |rt| async move { rt.get_attributes(&process_id).await })
            .await
    }

    pub async fn colony_statistics(&self, colony_name: &str) -> Result<ColonyStatistics, EngineError> {
        let colony_name = colony_name.to_string();
        self.run("colony_statistics", |rt| async move {
            rt.colony_statistics(&colony_name).await
        })
        .await
    }

    pub async fn pause_assignments(&self, colony_name: &str) -> Result<(), EngineError> {
        let colony_name = colony_name.to_string();
        self.run("pause_assignments", |rt| async move {
            rt.pause_assignments(&colony_name).await
        })
        .await
    }

    pub async fn resume_assignments(&self, colony_name: &str) -> Result<(), EngineError> {
        let colony_name = colony_name.to_string();
        self.run("resume_assignments", |rt| async move {
            rt.resume_assignments(&colony_name).await
        })
        .await
    }

    // Workflows

    pub async fn submit_workflow(&self, workflow: WorkflowSpec) -> Result<ProcessGraph, EngineError> {
        self.run("submit_workflow", |rt| async move { rt.submit_workflow(workflow).await })
            .await
    }

    pub async fn get_process_graph(&self, id: &ProcessGraphId) -> Result<ProcessGraph, EngineError> {
        let id = id.clone();
        self.run("get_process_graph", |rt| async move { rt.get_process_graph(&id).await })
            .await
    }

    pub async fn get_process_graphs(
        &self,
        colony_name: &str,
        state: Option<ProcessState>,
    ) -> Result<Vec<ProcessGraph>, EngineError> {
        let colony_name = colony_name.to_string();
        self.run("get_process_graphs", |rt| async move {
            rt.get_process_graphs(&colony_name, state).await
        })
        .await
    }

    pub async fn remove_process_graph(&self, id: &ProcessGraphId) -> Result<(), EngineError> {
        let id = id.clone();
        self.run("remove_process_graph", |rt| async move {
            rt.remove_process_graph(&id).await
        })
        .await
    }

    // Generators

    pub async fn add_generator(&self, generator: Generator) -> Result<Generator, EngineError> {
        self.run("add_generator", |rt| async move { rt.add_generator(generator).await })
            .await
    }

    pub async fn pack_generator(
        &self,
        id: &GeneratorId,
        arg: impl Into<String>,
    ) -> Result<GeneratorArg, EngineError> {
        let (id, arg) = (id.clone(), arg.into());
        self.run("pack_generator", |rt| async move { rt.pack_generator(&id, arg).await })
            .await
    }

    pub async fn get_generator(&self, id: &GeneratorId) -> Result<Generator, EngineError> {
        let id = id.clone();
        self.run("get_generator", |rt| async move { rt.get_generator(&id).await })
            .await
    }

    pub async fn get_generators(&self, colony_name: &str) -> Result<Vec<Generator>, EngineError> {
        let colony_name = colony_name.to_string();
        self.run("get_generators", |rt| async move { rt.get_generators(&colony_name).await })
            .await
    }

    pub async fn remove_generator(&self, id: &GeneratorId) -> Result<(), EngineError> {
        let id = id.clone();
        self.run("remove_generator", |rt| async move { rt.remove_generator(&id).await })
            .await
    }

    // Crons

    pub async fn add_cron(&self, cron: Cron) -> Result<Cron, EngineError> {
        self.run("add_cron", |rt| async move { rt.add_cron(cron).await })
            .await
    }

    pub async fn run_cron(&self, id: &CronId) -> Result<ProcessGraph, EngineError> {
        let id = id.clone();
        self.run("run_cron", |rt| async move { rt.run_cron(&id).await })
            .await
    }

    pub async fn get_cron(&self, id: &CronId) -> Result<Cron, EngineError> {
        let id = id.clone();
        self.run("get_cron", |rt| async move { rt.get_cron(&id).await })
            .await
    }

    pub async fn get_crons(&self, colony_name: &str) -> Result<Vec<Cron>, EngineError> {
        let colony_name = colony_name.to_string();
        self.run("get_crons", |rt| async move { rt.get_crons(&colony_name).await })
            .await
    }

    pub async fn remove_cron(&self, id: &CronId) -> Result<(), EngineError> {
        let id = id.clone();
        self.run("remove_cron", |rt| async move { rt.remove_cron(&id).await })
            .await
    }

    // Cluster

    pub async fn cluster_info(&self) -> Result<ClusterInfo, EngineError> {
        self.run("cluster_info", |rt| async move { rt.cluster_info().await })
            .await
    }

    // Background work, also callable directly for deterministic tests

    /// Poll membership and update the cached leadership flag
    pub async fn refresh_leadership(&self) -> bool {
        self.runtime.leader().try_become_leader().await
    }

    pub async fn sweep_timeouts(&self) -> Result<SweepReport, EngineError> {
        self.run("sweep_timeouts", |rt| async move { rt.sweep_timeouts().await })
            .await
    }

    pub async fn trigger_generators(&self) -> Result<usize, EngineError> {
        self.run("trigger_generators", |rt| async move { rt.trigger_generators().await })
            .await
    }

    pub async fn trigger_crons(&self) -> Result<usize, EngineError> {
        self.run("trigger_crons", |rt| async move { rt.trigger_crons().await })
            .await
    }

    pub async fn sweep_retention(&self) -> Result<RetentionReport, EngineError> {
        self.run("sweep_retention", |rt| async move { rt.sweep_retention().await })
            .await
    }

    /// Start the leader poll, timeout sweep, generator, cron and retention loops
    pub fn spawn_loops(&self) {
        let config = self.runtime.config().clone();
        let mut loops = vec![
            self.spawn_leader_poll(config.leader.poll_interval),
            self.spawn_loop("sweep_timeouts", config.timeouts.sweep_interval, false, |rt| async move {
                rt.sweep_timeouts().await.map(|_| ())
            }),
            self.spawn_loop("trigger_generators", config.generators.check_interval, true, |rt| async move {
                rt.trigger_generators().await.map(|_| ())
            }),
            self.spawn_loop("trigger_crons", config.crons.check_interval, true, |rt| async move {
                rt.trigger_crons().await.map(|_| ())
            }),
        ];
        if config.retention.enabled {
            loops.push(self.spawn_loop("sweep_retention", config.retention.interval, true, |rt| async move {
                rt.sweep_retention().await.map(|_| ())
            }));
        }
        self.loops
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(loops);
    }

    fn spawn_leader_poll(&self, interval: Duration) -> JoinHandle<()> {
        let runtime = Arc::clone(&self.runtime);
        let mut shutdown = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown.changed() => break,
                }
                if runtime.node().is_stopping() {
                    break;
                }
                runtime.leader().try_become_leader().await;
            }
            tracing::debug!(task = "leader_poll", "background loop stopped");
        })
    }

    /// Periodically submit `tick` as a command; leader-only loops skip ticks
    /// while this node is a follower
    fn spawn_loop<F, Fut>(
        &self,
        name: &'static str,
        interval: Duration,
        leader_only: bool,
        tick: F,
    ) -> JoinHandle<()>
    where
        F: Fn(Arc<Runtime<C, I>>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), EngineError>> + Send + 'static,
    {
        let actor = self.actor.clone();
        let runtime = Arc::clone(&self.runtime);
        let mut shutdown = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown.changed() => break,
                }
                if runtime.node().is_stopping() {
                    break;
                }
                if leader_only && !runtime.node().is_leader() {
                    continue;
                }
                // Failures are logged by the command loop and retried next tick
                if let Err(EngineError::Stopped) = actor.call(name, tick(Arc::clone(&runtime))).await {
                    break;
                }
            }
            tracing::debug!(task = name, "background loop stopped");
        })
    }

    /// Stop the background loops and the command loop, finishing queued commands
    pub async fn shutdown(&self) {
        self.runtime.node().set_stopping();
        let _ = self.shutdown_tx.send(true);
        self.actor.stop().await;

        let loops = std::mem::take(&mut *self.loops.lock().unwrap_or_else(|e| e.into_inner()));
        for handle in loops {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "background loop terminated abnormally");
            }
        }
        tracing::info!(node = self.runtime.node().name(), "controller stopped");
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
