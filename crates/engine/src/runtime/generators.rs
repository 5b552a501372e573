// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generators: accumulate arguments, submit a workflow per batch

use super::Runtime;
use crate::error::EngineError;
use colony_core::{
    instantiate, Clock, Event, Generator, GeneratorArg, GeneratorId, IdGen, SequentialIdGen,
};

impl<C: Clock, I: IdGen> Runtime<C, I> {
    /// Store a new generator under a fresh id
    pub async fn add_generator(&self, generator: Generator) -> Result<Generator, EngineError> {
        generator.validate()?;
        instantiate(&generator.workflow, &SequentialIdGen::new("check"), &self.clock)?;
        self.require_colony(&generator.colony_name).await?;

        let generator = Generator {
            id: GeneratorId::new(self.ids.next()),
            last_run: None,
            first_pack: None,
            ..generator
        };
        self.store.add_generator(generator.clone()).await?;
        tracing::info!(
            generator_id = %generator.id,
            name = %generator.name,
            trigger = generator.trigger,
            "generator added"
        );
        Ok(generator)
    }

    /// Append one argument to a generator's pending batch
    pub async fn pack_generator(
        &self,
        id: &GeneratorId,
        arg: String,
    ) -> Result<GeneratorArg, EngineError> {
        let generator = self.get_generator(id).await?;
        let now = self.clock.now();
        let packed = self.store.add_generator_arg(id, arg, now).await?;
        if generator.first_pack.is_none() {
            self.store.update_generator(generator.packed(now)).await?;
        }
        tracing::debug!(generator_id = %id, seq = packed.seq, "generator packed");
        Ok(packed)
    }

    pub async fn get_generator(&self, id: &GeneratorId) -> Result<Generator, EngineError> {
        self.store
            .get_generator(id)
            .await?
            .ok_or_else(|| EngineError::not_found("generator", id))
    }

    pub async fn get_generators(&self, colony_name: &str) -> Result<Vec<Generator>, EngineError> {
        self.require_colony(colony_name).await?;
        Ok(self.store.get_generators(colony_name).await?)
    }

    /// Remove a generator and its pending arguments
    pub async fn remove_generator(&self, id: &GeneratorId) -> Result<(), EngineError> {
        self.store.remove_generator(id).await?;
        tracing::info!(generator_id = %id, "generator removed");
        Ok(())
    }

    /// Fire every generator that has a full batch or a timed-out partial one
    ///
    /// Returns the number of workflows submitted. A generator that fails is
    /// skipped until the next cycle.
    pub async fn trigger_generators(&self) -> Result<usize, EngineError> {
        let mut submitted = 0;
        for generator in self.store.get_all_generators().await? {
            let id = generator.id.clone();
            match self.trigger_generator(generator).await {
                Ok(count) => submitted += count,
                Err(e) => tracing::warn!(generator_id = %id, error = %e, "generator trigger failed"),
            }
        }
        Ok(submitted)
    }

    async fn trigger_generator(&self, generator: Generator) -> Result<usize, EngineError> {
        let now = self.clock.now();
        let pending = self.store.count_generator_args(&generator.id).await?;
        let batches = generator.plan(pending, now);
        if batches.is_empty() {
            return Ok(0);
        }

        let mut remaining = pending;
        for size in &batches {
            let batch = self
                .store
                .get_generator_args(&generator.id, Some(*size))
                .await?;
            let graph = self.submit_workflow(generator.workflow_for(&batch)).await?;

            // Only consume the args once the graph is stored
            let seqs: Vec<u64> = batch.iter().map(|a| a.seq).collect();
            self.store
                .remove_generator_args(&generator.id, &seqs)
                .await?;
            remaining = remaining.saturating_sub(batch.len());

            self.emit(&Event::GeneratorFired {
                id: generator.id.clone(),
                graph_id: graph.id,
                args: batch.len(),
            });
        }

        self.store
            .update_generator(generator.fired(now, remaining))
            .await?;
        Ok(batches.len())
    }
}

#[cfg(test)]
#[path = "generators_tests.rs"]
mod tests;
