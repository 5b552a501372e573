// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow instantiation
//!
//! Turns a `WorkflowSpec` into a `ProcessGraph` plus one `Process` per
//! function spec, with dependency names resolved to process-id edges.

use crate::clock::Clock;
use crate::error::ValidationError;
use crate::graph::ProcessGraph;
use crate::id::{IdGen, ProcessGraphId, ProcessId};
use crate::process::Process;
use crate::spec::WorkflowSpec;
use std::collections::{HashMap, VecDeque};

/// A validated workflow ready to be stored atomically
#[derive(Debug, Clone)]
pub struct InstantiatedWorkflow {
    pub graph: ProcessGraph,
    pub processes: Vec<Process>,
}

/// Check names, dependencies and acyclicity, returning parent indices per spec
fn resolve_edges(workflow: &WorkflowSpec) -> Result<Vec<Vec<usize>>, ValidationError> {
    let specs = &workflow.function_specs;
    let mut by_name: HashMap<&str, usize> = HashMap::new();
    for (index, spec) in specs.iter().enumerate() {
        if spec.node_name.is_empty() {
            continue;
        }
        if by_name.insert(spec.node_name.as_str(), index).is_some() {
            return Err(ValidationError::DuplicateNode(spec.node_name.clone()));
        }
    }

    let mut parents = Vec::with_capacity(specs.len());
    for spec in specs {
        let mut resolved = Vec::with_capacity(spec.conditions.dependencies.len());
        for dependency in &spec.conditions.dependencies {
            let Some(&index) = by_name.get(dependency.as_str()) else {
                return Err(ValidationError::UnknownDependency {
                    node: spec.node_name.clone(),
                    dependency: dependency.clone(),
                });
            };
            if !resolved.contains(&index) {
                resolved.push(index);
            }
        }
        parents.push(resolved);
    }

    // Kahn: every node must be reachable in topological order
    let mut in_degree: Vec<usize> = parents.iter().map(Vec::len).collect();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); specs.len()];
    for (child, parent_list) in parents.iter().enumerate() {
        for &parent in parent_list {
            children[parent].push(child);
        }
    }
    let mut queue: VecDeque<usize> = (0..specs.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut visited = 0;
    while let Some(node) = queue.pop_front() {
        visited += 1;
        for &child in &children[node] {
            in_degree[child] -= 1;
            if in_degree[child] == 0 {
                queue.push_back(child);
            }
        }
    }
    if visited != specs.len() {
        return Err(ValidationError::Cycle);
    }

    Ok(parents)
}

/// Validate a workflow and build its graph and member processes
///
/// Specs without a colony inherit the workflow's colony; a spec naming a
/// different colony is rejected.
pub fn instantiate(
    workflow: &WorkflowSpec,
    ids: &impl IdGen,
    clock: &impl Clock,
) -> Result<InstantiatedWorkflow, ValidationError> {
    if workflow.colony_name.is_empty() {
        return Err(ValidationError::MissingField("colony_name"));
    }
    if workflow.function_specs.is_empty() {
        return Err(ValidationError::EmptyWorkflow);
    }

    let mut specs = workflow.function_specs.clone();
    for spec in &mut specs {
        if spec.conditions.colony_name.is_empty() {
            spec.conditions.colony_name = workflow.colony_name.clone();
        } else if spec.conditions.colony_name != workflow.colony_name {
            return Err(ValidationError::ColonyMismatch {
                expected: workflow.colony_name.clone(),
                actual: spec.conditions.colony_name.clone(),
            });
        }
        spec.validate()?;
    }

    let parents = resolve_edges(workflow)?;
    let graph_id = ProcessGraphId::new(ids.next());
    let process_ids: Vec<ProcessId> = specs.iter().map(|_| ProcessId::new(ids.next())).collect();

    let mut children: Vec<Vec<ProcessId>> = vec![Vec::new(); specs.len()];
    for (child, parent_list) in parents.iter().enumerate() {
        for &parent in parent_list {
            children[parent].push(process_ids[child].clone());
        }
    }

    let processes: Vec<Process> = specs
        .into_iter()
        .zip(parents.iter())
        .zip(children)
        .zip(process_ids.iter())
        .map(|(((spec, parent_list), child_ids), id)| {
            let parent_ids = parent_list.iter().map(|&p| process_ids[p].clone()).collect();
            Process::new(id.clone(), spec, clock).in_graph(graph_id.clone(), parent_ids, child_ids)
        })
        .collect();

    let roots = processes
        .iter()
        .filter(|p| p.parents.is_empty())
        .map(|p| p.id.clone())
        .collect();
    let graph = ProcessGraph::new(
        graph_id,
        workflow.colony_name.clone(),
        roots,
        process_ids,
        clock,
    );

    Ok(InstantiatedWorkflow { graph, processes })
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
