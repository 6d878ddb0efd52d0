//! Validation of stage declarations before a pipeline is registered.

use crate::core::StageDefinition;
use crate::errors::{CycleDetectedError, PipelineValidationError, StagewatchError};
use std::collections::{HashMap, HashSet};

/// Checks that `stages` form a runnable dependency graph.
///
/// Rejects empty pipelines, duplicate stage ids, dependencies on undeclared
/// stages and dependency cycles, in that order.
pub fn validate_stages(stages: &[StageDefinition]) -> Result<(), StagewatchError> {
    if stages.is_empty() {
        return Err(PipelineValidationError::empty().into());
    }

    let mut by_id: HashMap<&str, &StageDefinition> = HashMap::with_capacity(stages.len());
    for stage in stages {
        if by_id.insert(stage.id.as_str(), stage).is_some() {
            return Err(PipelineValidationError::duplicate_stage(&stage.id).into());
        }
    }

    for stage in stages {
        if let Some(dep) = stage.dependencies.iter().find(|d| !by_id.contains_key(d.as_str())) {
            return Err(PipelineValidationError::unknown_dependency(&stage.id, dep).into());
        }
    }

    detect_cycles(stages, &by_id).map_err(Into::into)
}

fn detect_cycles(
    stages: &[StageDefinition],
    by_id: &HashMap<&str, &StageDefinition>,
) -> Result<(), CycleDetectedError> {
    let mut visited = HashSet::new();
    let mut on_stack = HashSet::new();
    let mut path = Vec::new();

    // Declaration order keeps the reported cycle deterministic.
    for stage in stages {
        if !visited.contains(stage.id.as_str()) {
            if let Some(cycle) = dfs_cycle(&stage.id, by_id, &mut visited, &mut on_stack, &mut path) {
                return Err(CycleDetectedError::new(cycle));
            }
        }
    }
    Ok(())
}

fn dfs_cycle<'a>(
    node: &'a str,
    by_id: &HashMap<&str, &'a StageDefinition>,
    visited: &mut HashSet<&'a str>,
    on_stack: &mut HashSet<&'a str>,
    path: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    visited.insert(node);
    on_stack.insert(node);
    path.push(node);

    if let Some(def) = by_id.get(node) {
        for dep in &def.dependencies {
            let dep = dep.as_str();
            if !visited.contains(dep) {
                if let Some(cycle) = dfs_cycle(dep, by_id, visited, on_stack, path) {
                    return Some(cycle);
                }
            } else if on_stack.contains(dep) {
                let start = path.iter().position(|n| *n == dep).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].iter().map(|s| (*s).to_string()).collect();
                cycle.push(dep.to_string());
                return Some(cycle);
            }
        }
    }

    path.pop();
    on_stack.remove(node);
    None
}
