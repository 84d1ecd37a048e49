//! Grouping resolved jobs into the declared stage order.

use conveyor_core::plan::{JobGraph, ResolvedJob, StageGroup};
use conveyor_core::{Error, Result};
use std::collections::HashSet;

/// Builder for the stage-ordered job graph.
///
/// Stage order is a declared total order, not a dependency graph: the
/// document's `stages` list is authoritative and jobs keep their
/// declaration order within a stage (not significant for execution, but
/// stable for deterministic output).
pub struct GraphBuilder;

impl GraphBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build the graph, validating stage membership and name uniqueness.
    pub fn build(&self, jobs: Vec<ResolvedJob>, declared_stages: &[String]) -> Result<JobGraph> {
        if declared_stages.is_empty() {
            return Err(Error::EmptyPipeline);
        }

        let mut seen = HashSet::new();
        for job in &jobs {
            if !declared_stages.contains(&job.stage) {
                return Err(Error::UnknownStage {
                    job: job.name.clone(),
                    stage: job.stage.clone(),
                });
            }
            if !seen.insert(job.name.clone()) {
                return Err(Error::DuplicateJob(job.name.clone()));
            }
        }

        let stages = declared_stages
            .iter()
            .map(|stage| StageGroup {
                name: stage.clone(),
                jobs: jobs.iter().filter(|j| &j.stage == stage).cloned().collect(),
            })
            .collect();

        Ok(JobGraph { stages })
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
