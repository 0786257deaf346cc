// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cdflow contributors

//! Dependency path queries
//!
//! Finds the shortest route from any pipeline accepted by a matcher down to a
//! target pipeline. The result lists the source pipeline of every edge on
//! that route, so the target itself never appears in it.

use petgraph::algo::astar;
use petgraph::graph::NodeIndex;
use tracing::debug;

use crate::config::DEFAULT_PATH_SEPARATOR;
use crate::errors::{CdflowError, CdflowResult};
use crate::pipeline::{NodeId, PipelineGraph, PipelineNode};

/// Shortest dependency path lookup
pub struct PathFinder;

impl PathFinder {
    /// Path from the closest matching ancestor to `target`, joined with `/`
    pub fn path_to_pipeline<F>(graph: &PipelineGraph, target: NodeId, matcher: F) -> CdflowResult<String>
    where
        F: Fn(&PipelineNode) -> bool,
    {
        Self::path_to_pipeline_with(graph, target, matcher, DEFAULT_PATH_SEPARATOR)
    }

    /// Same as [`PathFinder::path_to_pipeline`] with a custom separator
    pub fn path_to_pipeline_with<F>(
        graph: &PipelineGraph,
        target: NodeId,
        matcher: F,
        separator: &str,
    ) -> CdflowResult<String>
    where
        F: Fn(&PipelineNode) -> bool,
    {
        let names: Vec<&str> = Self::path_nodes(graph, target, matcher)?
            .into_iter()
            .filter_map(|id| graph.node(id))
            .map(|node| node.name.as_str())
            .collect();

        Ok(names.join(separator))
    }

    /// Edge sources along the shortest path, nearest the matched ancestor first
    ///
    /// Every matching pipeline is a candidate, the target included; a
    /// matching target yields an empty path. The candidate with the fewest
    /// edges wins; ties go to the candidate whose name sorts first, then to
    /// the one added to the graph first.
    pub fn path_nodes<F>(graph: &PipelineGraph, target: NodeId, matcher: F) -> CdflowResult<Vec<NodeId>>
    where
        F: Fn(&PipelineNode) -> bool,
    {
        let goal = graph.index_of(target)?;
        let inner = graph.inner();

        let mut best: Option<(usize, &str, Vec<NodeIndex>)> = None;
        let mut candidates = 0usize;

        for candidate in inner.node_indices() {
            if !matcher(&inner[candidate]) {
                continue;
            }
            candidates += 1;

            let Some((cost, path)) = astar(inner, candidate, |n| n == goal, |_| 1usize, |_| 0) else {
                continue;
            };

            let name = inner[candidate].name.as_str();
            let shorter = match &best {
                None => true,
                Some((best_cost, best_name, _)) => {
                    cost < *best_cost || (cost == *best_cost && name < *best_name)
                }
            };
            if shorter {
                best = Some((cost, name, path));
            }
        }

        let target_node = &inner[goal];
        let Some((cost, from, path)) = best else {
            debug!(target = %target_node.name, candidates, "no dependency path");
            return Err(CdflowError::PathNotFound {
                target: target_node.name.clone(),
                id: target,
                declared_at: target_node.declared_at().to_string(),
            });
        };

        debug!(target = %target_node.name, from, edges = cost, "resolved dependency path");

        let sources = path.split_last().map(|(_, rest)| rest).unwrap_or_default();
        Ok(sources.iter().map(|ix| inner[*ix].id()).collect())
    }
}
