// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cdflow contributors

//! Pipeline dependency graph
//!
//! [`GraphBuilder`] walks the declared groups and lets every container add
//! its vertices and edges. The resulting [`PipelineGraph`] is keyed by
//! [`NodeId`], so two pipelines that happen to share a name stay distinct.

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;
use tracing::{debug, trace};

use crate::errors::{CdflowError, CdflowResult};
use crate::pipeline::{Container, NodeId, PipelineNode};

/// Directed "must complete before" graph of pipelines
#[derive(Debug, Clone, Default)]
pub struct PipelineGraph {
    graph: DiGraph<PipelineNode, ()>,
    id_to_index: HashMap<NodeId, NodeIndex>,
}

impl PipelineGraph {
    /// Number of pipelines
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Number of dependency edges
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.id_to_index.contains_key(&id)
    }

    /// Get a pipeline by id
    pub fn node(&self, id: NodeId) -> Option<&PipelineNode> {
        self.id_to_index.get(&id).map(|ix| &self.graph[*ix])
    }

    /// Get a pipeline by id for modification
    ///
    /// Meant for graph processors; the finished configuration only hands out
    /// shared references.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut PipelineNode> {
        let ix = *self.id_to_index.get(&id)?;
        Some(&mut self.graph[ix])
    }

    /// Get the first pipeline with the given name
    pub fn node_by_name(&self, name: &str) -> Option<&PipelineNode> {
        self.nodes().find(|node| node.name == name)
    }

    /// All pipelines in the order they were added
    pub fn nodes(&self) -> impl Iterator<Item = &PipelineNode> + '_ {
        self.graph.node_indices().map(move |ix| &self.graph[ix])
    }

    /// Pipelines that must finish before `id` starts
    pub fn predecessors(&self, id: NodeId) -> CdflowResult<Vec<NodeId>> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Pipelines waiting on `id`
    pub fn successors(&self, id: NodeId) -> CdflowResult<Vec<NodeId>> {
        self.neighbors(id, Direction::Outgoing)
    }

    fn neighbors(&self, id: NodeId, direction: Direction) -> CdflowResult<Vec<NodeId>> {
        let ix = self.index_of(id)?;
        let mut ids: Vec<NodeId> = self
            .graph
            .neighbors_directed(ix, direction)
            .map(|n| self.graph[n].id())
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Whether there is a direct edge `from -> to`
    pub fn has_edge(&self, from: NodeId, to: NodeId) -> bool {
        match (self.id_to_index.get(&from), self.id_to_index.get(&to)) {
            (Some(a), Some(b)) => self.graph.contains_edge(*a, *b),
            _ => false,
        }
    }

    /// All edges as `(from, to)` pipeline names, in insertion order
    pub fn edge_names(&self) -> Vec<(String, String)> {
        self.graph
            .edge_references()
            .map(|edge| {
                (
                    self.graph[edge.source()].name.clone(),
                    self.graph[edge.target()].name.clone(),
                )
            })
            .collect()
    }

    /// Pipeline names in an order that respects every edge
    pub fn topological_order_names(&self) -> CdflowResult<Vec<String>> {
        toposort(&self.graph, None)
            .map(|nodes| {
                nodes
                    .into_iter()
                    .map(|n| self.graph[n].name.clone())
                    .collect()
            })
            .map_err(|cycle| CdflowError::CircularDependency {
                pipelines: vec![self.graph[cycle.node_id()].name.clone()],
            })
    }

    /// Generate Mermaid diagram of the graph
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");

        for node in self.nodes() {
            out.push_str(&format!("    {}[{}]\n", node.name, node.name));
        }

        for (from, to) in self.edge_names() {
            out.push_str(&format!("    {} --> {}\n", from, to));
        }

        out
    }

    /// Generate DOT diagram of the graph
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph pipelines {\n");
        out.push_str("    rankdir=LR;\n");
        out.push_str("    node [shape=box, style=rounded];\n\n");

        for (from, to) in self.edge_names() {
            out.push_str(&format!("    \"{}\" -> \"{}\";\n", from, to));
        }

        // Isolated pipelines would not show up through edges
        for ix in self.graph.node_indices() {
            if self.graph.neighbors_undirected(ix).next().is_none() {
                out.push_str(&format!("    \"{}\";\n", self.graph[ix].name));
            }
        }

        out.push_str("}\n");
        out
    }

    pub(crate) fn index_of(&self, id: NodeId) -> CdflowResult<NodeIndex> {
        self.id_to_index
            .get(&id)
            .copied()
            .ok_or(CdflowError::UnknownNode { id })
    }

    pub(crate) fn inner(&self) -> &DiGraph<PipelineNode, ()> {
        &self.graph
    }
}

/// Collects vertices and edges while containers add themselves
pub struct GraphBuilder {
    pending: Vec<Option<PipelineNode>>,
    graph: PipelineGraph,
}

impl GraphBuilder {
    /// Start from the declared pipelines, indexed by [`NodeId`]
    pub(crate) fn new(nodes: Vec<PipelineNode>) -> Self {
        Self {
            pending: nodes.into_iter().map(Some).collect(),
            graph: PipelineGraph::default(),
        }
    }

    /// Build the graph for a list of top-level groups
    pub fn build(groups: &[Container], nodes: Vec<PipelineNode>) -> CdflowResult<PipelineGraph> {
        let mut builder = Self::new(nodes);

        for group in groups {
            group.add_to_graph(&mut builder)?;
        }

        let graph = builder.finish();
        debug!(
            pipelines = graph.len(),
            edges = graph.edge_count(),
            groups = groups.len(),
            "built pipeline graph"
        );
        Ok(graph)
    }

    /// Add the pipeline as a vertex; registering twice is a no-op
    pub fn register(&mut self, id: NodeId) -> CdflowResult<NodeIndex> {
        if let Some(ix) = self.graph.id_to_index.get(&id) {
            return Ok(*ix);
        }

        let node = self
            .pending
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or(CdflowError::UnknownNode { id })?;

        let ix = self.graph.graph.add_node(node);
        self.graph.id_to_index.insert(id, ix);
        Ok(ix)
    }

    /// Add a dependency edge; repeated edges are stored once
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> CdflowResult<()> {
        let a = self.register(from)?;
        let b = self.register(to)?;
        trace!(
            from = %self.graph.graph[a].name,
            to = %self.graph.graph[b].name,
            "edge"
        );
        self.graph.graph.update_edge(a, b, ());
        Ok(())
    }

    pub(crate) fn finish(self) -> PipelineGraph {
        let orphans = self.pending.iter().filter(|n| n.is_some()).count();
        if orphans > 0 {
            debug!(orphans, "pipelines outside every group were left out of the graph");
        }
        self.graph
    }
}
