// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cdflow contributors

//! Serializable hand-off for external renderers
//!
//! Pipelines are referenced by name so the output can be turned into any
//! concrete CI configuration format without access to graph internals.

use serde::Serialize;

use crate::pipeline::{Container, NodeId, PipelineGraph, PipelineNode};

/// Groups, pipelines and edges of a finished configuration
#[derive(Debug, Serialize)]
pub struct ConfigurationExport<'a> {
    pub groups: Vec<GroupExport>,
    pub pipelines: Vec<&'a PipelineNode>,
    pub edges: Vec<EdgeExport>,
}

/// Container nesting by pipeline name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GroupExport {
    Sequence {
        children: Vec<GroupExport>,
    },
    Parallel {
        #[serde(skip_serializing_if = "Option::is_none")]
        fork: Option<String>,
        children: Vec<GroupExport>,
    },
    Pipeline {
        name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeExport {
    pub from: String,
    pub to: String,
}

impl<'a> ConfigurationExport<'a> {
    pub fn new(graph: &'a PipelineGraph, groups: &[Container]) -> Self {
        Self {
            groups: groups.iter().map(|g| export_container(g, graph)).collect(),
            pipelines: graph.nodes().collect(),
            edges: graph
                .edge_names()
                .into_iter()
                .map(|(from, to)| EdgeExport { from, to })
                .collect(),
        }
    }
}

fn export_container(container: &Container, graph: &PipelineGraph) -> GroupExport {
    let children = |children: &[Container]| -> Vec<GroupExport> {
        children
            .iter()
            .map(|c| export_container(c, graph))
            .collect()
    };

    match container {
        Container::Sequence(members) => GroupExport::Sequence {
            children: children(members),
        },
        Container::Parallel { children: members, fork } => GroupExport::Parallel {
            fork: fork.map(|id| name_of(graph, id)),
            children: children(members),
        },
        Container::Pipeline(id) => GroupExport::Pipeline {
            name: name_of(graph, *id),
        },
    }
}

fn name_of(graph: &PipelineGraph, id: NodeId) -> String {
    graph
        .node(id)
        .map(|node| node.name.clone())
        .unwrap_or_else(|| id.to_string())
}
