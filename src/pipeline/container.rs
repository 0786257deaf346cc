// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cdflow contributors

//! Sequence and parallel composition
//!
//! A [`Container`] is either a sequence (children run one after another), a
//! parallel block (children run independently, optionally forked from one
//! earlier pipeline) or a single pipeline. Containers only know their
//! children; the boundary nodes used to wire a container into its
//! surroundings are recomputed on every call.

use crate::errors::{CdflowError, CdflowResult};
use crate::pipeline::{GraphBuilder, NodeId};

/// Composite of pipelines and nested containers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Container {
    /// Children run in declaration order
    Sequence(Vec<Container>),

    /// Children run independently
    Parallel {
        children: Vec<Container>,
        /// Pipeline that must finish before any child starts
        fork: Option<NodeId>,
    },

    /// A single pipeline
    Pipeline(NodeId),
}

impl Container {
    /// Create an empty sequence
    pub fn sequence() -> Self {
        Self::Sequence(Vec::new())
    }

    /// Create an empty parallel block
    pub fn parallel(fork: Option<NodeId>) -> Self {
        Self::Parallel {
            children: Vec::new(),
            fork,
        }
    }

    /// Direct children; a pipeline has none
    pub fn children(&self) -> &[Container] {
        match self {
            Self::Sequence(children) | Self::Parallel { children, .. } => children,
            Self::Pipeline(_) => &[],
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Vec<Container>> {
        match self {
            Self::Sequence(children) | Self::Parallel { children, .. } => Some(children),
            Self::Pipeline(_) => None,
        }
    }

    /// Nodes that start when this container is entered
    pub fn starting_nodes(&self) -> CdflowResult<Vec<NodeId>> {
        match self {
            Self::Sequence(children) => children
                .first()
                .ok_or(CdflowError::EmptySequence {
                    operation: "starting nodes",
                })?
                .starting_nodes(),
            Self::Parallel { children, .. } => {
                let mut nodes = Vec::new();
                for child in children {
                    nodes.extend(child.starting_nodes()?);
                }
                Ok(nodes)
            }
            Self::Pipeline(id) => Ok(vec![*id]),
        }
    }

    /// Nodes that must all finish before this container counts as finished
    pub fn ending_nodes(&self) -> CdflowResult<Vec<NodeId>> {
        match self {
            Self::Sequence(children) => children
                .last()
                .ok_or(CdflowError::EmptySequence {
                    operation: "ending nodes",
                })?
                .ending_nodes(),
            Self::Parallel { children, .. } => {
                let mut nodes = Vec::new();
                for child in children {
                    nodes.extend(child.ending_nodes()?);
                }
                Ok(nodes)
            }
            Self::Pipeline(id) => Ok(vec![*id]),
        }
    }

    /// Every pipeline inside this container, in declaration order
    pub fn nodes(&self) -> Vec<NodeId> {
        let mut nodes = Vec::new();
        self.collect_nodes(&mut nodes);
        nodes
    }

    fn collect_nodes(&self, out: &mut Vec<NodeId>) {
        match self {
            Self::Pipeline(id) => out.push(*id),
            _ => {
                for child in self.children() {
                    child.collect_nodes(out);
                }
            }
        }
    }

    /// Add this container's vertices and edges to the graph
    ///
    /// Children are added first; ordering edges between them follow.
    pub fn add_to_graph(&self, builder: &mut GraphBuilder) -> CdflowResult<()> {
        match self {
            Self::Sequence(children) => {
                for child in children {
                    child.add_to_graph(builder)?;
                }
                for pair in children.windows(2) {
                    connect(builder, &pair[0].ending_nodes()?, &pair[1].starting_nodes()?)?;
                }
            }
            Self::Parallel { children, fork } => {
                for child in children {
                    child.add_to_graph(builder)?;
                }
                if let Some(fork) = fork {
                    let fork_ends = Self::Pipeline(*fork).ending_nodes()?;
                    for child in children {
                        connect(builder, &fork_ends, &child.starting_nodes()?)?;
                    }
                }
            }
            Self::Pipeline(id) => {
                builder.register(*id)?;
            }
        }
        Ok(())
    }
}

/// Every `from` node gates every `to` node
fn connect(builder: &mut GraphBuilder, from: &[NodeId], to: &[NodeId]) -> CdflowResult<()> {
    for &source in from {
        for &target in to {
            builder.add_edge(source, target)?;
        }
    }
    Ok(())
}
