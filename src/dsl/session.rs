// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cdflow contributors

//! Per-build declaration state
//!
//! Everything a declaration touches lives here: the pipelines declared so
//! far, the stack of containers still being filled, the context stack and
//! the user call sites enclosing the current declaration. Each build owns
//! its own session, so independent builds never see each other's state.

use tracing::{debug, warn};

use crate::config::{BuildOptions, ContextScope};
use crate::dsl::{Configuration, RootScope};
use crate::errors::{CdflowError, CdflowResult};
use crate::pipeline::{
    Container, Context, ContextStack, DeclarationSite, DeclarationTrace, Enhancer, GraphBuilder,
    GraphValidator, NodeId, PipelineGraph, PipelineNode,
};

/// Callback run once against the completed graph
pub type GraphProcessor = Box<dyn FnOnce(NodeId, &mut PipelineGraph) -> CdflowResult<()>>;

/// State of one configuration build
pub struct BuildSession {
    options: BuildOptions,
    nodes: Vec<PipelineNode>,
    /// Containers still being declared; the bottom one is the current group
    open: Vec<Container>,
    contexts: ContextStack,
    sites: Vec<DeclarationSite>,
    groups: Vec<Container>,
    processors: Vec<(NodeId, GraphProcessor)>,
    /// First declaration error, reported by `finish`
    failure: Option<CdflowError>,
}

impl BuildSession {
    pub fn new(options: BuildOptions) -> Self {
        Self {
            options,
            nodes: Vec::new(),
            open: Vec::new(),
            contexts: ContextStack::new(),
            sites: Vec::new(),
            groups: Vec::new(),
            processors: Vec::new(),
            failure: None,
        }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Entry point for group declarations
    pub fn root(&mut self) -> RootScope<'_> {
        RootScope { session: self }
    }

    /// Build the graph, run graph processors, then validate
    pub fn finish(self) -> CdflowResult<Configuration> {
        let Self {
            options,
            nodes,
            groups,
            processors,
            failure,
            ..
        } = self;

        if let Some(err) = failure {
            return Err(err);
        }

        let mut graph = GraphBuilder::build(&groups, nodes)?;

        debug!(processors = processors.len(), "running graph processors");
        for (id, processor) in processors {
            processor(id, &mut graph)?;
        }

        GraphValidator::validate(&graph, &options)?;

        Ok(Configuration::new(graph, groups, options))
    }

    pub(crate) fn open_group(&mut self, group: Container, site: DeclarationSite) {
        debug!(%site, "opening pipeline group");
        self.sites.push(site);
        self.open.push(group);
        // Group-level enhancers land here
        self.open_context(|_| {});
    }

    pub(crate) fn close_group(&mut self) {
        self.close_context();
        self.close_block();
        debug!(groups = self.groups.len(), "closed pipeline group");
    }

    pub(crate) fn open_block(&mut self, block: Container, site: DeclarationSite) {
        self.sites.push(site);
        self.open.push(block);
    }

    /// Attach the innermost open container to its parent
    pub(crate) fn close_block(&mut self) {
        self.sites.pop();
        let Some(block) = self.open.pop() else {
            return;
        };
        match self.open.last_mut().and_then(Container::children_mut) {
            Some(children) => children.push(block),
            None => self.groups.push(block),
        }
    }

    /// Whether `fork` was declared in this build inside the current group
    pub(crate) fn owns_fork(&self, fork: NodeId) -> bool {
        fork.index() < self.nodes.len() && self.open.iter().any(|c| c.nodes().contains(&fork))
    }

    /// Record a declaration error; only the first one is kept
    pub(crate) fn fail(&mut self, err: CdflowError) {
        warn!(error = %err, "invalid declaration");
        self.failure.get_or_insert(err);
    }

    pub(crate) fn open_context(&mut self, init: impl FnOnce(&mut Context)) {
        let mut context = Context::new(self.nodes.len());
        init(&mut context);
        self.contexts.push(context);
    }

    /// Pop the innermost context and apply its enhancers
    pub(crate) fn close_context(&mut self) {
        let Some(context) = self.contexts.pop() else {
            return;
        };

        let reach: Vec<NodeId> = match self.options.context_scope {
            ContextScope::Group => self.open.iter().flat_map(Container::nodes).collect(),
            ContextScope::Body => (context.first_node()..self.nodes.len()).map(NodeId).collect(),
        };

        if !context.enhancers().is_empty() {
            for id in &reach {
                context.apply_to(&mut self.nodes[id.0]);
            }
        }

        debug!(
            enhancers = context.enhancers().len(),
            pipelines = reach.len(),
            depth = self.contexts.depth(),
            "closed context"
        );
    }

    pub(crate) fn enter(&mut self, site: DeclarationSite) {
        self.sites.push(site);
    }

    pub(crate) fn leave(&mut self) {
        self.sites.pop();
    }

    pub(crate) fn enhance(&mut self, enhancer: Enhancer) {
        match self.contexts.current_mut() {
            Some(context) => context.enhance(enhancer),
            None => warn!(kind = enhancer.kind(), "no open context, enhancer dropped"),
        }
    }

    pub(crate) fn set_data(&mut self, key: String, value: String) {
        if let Some(context) = self.contexts.current_mut() {
            context.set_data(key, value);
        }
    }

    pub(crate) fn declare_pipeline(&mut self, name: String, site: DeclarationSite) -> NodeId {
        let id = NodeId(self.nodes.len());

        let mut frames = self.sites.clone();
        frames.push(site);

        debug!(pipeline = %name, %id, %site, "declared pipeline");
        self.nodes
            .push(PipelineNode::new(id, name, DeclarationTrace::new(frames)));

        match self.open.last_mut().and_then(Container::children_mut) {
            Some(children) => children.push(Container::Pipeline(id)),
            // Outside any group the pipeline has no place in the graph
            None => warn!(%id, "pipeline declared outside a group"),
        }
        id
    }

    pub(crate) fn node(&self, id: NodeId) -> &PipelineNode {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut PipelineNode {
        &mut self.nodes[id.0]
    }

    pub(crate) fn add_processor(&mut self, id: NodeId, processor: GraphProcessor) {
        self.processors.push((id, processor));
    }
}
