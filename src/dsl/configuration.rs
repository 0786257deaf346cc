// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cdflow contributors

//! Finished, validated configuration

use crate::config::BuildOptions;
use crate::dsl::{BuildSession, RootScope};
use crate::errors::CdflowResult;
use crate::export::ConfigurationExport;
use crate::pipeline::{Container, NodeId, PathFinder, PipelineGraph, PipelineNode};

/// Validated pipeline graph plus the declared groups
///
/// Read-only once built; safe to share between threads for queries.
#[derive(Debug)]
pub struct Configuration {
    graph: PipelineGraph,
    groups: Vec<Container>,
    options: BuildOptions,
}

impl Configuration {
    /// Declare, build and validate a configuration with default options
    ///
    /// ```
    /// use cdflow::Configuration;
    ///
    /// let config = Configuration::build(|root| {
    ///     root.sequence(|seq| {
    ///         seq.pipeline("build", |p| {
    ///             p.stage("compile", false, |_| {});
    ///         });
    ///         seq.pipeline("deploy", |p| {
    ///             p.stage("release", true, |_| {});
    ///         });
    ///     });
    /// })
    /// .unwrap();
    ///
    /// assert_eq!(config.graph().edge_names(), vec![("build".to_string(), "deploy".to_string())]);
    /// ```
    pub fn build<F>(body: F) -> CdflowResult<Self>
    where
        F: FnOnce(&mut RootScope<'_>),
    {
        Self::build_with(BuildOptions::default(), body)
    }

    /// Declare, build and validate a configuration
    pub fn build_with<F>(options: BuildOptions, body: F) -> CdflowResult<Self>
    where
        F: FnOnce(&mut RootScope<'_>),
    {
        let mut session = BuildSession::new(options);
        body(&mut session.root());
        session.finish()
    }

    pub(crate) fn new(graph: PipelineGraph, groups: Vec<Container>, options: BuildOptions) -> Self {
        Self {
            graph,
            groups,
            options,
        }
    }

    pub fn graph(&self) -> &PipelineGraph {
        &self.graph
    }

    /// Top-level pipeline groups in declaration order
    pub fn groups(&self) -> &[Container] {
        &self.groups
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Get a pipeline by name
    pub fn pipeline(&self, name: &str) -> Option<&PipelineNode> {
        self.graph.node_by_name(name)
    }

    /// Dependency path to `target`, joined with the configured separator
    pub fn path_to_pipeline<F>(&self, target: NodeId, matcher: F) -> CdflowResult<String>
    where
        F: Fn(&PipelineNode) -> bool,
    {
        PathFinder::path_to_pipeline_with(&self.graph, target, matcher, &self.options.path_separator)
    }

    /// Serializable view for external renderers
    pub fn export(&self) -> ConfigurationExport<'_> {
        ConfigurationExport::new(&self.graph, &self.groups)
    }

    pub fn to_json(&self) -> CdflowResult<String> {
        serde_json::to_string_pretty(&self.export()).map_err(Into::into)
    }

    pub fn to_yaml(&self) -> CdflowResult<String> {
        serde_yaml::to_string(&self.export()).map_err(Into::into)
    }
}
