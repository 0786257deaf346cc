// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cdflow contributors

//! Pipeline, stage, job and material declarations

use std::fmt::Display;

use crate::dsl::BuildSession;
use crate::errors::CdflowResult;
use crate::pipeline::{
    ExecTask, Job, LockBehavior, Material, Materials, NodeId, PipelineGraph, PipelineNode, Stage,
    Template,
};

/// Body of a `pipeline(..)` declaration
pub struct PipelineScope<'s> {
    session: &'s mut BuildSession,
    id: NodeId,
}

impl<'s> PipelineScope<'s> {
    pub(crate) fn new(session: &'s mut BuildSession, id: NodeId) -> Self {
        Self { session, id }
    }

    /// Graph identity of the pipeline being declared
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The pipeline as declared so far
    pub fn node(&self) -> &PipelineNode {
        self.session.node(self.id)
    }

    fn node_mut(&mut self) -> &mut PipelineNode {
        self.session.node_mut(self.id)
    }

    /// Append a stage
    pub fn stage(
        &mut self,
        name: impl Into<String>,
        manual_approval: bool,
        body: impl FnOnce(&mut StageScope<'_>),
    ) -> &mut Self {
        let mut stage = Stage::new(name, manual_approval);
        body(&mut StageScope { stage: &mut stage });
        self.node_mut().stages.push(stage);
        self
    }

    /// Take the stages from a template
    pub fn template(&mut self, name: impl Into<String>, stage_name: impl Into<String>) -> &mut Self {
        self.node_mut().template = Some(Template {
            name: name.into(),
            stage_name: stage_name.into(),
        });
        self
    }

    /// Add materials
    pub fn materials(&mut self, body: impl FnOnce(&mut MaterialsScope<'_>)) -> &mut Self {
        let materials = self.node_mut().materials.get_or_insert_with(Materials::default);
        body(&mut MaterialsScope { materials });
        self
    }

    pub fn tag(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.node_mut().tags.insert(key.into(), value.into());
        self
    }

    pub fn parameter(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.node_mut().parameters.insert(key.into(), value.into());
        self
    }

    /// Set an environment variable; any displayable value is stringified
    pub fn env(&mut self, key: impl Into<String>, value: impl Display) -> &mut Self {
        self.node_mut()
            .environment_variables
            .insert(key.into(), value.to_string());
        self
    }

    pub fn lock_behavior(&mut self, behavior: LockBehavior) -> &mut Self {
        self.node_mut().lock_behavior = behavior;
        self
    }

    /// Set the group directly; enclosing group scopes will not override it
    pub fn group(&mut self, label: impl Into<String>) -> &mut Self {
        self.node_mut().group = Some(label.into());
        self
    }

    /// Run `processor` against this pipeline once the whole graph exists
    pub fn on_graph<F>(&mut self, processor: F) -> &mut Self
    where
        F: FnOnce(NodeId, &mut PipelineGraph) -> CdflowResult<()> + 'static,
    {
        self.session.add_processor(self.id, Box::new(processor));
        self
    }
}

/// Body of a `stage(..)` declaration
pub struct StageScope<'a> {
    stage: &'a mut Stage,
}

impl StageScope<'_> {
    pub fn job(&mut self, name: impl Into<String>, body: impl FnOnce(&mut JobScope<'_>)) -> &mut Self {
        let mut job = Job {
            name: name.into(),
            tasks: Vec::new(),
            resources: Vec::new(),
        };
        body(&mut JobScope { job: &mut job });
        self.stage.body.jobs.push(job);
        self
    }

    pub fn env(&mut self, key: impl Into<String>, value: impl Display) -> &mut Self {
        self.stage
            .body
            .environment_variables
            .insert(key.into(), value.to_string());
        self
    }
}

/// Body of a `job(..)` declaration
pub struct JobScope<'a> {
    job: &'a mut Job,
}

impl JobScope<'_> {
    /// Run a command
    pub fn exec(&mut self, command: impl Into<String>, arguments: &[&str]) -> &mut Self {
        self.job.tasks.push(ExecTask {
            command: command.into(),
            arguments: arguments.iter().map(|a| a.to_string()).collect(),
        });
        self
    }

    /// Require an agent resource
    pub fn resource(&mut self, name: impl Into<String>) -> &mut Self {
        self.job.resources.push(name.into());
        self
    }
}

/// Body of a `materials(..)` declaration
pub struct MaterialsScope<'a> {
    materials: &'a mut Materials,
}

impl MaterialsScope<'_> {
    pub fn git(&mut self, url: impl Into<String>) -> &mut Self {
        self.materials.entries.push(Material::Git {
            url: url.into(),
            branch: None,
        });
        self
    }

    pub fn git_branch(&mut self, url: impl Into<String>, branch: impl Into<String>) -> &mut Self {
        self.materials.entries.push(Material::Git {
            url: url.into(),
            branch: Some(branch.into()),
        });
        self
    }

    /// Depend on a stage of another pipeline
    pub fn dependency(&mut self, pipeline: impl Into<String>, stage: impl Into<String>) -> &mut Self {
        self.materials.entries.push(Material::Dependency {
            pipeline: pipeline.into(),
            stage: stage.into(),
        });
        self
    }
}
