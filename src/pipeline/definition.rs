// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cdflow contributors

//! Pipeline definition structures
//!
//! A [`PipelineNode`] holds everything one declared pipeline carries into the
//! graph: stages, template reference, tags, parameters, environment
//! variables, lock behavior, group and materials. It has no composition
//! logic of its own.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::panic::Location;

use crate::errors::{CdflowError, CdflowResult};

/// Identity of a pipeline within one build
///
/// Handed out when a pipeline is declared. Two pipelines that share a name
/// still have distinct ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Declaration order of this pipeline within its build
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single pipeline declaration with all its attributes
#[derive(Debug, Clone, Serialize)]
pub struct PipelineNode {
    #[serde(skip)]
    id: NodeId,

    /// Pipeline name (must be unique within a graph)
    pub name: String,

    /// Stages in execution order
    pub stages: Vec<Stage>,

    /// Template providing the stages instead
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<Template>,

    /// Free-form labels
    pub tags: BTreeMap<String, String>,

    /// Parameters passed to the template or stages
    pub parameters: BTreeMap<String, String>,

    /// Pipeline-level environment variables
    pub environment_variables: BTreeMap<String, String>,

    /// How the pipeline locks while running
    pub lock_behavior: LockBehavior,

    /// Pipeline group label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// Material descriptors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub materials: Option<Materials>,

    #[serde(skip)]
    declared_at: DeclarationTrace,
}

impl PipelineNode {
    pub(crate) fn new(id: NodeId, name: impl Into<String>, declared_at: DeclarationTrace) -> Self {
        Self {
            id,
            name: name.into(),
            stages: Vec::new(),
            template: None,
            tags: BTreeMap::new(),
            parameters: BTreeMap::new(),
            environment_variables: BTreeMap::new(),
            lock_behavior: LockBehavior::default(),
            group: None,
            materials: None,
            declared_at,
        }
    }

    /// Graph identity of this pipeline
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Where the user declared this pipeline
    pub fn declared_at(&self) -> &DeclarationTrace {
        &self.declared_at
    }

    /// Name of the stage downstream pipelines should depend on
    ///
    /// The template's stage wins over the declared stages.
    pub fn last_stage_name(&self) -> CdflowResult<&str> {
        if let Some(template) = &self.template {
            return Ok(&template.stage_name);
        }

        self.stages
            .last()
            .map(|stage| stage.name.as_str())
            .ok_or_else(|| CdflowError::NoStages {
                pipeline: self.name.clone(),
            })
    }

    /// True when the pipeline has neither stages nor a template
    pub fn is_underspecified(&self) -> bool {
        self.stages.is_empty() && self.template.is_none()
    }

    /// Set the group unless one is already assigned
    ///
    /// Returns whether the group was set.
    pub fn set_group_if_unset(&mut self, group: &str) -> bool {
        if self.group.is_some() {
            return false;
        }
        self.group = Some(group.to_string());
        true
    }

    /// Get a stage by name
    pub fn get_stage(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Get all stage names
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }
}

/// A single pipeline stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// Stage name
    pub name: String,

    /// Stage waits for a manual trigger
    #[serde(default)]
    pub manual_approval: bool,

    /// Jobs and settings of the stage
    #[serde(flatten)]
    pub body: StageBody,
}

impl Stage {
    pub fn new(name: impl Into<String>, manual_approval: bool) -> Self {
        Self {
            name: name.into(),
            manual_approval,
            body: StageBody::default(),
        }
    }
}

/// Contents of a stage; carried through the graph untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageBody {
    #[serde(default)]
    pub jobs: Vec<Job>,

    #[serde(default)]
    pub environment_variables: BTreeMap<String, String>,
}

/// A job inside a stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub name: String,

    #[serde(default)]
    pub tasks: Vec<ExecTask>,

    /// Agent resources the job requires
    #[serde(default)]
    pub resources: Vec<String>,
}

/// A command executed by a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecTask {
    pub command: String,

    #[serde(default)]
    pub arguments: Vec<String>,
}

/// Reference to a pipeline template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    /// Template name
    pub name: String,

    /// Name of the stage the template declares
    pub stage_name: String,
}

/// Pipeline locking policies
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum LockBehavior {
    /// Lock while running, unlock once finished (default)
    #[default]
    UnlockWhenFinished,
    /// Stay locked after a failure
    LockOnFailure,
    /// Never lock
    None,
}

impl fmt::Display for LockBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnlockWhenFinished => write!(f, "unlockWhenFinished"),
            Self::LockOnFailure => write!(f, "lockOnFailure"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Materials triggering a pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Materials {
    pub entries: Vec<Material>,
}

/// Material kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Material {
    /// Git repository
    Git {
        url: String,
        #[serde(default)]
        branch: Option<String>,
    },

    /// Stage of an upstream pipeline
    Dependency { pipeline: String, stage: String },
}

/// One user call site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeclarationSite {
    pub file: &'static str,
    pub line: u32,
    pub column: u32,
}

impl From<&'static Location<'static>> for DeclarationSite {
    fn from(location: &'static Location<'static>) -> Self {
        Self {
            file: location.file(),
            line: location.line(),
            column: location.column(),
        }
    }
}

impl fmt::Display for DeclarationSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// User call sites enclosing a declaration, outermost first
///
/// Only the caller's own declaration calls are recorded, so the trace never
/// points into builder internals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclarationTrace {
    frames: Vec<DeclarationSite>,
}

impl DeclarationTrace {
    pub(crate) fn new(frames: Vec<DeclarationSite>) -> Self {
        Self { frames }
    }

    /// All frames, outermost first
    pub fn frames(&self) -> &[DeclarationSite] {
        &self.frames
    }

    /// The call that declared the pipeline itself
    pub fn innermost(&self) -> Option<&DeclarationSite> {
        self.frames.last()
    }
}

impl fmt::Display for DeclarationTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.frames.is_empty() {
            return write!(f, "<unknown>");
        }
        let mut frames = self.frames.iter().rev();
        if let Some(first) = frames.next() {
            write!(f, "{}", first)?;
        }
        for frame in frames {
            write!(f, " <- {}", frame)?;
        }
        Ok(())
    }
}
