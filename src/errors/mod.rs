// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cdflow contributors

//! Error types for graph construction and queries
//!
//! Every error aborts the current build or query. Nothing is retried or
//! recovered internally; the caller of [`Configuration::build`] or of a path
//! query is expected to surface the error as a fatal configuration problem.
//!
//! [`Configuration::build`]: crate::Configuration::build

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

use crate::pipeline::NodeId;

/// Result type for cdflow operations
pub type CdflowResult<T> = Result<T, CdflowError>;

/// Main error type for cdflow
#[derive(Error, Debug, Diagnostic)]
pub enum CdflowError {
    // ─────────────────────────────────────────────────────────────────────────
    // Structural Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Pipeline '{pipeline}' has neither stages nor a template")]
    #[diagnostic(
        code(cdflow::structural_validation),
        help("Declared at {declared_at}. Add at least one stage or reference a template.")
    )]
    StructuralValidation {
        pipeline: String,
        declared_at: String,
    },

    #[error("Pipeline name '{pipeline}' is declared more than once")]
    #[diagnostic(
        code(cdflow::duplicate_pipeline),
        help("Pipeline names label graph vertices and must be unique within a configuration")
    )]
    DuplicatePipeline { pipeline: String },

    #[error("Circular dependency detected")]
    #[diagnostic(
        code(cdflow::circular_dependency),
        help("Review fork predecessors to remove the cycle")
    )]
    CircularDependency { pipelines: Vec<String> },

    // ─────────────────────────────────────────────────────────────────────────
    // Query Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("No matching pipeline has a path to '{target}'")]
    #[diagnostic(
        code(cdflow::path_not_found),
        help("'{target}' was declared at {declared_at}. Check that the matcher selects one of its ancestors.")
    )]
    PathNotFound {
        target: String,
        id: NodeId,
        declared_at: String,
    },

    #[error("Node {id} is not part of the graph")]
    #[diagnostic(code(cdflow::unknown_node))]
    UnknownNode { id: NodeId },

    // ─────────────────────────────────────────────────────────────────────────
    // Precondition Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Cannot compute {operation} of an empty sequence")]
    #[diagnostic(
        code(cdflow::empty_sequence),
        help("Declare at least one pipeline inside every sequence that is wired to a neighbour")
    )]
    EmptySequence { operation: &'static str },

    #[error("Pipeline '{pipeline}' has no stages and no template, so it has no last stage")]
    #[diagnostic(code(cdflow::no_stages))]
    NoStages { pipeline: String },

    #[error("Fork {fork} is not a pipeline of the enclosing group")]
    #[diagnostic(
        code(cdflow::foreign_fork),
        help("Pass a pipeline declared earlier in the same group, from the same build")
    )]
    ForeignFork { fork: NodeId },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(cdflow::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("YAML serialization error: {message}")]
    #[diagnostic(code(cdflow::yaml_error))]
    Yaml { message: String },

    #[error("JSON serialization error: {message}")]
    #[diagnostic(code(cdflow::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(cdflow::toml_error))]
    Toml { message: String },
}

impl From<serde_yaml::Error> for CdflowError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for CdflowError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for CdflowError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl CdflowError {
    /// Name of the pipeline the error is about, if any
    pub fn pipeline(&self) -> Option<&str> {
        match self {
            Self::StructuralValidation { pipeline, .. }
            | Self::DuplicatePipeline { pipeline }
            | Self::NoStages { pipeline } => Some(pipeline),
            Self::PathNotFound { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Whether this error signals a logic error in the declaration itself
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::EmptySequence { .. } | Self::NoStages { .. } | Self::ForeignFork { .. }
        )
    }
}
