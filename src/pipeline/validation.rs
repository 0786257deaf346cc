// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cdflow contributors

//! Graph validation
//!
//! Runs once the graph is complete and all graph processors have run.
//! Structural problems are checked over the whole graph before names are,
//! and only the first violation is reported.

use std::collections::HashSet;
use tracing::warn;

use crate::config::BuildOptions;
use crate::errors::{CdflowError, CdflowResult};
use crate::pipeline::PipelineGraph;

/// Graph validator
pub struct GraphValidator;

impl GraphValidator {
    /// Validate every pipeline in insertion order
    pub fn validate(graph: &PipelineGraph, options: &BuildOptions) -> CdflowResult<()> {
        if let Some(node) = graph.nodes().find(|node| node.is_underspecified()) {
            warn!(pipeline = %node.name, "pipeline has neither stages nor a template");
            return Err(CdflowError::StructuralValidation {
                pipeline: node.name.clone(),
                declared_at: node.declared_at().to_string(),
            });
        }

        if options.reject_duplicate_names {
            let mut seen_names = HashSet::new();
            for node in graph.nodes() {
                if !seen_names.insert(node.name.as_str()) {
                    warn!(pipeline = %node.name, "duplicate pipeline name");
                    return Err(CdflowError::DuplicatePipeline {
                        pipeline: node.name.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}
