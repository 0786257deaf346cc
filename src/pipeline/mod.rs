// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cdflow contributors

//! Pipeline graph model
//!
//! This module holds the pipeline data model, the sequence/parallel
//! containers that turn declarations into edges, the scoped contexts that
//! decorate pipelines, and the validation and path queries over the
//! finished graph.

pub mod context;
mod container;
mod definition;
mod graph;
mod path;
mod validation;

pub use container::Container;
pub use context::{Context, ContextData, ContextStack, Enhancer};
pub use definition::*;
pub use graph::{GraphBuilder, PipelineGraph};
pub use path::PathFinder;
pub use validation::GraphValidator;
