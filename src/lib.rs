// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cdflow contributors

//! # cdflow - Continuous-delivery pipeline graphs
//!
//! `cdflow` compiles nested sequence/parallel pipeline declarations into a
//! directed dependency graph, decorates pipelines through scoped contexts,
//! validates the result and answers dependency-path queries over it.
//!
//! ## Features
//!
//! - **Composition** - Sequences and parallel blocks nest arbitrarily
//! - **Scoped metadata** - Groups, tags and custom enhancers applied per scope
//! - **Graph processors** - Node-level hooks that see the finished graph
//! - **Path queries** - Shortest dependency path from a matching ancestor
//! - **Export** - JSON/YAML hand-off for external renderers
//!
//! ## Quick Start
//!
//! ```
//! use cdflow::Configuration;
//!
//! let config = Configuration::build(|root| {
//!     root.sequence(|seq| {
//!         seq.pipeline("build", |p| {
//!             p.stage("compile", false, |_| {});
//!         });
//!         seq.parallel(|par| {
//!             par.pipeline("test1", |p| {
//!                 p.stage("unit", false, |_| {});
//!             });
//!             par.pipeline("test2", |p| {
//!                 p.stage("integration", false, |_| {});
//!             });
//!         });
//!         seq.pipeline("deploy", |p| {
//!             p.stage("release", true, |_| {});
//!         });
//!     });
//! })
//! .unwrap();
//!
//! assert_eq!(config.graph().edge_count(), 4);
//! ```

pub mod config;
pub mod dsl;
pub mod errors;
pub mod export;
pub mod pipeline;
pub mod utils;

// Re-export commonly used types
pub use config::{BuildOptions, ContextScope};
pub use dsl::{BuildSession, Configuration, ParallelScope, PipelineScope, RootScope, SequenceScope};
pub use errors::{CdflowError, CdflowResult};
pub use pipeline::{
    Container, Enhancer, LockBehavior, NodeId, PathFinder, PipelineGraph, PipelineNode, Stage,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
