// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cdflow contributors

//! Declaration surface
//!
//! Configurations are declared through nested closures. Every closure
//! receives a scope handle that borrows the build's [`BuildSession`], so
//! there is no process-wide state and independent builds cannot interfere.

mod configuration;
mod pipeline;
mod scopes;
mod session;

pub use configuration::Configuration;
pub use pipeline::{JobScope, MaterialsScope, PipelineScope, StageScope};
pub use scopes::{ParallelScope, RootScope, SequenceScope};
pub use session::{BuildSession, GraphProcessor};
