// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cdflow contributors

//! Group, sequence and parallel scopes
//!
//! Each scope type only exposes what is valid where it is used: sequences
//! can open nested parallel blocks, parallel blocks can open nested
//! sequences, and both can declare pipelines and open contexts.

use std::panic::Location;

use crate::dsl::{BuildSession, PipelineScope};
use crate::errors::{CdflowError, CdflowResult};
use crate::pipeline::{Container, Context, DeclarationSite, Enhancer, NodeId, PipelineGraph};

/// Top level of a configuration; declares pipeline groups
pub struct RootScope<'s> {
    pub(crate) session: &'s mut BuildSession,
}

impl RootScope<'_> {
    /// Declare a group whose members run one after another
    #[track_caller]
    pub fn sequence(&mut self, body: impl FnOnce(&mut SequenceScope<'_>)) {
        self.session
            .open_group(Container::sequence(), Location::caller().into());
        body(&mut SequenceScope {
            session: &mut *self.session,
        });
        self.session.close_group();
    }

    /// Declare a group whose members run independently
    #[track_caller]
    pub fn parallel(&mut self, body: impl FnOnce(&mut ParallelScope<'_>)) {
        self.session
            .open_group(Container::parallel(None), Location::caller().into());
        body(&mut ParallelScope {
            session: &mut *self.session,
        });
        self.session.close_group();
    }

    /// Run `processor` against `node` once the whole graph exists
    pub fn graph_processor<F>(&mut self, node: NodeId, processor: F)
    where
        F: FnOnce(NodeId, &mut PipelineGraph) -> CdflowResult<()> + 'static,
    {
        self.session.add_processor(node, Box::new(processor));
    }
}

/// Members declared here run in declaration order
pub struct SequenceScope<'s> {
    session: &'s mut BuildSession,
}

/// Members declared here run independently of each other
pub struct ParallelScope<'s> {
    session: &'s mut BuildSession,
}

macro_rules! declaration_methods {
    ($scope:ident) => {
        impl $scope<'_> {
            /// Declare a pipeline and fill it in with `body`
            #[track_caller]
            pub fn pipeline(
                &mut self,
                name: impl Into<String>,
                body: impl FnOnce(&mut PipelineScope<'_>),
            ) -> NodeId {
                let id = self
                    .session
                    .declare_pipeline(name.into(), Location::caller().into());
                body(&mut PipelineScope::new(&mut *self.session, id));
                id
            }

            /// Assign `label` to every pipeline in reach that has no group yet
            #[track_caller]
            pub fn group(&mut self, label: impl Into<String>, body: impl FnOnce(&mut Self)) {
                let label = label.into();
                self.context(|ctx| ctx.enhance(Enhancer::SetGroupIfUnset(label)), body);
            }

            /// Open a context: `init` runs first, then `body`; enhancers are
            /// applied when `body` returns
            #[track_caller]
            pub fn context(&mut self, init: impl FnOnce(&mut Context), body: impl FnOnce(&mut Self)) {
                self.session.enter(Location::caller().into());
                self.session.open_context(init);
                body(self);
                self.session.close_context();
                self.session.leave();
            }

            /// Register an enhancer on the innermost open context
            pub fn enhance(&mut self, enhancer: Enhancer) -> &mut Self {
                self.session.enhance(enhancer);
                self
            }

            /// Store a value in the innermost open context
            pub fn set_data(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
                self.session.set_data(key.into(), value.into());
                self
            }

            /// Run `processor` against `node` once the whole graph exists
            pub fn graph_processor<F>(&mut self, node: NodeId, processor: F) -> &mut Self
            where
                F: FnOnce(NodeId, &mut PipelineGraph) -> CdflowResult<()> + 'static,
            {
                self.session.add_processor(node, Box::new(processor));
                self
            }
        }
    };
}

declaration_methods!(SequenceScope);
declaration_methods!(ParallelScope);

impl SequenceScope<'_> {
    /// Nested block whose members run independently
    #[track_caller]
    pub fn parallel(&mut self, body: impl FnOnce(&mut ParallelScope<'_>)) {
        self.parallel_block(None, Location::caller().into(), body);
    }

    /// Nested parallel block whose members all wait for `fork`
    ///
    /// `fork` must be a pipeline declared earlier in the same group of the
    /// same build; anything else fails the build with
    /// [`CdflowError::ForeignFork`] and the block is declared without a fork.
    #[track_caller]
    pub fn parallel_after(&mut self, fork: NodeId, body: impl FnOnce(&mut ParallelScope<'_>)) {
        let fork = if self.session.owns_fork(fork) {
            Some(fork)
        } else {
            self.session.fail(CdflowError::ForeignFork { fork });
            None
        };
        self.parallel_block(fork, Location::caller().into(), body);
    }

    fn parallel_block(
        &mut self,
        fork: Option<NodeId>,
        site: DeclarationSite,
        body: impl FnOnce(&mut ParallelScope<'_>),
    ) {
        self.session.open_block(Container::parallel(fork), site);
        body(&mut ParallelScope {
            session: &mut *self.session,
        });
        self.session.close_block();
    }
}

impl ParallelScope<'_> {
    /// Nested block whose members run in declaration order
    #[track_caller]
    pub fn sequence(&mut self, body: impl FnOnce(&mut SequenceScope<'_>)) {
        self.session
            .open_block(Container::sequence(), Location::caller().into());
        body(&mut SequenceScope {
            session: &mut *self.session,
        });
        self.session.close_block();
    }
}
