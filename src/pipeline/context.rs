// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cdflow contributors

//! Scoped metadata contexts
//!
//! A [`Context`] collects a data map and a list of [`Enhancer`]s while it is
//! open. When it closes, every enhancer is applied to every pipeline in its
//! reach, in registration order. Contexts live on a per-build
//! [`ContextStack`] and always close in reverse opening order.

use std::collections::BTreeMap;
use std::fmt;

use crate::pipeline::{LockBehavior, PipelineNode};

/// Free-form data attached to a context
pub type ContextData = BTreeMap<String, String>;

type MutateFn = dyn Fn(&mut PipelineNode, &ContextData);

/// Deferred change applied to every pipeline a context reaches
pub enum Enhancer {
    /// Assign the group unless the pipeline already has one
    SetGroupIfUnset(String),
    SetTag(String, String),
    SetParameter(String, String),
    SetEnvironmentVariable(String, String),
    SetLockBehavior(LockBehavior),
    /// Arbitrary change; receives the context's data map
    Mutate(Box<MutateFn>),
}

impl Enhancer {
    /// Wrap a closure as a generic enhancer
    pub fn mutate<F>(f: F) -> Self
    where
        F: Fn(&mut PipelineNode, &ContextData) + 'static,
    {
        Self::Mutate(Box::new(f))
    }

    /// Short name of the enhancer kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SetGroupIfUnset(_) => "set-group-if-unset",
            Self::SetTag(..) => "set-tag",
            Self::SetParameter(..) => "set-parameter",
            Self::SetEnvironmentVariable(..) => "set-environment-variable",
            Self::SetLockBehavior(_) => "set-lock-behavior",
            Self::Mutate(_) => "mutate",
        }
    }

    /// Apply to one pipeline
    pub fn apply(&self, node: &mut PipelineNode, data: &ContextData) {
        match self {
            Self::SetGroupIfUnset(group) => {
                node.set_group_if_unset(group);
            }
            Self::SetTag(key, value) => {
                node.tags.insert(key.clone(), value.clone());
            }
            Self::SetParameter(key, value) => {
                node.parameters.insert(key.clone(), value.clone());
            }
            Self::SetEnvironmentVariable(key, value) => {
                node.environment_variables.insert(key.clone(), value.clone());
            }
            Self::SetLockBehavior(behavior) => node.lock_behavior = *behavior,
            Self::Mutate(f) => f(node, data),
        }
    }
}

impl fmt::Debug for Enhancer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetGroupIfUnset(group) => f.debug_tuple("SetGroupIfUnset").field(group).finish(),
            Self::SetTag(k, v) => f.debug_tuple("SetTag").field(k).field(v).finish(),
            Self::SetParameter(k, v) => f.debug_tuple("SetParameter").field(k).field(v).finish(),
            Self::SetEnvironmentVariable(k, v) => {
                f.debug_tuple("SetEnvironmentVariable").field(k).field(v).finish()
            }
            Self::SetLockBehavior(b) => f.debug_tuple("SetLockBehavior").field(b).finish(),
            Self::Mutate(_) => f.write_str("Mutate(..)"),
        }
    }
}

/// One open scope
#[derive(Debug)]
pub struct Context {
    data: ContextData,
    enhancers: Vec<Enhancer>,
    /// Number of pipelines declared before this context opened
    first_node: usize,
}

impl Context {
    pub(crate) fn new(first_node: usize) -> Self {
        Self {
            data: ContextData::new(),
            enhancers: Vec::new(),
            first_node,
        }
    }

    pub fn set_data(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.insert(key.into(), value.into());
    }

    pub fn get_data(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    pub fn data(&self) -> &ContextData {
        &self.data
    }

    /// Register an enhancer; it runs when the context closes
    pub fn enhance(&mut self, enhancer: Enhancer) {
        self.enhancers.push(enhancer);
    }

    pub fn enhancers(&self) -> &[Enhancer] {
        &self.enhancers
    }

    pub(crate) fn first_node(&self) -> usize {
        self.first_node
    }

    /// Apply every enhancer, in registration order, to one pipeline
    pub(crate) fn apply_to(&self, node: &mut PipelineNode) {
        for enhancer in &self.enhancers {
            enhancer.apply(node, &self.data);
        }
    }
}

/// Stack of open contexts for one build
#[derive(Debug, Default)]
pub struct ContextStack {
    contexts: Vec<Context>,
}

impl ContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, context: Context) {
        self.contexts.push(context);
    }

    pub(crate) fn pop(&mut self) -> Option<Context> {
        self.contexts.pop()
    }

    /// Innermost open context
    pub fn current(&self) -> Option<&Context> {
        self.contexts.last()
    }

    pub fn current_mut(&mut self) -> Option<&mut Context> {
        self.contexts.last_mut()
    }

    pub fn depth(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{DeclarationTrace, NodeId};

    fn node(name: &str) -> PipelineNode {
        PipelineNode::new(NodeId(0), name, DeclarationTrace::default())
    }

    #[test]
    fn test_enhancers_apply_in_registration_order() {
        let mut ctx = Context::new(0);
        ctx.enhance(Enhancer::SetTag("tier".into(), "first".into()));
        ctx.enhance(Enhancer::SetTag("tier".into(), "second".into()));

        let mut pipeline = node("build");
        ctx.apply_to(&mut pipeline);
        assert_eq!(pipeline.tags["tier"], "second");
    }

    #[test]
    fn test_group_enhancer_keeps_existing_group() {
        let mut pipeline = node("build");
        pipeline.group = Some("inner".into());

        Enhancer::SetGroupIfUnset("outer".into()).apply(&mut pipeline, &ContextData::new());
        assert_eq!(pipeline.group.as_deref(), Some("inner"));
    }

    #[test]
    fn test_mutate_sees_context_data() {
        let mut ctx = Context::new(0);
        ctx.set_data("region", "eu-west-1");
        ctx.enhance(Enhancer::mutate(|node, data| {
            if let Some(region) = data.get("region") {
                node.parameters.insert("REGION".into(), region.clone());
            }
        }));

        let mut pipeline = node("deploy");
        ctx.apply_to(&mut pipeline);
        assert_eq!(pipeline.parameters["REGION"], "eu-west-1");
        assert_eq!(ctx.get_data("region"), Some("eu-west-1"));
    }

    #[test]
    fn test_enhancer_kinds_and_debug() {
        let enhancer = Enhancer::mutate(|_, _| {});
        assert_eq!(enhancer.kind(), "mutate");
        assert_eq!(format!("{:?}", enhancer), "Mutate(..)");
        assert_eq!(
            Enhancer::SetLockBehavior(LockBehavior::None).kind(),
            "set-lock-behavior"
        );
    }

    #[test]
    fn test_stack_discipline() {
        let mut stack = ContextStack::new();
        assert!(stack.current().is_none());

        stack.push(Context::new(0));
        stack.push(Context::new(3));
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.current().map(Context::first_node), Some(3));

        assert_eq!(stack.pop().map(|c| c.first_node()), Some(3));
        assert_eq!(stack.pop().map(|c| c.first_node()), Some(0));
        assert!(stack.is_empty());
    }
}
