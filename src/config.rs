// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cdflow contributors

//! Build options
//!
//! Options can be created in code or loaded from TOML:
//!
//! ```toml
//! path_separator = "/"
//! context_scope = "body"
//! reject_duplicate_names = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{CdflowError, CdflowResult};

/// Separator used when joining dependency paths
pub const DEFAULT_PATH_SEPARATOR: &str = "/";

/// Options for one configuration build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOptions {
    /// Joins pipeline names in dependency paths
    #[serde(default = "default_path_separator")]
    pub path_separator: String,

    /// Which pipelines a closing context applies its enhancers to
    #[serde(default)]
    pub context_scope: ContextScope,

    /// Fail validation when two pipelines share a name
    #[serde(default = "default_true")]
    pub reject_duplicate_names: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            path_separator: default_path_separator(),
            context_scope: ContextScope::default(),
            reject_duplicate_names: true,
        }
    }
}

fn default_path_separator() -> String {
    DEFAULT_PATH_SEPARATOR.to_string()
}

fn default_true() -> bool {
    true
}

impl BuildOptions {
    /// Parse options from a TOML string
    pub fn from_toml(content: &str) -> CdflowResult<Self> {
        toml::from_str(content).map_err(Into::into)
    }

    /// Load options from a TOML file
    pub fn from_file(path: &Path) -> CdflowResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CdflowError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::from_toml(&content)
    }
}

/// Reach of a context's enhancers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContextScope {
    /// Every pipeline of the enclosing group, including ones declared
    /// before the context opened (default)
    #[default]
    Group,
    /// Only pipelines declared while the context was open
    Body,
}
