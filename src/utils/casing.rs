// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cdflow contributors

//! Identifier casing
//!
//! Renderers label pipelines, stages and jobs with hyphenated lower-case
//! identifiers derived from the names used in declarations.

use regex::Regex;
use std::sync::LazyLock;

static LOWER_UPPER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("valid regex"));
static ACRONYM_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z]+)([A-Z][a-z])").expect("valid regex"));
static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s_\-]+").expect("valid regex"));

/// Convert `buildAndTest`, `BuildAndTest` or `HTTPServer` style names to
/// `build-and-test` / `http-server`
pub fn to_kebab_case(input: &str) -> String {
    let split = LOWER_UPPER.replace_all(input, "${1}-${2}");
    let split = ACRONYM_WORD.replace_all(&split, "${1}-${2}");
    let joined = SEPARATORS.replace_all(&split, "-");
    joined.trim_matches('-').to_lowercase()
}
