// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cdflow contributors

//! Utility modules

pub mod casing;

pub use casing::to_kebab_case;
