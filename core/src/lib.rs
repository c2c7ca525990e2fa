// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

pub mod config;
pub mod llm;
pub mod node;

pub use config::*;
pub use llm::*;
pub use node::*;
