// SPDX-License-Identifier: MIT

//! State graphs, the tool registry and the demos built on them

pub mod demos;
pub mod graph;
pub mod registry;
pub mod tools;
