// SPDX-License-Identifier: MIT

//! Agent development kit: models, tools, agents and errors

pub mod agent;
pub mod error;
pub mod model;
pub mod tool;
