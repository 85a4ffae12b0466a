// SPDX-License-Identifier: MIT

//! langkit-rs: model clients, tool binding, a tool-calling agent loop and
//! straight-line state graphs with reducer-merged fields.

pub mod adk;
pub mod langkit;
