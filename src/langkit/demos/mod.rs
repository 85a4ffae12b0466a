// SPDX-License-Identifier: MIT

//! Runnable demos behind the `graph` and `tools` commands

pub mod basics;
pub mod chatbot;
pub mod tool_binding;

pub use basics::{basics_input, build_basics_graph, profile_schema};
pub use chatbot::{build_chatbot_graph, chat_turn, ModelStep};
pub use tool_binding::invoke_with_tools;
