// SPDX-License-Identifier: MIT

//! Demo tools bound by the `tools` and `agent` commands

pub mod calculator;
pub mod clock;
pub mod weather;

use crate::adk::tool::Tool;
use std::sync::Arc;

pub use calculator::calculator_tool;
pub use clock::current_time_tool;
pub use weather::weather_tool;

/// Every demo tool, in a stable order
pub fn default_tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(calculator_tool()),
        Arc::new(weather_tool()),
        Arc::new(current_time_tool()),
    ]
}
