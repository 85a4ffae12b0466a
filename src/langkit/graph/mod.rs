// SPDX-License-Identifier: MIT

//! Straight-line state graphs
//!
//! A graph is a schema of reducer-merged fields plus an ordered sequence of
//! steps. Each step reads the merged state and returns a partial update.

mod builder;
mod executor;
pub mod state;
mod step;

pub use builder::{GraphBuilder, END, START};
pub use executor::{CompiledGraph, StepEvent};
pub use state::{FieldType, PartialUpdate, ReducerType, State, StateFieldDef, StateSchema};
pub use step::{step_fn, FnStep, Step, StepResult};
