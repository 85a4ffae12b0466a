// SPDX-License-Identifier: MIT

//! State management for graph execution
//!
//! This module provides:
//! - `StateSchema` - declares each field's type, reducer and default
//! - `State` - runtime state storage with reducer support
//! - `PartialUpdate` - the fields a step wants to change

mod schema;
mod store;

pub use schema::{FieldType, ReducerType, StateFieldDef, StateSchema};
pub use store::{PartialUpdate, State};
