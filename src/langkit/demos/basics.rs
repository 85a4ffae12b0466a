// SPDX-License-Identifier: MIT

//! Profile graph: two steps building a greeting over an overwrite field and an
//! append log.

use crate::adk::error::GraphError;
use crate::langkit::graph::{
    step_fn, CompiledGraph, FieldType, GraphBuilder, PartialUpdate, State, StateFieldDef,
    StateSchema,
};
use serde_json::json;

/// `name` and `greeting` overwrite; `items` accumulates one entry per step
pub fn profile_schema() -> StateSchema {
    StateSchema::new()
        .field(
            "name",
            StateFieldDef::overwrite(FieldType::String).with_default("World"),
        )
        .field("greeting", StateFieldDef::overwrite(FieldType::String))
        .field("items", StateFieldDef::append())
}

pub fn build_basics_graph() -> Result<CompiledGraph, GraphError> {
    let mut builder = GraphBuilder::new("basics", profile_schema());
    builder
        .add_node(
            "greet",
            step_fn(|state: &State| {
                let name = state.get_str("name").unwrap_or_default();
                Ok(PartialUpdate::new()
                    .with("greeting", format!("Hello, {}!", name))
                    .with("items", json!(["greeted"])))
            }),
        )
        .add_node(
            "shout",
            step_fn(|state: &State| {
                let greeting = state.get_str("greeting").unwrap_or_default();
                Ok(PartialUpdate::new()
                    .with("greeting", greeting.to_uppercase())
                    .with("items", json!(["shouted"])))
            }),
        )
        .set_entry_point("greet")
        .add_edge("greet", "shout")
        .set_finish_point("shout");
    builder.compile()
}

/// Initial state for a run; an absent name keeps the schema default
pub fn basics_input(name: Option<&str>) -> Option<PartialUpdate> {
    name.map(|n| PartialUpdate::new().with("name", n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_basics_graph_with_name() {
        let graph = build_basics_graph().unwrap();
        let state = graph.invoke(basics_input(Some("Ada"))).await.unwrap();

        assert_eq!(state.get_str("greeting"), Some("HELLO, ADA!"));
        assert_eq!(state.get("items"), Some(&json!(["greeted", "shouted"])));
    }

    #[tokio::test]
    async fn test_basics_graph_default_name() {
        let graph = build_basics_graph().unwrap();
        let state = graph.invoke(basics_input(None)).await.unwrap();
        assert_eq!(state.get_str("greeting"), Some("HELLO, WORLD!"));
    }

    #[test]
    fn test_basics_mermaid() {
        let mermaid = build_basics_graph().unwrap().to_mermaid();
        assert!(mermaid.contains("n_greet --> n_shout"));
    }
}
