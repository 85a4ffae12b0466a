// SPDX-License-Identifier: MIT

//! Graph executor - runs compiled steps in order and merges their updates

use super::builder::{END, START};
use super::state::{PartialUpdate, State, StateSchema};
use super::step::Step;
use crate::adk::error::GraphError;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Update produced by one step, as emitted by [`CompiledGraph::run_stream`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepEvent {
    /// Position of the step in the sequence, starting at 0
    pub index: usize,
    pub step: String,
    pub update: PartialUpdate,
}

/// A validated straight-line graph ready for execution
pub struct CompiledGraph {
    name: String,
    schema: StateSchema,
    steps: Vec<(String, Arc<dyn Step>)>,
}

impl CompiledGraph {
    pub(super) fn new(
        name: String,
        schema: StateSchema,
        steps: Vec<(String, Arc<dyn Step>)>,
    ) -> Self {
        Self {
            name,
            schema,
            steps,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &StateSchema {
        &self.schema
    }

    /// Node ids in execution order
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|(id, _)| id.as_str()).collect()
    }

    /// Defaults with the caller's initial values merged on top
    pub fn initial_state(&self, initial: Option<PartialUpdate>) -> Result<State, GraphError> {
        let mut state = State::new(&self.schema);
        if let Some(initial) = initial {
            state.apply(&initial)?;
        }
        Ok(state)
    }

    /// Run every step and return the final state
    pub async fn invoke(&self, initial: Option<PartialUpdate>) -> Result<State, GraphError> {
        self.execute(initial, None).await
    }

    /// Like [`CompiledGraph::invoke`], also sending each step's update on `tx`.
    ///
    /// A dropped receiver does not stop the run.
    pub async fn run_stream(
        &self,
        initial: Option<PartialUpdate>,
        tx: mpsc::Sender<StepEvent>,
    ) -> Result<State, GraphError> {
        self.execute(initial, Some(tx)).await
    }

    async fn execute(
        &self,
        initial: Option<PartialUpdate>,
        mut tx: Option<mpsc::Sender<StepEvent>>,
    ) -> Result<State, GraphError> {
        let run_id = Uuid::new_v4();
        let mut state = self.initial_state(initial)?;
        log::info!(
            "Graph '{}' run {} starting with {} steps",
            self.name,
            run_id,
            self.steps.len()
        );

        for (index, (id, step)) in self.steps.iter().enumerate() {
            log::info!(
                "Graph '{}' run {} step {}/{}: {}",
                self.name,
                run_id,
                index + 1,
                self.steps.len(),
                id
            );

            let update = step.run(&state).await.map_err(|e| {
                log::error!("Step {} failed: {}", id, e);
                GraphError::step_failed(id.clone(), e)
            })?;
            log::debug!("Step {} update: {:?}", id, update);

            state.apply(&update).map_err(|e| {
                log::error!("Step {} produced an invalid update: {}", id, e);
                e.in_step(id)
            })?;

            if let Some(sender) = &tx {
                let event = StepEvent {
                    index,
                    step: id.clone(),
                    update,
                };
                if sender.send(event).await.is_err() {
                    log::debug!("Step event receiver dropped; continuing without events");
                    tx = None;
                }
            }
        }

        log::info!("Graph '{}' run {} completed", self.name, run_id);
        Ok(state)
    }

    /// Render the sequence as a Mermaid flowchart
    pub fn to_mermaid(&self) -> String {
        let ids = mermaid_ids(self.steps.iter().map(|(id, _)| id.as_str()));

        let mut output = String::from("graph TD\n");
        output.push_str(&format!("    {}([{}])\n", START, START));
        for ((name, _), id) in self.steps.iter().zip(&ids) {
            output.push_str(&format!("    {}[\"{}\"]\n", id, name.replace('"', "#quot;")));
        }
        output.push_str(&format!("    {}([{}])\n", END, END));
        output.push('\n');

        let mut prev = START;
        for id in &ids {
            output.push_str(&format!("    {} --> {}\n", prev, id));
            prev = id.as_str();
        }
        output.push_str(&format!("    {} --> {}\n", prev, END));
        output
    }
}

/// Distinct Mermaid node ids for the given step names.
///
/// Ids are prefixed so a step named like a Mermaid keyword (`end`) stays
/// valid, and names that sanitize to the same id get a numeric suffix.
fn mermaid_ids<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut used = HashSet::new();
    names
        .map(|name| {
            let sanitized: String = name
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
                .collect();
            let base = format!("n_{}", sanitized);
            let mut id = base.clone();
            let mut suffix = 1;
            while !used.insert(id.clone()) {
                suffix += 1;
                id = format!("{}_{}", base, suffix);
            }
            id
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::langkit::graph::builder::GraphBuilder;
    use crate::langkit::graph::state::{FieldType, StateFieldDef};
    use crate::langkit::graph::step::{step_fn, FnStep};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn profile_schema() -> StateSchema {
        StateSchema::new()
            .field("name", StateFieldDef::overwrite(FieldType::String))
            .field("items", StateFieldDef::append())
    }

    fn sequence(steps: Vec<(&str, Arc<dyn Step>)>) -> CompiledGraph {
        let mut b = GraphBuilder::new("test", profile_schema());
        b.add_sequence(steps);
        b.compile().unwrap()
    }

    fn boxed(step: impl Step + 'static) -> Arc<dyn Step> {
        Arc::new(step)
    }

    fn set(update: PartialUpdate) -> Arc<dyn Step> {
        boxed(step_fn(move |_| Ok(update.clone())))
    }

    #[tokio::test]
    async fn test_name_and_items_scenario() {
        let graph = sequence(vec![
            (
                "set_name",
                set(PartialUpdate::new()
                    .with("name", "Ada")
                    .with("items", json!(["First"]))),
            ),
            ("add_item", set(PartialUpdate::new().with("items", json!(["Second"])))),
        ]);

        let state = graph.invoke(None).await.unwrap();
        assert_eq!(
            state.to_json(),
            json!({"name": "Ada", "items": ["First", "Second"]})
        );
    }

    #[tokio::test]
    async fn test_empty_updates_leave_defaults() {
        let graph = sequence(vec![
            ("one", set(PartialUpdate::new())),
            ("two", set(PartialUpdate::new())),
        ]);

        let state = graph.invoke(None).await.unwrap();
        assert_eq!(state, graph.initial_state(None).unwrap());
        assert_eq!(state.to_json(), json!({"name": "", "items": []}));
    }

    #[tokio::test]
    async fn test_zero_steps_returns_initial_state() {
        let graph = GraphBuilder::new("empty", profile_schema()).compile().unwrap();
        let initial = PartialUpdate::new().with("name", "Grace");

        let state = graph.invoke(Some(initial)).await.unwrap();
        assert_eq!(state.to_json(), json!({"name": "Grace", "items": []}));
    }

    #[tokio::test]
    async fn test_append_is_associative() {
        let split = sequence(vec![
            ("a", set(PartialUpdate::new().with("items", json!(["a"])))),
            ("b", set(PartialUpdate::new().with("items", json!(["b"])))),
            ("c", set(PartialUpdate::new().with("items", json!(["c"])))),
        ]);
        let grouped = sequence(vec![
            ("ab", set(PartialUpdate::new().with("items", json!(["a", "b"])))),
            ("c", set(PartialUpdate::new().with("items", json!(["c"])))),
        ]);

        let left = split.invoke(None).await.unwrap();
        let right = grouped.invoke(None).await.unwrap();
        assert_eq!(left.get("items"), right.get("items"));
        assert_eq!(left.get("items"), Some(&json!(["a", "b", "c"])));
    }

    #[tokio::test]
    async fn test_steps_see_prior_updates() {
        let graph = sequence(vec![
            ("set_name", set(PartialUpdate::new().with("name", "Ada"))),
            (
                "greet",
                boxed(step_fn(|s| {
                    let name = s.get_str("name").unwrap_or_default();
                    Ok(PartialUpdate::new().with("items", json!([format!("Hi {}", name)])))
                })),
            ),
        ]);

        let state = graph.invoke(None).await.unwrap();
        assert_eq!(state.get("items"), Some(&json!(["Hi Ada"])));
    }

    #[tokio::test]
    async fn test_failing_step_aborts_run() {
        let later = Arc::new(AtomicUsize::new(0));
        let counter = later.clone();
        let graph = sequence(vec![
            ("ok", set(PartialUpdate::new().with("name", "Ada"))),
            ("fail", boxed(step_fn(|_| Err("service unavailable".into())))),
            (
                "never",
                boxed(step_fn(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(PartialUpdate::new())
                })),
            ),
        ]);

        let err = graph.invoke(None).await.unwrap_err();
        match err {
            GraphError::StepFailed { step, source } => {
                assert_eq!(step, "fail");
                assert_eq!(source.to_string(), "service unavailable");
            }
            other => panic!("Expected StepFailed, got {:?}", other),
        }
        assert_eq!(later.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_field_in_step_update() {
        let graph = sequence(vec![(
            "bad",
            set(PartialUpdate::new().with("name", "Ada").with("age", 36)),
        )]);

        let err = graph.invoke(None).await.unwrap_err();
        match err {
            GraphError::UnknownField { field, step } => {
                assert_eq!(field, "age");
                assert_eq!(step.as_deref(), Some("bad"));
            }
            other => panic!("Expected UnknownField, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_field_in_initial_state() {
        let graph = sequence(vec![]);
        let err = graph
            .invoke(Some(PartialUpdate::new().with("mood", "happy")))
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::UnknownField { step: None, .. }));
    }

    #[tokio::test]
    async fn test_run_stream_emits_each_update_in_order() {
        let graph = sequence(vec![
            ("first", set(PartialUpdate::new().with("items", json!(["1"])))),
            (
                "second",
                boxed(FnStep::new(|_s: State| async {
                    Ok(PartialUpdate::new().with("items", json!(["2"])))
                })),
            ),
        ]);
        let (tx, mut rx) = mpsc::channel(8);

        let state = graph.run_stream(None, tx).await.unwrap();
        assert_eq!(state.get("items"), Some(&json!(["1", "2"])));

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].index, 0);
        assert_eq!(events[0].step, "first");
        assert_eq!(events[1].step, "second");
        assert_eq!(events[1].update.get("items"), Some(&json!(["2"])));
    }

    #[tokio::test]
    async fn test_run_stream_survives_dropped_receiver() {
        let graph = sequence(vec![
            ("a", set(PartialUpdate::new().with("name", "x"))),
            ("b", set(PartialUpdate::new().with("name", "y"))),
        ]);
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let state = graph.run_stream(None, tx).await.unwrap();
        assert_eq!(state.get_str("name"), Some("y"));
    }

    #[test]
    fn test_to_mermaid() {
        let graph = sequence(vec![
            ("greet", set(PartialUpdate::new())),
            ("shout loud", set(PartialUpdate::new())),
        ]);

        let mermaid = graph.to_mermaid();
        assert!(mermaid.starts_with("graph TD\n"));
        assert!(mermaid.contains("    n_shout_loud[\"shout loud\"]\n"));
        assert!(mermaid.contains("    __start__ --> n_greet\n"));
        assert!(mermaid.contains("    n_greet --> n_shout_loud\n"));
        assert!(mermaid.contains("    n_shout_loud --> __end__\n"));
    }

    #[test]
    fn test_mermaid_ids_stay_distinct() {
        let graph = sequence(vec![
            ("a-b", set(PartialUpdate::new())),
            ("a_b", set(PartialUpdate::new())),
            ("end", set(PartialUpdate::new())),
        ]);

        let mermaid = graph.to_mermaid();
        assert!(mermaid.contains("    n_a_b[\"a-b\"]\n"));
        assert!(mermaid.contains("    n_a_b_2[\"a_b\"]\n"));
        assert!(mermaid.contains("    n_a_b --> n_a_b_2\n"));
        assert!(mermaid.contains("    n_a_b_2 --> n_end\n"));
        assert!(mermaid.contains("    n_end --> __end__\n"));
        assert!(!mermaid.contains("n_a_b --> n_a_b\n"));
    }
}
