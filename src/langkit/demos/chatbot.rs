// SPDX-License-Identifier: MIT

//! Chatbot graph: a single step that sends the message history to a model and
//! appends the reply.

use crate::adk::error::{GraphError, LangkitError, Result};
use crate::adk::model::{Content, GenerationConfig, Model};
use crate::langkit::graph::{
    CompiledGraph, GraphBuilder, PartialUpdate, State, StateFieldDef, StateSchema, Step,
    StepResult,
};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

pub const MESSAGES: &str = "messages";

/// Calls a model with the `messages` field and appends its reply
pub struct ModelStep {
    model: Arc<dyn Model>,
    system: Option<String>,
    generation: Option<GenerationConfig>,
}

impl ModelStep {
    pub fn new(model: Arc<dyn Model>) -> Self {
        Self {
            model,
            system: None,
            generation: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = Some(generation);
        self
    }
}

#[async_trait]
impl Step for ModelStep {
    async fn run(&self, state: &State) -> StepResult {
        let messages: Vec<Content> = state
            .get(MESSAGES)
            .cloned()
            .map(serde_json::from_value::<Vec<Content>>)
            .transpose()?
            .unwrap_or_default();

        let mut history = Vec::with_capacity(messages.len() + 1);
        if let Some(system) = &self.system {
            history.push(Content::system(system.clone()));
        }
        history.extend(messages);

        log::debug!(
            "Calling {} with {} messages",
            self.model.name(),
            history.len()
        );
        let reply = self
            .model
            .generate_content(&history, self.generation.as_ref(), None)
            .await?;

        Ok(PartialUpdate::new().with(MESSAGES, json!([serde_json::to_value(reply)?])))
    }
}

pub fn chat_schema() -> StateSchema {
    StateSchema::new().field(MESSAGES, StateFieldDef::append())
}

pub fn build_chatbot_graph(
    model: Arc<dyn Model>,
) -> std::result::Result<CompiledGraph, GraphError> {
    let mut builder = GraphBuilder::new("chatbot", chat_schema());
    builder
        .add_node(
            "chatbot",
            ModelStep::new(model).with_system("You are a helpful assistant."),
        )
        .set_entry_point("chatbot")
        .set_finish_point("chatbot");
    builder.compile()
}

/// Run one user turn through the graph and return the model's reply text
pub async fn chat_turn(graph: &CompiledGraph, input: &str) -> Result<String> {
    let initial =
        PartialUpdate::new().with(MESSAGES, json!([serde_json::to_value(Content::user(input))?]));
    let state = graph.invoke(Some(initial)).await?;

    let messages: Vec<Content> = state.get_as(MESSAGES).unwrap_or_default();
    messages
        .last()
        .filter(|m| m.role == "model")
        .map(Content::text)
        .ok_or_else(|| LangkitError::other("chatbot graph produced no reply"))
}
