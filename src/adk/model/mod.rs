// SPDX-License-Identifier: MIT

//! Model module - defines LLM model trait and implementations
//!
//! This module provides the core Model trait and shared types.
//! Model implementations are in their own submodules:
//! - [anthropic] - Anthropic's Claude API
//! - [gemini] - Google's Gemini API
//! - [openai] - OpenAI's ChatGPT API
//!
//! Clients are built from an explicit [`ModelConfig`] and handed to whatever
//! needs them; nothing here reads process-wide state after construction.

pub mod anthropic;
mod config;
pub mod gemini;
pub mod openai;
pub mod sse;

pub use config::{ModelConfig, Provider};

use crate::adk::error::Result;
use crate::adk::tool::Tool;
use async_trait::async_trait;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::sync::Arc;

/// Configuration for model generation
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GenerationConfig {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

/// Parts of a message - text, thinking, function calls, etc.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Part {
    /// Regular text output from the model
    Text(String),
    /// Thinking/reasoning content from thinking models
    Thinking(String),
    /// Function/tool call requested by the model
    FunctionCall {
        /// Provider call id, echoed back in the matching response
        id: String,
        name: String,
        args: serde_json::Value,
        /// Thought signature from Gemini thinking models - must be preserved and sent back
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thought_signature: Option<String>,
    },
    /// Response from executing a function/tool
    FunctionResponse {
        id: String,
        name: String,
        response: serde_json::Value,
    },
}

impl Content {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn model(parts: Vec<Part>) -> Self {
        Self {
            role: "model".to_string(),
            parts,
        }
    }

    /// Concatenated text parts (thinking excluded)
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Function calls requested in this message as `(id, name, args)`
    pub fn function_calls(&self) -> Vec<(&str, &str, &serde_json::Value)> {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::FunctionCall { id, name, args, .. } => {
                    Some((id.as_str(), name.as_str(), args))
                }
                _ => None,
            })
            .collect()
    }
}

/// Lazily produced text fragments of a streamed response.
///
/// Dropping the stream stops consumption; there is no separate cancel signal.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Core trait for LLM model implementations
#[async_trait]
pub trait Model: Send + Sync {
    /// Model identifier sent to the provider
    fn name(&self) -> &str;

    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
        tools: Option<&[Arc<dyn Tool>]>,
    ) -> Result<Content>;

    /// Stream the text of a response as it is generated.
    ///
    /// The default falls back to a single fragment from `generate_content`.
    async fn stream_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
    ) -> Result<TextStream> {
        let text = self.generate_content(history, config, None).await?.text();
        Ok(Box::pin(futures::stream::once(async move { Ok(text) })))
    }
}

/// Build a model client for the configured provider
pub fn create_model(config: &ModelConfig) -> Result<Arc<dyn Model>> {
    log::info!(
        "Using provider: {} with model: {}",
        config.provider,
        config.model_name
    );
    let model: Arc<dyn Model> = match config.provider {
        Provider::OpenAI => Arc::new(openai::OpenAIModel::from_config(config)?),
        Provider::Anthropic => Arc::new(anthropic::AnthropicModel::from_config(config)?),
        Provider::Gemini => Arc::new(gemini::GeminiModel::from_config(config)?),
    };
    Ok(model)
}

/// Shared HTTP client honouring the configured timeout
pub(crate) fn http_client(config: &ModelConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}
