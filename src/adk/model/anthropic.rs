// SPDX-License-Identifier: MIT

//! Anthropic Model - Claude Messages API implementation

use super::{sse, Content, GenerationConfig, Model, ModelConfig, Part, Provider, TextStream};
use crate::adk::error::{LangkitError, ModelError, Result};
use crate::adk::tool::Tool;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic Claude model implementation
pub struct AnthropicModel {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
    defaults: GenerationConfig,
}

impl AnthropicModel {
    pub fn new(model_name: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model_name: model_name.into(),
            base_url: Provider::Anthropic.default_base_url().to_string(),
            defaults: GenerationConfig::default(),
        }
    }

    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(ModelError::ApiKeyMissing("Anthropic".to_string()).into());
        }
        Ok(Self {
            client: super::http_client(config)?,
            api_key: config.api_key.clone(),
            model_name: config.model_name.clone(),
            base_url: config.base_url.clone(),
            defaults: config.generation.clone(),
        })
    }

    /// Extract system message from history
    fn extract_system_message(history: &[Content]) -> Option<String> {
        history
            .iter()
            .find(|c| c.role == "system")
            .and_then(|c| c.parts.first())
            .and_then(|p| match p {
                Part::Text(t) => Some(t.clone()),
                _ => None,
            })
    }

    /// Convert internal Content to Anthropic message format
    fn content_to_anthropic_message(content: &Content) -> Option<Value> {
        // System prompt travels in the top-level `system` field
        if content.role == "system" {
            return None;
        }

        let role = match content.role.as_str() {
            "model" => "assistant",
            other => other,
        };

        let message_content: Vec<Value> = content
            .parts
            .iter()
            .filter_map(|part| match part {
                Part::Text(t) => Some(json!({ "type": "text", "text": t })),
                // Thinking blocks need a signature to be replayed; drop them
                Part::Thinking(_) => None,
                Part::FunctionCall { id, name, args, .. } => Some(json!({
                    "type": "tool_use",
                    "id": id,
                    "name": name,
                    "input": args
                })),
                Part::FunctionResponse { id, response, .. } => Some(json!({
                    "type": "tool_result",
                    "tool_use_id": id,
                    "content": serde_json::to_string(response).unwrap_or_default()
                })),
            })
            .collect();

        if message_content.is_empty() {
            return None;
        }

        Some(json!({
            "role": role,
            "content": message_content
        }))
    }

    /// Convert tools to Anthropic tool format
    fn tools_to_anthropic_format(tools: &[Arc<dyn Tool>]) -> Vec<Value> {
        tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name(),
                    "description": t.description(),
                    "input_schema": t.schema()
                })
            })
            .collect()
    }

    fn build_body(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
        tools: Option<&[Arc<dyn Tool>]>,
    ) -> Value {
        let cfg = config.unwrap_or(&self.defaults);
        let messages: Vec<Value> = history
            .iter()
            .filter_map(Self::content_to_anthropic_message)
            .collect();

        let mut body = json!({
            "model": self.model_name,
            "messages": messages,
            "max_tokens": cfg.max_output_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
        });

        if let Some(sys) = Self::extract_system_message(history) {
            body["system"] = json!(sys);
        }
        if let Some(temp) = cfg.temperature {
            body["temperature"] = json!(temp);
        }
        if let Some(top_p) = cfg.top_p {
            body["top_p"] = json!(top_p);
        }
        if let Some(top_k) = cfg.top_k {
            body["top_k"] = json!(top_k);
        }

        if let Some(tools) = tools.filter(|t| !t.is_empty()) {
            body["tools"] = json!(Self::tools_to_anthropic_format(tools));
        }
        body
    }

    async fn post(&self, body: &Value) -> Result<reqwest::Response> {
        log::debug!(
            "Anthropic request body: {}",
            serde_json::to_string_pretty(body).unwrap_or_default()
        );

        let resp = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let text = resp.text().await?;
            return Err(LangkitError::api("Anthropic", text));
        }
        Ok(resp)
    }

    /// Parse Anthropic response into Content
    fn parse_anthropic_response(response: &Value) -> Result<Content> {
        let content_blocks = response["content"].as_array().ok_or_else(|| {
            ModelError::InvalidResponse("No content in Anthropic response".to_string())
        })?;

        let mut parts = Vec::new();

        for block in content_blocks {
            match block["type"].as_str() {
                Some("text") => {
                    if let Some(text) = block["text"].as_str().filter(|t| !t.is_empty()) {
                        parts.push(Part::Text(text.to_string()));
                    }
                }
                Some("thinking") => {
                    if let Some(thinking) = block["thinking"].as_str().filter(|t| !t.is_empty()) {
                        parts.push(Part::Thinking(thinking.to_string()));
                    }
                }
                Some("tool_use") => {
                    parts.push(Part::FunctionCall {
                        id: block["id"].as_str().unwrap_or_default().to_string(),
                        name: block["name"].as_str().unwrap_or_default().to_string(),
                        args: block["input"].clone(),
                        thought_signature: None,
                    });
                }
                _ => {}
            }
        }

        if let Some(stop_reason) = response["stop_reason"].as_str() {
            log::debug!("Anthropic stop reason: {}", stop_reason);
        }

        Ok(Content::model(parts))
    }

    /// Text delta of a `content_block_delta` stream event
    fn stream_delta(event: &Value) -> Option<String> {
        if event["type"] != "content_block_delta" {
            return None;
        }
        event["delta"]["text"].as_str().map(str::to_string)
    }
}

#[async_trait]
impl Model for AnthropicModel {
    fn name(&self) -> &str {
        &self.model_name
    }

    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
        tools: Option<&[Arc<dyn Tool>]>,
    ) -> Result<Content> {
        let body = self.build_body(history, config, tools);
        let resp_json: Value = self.post(&body).await?.json().await?;
        log::debug!("Anthropic response: {}", resp_json);

        Self::parse_anthropic_response(&resp_json)
    }

    async fn stream_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
    ) -> Result<TextStream> {
        let mut body = self.build_body(history, config, None);
        body["stream"] = json!(true);
        let resp = self.post(&body).await?;
        Ok(sse::text_stream(resp, "Anthropic", Self::stream_delta))
    }
}
