// SPDX-License-Identifier: MIT

//! OpenAI Model - Chat Completions API implementation

use super::{sse, Content, GenerationConfig, Model, ModelConfig, Part, Provider, TextStream};
use crate::adk::error::{LangkitError, ModelError, Result};
use crate::adk::tool::Tool;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;

/// OpenAI ChatGPT model implementation
pub struct OpenAIModel {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
    defaults: GenerationConfig,
}

impl OpenAIModel {
    pub fn new(model_name: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model_name: model_name.into(),
            base_url: Provider::OpenAI.default_base_url().to_string(),
            defaults: GenerationConfig::default(),
        }
    }

    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(ModelError::ApiKeyMissing("OpenAI".to_string()).into());
        }
        Ok(Self {
            client: super::http_client(config)?,
            api_key: config.api_key.clone(),
            model_name: config.model_name.clone(),
            base_url: config.base_url.clone(),
            defaults: config.generation.clone(),
        })
    }

    /// Convert internal Content to OpenAI messages.
    ///
    /// Tool responses become one `tool` message each, so a single Content
    /// may expand to several messages.
    fn content_to_openai_messages(content: &Content) -> Vec<Value> {
        let responses: Vec<Value> = content
            .parts
            .iter()
            .filter_map(|part| match part {
                Part::FunctionResponse { id, response, .. } => Some(json!({
                    "role": "tool",
                    "tool_call_id": id,
                    "content": serde_json::to_string(response).unwrap_or_default()
                })),
                _ => None,
            })
            .collect();
        if !responses.is_empty() {
            return responses;
        }

        let role = match content.role.as_str() {
            "model" => "assistant",
            other => other,
        };

        let mut tool_calls = Vec::new();
        let mut text_content = String::new();

        for part in &content.parts {
            match part {
                Part::Text(t) => text_content.push_str(t),
                Part::FunctionCall { id, name, args, .. } => {
                    tool_calls.push(json!({
                        "id": id,
                        "type": "function",
                        "function": {
                            "name": name,
                            "arguments": serde_json::to_string(args).unwrap_or_default()
                        }
                    }));
                }
                Part::Thinking(_) | Part::FunctionResponse { .. } => {}
            }
        }

        let message = if tool_calls.is_empty() {
            json!({
                "role": role,
                "content": text_content
            })
        } else {
            json!({
                "role": role,
                "content": if text_content.is_empty() { Value::Null } else { json!(text_content) },
                "tool_calls": tool_calls
            })
        };
        vec![message]
    }

    /// Convert tools to OpenAI function format
    fn tools_to_openai_format(tools: &[Arc<dyn Tool>]) -> Vec<Value> {
        tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name(),
                        "description": t.description(),
                        "parameters": t.schema()
                    }
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
            .flat_map(Self::content_to_openai_messages)
            .collect();

        let mut body = json!({
            "model": self.model_name,
            "messages": messages
        });

        if let Some(temp) = cfg.temperature {
            body["temperature"] = json!(temp);
        }
        if let Some(max_tokens) = cfg.max_output_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if let Some(top_p) = cfg.top_p {
            body["top_p"] = json!(top_p);
        }

        if let Some(tools) = tools.filter(|t| !t.is_empty()) {
            body["tools"] = json!(Self::tools_to_openai_format(tools));
            body["tool_choice"] = json!("auto");
        }
        body
    }

    async fn post(&self, body: &Value) -> Result<reqwest::Response> {
        log::debug!(
            "OpenAI request body: {}",
            serde_json::to_string_pretty(body).unwrap_or_default()
        );

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let text = resp.text().await?;
            return Err(LangkitError::api("OpenAI", text));
        }
        Ok(resp)
    }

    /// Parse OpenAI response into Content
    fn parse_openai_response(response: &Value) -> Result<Content> {
        let choice = response["choices"]
            .as_array()
            .and_then(|c| c.first())
            .ok_or_else(|| {
                ModelError::InvalidResponse("No choices in OpenAI response".to_string())
            })?;

        let message = &choice["message"];
        let mut parts = Vec::new();

        if let Some(content) = message["content"].as_str().filter(|c| !c.is_empty()) {
            parts.push(Part::Text(content.to_string()));
        }

        if let Some(tool_calls) = message["tool_calls"].as_array() {
            for tc in tool_calls {
                let args_str = tc["function"]["arguments"].as_str().unwrap_or("{}");
                let args: Value = serde_json::from_str(args_str).unwrap_or_else(|e| {
                    log::warn!("Unparseable tool arguments '{}': {}", args_str, e);
                    json!({})
                });

                parts.push(Part::FunctionCall {
                    id: tc["id"].as_str().unwrap_or_default().to_string(),
                    name: tc["function"]["name"]
                        .as_str()
                        .unwrap_or_default()
                        .to_string(),
                    args,
                    thought_signature: None,
                });
            }
        }

        Ok(Content::model(parts))
    }

    fn stream_delta(event: &Value) -> Option<String> {
        event["choices"][0]["delta"]["content"]
            .as_str()
            .map(str::to_string)
    }
}

#[async_trait]
impl Model for OpenAIModel {
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
        log::debug!("OpenAI response: {}", resp_json);

        Self::parse_openai_response(&resp_json)
    }

    async fn stream_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
    ) -> Result<TextStream> {
        let mut body = self.build_body(history, config, None);
        body["stream"] = json!(true);
        let resp = self.post(&body).await?;
        Ok(sse::text_stream(resp, "OpenAI", Self::stream_delta))
    }
}
