// SPDX-License-Identifier: MIT

//! Gemini Model - Google's Gemini API implementation

use super::{sse, Content, GenerationConfig, Model, ModelConfig, Part, Provider, TextStream};
use crate::adk::error::{LangkitError, ModelError, Result};
use crate::adk::tool::Tool;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;

/// Google Gemini model implementation
pub struct GeminiModel {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
    defaults: GenerationConfig,
}

impl GeminiModel {
    pub fn new(model_name: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model_name: model_name.into(),
            base_url: Provider::Gemini.default_base_url().to_string(),
            defaults: GenerationConfig::default(),
        }
    }

    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(ModelError::ApiKeyMissing("Gemini".to_string()).into());
        }
        Ok(Self {
            client: super::http_client(config)?,
            api_key: config.api_key.clone(),
            model_name: config.model_name.clone(),
            base_url: config.base_url.clone(),
            defaults: config.generation.clone(),
        })
    }

    fn build_body(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
        tools: Option<&[Arc<dyn Tool>]>,
    ) -> Value {
        let cfg = config.unwrap_or(&self.defaults);

        // Gemini has no system role in `contents`
        let contents: Vec<Value> = history
            .iter()
            .filter(|c| c.role != "system")
            .map(|c| {
                let parts: Vec<Value> = c.parts.iter().filter_map(part_to_gemini_json).collect();
                json!({ "role": c.role, "parts": parts })
            })
            .collect();

        let mut body = json!({ "contents": contents });

        if let Some(system) = history.iter().find(|c| c.role == "system") {
            body["systemInstruction"] = json!({ "parts": [{ "text": system.text() }] });
        }

        let mut generation = serde_json::Map::new();
        if let Some(temp) = cfg.temperature {
            generation.insert("temperature".to_string(), json!(temp));
        }
        if let Some(max) = cfg.max_output_tokens {
            generation.insert("maxOutputTokens".to_string(), json!(max));
        }
        if let Some(top_p) = cfg.top_p {
            generation.insert("topP".to_string(), json!(top_p));
        }
        if let Some(top_k) = cfg.top_k {
            generation.insert("topK".to_string(), json!(top_k));
        }
        if !generation.is_empty() {
            body["generationConfig"] = Value::Object(generation);
        }

        if let Some(tools) = tools.filter(|t| !t.is_empty()) {
            let function_declarations: Vec<Value> = tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name(),
                        "description": t.description(),
                        "parameters": gemini_parameters(t.schema())
                    })
                })
                .collect();

            body["tools"] = json!([{ "function_declarations": function_declarations }]);
        }
        body
    }

    async fn post(&self, method: &str, body: &Value) -> Result<reqwest::Response> {
        log::debug!(
            "Gemini request body: {}",
            serde_json::to_string_pretty(body).unwrap_or_default()
        );

        let url = format!("{}/models/{}:{}", self.base_url, self.model_name, method);
        let resp = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let text = resp.text().await?;
            return Err(LangkitError::api("Gemini", text));
        }
        Ok(resp)
    }

    fn parse_gemini_response(resp_json: &Value) -> Result<Content> {
        let candidate = resp_json["candidates"]
            .as_array()
            .and_then(|c| c.first())
            .ok_or_else(|| ModelError::InvalidResponse("No candidates in response".to_string()))?;

        if let Some(finish_reason) = candidate.get("finishReason").and_then(|v| v.as_str()) {
            log::debug!("Gemini finish reason: {}", finish_reason);
            match finish_reason {
                "UNEXPECTED_TOOL_CALL" => {
                    return Err(ModelError::InvalidResponse(
                        "Gemini returned UNEXPECTED_TOOL_CALL; the tool schema may be incompatible"
                            .to_string(),
                    )
                    .into())
                }
                "SAFETY" => {
                    return Err(LangkitError::api(
                        "Gemini",
                        "response blocked by safety filters",
                    ))
                }
                "MALFORMED_FUNCTION_CALL" => {
                    if let Some(msg) = candidate.get("finishMessage").and_then(|m| m.as_str()) {
                        log::warn!("Gemini malformed function call: {}", msg);
                        return Ok(Content::model(vec![Part::Text(format!(
                            "I tried to use a tool that isn't available. {}",
                            msg
                        ))]));
                    }
                }
                _ => {}
            }
        }

        let parts_json = candidate["content"]["parts"].as_array().ok_or_else(|| {
            log::error!("No parts in candidate: {}", candidate);
            ModelError::InvalidResponse("No content parts in Gemini response".to_string())
        })?;

        Ok(Content::model(
            parts_json.iter().flat_map(parse_gemini_part).collect(),
        ))
    }

    fn stream_delta(event: &Value) -> Option<String> {
        let parts = event["candidates"][0]["content"]["parts"].as_array()?;
        let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
        Some(text)
    }
}

#[async_trait]
impl Model for GeminiModel {
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
        let resp_json: Value = self.post("generateContent", &body).await?.json().await?;
        log::debug!("Gemini response: {}", resp_json);

        Self::parse_gemini_response(&resp_json)
    }

    async fn stream_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
    ) -> Result<TextStream> {
        let body = self.build_body(history, config, None);
        let resp = self.post("streamGenerateContent?alt=sse", &body).await?;
        Ok(sse::text_stream(resp, "Gemini", Self::stream_delta))
    }
}

/// Serialize a Part to Gemini API JSON format
/// Returns None for parts that shouldn't be sent (e.g., Thinking)
pub fn part_to_gemini_json(part: &Part) -> Option<Value> {
    match part {
        Part::Text(t) => Some(json!({ "text": t })),
        Part::Thinking(_) => None,
        Part::FunctionCall {
            name,
            args,
            thought_signature,
            ..
        } => {
            let mut fc = json!({ "functionCall": { "name": name, "args": args } });
            if let Some(sig) = thought_signature {
                fc["thoughtSignature"] = json!(sig);
            }
            Some(fc)
        }
        Part::FunctionResponse { name, response, .. } => {
            // `response` must be an object
            let response = if response.is_object() {
                response.clone()
            } else {
                json!({ "result": response })
            };
            Some(json!({ "functionResponse": { "name": name, "response": response } }))
        }
    }
}

/// Rewrite a tool schema into the OpenAPI subset Gemini accepts.
///
/// A `["T", "null"]` type union becomes `type: T` plus `nullable: true`, and
/// keywords outside the subset are dropped, at every nesting level.
pub fn gemini_parameters(schema: &Value) -> Value {
    let mut schema = schema.clone();
    transform_schema(&mut schema);
    schema
}

const UNSUPPORTED_KEYWORDS: [&str; 4] = ["$schema", "$id", "additionalProperties", "examples"];

fn transform_schema(value: &mut Value) {
    let Some(map) = value.as_object_mut() else {
        return;
    };
    for keyword in UNSUPPORTED_KEYWORDS {
        map.remove(keyword);
    }

    if let Some(Value::Array(types)) = map.get("type").cloned() {
        let nullable = types.iter().any(|t| t == "null");
        let mut non_null = types.into_iter().filter(|t| t != "null");
        match (non_null.next(), non_null.next()) {
            (Some(single), None) => {
                map.insert("type".to_string(), single);
            }
            // Gemini cannot express a multi-type union; leave it untyped
            _ => {
                map.remove("type");
            }
        }
        if nullable {
            map.insert("nullable".to_string(), json!(true));
        }
    }

    // Property names are user data, so only their values are schemas
    if let Some(Value::Object(properties)) = map.get_mut("properties") {
        properties.values_mut().for_each(transform_schema);
    }
    if let Some(items) = map.get_mut("items") {
        transform_schema(items);
    }
    for key in ["anyOf", "oneOf", "allOf"] {
        if let Some(Value::Array(variants)) = map.get_mut(key) {
            variants.iter_mut().for_each(transform_schema);
        }
    }
}

/// Parse a Gemini API JSON part into Parts.
///
/// Gemini does not assign call ids, so one is generated per function call.
pub fn parse_gemini_part(p: &Value) -> Vec<Part> {
    let mut parts = Vec::new();

    if let Some(thought) = p.get("thought").and_then(|t| t.as_str()) {
        if !thought.is_empty() {
            parts.push(Part::Thinking(thought.to_string()));
        }
    }

    if let Some(text) = p["text"].as_str() {
        parts.push(Part::Text(text.to_string()));
    } else if let Some(fc) = p.get("functionCall") {
        parts.push(Part::FunctionCall {
            id: format!("call_{}", uuid::Uuid::new_v4().simple()),
            name: fc["name"].as_str().unwrap_or_default().to_string(),
            args: fc["args"].clone(),
            thought_signature: p
                .get("thoughtSignature")
                .and_then(|s| s.as_str())
                .map(|s| s.to_string()),
        });
    }

    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialize_text_part() {
        let json = part_to_gemini_json(&Part::Text("Hello world".to_string())).unwrap();
        assert_eq!(json, json!({ "text": "Hello world" }));
    }

    #[test]
    fn test_serialize_thinking_part_returns_none() {
        assert!(part_to_gemini_json(&Part::Thinking("Internal".to_string())).is_none());
    }

    #[test]
    fn test_serialize_function_call_with_thought_signature() {
        let part = Part::FunctionCall {
            id: "call_1".to_string(),
            name: "search".to_string(),
            args: json!({"query": "rust"}),
            thought_signature: Some("sig123abc".to_string()),
        };
        let json = part_to_gemini_json(&part).unwrap();

        assert_eq!(json["functionCall"]["name"], "search");
        assert_eq!(json["functionCall"]["args"]["query"], "rust");
        assert_eq!(json["thoughtSignature"], "sig123abc");
    }

    #[test]
    fn test_scalar_function_response_is_wrapped() {
        let part = Part::FunctionResponse {
            id: "call_1".to_string(),
            name: "add".to_string(),
            response: json!(42),
        };
        let json = part_to_gemini_json(&part).unwrap();
        assert_eq!(json["functionResponse"]["response"], json!({"result": 42}));
    }

    #[test]
    fn test_parse_function_call_generates_id() {
        let json = json!({
            "functionCall": {"name": "get_weather", "args": {"city": "London"}},
            "thoughtSignature": "EvoRCvcR"
        });
        let parts = parse_gemini_part(&json);

        assert_eq!(parts.len(), 1);
        match &parts[0] {
            Part::FunctionCall {
                id,
                name,
                args,
                thought_signature,
            } => {
                assert!(id.starts_with("call_"));
                assert_eq!(name, "get_weather");
                assert_eq!(args["city"], "London");
                assert_eq!(thought_signature.as_deref(), Some("EvoRCvcR"));
            }
            _ => panic!("Expected FunctionCall part"),
        }
    }

    #[test]
    fn test_parse_empty_thought_ignored() {
        let parts = parse_gemini_part(&json!({ "thought": "", "text": "Hello" }));
        assert_eq!(parts, vec![Part::Text("Hello".to_string())]);
    }

    #[test]
    fn test_build_body_moves_system_prompt() {
        let model = GeminiModel::new("gemini-2.0-flash", "key");
        let body = model.build_body(
            &[Content::system("Be terse"), Content::user("Hi")],
            Some(&GenerationConfig {
                max_output_tokens: Some(64),
                ..Default::default()
            }),
            None,
        );

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be terse");
        assert_eq!(body["contents"].as_array().unwrap().len(), 1);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 64);
    }

    #[test]
    fn test_type_unions_become_nullable() {
        let schema = json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "offset": {"type": ["integer", "null"], "default": null},
                "tags": {"type": "array", "items": {"type": ["string", "null"]}},
                "either": {"type": ["string", "number"]},
                "examples": {"type": "string"}
            }
        });

        let out = gemini_parameters(&schema);
        assert!(out.get("$schema").is_none());
        assert!(out.get("additionalProperties").is_none());
        assert_eq!(out["properties"]["offset"]["type"], "integer");
        assert_eq!(out["properties"]["offset"]["nullable"], true);
        assert_eq!(out["properties"]["tags"]["items"]["type"], "string");
        assert!(out["properties"]["either"].get("type").is_none());
        assert_eq!(out["properties"]["examples"]["type"], "string");
    }

    #[test]
    fn test_build_body_sends_single_type_for_default_tools() {
        use crate::langkit::tools::default_tools;

        let model = GeminiModel::new("gemini-2.0-flash", "key");
        let tools = default_tools();
        let body = model.build_body(&[Content::user("What time is it?")], None, Some(&tools));

        let declarations = body["tools"][0]["function_declarations"].as_array().unwrap();
        assert_eq!(declarations.len(), 3);
        let clock = declarations.iter().find(|d| d["name"] == "current_time").unwrap();
        let offset = &clock["parameters"]["properties"]["utc_offset_hours"];
        assert_eq!(offset["type"], "integer");
        assert_eq!(offset["nullable"], true);
    }

    #[test]
    fn test_parse_safety_block_is_error() {
        let resp = json!({"candidates": [{"finishReason": "SAFETY"}]});
        assert!(GeminiModel::parse_gemini_response(&resp).is_err());
    }

    #[test]
    fn test_stream_delta_joins_text_parts() {
        let event = json!({
            "candidates": [{"content": {"parts": [{"text": "Hel"}, {"text": "lo"}]}}]
        });
        assert_eq!(GeminiModel::stream_delta(&event), Some("Hello".to_string()));
    }
}
