// SPDX-License-Identifier: MIT

//! LLM Agent - Standard LLM agent with tool calling
//!
//! This agent sends prompts to an LLM and handles tool calls in a loop
//! until a text response is received.

use super::{Agent, AgentEvent, ToolCallRequest};
use crate::adk::error::{LangkitError, Result};
use crate::adk::model::{Content, GenerationConfig, Model, Part};
use crate::adk::tool::Tool;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

const DEFAULT_MAX_TURNS: u32 = 10;

/// Outcome of a complete agent run
#[derive(Debug, Clone)]
pub struct AgentRun {
    pub answer: String,
    pub transcript: Vec<AgentEvent>,
    pub turns: u32,
}

/// Standard LLM agent with tool calling support
pub struct LLMAgent {
    pub name: String,
    pub description: String,
    pub instruction: String,
    pub model: Arc<dyn Model>,
    pub tools: Vec<Arc<dyn Tool>>,
    pub max_turns: u32,
    pub generation: Option<GenerationConfig>,
    /// HashMap for O(1) tool lookups
    tool_map: HashMap<String, usize>,
}

impl LLMAgent {
    pub fn new(
        name: String,
        description: String,
        instruction: String,
        model: Arc<dyn Model>,
        tools: Vec<Arc<dyn Tool>>,
    ) -> Self {
        let tool_map: HashMap<String, usize> = tools
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name().to_string(), i))
            .collect();

        Self {
            name,
            description,
            instruction,
            model,
            tools,
            max_turns: DEFAULT_MAX_TURNS,
            generation: None,
            tool_map,
        }
    }

    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = Some(generation);
        self
    }

    /// O(1) tool lookup by name
    fn get_tool(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tool_map.get(name).map(|&i| &self.tools[i])
    }

    /// Run to completion and keep the full transcript
    pub async fn run_with_transcript(&self, input: String) -> Result<AgentRun> {
        self.run_loop(input, None).await
    }

    /// Execute one requested call; failures become an `{"error": ...}` result
    async fn call_tool(&self, name: &str, args: &Value) -> Value {
        let Some(tool) = self.get_tool(name) else {
            log::error!("Tool {} not found", name);
            return json!({ "error": format!("Tool {} not found", name) });
        };

        match tool.execute(args.clone()).await {
            Ok(res) => res,
            Err(e) => {
                log::error!("Tool {} failed: {}", name, e);
                json!({ "error": e.to_string() })
            }
        }
    }

    async fn run_loop(
        &self,
        input: String,
        tx: Option<&mpsc::Sender<AgentEvent>>,
    ) -> Result<AgentRun> {
        let mut history = vec![Content::system(self.instruction.clone()), Content::user(input)];
        let mut transcript = Vec::new();

        let emit = |event: AgentEvent, transcript: &mut Vec<AgentEvent>| {
            let sender = tx.cloned();
            transcript.push(event.clone());
            async move {
                if let Some(sender) = sender {
                    let _ = sender.send(event).await;
                }
            }
        };

        for turn in 0..self.max_turns {
            log::info!("Agent {} turn {}/{}", self.name, turn + 1, self.max_turns);
            let response = self
                .model
                .generate_content(&history, self.generation.as_ref(), Some(&self.tools))
                .await?;

            let text = response.text();
            let calls: Vec<ToolCallRequest> = response
                .function_calls()
                .into_iter()
                .map(|(id, name, args)| ToolCallRequest {
                    id: id.to_string(),
                    name: name.to_string(),
                    args: args.clone(),
                })
                .collect();

            if calls.is_empty() {
                if text.is_empty() {
                    log::warn!(
                        "Agent {} received empty response with no function calls",
                        self.name
                    );
                }
                emit(AgentEvent::AssistantFinal { text: text.clone() }, &mut transcript).await;
                return Ok(AgentRun {
                    answer: text,
                    transcript,
                    turns: turn + 1,
                });
            }

            emit(
                AgentEvent::AssistantWithCall {
                    text: Some(text).filter(|t| !t.is_empty()),
                    calls: calls.clone(),
                },
                &mut transcript,
            )
            .await;

            let mut function_responses = Vec::with_capacity(calls.len());
            for call in calls {
                log::info!("Tool call: {} {}", call.name, call.args);
                let result = self.call_tool(&call.name, &call.args).await;
                log::debug!("Tool {} response: {}", call.name, result);

                emit(
                    AgentEvent::ToolResult {
                        id: call.id.clone(),
                        name: call.name.clone(),
                        result: result.clone(),
                    },
                    &mut transcript,
                )
                .await;

                function_responses.push(Part::FunctionResponse {
                    id: call.id,
                    name: call.name,
                    response: result,
                });
            }

            history.push(response);
            history.push(Content {
                role: "user".to_string(),
                parts: function_responses,
            });
        }

        log::error!(
            "Agent {} reached max turns without text response",
            self.name
        );
        Err(LangkitError::MaxIterations {
            kind: "turns".to_string(),
            limit: self.max_turns,
        })
    }
}

#[async_trait]
impl Agent for LLMAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, input: String) -> Result<String> {
        Ok(self.run_loop(input, None).await?.answer)
    }

    async fn run_stream(&self, input: String, tx: mpsc::Sender<AgentEvent>) -> Result<String> {
        Ok(self.run_loop(input, Some(&tx)).await?.answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::error::BoxError;
    use once_cell::sync::Lazy;
    use std::sync::Mutex;

    /// Mock model replaying scripted responses and recording each history
    struct ScriptedModel {
        responses: Mutex<Vec<Content>>,
        seen: Mutex<Vec<Vec<Content>>>,
    }

    impl ScriptedModel {
        fn new(responses: Vec<Content>) -> Self {
            Self {
                responses: Mutex::new(responses),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Model for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate_content(
            &self,
            history: &[Content],
            _config: Option<&GenerationConfig>,
            _tools: Option<&[Arc<dyn Tool>]>,
        ) -> Result<Content> {
            self.seen.lock().unwrap().push(history.to_vec());
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                Ok(Content::model(vec![Part::Text("done".to_string())]))
            } else {
                Ok(responses.remove(0))
            }
        }
    }

    static ADD_SCHEMA: Lazy<Value> = Lazy::new(|| {
        json!({
            "type": "object",
            "properties": {"a": {"type": "number"}, "b": {"type": "number"}}
        })
    });

    struct AddTool;

    #[async_trait]
    impl Tool for AddTool {
        fn name(&self) -> &str {
            "add"
        }
        fn description(&self) -> &str {
            "Add two numbers"
        }
        fn schema(&self) -> &Value {
            &ADD_SCHEMA
        }
        async fn execute(&self, input: Value) -> std::result::Result<Value, BoxError> {
            let a = input["a"].as_f64().ok_or("a must be a number")?;
            let b = input["b"].as_f64().ok_or("b must be a number")?;
            Ok(json!(a + b))
        }
    }

    fn call(id: &str, name: &str, args: Value) -> Content {
        Content::model(vec![Part::FunctionCall {
            id: id.to_string(),
            name: name.to_string(),
            args,
            thought_signature: None,
        }])
    }

    fn agent(model: Arc<ScriptedModel>) -> LLMAgent {
        LLMAgent::new(
            "math".to_string(),
            "Does math".to_string(),
            "You are a calculator.".to_string(),
            model,
            vec![Arc::new(AddTool)],
        )
    }

    #[tokio::test]
    async fn test_text_response_returns_immediately() {
        let model = Arc::new(ScriptedModel::new(vec![Content::model(vec![Part::Text(
            "Hello!".to_string(),
        )])]));
        let run = agent(model).run_with_transcript("hi".to_string()).await.unwrap();

        assert_eq!(run.answer, "Hello!");
        assert_eq!(run.turns, 1);
        assert_eq!(
            run.transcript,
            vec![AgentEvent::AssistantFinal {
                text: "Hello!".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_tool_result_is_fed_back() {
        let model = Arc::new(ScriptedModel::new(vec![
            call("call_1", "add", json!({"a": 2, "b": 3})),
            Content::model(vec![Part::Text("The sum is 5".to_string())]),
        ]));
        let run = agent(model.clone())
            .run_with_transcript("2+3?".to_string())
            .await
            .unwrap();

        assert_eq!(run.answer, "The sum is 5");
        assert_eq!(run.turns, 2);
        assert!(matches!(run.transcript[0], AgentEvent::AssistantWithCall { .. }));
        assert_eq!(
            run.transcript[1],
            AgentEvent::ToolResult {
                id: "call_1".to_string(),
                name: "add".to_string(),
                result: json!(5.0),
            }
        );
        assert!(matches!(run.transcript[2], AgentEvent::AssistantFinal { .. }));

        // second request carries the call and its response
        let seen = model.seen.lock().unwrap();
        let second = &seen[1];
        assert_eq!(second.len(), 4);
        assert_eq!(
            second[3].parts[0],
            Part::FunctionResponse {
                id: "call_1".to_string(),
                name: "add".to_string(),
                response: json!(5.0),
            }
        );
    }

    #[tokio::test]
    async fn test_missing_tool_and_tool_error_do_not_abort() {
        let model = Arc::new(ScriptedModel::new(vec![
            call("call_1", "divide", json!({})),
            call("call_2", "add", json!({"a": "x"})),
        ]));
        let run = agent(model).run_with_transcript("?".to_string()).await.unwrap();

        assert_eq!(run.answer, "done");
        match &run.transcript[1] {
            AgentEvent::ToolResult { result, .. } => {
                assert_eq!(result["error"], "Tool divide not found")
            }
            other => panic!("Expected ToolResult, got {:?}", other),
        }
        match &run.transcript[3] {
            AgentEvent::ToolResult { result, .. } => {
                assert_eq!(result["error"], "a must be a number")
            }
            other => panic!("Expected ToolResult, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_max_turns_is_an_error() {
        let model = Arc::new(ScriptedModel::new(vec![
            call("c1", "add", json!({"a": 1, "b": 1})),
            call("c2", "add", json!({"a": 1, "b": 1})),
        ]));
        let err = agent(model)
            .with_max_turns(2)
            .run("loop".to_string())
            .await
            .unwrap_err();

        assert!(matches!(err, LangkitError::MaxIterations { limit: 2, .. }));
    }

    #[tokio::test]
    async fn test_run_stream_forwards_events() {
        let model = Arc::new(ScriptedModel::new(vec![
            call("call_1", "add", json!({"a": 1, "b": 1})),
            Content::model(vec![Part::Text("2".to_string())]),
        ]));
        let (tx, mut rx) = mpsc::channel(16);

        let answer = agent(model).run_stream("1+1".to_string(), tx).await.unwrap();
        assert_eq!(answer, "2");

        let mut kinds = Vec::new();
        while let Some(event) = rx.recv().await {
            kinds.push(serde_json::to_value(&event).unwrap()["kind"].clone());
        }
        assert_eq!(
            kinds,
            vec![
                json!("assistant_with_call"),
                json!("tool_result"),
                json!("assistant_final")
            ]
        );
    }
}
