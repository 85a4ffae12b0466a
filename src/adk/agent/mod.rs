// SPDX-License-Identifier: MIT

//! Agent module - defines agent types for tool-calling conversations
//!
//! - `LLMAgent` - LLM agent that executes tool calls in a loop
//! - `AgentEvent` - tagged transcript entries emitted while an agent runs

mod llm;

pub use llm::{AgentRun, LLMAgent};

use crate::adk::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tokio::sync::mpsc;

/// A tool call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub args: Value,
}

/// One entry of an agent transcript.
///
/// Consumers switch on the variant rather than inspecting message shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Model turn that requested one or more tool calls
    AssistantWithCall {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        calls: Vec<ToolCallRequest>,
    },
    /// Output of an executed tool
    ToolResult {
        id: String,
        name: String,
        result: Value,
    },
    /// Final model answer
    AssistantFinal { text: String },
}

impl fmt::Display for AgentEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentEvent::AssistantWithCall { text, calls } => {
                if let Some(text) = text {
                    writeln!(f, "[assistant] {}", text)?;
                }
                let rendered: Vec<String> = calls
                    .iter()
                    .map(|c| format!("{}({})", c.name, c.args))
                    .collect();
                write!(f, "[assistant] calls: {}", rendered.join(", "))
            }
            AgentEvent::ToolResult { name, result, .. } => {
                write!(f, "[tool:{}] {}", name, result)
            }
            AgentEvent::AssistantFinal { text } => write!(f, "[assistant] {}", text),
        }
    }
}

/// Core agent trait for all agent types
#[async_trait]
pub trait Agent: Send + Sync {
    /// Returns the agent name
    fn name(&self) -> &str;

    /// Run the agent with the given input
    async fn run(&self, input: String) -> Result<String>;

    /// Run the agent with streaming events
    async fn run_stream(&self, input: String, tx: mpsc::Sender<AgentEvent>) -> Result<String> {
        // Default implementation falls back to run()
        let answer = self.run(input).await?;
        let _ = tx
            .send(AgentEvent::AssistantFinal {
                text: answer.clone(),
            })
            .await;
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// A simple mock agent that transforms input
    pub struct MockAgent {
        name: String,
        transform: fn(String) -> String,
    }

    #[async_trait]
    impl Agent for MockAgent {
        fn name(&self) -> &str {
            &self.name
        }

        async fn run(&self, input: String) -> Result<String> {
            Ok((self.transform)(input))
        }
    }

    #[tokio::test]
    async fn test_default_run_stream_emits_final() {
        let agent = MockAgent {
            name: "upper".to_string(),
            transform: |s| s.to_uppercase(),
        };
        let (tx, mut rx) = mpsc::channel(4);

        let result = agent.run_stream("hi".to_string(), tx).await.unwrap();
        assert_eq!(result, "HI");
        assert_eq!(
            rx.recv().await,
            Some(AgentEvent::AssistantFinal {
                text: "HI".to_string()
            })
        );
    }

    #[test]
    fn test_event_serializes_with_kind_tag() {
        let event = AgentEvent::ToolResult {
            id: "call_1".to_string(),
            name: "add".to_string(),
            result: json!(5),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["kind"], "tool_result");
        assert_eq!(value["name"], "add");
    }

    #[test]
    fn test_event_display() {
        let call = AgentEvent::AssistantWithCall {
            text: None,
            calls: vec![ToolCallRequest {
                id: "call_1".to_string(),
                name: "add".to_string(),
                args: json!({"a": 1, "b": 2}),
            }],
        };
        assert_eq!(call.to_string(), r#"[assistant] calls: add({"a":1,"b":2})"#);

        let done = AgentEvent::AssistantFinal {
            text: "3".to_string(),
        };
        assert_eq!(done.to_string(), "[assistant] 3");
    }
}
