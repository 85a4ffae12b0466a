// SPDX-License-Identifier: MIT

//! One-shot tool binding: send a prompt with tools attached and report what
//! the model asked for, optionally running the requested calls once.

use crate::adk::agent::{AgentEvent, ToolCallRequest};
use crate::adk::error::Result;
use crate::adk::model::{Content, Model};
use crate::langkit::registry::ToolRegistry;
use serde_json::json;
use std::sync::Arc;

/// Invoke the model once with every registered tool bound.
///
/// Returns `AssistantWithCall` when the model requested tools (followed by
/// one `ToolResult` per call if `execute` is set), otherwise `AssistantFinal`.
pub async fn invoke_with_tools(
    model: Arc<dyn Model>,
    registry: &ToolRegistry,
    prompt: &str,
    execute: bool,
) -> Result<Vec<AgentEvent>> {
    let tools = registry.list().await;
    log::info!(
        "Invoking {} with {} bound tools",
        model.name(),
        tools.len()
    );

    let history = vec![Content::user(prompt)];
    let response = model.generate_content(&history, None, Some(&tools)).await?;

    let calls: Vec<ToolCallRequest> = response
        .function_calls()
        .into_iter()
        .map(|(id, name, args)| ToolCallRequest {
            id: id.to_string(),
            name: name.to_string(),
            args: args.clone(),
        })
        .collect();

    let text = response.text();
    if calls.is_empty() {
        return Ok(vec![AgentEvent::AssistantFinal { text }]);
    }

    let mut events = vec![AgentEvent::AssistantWithCall {
        text: Some(text).filter(|t| !t.is_empty()),
        calls: calls.clone(),
    }];

    if execute {
        for call in calls {
            let result = match registry.get(&call.name).await {
                Some(tool) => tool
                    .execute(call.args.clone())
                    .await
                    .unwrap_or_else(|e| json!({ "error": e.to_string() })),
                None => json!({ "error": format!("Tool {} not found", call.name) }),
            };
            events.push(AgentEvent::ToolResult {
                id: call.id,
                name: call.name,
                result,
            });
        }
    }

    Ok(events)
}
