// SPDX-License-Identifier: MIT

use crate::adk::error::{LangkitError, Result};
use crate::adk::tool::Tool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared set of tools available for binding, keyed by tool name
#[derive(Clone)]
pub struct ToolRegistry {
    tools: Arc<RwLock<HashMap<String, Arc<dyn Tool>>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registry pre-populated with the given tools
    pub async fn with_tools(tools: Vec<Arc<dyn Tool>>) -> Self {
        let registry = Self::new();
        for tool in tools {
            registry.register(tool).await;
        }
        registry
    }

    pub async fn register(&self, tool: Arc<dyn Tool>) {
        let mut tools = self.tools.write().await;
        if tools.insert(tool.name().to_string(), tool.clone()).is_some() {
            log::warn!("Tool {} was already registered; replacing it", tool.name());
        }
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        let tools = self.tools.read().await;
        tools.get(name).cloned()
    }

    /// Look up several tools at once; fails on the first unknown name
    pub async fn resolve(&self, names: &[&str]) -> Result<Vec<Arc<dyn Tool>>> {
        let tools = self.tools.read().await;
        names
            .iter()
            .map(|name| {
                tools
                    .get(*name)
                    .cloned()
                    .ok_or_else(|| LangkitError::tool_not_found(*name))
            })
            .collect()
    }

    /// Registered tool names, sorted
    pub async fn names(&self) -> Vec<String> {
        let tools = self.tools.read().await;
        let mut names: Vec<String> = tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// All registered tools, ordered by name
    pub async fn list(&self) -> Vec<Arc<dyn Tool>> {
        let tools = self.tools.read().await;
        let mut all: Vec<Arc<dyn Tool>> = tools.values().cloned().collect();
        all.sort_by(|a, b| a.name().cmp(b.name()));
        all
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
