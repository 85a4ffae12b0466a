// SPDX-License-Identifier: MIT

//! Typed error handling for langkit-rs
//!
//! `LangkitError` is the crate-level error. Graph construction and execution
//! failures live in `GraphError`, provider problems in `ModelError`.

use std::error::Error as StdError;
use thiserror::Error;

/// Boxed error returned by user-supplied tools and steps
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, LangkitError>;

/// Top-level error type for langkit-rs
#[derive(Debug, Error)]
pub enum LangkitError {
    /// API errors from model providers
    #[error("API error from {provider}: {message}")]
    Api { provider: String, message: String },

    /// Tool not found during execution
    #[error("Tool '{name}' not found")]
    ToolNotFound { name: String },

    /// Configuration errors (missing env vars, invalid values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// State graph errors
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Model/provider errors
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Max iterations/turns reached
    #[error("Max {kind} reached: {limit}")]
    MaxIterations { kind: String, limit: u32 },

    #[error("{0}")]
    Other(String),
}

/// Errors raised while declaring, compiling or running a state graph
#[derive(Debug, Error)]
pub enum GraphError {
    /// An update referenced a field the schema does not declare.
    /// `step` is `None` when the update came from the caller's initial state.
    #[error("Field '{field}' is not declared in the state schema{}", origin(.step))]
    UnknownField { field: String, step: Option<String> },

    /// Schema is malformed (bad default, append on a non-array field, ...)
    #[error("Invalid state schema: {0}")]
    InvalidSchema(String),

    #[error("Node '{0}' is declared more than once")]
    DuplicateNode(String),

    #[error("Node id '{0}' is reserved")]
    ReservedName(String),

    #[error("Edge references unknown node '{0}'")]
    UnknownNode(String),

    /// A node has more than one outgoing edge
    #[error(
        "Node '{node}' has more than one successor; only straight-line sequences are supported"
    )]
    Branching { node: String },

    /// A node has more than one incoming edge
    #[error("Node '{node}' has more than one predecessor")]
    MultiplePredecessors { node: String },

    #[error("Circular dependency detected: {0:?}")]
    CircularDependency(Vec<String>),

    #[error("Nodes not reachable from start: {0:?}")]
    Unreachable(Vec<String>),

    #[error("Graph has nodes but no edge from start")]
    MissingEntry,

    #[error("Sequence never reaches the end marker")]
    MissingFinish,

    /// A step returned an error; the run is aborted
    #[error("Step '{step}' failed: {source}")]
    StepFailed {
        step: String,
        #[source]
        source: BoxError,
    },
}

/// Model/LLM-specific errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// API key not configured
    #[error("API key not configured for provider: {0}")]
    ApiKeyMissing(String),

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// Invalid response from model
    #[error("Invalid response from model: {0}")]
    InvalidResponse(String),
}

impl LangkitError {
    /// Create an API error
    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a tool not found error
    pub fn tool_not_found(name: impl Into<String>) -> Self {
        Self::ToolNotFound { name: name.into() }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

fn origin(step: &Option<String>) -> String {
    match step {
        Some(step) => format!(" (update from step '{}')", step),
        None => String::new(),
    }
}

impl GraphError {
    pub fn step_failed(step: impl Into<String>, source: BoxError) -> Self {
        Self::StepFailed {
            step: step.into(),
            source,
        }
    }

    /// Attribute an unknown-field error to the step whose update caused it
    pub fn in_step(self, step: &str) -> Self {
        match self {
            Self::UnknownField { field, step: None } => Self::UnknownField {
                field,
                step: Some(step.to_string()),
            },
            other => other,
        }
    }
}

impl From<&str> for LangkitError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

impl From<String> for LangkitError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<BoxError> for LangkitError {
    fn from(err: BoxError) -> Self {
        Self::Other(err.to_string())
    }
}
