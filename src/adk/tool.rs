// SPDX-License-Identifier: MIT

//! Tools that can be bound to a model
//!
//! [`Tool`] is the object-safe trait agents and providers work with.
//! [`FunctionTool`] wraps an async function whose argument type derives
//! `schemars::JsonSchema`, so the input schema never has to be written by hand.

use crate::adk::error::BoxError;
use async_trait::async_trait;
use futures::future::BoxFuture;
use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Trait for tools that can be called by agents.
///
/// # Optimization Notes
/// - `name()` and `description()` return `&str` to avoid allocation on every call
/// - `schema()` returns `&Value` to avoid cloning the schema on every access
/// - Implementations should store these values in struct fields
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool name (must be unique within an agent's tool set)
    fn name(&self) -> &str;

    /// Returns a human-readable description of what the tool does
    fn description(&self) -> &str;

    /// Returns the JSON schema for the tool's input parameters
    fn schema(&self) -> &Value;

    /// Execute the tool with the given input and return the result
    async fn execute(&self, input: Value) -> Result<Value, BoxError>;
}

type Handler<A> = Arc<dyn Fn(A) -> BoxFuture<'static, Result<Value, BoxError>> + Send + Sync>;

/// A tool backed by a typed async function.
///
/// Incoming arguments are deserialized into `A` before the handler runs;
/// malformed arguments surface as an execution error.
pub struct FunctionTool<A> {
    name: String,
    description: String,
    schema: Value,
    handler: Handler<A>,
    _args: PhantomData<fn(A)>,
}

impl<A> FunctionTool<A>
where
    A: JsonSchema + DeserializeOwned + Send + 'static,
{
    pub fn new<F, Fut>(name: impl Into<String>, description: impl Into<String>, f: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
    {
        let handler: Handler<A> =
            Arc::new(move |args: A| -> BoxFuture<'static, Result<Value, BoxError>> {
                Box::pin(f(args))
            });
        Self {
            name: name.into(),
            description: description.into(),
            schema: schema_for_args::<A>(),
            handler,
            _args: PhantomData,
        }
    }
}

#[async_trait]
impl<A> Tool for FunctionTool<A>
where
    A: JsonSchema + DeserializeOwned + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn schema(&self) -> &Value {
        &self.schema
    }

    async fn execute(&self, input: Value) -> Result<Value, BoxError> {
        let args: A = serde_json::from_value(input)
            .map_err(|e| format!("Invalid arguments for {}: {}", self.name, e))?;
        (self.handler)(args).await
    }
}

/// Generate an inlined JSON schema for a tool argument type.
///
/// Providers expect a bare object schema, so `$schema` and `title` are dropped.
/// The OpenAPI dialect marks optional arguments `nullable` and keeps every
/// `type` a single string, which all three providers accept.
pub fn schema_for_args<A: JsonSchema>() -> Value {
    let generator = SchemaSettings::openapi3()
        .with(|s| s.inline_subschemas = true)
        .into_generator();
    let root = generator.into_root_schema_for::<A>();
    let mut schema =
        serde_json::to_value(root).unwrap_or_else(|_| Value::Object(Default::default()));
    if let Some(obj) = schema.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
    }
    schema
}
