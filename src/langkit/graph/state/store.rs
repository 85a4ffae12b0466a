// SPDX-License-Identifier: MIT

//! Runtime state storage for graph execution

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use super::schema::{ReducerType, StateSchema};
use crate::adk::error::GraphError;

/// A step's proposed changes: zero or more declared fields with new values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartialUpdate(Map<String, Value>);

impl PartialUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field value (builder style)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Build from a JSON object; anything else is rejected
    pub fn from_json(value: Value) -> Result<Self, GraphError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(GraphError::InvalidSchema(format!(
                "partial update must be a JSON object, got {}",
                other
            ))),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for PartialUpdate {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Runtime graph state with reducer support.
///
/// The field set is fixed by the schema at construction; updates that name
/// any other field are rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    /// Current state values
    fields: HashMap<String, Value>,
    /// Reducers for each field
    reducers: HashMap<String, ReducerType>,
}

impl State {
    /// Create a State holding every field's initial value
    pub fn new(schema: &StateSchema) -> Self {
        let mut fields = HashMap::with_capacity(schema.fields.len());
        let mut reducers = HashMap::with_capacity(schema.fields.len());

        for (name, def) in &schema.fields {
            fields.insert(name.clone(), def.initial_value());
            reducers.insert(name.clone(), def.reducer);
        }

        Self { fields, reducers }
    }

    /// Merge an update into this state.
    ///
    /// Every key is checked before anything is merged, so a rejected update
    /// leaves the state untouched.
    pub fn apply(&mut self, update: &PartialUpdate) -> Result<(), GraphError> {
        if let Some(unknown) = update.keys().find(|k| !self.reducers.contains_key(*k)) {
            return Err(GraphError::UnknownField {
                field: unknown.clone(),
                step: None,
            });
        }

        for (key, value) in update.iter() {
            let reducer = self.reducers[key];
            let current = self.fields.remove(key).unwrap_or(Value::Null);
            self.fields
                .insert(key.clone(), reducer.merge(current, value.clone()));
        }
        Ok(())
    }

    /// Functional form of [`State::apply`]: returns the next state
    pub fn merged(&self, update: &PartialUpdate) -> Result<State, GraphError> {
        let mut next = self.clone();
        next.apply(update)?;
        Ok(next)
    }

    /// Get a field value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Deserialize a field into a concrete type
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.fields
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Convenience accessor for string fields
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Get a nested field value using dot notation (e.g., "profile.name")
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.fields.get(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// Convert state to JSON object
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Get all field names
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }
}
