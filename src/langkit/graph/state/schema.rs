// SPDX-License-Identifier: MIT

//! State schema definitions

use crate::adk::error::{GraphError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Schema defining the graph state structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct StateSchema {
    /// Field definitions
    #[serde(flatten)]
    pub fields: HashMap<String, StateFieldDef>,
}

/// Definition of a single state field
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StateFieldDef {
    /// Type of the field
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Reducer for merging values
    #[serde(default)]
    pub reducer: ReducerType,
    /// Default value; falls back to the type's zero value
    pub default: Option<Value>,
}

/// Supported field types
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

/// How an update is merged into the current value of a field
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReducerType {
    /// Replace the value (default)
    #[default]
    Overwrite,
    /// Concatenate onto the end of the sequence
    Append,
}

impl FieldType {
    /// Zero value used when a field declares no default
    pub fn zero_value(&self) -> Value {
        match self {
            FieldType::String => Value::String(String::new()),
            FieldType::Number => Value::from(0),
            FieldType::Boolean => Value::Bool(false),
            FieldType::Array => Value::Array(Vec::new()),
            FieldType::Object => Value::Object(Map::new()),
        }
    }

    /// Whether `value` has this type. `null` is accepted for any type.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (FieldType::String, Value::String(_)) => true,
            (FieldType::Number, Value::Number(_)) => true,
            (FieldType::Boolean, Value::Bool(_)) => true,
            (FieldType::Array, Value::Array(_)) => true,
            (FieldType::Object, Value::Object(_)) => true,
            _ => false,
        }
    }
}

impl ReducerType {
    /// Combine the current value with an update.
    ///
    /// Overwrite returns `update`. Append returns `current` followed by the
    /// elements of `update`; a non-array update is appended as one element.
    pub fn merge(&self, current: Value, update: Value) -> Value {
        match self {
            ReducerType::Overwrite => update,
            ReducerType::Append => {
                let mut items = match current {
                    Value::Array(items) => items,
                    Value::Null => Vec::new(),
                    other => vec![other],
                };
                match update {
                    Value::Array(new_items) => items.extend(new_items),
                    other => items.push(other),
                }
                Value::Array(items)
            }
        }
    }
}

impl StateFieldDef {
    pub fn new(field_type: FieldType, reducer: ReducerType) -> Self {
        Self {
            field_type,
            reducer,
            default: None,
        }
    }

    /// Field replaced by each update
    pub fn overwrite(field_type: FieldType) -> Self {
        Self::new(field_type, ReducerType::Overwrite)
    }

    /// Array field that accumulates every update
    pub fn append() -> Self {
        Self::new(FieldType::Array, ReducerType::Append)
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Value the field holds before any step runs
    pub fn initial_value(&self) -> Value {
        self.default
            .clone()
            .unwrap_or_else(|| self.field_type.zero_value())
    }
}

impl StateSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field (builder style)
    pub fn field(mut self, name: impl Into<String>, def: StateFieldDef) -> Self {
        self.fields.insert(name.into(), def);
        self
    }

    /// Parse a schema from its YAML mapping form.
    ///
    /// Malformed YAML surfaces as [`LangkitError::Yaml`], a well-formed but
    /// invalid schema as [`GraphError::InvalidSchema`].
    ///
    /// [`LangkitError::Yaml`]: crate::adk::error::LangkitError::Yaml
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let schema: StateSchema = serde_yaml::from_str(yaml)?;
        schema.validate()?;
        Ok(schema)
    }

    pub fn get(&self, name: &str) -> Option<&StateFieldDef> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Reject schemas that cannot produce a well-defined state
    pub fn validate(&self) -> std::result::Result<(), GraphError> {
        for (name, def) in &self.fields {
            if name.trim().is_empty() {
                return Err(GraphError::InvalidSchema(
                    "field names must not be empty".to_string(),
                ));
            }
            if def.reducer == ReducerType::Append && def.field_type != FieldType::Array {
                return Err(GraphError::InvalidSchema(format!(
                    "field '{}' uses the append reducer but is declared as {:?}",
                    name, def.field_type
                )));
            }
            if let Some(default) = &def.default {
                let ok = def.field_type.accepts(default)
                    && !(def.reducer == ReducerType::Append && default.is_null());
                if !ok {
                    return Err(GraphError::InvalidSchema(format!(
                        "default for field '{}' does not match type {:?}: {}",
                        name, def.field_type, default
                    )));
                }
            }
        }
        Ok(())
    }
}
