// SPDX-License-Identifier: MIT

//! Graph builder - declares nodes and edges and compiles them into a
//! straight-line step sequence.

use super::executor::CompiledGraph;
use super::state::StateSchema;
use super::step::Step;
use crate::adk::error::GraphError;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Virtual node where execution begins
pub const START: &str = "__start__";
/// Virtual node marking completion
pub const END: &str = "__end__";

/// Collects nodes and edges for a graph over one state schema
pub struct GraphBuilder {
    name: String,
    schema: StateSchema,
    nodes: Vec<(String, Arc<dyn Step>)>,
    edges: Vec<(String, String)>,
    /// First problem seen while adding nodes; reported by `compile`
    pending: Option<GraphError>,
}

impl GraphBuilder {
    pub fn new(name: impl Into<String>, schema: StateSchema) -> Self {
        Self {
            name: name.into(),
            schema,
            nodes: Vec::new(),
            edges: Vec::new(),
            pending: None,
        }
    }

    fn has_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|(n, _)| n == id)
    }

    /// Add a named step
    pub fn add_node(&mut self, id: impl Into<String>, step: impl Step + 'static) -> &mut Self {
        let id = id.into();
        if self.pending.is_none() {
            if id == START || id == END {
                self.pending = Some(GraphError::ReservedName(id.clone()));
            } else if self.has_node(&id) {
                self.pending = Some(GraphError::DuplicateNode(id.clone()));
            }
        }
        self.nodes.push((id, Arc::new(step)));
        self
    }

    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        self.edges.push((from.into(), to.into()));
        self
    }

    /// Shorthand for `add_edge(START, node)`
    pub fn set_entry_point(&mut self, node: impl Into<String>) -> &mut Self {
        self.add_edge(START, node)
    }

    /// Shorthand for `add_edge(node, END)`
    pub fn set_finish_point(&mut self, node: impl Into<String>) -> &mut Self {
        self.add_edge(node, END)
    }

    /// Add the steps and wire them `START -> a -> b -> ... -> END`
    pub fn add_sequence<N, I>(&mut self, steps: I) -> &mut Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Arc<dyn Step>)>,
    {
        let mut prev = START.to_string();
        for (id, step) in steps {
            let id = id.into();
            self.add_node(id.clone(), step);
            self.add_edge(prev, id.clone());
            prev = id;
        }
        self.add_edge(prev, END)
    }

    /// Validate the topology and produce the executable sequence
    pub fn compile(mut self) -> Result<CompiledGraph, GraphError> {
        if let Some(err) = self.pending.take() {
            return Err(err);
        }
        self.schema.validate()?;

        let order = self.resolve_order()?;
        log::info!(
            "Compiled graph '{}' with {} steps: {:?}",
            self.name,
            order.len(),
            order
        );

        let mut steps_by_id: HashMap<String, Arc<dyn Step>> = self.nodes.into_iter().collect();
        let steps = order
            .into_iter()
            .filter_map(|id| steps_by_id.remove(&id).map(|step| (id, step)))
            .collect();

        Ok(CompiledGraph::new(self.name, self.schema, steps))
    }

    /// Walk the edges from START and return the node ids in execution order
    fn resolve_order(&self) -> Result<Vec<String>, GraphError> {
        for (from, to) in &self.edges {
            if from != START && !self.has_node(from) {
                return Err(GraphError::UnknownNode(from.clone()));
            }
            if to != END && !self.has_node(to) {
                return Err(GraphError::UnknownNode(to.clone()));
            }
        }

        // Repeated identical edges collapse into one
        let mut successors: HashMap<&str, &str> = HashMap::new();
        for (from, to) in &self.edges {
            match successors.get(from.as_str()) {
                Some(existing) if *existing != to.as_str() => {
                    return Err(GraphError::Branching { node: from.clone() });
                }
                Some(_) => {}
                None => {
                    successors.insert(from.as_str(), to.as_str());
                }
            }
        }

        if let Some(cycle) = self.find_cycle(&successors) {
            return Err(GraphError::CircularDependency(cycle));
        }

        let mut predecessors: HashMap<&str, &str> = HashMap::new();
        for (&from, &to) in &successors {
            if predecessors.insert(to, from).is_some() {
                return Err(GraphError::MultiplePredecessors {
                    node: to.to_string(),
                });
            }
        }

        let Some(&entry) = successors.get(START) else {
            if self.nodes.is_empty() {
                return Ok(Vec::new());
            }
            return Err(GraphError::MissingEntry);
        };

        let mut order = Vec::new();
        let mut current = entry;
        while current != END {
            order.push(current.to_string());
            current = successors
                .get(current)
                .copied()
                .ok_or(GraphError::MissingFinish)?;
        }

        let visited: HashSet<&str> = order.iter().map(String::as_str).collect();
        let mut unreachable: Vec<String> = self
            .nodes
            .iter()
            .map(|(id, _)| id)
            .filter(|id| !visited.contains(id.as_str()))
            .cloned()
            .collect();
        if !unreachable.is_empty() {
            unreachable.sort();
            return Err(GraphError::Unreachable(unreachable));
        }

        Ok(order)
    }

    /// Each node has at most one successor, so following the chain from every
    /// node finds any cycle.
    fn find_cycle(&self, successors: &HashMap<&str, &str>) -> Option<Vec<String>> {
        for (id, _) in &self.nodes {
            let mut path: Vec<&str> = vec![id.as_str()];
            let mut current = id.as_str();
            while let Some(&next) = successors.get(current) {
                if let Some(pos) = path.iter().position(|n| *n == next) {
                    return Some(path[pos..].iter().map(|n| n.to_string()).collect());
                }
                path.push(next);
                current = next;
            }
        }
        None
    }
}
