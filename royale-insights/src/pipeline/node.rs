//! Nodes and pipelines.
//!
//! A [`Node`] reads named artifacts and produces exactly one. A
//! [`Pipeline`] is an ordered set of nodes; execution order is derived
//! from the producer/consumer relation between output and input names.

use arrow::record_batch::RecordBatch;
use futures::future::BoxFuture;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::Add;
use std::sync::Arc;

use super::store::{Artifact, ArtifactStore, ArtifactValue};
use crate::config::InsightsConfig;
use crate::context::InsightsContext;
use crate::error::{InsightsError, Result};

/// Type alias for a node's stage function.
pub type NodeFn =
    Arc<dyn for<'a> Fn(StageContext<'a>) -> BoxFuture<'a, Result<Artifact>> + Send + Sync>;

/// What a stage function sees while it runs.
#[derive(Clone, Copy)]
pub struct StageContext<'a> {
    node: &'a Node,
    store: &'a ArtifactStore,
    session: &'a InsightsContext,
    config: &'a InsightsConfig,
}

impl<'a> StageContext<'a> {
    pub(crate) fn new(
        node: &'a Node,
        store: &'a ArtifactStore,
        session: &'a InsightsContext,
        config: &'a InsightsConfig,
    ) -> Self {
        Self {
            node,
            store,
            session,
            config,
        }
    }

    /// The node's `index`-th declared input.
    pub fn input<T: ArtifactValue>(&self, index: usize) -> Result<&'a T> {
        self.store.get(self.input_name(index)?)
    }

    /// Name of the `index`-th declared input.
    pub fn input_name(&self, index: usize) -> Result<&'a str> {
        self.node
            .inputs
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| {
                InsightsError::Internal(format!(
                    "node '{}' has no input #{index}",
                    self.node.name
                ))
            })
    }

    /// The first `count` inputs, all tables.
    pub fn tables(&self, count: usize) -> Result<Vec<RecordBatch>> {
        (0..count)
            .map(|i| self.input::<RecordBatch>(i).cloned())
            .collect()
    }

    pub fn node_name(&self) -> &'a str {
        &self.node.name
    }

    pub fn session(&self) -> &'a InsightsContext {
        self.session
    }

    pub fn config(&self) -> &'a InsightsConfig {
        self.config
    }
}

/// A named stage with declared inputs and a single output.
#[derive(Clone)]
pub struct Node {
    name: String,
    inputs: Vec<String>,
    output: String,
    tags: Vec<String>,
    func: NodeFn,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("output", &self.output)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

impl Node {
    pub fn new<F>(name: impl Into<String>, func: F, inputs: &[&str], output: impl Into<String>) -> Self
    where
        F: for<'a> Fn(StageContext<'a>) -> BoxFuture<'a, Result<Artifact>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            output: output.into(),
            tags: Vec::new(),
            func: Arc::new(func),
        }
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub(crate) fn call<'a>(&self, stage: StageContext<'a>) -> BoxFuture<'a, Result<Artifact>> {
        (self.func)(stage)
    }
}

/// An ordered collection of nodes.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    nodes: Vec<Node>,
}

impl Pipeline {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes carrying at least one of `tags`, in declaration order.
    pub fn only_tags(&self, tags: &[&str]) -> Pipeline {
        let nodes = self
            .nodes
            .iter()
            .filter(|n| n.tags.iter().any(|t| tags.contains(&t.as_str())))
            .cloned()
            .collect();
        Pipeline { nodes }
    }

    /// Inputs not produced by any node, in first-use order.
    pub fn free_inputs(&self) -> Vec<String> {
        let outputs: HashSet<&str> = self.nodes.iter().map(|n| n.output.as_str()).collect();
        let mut seen = HashSet::new();
        self.nodes
            .iter()
            .flat_map(|n| n.inputs.iter())
            .filter(|input| !outputs.contains(input.as_str()))
            .filter(|input| seen.insert(input.as_str()))
            .cloned()
            .collect()
    }

    /// Dependency order of the nodes.
    ///
    /// Depth-first over producers; independent nodes keep declaration
    /// order. Fails on duplicate outputs and on cycles.
    pub fn execution_order(&self) -> Result<Vec<&Node>> {
        let mut producers: HashMap<&str, usize> = HashMap::new();
        for (i, node) in self.nodes.iter().enumerate() {
            if let Some(&first) = producers.get(node.output.as_str()) {
                return Err(InsightsError::DuplicateOutput {
                    output: node.output.clone(),
                    first: self.nodes[first].name.clone(),
                    second: node.name.clone(),
                });
            }
            producers.insert(node.output.as_str(), i);
        }

        let mut visited = vec![false; self.nodes.len()];
        let mut on_stack = vec![false; self.nodes.len()];
        let mut order = Vec::with_capacity(self.nodes.len());
        for i in 0..self.nodes.len() {
            self.visit(i, &producers, &mut visited, &mut on_stack, &mut order)?;
        }
        Ok(order.into_iter().map(|i| &self.nodes[i]).collect())
    }

    fn visit(
        &self,
        current: usize,
        producers: &HashMap<&str, usize>,
        visited: &mut [bool],
        on_stack: &mut [bool],
        order: &mut Vec<usize>,
    ) -> Result<()> {
        if visited[current] {
            return Ok(());
        }
        if on_stack[current] {
            return Err(InsightsError::CircularDependency(format!(
                "cycle through node '{}'",
                self.nodes[current].name
            )));
        }
        on_stack[current] = true;
        for input in &self.nodes[current].inputs {
            if let Some(&producer) = producers.get(input.as_str()) {
                self.visit(producer, producers, visited, on_stack, order)?;
            }
        }
        on_stack[current] = false;
        visited[current] = true;
        order.push(current);
        Ok(())
    }
}

impl Add for Pipeline {
    type Output = Pipeline;

    fn add(mut self, other: Pipeline) -> Pipeline {
        self.nodes.extend(other.nodes);
        self
    }
}

impl FromIterator<Node> for Pipeline {
    fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
        Pipeline::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    fn noop<'a>(_stage: StageContext<'a>) -> BoxFuture<'a, Result<Artifact>> {
        async move { Err(InsightsError::Internal("not executed".into())) }.boxed()
    }

    fn node(name: &str, inputs: &[&str], output: &str) -> Node {
        Node::new(name, noop, inputs, output)
    }

    fn names(nodes: Vec<&Node>) -> Vec<&str> {
        nodes.into_iter().map(Node::name).collect()
    }

    #[test]
    fn test_execution_order_puts_producers_first() {
        let pipeline = Pipeline::new(vec![
            node("summary", &["report"], "summary_out"),
            node("report", &["clean"], "report"),
            node("clean", &["raw"], "clean"),
            node("other", &["raw"], "other_out"),
        ]);
        let order = pipeline.execution_order().unwrap();
        assert_eq!(names(order), vec!["clean", "report", "summary", "other"]);
    }

    #[test]
    fn test_duplicate_output_rejected() {
        let pipeline = Pipeline::new(vec![node("a", &[], "x"), node("b", &[], "x")]);
        let err = pipeline.execution_order().unwrap_err();
        assert!(matches!(err, InsightsError::DuplicateOutput { ref first, ref second, .. }
            if first == "a" && second == "b"));
    }

    #[test]
    fn test_cycle_rejected() {
        let pipeline = Pipeline::new(vec![node("a", &["y"], "x"), node("b", &["x"], "y")]);
        assert!(matches!(
            pipeline.execution_order().unwrap_err(),
            InsightsError::CircularDependency(_)
        ));
    }

    #[test]
    fn test_free_inputs_and_tags() {
        let pipeline = Pipeline::new(vec![
            node("clean", &["raw", "raw"], "clean").with_tags(&["prep"]),
            node("report", &["clean", "catalog"], "report").with_tags(&["eda"]),
        ]);
        assert_eq!(pipeline.free_inputs(), vec!["raw", "catalog"]);

        let eda = pipeline.only_tags(&["eda"]);
        assert_eq!(eda.len(), 1);
        assert_eq!(eda.free_inputs(), vec!["clean", "catalog"]);

        let combined = pipeline.clone() + eda;
        assert_eq!(combined.len(), 3);
    }
}
