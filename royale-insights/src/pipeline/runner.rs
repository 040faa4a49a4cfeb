//! Sequential pipeline execution.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument};

use super::node::{Pipeline, StageContext};
use super::store::ArtifactStore;
use crate::config::InsightsConfig;
use crate::context::InsightsContext;
use crate::error::{InsightsError, Result};
use crate::log_stage;
use crate::logging::truncate_field;

/// Type alias for progress callback function.
pub type ProgressCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// Timing of one executed node.
#[derive(Debug, Clone, Serialize)]
pub struct NodeTiming {
    pub node: String,
    pub output: String,
    pub elapsed: Duration,
}

/// What a run executed, and how long it took.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub nodes: Vec<NodeTiming>,
}

impl RunSummary {
    /// Names of the executed nodes, in execution order.
    pub fn node_names(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.node.as_str()).collect()
    }

    /// Outputs produced by the run, in execution order.
    pub fn outputs(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.output.as_str()).collect()
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Runs pipelines against an [`ArtifactStore`].
///
/// Nodes execute one at a time in dependency order; each output is inserted
/// into the store before the next node starts. The first failing node
/// aborts the run.
///
/// # Example
///
/// ```rust,ignore
/// use royale_insights::prelude::*;
///
/// # async fn example(mut store: ArtifactStore) -> Result<()> {
/// let runner = PipelineRunner::new(InsightsConfig::default());
/// let pipeline = registry::pipeline("eda")?;
/// let summary = runner.run(&pipeline, &mut store).await?;
/// println!("ran {} nodes", summary.nodes.len());
/// # Ok(())
/// # }
/// ```
pub struct PipelineRunner {
    session: InsightsContext,
    config: InsightsConfig,
    on_progress: Option<ProgressCallback>,
}

impl PipelineRunner {
    pub fn new(config: InsightsConfig) -> Self {
        Self {
            session: InsightsContext::with_config(config.context.clone()),
            config,
            on_progress: None,
        }
    }

    /// Sets a progress callback that will be called after each node.
    ///
    /// The callback receives a float between 0.0 and 1.0 indicating progress.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    pub fn config(&self) -> &InsightsConfig {
        &self.config
    }

    pub fn session(&self) -> &InsightsContext {
        &self.session
    }

    /// Executes `pipeline`, reading inputs from and writing outputs to `store`.
    #[instrument(skip_all, fields(nodes = pipeline.len()))]
    pub async fn run(&self, pipeline: &Pipeline, store: &mut ArtifactStore) -> Result<RunSummary> {
        let order = pipeline.execution_order()?;

        if let Some(missing) = pipeline.free_inputs().into_iter().find(|i| !store.contains(i)) {
            return Err(InsightsError::MissingInput { name: missing });
        }

        info!("Starting pipeline with {} nodes", order.len());
        let started_at = Utc::now();
        let total = order.len().max(1) as f64;
        let mut timings = Vec::with_capacity(order.len());

        for (idx, node) in order.iter().enumerate() {
            log_stage!(
                self.config.log,
                node = node.name(),
                inputs = ?node.inputs(),
                output = node.output(),
                "Scheduling node"
            );

            let start = Instant::now();
            let stage = StageContext::new(node, store, &self.session, &self.config);
            let artifact = match node.call(stage).await {
                Ok(artifact) => artifact,
                Err(e) => {
                    error!(
                        node = node.name(),
                        error = %truncate_field(&e.to_string(), self.config.log.max_field_length),
                        "Node failed"
                    );
                    return Err(InsightsError::node_failed(node.name(), e));
                }
            };
            let elapsed = start.elapsed();

            debug!(
                node = node.name(),
                output = node.output(),
                kind = artifact.kind(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Node completed"
            );
            store.insert(node.output(), artifact);
            timings.push(NodeTiming {
                node: node.name().to_string(),
                output: node.output().to_string(),
                elapsed,
            });

            if let Some(ref callback) = self.on_progress {
                callback((idx + 1) as f64 / total);
            }
        }

        let summary = RunSummary {
            started_at,
            finished_at: Utc::now(),
            nodes: timings,
        };
        info!(
            "Pipeline completed in {:.2}s",
            summary.elapsed().num_milliseconds() as f64 / 1000.0
        );
        Ok(summary)
    }
}
