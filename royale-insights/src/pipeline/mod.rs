//! Named-artifact pipeline orchestration.
//!
//! Stages are wired together by artifact name: each [`Node`] declares the
//! names it reads and the single name it writes, [`Pipeline`] derives a
//! dependency order from those names and [`PipelineRunner`] executes it
//! against an [`ArtifactStore`].

pub mod node;
pub mod registry;
pub mod runner;
pub mod store;

pub use node::{Node, NodeFn, Pipeline, StageContext};
pub use registry::{pipeline, DEFAULT_PIPELINE, PIPELINE_NAMES};
pub use runner::{NodeTiming, PipelineRunner, ProgressCallback, RunSummary};
pub use store::{Artifact, ArtifactStore, ArtifactValue};
