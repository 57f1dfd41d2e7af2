//! Workline: staged concurrent processing pipelines.
//!
//! A pipeline is an ordered sequence of steps joined by bounded queues. Each
//! step runs its action on a pool of parallel workers. This crate provides:
//! - [`PipelineBuilder`] to assemble and validate a pipeline
//! - [`Pipeline::run`] and [`Pipeline::interrupt`] to execute it
//! - [`Queue`], the bounded feed type used for inputs, outputs and links
//! - a line-oriented application (`app`) driven by a YAML config

pub mod app;
pub mod builder;
pub mod config;
pub mod error;
pub mod ops;
pub mod pipeline;
pub mod queue;

// Re-export commonly used items
pub use builder::PipelineBuilder;
pub use config::{Config, EngineConfig};
pub use error::{AppError, BuildError};
pub use pipeline::{ActionError, ActionFuture, ActionResult, Completion, Pipeline, Step};
pub use queue::Queue;

// Re-export from workline-core
pub use workline_core::{CliArgs, MetricsConfig, init_metrics, init_tracing, shutdown_signal};
