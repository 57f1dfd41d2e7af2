//! Error types for workline.

use snafu::prelude::*;

pub use workline_core::error::{ConfigError, MetricsError};

/// Errors reported by [`PipelineBuilder::build`](crate::PipelineBuilder::build).
///
/// Checked in declaration order; the first failing check is reported.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum BuildError {
    /// `build` was called before `create_new`.
    #[snafu(display("Builder not initialized: call create_new() before build()"))]
    NotInitialized,

    /// No input feed was given.
    #[snafu(display("Pipeline has no input: call consuming_from() before build()"))]
    MissingInput,

    /// No step was staged.
    #[snafu(display("Cannot build a pipeline without steps"))]
    NoSteps,

    /// A step was staged with zero workers.
    #[snafu(display("Step {step} has degree {degree}; every step needs at least one worker"))]
    InvalidDegree { step: usize, degree: usize },

    /// Strict output policy: neither `outputting_to` nor `discard_output` was called.
    #[snafu(display(
        "Pipeline output not decided: call outputting_to() or discard_output() before build()"
    ))]
    MissingOutput,
}

/// A step action panicked while processing a value.
///
/// Reported through the same path as an action error: logged, value dropped.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub), display("Action panicked: {message}"))]
pub struct ActionPanic {
    pub message: String,
}

/// Per-line failures of the built-in line operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum LineOpError {
    /// The line is not valid JSON.
    #[snafu(display("Invalid JSON: {source}"))]
    InvalidJson { source: serde_json::Error },
}

/// Errors from the line-pipeline application.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum AppError {
    /// Configuration error.
    #[snafu(display("Configuration error: {source}"))]
    Config { source: ConfigError },

    /// Pipeline construction error.
    #[snafu(display("Failed to build pipeline: {source}"))]
    Build { source: BuildError },

    /// Metrics error.
    #[snafu(display("Metrics error: {source}"))]
    Metrics { source: MetricsError },

    /// Reading input or writing output failed.
    #[snafu(display("I/O error: {source}"))]
    Io { source: std::io::Error },

    /// A background task failed to join.
    #[snafu(display("Task join error: {source}"))]
    TaskJoin { source: tokio::task::JoinError },
}

impl From<ConfigError> for AppError {
    fn from(source: ConfigError) -> Self {
        AppError::Config { source }
    }
}

impl From<BuildError> for AppError {
    fn from(source: BuildError) -> Self {
        AppError::Build { source }
    }
}

impl From<MetricsError> for AppError {
    fn from(source: MetricsError) -> Self {
        AppError::Metrics { source }
    }
}
