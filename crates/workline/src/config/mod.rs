//! Configuration for the pipeline engine and the line-pipeline application.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::ops::LineOp;
pub use workline_core::config::{MetricsConfig, interpolate, load_yaml_file, parse_yaml};

/// Engine settings applied by [`PipelineBuilder`](crate::PipelineBuilder).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Capacity of the queues created between consecutive steps.
    #[serde(default = "default_link_capacity")]
    pub link_capacity: usize,
    /// Whether `interrupt()` stops a running pipeline.
    #[serde(default = "default_true")]
    pub interruptible: bool,
    /// Whether `build()` requires an explicit output decision
    /// (`outputting_to` or `discard_output`).
    #[serde(default = "default_true")]
    pub require_output: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            link_capacity: default_link_capacity(),
            interruptible: true,
            require_output: true,
        }
    }
}

impl EngineConfig {
    /// Settings that accept a pipeline with no output decision, leaving its
    /// output absent.
    pub fn lenient() -> Self {
        Self {
            require_output: false,
            ..Self::default()
        }
    }
}

fn default_link_capacity() -> usize {
    1
}

fn default_true() -> bool {
    true
}

fn default_feed_capacity() -> usize {
    64
}

fn default_pipeline_name() -> String {
    "lines".to_string()
}

/// One stage of a line pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Transformation applied to each line.
    #[serde(flatten)]
    pub op: LineOp,
    /// Number of parallel workers.
    #[serde(default = "default_degree")]
    pub degree: usize,
}

fn default_degree() -> usize {
    1
}

/// A line pipeline reading stdin and writing stdout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinePipelineConfig {
    /// Name used in logs and metric labels.
    #[serde(default = "default_pipeline_name")]
    pub name: String,
    #[serde(default)]
    pub engine: EngineConfig,
    /// Capacity of the queue fed from stdin.
    #[serde(default = "default_feed_capacity")]
    pub input_capacity: usize,
    /// Capacity of the queue drained to stdout.
    #[serde(default = "default_feed_capacity")]
    pub output_capacity: usize,
    /// Run every stage but drop the final results instead of printing them.
    #[serde(default)]
    pub discard_output: bool,
    pub stages: Vec<StageConfig>,
}

/// Top-level application configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub pipeline: LinePipelineConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    /// Load and validate a YAML config file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let config: Self = load_yaml_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate YAML text.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = parse_yaml(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the constraints serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let pipeline = &self.pipeline;
        if pipeline.stages.is_empty() {
            return Err(ConfigError::EmptyStages {
                pipeline: pipeline.name.clone(),
            });
        }

        for (index, stage) in pipeline.stages.iter().enumerate() {
            if stage.degree == 0 {
                return Err(ConfigError::ZeroDegree {
                    pipeline: pipeline.name.clone(),
                    index,
                });
            }
            stage.op.validate(index)?;
        }

        Ok(())
    }
}
