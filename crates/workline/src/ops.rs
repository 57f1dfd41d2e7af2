//! Built-in line operations for the command line pipeline.

use regex::Regex;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::error::{ConfigError, InvalidJsonSnafu, LineOpError};

/// A synchronous line transformation ready to be staged.
pub type LineAction = Box<dyn Fn(String) -> Result<Option<String>, LineOpError> + Send + Sync>;

/// Transformation applied by one stage of a line pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LineOp {
    /// Strip leading and trailing whitespace.
    Trim,
    Uppercase,
    Lowercase,
    /// Reverse the characters of the line.
    Reverse,
    /// Filter out empty lines.
    DropEmpty,
    /// Keep only lines matching a regular expression.
    Match { pattern: String },
    /// Re-serialize a JSON line without whitespace; invalid JSON fails the line.
    JsonCompact,
}

impl LineOp {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            LineOp::Trim => "trim",
            LineOp::Uppercase => "uppercase",
            LineOp::Lowercase => "lowercase",
            LineOp::Reverse => "reverse",
            LineOp::DropEmpty => "drop_empty",
            LineOp::Match { .. } => "match",
            LineOp::JsonCompact => "json_compact",
        }
    }

    /// Check the op's parameters; `index` is the stage position for error reports.
    pub fn validate(&self, index: usize) -> Result<(), ConfigError> {
        if let LineOp::Match { pattern } = self {
            compile(pattern, index)?;
        }
        Ok(())
    }

    /// Turn the op into an action for `PipelineBuilder::then_running`.
    pub fn into_action(self, index: usize) -> Result<LineAction, ConfigError> {
        let action: LineAction = match self {
            LineOp::Trim => Box::new(|line: String| Ok(Some(line.trim().to_string()))),
            LineOp::Uppercase => Box::new(|line: String| Ok(Some(line.to_uppercase()))),
            LineOp::Lowercase => Box::new(|line: String| Ok(Some(line.to_lowercase()))),
            LineOp::Reverse => Box::new(|line: String| Ok(Some(line.chars().rev().collect()))),
            LineOp::DropEmpty => {
                Box::new(|line: String| Ok((!line.is_empty()).then_some(line)))
            }
            LineOp::Match { pattern } => {
                let regex = compile(&pattern, index)?;
                Box::new(move |line: String| Ok(regex.is_match(&line).then_some(line)))
            }
            LineOp::JsonCompact => Box::new(|line: String| -> Result<Option<String>, LineOpError> {
                let value: serde_json::Value =
                    serde_json::from_str(&line).context(InvalidJsonSnafu)?;
                Ok(Some(value.to_string()))
            }),
        };
        Ok(action)
    }
}

fn compile(pattern: &str, index: usize) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern { index, source })
}
