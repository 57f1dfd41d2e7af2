//! Single-file YAML configuration loading.

use std::path::Path;

use serde::de::DeserializeOwned;
use snafu::ResultExt;

use crate::config::{interpolate, is_yaml_file};
use crate::error::{ConfigError, ReadFileSnafu, YamlParseSnafu};

/// Load a YAML config file, interpolating environment variables before parsing.
pub fn load_yaml_file<C: DeserializeOwned>(path: &Path) -> Result<C, ConfigError> {
    if !is_yaml_file(path) {
        return Err(ConfigError::UnsupportedFormat {
            path: path.to_path_buf(),
        });
    }

    let contents = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;
    parse_yaml(&contents)
}

/// Parse YAML text after environment interpolation.
pub fn parse_yaml<C: DeserializeOwned>(contents: &str) -> Result<C, ConfigError> {
    let result = interpolate(contents);
    if !result.is_ok() {
        return Err(ConfigError::EnvInterpolation {
            message: result.errors.join("\n"),
        });
    }

    serde_yaml::from_str(&result.text).context(YamlParseSnafu)
}
