//! Command line arguments and config path handling.

use std::path::{Path, PathBuf};

use clap::Parser;

/// Check if a path has a YAML extension.
pub fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == "yaml" || ext == "yml")
}

#[derive(Parser, Debug)]
#[command(version, about = "Run a staged line pipeline over stdin/stdout")]
pub struct CliArgs {
    /// Path to the pipeline configuration file
    #[arg(short, long)]
    pub config: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yaml_file() {
        assert!(is_yaml_file(Path::new("pipeline.yaml")));
        assert!(is_yaml_file(Path::new("conf/pipeline.yml")));
        assert!(!is_yaml_file(Path::new("pipeline.toml")));
        assert!(!is_yaml_file(Path::new("pipeline")));
    }

    #[test]
    fn test_cli_args_parse() {
        let args = CliArgs::parse_from(["workline", "-c", "pipeline.yaml"]);
        assert_eq!(args.config, PathBuf::from("pipeline.yaml"));

        let args = CliArgs::parse_from(["workline", "--config", "other.yml"]);
        assert_eq!(args.config, PathBuf::from("other.yml"));
    }

    #[test]
    fn test_cli_args_require_config() {
        assert!(CliArgs::try_parse_from(["workline"]).is_err());
    }
}
