//! Environment variable interpolation for config files.
//!
//! Supported forms:
//! - `$VAR` or `${VAR}` - substitute, error if unset
//! - `${VAR:-default}` - default when VAR is unset or empty
//! - `${VAR-default}` - default only when VAR is unset
//! - `$$` - literal `$`

use regex::{Captures, Regex};
use std::env;
use std::sync::LazyLock;

static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        (?P<escape>\$\$)
        |
        \$\{
            (?P<braced>[A-Za-z_][A-Za-z0-9_]*)
            (?: (?P<mode>:?-) (?P<default>[^}]*) )?
        \}
        |
        \$(?P<bare>[A-Za-z_][A-Za-z0-9_]*)
        ",
    )
    .expect("Invalid regex pattern")
});

/// How a missing or empty variable falls back to its default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fallback<'a> {
    /// No default: an unset variable is an error.
    None,
    /// `${VAR-default}`: default only when unset.
    IfUnset(&'a str),
    /// `${VAR:-default}`: default when unset or empty.
    IfUnsetOrEmpty(&'a str),
}

impl<'a> Fallback<'a> {
    fn from_captures(caps: &Captures<'a>) -> Self {
        let default = caps.name("default").map_or("", |m| m.as_str());
        match caps.name("mode").map(|m| m.as_str()) {
            Some(":-") => Fallback::IfUnsetOrEmpty(default),
            Some(_) => Fallback::IfUnset(default),
            None => Fallback::None,
        }
    }
}

/// Result of environment variable interpolation.
#[derive(Debug)]
pub struct InterpolationResult {
    /// The interpolated text. Unresolvable references are left as written.
    pub text: String,
    /// Every problem found, so all missing variables can be reported at once.
    pub errors: Vec<String>,
}

impl InterpolationResult {
    /// Returns true if there were no errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Interpolate environment variables in `input`.
pub fn interpolate(input: &str) -> InterpolationResult {
    let mut errors = Vec::new();

    let text = ENV_VAR_PATTERN
        .replace_all(input, |caps: &Captures<'_>| {
            if caps.name("escape").is_some() {
                return "$".to_string();
            }

            let name = caps
                .name("braced")
                .or_else(|| caps.name("bare"))
                .map_or("", |m| m.as_str());
            let written = &caps[0];

            match resolve(name, Fallback::from_captures(caps)) {
                Ok(value) => value,
                Err(message) => {
                    errors.push(message);
                    written.to_string()
                }
            }
        })
        .into_owned();

    InterpolationResult { text, errors }
}

fn resolve(name: &str, fallback: Fallback<'_>) -> Result<String, String> {
    match (env::var(name), fallback) {
        (Ok(value), _) if value.contains(['\n', '\r']) => Err(format!(
            "environment variable '{name}' contains newlines, which is not allowed"
        )),
        (Ok(value), Fallback::IfUnsetOrEmpty(default)) if value.is_empty() => {
            Ok(default.to_string())
        }
        (Ok(value), _) => Ok(value),
        (Err(_), Fallback::IfUnset(default) | Fallback::IfUnsetOrEmpty(default)) => {
            Ok(default.to_string())
        }
        (Err(_), Fallback::None) => Err(format!("environment variable '{name}' is not set")),
    }
}
