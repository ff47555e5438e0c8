//! Environment file loader
//!
//! Deployments drop `PUPCYCLER_*` settings into an env file instead of the
//! unit file. Call [`load_environment`] before parsing the command line so
//! clap's env fallbacks see them, then [`EnvLoad::log`] the result once a
//! subscriber is installed. Variables already present in the process
//! environment always win.

use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Variable naming an explicit env file to load
pub const ENV_FILE_VAR: &str = "PUPCYCLER_ENV_FILE";

/// Env file locations checked in order when `PUPCYCLER_ENV_FILE` is unset or missing
pub const ENV_FILE_PATHS: &[&str] = &["/etc/pupcycler/environment", ".env"];

/// What [`load_environment`] did, kept so it can be logged once tracing is up
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EnvLoad {
    /// File that was applied, if any
    pub path: Option<String>,
    /// Variables set from the file
    pub loaded: Vec<(String, String)>,
    /// Variables left alone because the process already had them
    pub skipped: usize,
    /// Files that existed but could not be read
    pub failures: Vec<(String, String)>,
}

impl EnvLoad {
    /// Emit the outcome, masking secret values
    pub fn log(&self) {
        for (path, err) in &self.failures {
            warn!("Failed to read environment file {}: {}", path, err);
        }
        let Some(path) = &self.path else {
            debug!("No environment file found, using existing environment");
            return;
        };
        for (key, value) in &self.loaded {
            debug!("Loaded: {}={}", key, if is_secret(key) { "***" } else { value.as_str() });
        }
        info!(
            "Loaded {} environment variables from {} ({} already set)",
            self.loaded.len(),
            path,
            self.skipped
        );
    }
}

/// Apply the first readable env file found
pub fn load_environment() -> EnvLoad {
    let custom = std::env::var(ENV_FILE_VAR).ok();
    let mut failures = Vec::new();

    let candidates = custom
        .iter()
        .map(String::as_str)
        .chain(ENV_FILE_PATHS.iter().copied());

    for path in candidates {
        let path_obj = Path::new(path);
        if !path_obj.exists() {
            continue;
        }
        match fs::read_to_string(path_obj) {
            Ok(content) => {
                let mut report = apply_env(path, &content);
                report.failures = failures;
                return report;
            }
            Err(e) => failures.push((path.to_string(), e.to_string())),
        }
    }

    EnvLoad {
        failures,
        ..EnvLoad::default()
    }
}

fn apply_env(path: &str, content: &str) -> EnvLoad {
    let mut report = EnvLoad {
        path: Some(path.to_string()),
        ..EnvLoad::default()
    };

    for (key, value) in parse_env(content) {
        if std::env::var_os(&key).is_some() {
            report.skipped += 1;
            continue;
        }
        std::env::set_var(&key, &value);
        report.loaded.push((key, value));
    }
    report
}

fn is_secret(key: &str) -> bool {
    ["TOKEN", "SECRET", "PASSWORD", "URL"]
        .iter()
        .any(|marker| key.contains(marker))
}

/// Parse env file content into key/value pairs, skipping blanks and comments
pub fn parse_env(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(parse_env_line)
        .collect()
}

/// Parse `KEY=VALUE`, `KEY="VALUE"`, `KEY='VALUE'` or `export KEY=VALUE`
fn parse_env_line(line: &str) -> Option<(String, String)> {
    let line = line.strip_prefix("export ").unwrap_or(line);
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }

    let value = value.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);

    Some((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_line_forms() {
        assert_eq!(
            parse_env_line("PUPCYCLER_PORT=9983"),
            Some(("PUPCYCLER_PORT".into(), "9983".into()))
        );
        assert_eq!(
            parse_env_line("PUPCYCLER_AUTH_TOKENS=\"a,b\""),
            Some(("PUPCYCLER_AUTH_TOKENS".into(), "a,b".into()))
        );
        assert_eq!(
            parse_env_line("export PUPCYCLER_DEBUG='true'"),
            Some(("PUPCYCLER_DEBUG".into(), "true".into()))
        );
        assert!(parse_env_line("=value").is_none());
        assert!(parse_env_line("novalue").is_none());
    }

    #[test]
    fn test_parse_env_skips_comments() {
        let parsed = parse_env("# comment\n\nA=1\n  # indented\nB = two\n");
        assert_eq!(
            parsed,
            vec![("A".into(), "1".into()), ("B".into(), "two".into())]
        );
    }

    #[test]
    fn test_apply_env_keeps_existing_values() {
        std::env::set_var("PUPCYCLER_CONFIG_TEST_PRESET", "kept");
        let report = apply_env(
            "test.env",
            "PUPCYCLER_CONFIG_TEST_PRESET=replaced\nPUPCYCLER_CONFIG_TEST_NEW=fresh\n",
        );

        assert_eq!(report.path.as_deref(), Some("test.env"));
        assert_eq!(report.skipped, 1);
        assert_eq!(
            report.loaded,
            vec![("PUPCYCLER_CONFIG_TEST_NEW".into(), "fresh".into())]
        );
        assert_eq!(std::env::var("PUPCYCLER_CONFIG_TEST_PRESET").unwrap(), "kept");
        assert_eq!(std::env::var("PUPCYCLER_CONFIG_TEST_NEW").unwrap(), "fresh");
    }

    #[test]
    fn test_secret_keys_masked() {
        assert!(is_secret("PUPCYCLER_AUTH_TOKENS"));
        assert!(is_secret("PUPCYCLER_STORE_URL"));
        assert!(!is_secret("PUPCYCLER_PORT"));
    }
}
