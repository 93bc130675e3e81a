//! Analysis settings from a JSON file, overridable through the environment.

use crate::error::{CodemlpError, Result};
use rst_reader::ParserLimits;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CLASS_TABLE_WINDOW_ENV: &str = "CODEMLP_CLASS_TABLE_WINDOW";
pub const SEQUENCE_LABEL_WINDOW_ENV: &str = "CODEMLP_SEQUENCE_LABEL_WINDOW";
pub const LOG_LIKELIHOOD_WINDOW_ENV: &str = "CODEMLP_LNL_WINDOW";
pub const JOBS_ENV: &str = "CODEMLP_JOBS";

fn normalized_non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Value of `env_var`, with blank values treated as unset.
pub fn env_setting(env_var: &str) -> Option<String> {
    std::env::var(env_var)
        .ok()
        .and_then(|v| normalized_non_empty(&v))
}

fn parse_count(env_var: &str, value: &str) -> Result<usize> {
    value
        .parse::<usize>()
        .map_err(|e| CodemlpError::String(format!("Invalid value '{value}' for {env_var}: {e}")))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub limits: ParserLimits,
    /// Worker threads for parsing replicate reports; `None` lets rayon decide.
    pub jobs: Option<usize>,
}

impl AnalysisConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            CodemlpError::String(format!(
                "Could not read config file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_json_str(&text)
    }

    /// Reads `path` if given (defaults otherwise) and applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };
        config.with_overrides(env_setting)
    }

    /// Applies every setting that `lookup` knows about, keyed by environment variable name.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(v) = lookup(CLASS_TABLE_WINDOW_ENV) {
            self.limits.class_table_window = parse_count(CLASS_TABLE_WINDOW_ENV, &v)?;
        }
        if let Some(v) = lookup(SEQUENCE_LABEL_WINDOW_ENV) {
            self.limits.sequence_label_window = parse_count(SEQUENCE_LABEL_WINDOW_ENV, &v)?;
        }
        if let Some(v) = lookup(LOG_LIKELIHOOD_WINDOW_ENV) {
            self.limits.log_likelihood_window = parse_count(LOG_LIKELIHOOD_WINDOW_ENV, &v)?;
        }
        if let Some(v) = lookup(JOBS_ENV) {
            let jobs = parse_count(JOBS_ENV, &v)?;
            self.jobs = (jobs > 0).then_some(jobs);
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).and_then(|v| normalized_non_empty(v))
    }

    #[test]
    fn test_defaults_match_reader_limits() {
        let config = AnalysisConfig::default();
        assert_eq!(config.limits, ParserLimits::default());
        assert_eq!(config.limits.class_table_window, 8);
        assert_eq!(config.limits.sequence_label_window, 6);
        assert_eq!(config.limits.log_likelihood_window, 30);
        assert_eq!(config.jobs, None);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            AnalysisConfig::from_json_str(r#"{"limits": {"log_likelihood_window": 50}}"#).unwrap();
        assert_eq!(config.limits.log_likelihood_window, 50);
        assert_eq!(config.limits.class_table_window, 8);
    }

    #[test]
    fn test_overrides_win_over_file() {
        let td = tempdir().unwrap();
        let path = td.path().join("codemlp.json");
        fs::write(&path, r#"{"limits": {"class_table_window": 10}, "jobs": 2}"#).unwrap();
        let config = AnalysisConfig::from_json_file(&path)
            .unwrap()
            .with_overrides(lookup_from(&[
                (CLASS_TABLE_WINDOW_ENV, " 12 "),
                (JOBS_ENV, "0"),
                (SEQUENCE_LABEL_WINDOW_ENV, "   "),
            ]))
            .unwrap();
        assert_eq!(config.limits.class_table_window, 12);
        assert_eq!(config.limits.sequence_label_window, 6);
        assert_eq!(config.jobs, None);
    }

    #[test]
    fn test_bad_override_is_reported() {
        let err = AnalysisConfig::default()
            .with_overrides(lookup_from(&[(LOG_LIKELIHOOD_WINDOW_ENV, "many")]))
            .unwrap_err();
        assert!(err.to_string().contains(LOG_LIKELIHOOD_WINDOW_ENV));
    }

    #[test]
    fn test_missing_config_file() {
        let err = AnalysisConfig::from_json_file(Path::new("nonexistent_codemlp.json"));
        assert!(err.is_err());
    }
}
