use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::features::schema::default_feature_columns;

pub const DATASET_ENV: &str = "AIRQ_DATASET";
pub const MODEL_ENV: &str = "AIRQ_MODEL";
pub const PLOT_ENV: &str = "AIRQ_PLOT";
pub const FALLBACK_COLUMNS_ENV: &str = "AIRQ_FALLBACK_COLUMNS";

/// Session configuration: where the two input artifacts live and which
/// feature layout to assume for models that do not record one.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default = "default_dataset_path")]
    pub dataset_path: PathBuf,
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,
    #[serde(default = "default_plot_path")]
    pub plot_path: PathBuf,
    #[serde(default = "default_feature_columns")]
    pub fallback_columns: Vec<String>,
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("city_day.csv")
}

fn default_model_path() -> PathBuf {
    PathBuf::from("pm25_model.bin")
}

fn default_plot_path() -> PathBuf {
    PathBuf::from("pm25_trend.png")
}

impl Default for Config {
    fn default() -> Self {
        Config {
            dataset_path: default_dataset_path(),
            model_path: default_model_path(),
            plot_path: default_plot_path(),
            fallback_columns: default_feature_columns(),
        }
    }
}

impl Config {
    /// Read a JSON config file; absent keys take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|err| Error::Config(format!("{}: {err}", path.display())))
    }

    /// Config file (when given) overridden by the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_json_file(path)?,
            None => Config::default(),
        };
        Ok(config.with_env())
    }

    /// Apply `AIRQ_*` environment overrides.
    pub fn with_env(self) -> Self {
        self.with_lookup(|key| std::env::var(key).ok())
    }

    /// Override fields with whatever `lookup` returns for each variable.
    pub fn with_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = lookup(DATASET_ENV) {
            self.dataset_path = path.into();
        }
        if let Some(path) = lookup(MODEL_ENV) {
            self.model_path = path.into();
        }
        if let Some(path) = lookup(PLOT_ENV) {
            self.plot_path = path.into();
        }
        if let Some(columns) = lookup(FALLBACK_COLUMNS_ENV) {
            let columns = parse_column_list(&columns);
            if !columns.is_empty() {
                self.fallback_columns = columns;
            }
        }
        self
    }
}

/// Split a comma-separated column list, dropping blanks.
pub fn parse_column_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_without_environment() {
        let config = Config::default().with_lookup(|_| None);
        assert_eq!(config, Config::default());
        assert_eq!(config.fallback_columns[0], "City");
        assert_eq!(config.fallback_columns.len(), 12);
    }

    #[test]
    fn environment_overrides_defaults() {
        let env: HashMap<&str, &str> = [
            (MODEL_ENV, "/models/rf.bin"),
            (FALLBACK_COLUMNS_ENV, "City, Day ,Month,,PM10"),
        ]
        .into();
        let config = Config::default().with_lookup(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.model_path, PathBuf::from("/models/rf.bin"));
        assert_eq!(config.dataset_path, PathBuf::from("city_day.csv"));
        assert_eq!(config.fallback_columns, ["City", "Day", "Month", "PM10"]);
    }

    #[test]
    fn blank_column_list_keeps_default() {
        let config = Config::default()
            .with_lookup(|key| (key == FALLBACK_COLUMNS_ENV).then(|| " , ".into()));
        assert_eq!(config.fallback_columns, default_feature_columns());
    }

    #[test]
    fn json_file_fills_missing_keys_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("airq.json");
        std::fs::write(&path, r#"{"dataset_path": "data/city_day.csv"}"#).unwrap();

        let config = Config::from_json_file(&path).unwrap();
        assert_eq!(config.dataset_path, PathBuf::from("data/city_day.csv"));
        assert_eq!(config.model_path, PathBuf::from("pm25_model.bin"));
        assert_eq!(config.fallback_columns, default_feature_columns());
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("airq.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Config::from_json_file(&path), Err(Error::Config(_))));
    }
}
