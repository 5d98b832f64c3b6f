use std::fs;

use config::{Config, ConfigError, Environment, File};
use pulse_core::{NameTables, PipelineConfig};
use serde::Deserialize;

use crate::error::AppResult;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// JSON file with override / stop-word / junk tables.
    /// Kept out of the layered config so table keys stay case-sensitive.
    #[serde(default)]
    pub names_file: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    /// Sentiment-scored news CSV
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    pub dir: String,
    pub write_json: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("input.path", "data/processed/ipo_sentiment_scored.csv")?
            .set_default("output.dir", "data/processed")?
            .set_default("output.write_json", true)?
            // Load from config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (PULSE__INPUT__PATH, etc.)
            // Using double underscore as separator to handle nested keys with underscores
            .add_source(
                Environment::with_prefix("PULSE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Replace the built-in name tables with `names_file`, when set.
    pub fn load_name_tables(&mut self) -> AppResult<()> {
        if let Some(path) = &self.names_file {
            let contents = fs::read_to_string(path)?;
            let tables: NameTables = serde_json::from_str(&contents)?;
            tracing::info!(
                path = %path,
                overrides = tables.overrides.len(),
                stop_words = tables.stop_words.len(),
                "Loaded name tables"
            );
            self.pipeline.names = tables;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn app_config(names_file: Option<String>) -> AppConfig {
        AppConfig {
            input: InputConfig {
                path: "in.csv".to_string(),
            },
            output: OutputConfig {
                dir: "out".to_string(),
                write_json: false,
            },
            pipeline: PipelineConfig::default(),
            names_file,
        }
    }

    #[test]
    fn test_name_tables_file_replaces_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"overrides": {{"Acme Corp Ltd": "Acme Corp"}}, "junk": {{"entity": ["acme"]}}}}"#
        )
        .unwrap();

        let mut config = app_config(Some(file.path().to_string_lossy().into_owned()));
        config.load_name_tables().unwrap();

        let names = &config.pipeline.names;
        assert_eq!(names.overrides.len(), 1);
        assert_eq!(names.overrides["Acme Corp Ltd"], "Acme Corp");
        assert!(names.junk.is_entity_junk("Acme"));
        // Unspecified tables keep their defaults
        assert!(names.stop_words.contains("sebi"));
    }

    #[test]
    fn test_no_names_file_keeps_defaults() {
        let mut config = app_config(None);
        config.load_name_tables().unwrap();
        assert!(config.pipeline.names.overrides.contains_key("Clean Max"));
    }
}
