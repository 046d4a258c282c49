//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::RootConfiguration;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Configuration file syntax, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    /// `.toml` files are TOML; everything else is read as YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Yaml,
        }
    }
}

/// Parse configuration text without validating it.
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<RootConfiguration, ConfigError> {
    let config = match format {
        // An empty YAML document means "all defaults".
        ConfigFormat::Yaml if content.trim().is_empty() => RootConfiguration::default(),
        ConfigFormat::Yaml => serde_yaml::from_str(content)?,
        ConfigFormat::Toml => toml::from_str(content)?,
    };
    Ok(config)
}

/// Load and validate configuration from a YAML (or TOML) file.
pub fn load_config(path: &Path) -> Result<RootConfiguration, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config = parse_config(&content, ConfigFormat::from_path(path))?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_yaml_with_original_key_names() {
        let yaml = r#"
allowedConsumerDelayMs: 45000
healthReportingIntervalMs: 10000
connectors:
  submissions:
    bootstrapServers: ["kafka-1:9092", "kafka-2:9092"]
    topic: fhir-submission
    groupId: fhir-submission-consumer
    consumers: 3
"#;
        let config = parse_config(yaml, ConfigFormat::Yaml).unwrap();

        assert_eq!(config.allowed_consumer_delay_ms, 45_000);
        assert_eq!(config.health_reporting_interval_ms, 10_000);
        let connector = &config.connectors["submissions"];
        assert_eq!(connector.bootstrap_servers.len(), 2);
        assert_eq!(connector.consumers, 3);
        assert_eq!(connector.poll_timeout_ms, 1_000);
        assert_eq!(config.metrics.log_interval_secs, 60);
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
allowed_consumer_delay_ms = 1000

[metrics]
log_interval_secs = 5

[connectors.main]
bootstrap_servers = ["localhost:9092"]
topic = "t"
group_id = "g"
"#;
        let config = parse_config(toml, ConfigFormat::Toml).unwrap();
        assert_eq!(config.allowed_consumer_delay_ms, 1000);
        assert_eq!(config.metrics.log_interval_secs, 5);
        assert_eq!(config.connectors["main"].consumers, 1);
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = parse_config("", ConfigFormat::Yaml).unwrap();
        assert_eq!(config.health_reporting_interval_ms, 60_000);
        assert!(config.connectors.is_empty());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.yaml")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.yml")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.TOML")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("conf")), ConfigFormat::Yaml);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config(Path::new("/nonexistent/consumer.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "healthReportingIntervalMs: 0").unwrap();

        let err = load_config(file.path()).unwrap_err();
        match err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_rejects_malformed_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "connectors: [unterminated").unwrap();

        assert!(matches!(load_config(file.path()).unwrap_err(), ConfigError::Yaml(_)));
    }
}
