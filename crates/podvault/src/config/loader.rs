use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let compiled =
        jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
            message: format!("Failed to compile JSON schema: {}", e),
        })?;

    let mut errors = compiled.iter_errors(json_value).peekable();
    if errors.peek().is_some() {
        let error_messages: Vec<String> = errors
            .map(|e| format!("{} at {}", e, e.instance_path()))
            .collect();
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

/// Semantic validation beyond what the JSON schema can express. Returns the
/// config with supplier threshold keys lowercased so the case-insensitive
/// lookup is a plain map hit at runtime.
fn validate_config(config: &Config) -> Result<Config, ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    config.routing.weights.validate()?;

    check_threshold("routing.default_threshold", config.routing.default_threshold)?;
    for (supplier, threshold) in &config.routing.supplier_thresholds {
        check_threshold(&format!("routing.supplier_thresholds.{}", supplier), *threshold)?;
    }

    let mut policy_ids = std::collections::HashSet::new();
    for policy in &config.retention.policies {
        if !policy_ids.insert(&policy.policy_id) {
            return Err(ConfigError::InvalidPolicy {
                id: policy.policy_id.clone(),
                reason: "Duplicate policy id".to_string(),
            });
        }
        if policy.retention_days < 0 {
            return Err(ConfigError::InvalidPolicy {
                id: policy.policy_id.clone(),
                reason: format!("retention_days must be >= 0, got {}", policy.retention_days),
            });
        }
        if policy.grace_days < 0 {
            return Err(ConfigError::InvalidPolicy {
                id: policy.policy_id.clone(),
                reason: format!("grace_days must be >= 0, got {}", policy.grace_days),
            });
        }
        if policy.applies_to.is_empty() {
            return Err(ConfigError::InvalidPolicy {
                id: policy.policy_id.clone(),
                reason: "applies_to must name at least one entity type".to_string(),
            });
        }
    }

    if config.cache.ttl_seconds == 0 {
        return Err(ConfigError::Validation {
            message: "cache.ttl_seconds must be > 0".to_string(),
        });
    }

    let mut config = config.clone();
    config.routing.supplier_thresholds = config
        .routing
        .supplier_thresholds
        .into_iter()
        .map(|(k, v)| (k.to_lowercase(), v))
        .collect();

    Ok(config)
}

fn check_threshold(name: &str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::ThresholdRange {
            name: name.to_string(),
            value,
        });
    }
    Ok(())
}
