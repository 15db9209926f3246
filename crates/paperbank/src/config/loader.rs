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

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let errors: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !errors.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: errors.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.classifier.recognized_prefixes.is_empty() {
        return Err(ConfigError::Validation {
            message: "recognized_prefixes must not be empty".to_string(),
        });
    }

    // Branch tags must be unique, and every pattern must compile.
    let mut tags = std::collections::HashSet::new();
    for branch in &config.classifier.branches {
        if !tags.insert(&branch.tag) {
            return Err(ConfigError::Validation {
                message: format!("Duplicate branch tag: {}", branch.tag),
            });
        }

        for variant in &branch.patterns {
            if let Err(e) = regex::Regex::new(&variant.pattern) {
                return Err(ConfigError::InvalidPattern {
                    branch: branch.tag.clone(),
                    pattern: variant.pattern.clone(),
                    reason: e.to_string(),
                });
            }
            if let Some(unless) = &variant.unless_followed_by {
                if let Err(e) = regex::Regex::new(unless) {
                    return Err(ConfigError::InvalidPattern {
                        branch: branch.tag.clone(),
                        pattern: unless.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    if !tags.contains(&config.classifier.fallback_branch) {
        return Err(ConfigError::Validation {
            message: format!(
                "fallback_branch '{}' is not a configured branch tag",
                config.classifier.fallback_branch
            ),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_config_json() -> String {
        r#"{
            "version": "1.0",
            "classifier": {
                "recognized_prefixes": ["BSC", "PCC"],
                "fallback_branch": "CSE",
                "branches": [
                    {
                        "tag": "CSE",
                        "patterns": [{ "pattern": "Computer\\s+Science" }],
                        "code_fragments": ["CS"]
                    }
                ]
            }
        }"#
        .to_string()
    }

    #[test]
    fn test_load_minimal_config() {
        let config = load_config_from_str(&minimal_config_json()).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.classifier.recognized_prefixes, vec!["BSC", "PCC"]);
        assert_eq!(config.ingest.slice_size, 15);
    }

    #[test]
    fn test_builtin_config_round_trips_through_schema() {
        let json = serde_json::to_string(&Config::builtin()).unwrap();
        let config = load_config_from_str(&json).unwrap();
        assert_eq!(config.classifier.branches.len(), 6);
    }

    #[test]
    fn test_unknown_top_level_key_rejected() {
        let bad = minimal_config_json().replacen("\"version\"", "\"worker_count\": 4, \"version\"", 1);
        let err = load_config_from_str(&bad).unwrap_err();
        assert!(matches!(err, ConfigError::SchemaValidation { .. }));
    }

    #[test]
    fn test_wrong_version_rejected() {
        let bad = minimal_config_json().replace("\"1.0\"", "\"2.0\"");
        let err = load_config_from_str(&bad).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn test_invalid_branch_pattern_rejected() {
        let bad = minimal_config_json().replace("Computer\\\\s+Science", "[unclosed");
        let err = load_config_from_str(&bad).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn test_unknown_fallback_branch_rejected() {
        let bad = minimal_config_json().replace("\"fallback_branch\": \"CSE\"", "\"fallback_branch\": \"EEE\"");
        let err = load_config_from_str(&bad).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn test_empty_prefixes_rejected_by_schema() {
        let bad = minimal_config_json().replace("[\"BSC\", \"PCC\"]", "[]");
        let err = load_config_from_str(&bad).unwrap_err();
        assert!(matches!(err, ConfigError::SchemaValidation { .. }));
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config("/nonexistent/paperbank.json").unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }
}
