use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            routing: RoutingConfig::default(),
            retention: RetentionConfig::default(),
            archive: ArchiveConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// When false the decision table is bypassed and everything routes to
    /// manual review.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub weights: ConfidenceWeights,
    /// Fallback threshold when no supplier rule applies.
    #[serde(default = "default_threshold")]
    pub default_threshold: f64,
    /// Per-supplier overrides; keys are matched case-insensitively and `*`
    /// is the wildcard rule.
    #[serde(default)]
    pub supplier_thresholds: HashMap<String, f64>,
    #[serde(default = "default_true")]
    pub no_match_requires_review: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            weights: ConfidenceWeights::default(),
            default_threshold: default_threshold(),
            supplier_thresholds: HashMap::new(),
            no_match_requires_review: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_threshold() -> f64 {
    0.8
}

/// Weights applied to the classification, extraction and match scores when
/// computing overall confidence. Must sum to 1.0 within ±0.001.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConfidenceWeights {
    pub classification: f64,
    pub extraction: f64,
    #[serde(rename = "match")]
    pub match_score: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            classification: 0.25,
            extraction: 0.35,
            match_score: 0.40,
        }
    }
}

pub const WEIGHT_SUM_TOLERANCE: f64 = 0.001;

impl ConfidenceWeights {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("weights.classification", self.classification),
            ("weights.extraction", self.extraction),
            ("weights.match", self.match_score),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ThresholdRange {
                    name: name.to_string(),
                    value,
                });
            }
        }

        let sum = self.classification + self.extraction + self.match_score;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightSum { sum });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetentionConfig {
    #[serde(default)]
    pub policies: Vec<RetentionPolicy>,
}

/// One retention policy. `applies_to` names the entity types the policy
/// governs ("document", "archive").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub policy_id: String,
    pub retention_days: i64,
    #[serde(default)]
    pub grace_days: i64,
    #[serde(default)]
    pub archive_before_delete: bool,
    pub applies_to: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    #[serde(default = "default_archive_directory")]
    pub directory: String,
    #[serde(default = "default_scratch_directory")]
    pub scratch_directory: String,
    /// Hard delete also removes the backing blob when set.
    #[serde(default = "default_true")]
    pub purge_blobs_on_hard_delete: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            directory: default_archive_directory(),
            scratch_directory: default_scratch_directory(),
            purge_blobs_on_hard_delete: true,
        }
    }
}

fn default_archive_directory() -> String {
    "archive".to_string()
}

fn default_scratch_directory() -> String {
    "scratch".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL for cached supplier routing rules, in seconds.
    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_cache_ttl(),
        }
    }
}

fn default_cache_ttl() -> u64 {
    300
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_validate() {
        ConfidenceWeights::default().validate().unwrap();
    }

    #[test]
    fn test_weight_sum_off_by_one_percent_rejects() {
        let weights = ConfidenceWeights {
            classification: 0.25,
            extraction: 0.35,
            match_score: 0.39,
        };
        assert!(matches!(
            weights.validate(),
            Err(ConfigError::WeightSum { .. })
        ));
    }

    #[test]
    fn test_weight_sum_within_tolerance_accepts() {
        let weights = ConfidenceWeights {
            classification: 0.2501,
            extraction: 0.3499,
            match_score: 0.40,
        };
        weights.validate().unwrap();
    }

    #[test]
    fn test_weight_out_of_range_rejects() {
        let weights = ConfidenceWeights {
            classification: 1.2,
            extraction: -0.2,
            match_score: 0.0,
        };
        assert!(matches!(
            weights.validate(),
            Err(ConfigError::ThresholdRange { .. })
        ));
    }
}
