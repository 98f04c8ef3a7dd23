//! Builder patterns for creating test data programmatically.

#![allow(dead_code)]

use std::collections::HashMap;

use podvault::config::{ConfidenceWeights, RetentionPolicy, RoutingConfig};
use podvault::matcher::{ExtractedFields, JobRecord};

/// Builder for `RoutingConfig` instances.
pub struct RoutingConfigBuilder {
    enabled: bool,
    weights: ConfidenceWeights,
    default_threshold: f64,
    supplier_thresholds: HashMap<String, f64>,
    no_match_requires_review: bool,
}

impl RoutingConfigBuilder {
    pub fn new() -> Self {
        Self {
            enabled: true,
            weights: ConfidenceWeights::default(),
            default_threshold: 0.8,
            supplier_thresholds: HashMap::new(),
            no_match_requires_review: true,
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn weights(mut self, classification: f64, extraction: f64, match_score: f64) -> Self {
        self.weights = ConfidenceWeights {
            classification,
            extraction,
            match_score,
        };
        self
    }

    pub fn default_threshold(mut self, threshold: f64) -> Self {
        self.default_threshold = threshold;
        self
    }

    pub fn supplier_threshold(mut self, supplier: &str, threshold: f64) -> Self {
        self.supplier_thresholds
            .insert(supplier.to_lowercase(), threshold);
        self
    }

    pub fn no_match_requires_review(mut self, required: bool) -> Self {
        self.no_match_requires_review = required;
        self
    }

    pub fn build(self) -> RoutingConfig {
        RoutingConfig {
            enabled: self.enabled,
            weights: self.weights,
            default_threshold: self.default_threshold,
            supplier_thresholds: self.supplier_thresholds,
            no_match_requires_review: self.no_match_requires_review,
        }
    }
}

/// Builder for `RetentionPolicy` instances.
pub struct PolicyBuilder {
    policy_id: String,
    retention_days: i64,
    grace_days: i64,
    archive_before_delete: bool,
    applies_to: Vec<String>,
}

impl PolicyBuilder {
    pub fn new(policy_id: &str) -> Self {
        Self {
            policy_id: policy_id.to_string(),
            retention_days: 365,
            grace_days: 30,
            archive_before_delete: false,
            applies_to: vec!["document".to_string()],
        }
    }

    pub fn retention_days(mut self, days: i64) -> Self {
        self.retention_days = days;
        self
    }

    pub fn grace_days(mut self, days: i64) -> Self {
        self.grace_days = days;
        self
    }

    pub fn archive_before_delete(mut self, enabled: bool) -> Self {
        self.archive_before_delete = enabled;
        self
    }

    pub fn applies_to(mut self, entity_types: &[&str]) -> Self {
        self.applies_to = entity_types.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn build(self) -> RetentionPolicy {
        RetentionPolicy {
            policy_id: self.policy_id,
            retention_days: self.retention_days,
            grace_days: self.grace_days,
            archive_before_delete: self.archive_before_delete,
            applies_to: self.applies_to,
        }
    }
}

pub fn job(id: &str, job_ref: &str, vehicle_reg: Option<&str>) -> JobRecord {
    JobRecord {
        id: id.to_string(),
        job_ref: job_ref.to_string(),
        vehicle_reg: vehicle_reg.map(str::to_string),
        supplier: None,
    }
}

pub fn extracted(job_ref: Option<&str>, vehicle_reg: Option<&str>, confidence: f64) -> ExtractedFields {
    ExtractedFields {
        supplier: None,
        job_ref: job_ref.map(str::to_string),
        vehicle_reg: vehicle_reg.map(str::to_string),
        date: None,
        confidence,
    }
}
