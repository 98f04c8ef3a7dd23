//! Routing decision engine.
//!
//! `decide` is a decision table, not a weighted score comparison: rules
//! evaluate in strict order and the first match wins. The weighted overall
//! confidence only matters once the earlier rules have passed.

pub mod cache;

pub use cache::RuleCache;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::schema::{ConfidenceWeights, RoutingConfig};
use crate::error::ConfigError;
use crate::lifecycle::Document;
use crate::matcher::MatchResult;

/// Documents classified below this never auto-send, regardless of the
/// overall score.
pub const MIN_CLASSIFICATION_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    AutoSend,
    ManualReview,
    ForceSend,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    Disabled,
    NoMatch,
    LowClassification,
    HighConfidence,
    BelowThreshold,
    ManualOverride,
    ManualReject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NextAction {
    ReadyForExport,
    Review,
    Rejected,
}

impl Decision {
    pub fn next_action(&self) -> NextAction {
        match self {
            Decision::AutoSend | Decision::ForceSend => NextAction::ReadyForExport,
            Decision::ManualReview => NextAction::Review,
            Decision::Reject => NextAction::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub decision: Decision,
    pub reason: ReasonCode,
    pub next_action: NextAction,
    pub overall_confidence: f64,
    /// The supplier threshold in force, when the table got that far.
    pub threshold: Option<f64>,
    /// Override reason for FORCE_SEND / REJECT, kept for audit.
    pub note: Option<String>,
    pub decided_at: DateTime<Utc>,
}

impl RoutingDecision {
    fn new(decision: Decision, reason: ReasonCode) -> Self {
        Self {
            decision,
            reason,
            next_action: decision.next_action(),
            overall_confidence: 0.0,
            threshold: None,
            note: None,
            decided_at: Utc::now(),
        }
    }
}

/// The three scores feeding the weighted overall confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceScores {
    pub classification: f64,
    pub extraction: f64,
    pub match_score: f64,
}

/// Weighted overall confidence, clamped to [0,1]. Weights are validated
/// at configuration load, never here.
pub fn overall_confidence(scores: &ConfidenceScores, weights: &ConfidenceWeights) -> f64 {
    let sum = scores.classification * weights.classification
        + scores.extraction * weights.extraction
        + scores.match_score * weights.match_score;
    sum.clamp(0.0, 1.0)
}

pub struct RoutingEngine {
    config: RoutingConfig,
    cache: RuleCache,
}

impl RoutingEngine {
    /// Validates the weight set and builds the threshold cache. An invalid
    /// weight sum is rejected here, at load.
    pub fn new(config: RoutingConfig, cache_ttl: Duration) -> Result<Self, ConfigError> {
        config.weights.validate()?;
        let cache = RuleCache::new(
            config.supplier_thresholds.clone(),
            config.default_threshold,
            cache_ttl,
        );
        Ok(Self { config, cache })
    }

    /// Exact supplier key (case-insensitive) > `*` wildcard > global
    /// default, in that precedence.
    pub fn supplier_threshold(&self, supplier: Option<&str>) -> f64 {
        self.cache.threshold_for(supplier)
    }

    pub fn cache(&self) -> &RuleCache {
        &self.cache
    }

    /// Runs the decision table. First matching rule wins:
    ///
    /// 1. engine disabled            → MANUAL_REVIEW / DISABLED
    /// 2. no job match (policy set)  → MANUAL_REVIEW / NO_MATCH
    /// 3. classification below floor → MANUAL_REVIEW / LOW_CLASSIFICATION
    /// 4. overall ≥ supplier thresh  → AUTO_SEND / HIGH_CONFIDENCE
    /// 5. otherwise                  → MANUAL_REVIEW / BELOW_THRESHOLD
    pub fn decide(&self, document: &Document, match_result: &MatchResult) -> RoutingDecision {
        if !self.config.enabled {
            return RoutingDecision::new(Decision::ManualReview, ReasonCode::Disabled);
        }

        if !match_result.is_match() && self.config.no_match_requires_review {
            return RoutingDecision::new(Decision::ManualReview, ReasonCode::NoMatch);
        }

        let scores = ConfidenceScores {
            classification: document.classification_confidence,
            extraction: document.extraction_confidence,
            match_score: match_result.summary.best_score,
        };
        let overall = overall_confidence(&scores, &self.config.weights);

        if document.classification_confidence < MIN_CLASSIFICATION_CONFIDENCE {
            let mut decision =
                RoutingDecision::new(Decision::ManualReview, ReasonCode::LowClassification);
            decision.overall_confidence = overall;
            return decision;
        }

        let threshold = self.supplier_threshold(document.supplier.as_deref());
        debug!(
            document_id = %document.id,
            overall,
            threshold,
            "routing decision table reached threshold rule"
        );

        let mut decision = if overall >= threshold {
            RoutingDecision::new(Decision::AutoSend, ReasonCode::HighConfidence)
        } else {
            RoutingDecision::new(Decision::ManualReview, ReasonCode::BelowThreshold)
        };
        decision.overall_confidence = overall;
        decision.threshold = Some(threshold);
        decision
    }

    /// Operator override. Bypasses the table entirely; the reason is kept
    /// for audit.
    pub fn force_send(&self, document: &Document, override_reason: &str) -> RoutingDecision {
        let mut decision = RoutingDecision::new(Decision::ForceSend, ReasonCode::ManualOverride);
        decision.overall_confidence = document.classification_confidence;
        decision.note = Some(override_reason.to_string());
        decision
    }

    /// Operator rejection. Bypasses the table entirely.
    pub fn reject(&self, reason: &str) -> RoutingDecision {
        let mut decision = RoutingDecision::new(Decision::Reject, ReasonCode::ManualReject);
        decision.note = Some(reason.to_string());
        decision
    }
}
