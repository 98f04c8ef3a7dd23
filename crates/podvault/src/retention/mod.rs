//! Retention policy evaluation and the cleanup sweep.
//!
//! The asymmetry here is deliberate: when a policy sets
//! `archive_before_delete`, a document is never directly delete-eligible.
//! It is archived first, and deletion is reached via the ARCHIVED path in
//! a later cleanup pass.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, info_span};

use crate::archive::{ArchiveError, ArchiveManager};
use crate::config::schema::RetentionPolicy;
use crate::context::OpContext;
use crate::db::{document_repo, Database, DbError};
use crate::holds::{HoldError, HoldRegistry};
use crate::lifecycle::{Document, DocumentStatus, Lifecycle, LifecycleError};

#[derive(Error, Debug)]
pub enum RetentionError {
    #[error("Document '{id}' is not yet eligible for a retention action (eligible at {eligible_at})")]
    NotEligible {
        id: String,
        eligible_at: DateTime<Utc>,
    },

    #[error("Document '{id}' is protected by an active legal hold")]
    Protected { id: String },

    #[error("No retention policy applies to document '{id}' (entity type '{entity_type}')")]
    NoPolicy { id: String, entity_type: String },

    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Hold registry error: {0}")]
    Hold(#[from] HoldError),

    #[error("Store error: {0}")]
    Store(#[from] DbError),
}

/// Expiry math for one document under one policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetentionAssessment {
    pub expiry_date: DateTime<Utc>,
    pub grace_expiry: DateTime<Utc>,
    pub is_expired: bool,
    pub in_grace_period: bool,
    pub archive_eligible: bool,
    pub delete_eligible: bool,
}

/// Computes expiry and eligibility. Note `delete_eligible` stays false
/// whenever the policy archives before deleting, even deep into grace.
pub fn assess(document: &Document, policy: &RetentionPolicy, now: DateTime<Utc>) -> RetentionAssessment {
    let expiry_date = document.created_at + Duration::days(policy.retention_days);
    let grace_expiry = expiry_date + Duration::days(policy.grace_days);

    let is_expired = now >= expiry_date;
    let in_grace_period = now >= expiry_date && now < grace_expiry;

    RetentionAssessment {
        expiry_date,
        grace_expiry,
        is_expired,
        in_grace_period,
        archive_eligible: is_expired && policy.archive_before_delete,
        delete_eligible: in_grace_period && !policy.archive_before_delete,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RetentionAction {
    Archive,
    SoftDelete,
    HardDelete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanupOutcome {
    pub document_id: String,
    pub action: RetentionAction,
    /// False in dry runs.
    pub applied: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanupFailure {
    pub document_id: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanupReport {
    /// Documents that had an applicable policy.
    pub evaluated: usize,
    pub actions: Vec<CleanupOutcome>,
    pub errors: Vec<CleanupFailure>,
    pub dry_run: bool,
}

pub struct RetentionEvaluator {
    db: Database,
    lifecycle: Arc<Lifecycle>,
    holds: Arc<HoldRegistry>,
    archive: Arc<ArchiveManager>,
    policies: Vec<RetentionPolicy>,
}

impl RetentionEvaluator {
    pub fn new(
        db: Database,
        lifecycle: Arc<Lifecycle>,
        holds: Arc<HoldRegistry>,
        archive: Arc<ArchiveManager>,
        policies: Vec<RetentionPolicy>,
    ) -> Self {
        Self {
            db,
            lifecycle,
            holds,
            archive,
            policies,
        }
    }

    /// First policy whose `applies_to` covers the document's entity type.
    fn policy_for(&self, document: &Document) -> Option<&RetentionPolicy> {
        let entity_type = document.entity_type();
        self.policies
            .iter()
            .find(|p| p.applies_to.iter().any(|t| t == entity_type))
    }

    /// Exactly one action, chosen by precedence: archive, else soft-delete
    /// in grace, else hard-delete. PENDING_DELETE documents only become
    /// actionable again once their grace window lapses.
    fn planned_action(
        &self,
        document: &Document,
        assessment: &RetentionAssessment,
        now: DateTime<Utc>,
    ) -> Option<RetentionAction> {
        if document.status == DocumentStatus::PendingDelete {
            return (now >= assessment.grace_expiry).then_some(RetentionAction::HardDelete);
        }
        if !assessment.is_expired {
            return None;
        }
        if assessment.archive_eligible && document.status != DocumentStatus::Archived {
            Some(RetentionAction::Archive)
        } else if assessment.in_grace_period {
            Some(RetentionAction::SoftDelete)
        } else {
            Some(RetentionAction::HardDelete)
        }
    }

    /// Applies retention to a single document. Errors if the document is
    /// not yet eligible or is hold-protected; otherwise performs exactly
    /// one transition.
    pub fn apply_retention(
        &self,
        ctx: &OpContext,
        document_id: &str,
    ) -> Result<RetentionAction, RetentionError> {
        let _span = info_span!("apply_retention", document_id = %document_id).entered();

        let doc = self.lifecycle.get(document_id)?;
        let policy = self.policy_for(&doc).ok_or_else(|| RetentionError::NoPolicy {
            id: document_id.to_string(),
            entity_type: doc.entity_type().to_string(),
        })?;

        let now = Utc::now();
        let assessment = assess(&doc, policy, now);
        let action = self.planned_action(&doc, &assessment, now).ok_or_else(|| {
            let eligible_at = if doc.status == DocumentStatus::PendingDelete {
                assessment.grace_expiry
            } else {
                assessment.expiry_date
            };
            RetentionError::NotEligible {
                id: document_id.to_string(),
                eligible_at,
            }
        })?;

        if self.holds.is_protected(document_id)? {
            return Err(RetentionError::Protected {
                id: document_id.to_string(),
            });
        }

        self.apply(ctx, document_id, action)?;
        Ok(action)
    }

    fn apply(
        &self,
        ctx: &OpContext,
        document_id: &str,
        action: RetentionAction,
    ) -> Result<(), RetentionError> {
        match action {
            RetentionAction::Archive => {
                self.archive.archive(ctx, document_id)?;
            }
            RetentionAction::SoftDelete => {
                self.lifecycle.soft_delete(ctx, document_id)?;
            }
            RetentionAction::HardDelete => {
                self.archive.hard_delete(ctx, document_id)?;
            }
        }
        Ok(())
    }

    /// Sweeps up to `limit` documents. A single item's failure never
    /// aborts the batch: failures are collected per item and reported
    /// alongside successes.
    pub fn run_cleanup(
        &self,
        ctx: &OpContext,
        dry_run: bool,
        limit: usize,
    ) -> Result<CleanupReport, RetentionError> {
        let _span = info_span!("retention_cleanup", dry_run, limit).entered();

        let docs = document_repo::list_undeleted(&self.db, limit)?;
        let now = Utc::now();

        let mut report = CleanupReport {
            evaluated: 0,
            actions: Vec::new(),
            errors: Vec::new(),
            dry_run,
        };

        for doc in docs {
            let Some(policy) = self.policy_for(&doc) else {
                continue;
            };
            report.evaluated += 1;

            let assessment = assess(&doc, policy, now);
            let Some(action) = self.planned_action(&doc, &assessment, now) else {
                continue;
            };

            if dry_run {
                match self.holds.is_protected(&doc.id) {
                    Ok(false) => report.actions.push(CleanupOutcome {
                        document_id: doc.id,
                        action,
                        applied: false,
                    }),
                    Ok(true) => report.errors.push(CleanupFailure {
                        error: RetentionError::Protected { id: doc.id.clone() }.to_string(),
                        document_id: doc.id,
                    }),
                    Err(e) => report.errors.push(CleanupFailure {
                        error: e.to_string(),
                        document_id: doc.id,
                    }),
                }
                continue;
            }

            match self.apply(ctx, &doc.id, action) {
                Ok(()) => report.actions.push(CleanupOutcome {
                    document_id: doc.id,
                    action,
                    applied: true,
                }),
                Err(e) => report.errors.push(CleanupFailure {
                    error: e.to_string(),
                    document_id: doc.id,
                }),
            }
        }

        info!(
            evaluated = report.evaluated,
            applied = report.actions.len(),
            failed = report.errors.len(),
            dry_run,
            "retention cleanup finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(retention_days: i64, grace_days: i64, archive_before_delete: bool) -> RetentionPolicy {
        RetentionPolicy {
            policy_id: "p1".to_string(),
            retention_days,
            grace_days,
            archive_before_delete,
            applies_to: vec!["document".to_string()],
        }
    }

    fn doc_aged(days: i64) -> Document {
        let mut doc = Document::new("hash", None);
        doc.created_at = Utc::now() - Duration::days(days);
        doc
    }

    #[test]
    fn test_day_one_of_grace() {
        // 366 days old, 365-day retention, 30-day grace: expired, in grace.
        let doc = doc_aged(366);
        let assessment = assess(&doc, &policy(365, 30, true), Utc::now());

        assert!(assessment.is_expired);
        assert!(assessment.in_grace_period);
        assert!(assessment.archive_eligible);
        assert!(!assessment.delete_eligible);
    }

    #[test]
    fn test_archive_before_delete_suppresses_delete_eligibility() {
        let doc = doc_aged(366);

        let archiving = assess(&doc, &policy(365, 30, true), Utc::now());
        assert!(archiving.archive_eligible);
        assert!(!archiving.delete_eligible);

        let deleting = assess(&doc, &policy(365, 30, false), Utc::now());
        assert!(!deleting.archive_eligible);
        assert!(deleting.delete_eligible);
    }

    #[test]
    fn test_not_expired_before_retention_lapses() {
        let doc = doc_aged(100);
        let assessment = assess(&doc, &policy(365, 30, false), Utc::now());

        assert!(!assessment.is_expired);
        assert!(!assessment.in_grace_period);
        assert!(!assessment.archive_eligible);
        assert!(!assessment.delete_eligible);
    }

    #[test]
    fn test_past_grace_is_expired_but_not_in_grace() {
        let doc = doc_aged(400);
        let assessment = assess(&doc, &policy(365, 30, false), Utc::now());

        assert!(assessment.is_expired);
        assert!(!assessment.in_grace_period);
        assert!(!assessment.delete_eligible);
    }

    #[test]
    fn test_zero_grace_goes_straight_past_grace() {
        let doc = doc_aged(366);
        let assessment = assess(&doc, &policy(365, 0, false), Utc::now());

        assert!(assessment.is_expired);
        assert!(!assessment.in_grace_period);
        assert_eq!(assessment.expiry_date, assessment.grace_expiry);
    }
}
