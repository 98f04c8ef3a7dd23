//! Legal hold registry.
//!
//! `is_protected` is the single gate every destructive operation consults.
//! Hold expiry is passive: a hold past its `expires_at` stays stored as
//! ACTIVE (there is no background sweep) and only reads through
//! `is_protected` treat it as no longer protecting.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::context::OpContext;
use crate::db::{hold_repo, Database, DbError};
use crate::external::{AuditEvent, AuditSink};

#[derive(Error, Debug)]
pub enum HoldError {
    #[error("Hold '{id}' not found")]
    NotFound { id: String },

    #[error("Document '{document_id}' already has an active legal hold '{hold_id}'")]
    AlreadyActive { document_id: String, hold_id: String },

    #[error("Hold '{id}' is not active (status {status})")]
    NotActive { id: String, status: HoldStatus },

    #[error("Store error: {0}")]
    Store(#[from] DbError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HoldStatus {
    Active,
    Released,
}

impl HoldStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            HoldStatus::Active => "ACTIVE",
            HoldStatus::Released => "RELEASED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(HoldStatus::Active),
            "RELEASED" => Some(HoldStatus::Released),
            _ => None,
        }
    }
}

impl std::fmt::Display for HoldStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegalHold {
    pub id: String,
    pub document_id: String,
    pub status: HoldStatus,
    pub reason: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub released_by: Option<String>,
    pub released_at: Option<DateTime<Utc>>,
    pub release_reason: Option<String>,
}

impl LegalHold {
    pub fn new(
        document_id: impl Into<String>,
        reason: impl Into<String>,
        created_by: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            document_id: document_id.into(),
            status: HoldStatus::Active,
            reason: reason.into(),
            created_by: created_by.into(),
            created_at: Utc::now(),
            expires_at,
            released_by: None,
            released_at: None,
            release_reason: None,
        }
    }

    /// Whether this hold is currently protecting its document. A stored
    /// ACTIVE status is necessary but not sufficient: an expired hold no
    /// longer protects.
    pub fn is_protecting(&self, now: DateTime<Utc>) -> bool {
        self.status == HoldStatus::Active
            && self.expires_at.map(|exp| now < exp).unwrap_or(true)
    }
}

pub struct HoldRegistry {
    db: Database,
    audit: Arc<dyn AuditSink>,
}

impl HoldRegistry {
    pub fn new(db: Database, audit: Arc<dyn AuditSink>) -> Self {
        Self { db, audit }
    }

    /// Places a hold on a document. Fails with `AlreadyActive` if a
    /// non-expired ACTIVE hold already exists.
    ///
    /// Expired holds still stored as ACTIVE are released here (actor
    /// "system", reason "expired"); the write path is the only place the
    /// passive-expiry model flips stored state.
    pub fn create_hold(
        &self,
        ctx: &OpContext,
        document_id: &str,
        reason: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<LegalHold, HoldError> {
        let now = Utc::now();
        for existing in hold_repo::find_active_by_document(&self.db, document_id)? {
            if existing.is_protecting(now) {
                return Err(HoldError::AlreadyActive {
                    document_id: document_id.to_string(),
                    hold_id: existing.id,
                });
            }
            hold_repo::mark_released(&self.db, &existing.id, "system", now, "expired")?;
        }

        let hold = LegalHold::new(document_id, reason, ctx.actor.clone(), expires_at);
        hold_repo::insert(&self.db, &hold)?;

        info!(document_id, hold_id = %hold.id, "legal hold created");
        let _ = self.audit.append(
            &AuditEvent::new("hold.create", document_id, ctx).with_details(serde_json::json!({
                "hold_id": hold.id,
                "reason": reason,
                "expires_at": hold.expires_at.map(|t| t.to_rfc3339()),
            })),
        );

        Ok(hold)
    }

    /// Releases an ACTIVE hold, recording who released it and why.
    pub fn release_hold(
        &self,
        ctx: &OpContext,
        hold_id: &str,
        reason: &str,
    ) -> Result<LegalHold, HoldError> {
        let hold = hold_repo::find_by_id(&self.db, hold_id)?.ok_or_else(|| HoldError::NotFound {
            id: hold_id.to_string(),
        })?;

        if hold.status != HoldStatus::Active {
            return Err(HoldError::NotActive {
                id: hold_id.to_string(),
                status: hold.status,
            });
        }

        let released_at = Utc::now();
        let released = hold_repo::mark_released(&self.db, hold_id, &ctx.actor, released_at, reason)?;
        if !released {
            // Lost a race with another releaser between read and update.
            return Err(HoldError::NotActive {
                id: hold_id.to_string(),
                status: HoldStatus::Released,
            });
        }

        info!(hold_id, document_id = %hold.document_id, "legal hold released");
        let _ = self.audit.append(
            &AuditEvent::new("hold.release", &hold.document_id, ctx).with_details(
                serde_json::json!({
                    "hold_id": hold_id,
                    "release_reason": reason,
                }),
            ),
        );

        hold_repo::find_by_id(&self.db, hold_id)?.ok_or_else(|| HoldError::NotFound {
            id: hold_id.to_string(),
        })
    }

    /// True iff an ACTIVE hold exists whose `expires_at` is null or in the
    /// future. Every destructive operation consults this predicate.
    pub fn is_protected(&self, document_id: &str) -> Result<bool, HoldError> {
        let now = Utc::now();
        Ok(hold_repo::find_active_by_document(&self.db, document_id)?
            .iter()
            .any(|hold| hold.is_protecting(now)))
    }

    /// The currently protecting hold, if any.
    pub fn active_hold(&self, document_id: &str) -> Result<Option<LegalHold>, HoldError> {
        let now = Utc::now();
        Ok(hold_repo::find_active_by_document(&self.db, document_id)?
            .into_iter()
            .find(|hold| hold.is_protecting(now)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::NoopAuditSink;
    use chrono::Duration;

    fn registry() -> HoldRegistry {
        HoldRegistry::new(Database::open_in_memory().unwrap(), Arc::new(NoopAuditSink))
    }

    #[test]
    fn test_create_hold_protects_document() {
        let registry = registry();
        let ctx = OpContext::new("legal@example.com");

        let hold = registry
            .create_hold(&ctx, "doc-1", "litigation", None)
            .unwrap();
        assert_eq!(hold.status, HoldStatus::Active);
        assert_eq!(hold.created_by, "legal@example.com");
        assert!(registry.is_protected("doc-1").unwrap());
    }

    #[test]
    fn test_second_active_hold_fails() {
        let registry = registry();
        let ctx = OpContext::new("legal@example.com");

        registry
            .create_hold(&ctx, "doc-1", "litigation", None)
            .unwrap();
        let result = registry.create_hold(&ctx, "doc-1", "audit", None);
        assert!(matches!(result, Err(HoldError::AlreadyActive { .. })));
    }

    #[test]
    fn test_holds_are_per_document() {
        let registry = registry();
        let ctx = OpContext::new("legal@example.com");

        registry
            .create_hold(&ctx, "doc-1", "litigation", None)
            .unwrap();
        registry
            .create_hold(&ctx, "doc-2", "litigation", None)
            .unwrap();
        assert!(registry.is_protected("doc-1").unwrap());
        assert!(registry.is_protected("doc-2").unwrap());
    }

    #[test]
    fn test_release_clears_protection() {
        let registry = registry();
        let ctx = OpContext::new("legal@example.com");

        let hold = registry
            .create_hold(&ctx, "doc-1", "litigation", None)
            .unwrap();
        let released = registry.release_hold(&ctx, &hold.id, "resolved").unwrap();

        assert_eq!(released.status, HoldStatus::Released);
        assert_eq!(released.released_by.as_deref(), Some("legal@example.com"));
        assert_eq!(released.release_reason.as_deref(), Some("resolved"));
        assert!(!registry.is_protected("doc-1").unwrap());
    }

    #[test]
    fn test_release_twice_fails() {
        let registry = registry();
        let ctx = OpContext::new("legal@example.com");

        let hold = registry
            .create_hold(&ctx, "doc-1", "litigation", None)
            .unwrap();
        registry.release_hold(&ctx, &hold.id, "resolved").unwrap();

        assert!(matches!(
            registry.release_hold(&ctx, &hold.id, "again"),
            Err(HoldError::NotActive { .. })
        ));
    }

    #[test]
    fn test_release_missing_hold_fails() {
        let registry = registry();
        let ctx = OpContext::new("legal@example.com");
        assert!(matches!(
            registry.release_hold(&ctx, "missing", "oops"),
            Err(HoldError::NotFound { .. })
        ));
    }

    #[test]
    fn test_expired_hold_reads_unprotected_but_stays_active() {
        let registry = registry();
        let ctx = OpContext::new("legal@example.com");

        let expired = Utc::now() - Duration::hours(1);
        let hold = registry
            .create_hold(&ctx, "doc-1", "short hold", Some(expired))
            .unwrap();

        assert!(!registry.is_protected("doc-1").unwrap());
        // Stored status is untouched: expiry is passive.
        let stored = hold_repo::find_by_id(&registry.db, &hold.id).unwrap().unwrap();
        assert_eq!(stored.status, HoldStatus::Active);
    }

    #[test]
    fn test_create_over_expired_hold_succeeds_and_releases_it() {
        let registry = registry();
        let ctx = OpContext::new("legal@example.com");

        let expired = Utc::now() - Duration::hours(1);
        let old = registry
            .create_hold(&ctx, "doc-1", "short hold", Some(expired))
            .unwrap();
        let new = registry
            .create_hold(&ctx, "doc-1", "fresh hold", None)
            .unwrap();

        assert!(registry.is_protected("doc-1").unwrap());
        let stored_old = hold_repo::find_by_id(&registry.db, &old.id).unwrap().unwrap();
        assert_eq!(stored_old.status, HoldStatus::Released);
        assert_eq!(stored_old.release_reason.as_deref(), Some("expired"));
        assert_ne!(new.id, old.id);
    }

    #[test]
    fn test_future_expiry_still_protects() {
        let registry = registry();
        let ctx = OpContext::new("legal@example.com");

        registry
            .create_hold(&ctx, "doc-1", "hold", Some(Utc::now() + Duration::days(7)))
            .unwrap();
        assert!(registry.is_protected("doc-1").unwrap());
    }
}
