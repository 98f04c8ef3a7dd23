//! The state machine that owns every document status mutation.
//!
//! Per-document serialization: each transition takes that document's entry
//! in a lock map, then applies the status change as a compare-and-swap.
//! The lock serializes callers in this process; the CAS turns any race
//! that slips past it (a second process on the same database) into a
//! `Conflict` instead of silent corruption.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{info, info_span};

use crate::context::OpContext;
use crate::db::{document_repo, Database, DbError};
use crate::external::{AuditEvent, AuditSink};
use crate::holds::{HoldError, HoldRegistry};

use super::document::Document;
use super::status::DocumentStatus;

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Document '{id}' not found")]
    NotFound { id: String },

    #[error("Illegal transition for document '{id}': {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: DocumentStatus,
        to: DocumentStatus,
    },

    #[error("Document '{id}' is protected by an active legal hold (attempted transition to {attempted})")]
    Protected {
        id: String,
        attempted: DocumentStatus,
    },

    #[error("Concurrent update on document '{id}': expected status {expected}")]
    Conflict {
        id: String,
        expected: DocumentStatus,
    },

    #[error("Document '{id}' has no captured pre-delete status to undelete to")]
    MissingPreviousStatus { id: String },

    #[error("Lifecycle lock poisoned")]
    LockPoisoned,

    #[error("Store error: {0}")]
    Store(#[from] DbError),

    #[error("Hold registry error: {0}")]
    Hold(#[from] HoldError),
}

pub struct Lifecycle {
    db: Database,
    holds: Arc<HoldRegistry>,
    audit: Arc<dyn AuditSink>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Lifecycle {
    pub fn new(db: Database, holds: Arc<HoldRegistry>, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            db,
            holds,
            audit,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn entity_lock(&self, id: &str) -> Result<Arc<Mutex<()>>, LifecycleError> {
        let mut locks = self.locks.lock().map_err(|_| LifecycleError::LockPoisoned)?;
        Ok(locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }

    /// Applies one guarded transition and returns the updated document.
    ///
    /// Transitions into ARCHIVED, PENDING_DELETE or DELETED consult the
    /// hold registry first and fail with `Protected` without mutating
    /// anything. A transition into PENDING_DELETE captures the current
    /// status for a later undelete.
    pub fn transition(
        &self,
        ctx: &OpContext,
        id: &str,
        to: DocumentStatus,
    ) -> Result<Document, LifecycleError> {
        let _span = info_span!("lifecycle_transition", document_id = %id, to = %to).entered();

        let lock = self.entity_lock(id)?;
        let _guard = lock.lock().map_err(|_| LifecycleError::LockPoisoned)?;

        let doc = self.load(id)?;
        let from = doc.status;

        if !from.can_transition(to) {
            return Err(LifecycleError::InvalidTransition {
                id: id.to_string(),
                from,
                to,
            });
        }

        // Leaving PENDING_DELETE for anything but DELETED is an undelete,
        // which must go through `undelete` so the captured status is used.
        if from == DocumentStatus::PendingDelete && to != DocumentStatus::Deleted {
            return Err(LifecycleError::InvalidTransition {
                id: id.to_string(),
                from,
                to,
            });
        }

        if to.requires_hold_check() && self.holds.is_protected(id)? {
            return Err(LifecycleError::Protected {
                id: id.to_string(),
                attempted: to,
            });
        }

        let previous_status = match to {
            DocumentStatus::PendingDelete => Some(from),
            _ => None,
        };

        let swapped = document_repo::update_status(&self.db, id, from, to, previous_status)?;
        if !swapped {
            return Err(LifecycleError::Conflict {
                id: id.to_string(),
                expected: from,
            });
        }

        info!(document_id = %id, %from, %to, "document transitioned");
        let _ = self.audit.append(
            &AuditEvent::new("document.transition", id, ctx).with_details(serde_json::json!({
                "from": from.as_str(),
                "to": to.as_str(),
            })),
        );

        self.load(id)
    }

    /// REVIEW → OUT, driven by a READY_FOR_EXPORT routing decision.
    pub fn mark_out(&self, ctx: &OpContext, id: &str) -> Result<Document, LifecycleError> {
        self.transition(ctx, id, DocumentStatus::Out)
    }

    /// REVIEW → QUARANTINE, for non-documents and manual rejections.
    pub fn quarantine(&self, ctx: &OpContext, id: &str) -> Result<Document, LifecycleError> {
        self.transition(ctx, id, DocumentStatus::Quarantine)
    }

    /// Reversible delete: captures the current status, then parks the
    /// document in PENDING_DELETE.
    pub fn soft_delete(&self, ctx: &OpContext, id: &str) -> Result<Document, LifecycleError> {
        self.transition(ctx, id, DocumentStatus::PendingDelete)
    }

    /// Restores a PENDING_DELETE document to the status captured at
    /// soft-delete time, not to a fixed default.
    pub fn undelete(&self, ctx: &OpContext, id: &str) -> Result<Document, LifecycleError> {
        let _span = info_span!("lifecycle_undelete", document_id = %id).entered();

        let lock = self.entity_lock(id)?;
        let _guard = lock.lock().map_err(|_| LifecycleError::LockPoisoned)?;

        let doc = self.load(id)?;
        if doc.status != DocumentStatus::PendingDelete {
            return Err(LifecycleError::InvalidTransition {
                id: id.to_string(),
                from: doc.status,
                to: DocumentStatus::Review,
            });
        }

        let target = doc
            .previous_status
            .ok_or_else(|| LifecycleError::MissingPreviousStatus { id: id.to_string() })?;

        let swapped =
            document_repo::update_status(&self.db, id, DocumentStatus::PendingDelete, target, None)?;
        if !swapped {
            return Err(LifecycleError::Conflict {
                id: id.to_string(),
                expected: DocumentStatus::PendingDelete,
            });
        }

        info!(document_id = %id, restored_to = %target, "document undeleted");
        let _ = self.audit.append(
            &AuditEvent::new("document.undelete", id, ctx).with_details(serde_json::json!({
                "restored_to": target.as_str(),
            })),
        );

        self.load(id)
    }

    pub fn get(&self, id: &str) -> Result<Document, LifecycleError> {
        self.load(id)
    }

    fn load(&self, id: &str) -> Result<Document, LifecycleError> {
        document_repo::find_by_id(&self.db, id)?.ok_or_else(|| LifecycleError::NotFound {
            id: id.to_string(),
        })
    }
}
