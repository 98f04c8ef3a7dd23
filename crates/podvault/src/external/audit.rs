//! Audit sink implementations.

use crate::db::{audit_repo, Database};

use super::{AuditEvent, AuditSink, ExternalError};

/// Audit sink backed by the engine database's `audit_events` table.
pub struct DbAuditSink {
    db: Database,
}

impl DbAuditSink {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl AuditSink for DbAuditSink {
    fn append(&self, event: &AuditEvent) -> Result<(), ExternalError> {
        audit_repo::append(&self.db, event)?;
        Ok(())
    }
}

/// Discards events. For tests and dry-run tooling.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn append(&self, _event: &AuditEvent) -> Result<(), ExternalError> {
        Ok(())
    }
}
