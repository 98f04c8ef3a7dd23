//! Archive and restore manager.
//!
//! Archival bundles a document's content and a metadata manifest into a
//! zip, records an `ArchiveRecord` carrying the manifest checksum, and
//! transitions the document to ARCHIVED. Restore is not a resurrection:
//! it mints a brand-new document in RESTORED status referencing the
//! archive, and the original archived document id is never reactivated.

pub mod bundle;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, info_span, warn};
use uuid::Uuid;

use crate::context::OpContext;
use crate::db::{archive_repo, document_repo, Database, DbError};
use crate::external::{AuditEvent, AuditSink, BlobStore, ExternalError};
use crate::holds::{HoldError, HoldRegistry};
use crate::lifecycle::{Document, DocumentStatus, Lifecycle, LifecycleError};
use crate::sanitize;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Archive record '{id}' not found")]
    NotFound { id: String },

    #[error("Document '{id}' is already archived")]
    AlreadyArchived { id: String },

    #[error("Document '{id}' is protected by an active legal hold")]
    Protected { id: String },

    #[error("Archive record '{id}' is not restorable (status {status})")]
    NotRestorable { id: String, status: ArchiveStatus },

    #[error("Checksum mismatch for archive '{id}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        id: String,
        expected: String,
        actual: String,
    },

    #[error("Bundle I/O for archive '{id}': {reason}")]
    Bundle { id: String, reason: String },

    #[error("Bad manifest in archive '{id}': {reason}")]
    Manifest { id: String, reason: String },

    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("Hold registry error: {0}")]
    Hold(#[from] HoldError),

    #[error("Store error: {0}")]
    Store(#[from] DbError),

    #[error("Blob store error: {0}")]
    Blob(#[from] ExternalError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArchiveStatus {
    Archived,
    Restored,
}

impl ArchiveStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ArchiveStatus::Archived => "ARCHIVED",
            ArchiveStatus::Restored => "RESTORED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ARCHIVED" => Some(ArchiveStatus::Archived),
            "RESTORED" => Some(ArchiveStatus::Restored),
            _ => None,
        }
    }
}

impl std::fmt::Display for ArchiveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveRecord {
    pub id: String,
    pub original_document_id: String,
    pub archive_location: String,
    pub checksum: String,
    pub status: ArchiveStatus,
    pub restore_location: Option<String>,
    pub restored_at: Option<DateTime<Utc>>,
    pub restored_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ArchiveRecord {
    pub fn new(
        original_document_id: impl Into<String>,
        archive_location: impl Into<String>,
        checksum: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            original_document_id: original_document_id.into(),
            archive_location: archive_location.into(),
            checksum: checksum.into(),
            status: ArchiveStatus::Archived,
            restore_location: None,
            restored_at: None,
            restored_by: None,
            created_at: Utc::now(),
        }
    }
}

/// The metadata manifest packed into every bundle. Carried forward onto
/// the restored document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveManifest {
    pub archive_id: String,
    pub document_id: String,
    pub content_hash: String,
    pub archived_from_status: DocumentStatus,
    pub classification_confidence: f64,
    pub extraction_confidence: f64,
    pub matched_job_ref: Option<String>,
    pub matched_vehicle_reg: Option<String>,
    pub supplier: Option<String>,
    pub metadata: serde_json::Value,
    pub document_created_at: DateTime<Utc>,
    pub archived_at: DateTime<Utc>,
}

pub struct ArchiveManager {
    db: Database,
    lifecycle: Arc<Lifecycle>,
    holds: Arc<HoldRegistry>,
    blobs: Arc<dyn BlobStore>,
    audit: Arc<dyn AuditSink>,
    archive_dir: PathBuf,
    scratch_dir: PathBuf,
    purge_blobs_on_hard_delete: bool,
}

impl ArchiveManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Database,
        lifecycle: Arc<Lifecycle>,
        holds: Arc<HoldRegistry>,
        blobs: Arc<dyn BlobStore>,
        audit: Arc<dyn AuditSink>,
        archive_dir: impl Into<PathBuf>,
        scratch_dir: impl Into<PathBuf>,
        purge_blobs_on_hard_delete: bool,
    ) -> Self {
        Self {
            db,
            lifecycle,
            holds,
            blobs,
            audit,
            archive_dir: archive_dir.into(),
            scratch_dir: scratch_dir.into(),
            purge_blobs_on_hard_delete,
        }
    }

    /// Bundles a document and transitions it to ARCHIVED.
    ///
    /// Any failure after the bundle is written removes the partial
    /// artifacts: a failed archive leaves no bundle file and no orphan
    /// `ArchiveRecord`.
    pub fn archive(&self, ctx: &OpContext, document_id: &str) -> Result<ArchiveRecord, ArchiveError> {
        let _span = info_span!("archive", document_id = %document_id).entered();

        let doc = self.lifecycle.get(document_id)?;
        if doc.status == DocumentStatus::Archived {
            return Err(ArchiveError::AlreadyArchived {
                id: document_id.to_string(),
            });
        }
        if self.holds.is_protected(document_id)? {
            return Err(ArchiveError::Protected {
                id: document_id.to_string(),
            });
        }

        let archive_id = Uuid::new_v4().to_string();

        let content = match &doc.blob_key {
            Some(key) => Some(self.fetch_blob(ctx, document_id, key)?),
            None => None,
        };

        let manifest = ArchiveManifest {
            archive_id: archive_id.clone(),
            document_id: doc.id.clone(),
            content_hash: doc.content_hash.clone(),
            archived_from_status: doc.status,
            classification_confidence: doc.classification_confidence,
            extraction_confidence: doc.extraction_confidence,
            matched_job_ref: doc.matched_job_ref.clone(),
            matched_vehicle_reg: doc.matched_vehicle_reg.clone(),
            supplier: doc.supplier.clone(),
            metadata: doc.metadata.clone(),
            document_created_at: doc.created_at,
            archived_at: Utc::now(),
        };
        let manifest_bytes = serde_json::to_vec_pretty(&manifest).map_err(|e| {
            ArchiveError::Manifest {
                id: archive_id.clone(),
                reason: e.to_string(),
            }
        })?;
        let checksum = bundle::manifest_checksum(&manifest_bytes);

        self.ensure_dir(&self.scratch_dir)?;
        self.ensure_dir(&self.archive_dir)?;

        // Build in scratch, then move into place, so a crash mid-write
        // never leaves a half-written bundle in the archive directory.
        let tmp_path = self.scratch_dir.join(format!("{}.zip.partial", archive_id));
        let final_path = self.archive_dir.join(format!("{}.zip", archive_id));

        if let Err(reason) = bundle::write_bundle(&tmp_path, &manifest_bytes, content.as_deref()) {
            let _ = std::fs::remove_file(&tmp_path);
            self.audit_failure(ctx, "archive.bundle_failed", document_id, &reason);
            return Err(ArchiveError::Bundle {
                id: archive_id,
                reason,
            });
        }

        if let Err(e) = std::fs::rename(&tmp_path, &final_path) {
            let _ = std::fs::remove_file(&tmp_path);
            self.audit_failure(ctx, "archive.bundle_failed", document_id, &e.to_string());
            return Err(ArchiveError::Io {
                path: final_path,
                source: e,
            });
        }

        let record = ArchiveRecord {
            id: archive_id,
            ..ArchiveRecord::new(
                &doc.id,
                final_path.to_string_lossy().to_string(),
                &checksum,
            )
        };

        if let Err(e) = archive_repo::insert(&self.db, &record) {
            let _ = std::fs::remove_file(&final_path);
            return Err(e.into());
        }

        // The guarded transition re-checks holds under the per-document
        // lock; on failure the bundle and record are rolled back.
        if let Err(e) = self
            .lifecycle
            .transition(ctx, document_id, DocumentStatus::Archived)
        {
            let _ = archive_repo::delete(&self.db, &record.id);
            let _ = std::fs::remove_file(&final_path);
            return Err(e.into());
        }

        info!(
            document_id = %document_id,
            archive_id = %record.id,
            bundle = %sanitize::redact_path(&final_path),
            "document archived"
        );
        let _ = self.audit.append(
            &AuditEvent::new("document.archive", document_id, ctx).with_details(
                serde_json::json!({
                    "archive_id": record.id,
                    "checksum": record.checksum,
                }),
            ),
        );

        Ok(record)
    }

    /// Restores from a bundle: verifies the manifest checksum, unpacks to
    /// scratch storage, mints a NEW document in RESTORED status and flips
    /// the record with restore provenance. The original document id stays
    /// ARCHIVED forever.
    pub fn restore(
        &self,
        ctx: &OpContext,
        archive_id: &str,
    ) -> Result<(Document, ArchiveRecord), ArchiveError> {
        let _span = info_span!("restore", archive_id = %archive_id).entered();

        let record = archive_repo::find_by_id(&self.db, archive_id)?.ok_or_else(|| {
            ArchiveError::NotFound {
                id: archive_id.to_string(),
            }
        })?;
        if record.status != ArchiveStatus::Archived {
            return Err(ArchiveError::NotRestorable {
                id: archive_id.to_string(),
                status: record.status,
            });
        }

        let bundle_path = Path::new(&record.archive_location);
        let manifest_bytes = match bundle::read_manifest(bundle_path) {
            Ok(bytes) => bytes,
            Err(reason) => {
                self.audit_failure(ctx, "archive.restore_failed", archive_id, &reason);
                return Err(ArchiveError::Bundle {
                    id: archive_id.to_string(),
                    reason,
                });
            }
        };

        let actual = bundle::manifest_checksum(&manifest_bytes);
        if actual != record.checksum {
            self.audit_failure(
                ctx,
                "archive.checksum_mismatch",
                archive_id,
                &format!("expected {}, got {}", record.checksum, actual),
            );
            return Err(ArchiveError::ChecksumMismatch {
                id: archive_id.to_string(),
                expected: record.checksum,
                actual,
            });
        }

        let manifest: ArchiveManifest =
            serde_json::from_slice(&manifest_bytes).map_err(|e| ArchiveError::Manifest {
                id: archive_id.to_string(),
                reason: e.to_string(),
            })?;

        let content = match bundle::read_content(bundle_path) {
            Ok(content) => content,
            Err(reason) => {
                self.audit_failure(ctx, "archive.restore_failed", archive_id, &reason);
                return Err(ArchiveError::Bundle {
                    id: archive_id.to_string(),
                    reason,
                });
            }
        };

        // Mint the new document. Provenance lives in its metadata.
        let new_id = Uuid::new_v4().to_string();
        let restore_dir = self.scratch_dir.join(format!("restore-{}", new_id));
        self.ensure_dir(&restore_dir)?;

        let mut blob_key = None;
        if let Some(bytes) = &content {
            let content_path = restore_dir.join("content");
            std::fs::write(&content_path, bytes).map_err(|e| ArchiveError::Io {
                path: content_path.clone(),
                source: e,
            })?;

            let key = format!("restored/{}", new_id);
            if let Err(e) = self.blobs.put(&key, bytes) {
                let _ = std::fs::remove_dir_all(&restore_dir);
                self.audit_failure(ctx, "archive.restore_failed", archive_id, &e.to_string());
                return Err(e.into());
            }
            blob_key = Some(key);
        }

        let mut metadata = manifest.metadata.clone();
        if let Some(map) = metadata.as_object_mut() {
            map.insert("restored_from".to_string(), serde_json::json!(archive_id));
            map.insert(
                "original_document_id".to_string(),
                serde_json::json!(manifest.document_id),
            );
        }

        let now = Utc::now();
        let new_doc = Document {
            id: new_id,
            content_hash: manifest.content_hash.clone(),
            status: DocumentStatus::Restored,
            previous_status: None,
            classification_confidence: manifest.classification_confidence,
            extraction_confidence: manifest.extraction_confidence,
            matched_job_ref: manifest.matched_job_ref.clone(),
            matched_vehicle_reg: manifest.matched_vehicle_reg.clone(),
            supplier: manifest.supplier.clone(),
            blob_key,
            metadata,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = document_repo::insert(&self.db, &new_doc) {
            let _ = std::fs::remove_dir_all(&restore_dir);
            return Err(e.into());
        }

        let restore_location = restore_dir.to_string_lossy().to_string();
        let flipped = archive_repo::mark_restored(
            &self.db,
            &record.id,
            &restore_location,
            &ctx.actor,
            now,
        )?;
        if !flipped {
            // Raced with a concurrent restore of the same archive.
            return Err(ArchiveError::NotRestorable {
                id: archive_id.to_string(),
                status: ArchiveStatus::Restored,
            });
        }

        info!(
            archive_id = %archive_id,
            new_document_id = %new_doc.id,
            "archive restored to new document"
        );
        let _ = self.audit.append(
            &AuditEvent::new("archive.restore", archive_id, ctx).with_details(serde_json::json!({
                "new_document_id": new_doc.id,
                "original_document_id": record.original_document_id,
                "restore_location": restore_location,
            })),
        );

        let record = archive_repo::find_by_id(&self.db, archive_id)?.ok_or_else(|| {
            ArchiveError::NotFound {
                id: archive_id.to_string(),
            }
        })?;
        Ok((new_doc, record))
    }

    /// Reversible delete via the guarded PENDING_DELETE transition.
    pub fn soft_delete(&self, ctx: &OpContext, document_id: &str) -> Result<Document, ArchiveError> {
        Ok(self.lifecycle.soft_delete(ctx, document_id)?)
    }

    /// Irreversible delete. Documents not yet soft-deleted pass through
    /// PENDING_DELETE first, so the hold gate applies on every path. When
    /// configured, the backing blob is purged as well.
    pub fn hard_delete(&self, ctx: &OpContext, document_id: &str) -> Result<Document, ArchiveError> {
        let _span = info_span!("hard_delete", document_id = %document_id).entered();

        let doc = self.lifecycle.get(document_id)?;
        if doc.status != DocumentStatus::PendingDelete {
            self.lifecycle.soft_delete(ctx, document_id)?;
        }
        let deleted = self
            .lifecycle
            .transition(ctx, document_id, DocumentStatus::Deleted)?;

        if self.purge_blobs_on_hard_delete {
            if let Some(key) = &doc.blob_key {
                if let Err(e) = self.blobs.delete(key) {
                    // The document is already gone; losing the purge is
                    // reported, not rolled back.
                    warn!(
                        document_id = %document_id,
                        blob = %sanitize::redact_blob_key(key),
                        "blob purge failed after hard delete: {}", e
                    );
                    self.audit_failure(ctx, "document.blob_purge_failed", document_id, &e.to_string());
                    return Err(e.into());
                }
            }
        }

        let _ = self.audit.append(
            &AuditEvent::new("document.hard_delete", document_id, ctx).with_details(
                serde_json::json!({
                    "purged_blob": self.purge_blobs_on_hard_delete && doc.blob_key.is_some(),
                }),
            ),
        );

        Ok(deleted)
    }

    /// Brings a PENDING_DELETE document back to its captured status.
    pub fn undelete(&self, ctx: &OpContext, document_id: &str) -> Result<Document, ArchiveError> {
        Ok(self.lifecycle.undelete(ctx, document_id)?)
    }

    fn fetch_blob(
        &self,
        ctx: &OpContext,
        document_id: &str,
        key: &str,
    ) -> Result<Vec<u8>, ArchiveError> {
        match self.blobs.get(key) {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                self.audit_failure(ctx, "archive.blob_fetch_failed", document_id, &e.to_string());
                Err(e.into())
            }
        }
    }

    fn ensure_dir(&self, path: &Path) -> Result<(), ArchiveError> {
        std::fs::create_dir_all(path).map_err(|e| ArchiveError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// External I/O and consistency failures are written to the audit sink
    /// before being surfaced.
    fn audit_failure(&self, ctx: &OpContext, action: &str, entity_id: &str, reason: &str) {
        let _ = self.audit.append(
            &AuditEvent::new(action, entity_id, ctx)
                .with_details(serde_json::json!({ "error": reason })),
        );
    }
}
