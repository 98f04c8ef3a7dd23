//! Document repository: CRUD plus the compare-and-swap status update the
//! lifecycle state machine relies on.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::lifecycle::{Document, DocumentStatus};

use super::{Database, DbError};

/// A raw document row from the database. Typed parsing happens in
/// `into_document` so corrupt rows surface as `DbError::Corrupt`.
#[derive(Debug, Clone)]
struct DocumentRow {
    id: String,
    content_hash: String,
    status: String,
    previous_status: Option<String>,
    classification_confidence: f64,
    extraction_confidence: f64,
    matched_job_ref: Option<String>,
    matched_vehicle_reg: Option<String>,
    supplier: Option<String>,
    blob_key: Option<String>,
    metadata: Option<String>,
    created_at: String,
    updated_at: String,
}

impl DocumentRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            content_hash: row.get("content_hash")?,
            status: row.get("status")?,
            previous_status: row.get("previous_status")?,
            classification_confidence: row.get("classification_confidence")?,
            extraction_confidence: row.get("extraction_confidence")?,
            matched_job_ref: row.get("matched_job_ref")?,
            matched_vehicle_reg: row.get("matched_vehicle_reg")?,
            supplier: row.get("supplier")?,
            blob_key: row.get("blob_key")?,
            metadata: row.get("metadata")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn into_document(self) -> Result<Document, DbError> {
        let status = parse_status(&self.id, &self.status)?;
        let previous_status = match &self.previous_status {
            Some(s) => Some(parse_status(&self.id, s)?),
            None => None,
        };
        let metadata = match &self.metadata {
            Some(text) => serde_json::from_str(text).map_err(|e| DbError::Corrupt {
                entity: "document",
                id: self.id.clone(),
                reason: format!("bad metadata JSON: {}", e),
            })?,
            None => serde_json::Value::Object(Default::default()),
        };

        Ok(Document {
            created_at: parse_timestamp(&self.id, "created_at", &self.created_at)?,
            updated_at: parse_timestamp(&self.id, "updated_at", &self.updated_at)?,
            id: self.id,
            content_hash: self.content_hash,
            status,
            previous_status,
            classification_confidence: self.classification_confidence,
            extraction_confidence: self.extraction_confidence,
            matched_job_ref: self.matched_job_ref,
            matched_vehicle_reg: self.matched_vehicle_reg,
            supplier: self.supplier,
            blob_key: self.blob_key,
            metadata,
        })
    }
}

fn parse_timestamp(id: &str, field: &str, raw: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::Corrupt {
            entity: "document",
            id: id.to_string(),
            reason: format!("bad {} timestamp '{}': {}", field, raw, e),
        })
}

fn parse_status(id: &str, raw: &str) -> Result<DocumentStatus, DbError> {
    DocumentStatus::parse(raw).ok_or_else(|| DbError::Corrupt {
        entity: "document",
        id: id.to_string(),
        reason: format!("unknown status '{}'", raw),
    })
}

/// Inserts a new document row.
pub fn insert(db: &Database, doc: &Document) -> Result<(), DbError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO documents (id, content_hash, status, previous_status,
             classification_confidence, extraction_confidence, matched_job_ref,
             matched_vehicle_reg, supplier, blob_key, metadata, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                doc.id,
                doc.content_hash,
                doc.status.as_str(),
                doc.previous_status.map(|s| s.as_str()),
                doc.classification_confidence,
                doc.extraction_confidence,
                doc.matched_job_ref,
                doc.matched_vehicle_reg,
                doc.supplier,
                doc.blob_key,
                serde_json::to_string(&doc.metadata).ok(),
                doc.created_at.to_rfc3339(),
                doc.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    })
}

/// Overwrites every mutable field except `id`, `status`, `previous_status`
/// and `created_at`. Status changes go through `update_status` only.
pub fn update_fields(db: &Database, doc: &Document) -> Result<(), DbError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE documents SET content_hash=?2, classification_confidence=?3,
             extraction_confidence=?4, matched_job_ref=?5, matched_vehicle_reg=?6,
             supplier=?7, blob_key=?8, metadata=?9, updated_at=?10
             WHERE id=?1",
            params![
                doc.id,
                doc.content_hash,
                doc.classification_confidence,
                doc.extraction_confidence,
                doc.matched_job_ref,
                doc.matched_vehicle_reg,
                doc.supplier,
                doc.blob_key,
                serde_json::to_string(&doc.metadata).ok(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    })
}

/// Compare-and-swap status update. Returns false when the document's
/// current status no longer matches `from`: the caller lost a race and
/// must re-read.
pub fn update_status(
    db: &Database,
    id: &str,
    from: DocumentStatus,
    to: DocumentStatus,
    previous_status: Option<DocumentStatus>,
) -> Result<bool, DbError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE documents SET status=?3, previous_status=?4, updated_at=?5
             WHERE id=?1 AND status=?2",
            params![
                id,
                from.as_str(),
                to.as_str(),
                previous_status.map(|s| s.as_str()),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(changed == 1)
    })
}

/// Finds a document by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<Document>, DbError> {
    let row = db.with_conn(|conn| {
        conn.query_row(
            "SELECT * FROM documents WHERE id = ?1",
            params![id],
            DocumentRow::from_row,
        )
        .optional()
        .map_err(DbError::Sqlite)
    })?;

    row.map(DocumentRow::into_document).transpose()
}

/// Lists documents in a given status, oldest first.
pub fn list_by_status(
    db: &Database,
    status: DocumentStatus,
    limit: usize,
) -> Result<Vec<Document>, DbError> {
    let rows = db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM documents WHERE status = ?1 ORDER BY created_at ASC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![status.as_str(), limit as i64], DocumentRow::from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    })?;

    rows.into_iter().map(DocumentRow::into_document).collect()
}

/// Lists every document not yet hard-deleted, oldest first. Used by the
/// retention cleanup sweep, which also hard-deletes PENDING_DELETE
/// documents whose grace window has lapsed.
pub fn list_undeleted(db: &Database, limit: usize) -> Result<Vec<Document>, DbError> {
    let rows = db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM documents WHERE status != 'DELETED'
             ORDER BY created_at ASC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], DocumentRow::from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    })?;

    rows.into_iter().map(DocumentRow::into_document).collect()
}
