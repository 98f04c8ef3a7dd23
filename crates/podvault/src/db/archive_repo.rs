//! Archive record repository.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::archive::{ArchiveRecord, ArchiveStatus};

use super::{Database, DbError};

#[derive(Debug, Clone)]
struct ArchiveRow {
    id: String,
    original_document_id: String,
    archive_location: String,
    checksum: String,
    status: String,
    restore_location: Option<String>,
    restored_at: Option<String>,
    restored_by: Option<String>,
    created_at: String,
}

impl ArchiveRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            original_document_id: row.get("original_document_id")?,
            archive_location: row.get("archive_location")?,
            checksum: row.get("checksum")?,
            status: row.get("status")?,
            restore_location: row.get("restore_location")?,
            restored_at: row.get("restored_at")?,
            restored_by: row.get("restored_by")?,
            created_at: row.get("created_at")?,
        })
    }

    fn into_record(self) -> Result<ArchiveRecord, DbError> {
        let status = ArchiveStatus::parse(&self.status).ok_or_else(|| DbError::Corrupt {
            entity: "archive_record",
            id: self.id.clone(),
            reason: format!("unknown status '{}'", self.status),
        })?;

        Ok(ArchiveRecord {
            created_at: parse_timestamp(&self.id, "created_at", &self.created_at)?,
            restored_at: self
                .restored_at
                .as_deref()
                .map(|s| parse_timestamp(&self.id, "restored_at", s))
                .transpose()?,
            id: self.id,
            original_document_id: self.original_document_id,
            archive_location: self.archive_location,
            checksum: self.checksum,
            status,
            restore_location: self.restore_location,
            restored_by: self.restored_by,
        })
    }
}

fn parse_timestamp(id: &str, field: &str, raw: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::Corrupt {
            entity: "archive_record",
            id: id.to_string(),
            reason: format!("bad {} timestamp '{}': {}", field, raw, e),
        })
}

pub fn insert(db: &Database, record: &ArchiveRecord) -> Result<(), DbError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO archive_records (id, original_document_id, archive_location,
             checksum, status, restore_location, restored_at, restored_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.id,
                record.original_document_id,
                record.archive_location,
                record.checksum,
                record.status.as_str(),
                record.restore_location,
                record.restored_at.map(|t| t.to_rfc3339()),
                record.restored_by,
                record.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    })
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<ArchiveRecord>, DbError> {
    let row = db.with_conn(|conn| {
        conn.query_row(
            "SELECT * FROM archive_records WHERE id = ?1",
            params![id],
            ArchiveRow::from_row,
        )
        .optional()
        .map_err(DbError::Sqlite)
    })?;

    row.map(ArchiveRow::into_record).transpose()
}

pub fn find_by_document(db: &Database, document_id: &str) -> Result<Option<ArchiveRecord>, DbError> {
    let row = db.with_conn(|conn| {
        conn.query_row(
            "SELECT * FROM archive_records WHERE original_document_id = ?1
             ORDER BY created_at DESC LIMIT 1",
            params![document_id],
            ArchiveRow::from_row,
        )
        .optional()
        .map_err(DbError::Sqlite)
    })?;

    row.map(ArchiveRow::into_record).transpose()
}

/// Flips a record to RESTORED with restore provenance. Returns false when
/// the record was not in ARCHIVED status.
pub fn mark_restored(
    db: &Database,
    id: &str,
    restore_location: &str,
    restored_by: &str,
    restored_at: DateTime<Utc>,
) -> Result<bool, DbError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE archive_records SET status='RESTORED', restore_location=?2,
             restored_by=?3, restored_at=?4 WHERE id=?1 AND status='ARCHIVED'",
            params![id, restore_location, restored_by, restored_at.to_rfc3339()],
        )?;
        Ok(changed == 1)
    })
}

pub fn delete(db: &Database, id: &str) -> Result<(), DbError> {
    db.with_conn(|conn| {
        conn.execute("DELETE FROM archive_records WHERE id = ?1", params![id])?;
        Ok(())
    })
}
