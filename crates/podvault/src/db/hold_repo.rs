//! Legal hold repository.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::holds::{HoldStatus, LegalHold};

use super::{Database, DbError};

#[derive(Debug, Clone)]
struct HoldRow {
    id: String,
    document_id: String,
    status: String,
    reason: String,
    created_by: String,
    created_at: String,
    expires_at: Option<String>,
    released_by: Option<String>,
    released_at: Option<String>,
    release_reason: Option<String>,
}

impl HoldRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            document_id: row.get("document_id")?,
            status: row.get("status")?,
            reason: row.get("reason")?,
            created_by: row.get("created_by")?,
            created_at: row.get("created_at")?,
            expires_at: row.get("expires_at")?,
            released_by: row.get("released_by")?,
            released_at: row.get("released_at")?,
            release_reason: row.get("release_reason")?,
        })
    }

    fn into_hold(self) -> Result<LegalHold, DbError> {
        let status = HoldStatus::parse(&self.status).ok_or_else(|| DbError::Corrupt {
            entity: "legal_hold",
            id: self.id.clone(),
            reason: format!("unknown status '{}'", self.status),
        })?;

        Ok(LegalHold {
            created_at: parse_timestamp(&self.id, "created_at", &self.created_at)?,
            expires_at: parse_optional(&self.id, "expires_at", self.expires_at.as_deref())?,
            released_at: parse_optional(&self.id, "released_at", self.released_at.as_deref())?,
            id: self.id,
            document_id: self.document_id,
            status,
            reason: self.reason,
            created_by: self.created_by,
            released_by: self.released_by,
            release_reason: self.release_reason,
        })
    }
}

fn parse_timestamp(id: &str, field: &str, raw: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::Corrupt {
            entity: "legal_hold",
            id: id.to_string(),
            reason: format!("bad {} timestamp '{}': {}", field, raw, e),
        })
}

fn parse_optional(
    id: &str,
    field: &str,
    raw: Option<&str>,
) -> Result<Option<DateTime<Utc>>, DbError> {
    raw.map(|s| parse_timestamp(id, field, s)).transpose()
}

pub fn insert(db: &Database, hold: &LegalHold) -> Result<(), DbError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO legal_holds (id, document_id, status, reason, created_by,
             created_at, expires_at, released_by, released_at, release_reason)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                hold.id,
                hold.document_id,
                hold.status.as_str(),
                hold.reason,
                hold.created_by,
                hold.created_at.to_rfc3339(),
                hold.expires_at.map(|t| t.to_rfc3339()),
                hold.released_by,
                hold.released_at.map(|t| t.to_rfc3339()),
                hold.release_reason,
            ],
        )?;
        Ok(())
    })
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<LegalHold>, DbError> {
    let row = db.with_conn(|conn| {
        conn.query_row(
            "SELECT * FROM legal_holds WHERE id = ?1",
            params![id],
            HoldRow::from_row,
        )
        .optional()
        .map_err(DbError::Sqlite)
    })?;

    row.map(HoldRow::into_hold).transpose()
}

/// Holds stored as ACTIVE for a document, oldest first. Passive expiry
/// means some of these may already be past their `expires_at`.
pub fn find_active_by_document(db: &Database, document_id: &str) -> Result<Vec<LegalHold>, DbError> {
    let rows = db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM legal_holds WHERE document_id = ?1 AND status = 'ACTIVE'
             ORDER BY created_at ASC",
        )?;
        let rows = stmt.query_map(params![document_id], HoldRow::from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    })?;

    rows.into_iter().map(HoldRow::into_hold).collect()
}

/// Flips a hold to RELEASED with release metadata. Returns false when the
/// hold was not ACTIVE.
pub fn mark_released(
    db: &Database,
    hold_id: &str,
    released_by: &str,
    released_at: DateTime<Utc>,
    release_reason: &str,
) -> Result<bool, DbError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE legal_holds SET status='RELEASED', released_by=?2, released_at=?3,
             release_reason=?4 WHERE id=?1 AND status='ACTIVE'",
            params![hold_id, released_by, released_at.to_rfc3339(), release_reason],
        )?;
        Ok(changed == 1)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_find_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let hold = LegalHold::new("doc-1", "litigation", "legal@example.com", None);
        insert(&db, &hold).unwrap();

        let loaded = find_by_id(&db, &hold.id).unwrap().unwrap();
        assert_eq!(loaded.document_id, "doc-1");
        assert_eq!(loaded.status, HoldStatus::Active);
        assert!(loaded.expires_at.is_none());
    }

    #[test]
    fn test_mark_released_only_from_active() {
        let db = Database::open_in_memory().unwrap();
        let hold = LegalHold::new("doc-1", "litigation", "legal@example.com", None);
        insert(&db, &hold).unwrap();

        assert!(mark_released(&db, &hold.id, "legal@example.com", Utc::now(), "resolved").unwrap());
        // Second release is a no-op.
        assert!(!mark_released(&db, &hold.id, "legal@example.com", Utc::now(), "again").unwrap());

        let loaded = find_by_id(&db, &hold.id).unwrap().unwrap();
        assert_eq!(loaded.status, HoldStatus::Released);
        assert_eq!(loaded.release_reason.as_deref(), Some("resolved"));
    }

    #[test]
    fn test_find_active_filters_released() {
        let db = Database::open_in_memory().unwrap();
        let hold = LegalHold::new("doc-1", "litigation", "legal@example.com", None);
        insert(&db, &hold).unwrap();
        mark_released(&db, &hold.id, "legal@example.com", Utc::now(), "resolved").unwrap();

        assert!(find_active_by_document(&db, "doc-1").unwrap().is_empty());
    }
}
