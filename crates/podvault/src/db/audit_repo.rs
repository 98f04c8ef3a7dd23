//! Append-only audit event storage.

use rusqlite::{params, Row};

use crate::external::AuditEvent;

use super::{Database, DbError};

pub fn append(db: &Database, event: &AuditEvent) -> Result<(), DbError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO audit_events (action, entity_id, actor, correlation_id, timestamp, details)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                event.action,
                event.entity_id,
                event.actor,
                event.correlation_id,
                event.timestamp.to_rfc3339(),
                event.details.as_ref().map(|d| d.to_string()),
            ],
        )?;
        Ok(())
    })
}

/// A stored audit row, as written. Timestamps stay raw text here; the
/// audit log is read back for inspection, not computation.
#[derive(Debug, Clone)]
pub struct AuditRow {
    pub id: i64,
    pub action: String,
    pub entity_id: String,
    pub actor: String,
    pub correlation_id: Option<String>,
    pub timestamp: String,
    pub details: Option<String>,
}

impl AuditRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            action: row.get("action")?,
            entity_id: row.get("entity_id")?,
            actor: row.get("actor")?,
            correlation_id: row.get("correlation_id")?,
            timestamp: row.get("timestamp")?,
            details: row.get("details")?,
        })
    }
}

pub fn list_for_entity(db: &Database, entity_id: &str) -> Result<Vec<AuditRow>, DbError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM audit_events WHERE entity_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![entity_id], AuditRow::from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_append_and_list() {
        let db = Database::open_in_memory().unwrap();
        let event = AuditEvent {
            action: "document.archive".to_string(),
            entity_id: "doc-1".to_string(),
            actor: "ops".to_string(),
            correlation_id: Some("corr-1".to_string()),
            timestamp: Utc::now(),
            details: Some(serde_json::json!({"archive_id": "a-1"})),
        };
        append(&db, &event).unwrap();
        append(&db, &event).unwrap();

        let rows = list_for_entity(&db, "doc-1").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].action, "document.archive");
        assert_eq!(rows[0].correlation_id.as_deref(), Some("corr-1"));
    }
}
