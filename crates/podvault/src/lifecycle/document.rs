use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::DocumentStatus;

/// A delivery document under lifecycle management.
///
/// Created on ingestion, mutated only through the lifecycle state machine,
/// never hard-deleted except by the archive manager's hard-delete path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content_hash: String,
    pub status: DocumentStatus,
    /// Status captured at the moment of soft-delete; undelete restores
    /// this, not a fixed default.
    pub previous_status: Option<DocumentStatus>,
    pub classification_confidence: f64,
    pub extraction_confidence: f64,
    pub matched_job_ref: Option<String>,
    pub matched_vehicle_reg: Option<String>,
    pub supplier: Option<String>,
    /// Key of the original content in the blob store, if retained.
    pub blob_key: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// A freshly ingested document in the initial REVIEW status.
    pub fn new(content_hash: impl Into<String>, blob_key: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            content_hash: content_hash.into(),
            status: DocumentStatus::Review,
            previous_status: None,
            classification_confidence: 0.0,
            extraction_confidence: 0.0,
            matched_job_ref: None,
            matched_vehicle_reg: None,
            supplier: None,
            blob_key,
            metadata: serde_json::Value::Object(Default::default()),
            created_at: now,
            updated_at: now,
        }
    }

    /// Entity type used for retention policy selection.
    pub fn entity_type(&self) -> &'static str {
        if self.status == DocumentStatus::Archived {
            "archive"
        } else {
            "document"
        }
    }
}
