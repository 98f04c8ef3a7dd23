//! Narrow interfaces to the engine's opaque collaborators: the AI
//! classifier and extractor, the job directory, blob storage and the audit
//! sink. The engine consumes their outputs; it never computes confidence
//! scores or renders anything itself.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::context::OpContext;
use crate::matcher::{ExtractedFields, JobRecord};

pub mod audit;
pub mod blobstore;
pub mod jobs;

pub use audit::{DbAuditSink, NoopAuditSink};
pub use blobstore::FsBlobStore;
pub use jobs::{JobFilter, StaticJobDirectory};

/// Failures at the collaborator boundary. `Io` is transient and retryable
/// by the caller; both variants are written to the audit sink before being
/// surfaced.
#[derive(Error, Debug)]
pub enum ExternalError {
    #[error("I/O failure for '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Blob '{key}' not found")]
    MissingBlob { key: String },

    #[error("Collaborator '{name}' failed: {reason}")]
    Collaborator { name: &'static str, reason: String },

    #[error("Audit store error: {0}")]
    Store(#[from] crate::db::DbError),
}

/// Verdict from the document classifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub is_document: bool,
    pub confidence: f64,
}

pub trait Classifier: Send + Sync {
    fn classify(&self, bytes: &[u8], mime_type: &str) -> Result<Classification, ExternalError>;
}

pub trait FieldExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedFields, ExternalError>;
}

pub trait JobDirectory: Send + Sync {
    fn find_jobs(&self, filter: &JobFilter) -> Result<Vec<JobRecord>, ExternalError>;
}

/// Byte storage keyed by opaque string keys.
pub trait BlobStore: Send + Sync {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), ExternalError>;
    fn get(&self, key: &str) -> Result<Vec<u8>, ExternalError>;
    fn delete(&self, key: &str) -> Result<(), ExternalError>;
    fn exists(&self, key: &str) -> Result<bool, ExternalError>;
}

/// Append-only event log.
pub trait AuditSink: Send + Sync {
    fn append(&self, event: &AuditEvent) -> Result<(), ExternalError>;
}

#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub action: String,
    pub entity_id: String,
    pub actor: String,
    pub correlation_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub details: Option<serde_json::Value>,
}

impl AuditEvent {
    pub fn new(action: impl Into<String>, entity_id: impl Into<String>, ctx: &OpContext) -> Self {
        Self {
            action: action.into(),
            entity_id: entity_id.into(),
            actor: ctx.actor.clone(),
            correlation_id: Some(ctx.correlation_id.as_str().to_string()),
            timestamp: Utc::now(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Classifier returning a fixed verdict. Useful for consumers wiring up
/// the pipeline in tests or dry runs.
pub struct FixedClassifier {
    pub verdict: Classification,
}

impl Classifier for FixedClassifier {
    fn classify(&self, _bytes: &[u8], _mime_type: &str) -> Result<Classification, ExternalError> {
        Ok(self.verdict)
    }
}

/// Extractor returning fixed fields.
pub struct FixedExtractor {
    pub fields: ExtractedFields,
}

impl FieldExtractor for FixedExtractor {
    fn extract(&self, _bytes: &[u8]) -> Result<ExtractedFields, ExternalError> {
        Ok(self.fields.clone())
    }
}
