//! Test harness for isolated engine execution.
//!
//! `EngineHarness` wires a complete in-memory engine: temp directories for
//! the blob store, archive bundles and scratch space, an in-memory SQLite
//! database, the hold registry, lifecycle machine and archive manager.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tempfile::TempDir;

use podvault::archive::ArchiveManager;
use podvault::config::{RetentionPolicy, RoutingConfig};
use podvault::db::{audit_repo, document_repo, Database};
use podvault::external::{
    AuditSink, Classification, Classifier, DbAuditSink, ExternalError, FieldExtractor,
    FixedClassifier, FixedExtractor, FsBlobStore, StaticJobDirectory,
};
use podvault::holds::HoldRegistry;
use podvault::lifecycle::{Document, Lifecycle};
use podvault::matcher::{ExtractedFields, JobRecord};
use podvault::pipeline::{IngestContext, IngestPipeline};
use podvault::retention::RetentionEvaluator;
use podvault::routing::RoutingEngine;
use podvault::{CorrelationId, OpContext};

pub struct EngineHarness {
    pub temp: TempDir,
    pub db: Database,
    pub blobs: Arc<FsBlobStore>,
    pub audit: Arc<dyn AuditSink>,
    pub holds: Arc<HoldRegistry>,
    pub lifecycle: Arc<Lifecycle>,
    pub archive: Arc<ArchiveManager>,
}

impl EngineHarness {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("temp dir");
        let db = Database::open_in_memory().expect("in-memory db");
        let blobs = Arc::new(FsBlobStore::new(temp.path().join("blobs")));
        let audit: Arc<dyn AuditSink> = Arc::new(DbAuditSink::new(db.clone()));
        let holds = Arc::new(HoldRegistry::new(db.clone(), audit.clone()));
        let lifecycle = Arc::new(Lifecycle::new(db.clone(), holds.clone(), audit.clone()));
        let archive = Arc::new(ArchiveManager::new(
            db.clone(),
            lifecycle.clone(),
            holds.clone(),
            blobs.clone(),
            audit.clone(),
            temp.path().join("archive"),
            temp.path().join("scratch"),
            true,
        ));

        Self {
            temp,
            db,
            blobs,
            audit,
            holds,
            lifecycle,
            archive,
        }
    }

    pub fn ctx(&self, actor: &str) -> OpContext {
        OpContext {
            correlation_id: CorrelationId::new(),
            actor: actor.to_string(),
        }
    }

    /// Inserts a REVIEW document whose content lives in the blob store.
    pub fn seed_document(&self, content: &[u8]) -> Document {
        let doc = Document::new(format!("hash-{}", content.len()), None);
        let key = format!("pods/{}", doc.id);
        use podvault::external::BlobStore;
        self.blobs.put(&key, content).expect("seed blob");

        let mut doc = doc;
        doc.blob_key = Some(key);
        document_repo::insert(&self.db, &doc).expect("seed document");
        doc
    }

    /// Inserts a document without backing content, created `age_days` ago.
    pub fn seed_aged_document(&self, age_days: i64) -> Document {
        let mut doc = Document::new(format!("aged-{}", age_days), None);
        doc.created_at = Utc::now() - chrono::Duration::days(age_days);
        document_repo::insert(&self.db, &doc).expect("seed document");
        doc
    }

    pub fn retention(&self, policies: Vec<RetentionPolicy>) -> RetentionEvaluator {
        RetentionEvaluator::new(
            self.db.clone(),
            self.lifecycle.clone(),
            self.holds.clone(),
            self.archive.clone(),
            policies,
        )
    }

    /// A pipeline over fixed collaborator outputs.
    pub fn pipeline(
        &self,
        classification: Classification,
        fields: ExtractedFields,
        jobs: Vec<JobRecord>,
        routing: RoutingConfig,
    ) -> IngestPipeline {
        self.pipeline_with(
            Arc::new(FixedClassifier {
                verdict: classification,
            }),
            Arc::new(FixedExtractor { fields }),
            jobs,
            routing,
        )
    }

    pub fn pipeline_with(
        &self,
        classifier: Arc<dyn Classifier>,
        extractor: Arc<dyn FieldExtractor>,
        jobs: Vec<JobRecord>,
        routing: RoutingConfig,
    ) -> IngestPipeline {
        let router = Arc::new(
            RoutingEngine::new(routing, Duration::from_secs(60)).expect("valid routing config"),
        );
        IngestPipeline::new(
            self.db.clone(),
            classifier,
            extractor,
            Arc::new(StaticJobDirectory::new(jobs)),
            router,
            self.lifecycle.clone(),
            self.audit.clone(),
        )
    }

    /// Runs a seeded document through the given pipeline.
    pub fn ingest(
        &self,
        pipeline: &IngestPipeline,
        doc: Document,
    ) -> (podvault::IngestReport, IngestContext) {
        let ctx = IngestContext::new(
            self.ctx("ingest@system"),
            doc,
            b"image bytes".to_vec(),
            "image/jpeg",
        );
        pipeline.run(ctx)
    }

    pub fn audit_actions(&self, entity_id: &str) -> Vec<String> {
        audit_repo::list_for_entity(&self.db, entity_id)
            .expect("audit rows")
            .into_iter()
            .map(|row| row.action)
            .collect()
    }
}

/// Extractor that always fails, for degraded-pipeline tests.
pub struct FailingExtractor;

impl FieldExtractor for FailingExtractor {
    fn extract(&self, _bytes: &[u8]) -> Result<ExtractedFields, ExternalError> {
        Err(ExternalError::Collaborator {
            name: "extractor",
            reason: "OCR backend unavailable".to_string(),
        })
    }
}

/// Classifier that always fails, for halted-pipeline tests.
pub struct FailingClassifier;

impl Classifier for FailingClassifier {
    fn classify(&self, _bytes: &[u8], _mime: &str) -> Result<Classification, ExternalError> {
        Err(ExternalError::Collaborator {
            name: "classifier",
            reason: "model endpoint unreachable".to_string(),
        })
    }
}
