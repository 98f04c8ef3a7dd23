use std::sync::Arc;

use tracing::{info, info_span, warn};

use crate::context::OpContext;
use crate::db::{document_repo, Database};
use crate::external::{
    AuditEvent, AuditSink, Classifier, FieldExtractor, JobDirectory, JobFilter,
};
use crate::lifecycle::{Document, DocumentStatus, Lifecycle};
use crate::matcher::{self, MatchResult, MatchStatus, MatchSummary};
use crate::routing::{NextAction, RoutingDecision, RoutingEngine};
use crate::similarity;

use super::context::{IngestContext, Stage, StageOutcome};
use super::error::PipelineError;

/// Outcome of running one document through the ingestion pipeline.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub document_id: String,
    pub success: bool,
    pub final_status: DocumentStatus,
    pub decision: Option<RoutingDecision>,
    pub error: Option<String>,
}

impl IngestReport {
    fn failure(document: &Document, error: String) -> Self {
        Self {
            document_id: document.id.clone(),
            success: false,
            final_status: document.status,
            decision: None,
            error: Some(error),
        }
    }
}

/// The ingestion pipeline: classify → extract → match → route.
///
/// Per-stage failure policy, made explicit:
/// - classify: a collaborator error HALTS the run (the document stays in
///   REVIEW for a retry); a non-document verdict short-circuits to
///   QUARANTINE.
/// - extract: failure DEGRADES; matching is skipped and the decision
///   table sees a typed no-match.
/// - match: never fails; empty inputs and below-floor scores are data
///   conditions.
/// - route: always runs on a document that survived classification.
pub struct IngestPipeline {
    db: Database,
    classifier: Arc<dyn Classifier>,
    extractor: Arc<dyn FieldExtractor>,
    jobs: Arc<dyn JobDirectory>,
    router: Arc<RoutingEngine>,
    lifecycle: Arc<Lifecycle>,
    audit: Arc<dyn AuditSink>,
}

impl IngestPipeline {
    pub fn new(
        db: Database,
        classifier: Arc<dyn Classifier>,
        extractor: Arc<dyn FieldExtractor>,
        jobs: Arc<dyn JobDirectory>,
        router: Arc<RoutingEngine>,
        lifecycle: Arc<Lifecycle>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            db,
            classifier,
            extractor,
            jobs,
            router,
            lifecycle,
            audit,
        }
    }

    /// Runs the full pipeline for a single document.
    /// Returns an (IngestReport, IngestContext) pair.
    pub fn run(&self, mut ctx: IngestContext) -> (IngestReport, IngestContext) {
        let _pipeline_span = info_span!("ingest",
            document_id = %ctx.document.id,
            correlation_id = %ctx.op.correlation_id,
            mime_type = %ctx.mime_type,
        )
        .entered();

        // Stage 1: classify
        {
            let _stage = info_span!("classify").entered();
            match self.step_classify(&mut ctx) {
                Ok(true) => ctx.record(Stage::Classify, StageOutcome::Completed),
                Ok(false) => {
                    // Not a delivery document: quarantine and stop.
                    ctx.record(Stage::Classify, StageOutcome::Completed);
                    ctx.record(
                        Stage::Extract,
                        StageOutcome::Skipped {
                            reason: "classifier verdict: not a document".to_string(),
                        },
                    );
                    ctx.record(
                        Stage::Match,
                        StageOutcome::Skipped {
                            reason: "classifier verdict: not a document".to_string(),
                        },
                    );
                    ctx.record(
                        Stage::Route,
                        StageOutcome::Skipped {
                            reason: "classifier verdict: not a document".to_string(),
                        },
                    );
                    return self.finish_quarantined(ctx);
                }
                Err(e) => {
                    let error = e.to_string();
                    ctx.record(Stage::Classify, StageOutcome::Failed { error: error.clone() });
                    let report = IngestReport::failure(&ctx.document, error);
                    return (report, ctx);
                }
            }
        }

        // Stage 2: extract
        {
            let _stage = info_span!("extract").entered();
            match self.step_extract(&mut ctx) {
                Ok(()) => ctx.record(Stage::Extract, StageOutcome::Completed),
                Err(e) => {
                    // Degrade: routing will see a typed no-match.
                    warn!(document_id = %ctx.document.id, "extraction failed: {}", e);
                    ctx.record(Stage::Extract, StageOutcome::Failed { error: e.to_string() });
                }
            }
        }

        // Stage 3: match
        {
            let _stage = info_span!("match_jobs").entered();
            match self.step_match(&mut ctx) {
                Ok(()) => ctx.record(Stage::Match, StageOutcome::Completed),
                Err(reason) => ctx.record(Stage::Match, StageOutcome::Skipped { reason }),
            }
        }

        // Stage 4: route and apply
        {
            let _stage = info_span!("route").entered();
            if let Err(e) = self.step_route(&mut ctx) {
                let error = e.to_string();
                ctx.record(Stage::Route, StageOutcome::Failed { error: error.clone() });
                let report = IngestReport::failure(&ctx.document, error);
                return (report, ctx);
            }
            ctx.record(Stage::Route, StageOutcome::Completed);
        }

        let decision = ctx.decision.clone().expect("route stage completed");
        info!(
            document_id = %ctx.document.id,
            decision = ?decision.decision,
            reason = ?decision.reason,
            "document ingested"
        );
        let _ = self.audit.append(
            &AuditEvent::new("document.ingest", &ctx.document.id, &ctx.op).with_details(
                serde_json::json!({
                    "decision": decision.decision,
                    "reason": decision.reason,
                    "overall_confidence": decision.overall_confidence,
                    "final_status": ctx.document.status.as_str(),
                }),
            ),
        );

        let report = IngestReport {
            document_id: ctx.document.id.clone(),
            success: true,
            final_status: ctx.document.status,
            decision: Some(decision),
            error: None,
        };
        (report, ctx)
    }

    /// Returns Ok(true) for a genuine document, Ok(false) for a
    /// non-document verdict.
    fn step_classify(&self, ctx: &mut IngestContext) -> Result<bool, PipelineError> {
        let classification = self
            .classifier
            .classify(&ctx.image_bytes, &ctx.mime_type)?;

        ctx.document.classification_confidence = classification.confidence;
        document_repo::update_fields(&self.db, &ctx.document)?;
        ctx.classification = Some(classification);
        Ok(classification.is_document)
    }

    fn step_extract(&self, ctx: &mut IngestContext) -> Result<(), PipelineError> {
        let fields = self.extractor.extract(&ctx.image_bytes)?;

        ctx.document.extraction_confidence = fields.confidence;
        if ctx.document.supplier.is_none() {
            ctx.document.supplier = fields.supplier.clone();
        }
        document_repo::update_fields(&self.db, &ctx.document)?;
        ctx.fields = Some(fields);
        Ok(())
    }

    /// Errors here are stage-skip reasons, not failures: the match result
    /// degrades to a typed no-match either way.
    fn step_match(&self, ctx: &mut IngestContext) -> Result<(), String> {
        let Some(fields) = ctx.fields.clone() else {
            ctx.match_result = Some(no_match_result());
            return Err("no extracted fields".to_string());
        };

        let filter = JobFilter {
            job_ref: fields.job_ref.clone(),
            vehicle_reg: fields.vehicle_reg.clone(),
            date: fields.date.clone(),
        };
        let candidates = match self.jobs.find_jobs(&filter) {
            Ok(candidates) => candidates,
            Err(e) => {
                ctx.match_result = Some(no_match_result());
                return Err(format!("job directory unavailable: {}", e));
            }
        };

        let result = matcher::find_match(&fields, &candidates);
        if let Some(best) = &result.best {
            ctx.document.matched_job_ref = Some(best.job_ref.clone());
            ctx.document.matched_vehicle_reg = fields
                .vehicle_reg
                .as_deref()
                .and_then(similarity::parse_plate);
        }
        ctx.match_result = Some(result);
        Ok(())
    }

    fn step_route(&self, ctx: &mut IngestContext) -> Result<(), PipelineError> {
        let match_result = ctx
            .match_result
            .get_or_insert_with(no_match_result)
            .clone();

        let decision = self.router.decide(&ctx.document, &match_result);

        match decision.next_action {
            NextAction::ReadyForExport => {
                ctx.document = self.lifecycle.mark_out(&ctx.op, &ctx.document.id)?;
            }
            NextAction::Review => {
                // Stays in REVIEW for a human.
                document_repo::update_fields(&self.db, &ctx.document)?;
            }
            NextAction::Rejected => {
                ctx.document = self.lifecycle.quarantine(&ctx.op, &ctx.document.id)?;
            }
        }

        ctx.decision = Some(decision);
        Ok(())
    }

    fn finish_quarantined(&self, mut ctx: IngestContext) -> (IngestReport, IngestContext) {
        match self.lifecycle.quarantine(&ctx.op, &ctx.document.id) {
            Ok(doc) => {
                ctx.document = doc;
                let _ = self.audit.append(
                    &AuditEvent::new("document.quarantine", &ctx.document.id, &ctx.op)
                        .with_details(serde_json::json!({
                            "reason": "classifier verdict: not a document",
                        })),
                );
                let report = IngestReport {
                    document_id: ctx.document.id.clone(),
                    success: true,
                    final_status: ctx.document.status,
                    decision: None,
                    error: None,
                };
                (report, ctx)
            }
            Err(e) => {
                let report = IngestReport::failure(&ctx.document, e.to_string());
                (report, ctx)
            }
        }
    }

    /// Operator override: routes the document out regardless of the
    /// decision table, tagged with the override reason for audit.
    pub fn force_send(
        &self,
        ctx: &OpContext,
        document_id: &str,
        override_reason: &str,
    ) -> Result<(Document, RoutingDecision), PipelineError> {
        let doc = self.lifecycle.mark_out(ctx, document_id)?;
        let decision = self.router.force_send(&doc, override_reason);

        let _ = self.audit.append(
            &AuditEvent::new("document.force_send", document_id, ctx).with_details(
                serde_json::json!({
                    "override_reason": override_reason,
                }),
            ),
        );
        Ok((doc, decision))
    }

    /// Operator rejection: quarantines the document.
    pub fn reject(
        &self,
        ctx: &OpContext,
        document_id: &str,
        reason: &str,
    ) -> Result<(Document, RoutingDecision), PipelineError> {
        let doc = self.lifecycle.quarantine(ctx, document_id)?;
        let decision = self.router.reject(reason);

        let _ = self.audit.append(
            &AuditEvent::new("document.reject", document_id, ctx)
                .with_details(serde_json::json!({ "reason": reason })),
        );
        Ok((doc, decision))
    }
}

fn no_match_result() -> MatchResult {
    MatchResult {
        best: None,
        candidates: Vec::new(),
        summary: MatchSummary {
            status: MatchStatus::NoMatch,
            best_score: 0.0,
            jobs_searched: 0,
        },
    }
}
