use crate::context::OpContext;
use crate::external::Classification;
use crate::lifecycle::Document;
use crate::matcher::{ExtractedFields, MatchResult};
use crate::routing::RoutingDecision;

/// Tagged result of one pipeline stage. Which outcomes halt the run and
/// which degrade downstream stages is the runner's per-stage policy, not
/// an implicit property of the error.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    Completed,
    Skipped { reason: String },
    Failed { error: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Classify,
    Extract,
    Match,
    Route,
}

impl Stage {
    pub const fn name(&self) -> &'static str {
        match self {
            Stage::Classify => "classify",
            Stage::Extract => "extract",
            Stage::Match => "match",
            Stage::Route => "route",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageResult {
    pub stage: Stage,
    pub outcome: StageOutcome,
}

pub struct IngestContext {
    /// Correlation context, threaded explicitly, never ambient state.
    pub op: OpContext,

    // Input
    pub document: Document,
    pub image_bytes: Vec<u8>,
    pub mime_type: String,

    // Stage 1 result
    pub classification: Option<Classification>,

    // Stage 2 result
    pub fields: Option<ExtractedFields>,

    // Stage 3 result; always Some after the match stage, degraded to a
    // typed no-match when extraction produced nothing.
    pub match_result: Option<MatchResult>,

    // Stage 4 result
    pub decision: Option<RoutingDecision>,

    pub stages: Vec<StageResult>,
}

impl IngestContext {
    pub fn new(
        op: OpContext,
        document: Document,
        image_bytes: Vec<u8>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            op,
            document,
            image_bytes,
            mime_type: mime_type.into(),
            classification: None,
            fields: None,
            match_result: None,
            decision: None,
            stages: Vec::new(),
        }
    }

    pub fn record(&mut self, stage: Stage, outcome: StageOutcome) {
        self.stages.push(StageResult { stage, outcome });
    }

    pub fn stage_outcome(&self, stage: Stage) -> Option<&StageOutcome> {
        self.stages
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| &r.outcome)
    }
}
