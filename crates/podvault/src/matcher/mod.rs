//! Candidate matcher: ranks job records against fields extracted from a
//! delivery document.
//!
//! "No match" is a data condition here, never an error: an empty candidate
//! set and a below-floor best score both resolve to typed outcomes.

use serde::{Deserialize, Serialize};

use crate::similarity;

/// Normalized job-reference equality.
pub const EXACT_JOB_REF_THRESHOLD: f64 = 1.0;
/// Near-exact plate match, tolerating single-character OCR noise.
pub const EXACT_VEHICLE_REG_THRESHOLD: f64 = 0.95;
pub const FUZZY_JOB_REF_THRESHOLD: f64 = 0.90;
pub const FUZZY_VEHICLE_REG_THRESHOLD: f64 = 0.85;
/// No best score below this is ever reported as a match, regardless of tier.
pub const MATCH_SCORE_FLOOR: f64 = 0.70;

/// Read-only job reference data supplied by the job directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub job_ref: String,
    pub vehicle_reg: Option<String>,
    pub supplier: Option<String>,
}

/// Fields the extractor pulled from a document image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub supplier: Option<String>,
    pub job_ref: Option<String>,
    pub vehicle_reg: Option<String>,
    pub date: Option<String>,
    pub confidence: f64,
}

/// EXACT beats FUZZY beats NO_MATCH; within a class, job-ref tiers run
/// before plate tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchType {
    ExactJobRef,
    ExactVehicleReg,
    FuzzyJobRef,
    FuzzyVehicleReg,
    NoMatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub job_id: String,
    pub job_ref: String,
    pub score: f64,
    pub match_type: MatchType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Matched,
    NoMatch,
    NoJobsFound,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub status: MatchStatus,
    pub best_score: f64,
    pub jobs_searched: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// The winning candidate, if any hit survived the floor.
    pub best: Option<MatchCandidate>,
    /// Every hit that passed its tier threshold, best first.
    pub candidates: Vec<MatchCandidate>,
    pub summary: MatchSummary,
}

impl MatchResult {
    fn no_jobs_found() -> Self {
        Self {
            best: None,
            candidates: Vec::new(),
            summary: MatchSummary {
                status: MatchStatus::NoJobsFound,
                best_score: 0.0,
                jobs_searched: 0,
            },
        }
    }

    pub fn is_match(&self) -> bool {
        self.summary.status == MatchStatus::Matched
    }
}

/// Scores `candidate_jobs` against the extracted fields.
///
/// Exact tiers (normalized job-ref equality, near-exact plate) always run;
/// fuzzy tiers run only when neither exact tier produced a hit. Hits are
/// sorted descending by score with a deliberate tie-break: equal scores keep
/// their first-encountered-in-scan order.
pub fn find_match(fields: &ExtractedFields, candidate_jobs: &[JobRecord]) -> MatchResult {
    if candidate_jobs.is_empty() {
        return MatchResult::no_jobs_found();
    }

    let extracted_ref = fields.job_ref.as_deref().unwrap_or("");
    let extracted_reg = fields.vehicle_reg.as_deref().unwrap_or("");

    let mut hits: Vec<MatchCandidate> = Vec::new();

    scan_tier(&mut hits, candidate_jobs, MatchType::ExactJobRef, |job| {
        score_job_ref(extracted_ref, job, EXACT_JOB_REF_THRESHOLD)
    });
    scan_tier(&mut hits, candidate_jobs, MatchType::ExactVehicleReg, |job| {
        score_vehicle_reg(extracted_reg, job, EXACT_VEHICLE_REG_THRESHOLD)
    });

    if hits.is_empty() {
        scan_tier(&mut hits, candidate_jobs, MatchType::FuzzyJobRef, |job| {
            score_job_ref(extracted_ref, job, FUZZY_JOB_REF_THRESHOLD)
        });
        scan_tier(&mut hits, candidate_jobs, MatchType::FuzzyVehicleReg, |job| {
            score_vehicle_reg(extracted_reg, job, FUZZY_VEHICLE_REG_THRESHOLD)
        });
    }

    // Stable sort: equal scores keep scan order.
    hits.sort_by(|x, y| y.score.partial_cmp(&x.score).unwrap_or(std::cmp::Ordering::Equal));

    let best_score = hits.first().map(|c| c.score).unwrap_or(0.0);
    let jobs_searched = candidate_jobs.len();

    if hits.is_empty() || best_score < MATCH_SCORE_FLOOR {
        return MatchResult {
            best: None,
            candidates: hits,
            summary: MatchSummary {
                status: MatchStatus::NoMatch,
                best_score,
                jobs_searched,
            },
        };
    }

    MatchResult {
        best: hits.first().cloned(),
        candidates: hits,
        summary: MatchSummary {
            status: MatchStatus::Matched,
            best_score,
            jobs_searched,
        },
    }
}

fn scan_tier<F>(
    hits: &mut Vec<MatchCandidate>,
    jobs: &[JobRecord],
    match_type: MatchType,
    score_fn: F,
) where
    F: Fn(&JobRecord) -> f64,
{
    for job in jobs {
        let score = score_fn(job);
        if score > 0.0 {
            hits.push(MatchCandidate {
                job_id: job.id.clone(),
                job_ref: job.job_ref.clone(),
                score,
                match_type,
            });
        }
    }
}

fn score_job_ref(extracted: &str, job: &JobRecord, threshold: f64) -> f64 {
    similarity::fuzzy_match(extracted, &job.job_ref, threshold)
}

fn score_vehicle_reg(extracted: &str, job: &JobRecord, threshold: f64) -> f64 {
    match &job.vehicle_reg {
        Some(reg) => similarity::fuzzy_match(extracted, reg, threshold),
        None => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: &str, job_ref: &str, reg: Option<&str>) -> JobRecord {
        JobRecord {
            id: id.to_string(),
            job_ref: job_ref.to_string(),
            vehicle_reg: reg.map(str::to_string),
            supplier: None,
        }
    }

    fn fields(job_ref: Option<&str>, reg: Option<&str>) -> ExtractedFields {
        ExtractedFields {
            job_ref: job_ref.map(str::to_string),
            vehicle_reg: reg.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_candidates_is_no_jobs_found() {
        let result = find_match(&fields(Some("AB1234"), None), &[]);
        assert_eq!(result.summary.status, MatchStatus::NoJobsFound);
        assert_eq!(result.summary.jobs_searched, 0);
        assert!(result.best.is_none());
    }

    #[test]
    fn test_exact_job_ref_match() {
        let jobs = vec![job("j1", "AB1234", None)];
        let result = find_match(&fields(Some("AB1234"), None), &jobs);

        let best = result.best.expect("exact match");
        assert_eq!(best.match_type, MatchType::ExactJobRef);
        assert_eq!(best.score, 1.0);
        assert_eq!(best.job_id, "j1");
        assert_eq!(result.summary.status, MatchStatus::Matched);
    }

    #[test]
    fn test_exact_match_ignores_case_and_separators() {
        let jobs = vec![job("j1", "AB-1234", None)];
        let result = find_match(&fields(Some("ab 1234"), None), &jobs);
        assert_eq!(result.best.unwrap().match_type, MatchType::ExactJobRef);
    }

    #[test]
    fn test_fuzzy_job_ref_one_edit_off() {
        let jobs = vec![job("j1", "AB1234", None)];
        let result = find_match(&fields(Some("AB1235"), None), &jobs);

        let best = result.best.expect("fuzzy match");
        assert_eq!(best.match_type, MatchType::FuzzyJobRef);
        assert!(best.score >= 0.90, "got {}", best.score);
    }

    #[test]
    fn test_exact_plate_match() {
        let jobs = vec![job("j1", "XX0000", Some("GV66XRO"))];
        let result = find_match(&fields(None, Some("GV66 XRO")), &jobs);

        let best = result.best.expect("plate match");
        assert_eq!(best.match_type, MatchType::ExactVehicleReg);
        assert!(best.score >= 0.95);
    }

    #[test]
    fn test_fuzzy_tiers_skipped_when_exact_hits() {
        let jobs = vec![
            job("j1", "AB1234", None),
            // Would also hit the fuzzy tier, but exact already hit.
            job("j2", "AB1235", None),
        ];
        let result = find_match(&fields(Some("AB1234"), None), &jobs);

        assert!(result
            .candidates
            .iter()
            .all(|c| matches!(c.match_type, MatchType::ExactJobRef | MatchType::ExactVehicleReg)));
    }

    #[test]
    fn test_unrelated_ref_is_no_match() {
        let jobs = vec![job("j1", "ZZ9999", None)];
        let result = find_match(&fields(Some("AB1234"), None), &jobs);

        assert_eq!(result.summary.status, MatchStatus::NoMatch);
        assert!(result.best.is_none());
        assert!(result.candidates.is_empty());
    }

    #[test]
    fn test_missing_fields_is_no_match() {
        let jobs = vec![job("j1", "AB1234", Some("GV66XRO"))];
        let result = find_match(&fields(None, None), &jobs);
        assert_eq!(result.summary.status, MatchStatus::NoMatch);
    }

    #[test]
    fn test_best_is_highest_score() {
        let jobs = vec![
            job("far", "AB1299", None),
            job("near", "AB1235", None),
        ];
        let result = find_match(&fields(Some("AB1234"), None), &jobs);

        let best = result.best.expect("fuzzy match");
        assert_eq!(best.job_id, "near");
        assert!(result.candidates.len() >= 1);
    }

    #[test]
    fn test_tie_break_keeps_scan_order() {
        // Two jobs whose refs normalize identically: both score 1.0,
        // and the first-encountered job must win.
        let jobs = vec![job("first", "AB-1234", None), job("second", "ab1234", None)];
        let result = find_match(&fields(Some("AB1234"), None), &jobs);

        assert_eq!(result.best.unwrap().job_id, "first");
        assert_eq!(result.candidates[0].job_id, "first");
        assert_eq!(result.candidates[1].job_id, "second");
    }

    #[test]
    fn test_summary_counts_jobs_searched() {
        let jobs = vec![
            job("j1", "AB1234", None),
            job("j2", "CD5678", None),
            job("j3", "EF9012", None),
        ];
        let result = find_match(&fields(Some("AB1234"), None), &jobs);
        assert_eq!(result.summary.jobs_searched, 3);
    }

    #[test]
    fn test_job_can_hit_on_both_ref_and_plate() {
        let jobs = vec![job("j1", "AB1234", Some("GV66XRO"))];
        let result = find_match(&fields(Some("AB1234"), Some("GV66XRO")), &jobs);

        assert_eq!(result.candidates.len(), 2);
        // Job-ref tier scanned first, so it leads on the 1.0 tie.
        assert_eq!(result.best.unwrap().match_type, MatchType::ExactJobRef);
    }
}
