//! Job directory access.

use crate::matcher::JobRecord;
use crate::similarity;

use super::{ExternalError, JobDirectory};

/// Filter for job directory lookups. Unset fields match everything.
#[derive(Debug, Default, Clone)]
pub struct JobFilter {
    pub job_ref: Option<String>,
    pub vehicle_reg: Option<String>,
    pub date: Option<String>,
}

/// In-memory job directory over a fixed job list. The candidate set for a
/// document is usually the day's jobs for its supplier, so the filter is
/// deliberately loose: normalized-equality on any provided field keeps a
/// job in.
pub struct StaticJobDirectory {
    jobs: Vec<JobRecord>,
}

impl StaticJobDirectory {
    pub fn new(jobs: Vec<JobRecord>) -> Self {
        Self { jobs }
    }
}

impl JobDirectory for StaticJobDirectory {
    fn find_jobs(&self, filter: &JobFilter) -> Result<Vec<JobRecord>, ExternalError> {
        if filter.job_ref.is_none() && filter.vehicle_reg.is_none() && filter.date.is_none() {
            return Ok(self.jobs.clone());
        }

        let wanted_ref = filter.job_ref.as_deref().map(similarity::normalize);
        let wanted_reg = filter.vehicle_reg.as_deref().map(similarity::normalize);

        Ok(self
            .jobs
            .iter()
            .filter(|job| {
                let ref_hit = wanted_ref
                    .as_deref()
                    .is_some_and(|w| similarity::normalize(&job.job_ref) == w);
                let reg_hit = wanted_reg.as_deref().is_some_and(|w| {
                    job.vehicle_reg
                        .as_deref()
                        .is_some_and(|reg| similarity::normalize(reg) == w)
                });
                ref_hit || reg_hit
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jobs() -> Vec<JobRecord> {
        vec![
            JobRecord {
                id: "j1".to_string(),
                job_ref: "AB1234".to_string(),
                vehicle_reg: Some("GV66XRO".to_string()),
                supplier: Some("acme".to_string()),
            },
            JobRecord {
                id: "j2".to_string(),
                job_ref: "CD5678".to_string(),
                vehicle_reg: None,
                supplier: Some("acme".to_string()),
            },
        ]
    }

    #[test]
    fn test_empty_filter_returns_all() {
        let dir = StaticJobDirectory::new(jobs());
        assert_eq!(dir.find_jobs(&JobFilter::default()).unwrap().len(), 2);
    }

    #[test]
    fn test_filter_by_job_ref() {
        let dir = StaticJobDirectory::new(jobs());
        let found = dir
            .find_jobs(&JobFilter {
                job_ref: Some("ab 1234".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "j1");
    }

    #[test]
    fn test_filter_by_vehicle_reg() {
        let dir = StaticJobDirectory::new(jobs());
        let found = dir
            .find_jobs(&JobFilter {
                vehicle_reg: Some("gv66xro".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "j1");
    }
}
