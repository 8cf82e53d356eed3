use serde::Serialize;

use crate::categorize::{Categorized, Disposition};
use crate::model::ComparisonResult;

/// Per-benchmark counts shown on the report's summary sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BenchmarkSummary {
    pub total_findings: usize,
    pub matched: usize,
    pub approved: usize,
    pub under_review: usize,
    pub should_fix: usize,
    pub unassessed: usize,
    pub missing_from_scm: usize,
    pub scm_only: usize,
}

/// Compute summary statistics from a comparison and its buckets.
pub fn compute_summary(comparison: &ComparisonResult, buckets: &Categorized) -> BenchmarkSummary {
    let count = |d: Disposition| buckets.get(&d).map_or(0, Vec::len);

    BenchmarkSummary {
        total_findings: comparison.matched.len() + comparison.unmatched_findings.len(),
        matched: comparison.matched.len(),
        approved: count(Disposition::Approved),
        under_review: count(Disposition::UnderReview),
        should_fix: count(Disposition::ShouldFix),
        unassessed: count(Disposition::Unassessed),
        missing_from_scm: comparison.unmatched_findings.len(),
        scm_only: comparison.unmatched_items.len(),
    }
}

impl std::ops::AddAssign<&BenchmarkSummary> for BenchmarkSummary {
    fn add_assign(&mut self, other: &BenchmarkSummary) {
        self.total_findings += other.total_findings;
        self.matched += other.matched;
        self.approved += other.approved;
        self.under_review += other.under_review;
        self.should_fix += other.should_fix;
        self.unassessed += other.unassessed;
        self.missing_from_scm += other.missing_from_scm;
        self.scm_only += other.scm_only;
    }
}
