use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::model::{ComplianceItem, MatchedRecord};

/// Disposition bucket of a matched record. Variant order is rule priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Disposition {
    #[serde(rename = "Approved")]
    Approved,
    #[serde(rename = "Should Fix")]
    ShouldFix,
    #[serde(rename = "Under Review")]
    UnderReview,
    #[serde(rename = "Un-assessed")]
    Unassessed,
}

impl Disposition {
    pub const ALL: [Disposition; 4] = [
        Disposition::Approved,
        Disposition::ShouldFix,
        Disposition::UnderReview,
        Disposition::Unassessed,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Approved => "Approved",
            Self::ShouldFix => "Should Fix",
            Self::UnderReview => "Under Review",
            Self::Unassessed => "Un-assessed",
        }
    }

    /// Suffix for per-benchmark report sheet names.
    pub fn sheet_suffix(&self) -> &'static str {
        match self {
            Self::Approved => "Approved",
            Self::ShouldFix => "Should_Fix",
            Self::UnderReview => "Under_Review",
            Self::Unassessed => "Un-assessed",
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Approval vocabulary, whole words only ("Bypass" is not "pass").
static APPROVAL_TERMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:approved?|accept\w*|compliant|pass(?:ed|es)?)\b").expect("approval pattern")
});
const NEGATIONS: &[&str] = &["not ", "non-", "non ", "reject", "denied", "unapproved"];

/// Whether a deviation status records formal approval.
pub fn is_formally_approved(status: &str) -> bool {
    let status = status.trim().to_lowercase();
    if status.is_empty() || NEGATIONS.iter().any(|n| status.contains(n)) {
        return false;
    }
    status == "a" || APPROVAL_TERMS.is_match(&status)
}

fn is_under_review(status: &str) -> bool {
    let status = status.to_lowercase();
    status.contains("review") || status.contains("pending")
}

/// First matching rule wins: approval without a fix flag, then the fix flag,
/// then review states, then everything else.
pub fn classify(item: &ComplianceItem) -> Disposition {
    if !item.should_fix && is_formally_approved(&item.deviation_status) {
        Disposition::Approved
    } else if item.should_fix {
        Disposition::ShouldFix
    } else if is_under_review(&item.deviation_status) {
        Disposition::UnderReview
    } else {
        Disposition::Unassessed
    }
}

/// Matched records per bucket, in input order. Every bucket is present.
pub type Categorized = BTreeMap<Disposition, Vec<MatchedRecord>>;

pub fn categorize(matched: &[MatchedRecord]) -> Categorized {
    let mut buckets: Categorized = Disposition::ALL.iter().map(|d| (*d, Vec::new())).collect();
    for record in matched {
        buckets
            .entry(classify(&record.item))
            .or_default()
            .push(record.clone());
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ComplianceScanResult;

    fn item(status: &str, should_fix: bool) -> ComplianceItem {
        ComplianceItem {
            compliance_id: "V-1".into(),
            deviation_status: status.into(),
            should_fix,
            ..Default::default()
        }
    }

    #[test]
    fn rule_priority() {
        assert_eq!(classify(&item("Approved", false)), Disposition::Approved);
        assert_eq!(classify(&item("Approved", true)), Disposition::ShouldFix);
        assert_eq!(classify(&item("", true)), Disposition::ShouldFix);
        assert_eq!(classify(&item("Pending Review", false)), Disposition::UnderReview);
        assert_eq!(classify(&item("In review", false)), Disposition::UnderReview);
        assert_eq!(classify(&item("", false)), Disposition::Unassessed);
        assert_eq!(classify(&item("Draft", false)), Disposition::Unassessed);
    }

    #[test]
    fn approval_vocabulary() {
        for s in ["Approved", "ACCEPTED", "Risk Accepted", "Compliant", "Pass", "Passed", "a", " A "] {
            assert!(is_formally_approved(s), "{s}");
        }
        for s in [
            "Not Approved",
            "Rejected",
            "Denied",
            "Non-Compliant",
            "Unapproved",
            "Draft",
            "",
            "Bypass requested",
            "Passive",
            "Compass review",
        ] {
            assert!(!is_formally_approved(s), "{s}");
        }
    }

    #[test]
    fn every_bucket_present_and_total() {
        let matched: Vec<MatchedRecord> = [("Approved", false), ("Approved", true), ("", false)]
            .iter()
            .map(|(s, f)| MatchedRecord {
                item: item(s, *f),
                finding: ComplianceScanResult::default(),
            })
            .collect();

        let buckets = categorize(&matched);
        assert_eq!(buckets.len(), 4);
        assert_eq!(buckets[&Disposition::Approved].len(), 1);
        assert_eq!(buckets[&Disposition::ShouldFix].len(), 1);
        assert_eq!(buckets[&Disposition::UnderReview].len(), 0);
        assert_eq!(buckets[&Disposition::Unassessed].len(), 1);
        assert_eq!(buckets.values().map(Vec::len).sum::<usize>(), matched.len());
    }

    #[test]
    fn bucket_keys_serialize_as_labels() {
        let json = serde_json::to_value(categorize(&[])).unwrap();
        assert!(json.get("Should Fix").is_some());
        assert!(json.get("Un-assessed").is_some());
    }
}
