use std::collections::{HashMap, HashSet};

use crate::model::{ComparisonResult, ComplianceItem, ComplianceScanResult, MatchedRecord};
use crate::warning::{Warning, Warnings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompareOptions {
    /// Also report approved items no finding referenced.
    pub include_unmatched_items: bool,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            include_unmatched_items: true,
        }
    }
}

/// Join key: trimmed and case-folded.
pub fn join_key(compliance_id: &str) -> String {
    compliance_id.trim().to_lowercase()
}

/// Join one benchmark's approved items against its findings.
///
/// Every finding lands in exactly one of `matched` or `unmatched_findings`.
/// When several items share a key the first one is used and each later one
/// is reported as a duplicate.
pub fn compare(
    benchmark: &str,
    items: &[ComplianceItem],
    findings: &[ComplianceScanResult],
    options: &CompareOptions,
    warnings: &mut Warnings,
) -> ComparisonResult {
    let mut lookup: HashMap<String, &ComplianceItem> = HashMap::with_capacity(items.len());
    for item in items {
        let key = join_key(&item.compliance_id);
        if lookup.contains_key(&key) {
            warnings.push(Warning::DuplicateKey {
                benchmark: benchmark.to_string(),
                compliance_id: item.compliance_id.trim().to_string(),
            });
            continue;
        }
        lookup.insert(key, item);
    }

    let mut referenced: HashSet<String> = HashSet::new();
    let mut matched = Vec::new();
    let mut unmatched_findings = Vec::new();

    for finding in findings {
        let key = join_key(&finding.compliance_id);
        match lookup.get(&key) {
            Some(item) if !key.is_empty() => {
                matched.push(MatchedRecord {
                    item: (*item).clone(),
                    finding: finding.clone(),
                });
                referenced.insert(key);
            }
            _ => unmatched_findings.push(finding.clone()),
        }
    }

    let unmatched_items = if options.include_unmatched_items {
        let mut seen = HashSet::new();
        items
            .iter()
            .filter(|i| {
                let key = join_key(&i.compliance_id);
                !referenced.contains(&key) && seen.insert(key)
            })
            .cloned()
            .collect()
    } else {
        Vec::new()
    };

    log::info!(
        "{benchmark}: {} finding(s), {} matched, {} missing from approved items",
        findings.len(),
        matched.len(),
        unmatched_findings.len()
    );

    ComparisonResult {
        benchmark: benchmark.to_string(),
        matched,
        unmatched_findings,
        unmatched_items,
        unmatched_items_computed: options.include_unmatched_items,
    }
}
