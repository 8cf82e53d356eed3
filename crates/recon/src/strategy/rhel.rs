use std::sync::LazyLock;

use regex::Regex;

use super::BenchmarkStrategy;
use crate::model::{ComplianceScanResult, Row};
use crate::poam::PoamLayout;

pub(crate) static RHEL_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(RHEL-\d{2}-\d{6})\b").expect("rhel id pattern"));

/// RHEL STIG benchmark. Identifiers look like `RHEL-08-010030`.
#[derive(Debug, Clone)]
pub struct RhelStrategy {
    name: String,
}

impl RhelStrategy {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for RhelStrategy {
    fn default() -> Self {
        Self::new("RHEL 8.X")
    }
}

impl BenchmarkStrategy for RhelStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn short_name(&self) -> &str {
        "RHEL"
    }

    fn normalize_id(&self, raw: &str) -> String {
        match RHEL_ID.captures(raw) {
            Some(caps) => caps[1].to_uppercase(),
            None => raw.trim().to_string(),
        }
    }

    // Nessus rows without a compliance reference fall back to plugin ids.
    fn owns_id(&self, id: &str) -> bool {
        RHEL_ID.is_match(id) || id.trim_start().starts_with("Plugin-")
    }

    fn claims_finding(&self, row: &Row, layout: &PoamLayout) -> bool {
        RHEL_ID.is_match(&layout.weakness(row))
    }

    fn extract_finding(&self, row: &Row, layout: &PoamLayout) -> Option<ComplianceScanResult> {
        let weakness = layout.weakness(row);
        let caps = RHEL_ID.captures(&weakness)?;

        Some(ComplianceScanResult {
            compliance_id: caps[1].to_uppercase(),
            benchmark_name: self.name.clone(),
            description: format!("From POAM: {weakness}"),
            status: "Fail".into(),
            severity: String::new(),
            hostname: layout.asset(row),
            poam_id: layout.poam_id(row),
            srg_solution: layout.remediation(row),
            os_type: "RHEL".into(),
            needs_review: true,
        })
    }
}
