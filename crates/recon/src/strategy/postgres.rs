use std::sync::LazyLock;

use regex::Regex;

use super::BenchmarkStrategy;
use crate::model::{ComplianceScanResult, Row};
use crate::poam::PoamLayout;

/// CIS section numbers, optionally behind a `PG-` or `PostgreSQL <ver>-` prefix.
static SECTION_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:PG-|PostgreSQL\s*\d+(?:\.\d+)*\s*-\s*)?(\d+(?:\.\d+)+)")
        .expect("section id pattern")
});

/// Hostname suffixes of managed database services.
const MANAGED_DB_DOMAINS: &[&str] = &[".sql.goog", "rds.amazonaws.com", ".database.azure.com"];

/// PostgreSQL CIS benchmark. Identifiers are section numbers like `3.1.2`.
#[derive(Debug, Clone)]
pub struct PostgresStrategy {
    name: String,
}

impl PostgresStrategy {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for PostgresStrategy {
    fn default() -> Self {
        Self::new("PostgreSQL15_CIS1.1.0")
    }
}

fn is_managed_database(asset: &str) -> bool {
    let asset = asset.to_lowercase();
    MANAGED_DB_DOMAINS.iter().any(|d| asset.contains(d))
}

impl BenchmarkStrategy for PostgresStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn short_name(&self) -> &str {
        "PSQLv15"
    }

    fn normalize_id(&self, raw: &str) -> String {
        match SECTION_ID.captures(raw) {
            Some(caps) => caps[1].to_string(),
            None => raw.trim().to_string(),
        }
    }

    fn owns_id(&self, id: &str) -> bool {
        SECTION_ID.is_match(id)
    }

    fn claims_finding(&self, row: &Row, layout: &PoamLayout) -> bool {
        SECTION_ID.is_match(&layout.weakness(row)) && is_managed_database(&layout.asset(row))
    }

    fn extract_finding(&self, row: &Row, layout: &PoamLayout) -> Option<ComplianceScanResult> {
        let weakness = layout.weakness(row);
        let caps = SECTION_ID.captures(&weakness)?;

        Some(ComplianceScanResult {
            compliance_id: caps[1].to_string(),
            benchmark_name: self.name.clone(),
            description: format!("From POAM: {weakness}"),
            status: "Fail".into(),
            severity: String::new(),
            hostname: layout.asset(row),
            poam_id: layout.poam_id(row),
            srg_solution: layout.remediation(row),
            os_type: "PostgreSQL".into(),
            needs_review: true,
        })
    }
}
