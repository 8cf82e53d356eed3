//! CSV-scan workflow: a scanner export loaded directly as flat findings.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ReconError;
use crate::model::{header_eq, ComplianceScanResult, FindingSet, Row, Table};
use crate::strategy::{BenchmarkRegistry, RHEL_ID};
use crate::warning::{SkipReason, Warning, Warnings};

/// Join-key header aliases, most specific first.
pub const ID_ALIASES: &[&str] = &[
    "Compliance ID",
    "Finding ID",
    "STIG ID",
    "Vulnerability ID",
    "Rule ID",
    "ID",
    "Unique ID",
];

const PLUGIN_ID: &str = "Plugin ID";
const NESSUS_UNIQUE_ID: &str = "Unique ID";

static NESSUS_COMPLIANCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Compliance:\s+([A-Za-z0-9][A-Za-z0-9._-]*)").expect("nessus compliance pattern")
});

#[derive(Debug, Clone, PartialEq, Eq)]
enum IdSource {
    Column(String),
    /// Only a plugin id is available; ids become `Plugin-{n}`.
    Plugin(String),
}

/// Column roles of a scan export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanLayout {
    id: IdSource,
    plugin: Option<String>,
    /// Nessus exports: a `Unique ID` without a compliance reference falls
    /// back to a RHEL id in the description, then to the plugin id.
    nessus: bool,
    status: Option<String>,
    severity: Option<String>,
    host: Option<String>,
    description: Option<String>,
}

/// Lowercased alphanumeric words of a header.
fn header_words(header: &str) -> impl Iterator<Item = String> + '_ {
    header
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

/// First header with a word starting with one of `needles`, needles tried in
/// order. Identifier headers (a word `id`) and `skip` never fill a role.
fn find_role<'t>(table: &'t Table, needles: &[&str], skip: &[&str]) -> Option<&'t str> {
    let candidates: Vec<&String> = table
        .headers
        .iter()
        .filter(|h| !skip.iter().any(|s| header_eq(h, s)))
        .filter(|h| !header_words(h).any(|w| w == "id"))
        .collect();
    needles.iter().find_map(|needle| {
        candidates
            .iter()
            .copied()
            .find(|h| header_words(h).any(|w| w.starts_with(needle)))
            .map(String::as_str)
    })
}

impl ScanLayout {
    pub fn resolve(table: &Table) -> Result<Self, ReconError> {
        let plugin = table.find_column(&[PLUGIN_ID]).map(str::to_string);
        let id = match (table.find_column(ID_ALIASES), &plugin) {
            (Some(col), _) => IdSource::Column(col.to_string()),
            (None, Some(col)) => IdSource::Plugin(col.clone()),
            (None, None) => return Err(ReconError::schema(&table.name, ID_ALIASES[0])),
        };

        let id_column = match &id {
            IdSource::Column(c) | IdSource::Plugin(c) => c.clone(),
        };
        let skip = [id_column.as_str(), PLUGIN_ID];
        let role = |needles: &[&str]| find_role(table, needles, &skip).map(str::to_string);

        Ok(Self {
            nessus: header_eq(&id_column, NESSUS_UNIQUE_ID),
            status: role(&["status", "result", "object"]),
            severity: role(&["severity", "risk", "cat"]),
            host: role(&["host", "asset"]),
            description: role(&["description", "desc", "title", "finding"]),
            plugin,
            id,
        })
    }

    /// Identifier of a row, or `None` when the row has none.
    pub fn compliance_id(&self, row: &Row) -> Option<String> {
        let col = match &self.id {
            IdSource::Plugin(col) => return self.plugin_id(row, col),
            IdSource::Column(col) => col,
        };

        let raw = row.text(col);
        if let Some(caps) = NESSUS_COMPLIANCE.captures(&raw) {
            return Some(caps[1].to_string());
        }
        if !self.nessus {
            return (!raw.is_empty()).then_some(raw);
        }

        let description = row.text_opt(self.description.as_deref());
        RHEL_ID
            .captures(&raw)
            .or_else(|| RHEL_ID.captures(&description))
            .map(|caps| caps[1].to_string())
            .or_else(|| self.plugin.as_deref().and_then(|p| self.plugin_id(row, p)))
            .or_else(|| (!raw.is_empty()).then_some(raw.clone()))
    }

    fn plugin_id(&self, row: &Row, column: &str) -> Option<String> {
        let raw = row.text(column);
        (!raw.is_empty()).then(|| format!("Plugin-{raw}"))
    }
}

/// Whether a scanner status still needs attention. Unknown states do.
pub fn needs_review(status: &str) -> bool {
    let status = status.trim().to_lowercase();
    if status.contains("[passed]") || status.contains("[pass]") || status == "pass" || status == "passed" {
        return false;
    }
    true
}

/// A scan finding and the data row (from 1) it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanRecord {
    pub row: usize,
    pub finding: ComplianceScanResult,
}

/// Load a scan export as flat findings. Benchmark names are left empty;
/// see [`group_by_benchmark`]. Rows without any identifier are skipped
/// with a warning.
pub fn load_scan_results(table: &Table, warnings: &mut Warnings) -> Result<Vec<ScanRecord>, ReconError> {
    let layout = ScanLayout::resolve(table)?;
    let mut records = Vec::new();

    for (i, row) in table.rows.iter().enumerate() {
        if row.is_blank() {
            continue;
        }
        let Some(compliance_id) = layout.compliance_id(row) else {
            warnings.push(Warning::SkippedRow {
                table: table.name.clone(),
                row: i + 1,
                reason: SkipReason::BlankComplianceId,
            });
            continue;
        };
        let status = row.text_opt(layout.status.as_deref());
        records.push(ScanRecord {
            row: i + 1,
            finding: ComplianceScanResult {
                compliance_id,
                needs_review: needs_review(&status),
                status,
                severity: row.text_opt(layout.severity.as_deref()),
                hostname: row.text_opt(layout.host.as_deref()),
                description: row.text_opt(layout.description.as_deref()),
                ..Default::default()
            },
        });
    }

    log::info!("{}: loaded {} scan result(s)", table.name, records.len());
    Ok(records)
}

/// Assign flat findings to the benchmark that owns their identifier,
/// normalizing ids the way that benchmark's items are normalized.
pub fn group_by_benchmark(
    source: &str,
    records: Vec<ScanRecord>,
    registry: &BenchmarkRegistry,
    warnings: &mut Warnings,
) -> FindingSet {
    let mut set = FindingSet::new();
    for ScanRecord { row, mut finding } in records {
        match registry.owner_of_id(&finding.compliance_id) {
            Some(strategy) => {
                finding.compliance_id = strategy.normalize_id(&finding.compliance_id);
                finding.benchmark_name = strategy.name().to_string();
                set.push(finding);
            }
            None => warnings.push(Warning::UnrecognizedRow {
                table: source.to_string(),
                row,
                summary: finding.compliance_id,
            }),
        }
    }
    set
}
