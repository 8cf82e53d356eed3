//! POAM workflow: findings come from the tracking artifact's configuration
//! findings tab and are dispatched to benchmark strategies row by row.

use crate::error::ReconError;
use crate::model::{FindingSet, Row, Table};
use crate::strategy::BenchmarkRegistry;
use crate::warning::{SkipReason, Warning, Warnings};

const POAM_ID_ALIASES: &[&str] = &["POAM ID", "POA&M ID", "POAM Item ID"];
const WEAKNESS_ALIASES: &[&str] = &["Weakness Name", "Weakness"];
const ASSET_ALIASES: &[&str] = &["Asset Identifier", "Asset", "Hostname"];
const REMEDIATION_ALIASES: &[&str] = &["Overall Remediation Plan", "Remediation Plan", "SRG Solution"];

/// Column roles of the POAM findings tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoamLayout {
    pub table: String,
    pub weakness: String,
    pub poam_id: Option<String>,
    pub asset: Option<String>,
    pub remediation: Option<String>,
    /// Columns scanned for a pending marker; absent ones are left out.
    pub pending: Vec<String>,
}

impl PoamLayout {
    pub fn resolve(table: &Table, pending_columns: &[String]) -> Result<Self, ReconError> {
        let weakness = table
            .find_column(WEAKNESS_ALIASES)
            .ok_or_else(|| ReconError::schema(&table.name, WEAKNESS_ALIASES[0]))?
            .to_string();

        let pending = pending_columns
            .iter()
            .filter_map(|c| table.find_column(&[c.as_str()]).map(str::to_string))
            .collect();

        Ok(Self {
            table: table.name.clone(),
            weakness,
            poam_id: table.find_column(POAM_ID_ALIASES).map(str::to_string),
            asset: table.find_column(ASSET_ALIASES).map(str::to_string),
            remediation: table.find_column(REMEDIATION_ALIASES).map(str::to_string),
            pending,
        })
    }

    pub fn weakness(&self, row: &Row) -> String {
        row.text(&self.weakness)
    }

    pub fn poam_id(&self, row: &Row) -> String {
        row.text_opt(self.poam_id.as_deref())
    }

    pub fn asset(&self, row: &Row) -> String {
        row.text_opt(self.asset.as_deref())
    }

    pub fn remediation(&self, row: &Row) -> String {
        row.text_opt(self.remediation.as_deref())
    }

    pub fn is_pending(&self, row: &Row) -> bool {
        self.pending
            .iter()
            .any(|c| row.text(c).to_lowercase().contains("pending"))
    }
}

/// Load POAM findings grouped by benchmark.
///
/// Blank rows are ignored, pending rows are skipped with a warning and rows
/// no strategy claims are reported as unrecognized.
pub fn load_findings(
    table: &Table,
    registry: &BenchmarkRegistry,
    pending_columns: &[String],
    warnings: &mut Warnings,
) -> Result<FindingSet, ReconError> {
    let layout = PoamLayout::resolve(table, pending_columns)?;
    let mut findings = FindingSet::new();

    for (i, row) in table.rows.iter().enumerate() {
        if row.is_blank() {
            continue;
        }
        if layout.is_pending(row) {
            warnings.push(Warning::SkippedRow {
                table: table.name.clone(),
                row: i + 1,
                reason: SkipReason::PendingFinding,
            });
            continue;
        }

        let finding = registry
            .dispatch_finding(row, &layout)
            .and_then(|s| s.extract_finding(row, &layout));
        match finding {
            Some(finding) => findings.push(finding),
            None => warnings.push(Warning::UnrecognizedRow {
                table: table.name.clone(),
                row: i + 1,
                summary: row.summary(),
            }),
        }
    }

    for name in findings.benchmarks() {
        log::info!(
            "{}: {} finding(s) for {name}",
            table.name,
            findings.for_benchmark(name).len()
        );
    }
    Ok(findings)
}
