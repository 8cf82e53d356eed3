//! One analysis run: controls, then each selected benchmark sheet through
//! extraction, comparison and categorization.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::categorize::{categorize, Categorized};
use crate::compare::{compare, CompareOptions};
use crate::config::AnalysisConfig;
use crate::controls::{ClientControls, ControlSet};
use crate::error::ReconError;
use crate::layout::ItemLayout;
use crate::model::{benchmark_key, ComplianceItem, ComplianceScanResult, FindingSet, Table};
use crate::source::{SheetRef, SheetSource, WorkspaceRef};
use crate::strategy::BenchmarkRegistry;
use crate::summary::{compute_summary, BenchmarkSummary};
use crate::warning::{Warning, Warnings};

/// What a run covers, already resolved from flags or prompts.
#[derive(Debug, Clone)]
pub struct Selection {
    pub workspace: Option<WorkspaceRef>,
    pub benchmark_sheets: Vec<SheetRef>,
    pub client: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkReport {
    pub benchmark: String,
    pub short_name: String,
    /// Benchmark whose findings were joined, when a strategy owns the sheet.
    pub strategy: Option<String>,
    pub summary: BenchmarkSummary,
    pub buckets: Categorized,
    pub unmatched_findings: Vec<ComplianceScanResult>,
    pub unmatched_items: Vec<ComplianceItem>,
    pub unmatched_items_computed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    pub client: String,
    pub workspace: Option<String>,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub meta: ReportMeta,
    pub benchmarks: BTreeMap<String, BenchmarkReport>,
    pub totals: BenchmarkSummary,
    pub warnings: Warnings,
}

/// Benchmark name of a sheet: the prefix stripped (case-insensitive) and
/// the remainder trimmed.
pub fn benchmark_name(sheet_name: &str, prefix: &str) -> String {
    let trimmed = sheet_name.trim();
    match trimmed.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => trimmed[prefix.len()..].trim().to_string(),
        _ => trimmed.to_string(),
    }
}

/// Fetch the controls sheet and build the client mapping.
pub fn load_controls(
    source: &dyn SheetSource,
    sheet: &SheetRef,
    client_column: &str,
) -> Result<ClientControls, ReconError> {
    let table = source.get_rows(sheet)?;
    ClientControls::extract(&table, client_column)
}

/// Extract, compare and categorize one benchmark sheet.
///
/// The sheet belongs to the strategy that recognizes most of its rows; the
/// sheet name only decides when no row is recognized. Rows another strategy
/// owns are counted in a warning and left out. Fails only on a schema error
/// in `table`; row-level problems go to `warnings`.
pub fn analyze_benchmark(
    benchmark: &str,
    table: &Table,
    controls: &ControlSet,
    findings: &FindingSet,
    registry: &BenchmarkRegistry,
    options: &CompareOptions,
    warnings: &mut Warnings,
) -> Result<BenchmarkReport, ReconError> {
    let layout = ItemLayout::resolve(table)?;
    let owner = registry
        .owner_of_sheet(table, &layout)
        .or_else(|| registry.get(benchmark));
    match owner {
        Some(s) if benchmark_key(s.name()) != benchmark_key(benchmark) => {
            log::info!("{}: rows belong to {}", table.name, s.name());
        }
        Some(_) => {}
        None => log::warn!("no extraction strategy recognizes sheet '{}'", table.name),
    }

    let mut grouped = registry.classify_items(table, &layout, controls, warnings);
    let items = owner
        .and_then(|s| grouped.remove(s.name()))
        .unwrap_or_default();
    for (other, rows) in grouped {
        warnings.push(Warning::ForeignRows {
            table: table.name.clone(),
            benchmark: other,
            count: rows.len(),
        });
    }

    let strategy = owner.map(|s| s.name().to_string());
    let benchmark_findings = findings.for_benchmark(strategy.as_deref().unwrap_or(benchmark));
    let comparison = compare(benchmark, &items, benchmark_findings, options, warnings);
    let buckets = categorize(&comparison.matched);
    let summary = compute_summary(&comparison, &buckets);

    Ok(BenchmarkReport {
        benchmark: benchmark.to_string(),
        short_name: owner
            .map(|s| s.short_name().to_string())
            .unwrap_or_else(|| benchmark.to_string()),
        strategy,
        summary,
        buckets,
        unmatched_findings: comparison.unmatched_findings,
        unmatched_items: comparison.unmatched_items,
        unmatched_items_computed: comparison.unmatched_items_computed,
    })
}

/// Run every selected benchmark.
///
/// Remote failures abort the run. A schema error on one benchmark sheet
/// skips that benchmark with a warning. Finding groups no analyzed sheet
/// was compared against are reported as warnings. Results are keyed by
/// benchmark name so their order does not depend on processing order.
pub fn analyze(
    source: &dyn SheetSource,
    selection: &Selection,
    controls: &ClientControls,
    findings: &FindingSet,
    registry: &BenchmarkRegistry,
    config: &AnalysisConfig,
    mut warnings: Warnings,
) -> Result<AnalysisReport, ReconError> {
    let empty = ControlSet::new();
    let client_controls = controls.get(&selection.client).unwrap_or_else(|| {
        log::warn!(
            "client '{}' has no compensating controls; placeholders stay unresolved",
            selection.client
        );
        &empty
    });
    let options = config.compare.options();

    let mut benchmarks = BTreeMap::new();
    for sheet in &selection.benchmark_sheets {
        let benchmark = benchmark_name(&sheet.name, &config.source.benchmark_sheet_prefix);
        let table = source.get_rows(sheet)?;

        match analyze_benchmark(
            &benchmark,
            &table,
            client_controls,
            findings,
            registry,
            &options,
            &mut warnings,
        ) {
            Ok(report) => {
                benchmarks.insert(benchmark, report);
            }
            Err(ReconError::Schema { table, column }) => {
                warnings.push(Warning::SchemaSkipped { table, column });
            }
            Err(e) => return Err(e),
        }
    }

    for name in findings.benchmarks() {
        let compared = benchmarks
            .values()
            .any(|r| r.strategy.as_deref() == Some(name));
        if !compared {
            warnings.push(Warning::UnanalyzedFindings {
                benchmark: name.to_string(),
                count: findings.for_benchmark(name).len(),
            });
        }
    }

    let mut totals = BenchmarkSummary::default();
    for report in benchmarks.values() {
        totals += &report.summary;
    }

    Ok(AnalysisReport {
        meta: ReportMeta {
            client: selection.client.clone(),
            workspace: selection.workspace.as_ref().map(|w| w.name.clone()),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        benchmarks,
        totals,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn benchmark_name_strips_prefix() {
        assert_eq!(benchmark_name("SCM: RHEL 8.X", "SCM:"), "RHEL 8.X");
        assert_eq!(benchmark_name("scm:PostgreSQL15_CIS1.1.0 ", "SCM:"), "PostgreSQL15_CIS1.1.0");
        assert_eq!(benchmark_name("Other", "SCM:"), "Other");
        assert_eq!(benchmark_name("S", "SCM:"), "S");
    }

    #[test]
    fn unknown_benchmark_reports_rows_as_unrecognized() {
        let table = Table::from_csv_str(
            "SCM: Windows 2019",
            "Compliance ID,Deviation Rationale Status\nWN19-00-000010,Approved\n",
        )
        .unwrap();
        let mut warnings = Warnings::new();
        let report = analyze_benchmark(
            "Windows 2019",
            &table,
            &ControlSet::new(),
            &FindingSet::new(),
            &BenchmarkRegistry::builtin(),
            &CompareOptions::default(),
            &mut warnings,
        )
        .unwrap();

        assert_eq!(report.short_name, "Windows 2019");
        assert_eq!(report.strategy, None);
        assert_eq!(report.summary, BenchmarkSummary::default());
        assert_eq!(warnings.count_by_kind()["unrecognized_row"], 1);
    }

    fn rhel_finding(id: &str) -> ComplianceScanResult {
        ComplianceScanResult {
            compliance_id: id.into(),
            benchmark_name: "RHEL 8.X".into(),
            ..Default::default()
        }
    }

    #[test]
    fn sheet_name_differing_from_benchmark_still_matches() {
        let table = Table::from_csv_str(
            "SCM: RHEL 8",
            "Compliance ID,Deviation Rationale Status\nRHEL-08-010030,Approved\n",
        )
        .unwrap();
        let mut findings = FindingSet::new();
        findings.push(rhel_finding("RHEL-08-010030"));
        findings.push(rhel_finding("RHEL-08-020000"));

        let mut warnings = Warnings::new();
        let report = analyze_benchmark(
            "RHEL 8",
            &table,
            &ControlSet::new(),
            &findings,
            &BenchmarkRegistry::builtin(),
            &CompareOptions::default(),
            &mut warnings,
        )
        .unwrap();

        assert_eq!(report.benchmark, "RHEL 8");
        assert_eq!(report.short_name, "RHEL");
        assert_eq!(report.strategy.as_deref(), Some("RHEL 8.X"));
        assert_eq!(report.summary.matched, 1);
        assert_eq!(report.summary.approved, 1);
        assert_eq!(report.summary.missing_from_scm, 1);
        assert!(warnings.is_empty(), "{:?}", warnings);
    }

    #[test]
    fn rows_of_another_benchmark_are_counted_not_joined() {
        let table = Table::from_csv_str(
            "SCM: RHEL 8.X",
            "Compliance ID,Deviation Rationale Status\n\
             RHEL-08-010030,Approved\n\
             RHEL-08-010040,Approved\n\
             3.1.2,Approved\n",
        )
        .unwrap();
        let mut warnings = Warnings::new();
        let report = analyze_benchmark(
            "RHEL 8.X",
            &table,
            &ControlSet::new(),
            &FindingSet::new(),
            &BenchmarkRegistry::builtin(),
            &CompareOptions::default(),
            &mut warnings,
        )
        .unwrap();

        assert_eq!(report.unmatched_items.len(), 2);
        let rendered: Vec<String> = warnings.iter().map(|w| w.to_string()).collect();
        assert_eq!(
            rendered,
            vec!["SCM: RHEL 8.X: 1 row(s) belong to PostgreSQL15_CIS1.1.0 and were left out of this sheet"]
        );
    }
}
