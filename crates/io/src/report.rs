// Excel report writer

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet};
use scm_recon::pipeline::{AnalysisReport, BenchmarkReport};
use scm_recon::{ComplianceItem, ComplianceScanResult, Disposition, MatchedRecord};

const HEADER_FILL: u32 = 0xE45E27;
const MAX_COLUMN_WIDTH: usize = 60;
const EMPTY_COLUMN_WIDTH: f64 = 20.0;
const MAX_SHEET_NAME: usize = 31;

static INVALID_SHEET_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\\/*?:\[\]]").expect("sheet name pattern"));

const MATCHED_COLUMNS: &[&str] = &[
    "POAM ID",
    "Compliance ID",
    "Finding Description",
    "Hostname",
    "Deviation Type",
    "Deviation Rationale",
    "Supporting Documents",
    "Additional Context",
    "Deviation Status",
];

const MISSING_COLUMNS: &[&str] = &[
    "POAM ID",
    "Compliance ID",
    "Finding Description",
    "Hostname",
    "Status",
    "Severity",
    "SRG Solution",
];

const SCM_ONLY_COLUMNS: &[&str] = &[
    "Compliance ID",
    "Finding Description",
    "Deviation Type",
    "Deviation Rationale",
    "Supporting Documents",
    "Additional Context",
    "Deviation Status",
    "Should Fix",
];

const SUMMARY_COLUMNS: &[&str] = &[
    "Benchmark",
    "Total Findings",
    "Matched",
    "Approved",
    "Under Review",
    "Should Fix",
    "Un-assessed",
    "Missing from SCM",
    "SCM Only",
];

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExportResult {
    /// Sheet names in workbook order.
    pub sheets: Vec<String>,
    /// Data rows written across all sheets, headers excluded.
    pub rows_written: usize,
}

struct Formats {
    header: Format,
    body: Format,
    number: Format,
}

impl Formats {
    fn new() -> Self {
        Self {
            header: Format::new()
                .set_bold()
                .set_font_color(Color::White)
                .set_background_color(Color::RGB(HEADER_FILL))
                .set_border(FormatBorder::Thin)
                .set_text_wrap()
                .set_align(FormatAlign::Top),
            body: Format::new()
                .set_border(FormatBorder::Thin)
                .set_text_wrap()
                .set_align(FormatAlign::Top),
            number: Format::new().set_border(FormatBorder::Thin),
        }
    }
}

/// Append `.xlsx` unless the path already ends with it (any case).
pub fn with_xlsx_extension(path: &str) -> String {
    if path.to_lowercase().ends_with(".xlsx") {
        path.to_string()
    } else {
        format!("{path}.xlsx")
    }
}

/// Excel-safe sheet name: forbidden characters become `_`, at most 31 chars.
pub fn sanitize_sheet_name(name: &str) -> String {
    let cleaned = INVALID_SHEET_CHARS.replace_all(name, "_");
    cleaned.chars().take(MAX_SHEET_NAME).collect()
}

/// Write the analysis as one workbook: summary first (and active), then one
/// sheet per benchmark bucket, then warnings when there are any.
pub fn write_report(report: &AnalysisReport, path: &Path) -> Result<ExportResult, String> {
    let formats = Formats::new();
    let mut workbook = Workbook::new();
    let mut names = SheetNames::default();
    let mut result = ExportResult::default();

    let summary_name = names.claim("Summary");
    {
        let ws = add_sheet(&mut workbook, &summary_name)?;
        write_summary(ws, report, &formats)?;
        ws.set_active(true);
    }
    result.sheets.push(summary_name);
    result.rows_written += report.benchmarks.len();

    for benchmark in report.benchmarks.values() {
        for sheet in benchmark_sheets(benchmark) {
            let name = names.claim(&format!("{}_{}", benchmark.short_name, sheet.suffix));
            let ws = add_sheet(&mut workbook, &name)?;
            if let Some(color) = sheet.tab_color {
                ws.set_tab_color(color);
            }
            write_table(ws, &sheet.headers, &sheet.rows, &formats)?;
            result.rows_written += sheet.rows.len();
            result.sheets.push(name);
        }
    }

    if !report.warnings.is_empty() {
        let name = names.claim("Warnings");
        let ws = add_sheet(&mut workbook, &name)?;
        let rows: Vec<Vec<String>> = report
            .warnings
            .iter()
            .map(|w| vec![w.kind().to_string(), w.scope().to_string(), w.to_string()])
            .collect();
        write_table(ws, &["Kind", "Table / Benchmark", "Message"], &rows, &formats)?;
        result.rows_written += rows.len();
        result.sheets.push(name);
    }

    workbook
        .save(path)
        .map_err(|e| format!("Failed to save XLSX file '{}': {}", path.display(), e))?;

    log::info!(
        "wrote {} sheet(s), {} row(s) to {}",
        result.sheets.len(),
        result.rows_written,
        path.display()
    );
    Ok(result)
}

// ---------------------------------------------------------------------------
// Sheet content
// ---------------------------------------------------------------------------

struct SheetContent {
    suffix: &'static str,
    tab_color: Option<Color>,
    headers: Vec<&'static str>,
    rows: Vec<Vec<String>>,
}

fn tab_color(disposition: Disposition) -> Option<Color> {
    match disposition {
        Disposition::ShouldFix => Some(Color::RGB(0xFF0000)),
        Disposition::Approved => Some(Color::RGB(0xCCFFCC)),
        Disposition::UnderReview => Some(Color::RGB(0xFFFFCC)),
        Disposition::Unassessed => None,
    }
}

/// Sheet order follows the summary columns.
const BUCKET_ORDER: [Disposition; 4] = [
    Disposition::Approved,
    Disposition::UnderReview,
    Disposition::ShouldFix,
    Disposition::Unassessed,
];

fn benchmark_sheets(benchmark: &BenchmarkReport) -> Vec<SheetContent> {
    let mut sheets = Vec::new();

    for disposition in BUCKET_ORDER {
        let with_srg = disposition == Disposition::ShouldFix;
        let mut headers: Vec<&'static str> = MATCHED_COLUMNS.to_vec();
        if with_srg {
            headers.insert(2, "SRG Solution");
        }
        let rows = benchmark
            .buckets
            .get(&disposition)
            .map(|records| records.iter().map(|r| matched_row(r, with_srg)).collect())
            .unwrap_or_default();

        sheets.push(SheetContent {
            suffix: disposition.sheet_suffix(),
            tab_color: tab_color(disposition),
            headers,
            rows,
        });
    }

    sheets.push(SheetContent {
        suffix: "Missing_From_SCM",
        tab_color: None,
        headers: MISSING_COLUMNS.to_vec(),
        rows: benchmark.unmatched_findings.iter().map(missing_row).collect(),
    });

    if benchmark.unmatched_items_computed {
        sheets.push(SheetContent {
            suffix: "SCM_Only",
            tab_color: None,
            headers: SCM_ONLY_COLUMNS.to_vec(),
            rows: benchmark.unmatched_items.iter().map(scm_only_row).collect(),
        });
    }

    sheets
}

fn matched_row(record: &MatchedRecord, with_srg: bool) -> Vec<String> {
    let item = &record.item;
    let mut row = vec![
        record.finding.poam_id.clone(),
        item.compliance_id.clone(),
        record.description().to_string(),
        record.finding.hostname.clone(),
        item.deviation_type.clone(),
        item.deviation_rationale.clone(),
        item.supporting_documents.clone(),
        item.additional_context.clone(),
        item.deviation_status.clone(),
    ];
    if with_srg {
        row.insert(2, record.srg_solution().to_string());
    }
    row
}

fn missing_row(finding: &ComplianceScanResult) -> Vec<String> {
    vec![
        finding.poam_id.clone(),
        finding.compliance_id.clone(),
        finding.description.clone(),
        finding.hostname.clone(),
        finding.status.clone(),
        finding.severity.clone(),
        finding.srg_solution.clone(),
    ]
}

fn scm_only_row(item: &ComplianceItem) -> Vec<String> {
    vec![
        item.compliance_id.clone(),
        item.finding_description.clone(),
        item.deviation_type.clone(),
        item.deviation_rationale.clone(),
        item.supporting_documents.clone(),
        item.additional_context.clone(),
        item.deviation_status.clone(),
        if item.should_fix { "Yes" } else { "No" }.to_string(),
    ]
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Claims unique sheet names (Excel compares them case-insensitively).
#[derive(Default)]
struct SheetNames {
    taken: HashSet<String>,
}

impl SheetNames {
    fn claim(&mut self, wanted: &str) -> String {
        let base = sanitize_sheet_name(wanted);
        let mut name = base.clone();
        let mut n = 2;
        while !self.taken.insert(name.to_lowercase()) {
            let suffix = format!("~{n}");
            let keep = MAX_SHEET_NAME - suffix.len();
            name = format!("{}{}", base.chars().take(keep).collect::<String>(), suffix);
            n += 1;
        }
        name
    }
}

fn add_sheet<'a>(workbook: &'a mut Workbook, name: &str) -> Result<&'a mut Worksheet, String> {
    workbook
        .add_worksheet()
        .set_name(name)
        .map_err(|e| format!("Failed to create sheet '{}': {}", name, e))
}

fn write_summary(ws: &mut Worksheet, report: &AnalysisReport, formats: &Formats) -> Result<(), String> {
    let mut rows: Vec<(String, [usize; 8])> = report
        .benchmarks
        .values()
        .map(|b| (b.benchmark.clone(), summary_counts(&b.summary)))
        .collect();
    rows.push(("Total".to_string(), summary_counts(&report.totals)));

    write_header(ws, SUMMARY_COLUMNS, formats)?;
    for (i, (name, counts)) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        ws.write_string_with_format(r, 0, name, &formats.body)
            .map_err(|e| format!("Failed to write summary: {}", e))?;
        for (c, count) in counts.iter().enumerate() {
            ws.write_number_with_format(r, (c + 1) as u16, *count as f64, &formats.number)
                .map_err(|e| format!("Failed to write summary: {}", e))?;
        }
    }

    let name_width = rows
        .iter()
        .map(|(n, _)| n.chars().count())
        .chain(std::iter::once(SUMMARY_COLUMNS[0].len()))
        .max()
        .unwrap_or(0);
    ws.set_column_width(0, column_width(name_width))
        .map_err(|e| format!("Failed to set column width: {}", e))?;
    for (c, header) in SUMMARY_COLUMNS.iter().enumerate().skip(1) {
        ws.set_column_width(c as u16, column_width(header.len()))
            .map_err(|e| format!("Failed to set column width: {}", e))?;
    }
    Ok(())
}

fn summary_counts(s: &scm_recon::summary::BenchmarkSummary) -> [usize; 8] {
    [
        s.total_findings,
        s.matched,
        s.approved,
        s.under_review,
        s.should_fix,
        s.unassessed,
        s.missing_from_scm,
        s.scm_only,
    ]
}

fn write_header(ws: &mut Worksheet, headers: &[&str], formats: &Formats) -> Result<(), String> {
    for (c, h) in headers.iter().enumerate() {
        ws.write_string_with_format(0, c as u16, *h, &formats.header)
            .map_err(|e| format!("Failed to write header '{}': {}", h, e))?;
    }
    ws.set_freeze_panes(1, 0)
        .map_err(|e| format!("Failed to set freeze panes: {}", e))?;
    Ok(())
}

fn write_table(
    ws: &mut Worksheet,
    headers: &[&str],
    rows: &[Vec<String>],
    formats: &Formats,
) -> Result<(), String> {
    write_header(ws, headers, formats)?;

    for (i, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            ws.write_string_with_format((i + 1) as u32, c as u16, value, &formats.body)
                .map_err(|e| format!("Failed to write row {}: {}", i + 1, e))?;
        }
    }

    for (c, header) in headers.iter().enumerate() {
        let width = if rows.is_empty() {
            EMPTY_COLUMN_WIDTH
        } else {
            let longest = rows
                .iter()
                .filter_map(|r| r.get(c))
                .map(|v| longest_line(v))
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0);
            column_width(longest)
        };
        ws.set_column_width(c as u16, width)
            .map_err(|e| format!("Failed to set column {} width: {}", c, e))?;
    }

    if !headers.is_empty() {
        ws.autofilter(0, 0, rows.len() as u32, (headers.len() - 1) as u16)
            .map_err(|e| format!("Failed to set autofilter: {}", e))?;
    }
    Ok(())
}

fn longest_line(value: &str) -> usize {
    value.lines().map(|l| l.chars().count()).max().unwrap_or(0)
}

fn column_width(content_len: usize) -> f64 {
    (content_len + 2).min(MAX_COLUMN_WIDTH) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_auto, Data, Reader};
    use scm_recon::categorize::categorize;
    use scm_recon::pipeline::ReportMeta;
    use scm_recon::summary::{compute_summary, BenchmarkSummary};
    use scm_recon::{ComparisonResult, Warning, Warnings};
    use std::collections::BTreeMap;

    fn record(id: &str, status: &str, should_fix: bool) -> MatchedRecord {
        MatchedRecord {
            item: ComplianceItem {
                compliance_id: id.into(),
                benchmark_name: "RHEL 8.X".into(),
                deviation_status: status.into(),
                deviation_rationale: "Hosted on AWS".into(),
                should_fix,
                ..Default::default()
            },
            finding: ComplianceScanResult {
                compliance_id: id.into(),
                poam_id: "V-1".into(),
                hostname: "web-01".into(),
                srg_solution: "Configure auditd".into(),
                description: "From POAM".into(),
                ..Default::default()
            },
        }
    }

    fn sample_report(with_warning: bool) -> AnalysisReport {
        let comparison = ComparisonResult {
            benchmark: "RHEL 8.X".into(),
            matched: vec![
                record("RHEL-08-010030", "Approved", false),
                record("RHEL-08-010040", "Approved", true),
            ],
            unmatched_findings: vec![ComplianceScanResult {
                compliance_id: "RHEL-08-020000".into(),
                ..Default::default()
            }],
            unmatched_items: vec![],
            unmatched_items_computed: true,
        };
        let buckets = categorize(&comparison.matched);
        let summary = compute_summary(&comparison, &buckets);

        let mut benchmarks = BTreeMap::new();
        benchmarks.insert(
            "RHEL 8.X".to_string(),
            BenchmarkReport {
                benchmark: "RHEL 8.X".into(),
                short_name: "RHEL".into(),
                strategy: Some("RHEL 8.X".into()),
                summary: summary.clone(),
                buckets,
                unmatched_findings: comparison.unmatched_findings,
                unmatched_items: vec![],
                unmatched_items_computed: true,
            },
        );

        let mut warnings = Warnings::new();
        if with_warning {
            warnings.push(Warning::DuplicateKey {
                benchmark: "RHEL 8.X".into(),
                compliance_id: "RHEL-08-010030".into(),
            });
        }

        let mut totals = BenchmarkSummary::default();
        totals += &summary;
        AnalysisReport {
            meta: ReportMeta {
                client: "Acme".into(),
                workspace: None,
                engine_version: "test".into(),
                run_at: "2026-01-01T00:00:00Z".into(),
            },
            benchmarks,
            totals,
            warnings,
        }
    }

    fn cell(range: &calamine::Range<Data>, row: usize, col: usize) -> String {
        match range.get((row, col)) {
            Some(Data::String(s)) => s.clone(),
            Some(Data::Float(n)) => format!("{}", *n as i64),
            Some(other) => format!("{other:?}"),
            None => String::new(),
        }
    }

    #[test]
    fn workbook_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        let result = write_report(&sample_report(true), &path).unwrap();

        assert_eq!(
            result.sheets,
            vec![
                "Summary",
                "RHEL_Approved",
                "RHEL_Under_Review",
                "RHEL_Should_Fix",
                "RHEL_Un-assessed",
                "RHEL_Missing_From_SCM",
                "RHEL_SCM_Only",
                "Warnings",
            ]
        );

        let mut wb = open_workbook_auto(&path).unwrap();
        assert_eq!(wb.sheet_names().len(), 8);

        let summary = wb.worksheet_range("Summary").unwrap();
        assert_eq!(cell(&summary, 0, 0), "Benchmark");
        assert_eq!(cell(&summary, 1, 0), "RHEL 8.X");
        assert_eq!(cell(&summary, 1, 1), "3");
        assert_eq!(cell(&summary, 1, 2), "2");
        assert_eq!(cell(&summary, 2, 0), "Total");

        let fix = wb.worksheet_range("RHEL_Should_Fix").unwrap();
        assert_eq!(cell(&fix, 0, 2), "SRG Solution");
        assert_eq!(cell(&fix, 1, 1), "RHEL-08-010040");
        assert_eq!(cell(&fix, 1, 2), "Configure auditd");

        let approved = wb.worksheet_range("RHEL_Approved").unwrap();
        assert_eq!(cell(&approved, 0, 2), "Finding Description");
        assert_eq!(cell(&approved, 1, 6), "Hosted on AWS");
    }

    #[test]
    fn warnings_sheet_only_when_needed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        let result = write_report(&sample_report(false), &path).unwrap();
        assert!(!result.sheets.contains(&"Warnings".to_string()));
    }

    #[test]
    fn sheet_names_are_sanitized_and_unique() {
        assert_eq!(sanitize_sheet_name("SCM: a/b?[c]"), "SCM_ a_b__c_");
        assert_eq!(sanitize_sheet_name(&"x".repeat(40)).len(), 31);

        let mut names = SheetNames::default();
        let long = "PostgreSQL15_CIS1.1.0_Missing_From_SCM";
        let first = names.claim(long);
        let second = names.claim(long);
        assert_eq!(first.len(), 31);
        assert_ne!(first, second);
        assert!(second.ends_with("~2"));
        assert_eq!(second.chars().count(), 31);
    }

    #[test]
    fn output_extension() {
        assert_eq!(with_xlsx_extension("out"), "out.xlsx");
        assert_eq!(with_xlsx_extension("out.XLSX"), "out.XLSX");
    }
}
