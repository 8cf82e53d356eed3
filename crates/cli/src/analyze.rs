//! `scm analyze`: load findings, resolve the Smartsheet selection, run the
//! engine, write the Excel report.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use scm_recon::pipeline::{analyze, load_controls, AnalysisReport, Selection};
use scm_recon::source::sheets_with_prefix;
use scm_recon::{poam, scan, AnalysisConfig, BenchmarkRegistry, FindingSet, SheetRef, Warnings};
use scm_smartsheet::SmartsheetClient;

use crate::exit_codes::*;
use crate::resolve::{match_benchmark_sheets, same_name, FixedResolver, PromptResolver, Resolver};
use crate::{AnalyzeArgs, CliError};

pub fn cmd_analyze(args: AnalyzeArgs) -> Result<(), CliError> {
    let config = load_config(&args)?;
    let registry = BenchmarkRegistry::builtin();

    let interactive = !args.non_interactive && !args.all_selected() && atty::is(atty::Stream::Stdin);
    tracing::info!("interactive selection: {}", interactive);

    // Local input first: a bad findings file should fail before any network call
    let mut warnings = Warnings::new();
    let findings = load_findings(&args, &config, &registry, &mut warnings)?;
    tracing::info!(
        "{} finding(s) across {} benchmark(s)",
        findings.total(),
        findings.benchmarks().count()
    );

    let token = resolve_token(args.token.clone(), interactive)?;
    let client = SmartsheetClient::with_base_url(&token, &config.source.api_base)?;

    let mut resolver: Box<dyn Resolver> = if interactive {
        Box::new(PromptResolver::new(io::stdin().lock(), io::stderr()))
    } else {
        Box::new(FixedResolver)
    };

    // Workspace
    let query = args.query.as_deref().unwrap_or(&config.source.workspace_query);
    let mut workspaces = client.list_workspaces(query)?;
    if let Some(name) = &args.workspace_name {
        workspaces.retain(|w| same_name(&w.name, name));
    }
    if workspaces.is_empty() {
        return Err(CliError {
            code: EXIT_SOURCE_NOT_FOUND,
            message: match &args.workspace_name {
                Some(name) => format!("no workspace named '{}' matches '{}'", name, query),
                None => format!("no workspace matches '{}'", query),
            },
            hint: Some("check --query / --workspace-name and the token's sharing".into()),
        });
    }
    let workspace = resolver.pick_workspace(&workspaces)?;
    tracing::info!("workspace: {}", workspace.name);

    // Sheets
    let sheets = client.list_sheets(&workspace)?;
    let candidates: Vec<SheetRef> = sheets_with_prefix(&sheets, &config.source.benchmark_sheet_prefix)
        .into_iter()
        .cloned()
        .collect();
    if candidates.is_empty() {
        return Err(CliError {
            code: EXIT_SOURCE_NOT_FOUND,
            message: format!(
                "workspace '{}' has no sheets starting with '{}'",
                workspace.name, config.source.benchmark_sheet_prefix
            ),
            hint: None,
        });
    }
    let benchmark_sheets = if args.scm_sheets.is_empty() {
        resolver.pick_benchmark_sheets(&candidates)?
    } else {
        match_benchmark_sheets(&args.scm_sheets, &candidates, &config.source.benchmark_sheet_prefix)?
    };

    let controls_sheet = controls_sheet(&args, &config, &sheets)?;
    let controls = load_controls(&client, &controls_sheet, &config.source.client_column)?;

    // Client
    let client_name = match &args.client {
        Some(name) => name.trim().to_string(),
        None => {
            let clients = controls.clients();
            if clients.is_empty() {
                return Err(CliError {
                    code: EXIT_SOURCE_NOT_FOUND,
                    message: format!("no clients in sheet '{}'", controls_sheet.name),
                    hint: None,
                });
            }
            resolver.pick_client(&clients)?
        }
    };
    drop(resolver);

    let selection = Selection {
        workspace: Some(workspace),
        benchmark_sheets,
        client: client_name,
    };
    let report = analyze(&client, &selection, &controls, &findings, &registry, &config, warnings)?;

    if report.benchmarks.is_empty() {
        print_warnings(&report);
        return Err(CliError {
            code: EXIT_NOTHING_TO_REPORT,
            message: "every selected benchmark was skipped; no report written".into(),
            hint: Some("see the warnings above".into()),
        });
    }

    let output = output_path(args.output.as_deref(), &config.report.file_prefix);
    let written = scm_io::report::write_report(&report, &output).map_err(|e| CliError {
        code: EXIT_REPORT_WRITE,
        message: e,
        hint: None,
    })?;

    if args.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError { code: EXIT_ERROR, message: e.to_string(), hint: None })?;
        println!("{}", json);
    }

    print_summary(&report);
    print_warnings(&report);
    eprintln!("report: {} ({} sheets)", output.display(), written.sheets.len());
    Ok(())
}

// ── Inputs ──────────────────────────────────────────────────────────

fn load_config(args: &AnalyzeArgs) -> Result<AnalysisConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|e| {
                CliError::args(format!("cannot read config {}: {}", path.display(), e))
            })?;
            AnalysisConfig::from_toml(&text)?
        }
        None => AnalysisConfig::default(),
    };
    if args.no_unmatched_items {
        config.compare.include_unmatched_items = false;
    }
    Ok(config)
}

fn load_findings(
    args: &AnalyzeArgs,
    config: &AnalysisConfig,
    registry: &BenchmarkRegistry,
    warnings: &mut Warnings,
) -> Result<FindingSet, CliError> {
    if let Some(path) = &args.poam {
        let table = scm_io::xlsx::read_sheet(path, &config.poam.sheet, config.poam.header_row)
            .map_err(CliError::args)?;
        return Ok(poam::load_findings(&table, registry, &config.poam.pending_columns, warnings)?);
    }
    if let Some(path) = &args.scan_csv {
        let table = scm_io::csv::read_table(path).map_err(CliError::args)?;
        let results = scan::load_scan_results(&table, warnings)?;
        return Ok(scan::group_by_benchmark(&table.name, results, registry, warnings));
    }
    Err(CliError::args("one of --poam or --scan-csv is required"))
}

/// Flag (or SMARTSHEET_TOKEN via clap) first, then a prompt when interactive.
fn resolve_token(token: Option<String>, interactive: bool) -> Result<String, CliError> {
    if let Some(t) = token.filter(|t| !t.trim().is_empty()) {
        return Ok(t.trim().to_string());
    }
    let missing = |msg: &str| CliError {
        code: EXIT_SOURCE_NOT_AUTH,
        message: msg.to_string(),
        hint: Some("pass --token or set SMARTSHEET_TOKEN".into()),
    };
    if !interactive {
        return Err(missing("missing Smartsheet access token"));
    }

    eprint!("Smartsheet API token: ");
    io::stderr().flush().ok();
    let mut buf = String::new();
    io::stdin()
        .read_line(&mut buf)
        .map_err(|e| CliError { code: EXIT_ERROR, message: e.to_string(), hint: None })?;
    let trimmed = buf.trim();
    if trimmed.is_empty() {
        return Err(missing("no token provided"));
    }
    Ok(trimmed.to_string())
}

fn controls_sheet(
    args: &AnalyzeArgs,
    config: &AnalysisConfig,
    sheets: &[SheetRef],
) -> Result<SheetRef, CliError> {
    let found = match &args.compensating_controls_sheet_name {
        Some(name) => sheets.iter().find(|s| same_name(&s.name, name)),
        None => sheets_with_prefix(sheets, &config.source.controls_sheet_prefix)
            .into_iter()
            .next(),
    };
    found.cloned().ok_or_else(|| CliError {
        code: EXIT_SOURCE_NOT_FOUND,
        message: format!(
            "no compensating controls sheet '{}'",
            args.compensating_controls_sheet_name
                .as_deref()
                .unwrap_or(&config.source.controls_sheet_prefix)
        ),
        hint: Some("pass --compensating-controls-sheet-name".into()),
    })
}

/// Given path with `.xlsx` ensured, or `{prefix}_{timestamp}.xlsx`.
fn output_path(output: Option<&Path>, prefix: &str) -> PathBuf {
    match output {
        Some(path) => PathBuf::from(scm_io::report::with_xlsx_extension(&path.to_string_lossy())),
        None => PathBuf::from(format!(
            "{}_{}.xlsx",
            prefix,
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        )),
    }
}

// ── Output ──────────────────────────────────────────────────────────

fn print_summary(report: &AnalysisReport) {
    eprintln!(
        "{:<28} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
        "benchmark", "findings", "matched", "approved", "review", "fix", "unassess", "missing", "scm-only"
    );
    let rows = report
        .benchmarks
        .values()
        .map(|b| (b.benchmark.as_str(), &b.summary))
        .chain(std::iter::once(("total", &report.totals)));
    for (name, s) in rows {
        eprintln!(
            "{:<28} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
            name,
            s.total_findings,
            s.matched,
            s.approved,
            s.under_review,
            s.should_fix,
            s.unassessed,
            s.missing_from_scm,
            s.scm_only,
        );
    }
}

fn print_warnings(report: &AnalysisReport) {
    if report.warnings.is_empty() {
        return;
    }
    let by_kind: Vec<String> = report
        .warnings
        .count_by_kind()
        .into_iter()
        .map(|(kind, n)| format!("{} {}", n, kind))
        .collect();
    eprintln!("warnings: {} ({})", report.warnings.len(), by_kind.join(", "));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_appends_extension() {
        assert_eq!(
            output_path(Some(Path::new("out/acme")), "compliance_report"),
            PathBuf::from("out/acme.xlsx")
        );
        let generated = output_path(None, "compliance_report");
        let name = generated.to_string_lossy();
        assert!(name.starts_with("compliance_report_"));
        assert!(name.ends_with(".xlsx"));
        // compliance_report_YYYYmmdd_HHMMSS.xlsx
        assert_eq!(name.len(), "compliance_report_".len() + 15 + ".xlsx".len());
    }

    #[test]
    fn flag_token_wins_and_missing_is_exit_50() {
        assert_eq!(resolve_token(Some(" tok ".into()), false).unwrap(), "tok");
        let err = resolve_token(None, false).unwrap_err();
        assert_eq!(err.code, EXIT_SOURCE_NOT_AUTH);
        let err = resolve_token(Some("  ".into()), false).unwrap_err();
        assert_eq!(err.code, EXIT_SOURCE_NOT_AUTH);
    }
}
