//! Selection resolution: flags first, then a resolver for whatever is left.
//!
//! `PromptResolver` asks on stderr and reads answers from stdin.
//! `FixedResolver` never asks: a single candidate is taken, benchmark sheets
//! default to all of them, anything else ambiguous is a usage error.

use std::io::{BufRead, Write};

use scm_recon::model::benchmark_key;
use scm_recon::pipeline::benchmark_name;
use scm_recon::{SheetRef, WorkspaceRef};

use crate::exit_codes::{EXIT_ERROR, EXIT_SOURCE_NOT_FOUND};
use crate::CliError;

pub trait Resolver {
    fn pick_workspace(&mut self, candidates: &[WorkspaceRef]) -> Result<WorkspaceRef, CliError>;

    fn pick_benchmark_sheets(&mut self, candidates: &[SheetRef]) -> Result<Vec<SheetRef>, CliError>;

    fn pick_client(&mut self, clients: &[&str]) -> Result<String, CliError>;
}

// ── Fixed ───────────────────────────────────────────────────────────

pub struct FixedResolver;

impl Resolver for FixedResolver {
    fn pick_workspace(&mut self, candidates: &[WorkspaceRef]) -> Result<WorkspaceRef, CliError> {
        match candidates {
            [only] => Ok(only.clone()),
            _ => Err(CliError::args(format!(
                "{} workspaces match: {}",
                candidates.len(),
                candidates.iter().map(|w| w.name.as_str()).collect::<Vec<_>>().join(", ")
            ))
            .with_hint("pass --workspace-name")),
        }
    }

    fn pick_benchmark_sheets(&mut self, candidates: &[SheetRef]) -> Result<Vec<SheetRef>, CliError> {
        Ok(candidates.to_vec())
    }

    fn pick_client(&mut self, clients: &[&str]) -> Result<String, CliError> {
        match clients {
            [only] => Ok(only.to_string()),
            _ => Err(CliError::args(format!(
                "{} clients in the controls sheet; cannot choose non-interactively",
                clients.len()
            ))
            .with_hint("pass --client")),
        }
    }
}

// ── Prompt ──────────────────────────────────────────────────────────

/// Numbered menus. Generic over the streams so tests can script answers.
pub struct PromptResolver<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptResolver<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, title: &str, options: &[&str], footer: &str) -> Result<String, CliError> {
        let io_err = |e: std::io::Error| CliError {
            code: EXIT_ERROR,
            message: e.to_string(),
            hint: None,
        };
        writeln!(self.output, "{}", title).map_err(io_err)?;
        for (i, option) in options.iter().enumerate() {
            writeln!(self.output, "  {:>2}. {}", i + 1, option).map_err(io_err)?;
        }
        write!(self.output, "{}", footer).map_err(io_err)?;
        self.output.flush().map_err(io_err)?;

        let mut line = String::new();
        let n = self.input.read_line(&mut line).map_err(io_err)?;
        if n == 0 {
            return Err(CliError::args("no answer (end of input)"));
        }
        Ok(line.trim().to_string())
    }

    fn ask_index(&mut self, title: &str, options: &[&str]) -> Result<usize, CliError> {
        loop {
            let answer = self.ask(title, options, "Select a number: ")?;
            match answer.parse::<usize>() {
                Ok(n) if (1..=options.len()).contains(&n) => return Ok(n - 1),
                _ => {
                    let _ = writeln!(self.output, "Invalid choice '{}'", answer);
                }
            }
        }
    }
}

/// Parse `1,3` / `2 4` / `all` into zero-based indexes. Empty means all.
fn parse_multi_choice(answer: &str, len: usize) -> Option<Vec<usize>> {
    let answer = answer.trim();
    if answer.is_empty() || answer.eq_ignore_ascii_case("all") || answer.eq_ignore_ascii_case("a") {
        return Some((0..len).collect());
    }
    let mut picked = Vec::new();
    for part in answer.split(|c: char| c == ',' || c.is_whitespace()).filter(|p| !p.is_empty()) {
        let n: usize = part.parse().ok()?;
        if n == 0 || n > len {
            return None;
        }
        if !picked.contains(&(n - 1)) {
            picked.push(n - 1);
        }
    }
    if picked.is_empty() {
        None
    } else {
        Some(picked)
    }
}

impl<R: BufRead, W: Write> Resolver for PromptResolver<R, W> {
    fn pick_workspace(&mut self, candidates: &[WorkspaceRef]) -> Result<WorkspaceRef, CliError> {
        if let [only] = candidates {
            return Ok(only.clone());
        }
        let names: Vec<&str> = candidates.iter().map(|w| w.name.as_str()).collect();
        let i = self.ask_index("Workspaces:", &names)?;
        Ok(candidates[i].clone())
    }

    fn pick_benchmark_sheets(&mut self, candidates: &[SheetRef]) -> Result<Vec<SheetRef>, CliError> {
        let names: Vec<&str> = candidates.iter().map(|s| s.name.as_str()).collect();
        loop {
            let answer = self.ask(
                "Benchmark sheets:",
                &names,
                "Select numbers (comma-separated) or 'all' [all]: ",
            )?;
            match parse_multi_choice(&answer, candidates.len()) {
                Some(indexes) => return Ok(indexes.into_iter().map(|i| candidates[i].clone()).collect()),
                None => {
                    let _ = writeln!(self.output, "Invalid choice '{}'", answer);
                }
            }
        }
    }

    fn pick_client(&mut self, clients: &[&str]) -> Result<String, CliError> {
        if let [only] = clients {
            return Ok(only.to_string());
        }
        let i = self.ask_index("Clients:", clients)?;
        Ok(clients[i].to_string())
    }
}

// ── Flag matching ───────────────────────────────────────────────────

/// `--scm-sheet` values matched against listed sheets. Names compare
/// ignoring case, spaces, underscores and the benchmark prefix. `All`
/// selects every candidate.
pub fn match_benchmark_sheets(
    wanted: &[String],
    candidates: &[SheetRef],
    prefix: &str,
) -> Result<Vec<SheetRef>, CliError> {
    if wanted.iter().any(|w| w.trim().eq_ignore_ascii_case("all")) {
        return Ok(candidates.to_vec());
    }

    let key = |name: &str| benchmark_key(&benchmark_name(name, prefix));
    let mut picked: Vec<SheetRef> = Vec::new();
    for name in wanted {
        let sheet = candidates
            .iter()
            .find(|s| key(&s.name) == key(name))
            .ok_or_else(|| CliError {
                code: EXIT_SOURCE_NOT_FOUND,
                message: format!("no benchmark sheet matches '{}'", name),
                hint: Some(format!(
                    "available: {}",
                    candidates.iter().map(|s| s.name.as_str()).collect::<Vec<_>>().join(", ")
                )),
            })?;
        if !picked.contains(sheet) {
            picked.push(sheet.clone());
        }
    }
    Ok(picked)
}

/// Trimmed, case-insensitive name equality.
pub fn same_name(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes::EXIT_USAGE;
    use std::io::Cursor;

    fn sheets() -> Vec<SheetRef> {
        vec![
            SheetRef { id: 1, name: "SCM: RHEL 8.X".into() },
            SheetRef { id: 2, name: "SCM: PostgreSQL15_CIS1.1.0".into() },
        ]
    }

    #[test]
    fn sheet_flags_ignore_prefix_case_and_separators() {
        let picked = match_benchmark_sheets(&["rhel_8.x".into()], &sheets(), "SCM:").unwrap();
        assert_eq!(picked[0].id, 1);

        let picked =
            match_benchmark_sheets(&["SCM: PostgreSQL 15 CIS1.1.0".into()], &sheets(), "SCM:").unwrap();
        assert_eq!(picked[0].id, 2);

        let all = match_benchmark_sheets(&["All".into()], &sheets(), "SCM:").unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn unknown_sheet_flag_lists_available() {
        let err = match_benchmark_sheets(&["Windows".into()], &sheets(), "SCM:").unwrap_err();
        assert_eq!(err.code, EXIT_SOURCE_NOT_FOUND);
        assert!(err.hint.unwrap().contains("SCM: RHEL 8.X"));
    }

    #[test]
    fn multi_choice_parsing() {
        assert_eq!(parse_multi_choice("", 3), Some(vec![0, 1, 2]));
        assert_eq!(parse_multi_choice("ALL", 2), Some(vec![0, 1]));
        assert_eq!(parse_multi_choice("3, 1 3", 3), Some(vec![2, 0]));
        assert_eq!(parse_multi_choice("4", 3), None);
        assert_eq!(parse_multi_choice("x", 3), None);
    }

    #[test]
    fn prompt_retries_until_valid() {
        let mut out = Vec::new();
        let mut resolver = PromptResolver::new(Cursor::new("9\n2\n"), &mut out);
        let client = resolver.pick_client(&["Acme", "Globex"]).unwrap();
        assert_eq!(client, "Globex");
        let shown = String::from_utf8(out).unwrap();
        assert!(shown.contains("Invalid choice '9'"));
        assert!(shown.contains(" 1. Acme"));
    }

    #[test]
    fn prompt_end_of_input_is_usage_error() {
        let mut resolver = PromptResolver::new(Cursor::new(""), Vec::new());
        let err = resolver.pick_client(&["Acme", "Globex"]).unwrap_err();
        assert_eq!(err.code, EXIT_USAGE);
    }

    #[test]
    fn fixed_resolver_refuses_ambiguity() {
        let ws = vec![
            WorkspaceRef { id: 1, name: "SCM Program - A".into() },
            WorkspaceRef { id: 2, name: "SCM Program - B".into() },
        ];
        assert_eq!(FixedResolver.pick_workspace(&ws).unwrap_err().code, EXIT_USAGE);
        assert_eq!(FixedResolver.pick_workspace(&ws[..1]).unwrap().id, 1);
        assert_eq!(FixedResolver.pick_benchmark_sheets(&sheets()).unwrap().len(), 2);
        assert_eq!(FixedResolver.pick_client(&["Acme"]).unwrap(), "Acme");
        assert!(FixedResolver.pick_client(&["Acme", "Globex"]).is_err());
    }
}
