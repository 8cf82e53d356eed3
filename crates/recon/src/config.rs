use serde::{Deserialize, Serialize};

use crate::compare::CompareOptions;
use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Analysis settings. Every section is optional; an empty document yields
/// the defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub source: SourceConfig,
    pub poam: PoamConfig,
    pub compare: CompareConfig,
    pub report: ReportConfig,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Where approved items and client controls live in the hosted service.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    pub api_base: String,
    pub workspace_query: String,
    pub benchmark_sheet_prefix: String,
    pub controls_sheet_prefix: String,
    pub client_column: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.smartsheet.com/2.0".into(),
            workspace_query: "SCM Program".into(),
            benchmark_sheet_prefix: "SCM:".into(),
            controls_sheet_prefix: "Compensating Controls".into(),
            client_column: "CLIENT".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PoamConfig {
    pub sheet: String,
    /// 1-based row holding the column headers.
    pub header_row: usize,
    /// Columns that mark a finding as still pending.
    pub pending_columns: Vec<String>,
}

impl Default for PoamConfig {
    fn default() -> Self {
        Self {
            sheet: "Configuration Findings".into(),
            header_row: 1,
            pending_columns: vec![
                "Vendor Dependent Product Name".into(),
                "False Positive".into(),
                "Operational Requirement".into(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CompareConfig {
    pub include_unmatched_items: bool,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            include_unmatched_items: true,
        }
    }
}

impl CompareConfig {
    pub fn options(&self) -> CompareOptions {
        CompareOptions {
            include_unmatched_items: self.include_unmatched_items,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportConfig {
    pub file_prefix: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            file_prefix: "compliance_report".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing + validation
// ---------------------------------------------------------------------------

impl AnalysisConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: AnalysisConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let required = [
            ("source.workspace_query", &self.source.workspace_query),
            ("source.benchmark_sheet_prefix", &self.source.benchmark_sheet_prefix),
            ("source.controls_sheet_prefix", &self.source.controls_sheet_prefix),
            ("source.client_column", &self.source.client_column),
            ("poam.sheet", &self.poam.sheet),
            ("report.file_prefix", &self.report.file_prefix),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!("{key} must not be empty")));
            }
        }

        if !self.source.api_base.starts_with("http") {
            return Err(ReconError::ConfigValidation(format!(
                "source.api_base must be an http(s) URL, got '{}'",
                self.source.api_base
            )));
        }

        if self.poam.header_row == 0 {
            return Err(ReconError::ConfigValidation(
                "poam.header_row is 1-based, got 0".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_defaults() {
        let config = AnalysisConfig::from_toml("").unwrap();
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.source.workspace_query, "SCM Program");
        assert!(config.compare.include_unmatched_items);
        assert_eq!(config.poam.pending_columns.len(), 3);
    }

    #[test]
    fn parse_partial_sections() {
        let toml = r#"
[source]
workspace_query = "Client SCM"

[poam]
header_row = 5
pending_columns = ["Status"]

[compare]
include_unmatched_items = false
"#;
        let config = AnalysisConfig::from_toml(toml).unwrap();
        assert_eq!(config.source.workspace_query, "Client SCM");
        assert_eq!(config.source.benchmark_sheet_prefix, "SCM:");
        assert_eq!(config.poam.header_row, 5);
        assert_eq!(config.poam.pending_columns, vec!["Status"]);
        assert!(!config.compare.options().include_unmatched_items);
    }

    #[test]
    fn reject_zero_header_row() {
        let err = AnalysisConfig::from_toml("[poam]\nheader_row = 0\n").unwrap_err();
        assert!(matches!(err, ReconError::ConfigValidation(_)));
    }

    #[test]
    fn reject_empty_prefix() {
        let err = AnalysisConfig::from_toml("[source]\nbenchmark_sheet_prefix = \" \"\n").unwrap_err();
        assert!(err.to_string().contains("source.benchmark_sheet_prefix"));
    }

    #[test]
    fn reject_bad_type() {
        let err = AnalysisConfig::from_toml("[compare]\ninclude_unmatched_items = \"yes\"\n").unwrap_err();
        assert!(matches!(err, ReconError::ConfigParse(_)));
    }
}
