use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Why a row was skipped without being treated as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    BlankComplianceId,
    PendingFinding,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlankComplianceId => write!(f, "blank compliance id"),
            Self::PendingFinding => write!(f, "finding marked pending"),
        }
    }
}

/// A row- or item-level anomaly. Collected, never fatal.
///
/// Row numbers count data rows from 1 (the header is not a row).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    UnrecognizedRow {
        table: String,
        row: usize,
        summary: String,
    },
    UnresolvedPlaceholder {
        benchmark: String,
        compliance_id: String,
        token: String,
    },
    DuplicateKey {
        benchmark: String,
        compliance_id: String,
    },
    SkippedRow {
        table: String,
        row: usize,
        reason: SkipReason,
    },
    /// A table failed its schema check and its benchmark was left out.
    SchemaSkipped { table: String, column: String },
    /// Rows on a benchmark sheet that another benchmark owns.
    ForeignRows {
        table: String,
        benchmark: String,
        count: usize,
    },
    /// Findings of a benchmark no analyzed sheet was compared against.
    UnanalyzedFindings { benchmark: String, count: usize },
}

impl Warning {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnrecognizedRow { .. } => "unrecognized_row",
            Self::UnresolvedPlaceholder { .. } => "unresolved_placeholder",
            Self::DuplicateKey { .. } => "duplicate_key",
            Self::SkippedRow { .. } => "skipped_row",
            Self::SchemaSkipped { .. } => "schema_skipped",
            Self::ForeignRows { .. } => "foreign_rows",
            Self::UnanalyzedFindings { .. } => "unanalyzed_findings",
        }
    }

    /// Table or benchmark the warning belongs to.
    pub fn scope(&self) -> &str {
        match self {
            Self::UnrecognizedRow { table, .. }
            | Self::SkippedRow { table, .. }
            | Self::SchemaSkipped { table, .. }
            | Self::ForeignRows { table, .. } => table,
            Self::UnresolvedPlaceholder { benchmark, .. }
            | Self::DuplicateKey { benchmark, .. }
            | Self::UnanalyzedFindings { benchmark, .. } => benchmark,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnrecognizedRow { table, row, summary } => {
                write!(f, "{table} row {row}: no benchmark recognizes row ({summary})")
            }
            Self::UnresolvedPlaceholder {
                benchmark,
                compliance_id,
                token,
            } => write!(
                f,
                "{benchmark} {compliance_id}: placeholder '{token}' has no client value"
            ),
            Self::DuplicateKey {
                benchmark,
                compliance_id,
            } => write!(
                f,
                "{benchmark}: duplicate compliance id '{compliance_id}', first entry kept"
            ),
            Self::SkippedRow { table, row, reason } => {
                write!(f, "{table} row {row}: skipped ({reason})")
            }
            Self::SchemaSkipped { table, column } => {
                write!(f, "{table}: missing required column '{column}', benchmark skipped")
            }
            Self::ForeignRows {
                table,
                benchmark,
                count,
            } => write!(
                f,
                "{table}: {count} row(s) belong to {benchmark} and were left out of this sheet"
            ),
            Self::UnanalyzedFindings { benchmark, count } => write!(
                f,
                "{benchmark}: {count} finding(s) not compared, no benchmark sheet analyzed"
            ),
        }
    }
}

/// Ordered warning list attached to a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Warnings(Vec<Warning>);

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, warning: Warning) {
        log::warn!("{warning}");
        self.0.push(warning);
    }

    pub fn extend(&mut self, other: Warnings) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Warning> {
        self.0.iter()
    }

    pub fn count_by_kind(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for w in &self.0 {
            *counts.entry(w.kind()).or_insert(0) += 1;
        }
        counts
    }

    pub fn into_vec(self) -> Vec<Warning> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_group_by_kind() {
        let mut warnings = Warnings::new();
        warnings.push(Warning::DuplicateKey {
            benchmark: "RHEL 8.X".into(),
            compliance_id: "RHEL-08-010030".into(),
        });
        warnings.push(Warning::DuplicateKey {
            benchmark: "RHEL 8.X".into(),
            compliance_id: "RHEL-08-010040".into(),
        });
        warnings.push(Warning::SkippedRow {
            table: "Configuration Findings".into(),
            row: 4,
            reason: SkipReason::PendingFinding,
        });

        let counts = warnings.count_by_kind();
        assert_eq!(counts["duplicate_key"], 2);
        assert_eq!(counts["skipped_row"], 1);
        assert_eq!(warnings.len(), 3);
    }

    #[test]
    fn serializes_with_kind_tag() {
        let w = Warning::UnresolvedPlaceholder {
            benchmark: "RHEL 8.X".into(),
            compliance_id: "RHEL-08-010030".into(),
            token: "REGION".into(),
        };
        let json = serde_json::to_value(&w).unwrap();
        assert_eq!(json["kind"], "unresolved_placeholder");
        assert_eq!(json["token"], "REGION");
        assert_eq!(
            w.to_string(),
            "RHEL 8.X RHEL-08-010030: placeholder 'REGION' has no client value"
        );
    }
}
