use crate::error::ReconError;
use crate::model::{Row, Table};

/// Column roles of a benchmark (approved-item) sheet, resolved once per table
/// by case-insensitive substring match on the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemLayout {
    pub table: String,
    pub compliance_id: String,
    pub finding_description: Option<String>,
    pub srg_solution: Option<String>,
    pub deviation_type: Option<String>,
    pub deviation_rationale: Option<String>,
    pub supporting_documents: Option<String>,
    pub deviation_status: Option<String>,
    pub should_fix: Option<String>,
    pub comments: Option<String>,
    pub additional_context: Option<String>,
}

impl ItemLayout {
    pub fn resolve(table: &Table) -> Result<Self, ReconError> {
        let find = |needle: &str, exclude: Option<&str>| {
            table
                .find_column_containing(needle, exclude, &[])
                .map(str::to_string)
        };

        let compliance_id =
            find("compliance id", None).ok_or_else(|| ReconError::schema(&table.name, "Compliance ID"))?;

        Ok(Self {
            table: table.name.clone(),
            compliance_id,
            finding_description: find("finding description", None),
            srg_solution: find("srg solution", None),
            deviation_type: find("deviation type", None),
            deviation_rationale: find("deviation rationale", Some("status")),
            supporting_documents: find("supporting documents", None),
            deviation_status: find("deviation rationale status", None),
            should_fix: find("should fix", None),
            comments: find("comments", None),
            additional_context: find("additional context", None),
        })
    }

    pub fn compliance_id(&self, row: &Row) -> String {
        row.text(&self.compliance_id)
    }

    pub fn text(&self, row: &Row, column: &Option<String>) -> String {
        row.text_opt(column.as_deref())
    }
}

/// Spreadsheet checkbox / yes-no normalization. Anything unrecognised is false.
pub fn parse_should_fix(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "yes" | "y" | "1" | "checked" | "x" | "on" | "t"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Table {
        Table::new("SCM: RHEL 8.X", names.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn resolves_roles_by_substring() {
        let table = headers(&[
            "Compliance ID",
            "Finding Description",
            "Deviation Type",
            "Deviation Rationale Status",
            "Deviation Rationale (Client Facing)",
            "Should Fix?",
            "Additional Context",
        ]);
        let layout = ItemLayout::resolve(&table).unwrap();

        assert_eq!(layout.compliance_id, "Compliance ID");
        assert_eq!(
            layout.deviation_rationale.as_deref(),
            Some("Deviation Rationale (Client Facing)")
        );
        assert_eq!(
            layout.deviation_status.as_deref(),
            Some("Deviation Rationale Status")
        );
        assert_eq!(layout.should_fix.as_deref(), Some("Should Fix?"));
        assert_eq!(layout.srg_solution, None);
        assert_eq!(layout.comments, None);
    }

    #[test]
    fn missing_compliance_id_is_schema_error() {
        let err = ItemLayout::resolve(&headers(&["Finding Description"])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "table 'SCM: RHEL 8.X': missing required column 'Compliance ID'"
        );
    }

    #[test]
    fn should_fix_values() {
        for v in ["true", "Yes", " y ", "1", "CHECKED", "x", "on", "T"] {
            assert!(parse_should_fix(v), "{v}");
        }
        for v in ["false", "no", "0", "", "unchecked", "maybe", "off"] {
            assert!(!parse_should_fix(v), "{v}");
        }
    }
}
