use serde::Serialize;

use crate::error::ReconError;
use crate::model::Table;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceRef {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetRef {
    pub id: u64,
    pub name: String,
}

/// The hosted tabular service, as seen by the engine. Transport, paging and
/// rate limiting stay behind this seam; failures surface as
/// [`ReconError::RemoteAccess`].
pub trait SheetSource {
    /// Workspaces whose name contains `query` (case-insensitive).
    fn list_workspaces(&self, query: &str) -> Result<Vec<WorkspaceRef>, ReconError>;

    fn list_sheets(&self, workspace: &WorkspaceRef) -> Result<Vec<SheetRef>, ReconError>;

    /// All rows of a sheet; the table is named after the sheet.
    fn get_rows(&self, sheet: &SheetRef) -> Result<Table, ReconError>;
}

/// Sheets whose name starts with `prefix` (case-insensitive), in listing order.
pub fn sheets_with_prefix<'a>(sheets: &'a [SheetRef], prefix: &str) -> Vec<&'a SheetRef> {
    let prefix = prefix.to_lowercase();
    sheets
        .iter()
        .filter(|s| s.name.trim_start().to_lowercase().starts_with(&prefix))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_filter_keeps_order() {
        let sheets = vec![
            SheetRef { id: 1, name: "SCM: RHEL 8.X".into() },
            SheetRef { id: 2, name: "Compensating Controls".into() },
            SheetRef { id: 3, name: "scm: PostgreSQL15_CIS1.1.0".into() },
        ];
        let ids: Vec<u64> = sheets_with_prefix(&sheets, "SCM:").iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }
}
