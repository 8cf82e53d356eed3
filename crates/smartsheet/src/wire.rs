//! Smartsheet API 2.0 response shapes and their conversion to engine tables.

use serde::Deserialize;
use serde_json::Value;

use scm_recon::{RawValue, SheetRef, Table, WorkspaceRef};

#[derive(Debug, Deserialize)]
pub(crate) struct Listing<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Named {
    pub id: u64,
    #[serde(default)]
    pub name: String,
}

/// `GET /workspaces/{id}?loadAll=true`: sheets at the top level and inside
/// (possibly nested) folders.
#[derive(Debug, Deserialize)]
pub(crate) struct Container {
    #[serde(default)]
    pub sheets: Vec<Named>,
    #[serde(default)]
    pub folders: Vec<Container>,
}

impl Container {
    /// Top-level sheets first, then each folder depth-first.
    pub fn flatten(self) -> Vec<SheetRef> {
        let mut out = Vec::new();
        self.collect_into(&mut out);
        out
    }

    fn collect_into(self, out: &mut Vec<SheetRef>) {
        out.extend(self.sheets.into_iter().map(|s| SheetRef {
            id: s.id,
            name: s.name,
        }));
        for folder in self.folders {
            folder.collect_into(out);
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Sheet {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub rows: Vec<SheetRow>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Column {
    pub id: u64,
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SheetRow {
    #[serde(default)]
    pub cells: Vec<Cell>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Cell {
    pub column_id: u64,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub display_value: Option<String>,
}

impl From<Named> for WorkspaceRef {
    fn from(w: Named) -> Self {
        WorkspaceRef {
            id: w.id,
            name: w.name,
        }
    }
}

/// Display value wins over the raw value: it is what the sheet shows, so
/// numbers keep their formatting and contact cells read as names.
fn cell_value(cell: &Cell) -> RawValue {
    if let Value::Bool(b) = cell.value {
        return RawValue::Bool(b);
    }
    if let Some(display) = &cell.display_value {
        return RawValue::text(display.as_str());
    }
    match &cell.value {
        Value::Null => RawValue::Empty,
        Value::Number(n) => n.as_f64().map(RawValue::Number).unwrap_or(RawValue::Empty),
        Value::String(s) => RawValue::text(s.as_str()),
        other => RawValue::text(other.to_string()),
    }
}

impl Sheet {
    /// Columns ordered by index. Cells whose column is not in the sheet's
    /// column list are dropped; missing cells read as empty.
    pub fn into_table(mut self, fallback_name: &str) -> Table {
        self.columns.sort_by_key(|c| c.index);
        let headers = self.columns.iter().map(|c| c.title.trim().to_string()).collect();
        let name = if self.name.is_empty() {
            fallback_name.to_string()
        } else {
            self.name
        };

        let mut table = Table::new(name, headers);
        for row in &self.rows {
            let values = self
                .columns
                .iter()
                .map(|col| {
                    row.cells
                        .iter()
                        .find(|c| c.column_id == col.id)
                        .map(cell_value)
                        .unwrap_or(RawValue::Empty)
                })
                .collect();
            table.push_values(values);
        }
        table
    }
}
